//! OCSP (在线证书状态协议) 撤销检查

pub mod message;

use std::sync::Arc;

use der::Encode;
use x509_cert::time::Time;

pub use message::{OcspRequestMessage, OcspResponseMessage, OcspResponseStatus};

use self::message::CertStatus;
use super::{transport::RevocationTransport, RevocationChecker, RevocationReport, RevocationVerdict};
use crate::{
    cert::{ocsp_responder_urls, oids, to_offset_datetime, CertificateChain, X509Certificate},
    chain::{ChainValidator, OcspSource, RevocationPolicy, TrustAnchorSet, ValidationRequest},
    error::{PkiError, Result as PkiResult},
};

/// 基于 OCSP 的撤销检查
pub struct OcspRevocationChecker {
    transport: Arc<dyn RevocationTransport>,
    /// 是否验证响应签名
    verify_signature: bool,
}

impl OcspRevocationChecker {
    pub fn new(transport: Arc<dyn RevocationTransport>) -> Self {
        Self {
            transport,
            verify_signature: true,
        }
    }

    pub fn with_signature_verification(mut self, enabled: bool) -> Self {
        self.verify_signature = enabled;
        self
    }

    /// 查找签发者：优先取证书链第二张，否则取第一个公钥能验证目标签名的信任锚
    pub fn resolve_issuer<'a>(
        target: &X509Certificate,
        chain: Option<&'a CertificateChain>,
        anchors: &'a TrustAnchorSet,
    ) -> PkiResult<&'a X509Certificate> {
        if let Some(issuer) = chain.filter(|c| c.len() > 1).and_then(|c| c.get(1)) {
            return Ok(issuer);
        }
        anchors
            .find_signer_of(target)
            .map(|anchor| &anchor.certificate)
            .ok_or(PkiError::IssuerNotFound)
    }

    /// 向 `url` 发送 OCSP 请求并解读响应
    pub fn query(&self, url: &str, issuer: &X509Certificate, target: &X509Certificate) -> PkiResult<RevocationVerdict> {
        let request = OcspRequestMessage::for_certificate(issuer, target)?;
        let body = self.transport.post_ocsp(url, &request.to_der()?)?;
        let response = OcspResponseMessage::from_der(&body)?;
        tracing::debug!(url, status = %response.status(), "received OCSP response");

        if response.status() != OcspResponseStatus::Successful {
            return Err(PkiError::ResponderStatusError {
                status: response.status(),
            });
        }

        if self.verify_signature {
            self.verify_response_signature(&response, issuer)?;
        }

        let single = response.single_response()?;
        match &single.cert_status {
            CertStatus::Good(_) => {}
            CertStatus::Revoked(info) => {
                let reason_code = info.revocation_reason.map_or(-1, |code| i32::from(code.0));
                let revoked_at = to_offset_datetime(&Time::GeneralTime(info.revocation_time))?;
                tracing::info!(
                    subject = %target.display_name(),
                    serial = %target.info.serial_number,
                    reason_code,
                    "OCSP responder reports certificate revoked"
                );
                return Ok(RevocationVerdict::Revoked {
                    reason_code,
                    revoked_at,
                });
            }
            CertStatus::Unknown(_) => {
                return Err(PkiError::UnknownCertStatus("unknown [2]".to_string()));
            }
        }

        if single.cert_id.serial_number != *target.serial() {
            return Err(PkiError::SerialMismatch {
                expected: target.info.serial_number.clone(),
                actual: hex::encode(single.cert_id.serial_number.as_bytes()),
            });
        }

        Ok(RevocationVerdict::Good)
    }

    /// 响应须由签发者签名，或由签发者授权（id-kp-OCSPSigning）的响应器证书签名
    fn verify_response_signature(&self, response: &OcspResponseMessage, issuer: &X509Certificate) -> PkiResult<()> {
        let basic = response
            .basic()
            .ok_or_else(|| PkiError::malformed_ocsp("missing BasicOCSPResponse", None))?;
        let tbs = basic.tbs_response_data.to_der()?;
        let algorithm = &basic.signature_algorithm.oid;
        let signature = basic.signature.raw_bytes();

        if certis_crypto::verify_signature(&issuer.spki_der()?, algorithm, &tbs, signature).is_ok() {
            return Ok(());
        }

        for cert in basic.certs.iter().flatten() {
            let responder = X509Certificate::from_der(&cert.to_der()?)?;
            if !responder.info.has_extended_key_usage(&oids::KP_OCSP_SIGNING) {
                continue;
            }
            if responder.verify_signed_by(issuer).is_err() {
                continue;
            }
            if certis_crypto::verify_signature(&responder.spki_der()?, algorithm, &tbs, signature).is_ok() {
                tracing::debug!(responder = %responder.display_name(), "OCSP response signed by delegated responder");
                return Ok(());
            }
        }

        Err(PkiError::ResponderSignatureInvalid(format!(
            "response is not signed by '{}' or a responder it authorized",
            issuer.display_name()
        )))
    }
}

impl RevocationChecker for OcspRevocationChecker {
    fn check(&self, validator: &ChainValidator, request: &ValidationRequest<'_>) -> PkiResult<RevocationReport> {
        match &request.ocsp_source {
            OcspSource::Aia => {
                let urls = ocsp_responder_urls(request.target);
                let url = urls.first().ok_or(PkiError::MissingResponderUrl)?;

                let run = request.clone().with_revocation(RevocationPolicy::ocsp());
                let path = validator.validate(&run)?;
                let verdict = self.query(url, path.issuer_of_target(), request.target)?;
                Ok(RevocationReport::new(verdict).with_path(path))
            }
            OcspSource::Url(url) => {
                let run = request.clone().with_revocation(RevocationPolicy::disabled());
                let path = validator.validate(&run)?;
                let issuer = Self::resolve_issuer(request.target, request.chain, request.anchors)?;
                let verdict = self.query(url, issuer, request.target)?;
                Ok(RevocationReport::new(verdict).with_path(path))
            }
            OcspSource::None => Err(PkiError::MissingResponderUrl),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::message::{
        BasicOcspResponse, CertId, ReasonCode, ResponderId, ResponseData, RevokedInfo, SingleResponse,
    };
    use super::*;
    use crate::chain::{TrustAnchor, TrustAnchorSet};
    use crate::store::StoreKind;
    use der::asn1::{BitString, GeneralizedTime, Null, OctetString};
    use der::Decode;
    use p256::ecdsa::{signature::Signer, Signature, SigningKey};
    use p256::pkcs8::DecodePrivateKey;
    use rcgen::{
        BasicConstraints, CertificateParams, CustomExtension, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
        KeyUsagePurpose,
    };
    use spki::AlgorithmIdentifierOwned;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::OffsetDateTime;
    use x509_cert::certificate::Version;

    const RESPONDER: &str = "http://ocsp.test/";

    struct Pki {
        ca: rcgen::Certificate,
        ca_key: KeyPair,
        ca_parsed: X509Certificate,
        leaf: X509Certificate,
    }

    fn pki(aia: bool) -> Pki {
        let ca_key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.distinguished_name.push(DnType::CommonName, "OCSP Test CA");
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        let ca = params.self_signed(&ca_key).unwrap();

        let leaf_key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(vec!["leaf.test".to_string()]).unwrap();
        params.serial_number = Some(rcgen::SerialNumber::from(vec![0x10, 0x20]));
        if aia {
            params.custom_extensions = vec![aia_extension(RESPONDER)];
        }
        let leaf = params.signed_by(&leaf_key, &ca, &ca_key).unwrap();

        Pki {
            ca_parsed: X509Certificate::from_der(ca.der()).unwrap(),
            leaf: X509Certificate::from_der(leaf.der()).unwrap(),
            ca,
            ca_key,
        }
    }

    /// AuthorityInfoAccess with a single id-ad-ocsp URI
    fn aia_extension(url: &str) -> CustomExtension {
        let uri = url.as_bytes();
        let mut access = vec![0x06, 0x08, 0x2b, 0x06, 0x01, 0x05, 0x05, 0x07, 0x30, 0x01, 0x86, uri.len() as u8];
        access.extend_from_slice(uri);
        let mut description = vec![0x30, access.len() as u8];
        description.extend(access);
        let mut value = vec![0x30, description.len() as u8];
        value.extend(description);
        CustomExtension::from_oid_content(&[1, 3, 6, 1, 5, 5, 7, 1, 1], value)
    }

    fn anchors(ca: &X509Certificate) -> TrustAnchorSet {
        let mut set = TrustAnchorSet::new();
        set.push(TrustAnchor {
            alias: "ca".to_string(),
            source: StoreKind::WorkingSet,
            certificate: ca.clone(),
        });
        set
    }

    fn revoked(reason: Option<u8>) -> CertStatus {
        CertStatus::Revoked(RevokedInfo {
            revocation_time: GeneralizedTime::from_unix_duration(std::time::Duration::from_secs(1_700_000_000))
                .unwrap(),
            revocation_reason: reason.map(ReasonCode),
        })
    }

    /// BasicOCSPResponse signed with an ECDSA P-256 key
    fn signed_response(
        signer: &KeyPair,
        cert_id: CertId,
        status: CertStatus,
        certs: Option<Vec<x509_cert::Certificate>>,
    ) -> Vec<u8> {
        let now = GeneralizedTime::from_unix_duration(std::time::Duration::from_secs(1_750_000_000)).unwrap();
        let data = ResponseData {
            version: Version::V1,
            responder_id: ResponderId::ByKey(OctetString::new(vec![1, 2, 3]).unwrap()),
            produced_at: now,
            responses: vec![SingleResponse {
                cert_id,
                cert_status: status,
                this_update: now,
                next_update: None,
                single_extensions: None,
            }],
            response_extensions: None,
        };
        let signing_key = SigningKey::from_pkcs8_der(&signer.serialize_der()).unwrap();
        let signature: Signature = signing_key.sign(&data.to_der().unwrap());

        let basic = BasicOcspResponse {
            tbs_response_data: data,
            signature_algorithm: AlgorithmIdentifierOwned {
                oid: const_oid::ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2"),
                parameters: None,
            },
            signature: BitString::from_bytes(signature.to_der().as_bytes()).unwrap(),
            certs,
        };
        message::OcspResponse {
            response_status: OcspResponseStatus::Successful,
            response_bytes: Some(message::ResponseBytes {
                response_type: oids::OCSP_BASIC,
                response: OctetString::new(basic.to_der().unwrap()).unwrap(),
            }),
        }
        .to_der()
        .unwrap()
    }

    fn cert_id(pki: &Pki) -> CertId {
        OcspRequestMessage::for_certificate(&pki.ca_parsed, &pki.leaf)
            .unwrap()
            .cert_id()
            .clone()
    }

    struct StubResponder {
        body: Vec<u8>,
        calls: AtomicUsize,
    }

    impl StubResponder {
        fn new(body: Vec<u8>) -> Arc<Self> {
            Arc::new(Self {
                body,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl RevocationTransport for StubResponder {
        fn fetch_crl(&self, url: &str) -> PkiResult<Vec<u8>> {
            Err(PkiError::transport(url, "no CRL endpoint"))
        }

        fn post_ocsp(&self, url: &str, request_der: &[u8]) -> PkiResult<Vec<u8>> {
            assert_eq!(url, RESPONDER);
            assert!(message::OcspRequest::from_der(request_der).is_ok());
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    fn check_url(pki: &Pki, body: Vec<u8>) -> PkiResult<RevocationReport> {
        let anchors = anchors(&pki.ca_parsed);
        let request = ValidationRequest::new(&pki.leaf, &anchors)
            .with_ocsp_source(OcspSource::Url(RESPONDER.to_string()))
            .at(OffsetDateTime::now_utc());
        OcspRevocationChecker::new(StubResponder::new(body)).check(&ChainValidator::new(), &request)
    }

    #[test]
    fn test_good_response() {
        let pki = pki(false);
        let body = signed_response(&pki.ca_key, cert_id(&pki), CertStatus::Good(Null), None);
        let report = check_url(&pki, body).unwrap();
        assert!(report.verdict.is_good());
        assert!(report.path.is_some());
    }

    #[test]
    fn test_revoked_with_reason() {
        let pki = pki(false);
        let body = signed_response(&pki.ca_key, cert_id(&pki), revoked(Some(1)), None);
        let report = check_url(&pki, body).unwrap();
        match report.verdict {
            RevocationVerdict::Revoked {
                reason_code,
                revoked_at,
            } => {
                assert_eq!(reason_code, 1);
                assert_eq!(revoked_at.unix_timestamp(), 1_700_000_000);
            }
            other => panic!("unexpected verdict {other:?}"),
        }
    }

    #[test]
    fn test_revoked_without_reason() {
        let pki = pki(false);
        let body = signed_response(&pki.ca_key, cert_id(&pki), revoked(None), None);
        let report = check_url(&pki, body).unwrap();
        assert!(matches!(report.verdict, RevocationVerdict::Revoked { reason_code: -1, .. }));
        assert!(report.verdict.reason().is_none());
    }

    #[test]
    fn test_unassigned_reason_code_still_revoked() {
        let pki = pki(false);
        let body = signed_response(&pki.ca_key, cert_id(&pki), revoked(Some(7)), None);
        let report = check_url(&pki, body).unwrap();
        assert!(matches!(report.verdict, RevocationVerdict::Revoked { reason_code: 7, .. }));
        assert!(report.verdict.reason().is_none());
        assert!(matches!(report.verdict.into_result(), Err(PkiError::Revoked { reason_code: 7, .. })));
    }

    #[test]
    fn test_unknown_status_is_error() {
        let pki = pki(false);
        let body = signed_response(&pki.ca_key, cert_id(&pki), CertStatus::Unknown(Null), None);
        assert!(matches!(check_url(&pki, body), Err(PkiError::UnknownCertStatus(_))));
    }

    #[test]
    fn test_serial_mismatch() {
        let pki = pki(false);
        let mut id = cert_id(&pki);
        id.serial_number = x509_cert::serial_number::SerialNumber::new(&[0x77]).unwrap();
        let body = signed_response(&pki.ca_key, id, CertStatus::Good(Null), None);
        match check_url(&pki, body) {
            Err(PkiError::SerialMismatch { expected, actual }) => {
                assert_eq!(expected, "1020");
                assert_eq!(actual, "77");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let pki = pki(false);
        let stranger = KeyPair::generate().unwrap();
        let body = signed_response(&stranger, cert_id(&pki), CertStatus::Good(Null), None);
        assert!(matches!(
            check_url(&pki, body.clone()),
            Err(PkiError::ResponderSignatureInvalid(_))
        ));

        let checker = OcspRevocationChecker::new(StubResponder::new(body)).with_signature_verification(false);
        let verdict = checker.query(RESPONDER, &pki.ca_parsed, &pki.leaf).unwrap();
        assert!(verdict.is_good());
    }

    #[test]
    fn test_delegated_responder_accepted() {
        let pki = pki(false);
        let responder_key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.distinguished_name.push(DnType::CommonName, "OCSP Responder");
        params.extended_key_usages = vec![ExtendedKeyUsagePurpose::OcspSigning];
        let responder = params.signed_by(&responder_key, &pki.ca, &pki.ca_key).unwrap();
        let embedded = x509_cert::Certificate::from_der(responder.der()).unwrap();

        let body = signed_response(&responder_key, cert_id(&pki), CertStatus::Good(Null), Some(vec![embedded]));
        assert!(check_url(&pki, body).unwrap().verdict.is_good());
    }

    #[test]
    fn test_responder_status_error() {
        let pki = pki(false);
        let body = message::OcspResponse {
            response_status: OcspResponseStatus::TryLater,
            response_bytes: None,
        }
        .to_der()
        .unwrap();
        assert!(matches!(
            check_url(&pki, body),
            Err(PkiError::ResponderStatusError {
                status: OcspResponseStatus::TryLater
            })
        ));
    }

    #[test]
    fn test_aia_responder() {
        let pki = pki(true);
        let anchors = anchors(&pki.ca_parsed);
        let stub = StubResponder::new(signed_response(&pki.ca_key, cert_id(&pki), CertStatus::Good(Null), None));
        let request = ValidationRequest::new(&pki.leaf, &anchors).with_ocsp_source(OcspSource::Aia);
        let report = OcspRevocationChecker::new(stub.clone())
            .check(&ChainValidator::new(), &request)
            .unwrap();
        assert!(report.verdict.is_good());
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_aia_without_responder_url() {
        let pki = pki(false);
        let anchors = anchors(&pki.ca_parsed);
        let stub = StubResponder::new(Vec::new());
        let request = ValidationRequest::new(&pki.leaf, &anchors).with_ocsp_source(OcspSource::Aia);
        let result = OcspRevocationChecker::new(stub.clone()).check(&ChainValidator::new(), &request);
        assert!(matches!(result, Err(PkiError::MissingResponderUrl)));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolve_issuer_prefers_chain() {
        let ours = pki(false);
        let theirs = pki(false);
        let foreign = anchors(&theirs.ca_parsed);

        let chain = CertificateChain::new(vec![ours.leaf.clone(), ours.ca_parsed.clone()]).unwrap();
        let issuer = OcspRevocationChecker::resolve_issuer(&ours.leaf, Some(&chain), &foreign).unwrap();
        assert_eq!(issuer, &ours.ca_parsed);

        assert!(matches!(
            OcspRevocationChecker::resolve_issuer(&ours.leaf, None, &foreign),
            Err(PkiError::IssuerNotFound)
        ));
        let own = anchors(&ours.ca_parsed);
        let issuer = OcspRevocationChecker::resolve_issuer(&ours.leaf, None, &own).unwrap();
        assert_eq!(issuer, &ours.ca_parsed);
    }
}
