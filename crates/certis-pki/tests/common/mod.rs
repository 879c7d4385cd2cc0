//! Shared fixtures: rcgen-built PKIs and a stub revocation transport

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use certis_pki::cert::oids;
use certis_pki::status::ocsp::message::{
    BasicOcspResponse, CertStatus, OcspResponse, ReasonCode, ResponderId, ResponseBytes, ResponseData, RevokedInfo,
    SingleResponse,
};
use certis_pki::status::ocsp::OcspRequestMessage;
use certis_pki::{
    OcspResponseStatus, PkiError, Result, RevocationTransport, StoreKind, StoreSource, VerificationOrchestrator,
    VerifierConfig, X509Certificate,
};
use der::asn1::{BitString, GeneralizedTime, OctetString};
use der::Encode;
use p256::ecdsa::{signature::Signer, Signature, SigningKey};
use p256::pkcs8::DecodePrivateKey;
use rcgen::{
    BasicConstraints, CertificateParams, CertificateRevocationListParams, CustomExtension, DnType, IsCa, KeyIdMethod,
    KeyPair, KeyUsagePurpose, RevokedCertParams,
};
use spki::AlgorithmIdentifierOwned;
use time::OffsetDateTime;
use x509_cert::certificate::Version;
use x509_cert::serial_number::SerialNumber;

pub const RESPONDER_URL: &str = "http://ocsp.certis.test/";
pub const CRL_URL: &str = "http://crl.certis.test/root.crl";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Evaluation instant used across the scenarios
pub fn instant() -> OffsetDateTime {
    rcgen::date_time_ymd(2025, 6, 1)
}

pub struct Issued {
    pub cert: rcgen::Certificate,
    pub key: KeyPair,
    pub parsed: X509Certificate,
}

pub fn params(cn: &str, ca: bool) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(DnType::CommonName, cn);
    params.not_before = rcgen::date_time_ymd(2024, 1, 1);
    params.not_after = rcgen::date_time_ymd(2034, 1, 1);
    if ca {
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
    }
    params
}

pub fn root(cn: &str) -> Issued {
    let key = KeyPair::generate().unwrap();
    let cert = params(cn, true).self_signed(&key).unwrap();
    let parsed = X509Certificate::from_der(cert.der()).unwrap();
    Issued { cert, key, parsed }
}

pub fn issue(params: CertificateParams, issuer: &Issued) -> Issued {
    let key = KeyPair::generate().unwrap();
    let cert = params.signed_by(&key, &issuer.cert, &issuer.key).unwrap();
    let parsed = X509Certificate::from_der(cert.der()).unwrap();
    Issued { cert, key, parsed }
}

/// End-entity parameters with a fixed serial and, optionally, a CRL distribution point
pub fn leaf_params(cn: &str, serial: &[u8], crl_url: Option<&str>) -> CertificateParams {
    let mut params = params(cn, false);
    params.serial_number = Some(rcgen::SerialNumber::from(serial.to_vec()));
    if let Some(url) = crl_url {
        params.crl_distribution_points = vec![rcgen::CrlDistributionPoint {
            uris: vec![url.to_string()],
        }];
    }
    params
}

/// DER CRL signed by `issuer` listing `revoked_serials` as keyCompromise
pub fn crl_der(issuer: &Issued, revoked_serials: &[&[u8]]) -> Vec<u8> {
    CertificateRevocationListParams {
        this_update: rcgen::date_time_ymd(2025, 5, 1),
        next_update: rcgen::date_time_ymd(2025, 7, 1),
        crl_number: rcgen::SerialNumber::from(vec![0x02]),
        issuing_distribution_point: None,
        revoked_certs: revoked_serials
            .iter()
            .map(|serial| RevokedCertParams {
                serial_number: rcgen::SerialNumber::from(serial.to_vec()),
                revocation_time: rcgen::date_time_ymd(2025, 3, 1),
                reason_code: Some(rcgen::RevocationReason::KeyCompromise),
                invalidity_date: None,
            })
            .collect(),
        key_identifier_method: KeyIdMethod::Sha256,
    }
    .signed_by(&issuer.cert, &issuer.key)
    .unwrap()
    .der()
    .to_vec()
}

/// Critical extension with an opaque NULL body
pub fn critical_extension(oid: &[u64]) -> CustomExtension {
    let mut ext = CustomExtension::from_oid_content(oid, vec![0x05, 0x00]);
    ext.set_criticality(true);
    ext
}

/// Orchestrator whose working set holds `anchors`
pub fn orchestrator(anchors: &[&X509Certificate], transport: Arc<StubTransport>) -> VerificationOrchestrator {
    let store = certis_pki::MemoryStore::from_certificates(anchors.iter().map(|c| (*c).clone()));
    let sources = vec![StoreSource::new(StoreKind::WorkingSet, true, store)];
    VerificationOrchestrator::with_transport(&VerifierConfig::default(), sources, transport).unwrap()
}

/// Transport that answers OCSP POSTs and CRL fetches with canned bodies
pub struct StubTransport {
    ocsp_body: Vec<u8>,
    crl_body: Option<Vec<u8>>,
    calls: AtomicUsize,
}

impl StubTransport {
    pub fn new(ocsp_body: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            ocsp_body,
            crl_body: None,
            calls: AtomicUsize::new(0),
        })
    }

    /// Serves `crl` from every distribution point
    pub fn with_crl(crl: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            ocsp_body: Vec::new(),
            crl_body: Some(crl),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn offline() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RevocationTransport for StubTransport {
    fn fetch_crl(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.crl_body.clone().ok_or_else(|| PkiError::Transport {
            target: url.to_string(),
            cause: "stub transport has no CRLs".to_string(),
        })
    }

    fn post_ocsp(&self, _url: &str, _request_der: &[u8]) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.ocsp_body.clone())
    }
}

pub fn revoked_status(reason: u8, at: OffsetDateTime) -> CertStatus {
    CertStatus::Revoked(RevokedInfo {
        revocation_time: GeneralizedTime::from_unix_duration(Duration::from_secs(at.unix_timestamp() as u64)).unwrap(),
        revocation_reason: Some(ReasonCode(reason)),
    })
}

/// OCSP response for `target`, signed by `issuer`; `serial` overrides the echoed serial number
pub fn ocsp_response(issuer: &Issued, target: &X509Certificate, status: CertStatus, serial: Option<&[u8]>) -> Vec<u8> {
    let mut cert_id = OcspRequestMessage::for_certificate(&issuer.parsed, target)
        .unwrap()
        .cert_id()
        .clone();
    if let Some(serial) = serial {
        cert_id.serial_number = SerialNumber::new(serial).unwrap();
    }

    let produced_at = GeneralizedTime::from_unix_duration(Duration::from_secs(instant().unix_timestamp() as u64)).unwrap();
    let data = ResponseData {
        version: Version::V1,
        responder_id: ResponderId::ByName(issuer.parsed.subject().clone()),
        produced_at,
        responses: vec![SingleResponse {
            cert_id,
            cert_status: status,
            this_update: produced_at,
            next_update: None,
            single_extensions: None,
        }],
        response_extensions: None,
    };

    let signing_key = SigningKey::from_pkcs8_der(&issuer.key.serialize_der()).unwrap();
    let signature: Signature = signing_key.sign(&data.to_der().unwrap());
    let basic = BasicOcspResponse {
        tbs_response_data: data,
        signature_algorithm: AlgorithmIdentifierOwned {
            oid: const_oid::ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2"),
            parameters: None,
        },
        signature: BitString::from_bytes(signature.to_der().as_bytes()).unwrap(),
        certs: None,
    };

    OcspResponse {
        response_status: OcspResponseStatus::Successful,
        response_bytes: Some(ResponseBytes {
            response_type: oids::OCSP_BASIC,
            response: OctetString::new(basic.to_der().unwrap()).unwrap(),
        }),
    }
    .to_der()
    .unwrap()
}
