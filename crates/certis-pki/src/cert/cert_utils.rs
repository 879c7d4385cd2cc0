use der::Decode;
use time::OffsetDateTime;
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};
use x509_cert::ext::pkix::{AuthorityInfoAccessSyntax, CrlDistributionPoints};
use x509_cert::time::Time;

use super::{oids, types::X509Certificate};
use crate::error::{PkiError, Result};

const PEM_CERTIFICATE_TAG: &str = "CERTIFICATE";

/// 解析单个证书
///
/// # Arguments
/// * `cert_data` - 证书数据（DER或PEM格式）
///
/// # Returns
/// * `Result<X509Certificate>` - 成功返回证书
pub fn parse_certificate(cert_data: &[u8]) -> Result<X509Certificate> {
    // 尝试解析PEM格式
    if looks_like_pem(cert_data) {
        let pem = pem::parse(cert_data)
            .map_err(|e| PkiError::ParseError(format!("Failed to parse PEM: {e}")))?;
        if pem.tag() != PEM_CERTIFICATE_TAG {
            return Err(PkiError::ParseError(format!(
                "Unexpected PEM block: {}",
                pem.tag()
            )));
        }
        return X509Certificate::from_der(pem.contents());
    }

    X509Certificate::from_der(cert_data)
}

/// 解析证书列表：PEM 包中的所有 CERTIFICATE 块，或单个 DER 证书
pub fn parse_certificates(data: &[u8]) -> Result<Vec<X509Certificate>> {
    if !looks_like_pem(data) {
        return Ok(vec![X509Certificate::from_der(data)?]);
    }

    let blocks = pem::parse_many(data)
        .map_err(|e| PkiError::ParseError(format!("Failed to parse PEM bundle: {e}")))?;
    blocks
        .iter()
        .filter(|block| block.tag() == PEM_CERTIFICATE_TAG)
        .map(|block| X509Certificate::from_der(block.contents()))
        .collect()
}

/// X.509 时间转换为 OffsetDateTime
pub fn to_offset_datetime(time: &Time) -> Result<OffsetDateTime> {
    let secs = time.to_unix_duration().as_secs();
    let secs = i64::try_from(secs)
        .map_err(|_| PkiError::ParseError(format!("Time out of range: {time:?}")))?;
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| PkiError::ParseError(format!("Invalid time {time:?}: {e}")))
}

/// Authority Information Access 中的 OCSP 响应器地址
pub fn ocsp_responder_urls(cert: &X509Certificate) -> Vec<String> {
    let Some(ext) = cert.extension(&oids::AUTHORITY_INFO_ACCESS) else {
        return Vec::new();
    };

    match AuthorityInfoAccessSyntax::from_der(ext.extn_value.as_bytes()) {
        Ok(aia) => aia
            .0
            .iter()
            .filter(|ad| ad.access_method == oids::AD_OCSP)
            .filter_map(|ad| match &ad.access_location {
                GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
                _ => None,
            })
            .collect(),
        Err(e) => {
            tracing::warn!(subject = %cert.display_name(), error = %e, "ignoring malformed authorityInfoAccess");
            Vec::new()
        }
    }
}

/// CRL Distribution Points 中的 URI
pub fn crl_distribution_urls(cert: &X509Certificate) -> Vec<String> {
    let Some(ext) = cert.extension(&oids::CRL_DISTRIBUTION_POINTS) else {
        return Vec::new();
    };

    let points = match CrlDistributionPoints::from_der(ext.extn_value.as_bytes()) {
        Ok(points) => points,
        Err(e) => {
            tracing::warn!(subject = %cert.display_name(), error = %e, "ignoring malformed cRLDistributionPoints");
            return Vec::new();
        }
    };

    let mut urls = Vec::new();
    for point in &points.0 {
        if let Some(DistributionPointName::FullName(names)) = &point.distribution_point {
            for name in names {
                if let GeneralName::UniformResourceIdentifier(uri) = name {
                    urls.push(uri.to_string());
                }
            }
        }
    }
    urls
}

fn looks_like_pem(data: &[u8]) -> bool {
    let trimmed = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map_or(&data[..0], |start| &data[start..]);
    trimmed.starts_with(b"-----BEGIN")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, CustomExtension, KeyPair};

    fn params_with_urls() -> CertificateParams {
        let mut params = CertificateParams::new(vec!["urls.test".to_string()]).unwrap();
        params.crl_distribution_points = vec![rcgen::CrlDistributionPoint {
            uris: vec!["http://crl.test/ca.crl".to_string()],
        }];
        // AIA: SEQUENCE { SEQUENCE { id-ad-ocsp, [6] "http://ocsp.test" } }
        let uri = b"http://ocsp.test";
        let mut access = vec![0x06, 0x08, 0x2b, 0x06, 0x01, 0x05, 0x05, 0x07, 0x30, 0x01];
        access.push(0x86);
        access.push(uri.len() as u8);
        access.extend_from_slice(uri);
        let mut description = vec![0x30, access.len() as u8];
        description.extend_from_slice(&access);
        let mut aia = vec![0x30, description.len() as u8];
        aia.extend_from_slice(&description);
        params
            .custom_extensions
            .push(CustomExtension::from_oid_content(&[1, 3, 6, 1, 5, 5, 7, 1, 1], aia));
        params
    }

    #[test]
    fn test_parse_pem_and_der() {
        let key_pair = KeyPair::generate().unwrap();
        let cert = CertificateParams::new(vec!["pem.test".to_string()])
            .unwrap()
            .self_signed(&key_pair)
            .unwrap();

        let from_pem = parse_certificate(cert.pem().as_bytes()).unwrap();
        let from_der = parse_certificate(cert.der()).unwrap();
        assert_eq!(from_pem, from_der);
    }

    #[test]
    fn test_parse_bundle() {
        let mut bundle = String::new();
        for name in ["a.test", "b.test"] {
            let key_pair = KeyPair::generate().unwrap();
            let cert = CertificateParams::new(vec![name.to_string()])
                .unwrap()
                .self_signed(&key_pair)
                .unwrap();
            bundle.push_str(&cert.pem());
        }
        assert_eq!(parse_certificates(bundle.as_bytes()).unwrap().len(), 2);
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(
            parse_certificate(b"not a certificate"),
            Err(PkiError::ParseError(_))
        ));
    }

    #[test]
    fn test_locator_urls() {
        let key_pair = KeyPair::generate().unwrap();
        let cert = params_with_urls().self_signed(&key_pair).unwrap();
        let cert = X509Certificate::from_der(cert.der()).unwrap();

        assert_eq!(ocsp_responder_urls(&cert), vec!["http://ocsp.test".to_string()]);
        assert_eq!(crl_distribution_urls(&cert), vec!["http://crl.test/ca.crl".to_string()]);
    }

    #[test]
    fn test_no_locators() {
        let key_pair = KeyPair::generate().unwrap();
        let cert = CertificateParams::new(vec!["plain.test".to_string()])
            .unwrap()
            .self_signed(&key_pair)
            .unwrap();
        let cert = X509Certificate::from_der(cert.der()).unwrap();
        assert!(ocsp_responder_urls(&cert).is_empty());
        assert!(crl_distribution_urls(&cert).is_empty());
    }
}
