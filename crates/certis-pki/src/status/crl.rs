use std::{fs, path::Path, sync::Arc};

use der::{Decode, Encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use x509_cert::crl::CertificateList;
use x509_cert::ext::pkix::CrlReason;
use x509_cert::name::Name;

use super::{transport::RevocationTransport, RevocationChecker, RevocationReport, RevocationVerdict};
use crate::{
    cert::{crl_distribution_urls, oids, to_offset_datetime, X509Certificate},
    chain::{ChainValidator, CrlSource, RevocationPolicy, ValidationRequest},
    error::{PkiError, Result as PkiResult},
};

const PEM_CRL_TAG: &str = "X509 CRL";

/// 撤销条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationEntry {
    /// 证书序列号（十六进制）
    pub serial_number: String,
    /// 撤销时间
    #[serde(with = "time::serde::rfc3339")]
    pub revoked_at: OffsetDateTime,
    /// 撤销原因码，-1 表示条目未携带 reasonCode
    pub reason_code: i32,
}

/// 已解析的 X.509 证书撤销列表
#[derive(Debug, Clone)]
pub struct RevocationList {
    inner: CertificateList,
    issuer_name: String,
    this_update: OffsetDateTime,
    next_update: Option<OffsetDateTime>,
    entries: Vec<RevocationEntry>,
}

impl RevocationList {
    /// 解析 DER 或 PEM (`-----BEGIN X509 CRL-----`) 格式的 CRL
    pub fn parse(data: &[u8]) -> PkiResult<Self> {
        let trimmed = data.trim_ascii_start();
        if trimmed.starts_with(b"-----BEGIN") {
            let block = pem::parse(trimmed)
                .map_err(|e| PkiError::malformed_crl(format!("invalid PEM: {e}"), None))?;
            if block.tag() != PEM_CRL_TAG {
                return Err(PkiError::malformed_crl(
                    format!("unexpected PEM block '{}'", block.tag()),
                    None,
                ));
            }
            return Self::from_der(block.contents());
        }
        Self::from_der(data)
    }

    /// 从文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> PkiResult<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| PkiError::transport(path.display().to_string(), e))?;
        let crl = Self::parse(&data)?;
        tracing::debug!(path = %path.display(), entries = crl.entries.len(), "loaded CRL file");
        Ok(crl)
    }

    pub fn from_der(der_data: &[u8]) -> PkiResult<Self> {
        let inner = CertificateList::from_der(der_data)
            .map_err(|e| PkiError::malformed_crl("invalid DER encoding", Some(e)))?;
        let tbs = &inner.tbs_cert_list;

        let this_update = to_offset_datetime(&tbs.this_update)?;
        let next_update = tbs.next_update.as_ref().map(to_offset_datetime).transpose()?;

        let mut entries = Vec::new();
        for revoked in tbs.revoked_certificates.as_deref().unwrap_or(&[]) {
            let reason_code = revoked
                .crl_entry_extensions
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .find(|ext| ext.extn_id == oids::CRL_REASON)
                .map_or(-1, |ext| match CrlReason::from_der(ext.extn_value.as_bytes()) {
                    Ok(reason) => reason as i32,
                    Err(e) => {
                        tracing::warn!(error = %e, "unreadable CRL entry reasonCode");
                        -1
                    }
                });
            entries.push(RevocationEntry {
                serial_number: hex::encode(revoked.serial_number.as_bytes()),
                revoked_at: to_offset_datetime(&revoked.revocation_date)?,
                reason_code,
            });
        }

        Ok(Self {
            issuer_name: tbs.issuer.to_string(),
            inner,
            this_update,
            next_update,
            entries,
        })
    }

    pub fn issuer(&self) -> &Name {
        &self.inner.tbs_cert_list.issuer
    }

    pub fn issuer_name(&self) -> &str {
        &self.issuer_name
    }

    pub fn this_update(&self) -> OffsetDateTime {
        self.this_update
    }

    pub fn next_update(&self) -> Option<OffsetDateTime> {
        self.next_update
    }

    pub fn entries(&self) -> &[RevocationEntry] {
        &self.entries
    }

    /// nextUpdate 早于给定时刻
    pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
        self.next_update.is_some_and(|next| next < instant)
    }

    /// 查找序列号对应的撤销条目
    pub fn entry_for(&self, serial: &x509_cert::serial_number::SerialNumber) -> Option<&RevocationEntry> {
        let serial = hex::encode(serial.as_bytes());
        self.entries.iter().find(|entry| entry.serial_number == serial)
    }

    /// 用签发证书的公钥验证 CRL 签名
    pub fn verify_signed_by(&self, issuer: &X509Certificate) -> PkiResult<()> {
        if let Some(usages) = &issuer.info.key_usage {
            if !usages.iter().any(|u| u == "CRLSign") {
                return Err(PkiError::malformed_crl(
                    format!("'{}' is not permitted to sign CRLs", issuer.display_name()),
                    None,
                ));
            }
        }
        let tbs = self.inner.tbs_cert_list.to_der()?;
        certis_crypto::verify_signature(
            &issuer.spki_der()?,
            &self.inner.signature_algorithm.oid,
            &tbs,
            self.inner.signature.raw_bytes(),
        )?;
        Ok(())
    }
}

/// 基于 CRL 的撤销检查
pub struct CrlRevocationChecker {
    transport: Arc<dyn RevocationTransport>,
}

impl CrlRevocationChecker {
    pub fn new(transport: Arc<dyn RevocationTransport>) -> Self {
        Self { transport }
    }

    /// 下载目标证书所有分发点上的 CRL；全部失败时返回最后一个错误
    fn fetch_distribution_points(&self, urls: &[String]) -> PkiResult<Vec<RevocationList>> {
        let mut crls = Vec::new();
        let mut last_error = None;

        for url in urls {
            match self.transport.fetch_crl(url).and_then(|data| RevocationList::parse(&data)) {
                Ok(crl) => {
                    tracing::debug!(url = %url, entries = crl.entries().len(), "fetched CRL");
                    crls.push(crl);
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "CRL distribution point failed");
                    last_error = Some(e);
                }
            }
        }

        match (crls.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(crls),
        }
    }
}

impl RevocationChecker for CrlRevocationChecker {
    fn check(&self, validator: &ChainValidator, request: &ValidationRequest<'_>) -> PkiResult<RevocationReport> {
        let loaded = match &request.crl_source {
            CrlSource::DistributionPoint => {
                let urls = crl_distribution_urls(request.target);
                if urls.is_empty() {
                    return Ok(RevocationReport::new(RevocationVerdict::Unknown {
                        cause: format!(
                            "'{}' has no CRL distribution point",
                            request.target.display_name()
                        ),
                    }));
                }
                self.fetch_distribution_points(&urls)?
            }
            CrlSource::File(path) => vec![RevocationList::load(path)?],
            CrlSource::Buffer(data) => vec![RevocationList::parse(data)?],
            CrlSource::None => Vec::new(),
        };

        let mut crls = request.crls.clone();
        crls.extend(loaded);
        let run = request
            .clone()
            .with_revocation(RevocationPolicy::crl())
            .with_crls(crls);

        match validator.validate(&run) {
            Ok(path) => Ok(RevocationReport::new(RevocationVerdict::Good).with_path(path)),
            Err(PkiError::Revoked {
                reason_code,
                revoked_at,
            }) => Ok(RevocationReport::new(RevocationVerdict::Revoked {
                reason_code,
                revoked_at,
            })),
            Err(PkiError::RevocationStatusUnknown(cause)) => {
                Ok(RevocationReport::new(RevocationVerdict::Unknown { cause }))
            }
            Err(e) => Err(e),
        }
    }
}
