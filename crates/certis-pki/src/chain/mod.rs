pub mod anchors;
pub mod exemption;
pub mod request;

use std::{collections::BTreeSet, fmt, sync::Arc};

use const_oid::ObjectIdentifier;

pub use anchors::{AggregationMode, TrustAnchor, TrustAnchorAggregator, TrustAnchorSet};
pub use exemption::{ExemptionPolicy, PrivateExtensionExemptions};
pub use request::{CrlSource, OcspSource, RevocationPolicy, ValidationRequest};

use crate::{
    cert::{oids, X509Certificate},
    config::VerifierConfig,
    error::{PkiError, Result as PkiResult},
    types::format_time,
};

/// 验证器原生处理的 critical 扩展
const NATIVE_CRITICAL_EXTENSIONS: [ObjectIdentifier; 6] = [
    oids::BASIC_CONSTRAINTS,
    oids::KEY_USAGE,
    oids::EXTENDED_KEY_USAGE,
    oids::SUBJECT_ALT_NAME,
    oids::ISSUER_ALT_NAME,
    oids::CERTIFICATE_POLICIES,
];

/// CRL 条目中的 removeFromCRL 原因码
const REMOVE_FROM_CRL: i32 = 8;

/// 已通过验证的证书路径
#[derive(Debug, Clone)]
pub struct ValidatedPath {
    /// 叶子在前，不含信任锚
    pub certificates: Vec<X509Certificate>,
    /// 终止路径的信任锚
    pub anchor: TrustAnchor,
    /// 警告信息
    pub warnings: Vec<String>,
}

impl ValidatedPath {
    pub fn target(&self) -> &X509Certificate {
        self.certificates.first().unwrap_or(&self.anchor.certificate)
    }

    /// 目标证书的签发者：路径中的下一张证书，否则为信任锚
    pub fn issuer_of_target(&self) -> &X509Certificate {
        self.certificates.get(1).unwrap_or(&self.anchor.certificate)
    }
}

/// 证书路径验证器
#[derive(Clone)]
pub struct ChainValidator {
    exemptions: Arc<dyn ExemptionPolicy>,
    /// 最大证书链深度
    max_path_depth: usize,
    /// 到期提醒阈值（天）
    expiry_warning_days: i64,
}

impl fmt::Debug for ChainValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainValidator")
            .field("exempt_oids", self.exemptions.supported_extension_oids())
            .field("max_path_depth", &self.max_path_depth)
            .field("expiry_warning_days", &self.expiry_warning_days)
            .finish()
    }
}

impl Default for ChainValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainValidator {
    /// 创建新的验证器
    pub fn new() -> Self {
        Self {
            exemptions: Arc::new(PrivateExtensionExemptions::default()),
            max_path_depth: 10,
            expiry_warning_days: 30,
        }
    }

    pub fn from_config(config: &VerifierConfig) -> PkiResult<Self> {
        config.validate()?;
        Ok(Self {
            exemptions: Arc::new(PrivateExtensionExemptions::new(config.exempt_oids()?)),
            max_path_depth: config.max_path_depth,
            expiry_warning_days: config.expiry_warning_days,
        })
    }

    pub fn with_exemption_policy(mut self, policy: impl ExemptionPolicy + 'static) -> Self {
        self.exemptions = Arc::new(policy);
        self
    }

    /// 设置最大证书链深度
    pub fn set_max_path_depth(&mut self, depth: usize) {
        self.max_path_depth = depth;
    }

    pub fn set_expiry_warning_days(&mut self, days: i64) {
        self.expiry_warning_days = days;
    }

    /// 验证证书路径
    pub fn validate(&self, request: &ValidationRequest<'_>) -> PkiResult<ValidatedPath> {
        if request.anchors.is_empty() {
            return Err(PkiError::EmptyTrustStore);
        }

        let mut path = request.candidate_path();

        // 链尾若本身就是信任锚，由信任锚终止路径
        while path.len() > 1 && path.last().is_some_and(|c| request.anchors.contains(c)) {
            path.pop();
        }

        if path.len() > self.max_path_depth {
            return Err(PkiError::path(format!(
                "certificate path length {} exceeds maximum allowed depth {}",
                path.len(),
                self.max_path_depth
            )));
        }

        let Some(top) = path.last() else {
            return Err(PkiError::path("certificate path is empty"));
        };

        let anchor = match request.anchors.find_issuer_of(top) {
            Some(anchor) => anchor.clone(),
            None => match request.anchors.iter().find(|a| path.len() == 1 && a.certificate == *top) {
                // 目标证书本身就是信任锚
                Some(anchor) => {
                    self.check_validity(top, request)?;
                    self.check_critical_extensions(top)?;
                    return Ok(ValidatedPath {
                        certificates: path,
                        anchor: anchor.clone(),
                        warnings: Vec::new(),
                    });
                }
                None => {
                    return Err(PkiError::path(format!(
                        "no trust anchor found for issuer '{}' of '{}'",
                        top.info.issuer,
                        top.display_name()
                    )))
                }
            },
        };

        tracing::debug!(
            target_subject = %request.target.display_name(),
            path_length = path.len(),
            anchor = %anchor.alias,
            anchor_source = %anchor.source,
            "validating certificate path"
        );

        let mut warnings = Vec::new();
        let mut working_issuer = &anchor.certificate;
        let mut max_path_length = path.len();

        // 自信任锚向叶子逐个处理
        for (index, cert) in path.iter().enumerate().rev() {
            if !cert.is_issued_by_name(working_issuer) {
                return Err(PkiError::path(format!(
                    "issuer of '{}' does not match subject of '{}'",
                    cert.display_name(),
                    working_issuer.display_name()
                )));
            }

            cert.verify_signed_by(working_issuer).map_err(|e| {
                PkiError::path(format!(
                    "signature of '{}' does not verify with key of '{}': {e}",
                    cert.display_name(),
                    working_issuer.display_name()
                ))
            })?;

            self.check_validity(cert, request)?;

            if request.revocation.check_revocation && request.revocation.crl_enabled {
                self.check_crls(cert, working_issuer, request, &mut warnings)?;
            }

            self.check_critical_extensions(cert)?;

            if index > 0 {
                if !cert.info.is_ca {
                    return Err(PkiError::path(format!(
                        "'{}' is not a CA certificate",
                        cert.display_name()
                    )));
                }
                if !cert.info.can_sign_certificates() {
                    return Err(PkiError::path(format!(
                        "keyUsage of '{}' does not permit certificate signing",
                        cert.display_name()
                    )));
                }
                if !cert.is_self_issued() {
                    if max_path_length == 0 {
                        return Err(PkiError::path(format!(
                            "path length constraint exceeded at '{}'",
                            cert.display_name()
                        )));
                    }
                    max_path_length -= 1;
                }
                if let Some(constraint) = cert.info.path_len_constraint {
                    max_path_length = max_path_length.min(usize::from(constraint));
                }
            }

            working_issuer = cert;
        }

        // 到期提醒
        for (index, cert) in path.iter().enumerate() {
            let days = cert.info.days_until_expiry_at(request.instant);
            if days >= 0 && days < self.expiry_warning_days {
                warnings.push(format!("Certificate at position {index} will expire in {days} days"));
            }
        }

        tracing::debug!(warnings = warnings.len(), "certificate path validated");
        Ok(ValidatedPath {
            certificates: path,
            anchor,
            warnings,
        })
    }

    fn check_validity(&self, cert: &X509Certificate, request: &ValidationRequest<'_>) -> PkiResult<()> {
        if cert.info.is_valid_at(request.instant) {
            return Ok(());
        }
        if cert.info.is_expired_at(request.instant) {
            Err(PkiError::path(format!(
                "'{}' expired at {}",
                cert.display_name(),
                format_time(&cert.info.not_after)
            )))
        } else {
            Err(PkiError::path(format!(
                "'{}' is not valid before {}",
                cert.display_name(),
                format_time(&cert.info.not_before)
            )))
        }
    }

    fn check_critical_extensions(&self, cert: &X509Certificate) -> PkiResult<()> {
        let mut unresolved: BTreeSet<ObjectIdentifier> = cert.critical_extension_oids();
        for oid in &NATIVE_CRITICAL_EXTENSIONS {
            unresolved.remove(oid);
        }
        self.exemptions.apply(cert, &mut unresolved);

        if unresolved.is_empty() {
            return Ok(());
        }
        let names: Vec<String> = unresolved.iter().map(|oid| oid.to_string()).collect();
        Err(PkiError::path(format!(
            "'{}' has unsupported critical extension(s): {}",
            cert.display_name(),
            names.join(", ")
        )))
    }

    fn check_crls(
        &self,
        cert: &X509Certificate,
        issuer: &X509Certificate,
        request: &ValidationRequest<'_>,
        warnings: &mut Vec<String>,
    ) -> PkiResult<()> {
        let mut covered = false;

        for crl in request.crls.iter().filter(|crl| crl.issuer() == cert.issuer()) {
            if let Err(e) = crl.verify_signed_by(issuer) {
                tracing::warn!(issuer = %issuer.display_name(), error = %e, "ignoring CRL with invalid signature");
                continue;
            }
            if crl.is_expired_at(request.instant) {
                warnings.push(format!(
                    "CRL from '{}' is past its next update time",
                    crl.issuer_name()
                ));
            }
            covered = true;

            if let Some(entry) = crl.entry_for(cert.serial()) {
                if entry.reason_code == REMOVE_FROM_CRL {
                    continue;
                }
                tracing::info!(
                    subject = %cert.display_name(),
                    serial = %entry.serial_number,
                    reason_code = entry.reason_code,
                    "certificate listed on CRL"
                );
                return Err(PkiError::Revoked {
                    reason_code: entry.reason_code,
                    revoked_at: entry.revoked_at,
                });
            }
        }

        if covered {
            Ok(())
        } else {
            Err(PkiError::RevocationStatusUnknown(format!(
                "no valid CRL from '{}' covers '{}'",
                cert.info.issuer,
                cert.display_name()
            )))
        }
    }
}
