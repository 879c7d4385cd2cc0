//! 验证编排器
//!
//! 一次验证：过期预检 → 聚合信任锚 → 按模式分派到路径验证、CRL 或 OCSP 检查，
//! 最终给出单一结论及原因链

use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use time::OffsetDateTime;

use crate::{
    cert::{CertificateChain, X509Certificate},
    chain::{
        AggregationMode, ChainValidator, CrlSource, ExemptionPolicy, OcspSource, TrustAnchorAggregator,
        TrustAnchorSet, ValidationRequest,
    },
    config::VerifierConfig,
    error::{PkiError, Result as PkiResult},
    status::{
        CrlRevocationChecker, HttpTransport, OcspRevocationChecker, RevocationChecker, RevocationReport,
        RevocationTransport,
    },
    store::{sources_from_config, MemoryStore, StoreSource},
    types::format_time,
};

/// 调用方提供的 CRL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrlInput {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// 验证模式
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VerificationMode {
    /// 仅路径验证
    #[default]
    ChainOnly,
    /// 从证书的 CRL 分发点下载 CRL
    CrlDistributionPoint,
    /// 使用调用方提供的 CRL
    CrlFile(CrlInput),
    /// 使用证书 AIA 中的 OCSP 响应器
    OcspAia,
    /// 使用调用方指定的 OCSP 响应器
    OcspUrl(String),
}

impl VerificationMode {
    pub fn name(&self) -> &'static str {
        match self {
            VerificationMode::ChainOnly => "chain-only",
            VerificationMode::CrlDistributionPoint => "crl-distribution-point",
            VerificationMode::CrlFile(_) => "crl-file",
            VerificationMode::OcspAia => "ocsp-aia",
            VerificationMode::OcspUrl(_) => "ocsp-url",
        }
    }
}

impl fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 验证请求
#[derive(Debug, Clone)]
pub struct VerifyRequest<'a> {
    /// 待验证证书
    pub certificate: &'a X509Certificate,
    /// 证书自带的证书链
    pub chain: Option<&'a CertificateChain>,
    pub mode: VerificationMode,
    /// 评估时刻，缺省为当前时间
    pub instant: Option<OffsetDateTime>,
}

impl<'a> VerifyRequest<'a> {
    pub fn new(certificate: &'a X509Certificate, mode: VerificationMode) -> Self {
        Self {
            certificate,
            chain: None,
            mode,
            instant: None,
        }
    }

    pub fn with_chain(mut self, chain: &'a CertificateChain) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn at(mut self, instant: OffsetDateTime) -> Self {
        self.instant = Some(instant);
        self
    }
}

/// 验证结论
#[derive(Debug)]
pub enum Verdict {
    /// 验证通过
    Passed {
        mode: &'static str,
        warnings: Vec<String>,
    },
    /// 验证失败
    Failed { mode: &'static str, error: PkiError },
    /// 证书已过期，未做评估
    Expired { not_after: OffsetDateTime },
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        matches!(self, Verdict::Passed { .. })
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Verdict::Expired { .. })
    }

    pub fn error(&self) -> Option<&PkiError> {
        match self {
            Verdict::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            Verdict::Passed { warnings, .. } => warnings,
            _ => &[],
        }
    }

    /// 一句话结论
    pub fn summary(&self) -> String {
        match self {
            Verdict::Passed { mode, .. } => format!("Certificate verified ({mode})"),
            Verdict::Failed { error, .. } => error.summary().to_string(),
            Verdict::Expired { .. } => "Certificate has expired and was not evaluated".to_string(),
        }
    }

    /// 原因链，从最外层错误到最底层来源
    pub fn causes(&self) -> Vec<String> {
        match self {
            Verdict::Passed { .. } => Vec::new(),
            Verdict::Failed { error, .. } => {
                let mut causes = vec![error.to_string()];
                let mut source = error.source();
                while let Some(cause) = source {
                    causes.push(cause.to_string());
                    source = cause.source();
                }
                causes
            }
            Verdict::Expired { not_after } => vec![format!("Certificate expired at {}", format_time(not_after))],
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())?;
        for cause in self.causes() {
            write!(f, "\n  caused by: {cause}")?;
        }
        Ok(())
    }
}

/// 验证编排器
pub struct VerificationOrchestrator {
    sources: Vec<StoreSource>,
    aggregator: TrustAnchorAggregator,
    validator: ChainValidator,
    crl_checker: CrlRevocationChecker,
    ocsp_checker: OcspRevocationChecker,
}

impl VerificationOrchestrator {
    /// 使用 HTTP 传输创建编排器
    pub fn new(config: &VerifierConfig, sources: Vec<StoreSource>) -> PkiResult<Self> {
        let transport = Arc::new(HttpTransport::new(config)?);
        Self::with_transport(config, sources, transport)
    }

    /// 按配置组装信任来源并创建编排器
    pub fn from_config(config: &VerifierConfig, working_set: MemoryStore) -> PkiResult<Self> {
        Self::new(config, sources_from_config(config, working_set)?)
    }

    pub fn with_transport(
        config: &VerifierConfig,
        sources: Vec<StoreSource>,
        transport: Arc<dyn RevocationTransport>,
    ) -> PkiResult<Self> {
        Ok(Self {
            sources,
            aggregator: TrustAnchorAggregator::default(),
            validator: ChainValidator::from_config(config)?,
            crl_checker: CrlRevocationChecker::new(transport.clone()),
            ocsp_checker: OcspRevocationChecker::new(transport)
                .with_signature_verification(config.verify_ocsp_signature),
        })
    }

    pub fn with_aggregation_mode(mut self, mode: AggregationMode) -> Self {
        self.aggregator = TrustAnchorAggregator::new(mode);
        self
    }

    pub fn with_exemption_policy(mut self, policy: impl ExemptionPolicy + 'static) -> Self {
        self.validator = self.validator.with_exemption_policy(policy);
        self
    }

    pub fn sources(&self) -> &[StoreSource] {
        &self.sources
    }

    /// 本次验证可用的信任锚
    pub fn anchors_for(&self, chain: Option<&CertificateChain>) -> TrustAnchorSet {
        self.aggregator.build(&self.sources, chain)
    }

    /// 执行一次验证
    pub fn verify(&self, request: &VerifyRequest<'_>) -> Verdict {
        let instant = request.instant.unwrap_or_else(OffsetDateTime::now_utc);
        let mode = request.mode.name();
        let info = &request.certificate.info;

        if info.is_expired_at(instant) {
            tracing::info!(
                subject = %request.certificate.display_name(),
                not_after = %format_time(&info.not_after),
                "certificate already expired, skipping verification"
            );
            return Verdict::Expired {
                not_after: info.not_after,
            };
        }

        match self.run(request, instant) {
            Ok(warnings) => {
                tracing::info!(subject = %request.certificate.display_name(), mode, "certificate verified");
                Verdict::Passed { mode, warnings }
            }
            Err(error) => {
                tracing::warn!(
                    subject = %request.certificate.display_name(),
                    mode,
                    error = %error,
                    "certificate verification failed"
                );
                Verdict::Failed { mode, error }
            }
        }
    }

    fn run(&self, request: &VerifyRequest<'_>, instant: OffsetDateTime) -> PkiResult<Vec<String>> {
        let anchors = self.anchors_for(request.chain);
        if anchors.is_empty() {
            return Err(PkiError::EmptyTrustStore);
        }

        let base = ValidationRequest::new(request.certificate, &anchors)
            .with_chain(request.chain)
            .at(instant);

        let report = match &request.mode {
            VerificationMode::ChainOnly => return Ok(self.validator.validate(&base)?.warnings),
            VerificationMode::CrlDistributionPoint => self.check_crl(base.with_crl_source(CrlSource::DistributionPoint))?,
            VerificationMode::CrlFile(CrlInput::Path(path)) => {
                self.check_crl(base.with_crl_source(CrlSource::File(path.clone())))?
            }
            VerificationMode::CrlFile(CrlInput::Bytes(data)) => {
                self.check_crl(base.with_crl_source(CrlSource::Buffer(data.clone())))?
            }
            VerificationMode::OcspAia => self
                .ocsp_checker
                .check(&self.validator, &base.with_ocsp_source(OcspSource::Aia))?,
            VerificationMode::OcspUrl(url) => self
                .ocsp_checker
                .check(&self.validator, &base.with_ocsp_source(OcspSource::Url(url.clone())))?,
        };

        let RevocationReport { verdict, warnings, .. } = report;
        verdict.into_result()?;
        Ok(warnings)
    }

    fn check_crl(&self, request: ValidationRequest<'_>) -> PkiResult<RevocationReport> {
        self.crl_checker.check(&self.validator, &request)
    }
}
