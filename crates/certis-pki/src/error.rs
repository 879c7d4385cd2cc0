use thiserror::Error;
use time::OffsetDateTime;

use crate::status::ocsp::OcspResponseStatus;

/// PKI模块的错误类型
#[derive(Error, Debug)]
pub enum PkiError {
    /// 没有任何可用的信任锚
    #[error("Trust store is empty: no CA certificates are available as trust anchors")]
    EmptyTrustStore,

    /// 证书路径验证失败
    #[error("Certificate path validation failed: {detail}")]
    PathValidationFailed { detail: String },

    /// 证书已撤销，reason_code 为 -1 表示未给出原因
    #[error("Certificate revoked at {revoked_at} (reason code {reason_code})")]
    Revoked {
        reason_code: i32,
        revoked_at: OffsetDateTime,
    },

    /// 撤销状态无法确定
    #[error("Revocation status undetermined: {0}")]
    RevocationStatusUnknown(String),

    /// OCSP 响应器返回非成功状态
    #[error("OCSP responder returned status {status}")]
    ResponderStatusError { status: OcspResponseStatus },

    /// OCSP 响应中的序列号与证书不一致
    #[error("OCSP response serial number {actual} does not match certificate serial number {expected}")]
    SerialMismatch { expected: String, actual: String },

    /// 找不到签发者证书
    #[error("Issuer certificate not found")]
    IssuerNotFound,

    /// OCSP 证书状态为 unknown
    #[error("OCSP certificate status is unknown: {0}")]
    UnknownCertStatus(String),

    /// OCSP 响应签名无效
    #[error("OCSP responder signature invalid: {0}")]
    ResponderSignatureInvalid(String),

    /// 证书没有 OCSP 响应器地址
    #[error("Certificate carries no OCSP responder URL")]
    MissingResponderUrl,

    /// 网络传输错误
    #[error("Transport error for {target}: {cause}")]
    Transport { target: String, cause: String },

    /// CRL 无法解析
    #[error("Malformed CRL: {reason}")]
    MalformedCrl {
        reason: String,
        #[source]
        source: Option<der::Error>,
    },

    /// OCSP 响应无法解析
    #[error("Malformed OCSP response: {reason}")]
    MalformedOcspResponse {
        reason: String,
        #[source]
        source: Option<der::Error>,
    },

    /// 证书未找到
    #[error("Certificate not found: {0}")]
    CertificateNotFound(String),

    /// 解析错误
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 配置错误
    #[error("Config error: {0}")]
    ConfigError(String),

    /// DER 编解码错误
    #[error("Encoding error: {0}")]
    EncodingError(#[from] der::Error),

    /// 密码学错误
    #[error("Crypto error: {0}")]
    CryptoError(#[from] certis_crypto::Error),

    /// IO错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl PkiError {
    pub(crate) fn path(detail: impl Into<String>) -> Self {
        PkiError::PathValidationFailed {
            detail: detail.into(),
        }
    }

    pub(crate) fn malformed_crl(reason: impl Into<String>, source: Option<der::Error>) -> Self {
        PkiError::MalformedCrl {
            reason: reason.into(),
            source,
        }
    }

    pub(crate) fn malformed_ocsp(reason: impl Into<String>, source: Option<der::Error>) -> Self {
        PkiError::MalformedOcspResponse {
            reason: reason.into(),
            source,
        }
    }

    pub(crate) fn transport(target: impl Into<String>, cause: impl ToString) -> Self {
        PkiError::Transport {
            target: target.into(),
            cause: cause.to_string(),
        }
    }

    /// 一句话概括，用于结果展示
    pub fn summary(&self) -> &'static str {
        match self {
            PkiError::EmptyTrustStore => "Trust store is empty",
            PkiError::PathValidationFailed { .. } => "Certificate path validation failed",
            PkiError::Revoked { .. } => "Certificate is revoked",
            PkiError::RevocationStatusUnknown(_) => "Revocation status could not be determined",
            PkiError::ResponderStatusError { .. } => "OCSP responder rejected the request",
            PkiError::SerialMismatch { .. } => "OCSP response does not match the certificate",
            PkiError::IssuerNotFound => "Issuer certificate not found",
            PkiError::UnknownCertStatus(_) => "OCSP responder does not know the certificate",
            PkiError::ResponderSignatureInvalid(_) => "OCSP response signature is invalid",
            PkiError::MissingResponderUrl => "No OCSP responder URL available",
            PkiError::Transport { .. } => "Revocation source unreachable",
            PkiError::MalformedCrl { .. } => "CRL could not be parsed",
            PkiError::MalformedOcspResponse { .. } => "OCSP response could not be parsed",
            PkiError::CertificateNotFound(_) => "Certificate not found",
            PkiError::ParseError(_) | PkiError::EncodingError(_) => "Certificate could not be parsed",
            PkiError::ConfigError(_) | PkiError::SerializationError(_) => "Invalid configuration",
            PkiError::CryptoError(_) => "Cryptographic check failed",
            PkiError::IoError(_) => "I/O failure",
        }
    }
}

/// PKI模块的Result类型
pub type Result<T> = std::result::Result<T, PkiError>;
