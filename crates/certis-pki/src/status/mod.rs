//! 证书撤销状态检查
//!
//! - CRL（证书撤销列表）：分发点下载或调用方提供的文件
//! - OCSP（在线证书状态协议）：AIA 中的响应器地址或调用方指定地址

pub mod crl;
pub mod ocsp;
pub mod transport;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub use crl::{CrlRevocationChecker, RevocationEntry, RevocationList};
pub use ocsp::{OcspResponseStatus, OcspRevocationChecker};
pub use transport::{HttpTransport, RevocationTransport};

use crate::{
    chain::{ChainValidator, ValidatedPath, ValidationRequest},
    error::{PkiError, Result as PkiResult},
    types::RevocationReason,
};

/// 撤销检查结论
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevocationVerdict {
    /// 未撤销
    Good,
    /// 已撤销，reason_code 为 -1 表示未给出原因
    Revoked {
        reason_code: i32,
        #[serde(with = "time::serde::rfc3339")]
        revoked_at: OffsetDateTime,
    },
    /// 无法确定
    Unknown { cause: String },
}

impl RevocationVerdict {
    pub fn is_good(&self) -> bool {
        matches!(self, RevocationVerdict::Good)
    }

    /// 已知的撤销原因
    pub fn reason(&self) -> Option<RevocationReason> {
        match self {
            RevocationVerdict::Revoked { reason_code, .. } => RevocationReason::from_code(*reason_code),
            _ => None,
        }
    }

    /// Good 之外的结论转换为错误
    pub fn into_result(self) -> PkiResult<()> {
        match self {
            RevocationVerdict::Good => Ok(()),
            RevocationVerdict::Revoked {
                reason_code,
                revoked_at,
            } => Err(PkiError::Revoked {
                reason_code,
                revoked_at,
            }),
            RevocationVerdict::Unknown { cause } => Err(PkiError::RevocationStatusUnknown(cause)),
        }
    }
}

/// 撤销检查报告
#[derive(Debug, Clone)]
pub struct RevocationReport {
    pub verdict: RevocationVerdict,
    /// 检查过程中通过验证的路径
    pub path: Option<ValidatedPath>,
    /// 警告信息
    pub warnings: Vec<String>,
}

impl RevocationReport {
    pub fn new(verdict: RevocationVerdict) -> Self {
        Self {
            verdict,
            path: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: ValidatedPath) -> Self {
        self.warnings.extend(path.warnings.iter().cloned());
        self.path = Some(path);
        self
    }
}

/// 撤销检查策略
pub trait RevocationChecker: Send + Sync {
    /// 对请求中的目标证书做撤销检查；路径验证由 `validator` 完成
    fn check(&self, validator: &ChainValidator, request: &ValidationRequest<'_>) -> PkiResult<RevocationReport>;
}
