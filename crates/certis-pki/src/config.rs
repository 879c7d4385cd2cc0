//! 验证器配置
//!
//! 提供配置结构、默认值与 JSON 文件加载

use std::{fs, path::Path, path::PathBuf, time::Duration};

use const_oid::ObjectIdentifier;
use serde::{Deserialize, Serialize};

use crate::{
    cert::oids,
    error::{PkiError, Result},
};

/// 验证器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// 偏好：使用当前工作集中的 CA 证书
    pub use_working_set: bool,
    /// 偏好：使用 CA 证书包
    pub use_ca_bundle: bool,
    /// 偏好：使用操作系统根证书库
    pub use_os_roots: bool,
    /// CA 证书包文件（PEM 包或 DER）
    pub ca_bundle_path: Option<PathBuf>,
    /// 最大证书路径长度
    pub max_path_depth: usize,
    /// 允许跳过的私有 critical 扩展 OID
    pub exempt_extension_oids: Vec<String>,
    /// 到期提醒阈值（天）
    pub expiry_warning_days: i64,
    /// OCSP 请求超时（秒）
    pub ocsp_timeout_secs: u64,
    /// CRL 下载超时（秒）
    pub crl_timeout_secs: u64,
    /// 是否验证 OCSP 响应签名
    pub verify_ocsp_signature: bool,
    /// HTTP User-Agent
    pub user_agent: String,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            use_working_set: true,
            use_ca_bundle: true,
            use_os_roots: false,
            ca_bundle_path: None,
            max_path_depth: 10,
            exempt_extension_oids: vec![oids::APPLE_CODE_SIGNING_DEV.to_string()],
            expiry_warning_days: 30,
            ocsp_timeout_secs: 10,
            crl_timeout_secs: 10,
            verify_ocsp_signature: true,
            user_agent: concat!("certis/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl VerifierConfig {
    /// 从 JSON 文件加载，缺省字段取默认值
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// 检查取值范围与 OID 格式
    pub fn validate(&self) -> Result<()> {
        if self.max_path_depth == 0 {
            return Err(PkiError::ConfigError(
                "max_path_depth must be at least 1".to_string(),
            ));
        }
        if self.ocsp_timeout_secs == 0 || self.crl_timeout_secs == 0 {
            return Err(PkiError::ConfigError("timeouts must be non-zero".to_string()));
        }
        self.exempt_oids().map(|_| ())
    }

    /// 解析豁免 OID 列表
    pub fn exempt_oids(&self) -> Result<Vec<ObjectIdentifier>> {
        self.exempt_extension_oids
            .iter()
            .map(|s| {
                ObjectIdentifier::new(s)
                    .map_err(|e| PkiError::ConfigError(format!("Invalid extension OID '{s}': {e}")))
            })
            .collect()
    }

    pub fn ocsp_timeout(&self) -> Duration {
        Duration::from_secs(self.ocsp_timeout_secs)
    }

    pub fn crl_timeout(&self) -> Duration {
        Duration::from_secs(self.crl_timeout_secs)
    }
}
