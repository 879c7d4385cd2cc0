//! 证书存储
//!
//! 信任锚来源：当前工作集、CA 证书包、操作系统根证书库

pub mod bundle;
pub mod memory;
pub mod native;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use bundle::CaBundleStore;
pub use memory::MemoryStore;
pub use native::NativeRootStore;

use crate::{
    cert::X509Certificate,
    config::VerifierConfig,
    error::Result as PkiResult,
};

/// 只读证书存储接口
pub trait CertificateStore: Send + Sync {
    /// 按稳定顺序列出所有别名
    fn aliases(&self) -> Vec<String>;

    /// 按别名获取证书
    fn get(&self, alias: &str) -> PkiResult<&X509Certificate>;

    fn len(&self) -> usize {
        self.aliases().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 存储来源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreKind {
    /// 用户当前打开的证书集合
    WorkingSet,
    /// 专用 CA 证书包
    CaBundle,
    /// 操作系统根证书库
    OsRoots,
    /// 待验证证书自带的证书链（回退来源）
    OwnChain,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreKind::WorkingSet => "working-set",
            StoreKind::CaBundle => "ca-bundle",
            StoreKind::OsRoots => "os-roots",
            StoreKind::OwnChain => "own-chain",
        };
        f.write_str(name)
    }
}

/// 一个信任来源：存储 + 类型 + 用户偏好开关
pub struct StoreSource {
    pub kind: StoreKind,
    /// 用户偏好；强制模式下 CA 包与系统根证书忽略此开关
    pub enabled: bool,
    pub store: Box<dyn CertificateStore>,
}

impl StoreSource {
    pub fn new(kind: StoreKind, enabled: bool, store: impl CertificateStore + 'static) -> Self {
        Self {
            kind,
            enabled,
            store: Box::new(store),
        }
    }
}

impl fmt::Debug for StoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSource")
            .field("kind", &self.kind)
            .field("enabled", &self.enabled)
            .field("certificates", &self.store.len())
            .finish()
    }
}

/// 按配置组装信任来源，顺序即优先级：工作集、CA 包、系统根证书
///
/// CA 包未配置路径、系统根证书库不可用时，对应来源直接省略
pub fn sources_from_config(config: &VerifierConfig, working_set: MemoryStore) -> PkiResult<Vec<StoreSource>> {
    let mut sources = vec![StoreSource::new(
        StoreKind::WorkingSet,
        config.use_working_set,
        working_set,
    )];

    if let Some(path) = &config.ca_bundle_path {
        let bundle = CaBundleStore::load(path)?;
        sources.push(StoreSource::new(StoreKind::CaBundle, config.use_ca_bundle, bundle));
    }

    if let Some(native) = NativeRootStore::probe() {
        sources.push(StoreSource::new(StoreKind::OsRoots, config.use_os_roots, native));
    }

    Ok(sources)
}
