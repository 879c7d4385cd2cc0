use std::{fs, path::Path};

use crate::{
    cert::{parse_certificates, X509Certificate},
    error::{PkiError, Result as PkiResult},
};

use super::{CertificateStore, MemoryStore};

/// CA 证书包存储（PEM 包或单个 DER 文件）
#[derive(Debug, Clone, Default)]
pub struct CaBundleStore {
    inner: MemoryStore,
}

impl CaBundleStore {
    /// 从文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> PkiResult<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let store = Self::from_bytes(&data).map_err(|e| {
            PkiError::ParseError(format!("CA bundle {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), certificates = store.len(), "loaded CA bundle");
        Ok(store)
    }

    /// 从内存中的 PEM/DER 数据构建
    pub fn from_bytes(data: &[u8]) -> PkiResult<Self> {
        let certs = parse_certificates(data)?;
        Ok(Self::from_certificates(certs))
    }

    /// 别名取证书主体，重复主体追加序号
    pub fn from_certificates(certs: Vec<X509Certificate>) -> Self {
        let mut inner = MemoryStore::new();
        for cert in certs {
            let mut alias = cert.info.subject.clone();
            let mut suffix = 1;
            while inner.get(&alias).is_ok() {
                suffix += 1;
                alias = format!("{} ({suffix})", cert.info.subject);
            }
            inner.insert(alias, cert);
        }
        Self { inner }
    }
}

impl CertificateStore for CaBundleStore {
    fn aliases(&self) -> Vec<String> {
        self.inner.aliases()
    }

    fn get(&self, alias: &str) -> PkiResult<&X509Certificate> {
        self.inner.get(alias)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
