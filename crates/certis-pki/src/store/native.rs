use crate::{
    cert::X509Certificate,
    error::Result as PkiResult,
};

use super::{CertificateStore, MemoryStore};

/// 操作系统原生根证书库
#[derive(Debug, Clone)]
pub struct NativeRootStore {
    inner: MemoryStore,
}

impl NativeRootStore {
    /// 探测一次系统根证书库；平台不提供或一张都读不出时返回 None
    pub fn probe() -> Option<Self> {
        let result = rustls_native_certs::load_native_certs();
        for error in &result.errors {
            tracing::debug!(error = %error, "native root store reported an error");
        }

        let mut inner = MemoryStore::new();
        for (index, der) in result.certs.iter().enumerate() {
            // 无法解析的系统证书跳过
            match X509Certificate::from_der(der.as_ref()) {
                Ok(cert) => inner.insert(format!("os-root-{index}"), cert),
                Err(e) => tracing::debug!(index, error = %e, "skipping unparsable OS root"),
            }
        }

        if inner.is_empty() {
            tracing::info!("no OS-native root store available");
            return None;
        }
        tracing::debug!(certificates = inner.len(), "loaded OS-native root store");
        Some(Self { inner })
    }
}

impl CertificateStore for NativeRootStore {
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
