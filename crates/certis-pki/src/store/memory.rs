use crate::{
    cert::X509Certificate,
    error::{PkiError, Result as PkiResult},
};

use super::CertificateStore;

/// 内存证书存储，保持插入顺序
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Vec<(String, X509Certificate)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入证书；别名已存在时替换原证书并保持原位置
    pub fn insert(&mut self, alias: impl Into<String>, cert: X509Certificate) {
        let alias = alias.into();
        match self.entries.iter_mut().find(|(a, _)| *a == alias) {
            Some(entry) => entry.1 = cert,
            None => self.entries.push((alias, cert)),
        }
    }

    /// 以 `entry{index}` 为别名批量构建
    pub fn from_certificates(certs: impl IntoIterator<Item = X509Certificate>) -> Self {
        let mut store = Self::new();
        for (index, cert) in certs.into_iter().enumerate() {
            store.insert(format!("entry{index}"), cert);
        }
        store
    }
}

impl CertificateStore for MemoryStore {
    fn aliases(&self) -> Vec<String> {
        self.entries.iter().map(|(alias, _)| alias.clone()).collect()
    }

    fn get(&self, alias: &str) -> PkiResult<&X509Certificate> {
        self.entries
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, cert)| cert)
            .ok_or_else(|| PkiError::CertificateNotFound(alias.to_string()))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{CertificateParams, KeyPair};

    fn cert(name: &str) -> X509Certificate {
        let key_pair = KeyPair::generate().unwrap();
        let cert = CertificateParams::new(vec![name.to_string()])
            .unwrap()
            .self_signed(&key_pair)
            .unwrap();
        X509Certificate::from_der(cert.der()).unwrap()
    }

    #[test]
    fn test_insertion_order_and_replace() {
        let mut store = MemoryStore::new();
        store.insert("b", cert("b.test"));
        store.insert("a", cert("a.test"));
        let replacement = cert("b2.test");
        store.insert("b", replacement.clone());

        assert_eq!(store.aliases(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(store.get("b").unwrap(), &replacement);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_missing_alias() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert!(matches!(store.get("nope"), Err(PkiError::CertificateNotFound(_))));
    }

    #[test]
    fn test_from_certificates() {
        let store = MemoryStore::from_certificates(vec![cert("x.test"), cert("y.test")]);
        assert_eq!(store.aliases(), vec!["entry0".to_string(), "entry1".to_string()]);
        assert_eq!(store.get("entry1").unwrap().info.subject, cert("y.test").info.subject);
    }
}
