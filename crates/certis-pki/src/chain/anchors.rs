//! 信任锚聚合
//!
//! 按优先级合并各来源中的 CA 证书；全部为空时回退到证书自带链中的 CA 证书

use serde::{Deserialize, Serialize};

use crate::{
    cert::{CertificateChain, X509Certificate},
    store::{StoreKind, StoreSource},
};

/// 聚合模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AggregationMode {
    /// 尊重用户偏好：跳过被禁用的来源
    #[default]
    RespectPreferences,
    /// 强制模式：CA 包和系统根证书总是参与（用于检查 OCSP/时间戳服务器证书）
    Forced,
}

impl AggregationMode {
    fn consults(&self, source: &StoreSource) -> bool {
        match (self, source.kind) {
            (AggregationMode::Forced, StoreKind::CaBundle | StoreKind::OsRoots) => true,
            _ => source.enabled,
        }
    }
}

/// 信任锚
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustAnchor {
    /// 来源存储中的别名
    pub alias: String,
    pub source: StoreKind,
    pub certificate: X509Certificate,
}

/// 有序、按 DER 去重的信任锚集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustAnchorSet {
    anchors: Vec<TrustAnchor>,
}

impl TrustAnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入信任锚；DER 相同的证书只保留第一次出现
    pub fn push(&mut self, anchor: TrustAnchor) -> bool {
        if self.contains(&anchor.certificate) {
            return false;
        }
        self.anchors.push(anchor);
        true
    }

    pub fn contains(&self, cert: &X509Certificate) -> bool {
        self.anchors.iter().any(|a| a.certificate == *cert)
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrustAnchor> {
        self.anchors.iter()
    }

    /// 主体与 `cert` 颁发者一致且签名可验证的第一个信任锚
    pub fn find_issuer_of(&self, cert: &X509Certificate) -> Option<&TrustAnchor> {
        self.anchors.iter().find(|anchor| {
            cert.is_issued_by_name(&anchor.certificate) && cert.verify_signed_by(&anchor.certificate).is_ok()
        })
    }

    /// 公钥能验证 `cert` 签名的第一个信任锚（不比较名称）
    pub fn find_signer_of(&self, cert: &X509Certificate) -> Option<&TrustAnchor> {
        self.anchors
            .iter()
            .find(|anchor| cert.verify_signed_by(&anchor.certificate).is_ok())
    }
}

impl<'a> IntoIterator for &'a TrustAnchorSet {
    type Item = &'a TrustAnchor;
    type IntoIter = std::slice::Iter<'a, TrustAnchor>;

    fn into_iter(self) -> Self::IntoIter {
        self.anchors.iter()
    }
}

/// 信任锚聚合器
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustAnchorAggregator {
    mode: AggregationMode,
}

impl TrustAnchorAggregator {
    pub fn new(mode: AggregationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> AggregationMode {
        self.mode
    }

    /// 聚合信任锚
    ///
    /// 只收录 CA 证书（basicConstraints cA 为真，且 keyUsage 存在时必须含 keyCertSign）。
    /// 所有来源都没有贡献时，从 `own_chain` 中提取 CA 证书作为回退。
    /// 结果可能为空，由验证器报告。
    pub fn build(&self, sources: &[StoreSource], own_chain: Option<&CertificateChain>) -> TrustAnchorSet {
        let mut anchors = TrustAnchorSet::new();

        for source in sources {
            if !self.mode.consults(source) {
                tracing::debug!(source = %source.kind, "trust source disabled by preference");
                continue;
            }

            let mut added = 0usize;
            for alias in source.store.aliases() {
                let cert = match source.store.get(&alias) {
                    Ok(cert) => cert,
                    Err(e) => {
                        tracing::warn!(source = %source.kind, alias = %alias, error = %e, "skipping unreadable store entry");
                        continue;
                    }
                };
                if !cert.info.is_ca_capable() {
                    continue;
                }
                if anchors.push(TrustAnchor {
                    alias,
                    source: source.kind,
                    certificate: cert.clone(),
                }) {
                    added += 1;
                }
            }
            tracing::debug!(source = %source.kind, anchors = added, "collected trust anchors");
        }

        if anchors.is_empty() {
            if let Some(chain) = own_chain {
                for (index, cert) in chain.iter().enumerate() {
                    if cert.info.is_ca_capable() {
                        anchors.push(TrustAnchor {
                            alias: format!("entry{index}"),
                            source: StoreKind::OwnChain,
                            certificate: cert.clone(),
                        });
                    }
                }
                tracing::debug!(anchors = anchors.len(), "fell back to certificate's own chain");
            }
        }

        anchors
    }
}
