use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::anchors::TrustAnchorSet;
use crate::{
    cert::{CertificateChain, X509Certificate},
    status::crl::RevocationList,
};

/// 撤销检查开关，随单次请求传递
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RevocationPolicy {
    pub check_revocation: bool,
    /// 路径验证时按 CRL 检查每张证书；关闭时撤销状态由调用方另行查询（OCSP）
    pub crl_enabled: bool,
}

impl RevocationPolicy {
    /// 不做撤销检查
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn crl() -> Self {
        Self {
            check_revocation: true,
            crl_enabled: true,
        }
    }

    /// 路径只含目标证书，撤销状态由 OCSP 交换给出
    pub fn ocsp() -> Self {
        Self {
            check_revocation: true,
            crl_enabled: false,
        }
    }
}

/// CRL 来源
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CrlSource {
    /// 证书的 cRLDistributionPoints
    DistributionPoint,
    /// 本地文件（DER 或 PEM）
    File(PathBuf),
    /// 内存缓冲区（DER 或 PEM）
    Buffer(Vec<u8>),
    #[default]
    None,
}

/// OCSP 响应器来源
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OcspSource {
    /// 证书的 Authority Information Access
    Aia,
    /// 调用方指定的地址
    Url(String),
    #[default]
    None,
}

/// 单次路径验证请求
#[derive(Debug, Clone)]
pub struct ValidationRequest<'a> {
    pub target: &'a X509Certificate,
    pub chain: Option<&'a CertificateChain>,
    pub anchors: &'a TrustAnchorSet,
    pub revocation: RevocationPolicy,
    pub crl_source: CrlSource,
    pub ocsp_source: OcspSource,
    /// 已加载、供本次验证使用的 CRL
    pub crls: Vec<RevocationList>,
    /// 评估时刻
    pub instant: OffsetDateTime,
}

impl<'a> ValidationRequest<'a> {
    pub fn new(target: &'a X509Certificate, anchors: &'a TrustAnchorSet) -> Self {
        Self {
            target,
            chain: None,
            anchors,
            revocation: RevocationPolicy::disabled(),
            crl_source: CrlSource::None,
            ocsp_source: OcspSource::None,
            crls: Vec::new(),
            instant: OffsetDateTime::now_utc(),
        }
    }

    pub fn with_chain(mut self, chain: Option<&'a CertificateChain>) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_revocation(mut self, revocation: RevocationPolicy) -> Self {
        self.revocation = revocation;
        self
    }

    pub fn with_crl_source(mut self, source: CrlSource) -> Self {
        self.crl_source = source;
        self
    }

    pub fn with_ocsp_source(mut self, source: OcspSource) -> Self {
        self.ocsp_source = source;
        self
    }

    pub fn with_crls(mut self, crls: Vec<RevocationList>) -> Self {
        self.crls = crls;
        self
    }

    pub fn at(mut self, instant: OffsetDateTime) -> Self {
        self.instant = instant;
        self
    }

    /// 待验证路径（叶子在前，不含信任锚）
    ///
    /// 开启撤销检查时路径只含目标证书，由信任锚补全；
    /// 否则取证书链中从目标证书到链尾的部分，链中没有目标证书时把它放在链前
    pub fn candidate_path(&self) -> Vec<X509Certificate> {
        if self.revocation.check_revocation {
            return vec![self.target.clone()];
        }
        match self.chain {
            Some(chain) if chain.iter().any(|c| c == self.target) => chain.suffix_from(self.target).to_vec(),
            Some(chain) => std::iter::once(self.target.clone())
                .chain(chain.iter().cloned())
                .collect(),
            None => vec![self.target.clone()],
        }
    }
}
