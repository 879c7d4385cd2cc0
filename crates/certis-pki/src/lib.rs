//! Certis PKI - 证书信任与撤销验证
//!
//! 信任锚聚合、PKIX 路径验证、扩展豁免策略、CRL/OCSP 撤销检查，
//! 以及把它们串起来的验证编排器
//!
//! # 取消
//!
//! 验证是同步阻塞的，不接受取消令牌。一次验证最多发起的网络请求
//! 受 `VerifierConfig` 中 OCSP/CRL 超时的约束；需要提前放弃时，
//! 在工作线程中调用 `VerificationOrchestrator::verify` 并丢弃其结果，
//! 或提供一个自行检查取消标志的 `RevocationTransport` 实现。

pub mod cert;
pub mod chain;
pub mod config;
pub mod error;
pub mod status;
pub mod store;
pub mod types;
pub mod verify;

// 重新导出常用类型
pub use cert::{parse_certificate, parse_certificates, CertificateChain, CertificateInfo, X509Certificate};
pub use chain::{
    AggregationMode, ChainValidator, CrlSource, ExemptionPolicy, OcspSource, PrivateExtensionExemptions,
    RevocationPolicy, TrustAnchor, TrustAnchorAggregator, TrustAnchorSet, ValidatedPath, ValidationRequest,
};
pub use config::VerifierConfig;
pub use error::{PkiError, Result};
pub use status::{
    crl::{CrlRevocationChecker, RevocationList},
    ocsp::{OcspResponseStatus, OcspRevocationChecker},
    transport::{HttpTransport, RevocationTransport},
    RevocationChecker, RevocationReport, RevocationVerdict,
};
pub use store::{CaBundleStore, CertificateStore, MemoryStore, NativeRootStore, StoreKind, StoreSource};
pub use types::RevocationReason;
pub use verify::{CrlInput, VerificationMode, VerificationOrchestrator, Verdict, VerifyRequest};

/// 预导入模块，包含最常用的类型和函数
pub mod prelude {
    pub use crate::{
        cert::{parse_certificate, CertificateChain, X509Certificate},
        chain::{AggregationMode, TrustAnchorSet},
        config::VerifierConfig,
        error::{PkiError, Result},
        store::{CertificateStore, MemoryStore, StoreKind, StoreSource},
        verify::{VerificationMode, VerificationOrchestrator, Verdict, VerifyRequest},
    };
}
