//! # Certis - 证书信任与撤销验证
//!
//! 判断一张证书此刻是否应当被信任
//!
//! ## 模块
//!
//! - `certis_crypto` - 哈希与签名验证原语
//! - `certis_pki` - 信任锚聚合、路径验证、CRL/OCSP 撤销检查

// Re-export all sub-crates
pub use certis_crypto;
pub use certis_pki;
