pub mod cert_utils;
pub mod oids;
pub mod types;

// 重新导出常用类型和函数
pub use cert_utils::{
    crl_distribution_urls, ocsp_responder_urls, parse_certificate, parse_certificates, to_offset_datetime,
};
pub use types::{CertificateChain, CertificateInfo, X509Certificate};
