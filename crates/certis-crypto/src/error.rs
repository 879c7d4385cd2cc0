use thiserror::Error;

/// Crypto模块的错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// 不支持的签名算法
    #[error("Unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// 公钥无法解析
    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    /// 签名格式错误或验证失败
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("DER error: {0}")]
    DerError(#[from] der::Error),

    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

/// Result类型别名
pub type Result<T> = std::result::Result<T, Error>;
