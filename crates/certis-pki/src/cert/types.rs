use std::collections::BTreeSet;

use const_oid::ObjectIdentifier;
use der::{Decode, Encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use x509_cert::ext::pkix::{BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages};
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::Certificate;

use super::{cert_utils::to_offset_datetime, oids};
use crate::error::{PkiError, Result};

/// 证书信息结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateInfo {
    /// 序列号（十六进制）
    pub serial_number: String,
    /// 证书主体 (RFC 4514)
    pub subject: String,
    /// 颁发者 (RFC 4514)
    pub issuer: String,
    /// 生效时间
    #[serde(with = "time::serde::rfc3339")]
    pub not_before: OffsetDateTime,
    /// 过期时间
    #[serde(with = "time::serde::rfc3339")]
    pub not_after: OffsetDateTime,
    /// 证书用途，None 表示没有 keyUsage 扩展
    pub key_usage: Option<Vec<String>>,
    /// 扩展密钥用途 (OID)
    pub extended_key_usage: Vec<String>,
    /// basicConstraints cA 标志
    pub is_ca: bool,
    /// 证书链深度限制
    pub path_len_constraint: Option<u8>,
}

impl CertificateInfo {
    /// 检查证书在给定时刻是否在有效期内（两端包含）
    pub fn is_valid_at(&self, time: OffsetDateTime) -> bool {
        time >= self.not_before && time <= self.not_after
    }

    /// 检查证书在给定时刻是否已过期
    pub fn is_expired_at(&self, time: OffsetDateTime) -> bool {
        time > self.not_after
    }

    /// 获取证书在给定时刻的剩余有效天数
    pub fn days_until_expiry_at(&self, time: OffsetDateTime) -> i64 {
        (self.not_after - time).whole_days()
    }

    /// keyUsage 允许签发证书；没有 keyUsage 扩展时不做限制
    pub fn can_sign_certificates(&self) -> bool {
        self.key_usage
            .as_ref()
            .map_or(true, |usages| usages.iter().any(|u| u == "KeyCertSign"))
    }

    /// 可作为信任锚的 CA 证书
    pub fn is_ca_capable(&self) -> bool {
        self.is_ca && self.can_sign_certificates()
    }

    pub fn has_extended_key_usage(&self, oid: &ObjectIdentifier) -> bool {
        let oid = oid.to_string();
        self.extended_key_usage.iter().any(|eku| *eku == oid)
    }
}

/// X.509 证书包装结构
#[derive(Debug, Clone)]
pub struct X509Certificate {
    /// 证书DER格式数据
    pub der_data: Vec<u8>,
    /// 证书信息
    pub info: CertificateInfo,
    inner: Certificate,
}

impl PartialEq for X509Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der_data == other.der_data
    }
}

impl Eq for X509Certificate {}

impl X509Certificate {
    /// 从DER数据解析证书
    pub fn from_der(der_data: &[u8]) -> Result<Self> {
        let inner = Certificate::from_der(der_data)
            .map_err(|e| PkiError::ParseError(format!("Failed to parse DER certificate: {e}")))?;
        let info = extract_info(&inner)?;
        Ok(Self {
            der_data: der_data.to_vec(),
            info,
            inner,
        })
    }

    /// 底层 x509-cert 证书
    pub fn certificate(&self) -> &Certificate {
        &self.inner
    }

    pub fn serial(&self) -> &SerialNumber {
        &self.inner.tbs_certificate.serial_number
    }

    pub fn subject(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    /// DER 编码的 SubjectPublicKeyInfo
    pub fn spki_der(&self) -> Result<Vec<u8>> {
        Ok(self.inner.tbs_certificate.subject_public_key_info.to_der()?)
    }

    /// subjectPublicKey BIT STRING 的内容（OCSP issuerKeyHash 的输入）
    pub fn public_key_bytes(&self) -> &[u8] {
        self.inner
            .tbs_certificate
            .subject_public_key_info
            .subject_public_key
            .raw_bytes()
    }

    /// 颁发者字段与 `issuer` 的主体一致
    pub fn is_issued_by_name(&self, issuer: &X509Certificate) -> bool {
        self.issuer() == issuer.subject()
    }

    pub fn is_self_issued(&self) -> bool {
        self.issuer() == self.subject()
    }

    /// 用 `issuer` 的公钥验证本证书签名
    pub fn verify_signed_by(&self, issuer: &X509Certificate) -> Result<()> {
        let tbs = self.inner.tbs_certificate.to_der()?;
        certis_crypto::verify_signature(
            &issuer.spki_der()?,
            &self.inner.signature_algorithm.oid,
            &tbs,
            self.inner.signature.raw_bytes(),
        )?;
        Ok(())
    }

    pub fn extensions(&self) -> &[Extension] {
        self.inner
            .tbs_certificate
            .extensions
            .as_deref()
            .unwrap_or(&[])
    }

    pub fn extension(&self, oid: &ObjectIdentifier) -> Option<&Extension> {
        self.extensions().iter().find(|ext| ext.extn_id == *oid)
    }

    /// 所有标记为 critical 的扩展 OID
    pub fn critical_extension_oids(&self) -> BTreeSet<ObjectIdentifier> {
        self.extensions()
            .iter()
            .filter(|ext| ext.critical)
            .map(|ext| ext.extn_id)
            .collect()
    }

    /// 简短名称，用于日志和消息
    pub fn display_name(&self) -> &str {
        &self.info.subject
    }
}

/// 证书链，首个元素为叶子证书
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateChain {
    certificates: Vec<X509Certificate>,
}

impl CertificateChain {
    pub fn new(certificates: Vec<X509Certificate>) -> Result<Self> {
        if certificates.is_empty() {
            return Err(PkiError::ParseError(
                "Certificate chain must contain at least one certificate".to_string(),
            ));
        }
        Ok(Self { certificates })
    }

    /// 从 PEM 包或单个 DER 证书构建
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::new(super::parse_certificates(data)?)
    }

    pub fn leaf(&self) -> &X509Certificate {
        &self.certificates[0]
    }

    pub fn certificates(&self) -> &[X509Certificate] {
        &self.certificates
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&X509Certificate> {
        self.certificates.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, X509Certificate> {
        self.certificates.iter()
    }

    /// 从 `target` 开始截取到链尾；链中不含 `target` 时返回整条链
    pub fn suffix_from(&self, target: &X509Certificate) -> &[X509Certificate] {
        match self.certificates.iter().position(|c| c == target) {
            Some(index) => &self.certificates[index..],
            None => &self.certificates,
        }
    }
}

impl<'a> IntoIterator for &'a CertificateChain {
    type Item = &'a X509Certificate;
    type IntoIter = std::slice::Iter<'a, X509Certificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.certificates.iter()
    }
}

// 辅助函数：提取证书信息
fn extract_info(cert: &Certificate) -> Result<CertificateInfo> {
    let tbs = &cert.tbs_certificate;

    let mut is_ca = false;
    let mut path_len_constraint = None;
    let mut key_usage = None;
    let mut extended_key_usage = Vec::new();

    for ext in tbs.extensions.as_deref().unwrap_or(&[]) {
        let value = ext.extn_value.as_bytes();
        if ext.extn_id == oids::BASIC_CONSTRAINTS {
            let bc = BasicConstraints::from_der(value)
                .map_err(|e| PkiError::ParseError(format!("Invalid basicConstraints: {e}")))?;
            is_ca = bc.ca;
            path_len_constraint = bc.path_len_constraint;
        } else if ext.extn_id == oids::KEY_USAGE {
            let ku = KeyUsage::from_der(value)
                .map_err(|e| PkiError::ParseError(format!("Invalid keyUsage: {e}")))?;
            key_usage = Some(key_usage_names(&ku));
        } else if ext.extn_id == oids::EXTENDED_KEY_USAGE {
            let eku = ExtendedKeyUsage::from_der(value)
                .map_err(|e| PkiError::ParseError(format!("Invalid extendedKeyUsage: {e}")))?;
            extended_key_usage = eku.0.iter().map(|oid| oid.to_string()).collect();
        }
    }

    Ok(CertificateInfo {
        serial_number: hex::encode(tbs.serial_number.as_bytes()),
        subject: tbs.subject.to_string(),
        issuer: tbs.issuer.to_string(),
        not_before: to_offset_datetime(&tbs.validity.not_before)?,
        not_after: to_offset_datetime(&tbs.validity.not_after)?,
        key_usage,
        extended_key_usage,
        is_ca,
        path_len_constraint,
    })
}

fn key_usage_names(ku: &KeyUsage) -> Vec<String> {
    ku.0.into_iter()
        .map(|usage: KeyUsages| format!("{usage:?}"))
        .collect()
}
