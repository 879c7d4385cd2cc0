//! Signature verification over DER-encoded SubjectPublicKeyInfo
//!
//! Certificates, CRLs and OCSP responses are all "TBS bytes + algorithm OID +
//! signature bytes"; this module checks that triple against an issuer key.

use der::oid::ObjectIdentifier;
use rsa::{pkcs1v15, RsaPublicKey};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use signature::Verifier;
use spki::DecodePublicKey;

use crate::error::{Error, Result};

/// Signature algorithms accepted for certificate, CRL and OCSP signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// sha1WithRSAEncryption (legacy, still seen on old CRLs)
    RsaSha1,
    /// sha256WithRSAEncryption
    RsaSha256,
    /// sha384WithRSAEncryption
    RsaSha384,
    /// sha512WithRSAEncryption
    RsaSha512,
    /// ecdsa-with-SHA256 over P-256
    EcdsaP256Sha256,
    /// ecdsa-with-SHA384 over P-384
    EcdsaP384Sha384,
    /// Ed25519
    Ed25519,
}

impl SignatureAlgorithm {
    /// Map an AlgorithmIdentifier OID to a supported algorithm
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self> {
        match oid.to_string().as_str() {
            "1.2.840.113549.1.1.5" => Ok(Self::RsaSha1),
            "1.2.840.113549.1.1.11" => Ok(Self::RsaSha256),
            "1.2.840.113549.1.1.12" => Ok(Self::RsaSha384),
            "1.2.840.113549.1.1.13" => Ok(Self::RsaSha512),
            "1.2.840.10045.4.3.2" => Ok(Self::EcdsaP256Sha256),
            "1.2.840.10045.4.3.3" => Ok(Self::EcdsaP384Sha384),
            "1.3.101.112" => Ok(Self::Ed25519),
            other => Err(Error::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// Human-readable algorithm name
    pub fn name(&self) -> &'static str {
        match self {
            Self::RsaSha1 => "sha1WithRSAEncryption",
            Self::RsaSha256 => "sha256WithRSAEncryption",
            Self::RsaSha384 => "sha384WithRSAEncryption",
            Self::RsaSha512 => "sha512WithRSAEncryption",
            Self::EcdsaP256Sha256 => "ecdsa-with-SHA256",
            Self::EcdsaP384Sha384 => "ecdsa-with-SHA384",
            Self::Ed25519 => "Ed25519",
        }
    }
}

/// Verify `signature` over `message` with the key in `spki_der`
///
/// # Arguments
/// * `spki_der` - DER-encoded SubjectPublicKeyInfo of the signer
/// * `algorithm` - Signature AlgorithmIdentifier OID
/// * `message` - Signed bytes (usually a TBS structure)
/// * `signature` - Raw signature bytes (BIT STRING contents)
///
/// # Returns
/// `Ok(())` when the signature is valid
pub fn verify_signature(
    spki_der: &[u8],
    algorithm: &ObjectIdentifier,
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    let algorithm = SignatureAlgorithm::from_oid(algorithm)?;
    let failed = |_: signature::Error| {
        Error::InvalidSignature(format!("{} signature verification failed", algorithm.name()))
    };
    match algorithm {
        SignatureAlgorithm::RsaSha1 => verify_rsa::<Sha1>(spki_der, message, signature, failed),
        SignatureAlgorithm::RsaSha256 => verify_rsa::<Sha256>(spki_der, message, signature, failed),
        SignatureAlgorithm::RsaSha384 => verify_rsa::<Sha384>(spki_der, message, signature, failed),
        SignatureAlgorithm::RsaSha512 => verify_rsa::<Sha512>(spki_der, message, signature, failed),
        SignatureAlgorithm::EcdsaP256Sha256 => {
            let key = p256::ecdsa::VerifyingKey::from_public_key_der(spki_der)
                .map_err(|e| Error::InvalidKey(format!("P-256: {e}")))?;
            let sig = p256::ecdsa::Signature::from_der(signature)
                .map_err(|e| Error::InvalidSignature(format!("bad ECDSA signature bytes: {e}")))?;
            key.verify(message, &sig).map_err(failed)
        }
        SignatureAlgorithm::EcdsaP384Sha384 => {
            let key = p384::ecdsa::VerifyingKey::from_public_key_der(spki_der)
                .map_err(|e| Error::InvalidKey(format!("P-384: {e}")))?;
            let sig = p384::ecdsa::Signature::from_der(signature)
                .map_err(|e| Error::InvalidSignature(format!("bad ECDSA signature bytes: {e}")))?;
            key.verify(message, &sig).map_err(failed)
        }
        SignatureAlgorithm::Ed25519 => {
            let key = ed25519_dalek::VerifyingKey::from_public_key_der(spki_der)
                .map_err(|e| Error::InvalidKey(format!("Ed25519: {e}")))?;
            let sig = ed25519_dalek::Signature::from_slice(signature)
                .map_err(|e| Error::InvalidSignature(format!("bad Ed25519 signature bytes: {e}")))?;
            key.verify(message, &sig).map_err(failed)
        }
    }
}

fn verify_rsa<D>(
    spki_der: &[u8],
    message: &[u8],
    signature: &[u8],
    failed: impl Fn(signature::Error) -> Error,
) -> Result<()>
where
    D: sha2::Digest + der::oid::AssociatedOid,
{
    let key = RsaPublicKey::from_public_key_der(spki_der)
        .map_err(|e| Error::InvalidKey(format!("RSA: {e}")))?;
    let verifying_key = pkcs1v15::VerifyingKey::<D>::new(key);
    let sig = pkcs1v15::Signature::try_from(signature)
        .map_err(|e| Error::InvalidSignature(format!("bad RSA signature bytes: {e}")))?;
    verifying_key.verify(message, &sig).map_err(failed)
}
