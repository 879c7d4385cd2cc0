//! OCSP wire format (RFC 6960 section 4)
//!
//! ASN.1 structures are derived with `der`; `OcspRequestMessage` and
//! `OcspResponseMessage` are the value objects the checker works with.

use std::fmt;

use const_oid::ObjectIdentifier;
use der::asn1::{BitString, GeneralizedTime, Null, OctetString};
use der::{
    Any, Choice, Decode, DecodeValue, Encode, EncodeValue, FixedTag, Header, Length, Reader, Sequence, Tag, Writer,
};
use spki::AlgorithmIdentifierOwned;
use x509_cert::certificate::Version;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::Extensions;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::Certificate;

use crate::{
    cert::{oids, X509Certificate},
    error::{PkiError, Result as PkiResult},
};

// ============================================================================
// Request
// ============================================================================

/// ```text
/// CertID ::= SEQUENCE {
///     hashAlgorithm       AlgorithmIdentifier,
///     issuerNameHash      OCTET STRING,
///     issuerKeyHash       OCTET STRING,
///     serialNumber        CertificateSerialNumber }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct CertId {
    pub hash_algorithm: AlgorithmIdentifierOwned,
    pub issuer_name_hash: OctetString,
    pub issuer_key_hash: OctetString,
    pub serial_number: SerialNumber,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Request {
    pub req_cert: CertId,
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub single_request_extensions: Option<Extensions>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TbsRequest {
    #[asn1(context_specific = "0", default = "Default::default", tag_mode = "EXPLICIT")]
    pub version: Version,
    #[asn1(context_specific = "1", optional = "true", tag_mode = "EXPLICIT")]
    pub requestor_name: Option<GeneralName>,
    pub request_list: Vec<Request>,
    #[asn1(context_specific = "2", optional = "true", tag_mode = "EXPLICIT")]
    pub request_extensions: Option<Extensions>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct RequestSignature {
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub signature: BitString,
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub certs: Option<Vec<Certificate>>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct OcspRequest {
    pub tbs_request: TbsRequest,
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub optional_signature: Option<RequestSignature>,
}

// ============================================================================
// Response
// ============================================================================

/// OCSPResponseStatus; codes outside RFC 6960 are kept as `Unknown`
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OcspResponseStatus {
    Successful,
    MalformedRequest,
    InternalError,
    TryLater,
    SigRequired,
    Unauthorized,
    Unknown(u8),
}

impl OcspResponseStatus {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Successful,
            1 => Self::MalformedRequest,
            2 => Self::InternalError,
            3 => Self::TryLater,
            5 => Self::SigRequired,
            6 => Self::Unauthorized,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Successful => 0,
            Self::MalformedRequest => 1,
            Self::InternalError => 2,
            Self::TryLater => 3,
            Self::SigRequired => 5,
            Self::Unauthorized => 6,
            Self::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for OcspResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Successful => f.write_str("successful"),
            Self::MalformedRequest => f.write_str("malformed request"),
            Self::InternalError => f.write_str("internal error"),
            Self::TryLater => f.write_str("try later"),
            Self::SigRequired => f.write_str("signature required"),
            Self::Unauthorized => f.write_str("unauthorized"),
            Self::Unknown(code) => write!(f, "unknown status code {code}"),
        }
    }
}

impl FixedTag for OcspResponseStatus {
    const TAG: Tag = Tag::Enumerated;
}

impl<'a> DecodeValue<'a> for OcspResponseStatus {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        u8::decode_value(reader, header).map(Self::from_code)
    }
}

impl EncodeValue for OcspResponseStatus {
    fn value_len(&self) -> der::Result<Length> {
        self.code().value_len()
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.code().encode_value(writer)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ResponseBytes {
    pub response_type: ObjectIdentifier,
    pub response: OctetString,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct OcspResponse {
    pub response_status: OcspResponseStatus,
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub response_bytes: Option<ResponseBytes>,
}

#[derive(Clone, Debug, Eq, PartialEq, Choice)]
pub enum ResponderId {
    #[asn1(context_specific = "1", tag_mode = "EXPLICIT", constructed = "true")]
    ByName(Name),
    #[asn1(context_specific = "2", tag_mode = "EXPLICIT", constructed = "true")]
    ByKey(OctetString),
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct RevokedInfo {
    pub revocation_time: GeneralizedTime,
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub revocation_reason: Option<ReasonCode>,
}

/// CRLReason kept as the raw ENUMERATED value so unassigned codes still decode
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReasonCode(pub u8);

impl FixedTag for ReasonCode {
    const TAG: Tag = Tag::Enumerated;
}

impl<'a> DecodeValue<'a> for ReasonCode {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        u8::decode_value(reader, header).map(Self)
    }
}

impl EncodeValue for ReasonCode {
    fn value_len(&self) -> der::Result<Length> {
        self.0.value_len()
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.0.encode_value(writer)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Choice)]
pub enum CertStatus {
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT")]
    Good(Null),
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", constructed = "true")]
    Revoked(RevokedInfo),
    #[asn1(context_specific = "2", tag_mode = "IMPLICIT")]
    Unknown(Null),
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SingleResponse {
    pub cert_id: CertId,
    pub cert_status: CertStatus,
    pub this_update: GeneralizedTime,
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub next_update: Option<GeneralizedTime>,
    #[asn1(context_specific = "1", optional = "true", tag_mode = "EXPLICIT")]
    pub single_extensions: Option<Extensions>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ResponseData {
    #[asn1(context_specific = "0", default = "Default::default", tag_mode = "EXPLICIT")]
    pub version: Version,
    pub responder_id: ResponderId,
    pub produced_at: GeneralizedTime,
    pub responses: Vec<SingleResponse>,
    #[asn1(context_specific = "1", optional = "true", tag_mode = "EXPLICIT")]
    pub response_extensions: Option<Extensions>,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct BasicOcspResponse {
    pub tbs_response_data: ResponseData,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub signature: BitString,
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub certs: Option<Vec<Certificate>>,
}

// ============================================================================
// Value objects
// ============================================================================

/// Single-certificate OCSP request
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OcspRequestMessage {
    cert_id: CertId,
}

impl OcspRequestMessage {
    /// Identify `target` by SHA-1 hashes of its issuer's name and key plus its serial
    pub fn for_certificate(issuer: &X509Certificate, target: &X509Certificate) -> PkiResult<Self> {
        let name_hash = certis_crypto::sha1(&issuer.subject().to_der()?);
        let key_hash = certis_crypto::sha1(issuer.public_key_bytes());

        let cert_id = CertId {
            hash_algorithm: AlgorithmIdentifierOwned {
                oid: oids::SHA1,
                parameters: Some(Any::from_der(&[0x05, 0x00])?),
            },
            issuer_name_hash: OctetString::new(name_hash.to_vec())?,
            issuer_key_hash: OctetString::new(key_hash.to_vec())?,
            serial_number: target.serial().clone(),
        };
        Ok(Self { cert_id })
    }

    pub fn cert_id(&self) -> &CertId {
        &self.cert_id
    }

    /// DER-encoded OCSPRequest, unsigned, one entry
    pub fn to_der(&self) -> PkiResult<Vec<u8>> {
        let request = OcspRequest {
            tbs_request: TbsRequest {
                version: Version::V1,
                requestor_name: None,
                request_list: vec![Request {
                    req_cert: self.cert_id.clone(),
                    single_request_extensions: None,
                }],
                request_extensions: None,
            },
            optional_signature: None,
        };
        Ok(request.to_der()?)
    }
}

/// Parsed OCSPResponse
#[derive(Clone, Debug)]
pub struct OcspResponseMessage {
    status: OcspResponseStatus,
    basic: Option<BasicOcspResponse>,
}

impl OcspResponseMessage {
    pub fn from_der(data: &[u8]) -> PkiResult<Self> {
        let response = OcspResponse::from_der(data)
            .map_err(|e| PkiError::malformed_ocsp("invalid OCSPResponse encoding", Some(e)))?;

        let basic = match response.response_bytes {
            Some(bytes) if bytes.response_type == oids::OCSP_BASIC => Some(
                BasicOcspResponse::from_der(bytes.response.as_bytes())
                    .map_err(|e| PkiError::malformed_ocsp("invalid BasicOCSPResponse encoding", Some(e)))?,
            ),
            Some(bytes) => {
                return Err(PkiError::malformed_ocsp(
                    format!("unsupported response type {}", bytes.response_type),
                    None,
                ))
            }
            None => None,
        };

        if response.response_status == OcspResponseStatus::Successful && basic.is_none() {
            return Err(PkiError::malformed_ocsp(
                "successful response carries no response bytes",
                None,
            ));
        }

        Ok(Self {
            status: response.response_status,
            basic,
        })
    }

    pub fn status(&self) -> OcspResponseStatus {
        self.status
    }

    pub fn basic(&self) -> Option<&BasicOcspResponse> {
        self.basic.as_ref()
    }

    /// The first per-certificate entry
    pub fn single_response(&self) -> PkiResult<&SingleResponse> {
        self.basic
            .as_ref()
            .and_then(|basic| basic.tbs_response_data.responses.first())
            .ok_or_else(|| PkiError::malformed_ocsp("response contains no certificate status", None))
    }
}
