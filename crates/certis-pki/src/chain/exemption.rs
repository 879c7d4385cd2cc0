//! Critical-extension exemptions
//!
//! A path checker that claims a fixed set of private extension OIDs and
//! removes them from a certificate's unresolved-critical set, so vendor
//! extensions marked critical do not fail validation.

use std::collections::BTreeSet;

use const_oid::ObjectIdentifier;

use crate::{cert::oids, cert::X509Certificate, error::Result};

/// Hook invoked by the validator for every certificate in the path
pub trait ExemptionPolicy: Send + Sync {
    /// Extension OIDs this policy is prepared to handle
    fn supported_extension_oids(&self) -> &BTreeSet<ObjectIdentifier>;

    /// Remove handled OIDs from `unresolved`; must not add anything
    fn apply(&self, cert: &X509Certificate, unresolved: &mut BTreeSet<ObjectIdentifier>);
}

/// Allow-list of vendor-private extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateExtensionExemptions {
    oids: BTreeSet<ObjectIdentifier>,
}

impl Default for PrivateExtensionExemptions {
    fn default() -> Self {
        Self::new([oids::APPLE_CODE_SIGNING_DEV])
    }
}

impl PrivateExtensionExemptions {
    pub fn new(oids: impl IntoIterator<Item = ObjectIdentifier>) -> Self {
        Self {
            oids: oids.into_iter().collect(),
        }
    }

    /// Policy that exempts nothing
    pub fn none() -> Self {
        Self::new([])
    }

    pub fn from_oid_strings<S: AsRef<str>>(oids: &[S]) -> Result<Self> {
        let parsed = oids
            .iter()
            .map(|s| {
                ObjectIdentifier::new(s.as_ref()).map_err(|e| {
                    crate::error::PkiError::ConfigError(format!("Invalid extension OID '{}': {e}", s.as_ref()))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(parsed))
    }
}

impl ExemptionPolicy for PrivateExtensionExemptions {
    fn supported_extension_oids(&self) -> &BTreeSet<ObjectIdentifier> {
        &self.oids
    }

    fn apply(&self, cert: &X509Certificate, unresolved: &mut BTreeSet<ObjectIdentifier>) {
        for oid in &self.oids {
            if unresolved.remove(oid) {
                tracing::debug!(subject = %cert.display_name(), oid = %oid, "exempted private critical extension");
            }
        }
    }
}
