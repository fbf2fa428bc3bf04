//! Normalization and content hashing for PEM certificate material.

use routerdb_core::CertDigest;
use sha2::{Digest, Sha256};

/// Certificate body and private key with surrounding whitespace removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCert {
    pub cert: String,
    pub key: String,
}

impl NormalizedCert {
    /// Normalize a legacy (cert, key) pair. Returns `None` unless both are
    /// non-empty after trimming.
    pub fn from_legacy(cert: Option<&str>, key: Option<&str>) -> Option<Self> {
        let cert = normalize(cert?);
        let key = normalize(key?);
        if cert.is_empty() || key.is_empty() {
            return None;
        }
        Some(NormalizedCert { cert: cert.to_string(), key: key.to_string() })
    }

    /// Identity of this certificate. The key does not participate.
    pub fn digest(&self) -> CertDigest {
        cert_sha256(&self.cert)
    }
}

/// Strip leading and trailing whitespace; interior bytes are untouched.
pub fn normalize(raw: &str) -> &str {
    raw.trim()
}

/// SHA-256 over the normalized certificate body.
pub fn cert_sha256(cert: &str) -> CertDigest {
    let mut sha = Sha256::new();
    sha.update(normalize(cert).as_bytes());
    CertDigest::from_bytes(sha.finalize().into())
}
