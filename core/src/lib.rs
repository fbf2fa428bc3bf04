//! Core utilities and shared types for the router schema tooling.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub type RouteId = i64;
pub type CertificateId = i64;

/// Length of a SHA-256 digest rendered as hex.
pub const DIGEST_HEX_LEN: usize = 64;

/// Lowercase hex SHA-256 digest identifying a certificate body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CertDigest(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DigestParseError {
    #[error("digest must be 64 hex characters, got {0}")]
    Length(usize),
    #[error("digest contains non-lowercase-hex character {0:?}")]
    Character(char),
}

impl CertDigest {
    /// Wrap raw digest bytes, rendering them as lowercase hex.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        CertDigest(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CertDigest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != DIGEST_HEX_LEN {
            return Err(DigestParseError::Length(s.len()));
        }
        if let Some(c) = s.chars().find(|c| !matches!(c, '0'..='9' | 'a'..='f')) {
            return Err(DigestParseError::Character(c));
        }
        Ok(CertDigest(s.to_string()))
    }
}

impl TryFrom<String> for CertDigest {
    type Error = DigestParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CertDigest> for String {
    fn from(d: CertDigest) -> Self {
        d.0
    }
}

impl fmt::Display for CertDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
