use routerdb_core::{CertDigest, CertificateId};

/// Coarse classification of a [`MigrateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Storage,
    IntegrityViolation,
    Configuration,
}

#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("certificate {existing} already stored under digest {digest} with a different body")]
    IntegrityViolation { digest: CertDigest, existing: CertificateId },

    #[error("invalid migration range {from}..{to} (ledger has {len} steps)")]
    InvalidRange { from: usize, to: usize, len: usize },

    #[error("cannot apply step {from}: migration version {missing} has not been applied")]
    OutOfOrder { from: usize, missing: u32 },

    #[error("invalid ledger: expected migration version {expected}, found {found}")]
    InvalidLedger { expected: u32, found: u32 },
}

impl MigrateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MigrateError::Storage(_) => ErrorKind::Storage,
            MigrateError::IntegrityViolation { .. } => ErrorKind::IntegrityViolation,
            MigrateError::InvalidRange { .. }
            | MigrateError::OutOfOrder { .. }
            | MigrateError::InvalidLedger { .. } => ErrorKind::Configuration,
        }
    }
}
