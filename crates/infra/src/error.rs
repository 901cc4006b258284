//! Error returned by registry, ledger and store operations.

use thiserror::Error;

use silos_core::DomainError;

use crate::silo_store::StoreError;

/// Either a caller-correctable business failure or an infrastructure failure.
///
/// The two categories never mix: a storage fault is not reported as `NotFound`,
/// and a business rule violation is never wrapped as a store error.
#[derive(Debug, Error)]
pub enum SiloError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SiloError {
    /// The business error, if this is one.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            SiloError::Domain(e) => Some(e),
            SiloError::Store(_) => None,
        }
    }
}
