//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Business-level failure of a silo operation.
///
/// Every variant is caller-correctable and deterministic. Storage and transport
/// failures are deliberately not represented here; they travel as infrastructure
/// errors in the layer that owns the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The silo id does not resolve to a live silo.
    #[error("silo not found")]
    NotFound,

    /// Another live silo already holds this name.
    #[error("a silo named '{0}' already exists")]
    DuplicateName(String),

    /// The silo name is blank or otherwise malformed.
    #[error("invalid silo name: {0}")]
    InvalidName(String),

    /// The quantity is zero, negative, or would overflow the balance.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The cereal label is blank, too long, or not in the allow-list.
    #[error("invalid cereal: {0}")]
    InvalidCereal(String),

    /// The silo is empty and has no cereal to fall back on.
    #[error("a cereal must be provided when loading an empty silo")]
    CerealRequired,

    /// The silo holds stock of a different cereal.
    #[error("silo already stores {stored}; cannot load {requested}")]
    CerealMismatch { stored: String, requested: String },

    /// The unload exceeds the silo's current balance.
    #[error("insufficient stock (requested: {requested}, available: {available})")]
    InsufficientStock { requested: u64, available: u64 },

    /// The silo has recorded movements and the delete policy forbids removing it.
    #[error("silo has {0} recorded movements and cannot be deleted")]
    HasMovements(u64),
}

impl DomainError {
    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Self::InvalidName(msg.into())
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn invalid_cereal(msg: impl Into<String>) -> Self {
        Self::InvalidCereal(msg.into())
    }

    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName(name.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Stable machine-readable code (used by the HTTP layer and in logs).
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound => "not_found",
            DomainError::DuplicateName(_) => "duplicate_name",
            DomainError::InvalidName(_) => "invalid_name",
            DomainError::InvalidAmount(_) => "invalid_amount",
            DomainError::InvalidCereal(_) => "invalid_cereal",
            DomainError::CerealRequired => "cereal_required",
            DomainError::CerealMismatch { .. } => "cereal_mismatch",
            DomainError::InsufficientStock { .. } => "insufficient_stock",
            DomainError::HasMovements(_) => "has_movements",
        }
    }
}
