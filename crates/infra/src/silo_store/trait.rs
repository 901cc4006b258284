use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use silos_core::{DomainResult, SiloId};
use silos_inventory::{Movement, Silo, SiloEvent};

use crate::error::SiloError;

/// Infrastructure failure of a store operation.
///
/// These are opaque to callers of the business API: they are surfaced as-is and
/// never translated into [`silos_core::DomainError`] variants.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lock poisoned: {0}")]
    Poisoned(&'static str),

    #[error("database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Decision closure run under a silo's exclusive lock.
///
/// It receives the silo's current state and returns the events to persist. It must
/// not block or perform IO; stores call it inside their critical section.
pub type Decide = Box<dyn FnOnce(&Silo) -> DomainResult<Vec<SiloEvent>> + Send>;

/// Result of a committed `with_silo_lock` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    /// Silo state after all events were applied.
    pub silo: Silo,
    /// Movements appended by the call, with their store-assigned ids.
    pub movements: Vec<Movement>,
    /// Number of events persisted. Zero when the decision was a no-op.
    pub events_committed: usize,
}

/// A movement joined with its (live) silo.
///
/// `silo_name` is the silo's current name. `silo_balance` is the balance after every
/// movement of that silo included in the same snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRow {
    pub movement: Movement,
    pub silo_name: String,
    pub silo_balance: u64,
}

/// Shared silo/movement store.
///
/// ## Atomicity
///
/// `with_silo_lock` is the only way to change an existing silo. Implementations
/// must hold an exclusive per-silo lock (or row lock) from the moment they read the
/// silo until the events returned by `decide` are persisted, and release it on every
/// exit path. Operations on different silos may run in parallel.
///
/// ## Ownership
///
/// Implementations enforce name uniqueness among live silos both on insert and on
/// `SiloEvent::Renamed`, and assign movement ids in commit order.
#[async_trait]
pub trait SiloStore: Send + Sync {
    /// Insert a freshly created silo. Fails with `DuplicateName` if a live silo has its name.
    async fn insert_silo(&self, silo: Silo) -> Result<Silo, SiloError>;

    /// Look up a live silo.
    async fn get_silo(&self, id: SiloId) -> Result<Option<Silo>, StoreError>;

    /// All live silos, ordered by creation time then id.
    async fn list_silos(&self) -> Result<Vec<Silo>, StoreError>;

    /// Run `decide` against the silo under its exclusive lock and persist the result.
    ///
    /// Fails with `NotFound` if the silo is unknown or was deleted (including by a
    /// delete that committed while this call was waiting for the lock).
    async fn with_silo_lock(&self, id: SiloId, decide: Decide) -> Result<Committed, SiloError>;

    /// Consistent snapshot of every movement whose silo is live.
    async fn movement_snapshot(&self) -> Result<Vec<MovementRow>, StoreError>;
}

#[async_trait]
impl<S> SiloStore for Arc<S>
where
    S: SiloStore + ?Sized,
{
    async fn insert_silo(&self, silo: Silo) -> Result<Silo, SiloError> {
        (**self).insert_silo(silo).await
    }

    async fn get_silo(&self, id: SiloId) -> Result<Option<Silo>, StoreError> {
        (**self).get_silo(id).await
    }

    async fn list_silos(&self) -> Result<Vec<Silo>, StoreError> {
        (**self).list_silos().await
    }

    async fn with_silo_lock(&self, id: SiloId, decide: Decide) -> Result<Committed, SiloError> {
        (**self).with_silo_lock(id, decide).await
    }

    async fn movement_snapshot(&self) -> Result<Vec<MovementRow>, StoreError> {
        (**self).movement_snapshot().await
    }
}
