//! Silo persistence boundary.
//!
//! This module defines the store capability shared by the registry, the ledger
//! and the summary reporter, plus its in-memory and Postgres implementations.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemorySiloStore;
pub use postgres::PostgresSiloStore;
pub use r#trait::{Committed, Decide, MovementRow, SiloStore, StoreError};
