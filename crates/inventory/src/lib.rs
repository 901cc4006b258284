//! Silo inventory domain module.
//!
//! This crate contains the business rules for silos and their movements,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).
//! Stores drive the [`Silo`] aggregate through [`silos_core::Aggregate`] while
//! holding the silo's exclusive lock.

pub mod movement;
pub mod policy;
pub mod silo;
pub mod values;

pub use movement::{Movement, MovementDraft, MovementKind};
pub use policy::{DeletePolicy, InventoryPolicy};
pub use silo::{Delete, Load, Rename, Silo, SiloCommand, SiloEvent, SiloState, Unload};
pub use values::{Cereal, CerealCatalog, Quantity, SiloName, MAX_BALANCE};
