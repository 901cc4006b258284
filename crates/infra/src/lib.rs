//! Infrastructure layer: silo stores (in-memory, Postgres) and the services built on them.

pub mod clock;
pub mod error;
pub mod ledger;
pub mod registry;
pub mod reporter;
pub mod silo_store;


pub use clock::{Clock, ManualClock, SystemClock};
pub use error::SiloError;
pub use ledger::InventoryLedger;
pub use registry::SiloRegistry;
pub use reporter::{MovementView, SummaryReporter};
pub use silo_store::{InMemorySiloStore, PostgresSiloStore, SiloStore, StoreError};
