//! Service wiring: one shared store behind the registry, ledger and reporter.

use std::sync::Arc;

use chrono::FixedOffset;

use silos_infra::{
    InMemorySiloStore, InventoryLedger, PostgresSiloStore, SiloRegistry, SiloStore, StoreError,
    SummaryReporter,
};
use silos_inventory::InventoryPolicy;

use crate::config::Config;

/// Type-erased store shared by every service.
pub type DynStore = Arc<dyn SiloStore>;

pub struct AppServices {
    pub registry: SiloRegistry<DynStore>,
    pub ledger: InventoryLedger<DynStore>,
    pub reporter: SummaryReporter<DynStore>,
    backend: &'static str,
}

impl AppServices {
    pub fn new(
        store: DynStore,
        backend: &'static str,
        policy: &InventoryPolicy,
        display_offset: FixedOffset,
    ) -> Self {
        Self {
            registry: SiloRegistry::new(store.clone(), policy.delete),
            ledger: InventoryLedger::new(store.clone(), policy),
            reporter: SummaryReporter::new(store, display_offset),
            backend,
        }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory(policy: &InventoryPolicy, display_offset: FixedOffset) -> Self {
        Self::new(
            Arc::new(InMemorySiloStore::new()),
            "memory",
            policy,
            display_offset,
        )
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

/// Pick the store from config: Postgres when `DATABASE_URL` is set, memory otherwise.
pub async fn build_services(config: &Config) -> Result<AppServices, StoreError> {
    match config.database_url.as_deref() {
        Some(url) => {
            let store = PostgresSiloStore::connect(url).await?;
            tracing::info!("using postgres silo store");
            Ok(AppServices::new(
                Arc::new(store),
                "postgres",
                &config.policy,
                config.display_offset,
            ))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory silo store (data is not persisted)");
            Ok(AppServices::in_memory(&config.policy, config.display_offset))
        }
    }
}
