//! Silo registry: identity, naming and lifecycle of silos.

use std::sync::Arc;

use silos_core::{Aggregate, DomainError, SiloId};
use silos_inventory::{Delete, DeletePolicy, Rename, Silo, SiloCommand, SiloName};

use crate::clock::{Clock, SystemClock};
use crate::error::SiloError;
use crate::silo_store::SiloStore;

/// Authoritative source of silo identity and naming.
#[derive(Debug, Clone)]
pub struct SiloRegistry<S> {
    store: S,
    delete_policy: DeletePolicy,
    clock: Arc<dyn Clock>,
}

impl<S> SiloRegistry<S> {
    pub fn new(store: S, delete_policy: DeletePolicy) -> Self {
        Self {
            store,
            delete_policy,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }
}

impl<S> SiloRegistry<S>
where
    S: SiloStore,
{
    /// Create an empty silo with no cereal.
    pub async fn create(&self, name: &str) -> Result<Silo, SiloError> {
        let name = SiloName::parse(name)?;
        let silo = Silo::new(SiloId::new(), name, self.clock.now());
        let silo = self.store.insert_silo(silo).await?;
        tracing::info!(silo_id = %silo.id(), name = %silo.name(), "silo created");
        Ok(silo)
    }

    /// Change a silo's name, leaving its stock, cereal and history untouched.
    pub async fn rename(&self, id: SiloId, new_name: &str) -> Result<Silo, SiloError> {
        let name = SiloName::parse(new_name)?;
        let command = SiloCommand::Rename(Rename { name });
        let committed = self
            .store
            .with_silo_lock(id, Box::new(move |silo: &Silo| silo.handle(&command)))
            .await?;
        if committed.events_committed == 0 {
            tracing::debug!(silo_id = %id, "rename to current name ignored");
        } else {
            tracing::info!(silo_id = %id, name = %committed.silo.name(), "silo renamed");
        }
        Ok(committed.silo)
    }

    /// Remove a silo from the live set according to the configured delete policy.
    pub async fn delete(&self, id: SiloId) -> Result<(), SiloError> {
        let command = SiloCommand::Delete(Delete {
            policy: self.delete_policy,
            occurred_at: self.clock.now(),
        });
        self.store
            .with_silo_lock(id, Box::new(move |silo: &Silo| silo.handle(&command)))
            .await?;
        tracing::info!(silo_id = %id, policy = self.delete_policy.as_str(), "silo deleted");
        Ok(())
    }

    pub async fn get(&self, id: SiloId) -> Result<Silo, SiloError> {
        self.store
            .get_silo(id)
            .await?
            .ok_or_else(|| DomainError::not_found().into())
    }

    /// All live silos, oldest first.
    pub async fn list(&self) -> Result<Vec<Silo>, SiloError> {
        Ok(self.store.list_silos().await?)
    }
}
