//! Inventory ledger: the load/unload state machine and the movement log.
//!
//! The ledger is the only writer of silo balances, cereal labels and movements.
//! Input is validated before the store is touched; the state-dependent checks run
//! inside `SiloStore::with_silo_lock`, so a decision and its effect are one step.

use std::sync::Arc;

use silos_core::{Aggregate, SiloId};
use silos_inventory::{
    CerealCatalog, InventoryPolicy, Load, Movement, Quantity, Silo, SiloCommand, Unload,
};

use crate::clock::{Clock, SystemClock};
use crate::error::SiloError;
use crate::silo_store::{Committed, SiloStore, StoreError};

#[derive(Debug, Clone)]
pub struct InventoryLedger<S> {
    store: S,
    cereals: CerealCatalog,
    retain_cereal_on_empty: bool,
    clock: Arc<dyn Clock>,
}

impl<S> InventoryLedger<S> {
    pub fn new(store: S, policy: &InventoryPolicy) -> Self {
        Self {
            store,
            cereals: policy.cereals.clone(),
            retain_cereal_on_empty: policy.retain_cereal_on_empty,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cereals(&self) -> &CerealCatalog {
        &self.cereals
    }

    pub fn retain_cereal_on_empty(&self) -> bool {
        self.retain_cereal_on_empty
    }
}

impl<S> InventoryLedger<S>
where
    S: SiloStore,
{
    /// Add stock to a silo.
    ///
    /// `cereal` is mandatory when the silo is empty and has no retained cereal; for a
    /// stocked silo it must match the stored cereal. A blank label counts as absent.
    pub async fn load(
        &self,
        silo_id: SiloId,
        amount: i64,
        cereal: Option<&str>,
    ) -> Result<Movement, SiloError> {
        let amount = Quantity::new(amount)?;
        let cereal = cereal
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| self.cereals.parse(c))
            .transpose()?;

        let clock = self.clock.clone();
        let committed = self
            .store
            .with_silo_lock(
                silo_id,
                Box::new(move |silo: &Silo| {
                    silo.handle(&SiloCommand::Load(Load {
                        amount,
                        cereal,
                        occurred_at: clock.now(),
                    }))
                }),
            )
            .await?;

        let movement = single_movement(committed)?;
        tracing::info!(
            silo_id = %silo_id,
            movement_id = %movement.id,
            amount = movement.amount.get(),
            cereal = %movement.cereal,
            "load recorded"
        );
        Ok(movement)
    }

    /// Remove stock from a silo. Never debits more than the current balance.
    pub async fn unload(&self, silo_id: SiloId, amount: i64) -> Result<Movement, SiloError> {
        let amount = Quantity::new(amount)?;
        let retain_cereal_on_empty = self.retain_cereal_on_empty;

        let clock = self.clock.clone();
        let committed = self
            .store
            .with_silo_lock(
                silo_id,
                Box::new(move |silo: &Silo| {
                    silo.handle(&SiloCommand::Unload(Unload {
                        amount,
                        retain_cereal_on_empty,
                        occurred_at: clock.now(),
                    }))
                }),
            )
            .await?;

        let movement = single_movement(committed)?;
        tracing::info!(
            silo_id = %silo_id,
            movement_id = %movement.id,
            amount = movement.amount.get(),
            cereal = %movement.cereal,
            "unload recorded"
        );
        Ok(movement)
    }
}

fn single_movement(committed: Committed) -> Result<Movement, StoreError> {
    let count = committed.movements.len();
    match <[Movement; 1]>::try_from(committed.movements) {
        Ok([movement]) => Ok(movement),
        Err(_) => Err(StoreError::Corrupt(format!(
            "expected exactly one movement per commit, got {count}"
        ))),
    }
}
