use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use silos_core::{Aggregate, DomainError, MovementId, SiloId};
use silos_inventory::{
    DeletePolicy, Movement, MovementDraft, MovementKind, Silo, SiloEvent, SiloName,
};

use super::r#trait::{Committed, Decide, MovementRow, SiloStore, StoreError};
use crate::error::SiloError;

#[derive(Debug, Default)]
struct MovementLog {
    next_id: u64,
    entries: Vec<Movement>,
}

impl MovementLog {
    fn append(&mut self, draft: MovementDraft) -> Movement {
        self.next_id += 1;
        let movement = draft.commit(MovementId::new(self.next_id));
        self.entries.push(movement.clone());
        movement
    }
}

type Slot = Arc<Mutex<Silo>>;

/// In-memory silo store with one mutex per silo.
///
/// Intended for tests/dev and single-process deployments.
///
/// Lock order is always `slot -> names -> silos -> log`; no lock is held while
/// acquiring one earlier in that order, and readers never hold two at once.
/// Soft-deleted silos keep their slot (marked deleted) so a waiter that already
/// cloned the slot observes the deletion instead of resurrecting the silo.
#[derive(Debug, Default)]
pub struct InMemorySiloStore {
    silos: RwLock<HashMap<SiloId, Slot>>,
    names: Mutex<HashMap<SiloName, SiloId>>,
    log: RwLock<MovementLog>,
}

impl InMemorySiloStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn slot(&self, id: SiloId) -> Result<Option<Slot>, StoreError> {
        let silos = self
            .silos
            .read()
            .map_err(|_| StoreError::Poisoned("silos"))?;
        Ok(silos.get(&id).cloned())
    }

    fn slots(&self) -> Result<Vec<Slot>, StoreError> {
        let silos = self
            .silos
            .read()
            .map_err(|_| StoreError::Poisoned("silos"))?;
        Ok(silos.values().cloned().collect())
    }

    fn read_live(slot: &Slot) -> Result<Option<Silo>, StoreError> {
        let silo = slot.lock().map_err(|_| StoreError::Poisoned("silo"))?;
        Ok(silo.is_live().then(|| silo.clone()))
    }

    fn reserve_name(&self, id: SiloId, current: &SiloName, new: &SiloName) -> Result<(), SiloError> {
        let mut names = self
            .names
            .lock()
            .map_err(|_| StoreError::Poisoned("names"))?;
        if let Some(owner) = names.get(new) {
            if *owner != id {
                return Err(DomainError::duplicate_name(new.as_str()).into());
            }
        }
        names.remove(current);
        names.insert(new.clone(), id);
        Ok(())
    }

    fn remove(&self, id: SiloId, name: &SiloName, policy: DeletePolicy) -> Result<(), StoreError> {
        self.names
            .lock()
            .map_err(|_| StoreError::Poisoned("names"))?
            .remove(name);

        if policy != DeletePolicy::SoftDelete {
            self.silos
                .write()
                .map_err(|_| StoreError::Poisoned("silos"))?
                .remove(&id);
        }

        if policy == DeletePolicy::Cascade {
            self.log
                .write()
                .map_err(|_| StoreError::Poisoned("log"))?
                .entries
                .retain(|m| m.silo_id != id);
        }
        Ok(())
    }
}

#[async_trait]
impl SiloStore for InMemorySiloStore {
    async fn insert_silo(&self, silo: Silo) -> Result<Silo, SiloError> {
        let mut names = self
            .names
            .lock()
            .map_err(|_| StoreError::Poisoned("names"))?;
        if names.contains_key(silo.name()) {
            return Err(DomainError::duplicate_name(silo.name().as_str()).into());
        }

        let mut silos = self
            .silos
            .write()
            .map_err(|_| StoreError::Poisoned("silos"))?;
        names.insert(silo.name().clone(), silo.id());
        silos.insert(silo.id(), Arc::new(Mutex::new(silo.clone())));
        Ok(silo)
    }

    async fn get_silo(&self, id: SiloId) -> Result<Option<Silo>, StoreError> {
        match self.slot(id)? {
            Some(slot) => Self::read_live(&slot),
            None => Ok(None),
        }
    }

    async fn list_silos(&self) -> Result<Vec<Silo>, StoreError> {
        let mut live = Vec::new();
        for slot in self.slots()? {
            if let Some(silo) = Self::read_live(&slot)? {
                live.push(silo);
            }
        }
        live.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(live)
    }

    async fn with_silo_lock(&self, id: SiloId, decide: Decide) -> Result<Committed, SiloError> {
        let slot = self.slot(id)?.ok_or(DomainError::NotFound)?;
        let mut silo = slot.lock().map_err(|_| StoreError::Poisoned("silo"))?;
        if !silo.is_live() {
            return Err(DomainError::NotFound.into());
        }

        let events = decide(&*silo)?;

        let mut movements = Vec::new();
        for event in &events {
            match event {
                SiloEvent::Renamed { name } => self.reserve_name(id, silo.name(), name)?,
                SiloEvent::Loaded(draft) | SiloEvent::Unloaded { movement: draft, .. } => {
                    let mut log = self
                        .log
                        .write()
                        .map_err(|_| StoreError::Poisoned("log"))?;
                    movements.push(log.append(draft.clone()));
                }
                SiloEvent::Deleted { policy, .. } => self.remove(id, silo.name(), *policy)?,
            }
            silo.apply(event);
        }

        Ok(Committed {
            silo: silo.clone(),
            movements,
            events_committed: events.len(),
        })
    }

    async fn movement_snapshot(&self) -> Result<Vec<MovementRow>, StoreError> {
        let entries = self
            .log
            .read()
            .map_err(|_| StoreError::Poisoned("log"))?
            .entries
            .clone();

        // Balance as of this snapshot: the running sum of the silo's movements.
        let mut balances: HashMap<SiloId, u64> = HashMap::new();
        for movement in &entries {
            let balance = balances.entry(movement.silo_id).or_default();
            *balance = match movement.kind {
                MovementKind::Load => balance.saturating_add(movement.amount.get()),
                MovementKind::Unload => balance.saturating_sub(movement.amount.get()),
            };
        }

        let mut names: HashMap<SiloId, Option<String>> = HashMap::new();
        let mut rows = Vec::with_capacity(entries.len());
        for movement in entries {
            let name = match names.get(&movement.silo_id) {
                Some(cached) => cached.clone(),
                None => {
                    let current = match self.slot(movement.silo_id)? {
                        Some(slot) => Self::read_live(&slot)?.map(|s| s.name().to_string()),
                        None => None,
                    };
                    names.insert(movement.silo_id, current.clone());
                    current
                }
            };
            if let Some(silo_name) = name {
                rows.push(MovementRow {
                    silo_name,
                    silo_balance: balances.get(&movement.silo_id).copied().unwrap_or_default(),
                    movement,
                });
            }
        }
        Ok(rows)
    }
}
