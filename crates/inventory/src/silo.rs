use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use silos_core::{Aggregate, DomainError, SiloId};

use crate::movement::{MovementDraft, MovementKind};
use crate::policy::DeletePolicy;
use crate::values::{Cereal, Quantity, SiloName, MAX_BALANCE};

/// Load/unload state of a silo.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiloState {
    /// `amount == 0`. The cereal may still be set if it was retained.
    Empty,
    /// `amount > 0` and the cereal is set.
    Stocked,
}

/// Aggregate root: Silo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Silo {
    id: SiloId,
    name: SiloName,
    cereal: Option<Cereal>,
    amount: u64,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    movement_count: u64,
}

impl Silo {
    /// A freshly created silo: empty, no cereal.
    pub fn new(id: SiloId, name: SiloName, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            cereal: None,
            amount: 0,
            created_at,
            deleted_at: None,
            movement_count: 0,
        }
    }

    /// Rebuild a silo from persisted columns.
    pub fn rehydrate(
        id: SiloId,
        name: SiloName,
        cereal: Option<Cereal>,
        amount: u64,
        created_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
        movement_count: u64,
    ) -> Self {
        Self {
            id,
            name,
            cereal,
            amount,
            created_at,
            deleted_at,
            movement_count,
        }
    }

    pub fn id(&self) -> SiloId {
        self.id
    }

    pub fn name(&self) -> &SiloName {
        &self.name
    }

    pub fn cereal(&self) -> Option<&Cereal> {
        self.cereal.as_ref()
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn movement_count(&self) -> u64 {
        self.movement_count
    }

    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn state(&self) -> SiloState {
        if self.amount == 0 {
            SiloState::Empty
        } else {
            SiloState::Stocked
        }
    }
}

/// Command: Rename. Name uniqueness is checked by the store, which owns the name index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub name: SiloName,
}

/// Command: Load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Load {
    pub amount: Quantity,
    pub cereal: Option<Cereal>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Unload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unload {
    pub amount: Quantity,
    pub retain_cereal_on_empty: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    pub policy: DeletePolicy,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiloCommand {
    Rename(Rename),
    Load(Load),
    Unload(Unload),
    Delete(Delete),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiloEvent {
    Renamed { name: SiloName },
    Loaded(MovementDraft),
    Unloaded {
        movement: MovementDraft,
        clear_cereal: bool,
    },
    Deleted {
        policy: DeletePolicy,
        occurred_at: DateTime<Utc>,
    },
}

impl SiloEvent {
    /// The movement this event records, if any.
    pub fn movement(&self) -> Option<&MovementDraft> {
        match self {
            SiloEvent::Loaded(m) => Some(m),
            SiloEvent::Unloaded { movement, .. } => Some(movement),
            SiloEvent::Renamed { .. } | SiloEvent::Deleted { .. } => None,
        }
    }
}

impl Aggregate for Silo {
    type Command = SiloCommand;
    type Event = SiloEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SiloEvent::Renamed { name } => {
                self.name = name.clone();
            }
            SiloEvent::Loaded(m) => {
                self.amount += m.amount.get();
                self.cereal = Some(m.cereal.clone());
                self.movement_count += 1;
            }
            SiloEvent::Unloaded {
                movement,
                clear_cereal,
            } => {
                self.amount -= movement.amount.get();
                if *clear_cereal {
                    self.cereal = None;
                }
                self.movement_count += 1;
            }
            SiloEvent::Deleted { occurred_at, .. } => {
                self.deleted_at = Some(*occurred_at);
            }
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if !self.is_live() {
            return Err(DomainError::not_found());
        }
        match command {
            SiloCommand::Rename(cmd) => Ok(self.handle_rename(cmd)),
            SiloCommand::Load(cmd) => self.handle_load(cmd),
            SiloCommand::Unload(cmd) => self.handle_unload(cmd),
            SiloCommand::Delete(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Silo {
    fn handle_rename(&self, cmd: &Rename) -> Vec<SiloEvent> {
        if cmd.name == self.name {
            return vec![];
        }
        vec![SiloEvent::Renamed {
            name: cmd.name.clone(),
        }]
    }

    /// Resolve the cereal a load will record, or refuse it.
    fn resolve_cereal(&self, requested: Option<&Cereal>) -> Result<Cereal, DomainError> {
        match (self.state(), self.cereal.as_ref(), requested) {
            (SiloState::Stocked, Some(stored), Some(req)) if stored != req => {
                Err(DomainError::CerealMismatch {
                    stored: stored.to_string(),
                    requested: req.to_string(),
                })
            }
            (SiloState::Stocked, Some(stored), _) => Ok(stored.clone()),
            (_, _, Some(req)) => Ok(req.clone()),
            (SiloState::Empty, Some(sticky), None) => Ok(sticky.clone()),
            (_, None, None) => Err(DomainError::CerealRequired),
        }
    }

    fn handle_load(&self, cmd: &Load) -> Result<Vec<SiloEvent>, DomainError> {
        let cereal = self.resolve_cereal(cmd.cereal.as_ref())?;

        let fits = self
            .amount
            .checked_add(cmd.amount.get())
            .is_some_and(|total| total <= MAX_BALANCE);
        if !fits {
            return Err(DomainError::invalid_amount(format!(
                "loading {} would exceed the maximum balance of {MAX_BALANCE}",
                cmd.amount
            )));
        }

        Ok(vec![SiloEvent::Loaded(MovementDraft {
            silo_id: self.id,
            kind: MovementKind::Load,
            amount: cmd.amount,
            cereal,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_unload(&self, cmd: &Unload) -> Result<Vec<SiloEvent>, DomainError> {
        let requested = cmd.amount.get();
        if requested > self.amount {
            return Err(DomainError::InsufficientStock {
                requested,
                available: self.amount,
            });
        }

        // Stocked implies a cereal; a missing one means corrupted state, not a caller error.
        let cereal = self.cereal.clone().ok_or(DomainError::CerealRequired)?;
        let clear_cereal = requested == self.amount && !cmd.retain_cereal_on_empty;

        Ok(vec![SiloEvent::Unloaded {
            movement: MovementDraft {
                silo_id: self.id,
                kind: MovementKind::Unload,
                amount: cmd.amount,
                cereal,
                occurred_at: cmd.occurred_at,
            },
            clear_cereal,
        }])
    }

    fn handle_delete(&self, cmd: &Delete) -> Result<Vec<SiloEvent>, DomainError> {
        if cmd.policy == DeletePolicy::BlockIfHasMovements && self.movement_count > 0 {
            return Err(DomainError::HasMovements(self.movement_count));
        }
        Ok(vec![SiloEvent::Deleted {
            policy: cmd.policy,
            occurred_at: cmd.occurred_at,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_silo() -> Silo {
        Silo::new(SiloId::new(), SiloName::parse("Silo A").unwrap(), Utc::now())
    }

    fn cereal(label: &str) -> Cereal {
        Cereal::parse(label).unwrap()
    }

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn load(amount: i64, cereal_label: Option<&str>) -> SiloCommand {
        SiloCommand::Load(Load {
            amount: qty(amount),
            cereal: cereal_label.map(cereal),
            occurred_at: Utc::now(),
        })
    }

    fn unload(amount: i64, retain: bool) -> SiloCommand {
        SiloCommand::Unload(Unload {
            amount: qty(amount),
            retain_cereal_on_empty: retain,
            occurred_at: Utc::now(),
        })
    }

    fn run(silo: &mut Silo, cmd: SiloCommand) -> Result<(), DomainError> {
        let events = silo.handle(&cmd)?;
        for e in &events {
            silo.apply(e);
        }
        Ok(())
    }

    #[test]
    fn new_silo_is_empty_without_cereal() {
        let silo = test_silo();
        assert_eq!(silo.amount(), 0);
        assert_eq!(silo.cereal(), None);
        assert_eq!(silo.state(), SiloState::Empty);
    }

    #[test]
    fn first_load_requires_cereal() {
        let mut silo = test_silo();
        let err = run(&mut silo, load(10, None)).unwrap_err();
        assert_eq!(err, DomainError::CerealRequired);
        assert_eq!(silo.amount(), 0);
        assert_eq!(silo.state(), SiloState::Empty);
    }

    #[test]
    fn load_sets_cereal_and_records_movement() {
        let mut silo = test_silo();
        let events = silo.handle(&load(500, Some("corn"))).unwrap();
        assert_eq!(events.len(), 1);
        let movement = events[0].movement().unwrap();
        assert_eq!(movement.kind, MovementKind::Load);
        assert_eq!(movement.amount.get(), 500);
        assert_eq!(movement.cereal.as_str(), "corn");

        silo.apply(&events[0]);
        assert_eq!(silo.amount(), 500);
        assert_eq!(silo.cereal().map(Cereal::as_str), Some("corn"));
        assert_eq!(silo.state(), SiloState::Stocked);
        assert_eq!(silo.movement_count(), 1);
    }

    #[test]
    fn stocked_silo_reuses_cereal_when_omitted() {
        let mut silo = test_silo();
        run(&mut silo, load(100, Some("Soja"))).unwrap();
        let events = silo.handle(&load(50, None)).unwrap();
        assert_eq!(events[0].movement().unwrap().cereal.as_str(), "Soja");
    }

    #[test]
    fn stocked_silo_rejects_a_different_cereal() {
        let mut silo = test_silo();
        run(&mut silo, load(100, Some("Soja"))).unwrap();
        let before = silo.clone();
        let err = run(&mut silo, load(50, Some("Maiz"))).unwrap_err();
        assert_eq!(
            err,
            DomainError::CerealMismatch {
                stored: "Soja".into(),
                requested: "Maiz".into()
            }
        );
        assert_eq!(silo, before);
    }

    #[test]
    fn stocked_silo_accepts_the_same_cereal() {
        let mut silo = test_silo();
        run(&mut silo, load(100, Some("Soja"))).unwrap();
        run(&mut silo, load(50, Some("Soja"))).unwrap();
        assert_eq!(silo.amount(), 150);
    }

    #[test]
    fn overdrawn_unload_changes_nothing() {
        let mut silo = test_silo();
        run(&mut silo, load(500, Some("corn"))).unwrap();
        let before = silo.clone();
        let err = run(&mut silo, unload(600, true)).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: 600,
                available: 500
            }
        );
        assert_eq!(silo, before);
    }

    #[test]
    fn unload_of_empty_silo_is_insufficient_stock() {
        let silo = test_silo();
        let err = silo.handle(&unload(1, true)).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { available: 0, .. }));
    }

    #[test]
    fn full_unload_with_retention_keeps_cereal_for_next_load() {
        let mut silo = test_silo();
        run(&mut silo, load(500, Some("corn"))).unwrap();
        run(&mut silo, unload(500, true)).unwrap();
        assert_eq!(silo.state(), SiloState::Empty);
        assert_eq!(silo.cereal().map(Cereal::as_str), Some("corn"));

        run(&mut silo, load(10, None)).unwrap();
        assert_eq!(silo.amount(), 10);
        assert_eq!(silo.cereal().map(Cereal::as_str), Some("corn"));
    }

    #[test]
    fn full_unload_without_retention_requires_cereal_again() {
        let mut silo = test_silo();
        run(&mut silo, load(500, Some("corn"))).unwrap();
        run(&mut silo, unload(500, false)).unwrap();
        assert_eq!(silo.cereal(), None);

        let err = run(&mut silo, load(10, None)).unwrap_err();
        assert_eq!(err, DomainError::CerealRequired);
        assert_eq!(silo.amount(), 0);
    }

    #[test]
    fn empty_silo_with_retained_cereal_can_switch_cereal() {
        let mut silo = test_silo();
        run(&mut silo, load(5, Some("Trigo"))).unwrap();
        run(&mut silo, unload(5, true)).unwrap();
        run(&mut silo, load(7, Some("Girasol"))).unwrap();
        assert_eq!(silo.cereal().map(Cereal::as_str), Some("Girasol"));
    }

    #[test]
    fn partial_unload_keeps_cereal_regardless_of_policy() {
        let mut silo = test_silo();
        run(&mut silo, load(10, Some("Trigo"))).unwrap();
        run(&mut silo, unload(4, false)).unwrap();
        assert_eq!(silo.amount(), 6);
        assert_eq!(silo.cereal().map(Cereal::as_str), Some("Trigo"));
    }

    #[test]
    fn load_beyond_max_balance_is_invalid_amount() {
        let silo = Silo::rehydrate(
            SiloId::new(),
            SiloName::parse("Full").unwrap(),
            Some(cereal("Soja")),
            MAX_BALANCE,
            Utc::now(),
            None,
            1,
        );
        let err = silo.handle(&load(1, None)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidAmount(_)));
    }

    #[test]
    fn rename_to_same_name_emits_nothing() {
        let silo = test_silo();
        let events = silo
            .handle(&SiloCommand::Rename(Rename {
                name: SiloName::parse("Silo A").unwrap(),
            }))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn rename_only_changes_name() {
        let mut silo = test_silo();
        run(&mut silo, load(30, Some("Maiz"))).unwrap();
        run(
            &mut silo,
            SiloCommand::Rename(Rename {
                name: SiloName::parse("Silo B").unwrap(),
            }),
        )
        .unwrap();
        assert_eq!(silo.name().as_str(), "Silo B");
        assert_eq!(silo.amount(), 30);
        assert_eq!(silo.cereal().map(Cereal::as_str), Some("Maiz"));
        assert_eq!(silo.movement_count(), 1);
    }

    #[test]
    fn block_policy_refuses_silo_with_history() {
        let mut silo = test_silo();
        let delete = |policy| {
            SiloCommand::Delete(Delete {
                policy,
                occurred_at: Utc::now(),
            })
        };
        assert!(silo.handle(&delete(DeletePolicy::BlockIfHasMovements)).is_ok());

        run(&mut silo, load(1, Some("Soja"))).unwrap();
        let err = silo
            .handle(&delete(DeletePolicy::BlockIfHasMovements))
            .unwrap_err();
        assert_eq!(err, DomainError::HasMovements(1));
        assert!(silo.handle(&delete(DeletePolicy::Cascade)).is_ok());
    }

    #[test]
    fn deleted_silo_rejects_every_command() {
        let mut silo = test_silo();
        run(
            &mut silo,
            SiloCommand::Delete(Delete {
                policy: DeletePolicy::SoftDelete,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert!(!silo.is_live());
        assert_eq!(
            silo.handle(&load(1, Some("Soja"))).unwrap_err(),
            DomainError::NotFound
        );
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Load(i64),
            Unload(i64),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (1i64..1_000).prop_map(Op::Load),
                (1i64..1_500).prop_map(Op::Unload),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: the balance tracks a simple model and never goes negative;
            /// an unload is refused exactly when it exceeds the current stock.
            #[test]
            fn balance_matches_model(ops in proptest::collection::vec(op(), 1..60), retain in any::<bool>()) {
                let mut silo = test_silo();
                let mut model: u64 = 0;

                for op in ops {
                    let before = silo.clone();
                    match op {
                        Op::Load(n) => {
                            run(&mut silo, load(n, Some("Soja"))).unwrap();
                            model += n as u64;
                        }
                        Op::Unload(n) => {
                            let result = run(&mut silo, unload(n, retain));
                            if (n as u64) <= model {
                                prop_assert!(result.is_ok());
                                model -= n as u64;
                            } else {
                                let refused = matches!(result, Err(DomainError::InsufficientStock { .. }));
                                prop_assert!(refused);
                                prop_assert_eq!(&silo, &before);
                            }
                        }
                    }
                    prop_assert_eq!(silo.amount(), model);
                    prop_assert_eq!(silo.state() == SiloState::Empty, model == 0);
                    if model > 0 {
                        prop_assert!(silo.cereal().is_some());
                    }
                }
            }

            /// Property: handle never mutates state.
            #[test]
            fn handle_is_pure(amount in 1i64..10_000) {
                let mut silo = test_silo();
                run(&mut silo, load(amount, Some("Maiz"))).unwrap();
                let before = silo.clone();
                let first = silo.handle(&unload(amount, false));
                let second = silo.handle(&unload(amount, false));
                prop_assert_eq!(&silo, &before);
                prop_assert_eq!(first.is_ok(), second.is_ok());
            }
        }
    }
}
