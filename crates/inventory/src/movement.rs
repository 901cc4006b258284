//! Movement records: the append-only history of loads and unloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use silos_core::{MovementId, SiloId};

use crate::values::{Cereal, Quantity};

/// Direction of a movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Load,
    Unload,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Load => "load",
            MovementKind::Unload => "unload",
        }
    }

    /// Inverse of [`MovementKind::as_str`].
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "load" => Some(MovementKind::Load),
            "unload" => Some(MovementKind::Unload),
            _ => None,
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A movement decided by the aggregate but not yet committed.
///
/// The store turns it into a [`Movement`] by assigning the next id inside the
/// same critical section that persists the silo's new balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementDraft {
    pub silo_id: SiloId,
    pub kind: MovementKind,
    pub amount: Quantity,
    pub cereal: Cereal,
    pub occurred_at: DateTime<Utc>,
}

impl MovementDraft {
    pub fn commit(self, id: MovementId) -> Movement {
        Movement {
            id,
            silo_id: self.silo_id,
            kind: self.kind,
            amount: self.amount,
            cereal: self.cereal,
            occurred_at: self.occurred_at,
        }
    }
}

/// Immutable record of a single load or unload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub silo_id: SiloId,
    pub kind: MovementKind,
    pub amount: Quantity,
    pub cereal: Cereal,
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_round_trip() {
        for kind in [MovementKind::Load, MovementKind::Unload] {
            assert_eq!(MovementKind::from_code(kind.as_str()), Some(kind));
        }
        assert_eq!(MovementKind::from_code("CARGA"), None);
    }

    #[test]
    fn commit_keeps_draft_fields() {
        let draft = MovementDraft {
            silo_id: SiloId::new(),
            kind: MovementKind::Unload,
            amount: Quantity::new(42).unwrap(),
            cereal: Cereal::parse("Trigo").unwrap(),
            occurred_at: Utc::now(),
        };
        let movement = draft.clone().commit(MovementId::new(7));
        assert_eq!(movement.id, MovementId::new(7));
        assert_eq!(movement.silo_id, draft.silo_id);
        assert_eq!(movement.kind, draft.kind);
        assert_eq!(movement.amount, draft.amount);
        assert_eq!(movement.cereal, draft.cereal);
        assert_eq!(movement.occurred_at, draft.occurred_at);
    }
}
