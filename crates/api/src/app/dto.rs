use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use silos_core::{MovementId, SiloId};
use silos_inventory::{Movement, MovementKind, Silo, SiloState};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateSiloRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameSiloRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoadRequest {
    pub amount: i64,
    #[serde(default)]
    pub cereal: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnloadRequest {
    pub amount: i64,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct SiloResponse {
    pub id: SiloId,
    pub name: String,
    pub cereal: Option<String>,
    pub amount: u64,
    pub state: SiloState,
    pub movement_count: u64,
    pub created_at: DateTime<Utc>,
}

impl From<&Silo> for SiloResponse {
    fn from(silo: &Silo) -> Self {
        Self {
            id: silo.id(),
            name: silo.name().to_string(),
            cereal: silo.cereal().map(ToString::to_string),
            amount: silo.amount(),
            state: silo.state(),
            movement_count: silo.movement_count(),
            created_at: silo.created_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MovementResponse {
    pub id: MovementId,
    pub silo_id: SiloId,
    pub kind: MovementKind,
    pub amount: u64,
    pub cereal: String,
    pub occurred_at: DateTime<Utc>,
}

impl From<Movement> for MovementResponse {
    fn from(m: Movement) -> Self {
        Self {
            id: m.id,
            silo_id: m.silo_id,
            kind: m.kind,
            amount: m.amount.get(),
            cereal: m.cereal.to_string(),
            occurred_at: m.occurred_at,
        }
    }
}
