//! Deployment-level policies for the questions the business rules leave open.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::values::CerealCatalog;

/// What deleting a silo does to its movement history.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Remove the silo and every movement that references it.
    Cascade,
    /// Refuse to delete a silo that has any recorded movement.
    BlockIfHasMovements,
    /// Mark the silo deleted; its movements stay stored but leave every view.
    #[default]
    SoftDelete,
}

impl DeletePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            DeletePolicy::Cascade => "cascade",
            DeletePolicy::BlockIfHasMovements => "block",
            DeletePolicy::SoftDelete => "soft",
        }
    }
}

impl FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cascade" => Ok(DeletePolicy::Cascade),
            "block" | "block_if_has_movements" => Ok(DeletePolicy::BlockIfHasMovements),
            "soft" | "soft_delete" => Ok(DeletePolicy::SoftDelete),
            other => Err(format!(
                "unknown delete policy '{other}' (expected cascade, block or soft)"
            )),
        }
    }
}

/// Policies applied by the registry and ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryPolicy {
    /// Keep the cereal label when an unload empties the silo.
    pub retain_cereal_on_empty: bool,
    pub delete: DeletePolicy,
    pub cereals: CerealCatalog,
}

impl Default for InventoryPolicy {
    fn default() -> Self {
        Self {
            retain_cereal_on_empty: true,
            delete: DeletePolicy::default(),
            cereals: CerealCatalog::any(),
        }
    }
}
