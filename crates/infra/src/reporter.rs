//! Summary reporter: read-only, newest-first view of every movement.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use silos_core::{MovementId, SiloId};
use silos_inventory::MovementKind;

use crate::silo_store::{MovementRow, SiloStore, StoreError};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// One summary line: a movement joined with its silo's current name and balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementView {
    pub movement_id: MovementId,
    pub silo_id: SiloId,
    pub silo_name: String,
    pub cereal: String,
    pub kind: MovementKind,
    pub amount: u64,
    /// `YYYY-MM-DD` in the display offset.
    pub date: String,
    /// `HH:MM` in the display offset; seconds are truncated, not rounded.
    pub time: String,
    pub silo_balance: u64,
}

#[derive(Debug, Clone)]
pub struct SummaryReporter<S> {
    store: S,
    display_offset: FixedOffset,
}

impl<S> SummaryReporter<S> {
    pub fn new(store: S, display_offset: FixedOffset) -> Self {
        Self {
            store,
            display_offset,
        }
    }

    pub fn display_offset(&self) -> FixedOffset {
        self.display_offset
    }

    fn view(&self, row: MovementRow) -> MovementView {
        let local = row.movement.occurred_at.with_timezone(&self.display_offset);
        MovementView {
            movement_id: row.movement.id,
            silo_id: row.movement.silo_id,
            silo_name: row.silo_name,
            cereal: row.movement.cereal.to_string(),
            kind: row.movement.kind,
            amount: row.movement.amount.get(),
            date: local.format(DATE_FORMAT).to_string(),
            time: local.format(TIME_FORMAT).to_string(),
            silo_balance: row.silo_balance,
        }
    }
}

impl<S> SummaryReporter<S>
where
    S: SiloStore,
{
    /// Every movement of a live silo, newest first; ties go to the lower movement id.
    pub async fn summary(&self) -> Result<Vec<MovementView>, StoreError> {
        let mut rows = self.store.movement_snapshot().await?;
        rows.sort_by(|a, b| {
            newest_first(&a.movement.occurred_at, &b.movement.occurred_at)
                .then_with(|| a.movement.id.cmp(&b.movement.id))
        });
        tracing::debug!(rows = rows.len(), "summary built");
        Ok(rows.into_iter().map(|row| self.view(row)).collect())
    }
}

fn newest_first(a: &DateTime<Utc>, b: &DateTime<Utc>) -> std::cmp::Ordering {
    b.cmp(a)
}
