//! Postgres-backed silo store.
//!
//! Per-silo atomicity comes from row locks: `with_silo_lock` opens a transaction,
//! reads the silo with `SELECT ... FOR UPDATE`, runs the decision, writes the new
//! balance and the movement, and commits. Dropping the transaction on any error
//! path rolls it back and releases the lock.
//!
//! ## Error Mapping
//!
//! | PostgreSQL error code | Result |
//! |---|---|
//! | `23505` on the live-name index | `DomainError::DuplicateName` |
//! | anything else | `StoreError::Database` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use silos_core::{Aggregate, DomainError, MovementId, SiloId};
use silos_inventory::{
    Cereal, DeletePolicy, Movement, MovementDraft, MovementKind, Quantity, Silo, SiloEvent,
    SiloName,
};

use super::r#trait::{Committed, Decide, MovementRow, SiloStore, StoreError};
use crate::error::SiloError;

/// Idempotent schema, applied by [`PostgresSiloStore::migrate`].
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS silos (
        id          UUID PRIMARY KEY,
        name        VARCHAR(100) NOT NULL,
        cereal      VARCHAR(20),
        amount      BIGINT NOT NULL DEFAULT 0 CHECK (amount >= 0),
        created_at  TIMESTAMPTZ NOT NULL,
        deleted_at  TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS silos_live_name_idx
        ON silos (name) WHERE deleted_at IS NULL
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS movements (
        id          BIGSERIAL PRIMARY KEY,
        silo_id     UUID NOT NULL REFERENCES silos (id) ON DELETE CASCADE,
        kind        VARCHAR(10) NOT NULL CHECK (kind IN ('load', 'unload')),
        amount      BIGINT NOT NULL CHECK (amount > 0),
        cereal      VARCHAR(20) NOT NULL,
        occurred_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS movements_occurred_at_idx
        ON movements (occurred_at DESC, id ASC)
    "#,
];

const SILO_COLUMNS: &str = r#"
    s.id, s.name, s.cereal, s.amount, s.created_at, s.deleted_at,
    (SELECT COUNT(*) FROM movements m WHERE m.silo_id = s.id) AS movement_count
"#;

/// Postgres-backed silo store.
///
/// `Send + Sync`; all access goes through the SQLx connection pool.
#[derive(Debug, Clone)]
pub struct PostgresSiloStore {
    pool: Arc<PgPool>,
}

impl PostgresSiloStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect to `database_url` and apply the schema.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables and indexes if they do not exist.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl SiloStore for PostgresSiloStore {
    #[instrument(skip(self, silo), fields(silo_id = %silo.id()), err)]
    async fn insert_silo(&self, silo: Silo) -> Result<Silo, SiloError> {
        sqlx::query(
            r#"
            INSERT INTO silos (id, name, cereal, amount, created_at)
            VALUES ($1, $2, NULL, 0, $3)
            "#,
        )
        .bind(silo.id().as_uuid())
        .bind(silo.name().as_str())
        .bind(silo.created_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_name_error("insert_silo", silo.name(), e))?;

        Ok(silo)
    }

    #[instrument(skip(self), fields(silo_id = %id), err)]
    async fn get_silo(&self, id: SiloId) -> Result<Option<Silo>, StoreError> {
        let query = format!(
            "SELECT {SILO_COLUMNS} FROM silos s WHERE s.id = $1 AND s.deleted_at IS NULL"
        );
        let row = sqlx::query(&query)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_silo", e))?;

        row.as_ref().map(silo_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_silos(&self) -> Result<Vec<Silo>, StoreError> {
        let query = format!(
            "SELECT {SILO_COLUMNS} FROM silos s WHERE s.deleted_at IS NULL ORDER BY s.created_at, s.id"
        );
        let rows = sqlx::query(&query)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_silos", e))?;

        rows.iter().map(silo_from_row).collect()
    }

    #[instrument(skip(self, decide), fields(silo_id = %id), err)]
    async fn with_silo_lock(&self, id: SiloId, decide: Decide) -> Result<Committed, SiloError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut silo = lock_silo(&mut tx, id).await?.ok_or(DomainError::NotFound)?;

        // On a rejected decision `tx` is dropped, which rolls back and releases the row lock.
        let events = decide(&silo)?;

        let mut movements = Vec::new();
        for event in &events {
            let mut next = silo.clone();
            next.apply(event);

            match event {
                SiloEvent::Renamed { name } => update_name(&mut tx, id, name).await?,
                SiloEvent::Loaded(draft) | SiloEvent::Unloaded { movement: draft, .. } => {
                    update_stock(&mut tx, &next).await?;
                    movements.push(insert_movement(&mut tx, draft).await?);
                }
                SiloEvent::Deleted {
                    policy,
                    occurred_at,
                } => delete_silo(&mut tx, id, *policy, *occurred_at).await?,
            }

            silo = next;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(Committed {
            silo,
            movements,
            events_committed: events.len(),
        })
    }

    #[instrument(skip(self), err)]
    async fn movement_snapshot(&self) -> Result<Vec<MovementRow>, StoreError> {
        // A single statement sees one consistent snapshot.
        let rows = sqlx::query(
            r#"
            SELECT
                m.id,
                m.silo_id,
                m.kind,
                m.amount,
                m.cereal,
                m.occurred_at,
                s.name AS silo_name,
                s.amount AS silo_balance
            FROM movements m
            JOIN silos s ON s.id = m.silo_id
            WHERE s.deleted_at IS NULL
            ORDER BY m.occurred_at DESC, m.id ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("movement_snapshot", e))?;

        rows.iter().map(movement_row_from_row).collect()
    }
}

async fn lock_silo(
    tx: &mut Transaction<'_, Postgres>,
    id: SiloId,
) -> Result<Option<Silo>, StoreError> {
    let row = sqlx::query(
        r#"
        SELECT id, name, cereal, amount, created_at, deleted_at
        FROM silos
        WHERE id = $1 AND deleted_at IS NULL
        FOR UPDATE
        "#,
    )
    .bind(id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_silo", e))?;

    let Some(row) = row else {
        return Ok(None);
    };

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movements WHERE silo_id = $1")
        .bind(id.as_uuid())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("count_movements", e))?;

    silo_from_parts(&row, count).map(Some)
}

async fn update_name(
    tx: &mut Transaction<'_, Postgres>,
    id: SiloId,
    name: &SiloName,
) -> Result<(), SiloError> {
    sqlx::query("UPDATE silos SET name = $2 WHERE id = $1")
        .bind(id.as_uuid())
        .bind(name.as_str())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_name_error("update_name", name, e))?;
    Ok(())
}

async fn update_stock(tx: &mut Transaction<'_, Postgres>, silo: &Silo) -> Result<(), StoreError> {
    sqlx::query("UPDATE silos SET amount = $2, cereal = $3 WHERE id = $1")
        .bind(silo.id().as_uuid())
        .bind(to_db_amount(silo.amount())?)
        .bind(silo.cereal().map(Cereal::as_str))
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_stock", e))?;
    Ok(())
}

async fn insert_movement(
    tx: &mut Transaction<'_, Postgres>,
    draft: &MovementDraft,
) -> Result<Movement, StoreError> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO movements (silo_id, kind, amount, cereal, occurred_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(draft.silo_id.as_uuid())
    .bind(draft.kind.as_str())
    .bind(to_db_amount(draft.amount.get())?)
    .bind(draft.cereal.as_str())
    .bind(draft.occurred_at)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_movement", e))?;

    Ok(draft.clone().commit(MovementId::new(id as u64)))
}

async fn delete_silo(
    tx: &mut Transaction<'_, Postgres>,
    id: SiloId,
    policy: DeletePolicy,
    occurred_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let query = match policy {
        // Movements go with the row through ON DELETE CASCADE.
        DeletePolicy::Cascade | DeletePolicy::BlockIfHasMovements => {
            sqlx::query("DELETE FROM silos WHERE id = $1").bind(id.as_uuid())
        }
        DeletePolicy::SoftDelete => sqlx::query("UPDATE silos SET deleted_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(occurred_at),
    };
    query
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("delete_silo", e))?;
    Ok(())
}

fn silo_from_row(row: &PgRow) -> Result<Silo, StoreError> {
    let count: i64 = row
        .try_get("movement_count")
        .map_err(|e| StoreError::Corrupt(format!("failed to read movement_count: {e}")))?;
    silo_from_parts(row, count)
}

fn silo_from_parts(row: &PgRow, movement_count: i64) -> Result<Silo, StoreError> {
    let corrupt = |column: &str, e: sqlx::Error| {
        StoreError::Corrupt(format!("failed to read silos.{column}: {e}"))
    };

    let id: Uuid = row.try_get("id").map_err(|e| corrupt("id", e))?;
    let name: String = row.try_get("name").map_err(|e| corrupt("name", e))?;
    let cereal: Option<String> = row.try_get("cereal").map_err(|e| corrupt("cereal", e))?;
    let amount: i64 = row.try_get("amount").map_err(|e| corrupt("amount", e))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| corrupt("created_at", e))?;
    let deleted_at: Option<DateTime<Utc>> = row
        .try_get("deleted_at")
        .map_err(|e| corrupt("deleted_at", e))?;

    let name = SiloName::parse(&name).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let cereal = cereal
        .as_deref()
        .map(Cereal::parse)
        .transpose()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;

    Ok(Silo::rehydrate(
        SiloId::from_uuid(id),
        name,
        cereal,
        from_db_amount(amount)?,
        created_at,
        deleted_at,
        from_db_amount(movement_count)?,
    ))
}

fn movement_row_from_row(row: &PgRow) -> Result<MovementRow, StoreError> {
    let corrupt = |column: &str, e: sqlx::Error| {
        StoreError::Corrupt(format!("failed to read movements.{column}: {e}"))
    };

    let id: i64 = row.try_get("id").map_err(|e| corrupt("id", e))?;
    let silo_id: Uuid = row.try_get("silo_id").map_err(|e| corrupt("silo_id", e))?;
    let kind: String = row.try_get("kind").map_err(|e| corrupt("kind", e))?;
    let amount: i64 = row.try_get("amount").map_err(|e| corrupt("amount", e))?;
    let cereal: String = row.try_get("cereal").map_err(|e| corrupt("cereal", e))?;
    let occurred_at: DateTime<Utc> = row
        .try_get("occurred_at")
        .map_err(|e| corrupt("occurred_at", e))?;
    let silo_name: String = row
        .try_get("silo_name")
        .map_err(|e| corrupt("silo_name", e))?;
    let silo_balance: i64 = row
        .try_get("silo_balance")
        .map_err(|e| corrupt("silo_balance", e))?;

    let kind = MovementKind::from_code(&kind)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown movement kind '{kind}'")))?;
    let amount = Quantity::new(amount).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let cereal = Cereal::parse(&cereal).map_err(|e| StoreError::Corrupt(e.to_string()))?;

    Ok(MovementRow {
        movement: Movement {
            id: MovementId::new(from_db_amount(id)?),
            silo_id: SiloId::from_uuid(silo_id),
            kind,
            amount,
            cereal,
            occurred_at,
        },
        silo_name,
        silo_balance: from_db_amount(silo_balance)?,
    })
}

fn to_db_amount(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Corrupt(format!("amount {value} exceeds BIGINT")))
}

fn from_db_amount(value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative value {value}")))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

/// Name writes hit the live-name unique index; a violation there is a business error.
fn map_name_error(operation: &'static str, name: &SiloName, err: sqlx::Error) -> SiloError {
    if is_unique_violation(&err) {
        DomainError::duplicate_name(name.as_str()).into()
    } else {
        map_sqlx_error(operation, err).into()
    }
}

/// Map SQLx errors to `StoreError`.
fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => StoreError::Database {
            operation,
            message: db_err.message().to_string(),
        },
        sqlx::Error::PoolClosed => StoreError::Database {
            operation,
            message: "connection pool closed".to_string(),
        },
        other => StoreError::Database {
            operation,
            message: other.to_string(),
        },
    }
}
