//! Postgres-backed stores.
//!
//! Documents map onto flat tables; the embedded line snapshots live in a
//! JSONB column. The per-document atomic primitives are single UPDATE
//! statements so concurrent writers to the same item cannot lose updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use stockroom_core::{ItemId, RequestId};
use stockroom_inventory::{
    ApprovalRequest, ApprovalStatus, CartItem, Item, ItemPatch, NewItem, NewRequest, RequestKind,
    StockStatus,
};

use super::{DeductOutcome, ItemStore, RequestStore, StatusUpdate, StoreError, StoreResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    id           BIGSERIAL PRIMARY KEY,
    name         TEXT NOT NULL,
    category     TEXT,
    quantity     BIGINT NOT NULL DEFAULT 0,
    notes        TEXT,
    image_url    TEXT,
    last_updated TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS requests (
    request_id    UUID PRIMARY KEY,
    user_id       TEXT NOT NULL,
    lines         JSONB NOT NULL,
    purpose       TEXT,
    duration_days BIGINT,
    submitted_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    status        TEXT NOT NULL DEFAULT 'pending'
);

CREATE TABLE IF NOT EXISTS return_requests (
    request_id    UUID PRIMARY KEY,
    user_id       TEXT NOT NULL,
    lines         JSONB NOT NULL,
    purpose       TEXT,
    duration_days BIGINT,
    submitted_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    status        TEXT NOT NULL DEFAULT 'pending'
);
"#;

/// Connect, bootstrap the schema, and hand back both stores sharing one
/// pool.
pub async fn connect(url: &str) -> StoreResult<(PostgresItemStore, PostgresRequestStore)> {
    let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;

    for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
        sqlx::query(statement).execute(&pool).await?;
    }

    Ok((
        PostgresItemStore { pool: pool.clone() },
        PostgresRequestStore { pool },
    ))
}

/// Items table, status derived on read (never stored: it is a pure function
/// of quantity).
#[derive(Debug, Clone)]
pub struct PostgresItemStore {
    pool: PgPool,
}

const ITEM_COLUMNS: &str = "id, name, category, quantity, notes, image_url, last_updated";

fn item_from_row(row: &sqlx::postgres::PgRow) -> Result<Item, sqlx::Error> {
    let quantity: i64 = row.try_get("quantity")?;
    Ok(Item {
        id: ItemId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        quantity,
        status: StockStatus::derive(quantity),
        notes: row.try_get("notes")?,
        image_url: row.try_get("image_url")?,
        last_updated: row.try_get::<DateTime<Utc>, _>("last_updated")?,
    })
}

#[async_trait]
impl ItemStore for PostgresItemStore {
    async fn list(&self) -> StoreResult<Vec<Item>> {
        let rows = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| item_from_row(r).map_err(StoreError::from))
            .collect()
    }

    async fn get(&self, id: ItemId) -> StoreResult<Option<Item>> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(item_from_row).transpose().map_err(StoreError::from)
    }

    async fn create(&self, new: NewItem) -> StoreResult<Item> {
        let row = sqlx::query(&format!(
            "INSERT INTO items (name, category, quantity, notes, image_url, last_updated) \
             VALUES ($1, $2, $3, $4, $5, now()) RETURNING {ITEM_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&new.category)
        .bind(new.quantity.unwrap_or(0))
        .bind(&new.notes)
        .bind(&new.image_url)
        .fetch_one(&self.pool)
        .await?;
        item_from_row(&row).map_err(StoreError::from)
    }

    async fn update(&self, id: ItemId, patch: ItemPatch) -> StoreResult<Option<Item>> {
        // Merge-on-write: unspecified fields keep their prior values, and
        // last_updated is bumped even for an empty patch.
        let row = sqlx::query(&format!(
            "UPDATE items SET \
                name = COALESCE($2, name), \
                category = COALESCE($3, category), \
                quantity = COALESCE($4, quantity), \
                notes = COALESCE($5, notes), \
                image_url = COALESCE($6, image_url), \
                last_updated = now() \
             WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(&patch.name)
        .bind(&patch.category)
        .bind(patch.quantity)
        .bind(&patch.notes)
        .bind(&patch.image_url)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(item_from_row).transpose().map_err(StoreError::from)
    }

    async fn delete(&self, id: ItemId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn adjust_quantity(&self, id: ItemId, delta: i64) -> StoreResult<Option<Item>> {
        let row = sqlx::query(&format!(
            "UPDATE items SET quantity = GREATEST(quantity + $2, 0), last_updated = now() \
             WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(item_from_row).transpose().map_err(StoreError::from)
    }

    async fn deduct_if_available(&self, id: ItemId, qty: i64) -> StoreResult<DeductOutcome> {
        let row = sqlx::query(&format!(
            "UPDATE items SET quantity = quantity - $2, last_updated = now() \
             WHERE id = $1 AND quantity >= $2 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id.as_i64())
        .bind(qty)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(DeductOutcome::Applied(item_from_row(&row)?));
        }

        // Distinguish "not enough" from "no such item".
        let available = sqlx::query("SELECT quantity FROM items WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        match available {
            Some(row) => Ok(DeductOutcome::Insufficient {
                available: row.try_get("quantity")?,
            }),
            None => Ok(DeductOutcome::NotFound),
        }
    }
}

/// Request collections; the kind selects the table.
#[derive(Debug, Clone)]
pub struct PostgresRequestStore {
    pool: PgPool,
}

const REQUEST_COLUMNS: &str =
    "request_id, user_id, lines, purpose, duration_days, submitted_at, status";

fn table(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::Checkout => "requests",
        RequestKind::Return => "return_requests",
    }
}

fn status_from_str(s: &str) -> Result<ApprovalStatus, StoreError> {
    match s {
        "pending" => Ok(ApprovalStatus::Pending),
        "approved" => Ok(ApprovalStatus::Approved),
        "declined" => Ok(ApprovalStatus::Declined),
        other => Err(StoreError::Decode(format!("unknown status '{other}'"))),
    }
}

fn request_from_row(kind: RequestKind, row: &sqlx::postgres::PgRow) -> Result<ApprovalRequest, StoreError> {
    let lines: serde_json::Value = row.try_get("lines")?;
    let lines: Vec<CartItem> = serde_json::from_value(lines)
        .map_err(|e| StoreError::Decode(format!("lines: {e}")))?;
    let status: String = row.try_get("status")?;

    Ok(ApprovalRequest {
        request_id: RequestId::from_uuid(row.try_get("request_id")?),
        user_id: row.try_get("user_id")?,
        kind,
        lines,
        purpose: row.try_get("purpose")?,
        duration_days: row.try_get("duration_days")?,
        submitted_at: row.try_get::<DateTime<Utc>, _>("submitted_at")?,
        status: status_from_str(&status)?,
    })
}

#[async_trait]
impl RequestStore for PostgresRequestStore {
    async fn list(&self, kind: RequestKind) -> StoreResult<Vec<ApprovalRequest>> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM {} ORDER BY submitted_at",
            table(kind)
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(|r| request_from_row(kind, r)).collect()
    }

    async fn get(&self, kind: RequestKind, id: RequestId) -> StoreResult<Option<ApprovalRequest>> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM {} WHERE request_id = $1",
            table(kind)
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(|r| request_from_row(kind, r)).transpose()
    }

    async fn create(&self, kind: RequestKind, new: NewRequest) -> StoreResult<ApprovalRequest> {
        let id = RequestId::new();
        let lines = serde_json::to_value(&new.lines)
            .map_err(|e| StoreError::Decode(format!("lines: {e}")))?;
        let row = sqlx::query(&format!(
            "INSERT INTO {} (request_id, user_id, lines, purpose, duration_days, submitted_at, status) \
             VALUES ($1, $2, $3, $4, $5, now(), 'pending') RETURNING {REQUEST_COLUMNS}",
            table(kind)
        ))
        .bind(id.as_uuid())
        .bind(&new.user_id)
        .bind(lines)
        .bind(&new.purpose)
        .bind(new.duration_days)
        .fetch_one(&self.pool)
        .await?;
        request_from_row(kind, &row)
    }

    async fn list_by_status(
        &self,
        kind: RequestKind,
        status: ApprovalStatus,
    ) -> StoreResult<Vec<ApprovalRequest>> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM {} WHERE status = $1 ORDER BY submitted_at",
            table(kind)
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(|r| request_from_row(kind, r)).collect()
    }

    async fn set_status_if_pending(
        &self,
        kind: RequestKind,
        id: RequestId,
        status: ApprovalStatus,
    ) -> StoreResult<StatusUpdate> {
        let row = sqlx::query(&format!(
            "UPDATE {} SET status = $2 WHERE request_id = $1 AND status = 'pending' \
             RETURNING {REQUEST_COLUMNS}",
            table(kind)
        ))
        .bind(id.as_uuid())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(StatusUpdate::Applied(request_from_row(kind, &row)?));
        }

        let current = sqlx::query(&format!(
            "SELECT status FROM {} WHERE request_id = $1",
            table(kind)
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        match current {
            Some(row) => {
                let status: String = row.try_get("status")?;
                Ok(StatusUpdate::AlreadyProcessed(status_from_str(&status)?))
            }
            None => Ok(StatusUpdate::NotFound),
        }
    }
}
