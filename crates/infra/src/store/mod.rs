//! Storage layer: keyed document collections for items and requests.
//!
//! Two implementations share these traits: an in-memory store (tests/dev)
//! and a Postgres-backed store (production). The traits deliberately expose
//! per-document atomic primitives (`adjust_quantity`, `deduct_if_available`,
//! `set_status_if_pending`); there is no cross-document transaction, so a
//! multi-line approval is a sequence of independent per-item operations.

use async_trait::async_trait;
use thiserror::Error;

use stockroom_core::{ItemId, RequestId};
use stockroom_inventory::{
    ApprovalRequest, ApprovalStatus, Item, ItemPatch, NewItem, NewRequest, RequestKind,
};

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryItemStore, InMemoryRequestStore};
pub use postgres::{connect, PostgresItemStore, PostgresRequestStore};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Backing-store failure. Surfaced as a generic 500 at the HTTP boundary;
/// the detail stays in the log.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(#[from] sqlx::Error),

    #[error("stored document could not be decoded: {0}")]
    Decode(String),

    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result of a conditional decrement against one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeductOutcome {
    /// The decrement applied; carries the updated item.
    Applied(Item),
    /// On-hand quantity was below the requested amount; nothing changed.
    Insufficient { available: i64 },
    NotFound,
}

/// Result of the compare-and-swap status update on a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    /// The record was still pending; carries the updated record.
    Applied(ApprovalRequest),
    /// The record had already left `pending`; nothing changed.
    AlreadyProcessed(ApprovalStatus),
    NotFound,
}

/// Keyed collection of stock items.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// All items, storage iteration order.
    async fn list(&self) -> StoreResult<Vec<Item>>;

    /// Point lookup; an absent id is `None`, not an error.
    async fn get(&self, id: ItemId) -> StoreResult<Option<Item>>;

    /// Create a new item. The store assigns the id (monotonic sequence),
    /// derives the stock status and stamps `last_updated`.
    async fn create(&self, new: NewItem) -> StoreResult<Item>;

    /// Merge a partial update onto an existing record, recomputing status
    /// and `last_updated` from the merged quantity.
    async fn update(&self, id: ItemId, patch: ItemPatch) -> StoreResult<Option<Item>>;

    /// Returns true iff a record existed and was removed.
    async fn delete(&self, id: ItemId) -> StoreResult<bool>;

    /// Atomically apply a signed quantity delta to one item, clamped so the
    /// result is never negative. Used by the return path.
    async fn adjust_quantity(&self, id: ItemId, delta: i64) -> StoreResult<Option<Item>>;

    /// Atomically decrement one item's quantity iff at least `qty` is on
    /// hand. Used by the checkout path; this is the guard against lost
    /// updates when two approvals touch the same item concurrently.
    async fn deduct_if_available(&self, id: ItemId, qty: i64) -> StoreResult<DeductOutcome>;
}

/// Keyed collections of approval requests, one collection per kind.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn list(&self, kind: RequestKind) -> StoreResult<Vec<ApprovalRequest>>;

    async fn get(&self, kind: RequestKind, id: RequestId) -> StoreResult<Option<ApprovalRequest>>;

    /// Create a new request: server-assigned id, `submitted_at` = now,
    /// status starts `pending`.
    async fn create(&self, kind: RequestKind, new: NewRequest) -> StoreResult<ApprovalRequest>;

    /// Equality filter on status.
    async fn list_by_status(
        &self,
        kind: RequestKind,
        status: ApprovalStatus,
    ) -> StoreResult<Vec<ApprovalRequest>>;

    /// Conditional status write: applies only while the record is still
    /// `pending`. Closes the double-approval race the unconditional write
    /// would allow.
    async fn set_status_if_pending(
        &self,
        kind: RequestKind,
        id: RequestId,
        status: ApprovalStatus,
    ) -> StoreResult<StatusUpdate>;
}
