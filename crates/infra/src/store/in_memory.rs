use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use stockroom_core::{ItemId, RequestId};
use stockroom_inventory::{
    ApprovalRequest, ApprovalStatus, Item, ItemPatch, NewItem, NewRequest, RequestKind,
};

use super::{DeductOutcome, ItemStore, RequestStore, StatusUpdate, StoreError, StoreResult};

/// In-memory item collection.
///
/// Intended for tests/dev. Ids come from a process-local monotonic counter;
/// iteration order is id order, which matches insertion order.
#[derive(Debug)]
pub struct InMemoryItemStore {
    items: RwLock<BTreeMap<ItemId, Item>>,
    next_id: AtomicI64,
}

impl InMemoryItemStore {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryItemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    async fn list(&self) -> StoreResult<Vec<Item>> {
        let items = self.items.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(items.values().cloned().collect())
    }

    async fn get(&self, id: ItemId) -> StoreResult<Option<Item>> {
        let items = self.items.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(items.get(&id).cloned())
    }

    async fn create(&self, new: NewItem) -> StoreResult<Item> {
        let id = ItemId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let item = Item::create(id, new, Utc::now());
        let mut items = self.items.write().map_err(|_| StoreError::LockPoisoned)?;
        items.insert(id, item.clone());
        Ok(item)
    }

    async fn update(&self, id: ItemId, patch: ItemPatch) -> StoreResult<Option<Item>> {
        let mut items = self.items.write().map_err(|_| StoreError::LockPoisoned)?;
        let Some(item) = items.get_mut(&id) else {
            return Ok(None);
        };
        item.apply_patch(patch, Utc::now());
        Ok(Some(item.clone()))
    }

    async fn delete(&self, id: ItemId) -> StoreResult<bool> {
        let mut items = self.items.write().map_err(|_| StoreError::LockPoisoned)?;
        Ok(items.remove(&id).is_some())
    }

    async fn adjust_quantity(&self, id: ItemId, delta: i64) -> StoreResult<Option<Item>> {
        let mut items = self.items.write().map_err(|_| StoreError::LockPoisoned)?;
        let Some(item) = items.get_mut(&id) else {
            return Ok(None);
        };
        item.apply_patch(
            ItemPatch {
                quantity: Some((item.quantity + delta).max(0)),
                ..ItemPatch::default()
            },
            Utc::now(),
        );
        Ok(Some(item.clone()))
    }

    async fn deduct_if_available(&self, id: ItemId, qty: i64) -> StoreResult<DeductOutcome> {
        let mut items = self.items.write().map_err(|_| StoreError::LockPoisoned)?;
        let Some(item) = items.get_mut(&id) else {
            return Ok(DeductOutcome::NotFound);
        };
        if item.quantity < qty {
            return Ok(DeductOutcome::Insufficient {
                available: item.quantity,
            });
        }
        item.apply_patch(
            ItemPatch {
                quantity: Some(item.quantity - qty),
                ..ItemPatch::default()
            },
            Utc::now(),
        );
        Ok(DeductOutcome::Applied(item.clone()))
    }
}

/// In-memory request collections, one `Vec` per kind so listing preserves
/// insertion order like the document store it stands in for.
#[derive(Debug, Default)]
pub struct InMemoryRequestStore {
    checkouts: RwLock<Vec<ApprovalRequest>>,
    returns: RwLock<Vec<ApprovalRequest>>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collection(&self, kind: RequestKind) -> &RwLock<Vec<ApprovalRequest>> {
        match kind {
            RequestKind::Checkout => &self.checkouts,
            RequestKind::Return => &self.returns,
        }
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn list(&self, kind: RequestKind) -> StoreResult<Vec<ApprovalRequest>> {
        let records = self
            .collection(kind)
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.clone())
    }

    async fn get(&self, kind: RequestKind, id: RequestId) -> StoreResult<Option<ApprovalRequest>> {
        let records = self
            .collection(kind)
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.iter().find(|r| r.request_id == id).cloned())
    }

    async fn create(&self, kind: RequestKind, new: NewRequest) -> StoreResult<ApprovalRequest> {
        let record = ApprovalRequest {
            request_id: RequestId::new(),
            user_id: new.user_id,
            kind,
            lines: new.lines,
            purpose: new.purpose,
            duration_days: new.duration_days,
            submitted_at: Utc::now(),
            status: ApprovalStatus::Pending,
        };
        let mut records = self
            .collection(kind)
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        records.push(record.clone());
        Ok(record)
    }

    async fn list_by_status(
        &self,
        kind: RequestKind,
        status: ApprovalStatus,
    ) -> StoreResult<Vec<ApprovalRequest>> {
        let records = self
            .collection(kind)
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.iter().filter(|r| r.status == status).cloned().collect())
    }

    async fn set_status_if_pending(
        &self,
        kind: RequestKind,
        id: RequestId,
        status: ApprovalStatus,
    ) -> StoreResult<StatusUpdate> {
        let mut records = self
            .collection(kind)
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        let Some(record) = records.iter_mut().find(|r| r.request_id == id) else {
            return Ok(StatusUpdate::NotFound);
        };
        if record.status.is_terminal() {
            return Ok(StatusUpdate::AlreadyProcessed(record.status));
        }
        record.status = status;
        Ok(StatusUpdate::Applied(record.clone()))
    }
}
