//! Inventory domain module.
//!
//! This crate contains the business rules for stock items and approval
//! requests, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage).

pub mod item;
pub mod request;

pub use item::{Item, ItemPatch, NewItem, StockStatus, LOW_STOCK_THRESHOLD};
pub use request::{
    ApprovalRequest, ApprovalStatus, CartItem, LineOutcome, LineResult, NewRequest, RequestKind,
    SkipReason,
};
