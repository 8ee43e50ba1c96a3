//! Infrastructure layer: stores and the approval workflow service.

pub mod store;
pub mod workflow;

pub use store::{
    DeductOutcome, InMemoryItemStore, InMemoryRequestStore, ItemStore, PostgresItemStore,
    PostgresRequestStore, RequestStore, StatusUpdate, StoreError, StoreResult,
};
pub use workflow::{ApplyMode, ApprovalOutcome, ApprovalWorkflow, WorkflowError};
