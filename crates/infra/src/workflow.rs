//! Approval workflow: the state machine driving a request from `pending`
//! into a terminal status, reconciling on-hand quantities on approval.
//!
//! Two application modes:
//! - `Atomic` (default): validate every checkout line's sufficiency first,
//!   apply all deltas, and only then mark the record terminal. A shortage
//!   leaves the record pending.
//! - `BestEffort`: mirror of the original client-side behavior — commit the
//!   terminal status first, then apply each line independently; a line that
//!   cannot be applied is skipped with a warning and never changes the
//!   overall outcome.
//!
//! Either way the status write is guarded by compare-and-swap, so a request
//! that already left `pending` can never be processed twice.

use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use stockroom_core::RequestId;
use stockroom_inventory::{
    ApprovalRequest, ApprovalStatus, CartItem, LineOutcome, LineResult, RequestKind, SkipReason,
};

use crate::store::{DeductOutcome, ItemStore, RequestStore, StatusUpdate, StoreError};

/// How approval applies inventory deltas.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ApplyMode {
    #[default]
    Atomic,
    BestEffort,
}

impl FromStr for ApplyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "atomic" => Ok(ApplyMode::Atomic),
            "best-effort" => Ok(ApplyMode::BestEffort),
            other => Err(format!("unknown approval mode '{other}' (expected 'atomic' or 'best-effort')")),
        }
    }
}

/// Workflow failure. Per-line trouble in best-effort mode is NOT an error;
/// it lands in the outcome ledger instead.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("request not found")]
    NotFound,

    #[error("request already {0}")]
    AlreadyProcessed(ApprovalStatus),

    #[error("'{0}' is not a valid decision")]
    InvalidDecision(ApprovalStatus),

    /// Atomic mode only: one or more checkout lines cannot be satisfied.
    /// The request stays pending.
    #[error("insufficient stock for {} line(s)", .0.len())]
    InsufficientStock(Vec<LineOutcome>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a processed transition did, including the per-line reconciliation
/// results. Partial application is an auditable fact here, not a log line.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutcome {
    pub request: ApprovalRequest,
    pub lines: Vec<LineOutcome>,
}

/// The approval state machine over injected stores.
#[derive(Clone)]
pub struct ApprovalWorkflow {
    items: Arc<dyn ItemStore>,
    requests: Arc<dyn RequestStore>,
    mode: ApplyMode,
}

impl ApprovalWorkflow {
    pub fn new(items: Arc<dyn ItemStore>, requests: Arc<dyn RequestStore>, mode: ApplyMode) -> Self {
        Self {
            items,
            requests,
            mode,
        }
    }

    pub fn mode(&self) -> ApplyMode {
        self.mode
    }

    /// Drive one request from `pending` into `decision`.
    pub async fn process(
        &self,
        kind: RequestKind,
        request_id: RequestId,
        decision: ApprovalStatus,
    ) -> Result<ApprovalOutcome, WorkflowError> {
        if !decision.is_decision() {
            return Err(WorkflowError::InvalidDecision(decision));
        }

        if decision == ApprovalStatus::Declined {
            // Status update only, no inventory side effect.
            let request = self.commit_status(kind, request_id, decision).await?;
            return Ok(ApprovalOutcome {
                request,
                lines: Vec::new(),
            });
        }

        match self.mode {
            ApplyMode::Atomic => self.approve_atomic(kind, request_id).await,
            ApplyMode::BestEffort => self.approve_best_effort(kind, request_id).await,
        }
    }

    async fn approve_atomic(
        &self,
        kind: RequestKind,
        request_id: RequestId,
    ) -> Result<ApprovalOutcome, WorkflowError> {
        let Some(request) = self.requests.get(kind, request_id).await? else {
            return Err(WorkflowError::NotFound);
        };
        if request.status.is_terminal() {
            return Err(WorkflowError::AlreadyProcessed(request.status));
        }

        // Phase 1: check every checkout line before touching stock. Returns
        // are additive and cannot fail this check.
        if kind == RequestKind::Checkout {
            let mut short = Vec::new();
            for line in &request.lines {
                match self.items.get(line.item_id).await? {
                    None => short.push(skipped(line, kind, SkipReason::ItemNotFound)),
                    Some(item) if item.quantity < line.selected_quantity => short.push(skipped(
                        line,
                        kind,
                        SkipReason::InsufficientStock {
                            available: item.quantity,
                        },
                    )),
                    Some(_) => {}
                }
            }
            if !short.is_empty() {
                for outcome in &short {
                    warn_skip(request_id, outcome);
                }
                return Err(WorkflowError::InsufficientStock(short));
            }
        }

        // Phase 2: apply all deltas. The conditional decrement is the
        // authority; phase 1 is advisory and a concurrent writer can still
        // win the race, in which case we stop without marking the record
        // terminal. Already-applied lines stay applied: there is no
        // cross-item transaction to roll them back.
        let mut outcomes = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let outcome = self.apply_line(kind, line).await?;
            match &outcome.result {
                LineResult::Applied { .. } => outcomes.push(outcome),
                LineResult::Skipped(_) => {
                    warn_skip(request_id, &outcome);
                    outcomes.push(outcome);
                    return Err(WorkflowError::InsufficientStock(outcomes));
                }
            }
        }

        // Phase 3: mark terminal only after every delta landed.
        let request = self.commit_status(kind, request_id, ApprovalStatus::Approved).await?;
        Ok(ApprovalOutcome {
            request,
            lines: outcomes,
        })
    }

    async fn approve_best_effort(
        &self,
        kind: RequestKind,
        request_id: RequestId,
    ) -> Result<ApprovalOutcome, WorkflowError> {
        // Status first; the transition is considered successful once this
        // commits, whatever happens to the individual lines below.
        let request = self
            .commit_status(kind, request_id, ApprovalStatus::Approved)
            .await?;

        let mut outcomes = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let outcome = match self.apply_line(kind, line).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(
                        request_id = %request_id,
                        item_id = %line.item_id,
                        delta = line.delta(kind),
                        error = %e,
                        "inventory update failed for line; continuing"
                    );
                    skipped(line, kind, SkipReason::StoreFailure)
                }
            };
            if let LineResult::Skipped(_) = &outcome.result {
                warn_skip(request_id, &outcome);
            }
            outcomes.push(outcome);
        }

        Ok(ApprovalOutcome {
            request,
            lines: outcomes,
        })
    }

    async fn commit_status(
        &self,
        kind: RequestKind,
        request_id: RequestId,
        status: ApprovalStatus,
    ) -> Result<ApprovalRequest, WorkflowError> {
        match self
            .requests
            .set_status_if_pending(kind, request_id, status)
            .await?
        {
            StatusUpdate::Applied(request) => Ok(request),
            StatusUpdate::AlreadyProcessed(current) => {
                Err(WorkflowError::AlreadyProcessed(current))
            }
            StatusUpdate::NotFound => Err(WorkflowError::NotFound),
        }
    }

    async fn apply_line(
        &self,
        kind: RequestKind,
        line: &CartItem,
    ) -> Result<LineOutcome, StoreError> {
        let delta = line.delta(kind);
        let result = match kind {
            RequestKind::Checkout => {
                match self
                    .items
                    .deduct_if_available(line.item_id, line.selected_quantity)
                    .await?
                {
                    DeductOutcome::Applied(item) => LineResult::Applied {
                        new_quantity: item.quantity,
                    },
                    DeductOutcome::Insufficient { available } => {
                        LineResult::Skipped(SkipReason::InsufficientStock { available })
                    }
                    DeductOutcome::NotFound => LineResult::Skipped(SkipReason::ItemNotFound),
                }
            }
            // Returns add stock; the store clamps at zero so corrupt input
            // can never drive a quantity negative.
            RequestKind::Return => match self.items.adjust_quantity(line.item_id, delta).await? {
                Some(item) => LineResult::Applied {
                    new_quantity: item.quantity,
                },
                None => LineResult::Skipped(SkipReason::ItemNotFound),
            },
        };

        Ok(LineOutcome {
            item_id: line.item_id,
            delta,
            result,
        })
    }
}

fn skipped(line: &CartItem, kind: RequestKind, reason: SkipReason) -> LineOutcome {
    LineOutcome {
        item_id: line.item_id,
        delta: line.delta(kind),
        result: LineResult::Skipped(reason),
    }
}

fn warn_skip(request_id: RequestId, outcome: &LineOutcome) {
    if let LineResult::Skipped(reason) = &outcome.result {
        tracing::warn!(
            request_id = %request_id,
            item_id = %outcome.item_id,
            delta = outcome.delta,
            reason = %reason,
            "line skipped during approval"
        );
    }
}
