use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, ItemId, RequestId};

/// Which direction a request moves stock.
///
/// Checkout withdraws, return gives back. Both kinds share one record shape
/// and one status vocabulary; the kind also selects the backing collection.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Checkout,
    Return,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Checkout => "checkout",
            RequestKind::Return => "return",
        }
    }
}

impl core::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval state of a request. Terminal once it leaves `Pending`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Declined,
}

impl ApprovalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }

    /// A valid decision is a terminal target; `pending` is never one.
    pub fn is_decision(&self) -> bool {
        self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Declined => "declined",
        }
    }
}

impl core::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Denormalized line snapshot embedded in a request.
///
/// `item_id` is a weak reference: deleting the item does not cascade, so a
/// line may point at nothing by the time the request is processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "id")]
    pub item_id: ItemId,
    pub name: String,
    pub image_url: Option<String>,
    /// On-hand quantity at the time the request was submitted.
    pub quantity: i64,
    pub selected_quantity: i64,
}

impl CartItem {
    /// Signed quantity delta this line applies on approval.
    pub fn delta(&self, kind: RequestKind) -> i64 {
        match kind {
            RequestKind::Checkout => -self.selected_quantity,
            RequestKind::Return => self.selected_quantity,
        }
    }
}

/// A user's intent to withdraw or return items, subject to approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub request_id: RequestId,
    pub user_id: String,
    pub kind: RequestKind,
    pub lines: Vec<CartItem>,
    /// Checkout only: what the items are for.
    pub purpose: Option<String>,
    /// Checkout only: loan duration in days.
    pub duration_days: Option<i64>,
    pub submitted_at: DateTime<Utc>,
    pub status: ApprovalStatus,
}

/// Input for submitting a request. The store assigns id, timestamp and the
/// initial `pending` status.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRequest {
    pub user_id: String,
    pub lines: Vec<CartItem>,
    pub purpose: Option<String>,
    pub duration_days: Option<i64>,
}

impl NewRequest {
    pub fn validate(&self) -> DomainResult<()> {
        if self.user_id.trim().is_empty() {
            return Err(DomainError::validation("user_id", "user_id cannot be empty"));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("lines", "request must contain at least one line"));
        }
        for line in &self.lines {
            if line.selected_quantity <= 0 {
                return Err(DomainError::validation(
                    "selected_quantity",
                    format!("line for item {} must select a positive quantity", line.item_id),
                ));
            }
        }
        if let Some(days) = self.duration_days {
            if days <= 0 {
                return Err(DomainError::validation("duration_days", "duration must be positive"));
            }
        }
        Ok(())
    }
}

/// Why a line was not applied during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    ItemNotFound,
    InsufficientStock { available: i64 },
    /// The backing store failed for this line; detail goes to the log.
    StoreFailure,
}

impl core::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SkipReason::ItemNotFound => f.write_str("item not found"),
            SkipReason::InsufficientStock { available } => {
                write!(f, "insufficient stock (available {available})")
            }
            SkipReason::StoreFailure => f.write_str("store failure"),
        }
    }
}

/// Outcome of one line of an approval, part of the auditable result the
/// workflow hands back instead of burying partial application in logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineOutcome {
    pub item_id: ItemId,
    pub delta: i64,
    #[serde(flatten)]
    pub result: LineResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum LineResult {
    Applied { new_quantity: i64 },
    Skipped(SkipReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(item_id: i64, selected: i64) -> CartItem {
        CartItem {
            item_id: ItemId::new(item_id),
            name: format!("item-{item_id}"),
            image_url: None,
            quantity: 0,
            selected_quantity: selected,
        }
    }

    #[test]
    fn status_serializes_lowercase_for_both_kinds() {
        let json = serde_json::to_string(&ApprovalStatus::Approved).unwrap();
        assert_eq!(json, "\"approved\"");
        let parsed: ApprovalStatus = serde_json::from_str("\"declined\"").unwrap();
        assert_eq!(parsed, ApprovalStatus::Declined);
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!ApprovalStatus::Pending.is_terminal());
        assert!(ApprovalStatus::Approved.is_terminal());
        assert!(ApprovalStatus::Declined.is_terminal());
        assert!(!ApprovalStatus::Pending.is_decision());
    }

    #[test]
    fn delta_sign_follows_kind() {
        let l = line(1, 3);
        assert_eq!(l.delta(RequestKind::Checkout), -3);
        assert_eq!(l.delta(RequestKind::Return), 3);
    }

    #[test]
    fn new_request_requires_lines_and_positive_quantities() {
        let base = NewRequest {
            user_id: "user-1".into(),
            lines: vec![line(1, 2)],
            purpose: None,
            duration_days: None,
        };
        assert!(base.validate().is_ok());

        let empty = NewRequest { lines: vec![], ..base.clone() };
        assert!(empty.validate().is_err());

        let zero_qty = NewRequest { lines: vec![line(1, 0)], ..base.clone() };
        assert!(zero_qty.validate().is_err());

        let blank_user = NewRequest { user_id: "  ".into(), ..base };
        assert!(blank_user.validate().is_err());
    }

    #[test]
    fn cart_item_wire_field_is_id() {
        let json = serde_json::to_value(line(7, 1)).unwrap();
        assert_eq!(json["id"], 7);
        assert!(json.get("item_id").is_none());
    }
}
