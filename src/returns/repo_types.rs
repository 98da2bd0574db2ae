use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Approval state of a return request. Terminal once decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReturnStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            ReturnStatus::Pending => "Pending",
            ReturnStatus::Approved => "Approved",
            ReturnStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(ReturnStatus::Pending),
            "Approved" => Some(ReturnStatus::Approved),
            "Rejected" => Some(ReturnStatus::Rejected),
            _ => None,
        }
    }
}

/// Monetary settlement state, tracked separately from approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundStatus {
    #[serde(rename = "Not Initiated")]
    NotInitiated,
    #[serde(rename = "Refund Initiated")]
    RefundInitiated,
    #[serde(rename = "Refund Successful")]
    RefundSuccessful,
    Rejected,
}

impl RefundStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            RefundStatus::NotInitiated => "Not Initiated",
            RefundStatus::RefundInitiated => "Refund Initiated",
            RefundStatus::RefundSuccessful => "Refund Successful",
            RefundStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Not Initiated" => Some(RefundStatus::NotInitiated),
            "Refund Initiated" => Some(RefundStatus::RefundInitiated),
            "Refund Successful" => Some(RefundStatus::RefundSuccessful),
            "Rejected" => Some(RefundStatus::Rejected),
            _ => None,
        }
    }
}

/// A customer's claim to return a purchased order for refund.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: String,
    pub reason: String,
    pub status: ReturnStatus,
    pub refund_status: RefundStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub approved_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub refunded_at: Option<OffsetDateTime>,
}

/// Validated input for a new return request; the store assigns id, the
/// Pending/Not Initiated states and both timestamps.
#[derive(Debug, Clone)]
pub struct NewReturn {
    pub user_id: Uuid,
    pub order_id: String,
    pub reason: String,
}

/// Per-user return volume over a trailing window, from the store's
/// group-by aggregation.
#[derive(Debug, Clone)]
pub struct ReturnVolume {
    pub user_id: Uuid,
    pub return_count: i64,
    pub unique_orders: i64,
}
