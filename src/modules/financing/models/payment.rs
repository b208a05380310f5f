use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::allocation_intent::AllocationIntent;

/// `relatedEntityType` value that puts a payment in scope of financing reconciliation
pub const FINANCING_INSTALLMENTS_ENTITY: &str = "financingInstallments";

/// Payment approval status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Completed,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Completed => "COMPLETED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Only approved and completed payments are ledger facts
    pub fn counts_toward_ledger(&self) -> bool {
        matches!(self, Self::Approved | Self::Completed)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "COMPLETED" => Ok(Self::Completed),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

/// Approved payment event; immutable for the reconciliation passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Ascending ids give chronological order
    pub id: i64,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub related_entity_type: String,
    /// Financing id when `related_entity_type` is `financingInstallments`
    pub related_entity_id: i64,
    /// Advisory allocation intent recorded at approval time
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

impl Payment {
    /// Whether this payment belongs to the financing's ledger
    pub fn is_ledger_entry_for(&self, financing_id: i64) -> bool {
        self.status.counts_toward_ledger()
            && self.related_entity_type == FINANCING_INSTALLMENTS_ENTITY
            && self.related_entity_id == financing_id
    }

    /// Parse the metadata into a typed allocation intent
    pub fn allocation_intent(&self) -> AllocationIntent {
        AllocationIntent::parse(self.metadata.as_ref())
    }
}
