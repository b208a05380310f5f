use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::round2;

/// One cuota of a financing plan
///
/// `paid`/`pending`/`status` are the cached projection of the payment ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: i64,
    pub financing_id: i64,
    /// Ordering key; `None` or `0` marks a non-regular cuota (initial payment, reservation)
    pub number: Option<i32>,
    /// Principal due
    pub amount: Decimal,
    pub paid: Decimal,
    /// `amount - paid`; negative when the cuota is over-paid
    pub pending: Decimal,
    #[serde(default)]
    pub late_fee_amount: Decimal,
    #[serde(default)]
    pub late_fee_paid: Decimal,
    #[serde(default)]
    pub late_fee_pending: Decimal,
    pub expected_payment_date: Option<NaiveDate>,
    pub status: InstallmentStatus,
}

/// Installment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallmentStatus {
    /// Not (fully) paid yet
    Pending,
    /// Pending balance is zero or below
    Paid,
    /// Unpaid, past its expected date, and carrying a late fee
    Expired,
}

impl InstallmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Expired => "EXPIRED",
        }
    }
}

impl std::fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for InstallmentStatus {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        match value.to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "EXPIRED" => Ok(Self::Expired),
            _ => Err(format!("Invalid installment status: {}", value)),
        }
    }
}

/// Single source of truth for installment status transitions
///
/// `as_of` turns on expiry evaluation and is only passed when the projection
/// is being reset. Settlement recomputes pass `None`, so a cuota that received
/// money is never marked EXPIRED.
pub fn derive_status(
    paid: Decimal,
    amount: Decimal,
    expected_payment_date: Option<NaiveDate>,
    late_fee_amount: Decimal,
    as_of: Option<NaiveDate>,
) -> InstallmentStatus {
    if amount - paid <= Decimal::ZERO {
        return InstallmentStatus::Paid;
    }

    let overdue = match (as_of, expected_payment_date) {
        (Some(today), Some(expected)) => expected < today,
        _ => false,
    };

    if overdue && paid <= Decimal::ZERO && late_fee_amount > Decimal::ZERO {
        InstallmentStatus::Expired
    } else {
        InstallmentStatus::Pending
    }
}

impl Installment {
    /// Create an unpaid installment
    pub fn new(
        id: i64,
        financing_id: i64,
        number: Option<i32>,
        amount: Decimal,
        expected_payment_date: Option<NaiveDate>,
    ) -> Self {
        let amount = round2(amount);
        Self {
            id,
            financing_id,
            number,
            amount,
            paid: Decimal::ZERO,
            pending: amount,
            late_fee_amount: Decimal::ZERO,
            late_fee_paid: Decimal::ZERO,
            late_fee_pending: Decimal::ZERO,
            expected_payment_date,
            status: derive_status(Decimal::ZERO, amount, None, Decimal::ZERO, None),
        }
    }

    /// Display label used in logs and reports ("cuota 3", "cuota 0", "non-regular #12")
    pub fn label(&self) -> String {
        match self.number {
            Some(n) => format!("cuota {}", n),
            None => format!("non-regular #{}", self.id),
        }
    }

    /// Clear the projection back to "nothing paid"
    ///
    /// Late-fee payments are cleared as well; the late-fee ledger is not replayed here.
    pub fn reset(&mut self, as_of: NaiveDate) {
        self.paid = Decimal::ZERO;
        self.pending = self.amount;
        self.late_fee_paid = Decimal::ZERO;
        self.late_fee_pending = self.late_fee_amount;
        self.status = derive_status(
            self.paid,
            self.amount,
            self.expected_payment_date,
            self.late_fee_amount,
            Some(as_of),
        );
    }

    /// Add `amount` to the paid balance and recompute pending/status
    pub fn apply(&mut self, amount: Decimal) {
        self.set_paid(self.paid + amount);
    }

    /// Overwrite the paid balance and recompute pending/status
    pub fn set_paid(&mut self, paid: Decimal) {
        self.paid = round2(paid);
        self.settle();
    }

    fn settle(&mut self) {
        self.pending = round2(self.amount - self.paid);
        self.status = derive_status(
            self.paid,
            self.amount,
            self.expected_payment_date,
            self.late_fee_amount,
            None,
        );
    }

    /// Whether the cuota holds more money than it is worth
    pub fn is_overpaid(&self) -> bool {
        self.pending < Decimal::ZERO
    }

    /// `true` when the cached projection fields differ
    pub fn projection_differs(&self, other: &Installment) -> bool {
        self.paid != other.paid
            || self.pending != other.pending
            || self.late_fee_paid != other.late_fee_paid
            || self.late_fee_pending != other.late_fee_pending
            || self.status != other.status
    }
}
