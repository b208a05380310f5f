use rust_decimal::{Decimal, RoundingStrategy};

/// Largest absolute difference between two amounts that still counts as equal (0.01)
pub const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Decimal places kept on every monetary intermediate value
pub const MONEY_SCALE: u32 = 2;

/// Rounds to 2 decimal places, half away from zero
///
/// All ledger and projection arithmetic goes through this.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `true` when `a` and `b` differ by at most [`TOLERANCE`]
pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= TOLERANCE
}

/// Sums the amounts and rounds the result
pub fn sum_rounded<I>(amounts: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    round2(amounts.into_iter().sum())
}

/// Formats an amount with exactly two decimals for reports
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", round2(amount))
}
