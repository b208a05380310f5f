use rust_decimal::Decimal;

use crate::core::round2;

/// Result of a sequential fill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation<K> {
    /// Non-zero amounts applied, in the order the capacities were given
    pub applied: Vec<(K, Decimal)>,
    /// Amount no capacity could take
    pub remainder: Decimal,
}

impl<K: PartialEq + Copy> Allocation<K> {
    /// Amount applied to `key` (zero if it received nothing)
    pub fn applied_to(&self, key: K) -> Decimal {
        self.applied
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, amount)| *amount)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn total_applied(&self) -> Decimal {
        self.applied.iter().map(|(_, amount)| *amount).sum()
    }
}

/// Fill capacities in the given order with `amount`
///
/// Each item takes `min(remaining, capacity)`; the walk stops as soon as
/// nothing remains, so later items are skipped rather than given zero.
/// Negative capacities count as zero. For any non-negative amount with at
/// most two decimals, `total_applied + remainder == amount`.
pub fn allocate<K: Copy>(amount: Decimal, capacities: &[(K, Decimal)]) -> Allocation<K> {
    let mut remaining = round2(amount);
    let mut applied = Vec::new();

    if remaining <= Decimal::ZERO {
        return Allocation {
            applied,
            remainder: remaining.max(Decimal::ZERO),
        };
    }

    for (key, capacity) in capacities {
        if remaining <= Decimal::ZERO {
            break;
        }

        let take = remaining.min(round2(*capacity).max(Decimal::ZERO));
        if take > Decimal::ZERO {
            applied.push((*key, take));
            remaining = round2(remaining - take);
        }
    }

    Allocation {
        applied,
        remainder: remaining,
    }
}

/// First candidate, in order, that the predicate admits
pub fn first_fit<'a, T, F>(candidates: &[&'a T], mut admits: F) -> Option<&'a T>
where
    F: FnMut(&T) -> bool,
{
    candidates.iter().copied().find(|candidate| admits(candidate))
}
