use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::core::{round2, sum_rounded};

/// Metadata key holding the per-cuota breakdown
pub const AFFECTED_CUOTAS_KEY: &str = "Cuotas afectadas";

/// Keys under which a breakdown entry records the applied amount, in lookup order
pub const APPLIED_AMOUNT_KEYS: [&str; 2] = ["Monto aplicado", "Aplicado a cuota"];

const CUOTA_KEY_PREFIX: &str = "Cuota";

/// One line of a payment's recorded allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentLine {
    pub installment_number: i32,
    pub applied_amount: Decimal,
}

/// Allocation intent recorded on a payment at approval time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AllocationIntent {
    /// No breakdown recorded (or an empty one)
    Absent,
    /// Breakdown ordered by cuota number
    Lines(Vec<IntentLine>),
    /// Breakdown present but unusable; the payment is quarantined
    Malformed(String),
}

impl AllocationIntent {
    /// Parse raw payment metadata
    ///
    /// Shape: `{"Cuotas afectadas": {"Cuota 2": {"Monto aplicado": 500}}}`.
    /// Amounts may be JSON numbers or numeric strings. Metadata stored as a
    /// JSON-encoded string is decoded first.
    pub fn parse(metadata: Option<&Value>) -> Self {
        let decoded;
        let metadata = match metadata {
            None | Some(Value::Null) => return Self::Absent,
            Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
                Ok(value) => {
                    decoded = value;
                    &decoded
                }
                Err(_) => return Self::Malformed("metadata is not valid JSON".to_string()),
            },
            Some(value) => value,
        };

        let affected = match metadata.get(AFFECTED_CUOTAS_KEY) {
            None | Some(Value::Null) => return Self::Absent,
            Some(affected) => affected,
        };

        let Some(entries) = affected.as_object() else {
            return Self::Malformed(format!("\"{}\" is not an object", AFFECTED_CUOTAS_KEY));
        };

        if entries.is_empty() {
            return Self::Absent;
        }

        let mut lines = Vec::with_capacity(entries.len());
        for (key, entry) in entries {
            match parse_line(key, entry) {
                Ok(line) => lines.push(line),
                Err(reason) => return Self::Malformed(reason),
            }
        }
        lines.sort_by_key(|line| line.installment_number);

        Self::Lines(lines)
    }

    /// Total amount the intent assigns
    pub fn total(&self) -> Decimal {
        match self {
            Self::Lines(lines) => sum_rounded(lines.iter().map(|line| line.applied_amount)),
            _ => Decimal::ZERO,
        }
    }
}

fn parse_line(key: &str, entry: &Value) -> std::result::Result<IntentLine, String> {
    let installment_number = parse_cuota_key(key)
        .ok_or_else(|| format!("unrecognised cuota key {:?}", key))?;

    let amount_value = APPLIED_AMOUNT_KEYS
        .iter()
        .find_map(|amount_key| entry.get(*amount_key))
        .ok_or_else(|| format!("{:?} has no applied amount", key))?;

    let applied_amount = parse_amount(amount_value)
        .ok_or_else(|| format!("{:?} has a non-numeric amount: {}", key, amount_value))?;

    if applied_amount < Decimal::ZERO {
        return Err(format!("{:?} has a negative amount: {}", key, applied_amount));
    }

    Ok(IntentLine {
        installment_number,
        applied_amount: round2(applied_amount),
    })
}

fn parse_cuota_key(key: &str) -> Option<i32> {
    let number = key.trim().strip_prefix(CUOTA_KEY_PREFIX)?.trim();
    number.parse::<i32>().ok().filter(|n| *n >= 0)
}

fn parse_amount(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => {
            let text = number.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(text) => Decimal::from_str(text.trim()).ok(),
        _ => None,
    }
}
