//! Currency value object and monetary tolerances.
//!
//! Amounts themselves are plain `rust_decimal::Decimal`s; this module owns
//! what a currency *is*: its code, its minor-unit count, and the tolerance
//! used by "is balanced" checks. Tolerance is per-currency — a 3-decimal
//! currency like KWD balances to 0.001, not the 2-decimal 0.01.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Marker trait for value objects: equality by value, not identity.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// ISO-4217-style currency code with known minor-unit count.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

/// Currencies with zero minor units.
const ZERO_DECIMAL: &[&str] = &["JPY", "KRW", "VND"];

/// Currencies with three minor units.
const THREE_DECIMAL: &[&str] = &["KWD", "BHD", "OMR", "JOD", "TND"];

impl Currency {
    /// Parse a currency code (3 ASCII letters, normalized to uppercase).
    pub fn new(code: &str) -> LedgerResult<Self> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(LedgerError::validation(format!(
                "invalid currency code '{code}'"
            )));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    /// Number of decimal places in the currency's minor unit.
    ///
    /// Unknown codes default to 2, the common case.
    pub fn minor_units(&self) -> u32 {
        if ZERO_DECIMAL.contains(&self.0.as_str()) {
            0
        } else if THREE_DECIMAL.contains(&self.0.as_str()) {
            3
        } else {
            2
        }
    }

    /// Balanced-check tolerance: one minor unit (10^-minor_units).
    pub fn tolerance(&self) -> Decimal {
        Decimal::new(1, self.minor_units())
    }

    /// Round an amount to the currency's minor units (banker's rounding).
    pub fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(
            self.minor_units(),
            rust_decimal::RoundingStrategy::MidpointNearestEven,
        )
    }
}

impl ValueObject for Currency {}

impl Default for Currency {
    fn default() -> Self {
        Self("USD".to_string())
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
