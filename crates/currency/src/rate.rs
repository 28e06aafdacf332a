//! Exchange-rate history model.
//!
//! Rates are append-only rows keyed by (from, to, rate_date); lookups pick
//! the latest row dated at or before the reference date. The quote
//! convention is `rate` units of `to` per one unit of `from`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tallybook_core::{Currency, LedgerError, LedgerResult};

/// Where a rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    CentralBank,
    Manual,
    Api,
}

/// A stored exchange rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRate {
    pub from: Currency,
    pub to: Currency,
    pub rate: Decimal,
    pub rate_date: NaiveDate,
    pub source: RateSource,
}

impl CurrencyRate {
    /// The opposite-direction quote, written alongside every upsert so both
    /// directions of a pair are always retrievable.
    pub fn reciprocal(&self) -> CurrencyRate {
        CurrencyRate {
            from: self.to.clone(),
            to: self.from.clone(),
            rate: Decimal::ONE / self.rate,
            rate_date: self.rate_date,
            source: self.source,
        }
    }
}

/// Specification for upserting a rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRate {
    pub from: Currency,
    pub to: Currency,
    pub rate: Decimal,
    pub rate_date: NaiveDate,
    pub source: RateSource,
}

impl NewRate {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.from == self.to {
            return Err(LedgerError::validation(format!(
                "rate for {} against itself",
                self.from
            )));
        }
        if self.rate <= Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "rate {}→{} must be positive, got {}",
                self.from, self.to, self.rate
            )));
        }
        Ok(())
    }

    pub fn into_rate(self) -> CurrencyRate {
        CurrencyRate {
            from: self.from,
            to: self.to,
            rate: self.rate,
            rate_date: self.rate_date,
            source: self.source,
        }
    }
}

/// Latest rate for the pair with `rate_date <= as_of`.
pub fn latest_rate<'a>(
    rates: impl IntoIterator<Item = &'a CurrencyRate>,
    from: &Currency,
    to: &Currency,
    as_of: NaiveDate,
) -> Option<&'a CurrencyRate> {
    rates
        .into_iter()
        .filter(|r| &r.from == from && &r.to == to && r.rate_date <= as_of)
        .max_by_key(|r| r.rate_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ccy(code: &str) -> Currency {
        Currency::new(code).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rate(from: &str, to: &str, value: Decimal, date: NaiveDate) -> CurrencyRate {
        CurrencyRate {
            from: ccy(from),
            to: ccy(to),
            rate: value,
            rate_date: date,
            source: RateSource::Manual,
        }
    }

    #[test]
    fn rejects_self_pair_and_nonpositive() {
        let bad = NewRate {
            from: ccy("USD"),
            to: ccy("USD"),
            rate: dec!(1),
            rate_date: day(2025, 1, 1),
            source: RateSource::Manual,
        };
        assert!(matches!(bad.validate(), Err(LedgerError::Validation(_))));

        let bad = NewRate {
            from: ccy("AED"),
            to: ccy("USD"),
            rate: dec!(0),
            rate_date: day(2025, 1, 1),
            source: RateSource::Manual,
        };
        assert!(matches!(bad.validate(), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn reciprocal_inverts_the_quote() {
        let r = rate("AED", "USD", dec!(0.25), day(2025, 1, 1));
        let rec = r.reciprocal();
        assert_eq!(rec.from, ccy("USD"));
        assert_eq!(rec.to, ccy("AED"));
        assert_eq!(rec.rate, dec!(4));
        assert_eq!(rec.rate_date, r.rate_date);
    }

    #[test]
    fn latest_rate_is_as_of() {
        let rates = vec![
            rate("AED", "USD", dec!(0.26), day(2025, 1, 1)),
            rate("AED", "USD", dec!(0.27), day(2025, 2, 1)),
            rate("AED", "USD", dec!(0.28), day(2025, 3, 1)),
            rate("EUR", "USD", dec!(1.05), day(2025, 2, 1)),
        ];

        let hit = latest_rate(&rates, &ccy("AED"), &ccy("USD"), day(2025, 2, 15)).unwrap();
        assert_eq!(hit.rate, dec!(0.27));

        // Nothing dated at or before the reference date.
        assert!(latest_rate(&rates, &ccy("AED"), &ccy("USD"), day(2024, 12, 31)).is_none());
        // Direction matters.
        assert!(latest_rate(&rates, &ccy("USD"), &ccy("AED"), day(2025, 6, 1)).is_none());
    }
}
