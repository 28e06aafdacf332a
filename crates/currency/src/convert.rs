//! Conversion through the ledger's base currency.
//!
//! The converter never touches storage directly; callers inject a lookup
//! closure that resolves a pair quote as of a date. Cross rates always go
//! through the base currency, never pair-to-pair.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use tallybook_core::{Currency, LedgerError, LedgerResult};

/// Converts amounts between currencies through the base currency.
pub struct CurrencyConverter<F> {
    base: Currency,
    lookup: F,
}

impl<F> CurrencyConverter<F>
where
    F: Fn(&Currency, &Currency, NaiveDate) -> Option<Decimal>,
{
    /// `lookup(from, to, as_of)` returns the latest stored quote for the
    /// pair dated at or before `as_of`, as units of `to` per one `from`.
    pub fn new(base: Currency, lookup: F) -> Self {
        Self { base, lookup }
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    /// Effective conversion rate `from → to` as of the given date.
    pub fn rate(&self, from: &Currency, to: &Currency, as_of: NaiveDate) -> LedgerResult<Decimal> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        let unsupported = || LedgerError::unsupported_currency(from.code(), to.code());
        let to_base = self.pair(from, &self.base, as_of).ok_or_else(unsupported)?;
        let from_base = self.pair(&self.base, to, as_of).ok_or_else(unsupported)?;
        Ok(to_base * from_base)
    }

    /// Convert `amount`, rounding to the target currency's minor units.
    pub fn convert(
        &self,
        amount: Decimal,
        from: &Currency,
        to: &Currency,
        as_of: NaiveDate,
    ) -> LedgerResult<Decimal> {
        if from == to {
            return Ok(amount);
        }
        let rate = self.rate(from, to, as_of)?;
        Ok(to.round(amount * rate))
    }

    /// Convert `amount` into the base currency.
    pub fn to_base(
        &self,
        amount: Decimal,
        from: &Currency,
        as_of: NaiveDate,
    ) -> LedgerResult<Decimal> {
        let base = self.base.clone();
        self.convert(amount, from, &base, as_of)
    }

    /// Conversion rate discounted by a margin fraction. Quote-side only,
    /// never used for ledger postings.
    pub fn rate_with_margin(
        &self,
        from: &Currency,
        to: &Currency,
        as_of: NaiveDate,
        margin: Decimal,
    ) -> LedgerResult<Decimal> {
        if margin < Decimal::ZERO || margin >= Decimal::ONE {
            return Err(LedgerError::validation(format!(
                "margin must be in [0, 1), got {margin}"
            )));
        }
        Ok(self.rate(from, to, as_of)? * (Decimal::ONE - margin))
    }

    /// Pair quote, falling back to the inverse of the opposite direction
    /// when only one side of the pair is stored.
    fn pair(&self, from: &Currency, to: &Currency, as_of: NaiveDate) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::ONE);
        }
        if let Some(rate) = (self.lookup)(from, to, as_of) {
            return Some(rate);
        }
        (self.lookup)(to, from, as_of)
            .filter(|r| !r.is_zero())
            .map(|r| Decimal::ONE / r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::rate::{CurrencyRate, RateSource, latest_rate};

    fn ccy(code: &str) -> Currency {
        Currency::new(code).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table() -> Vec<CurrencyRate> {
        let quote = |from: &str, to: &str, rate: Decimal| CurrencyRate {
            from: ccy(from),
            to: ccy(to),
            rate,
            rate_date: day(2025, 1, 1),
            source: RateSource::Manual,
        };
        vec![
            quote("AED", "USD", dec!(0.27)),
            quote("EUR", "USD", dec!(1.10)),
            quote("USD", "KWD", dec!(0.3075)),
        ]
    }

    fn converter(
        rates: Vec<CurrencyRate>,
    ) -> CurrencyConverter<impl Fn(&Currency, &Currency, NaiveDate) -> Option<Decimal>> {
        CurrencyConverter::new(ccy("USD"), move |from, to, as_of| {
            latest_rate(&rates, from, to, as_of).map(|r| r.rate)
        })
    }

    #[test]
    fn identity_conversion_is_untouched() {
        let conv = converter(table());
        let got = conv
            .convert(dec!(123.456), &ccy("USD"), &ccy("USD"), day(2025, 6, 1))
            .unwrap();
        assert_eq!(got, dec!(123.456));
    }

    #[test]
    fn converts_to_base_and_back_within_tolerance() {
        let conv = converter(table());
        let as_of = day(2025, 6, 1);

        let usd = conv
            .convert(dec!(100), &ccy("AED"), &ccy("USD"), as_of)
            .unwrap();
        assert_eq!(usd, dec!(27.00));

        // The return leg uses the inverse of the stored quote.
        let aed = conv
            .convert(dec!(27), &ccy("USD"), &ccy("AED"), as_of)
            .unwrap();
        assert!((aed - dec!(100)).abs() <= ccy("AED").tolerance());
    }

    #[test]
    fn cross_rate_goes_through_base() {
        let conv = converter(table());
        // EUR → KWD = (EUR→USD) * (USD→KWD) = 1.10 * 0.3075; rounded to
        // KWD's three minor units.
        let got = conv
            .convert(dec!(100), &ccy("EUR"), &ccy("KWD"), day(2025, 6, 1))
            .unwrap();
        assert_eq!(got, dec!(33.825));
    }

    #[test]
    fn missing_rate_is_unsupported() {
        let conv = converter(table());
        let err = conv
            .convert(dec!(10), &ccy("GBP"), &ccy("USD"), day(2025, 6, 1))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::UnsupportedCurrency { ref from, ref to }
                if from == "GBP" && to == "USD"
        ));
    }

    #[test]
    fn margin_discounts_the_rate() {
        let conv = converter(table());
        let as_of = day(2025, 6, 1);
        let quoted = conv
            .rate_with_margin(&ccy("AED"), &ccy("USD"), as_of, dec!(0.02))
            .unwrap();
        assert_eq!(quoted, dec!(0.27) * dec!(0.98));

        assert!(matches!(
            conv.rate_with_margin(&ccy("AED"), &ccy("USD"), as_of, dec!(1)),
            Err(LedgerError::Validation(_))
        ));
    }
}
