//! Currency Converter: exchange rates, as-of lookup, base-currency conversion.

pub mod convert;
pub mod rate;

pub use convert::CurrencyConverter;
pub use rate::{CurrencyRate, NewRate, RateSource, latest_rate};
