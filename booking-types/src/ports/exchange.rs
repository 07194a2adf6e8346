//! Exchange rate store port.
//!
//! Rates are keyed by (from, to, as_of). Resolution of the latest, inverse or
//! fallback rate happens in the service on top of this port.

use exchange_rates::{CurrencyCode, ExchangeRate};

use crate::error::RepoError;

/// Port trait for exchange rate storage.
#[async_trait::async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    /// Records a rate, replacing any rate for the same (from, to, as_of).
    async fn record_rate(&self, rate: ExchangeRate) -> Result<ExchangeRate, RepoError>;

    /// The rate with the latest `as_of` for the exact pair.
    async fn latest_rate(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<Option<ExchangeRate>, RepoError>;
}
