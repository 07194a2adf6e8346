//! Per-date price overrides and nightly rate resolution.

use chrono::NaiveDate;
use exchange_rates::CurrencyCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::RoomId;
use super::money::Money;
use super::room::Room;

/// Override for a single (room, date). At most one exists per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DailyPriceEntry {
    pub room_id: RoomId,
    pub date: NaiveDate,
    #[schema(value_type = String, example = "150.00")]
    pub price: Decimal,
    pub currency: CurrencyCode,
    pub is_available: bool,
    /// Rate used when the price was converted from a local amount
    #[schema(value_type = Option<String>, example = "130.0000")]
    pub rate_used: Option<Decimal>,
}

/// Which layer priced a night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Override,
    Base,
}

/// Effective nightly rate for one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NightlyRate {
    /// An available override priced the night.
    Override(Money),
    /// No override; the room base price applies.
    Base(Money),
    /// An override marks the date unbookable.
    Blocked,
}

impl NightlyRate {
    /// Override presence wins over the base price; a blocked override is never priced.
    pub fn resolve(room: &Room, entry: Option<&DailyPriceEntry>) -> Self {
        match entry {
            Some(entry) if !entry.is_available => NightlyRate::Blocked,
            Some(entry) => match Money::new(entry.price, entry.currency) {
                Ok(price) => NightlyRate::Override(price),
                Err(_) => NightlyRate::Blocked,
            },
            None => NightlyRate::Base(room.base_rate()),
        }
    }

    pub fn price(&self) -> Option<(Money, PriceSource)> {
        match self {
            NightlyRate::Override(m) => Some((*m, PriceSource::Override)),
            NightlyRate::Base(m) => Some((*m, PriceSource::Base)),
            NightlyRate::Blocked => None,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, NightlyRate::Blocked)
    }
}
