//! Room inventory model with its one-off charges.

use chrono::{DateTime, Utc};
use exchange_rates::CurrencyCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::calendar::MAX_STAY_NIGHTS;
use super::ids::{HotelId, RoomId};
use super::money::Money;
use crate::error::DomainError;

/// Largest party a room may be configured for.
pub const MAX_OCCUPANCY: u32 = 100;

/// A named charge added once per stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Fee {
    #[schema(example = "Cleaning fee")]
    pub name: String,
    /// Fixed amount in the room currency, or a percent of the subtotal
    #[schema(value_type = String, example = "25.00")]
    pub amount: Decimal,
    #[serde(default)]
    pub is_percentage: bool,
    #[serde(default = "default_true")]
    pub is_mandatory: bool,
}

/// A percentage tax on the subtotal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Tax {
    #[schema(example = "VAT")]
    pub name: String,
    /// Percent, e.g. `16.00`
    #[schema(value_type = String, example = "16.00")]
    pub rate: Decimal,
    /// Already embedded in nightly prices
    #[serde(default)]
    pub is_inclusive: bool,
}

fn default_true() -> bool {
    true
}

impl Fee {
    fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationError("fee name is required".into()));
        }
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(DomainError::NegativeAmount);
        }
        Ok(())
    }
}

impl Tax {
    fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationError("tax name is required".into()));
        }
        if self.rate < Decimal::ZERO || self.rate > Decimal::ONE_HUNDRED {
            return Err(DomainError::ValidationError(format!(
                "tax rate must be between 0 and 100, got {}",
                self.rate
            )));
        }
        Ok(())
    }
}

/// Attributes of a room before it is persisted.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub hotel_id: HotelId,
    pub name: String,
    pub room_type: String,
    pub max_occupancy: u32,
    pub base_price: Decimal,
    pub currency: CurrencyCode,
    pub min_stay: u32,
    pub max_stay: Option<u32>,
    pub is_active: bool,
    pub fees: Vec<Fee>,
    pub taxes: Vec<Tax>,
}

/// A bookable room owned by a hotel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Room {
    pub id: RoomId,
    pub hotel_id: HotelId,
    #[schema(example = "Ocean View 101")]
    pub name: String,
    #[schema(example = "deluxe")]
    pub room_type: String,
    pub max_occupancy: u32,
    /// Nightly price used when no daily override exists
    #[schema(value_type = String, example = "100.00")]
    pub base_price: Decimal,
    pub currency: CurrencyCode,
    pub min_stay: u32,
    pub max_stay: Option<u32>,
    pub is_active: bool,
    pub fees: Vec<Fee>,
    pub taxes: Vec<Tax>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    /// Validates and creates a room.
    pub fn new(attrs: NewRoom) -> Result<Self, DomainError> {
        if attrs.name.trim().is_empty() {
            return Err(DomainError::ValidationError("room name is required".into()));
        }
        if attrs.room_type.trim().is_empty() {
            return Err(DomainError::ValidationError("room type is required".into()));
        }
        if attrs.max_occupancy == 0 || attrs.max_occupancy > MAX_OCCUPANCY {
            return Err(DomainError::ValidationError(format!(
                "max occupancy must be between 1 and {MAX_OCCUPANCY}"
            )));
        }
        if attrs.min_stay == 0 || attrs.min_stay > MAX_STAY_NIGHTS {
            return Err(DomainError::ValidationError(format!(
                "min stay must be between 1 and {MAX_STAY_NIGHTS} nights"
            )));
        }
        if let Some(max) = attrs.max_stay {
            if max < attrs.min_stay {
                return Err(DomainError::ValidationError(format!(
                    "max stay {} is shorter than min stay {}",
                    max, attrs.min_stay
                )));
            }
            if max > MAX_STAY_NIGHTS {
                return Err(DomainError::ValidationError(format!(
                    "max stay is limited to {MAX_STAY_NIGHTS} nights"
                )));
            }
        }
        let base = Money::new(attrs.base_price, attrs.currency)?;
        attrs.fees.iter().try_for_each(Fee::validate)?;
        attrs.taxes.iter().try_for_each(Tax::validate)?;

        let now = Utc::now();
        Ok(Self {
            id: RoomId::new(),
            hotel_id: attrs.hotel_id,
            name: attrs.name.trim().to_string(),
            room_type: attrs.room_type.trim().to_lowercase(),
            max_occupancy: attrs.max_occupancy,
            base_price: base.amount(),
            currency: attrs.currency,
            min_stay: attrs.min_stay,
            max_stay: attrs.max_stay,
            is_active: attrs.is_active,
            fees: attrs.fees,
            taxes: attrs.taxes,
            created_at: now,
            updated_at: now,
        })
    }

    /// The base nightly rate as money.
    pub fn base_rate(&self) -> Money {
        Money::new(self.base_price, self.currency).unwrap_or_else(|_| Money::zero(self.currency))
    }

    pub fn ensure_active(&self) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::RoomInactive(self.id));
        }
        Ok(())
    }

    /// Checks a stay length against the room's min/max stay. Rooms without a
    /// max stay are still capped at `MAX_STAY_NIGHTS`.
    pub fn check_stay_length(&self, nights: u32) -> Result<(), DomainError> {
        let max = self.max_stay.unwrap_or(MAX_STAY_NIGHTS).min(MAX_STAY_NIGHTS);
        if nights < self.min_stay || nights > max {
            return Err(DomainError::StayLengthOutOfBounds {
                nights,
                min: self.min_stay,
                max: self.max_stay,
            });
        }
        Ok(())
    }

    /// Adults and children count towards occupancy; infants do not.
    pub fn check_capacity(&self, adults: u32, children: u32) -> Result<(), DomainError> {
        if adults == 0 {
            return Err(DomainError::ValidationError(
                "at least one adult is required".into(),
            ));
        }
        let over = |guests| DomainError::OverCapacity {
            guests,
            max: self.max_occupancy,
        };
        let guests = adults.checked_add(children).ok_or(over(u32::MAX))?;
        if guests > self.max_occupancy {
            return Err(over(guests));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub(crate) fn new_room(base_price: Decimal, currency: CurrencyCode) -> NewRoom {
        NewRoom {
            hotel_id: HotelId::new(),
            name: "Garden Suite".into(),
            room_type: "suite".into(),
            max_occupancy: 3,
            base_price,
            currency,
            min_stay: 1,
            max_stay: None,
            is_active: true,
            fees: vec![],
            taxes: vec![],
        }
    }

    #[test]
    fn test_room_creation() {
        let room = Room::new(new_room(dec!(100), CurrencyCode::USD)).unwrap();
        assert_eq!(room.base_rate().amount(), dec!(100.00));
        assert_eq!(room.room_type, "suite");
        assert!(room.is_active);
    }

    #[test]
    fn test_room_rejects_negative_price() {
        let result = Room::new(new_room(dec!(-5), CurrencyCode::USD));
        assert!(matches!(result, Err(DomainError::NegativeAmount)));
    }

    #[test]
    fn test_room_rejects_max_stay_below_min() {
        let mut attrs = new_room(dec!(100), CurrencyCode::USD);
        attrs.min_stay = 3;
        attrs.max_stay = Some(2);
        assert!(matches!(
            Room::new(attrs),
            Err(DomainError::ValidationError(_))
        ));
    }

    #[test]
    fn test_room_rejects_tax_over_hundred_percent() {
        let mut attrs = new_room(dec!(100), CurrencyCode::USD);
        attrs.taxes.push(Tax {
            name: "Bogus".into(),
            rate: dec!(101),
            is_inclusive: false,
        });
        assert!(Room::new(attrs).is_err());
    }

    #[test]
    fn test_stay_length_bounds() {
        let mut attrs = new_room(dec!(100), CurrencyCode::USD);
        attrs.min_stay = 2;
        attrs.max_stay = Some(5);
        let room = Room::new(attrs).unwrap();

        assert!(room.check_stay_length(1).is_err());
        assert!(room.check_stay_length(2).is_ok());
        assert!(room.check_stay_length(5).is_ok());
        assert!(matches!(
            room.check_stay_length(6),
            Err(DomainError::StayLengthOutOfBounds { nights: 6, .. })
        ));
    }

    #[test]
    fn test_capacity_ignores_infants() {
        let room = Room::new(new_room(dec!(100), CurrencyCode::USD)).unwrap();
        assert!(room.check_capacity(2, 1).is_ok());
        assert!(matches!(
            room.check_capacity(2, 2),
            Err(DomainError::OverCapacity { guests: 4, max: 3 })
        ));
        assert!(room.check_capacity(0, 1).is_err());
    }

    #[test]
    fn test_capacity_rejects_overflowing_party() {
        let room = Room::new(new_room(dec!(100), CurrencyCode::USD)).unwrap();
        assert!(matches!(
            room.check_capacity(u32::MAX, 1),
            Err(DomainError::OverCapacity { max: 3, .. })
        ));
        assert!(matches!(
            room.check_capacity(1, u32::MAX),
            Err(DomainError::OverCapacity { .. })
        ));
    }

    #[test]
    fn test_room_rejects_counts_beyond_limits() {
        let mut attrs = new_room(dec!(100), CurrencyCode::USD);
        attrs.max_occupancy = MAX_OCCUPANCY + 1;
        assert!(matches!(Room::new(attrs), Err(DomainError::ValidationError(_))));

        let mut attrs = new_room(dec!(100), CurrencyCode::USD);
        attrs.min_stay = MAX_STAY_NIGHTS + 1;
        assert!(matches!(Room::new(attrs), Err(DomainError::ValidationError(_))));

        let mut attrs = new_room(dec!(100), CurrencyCode::USD);
        attrs.max_stay = Some(u32::MAX);
        assert!(matches!(Room::new(attrs), Err(DomainError::ValidationError(_))));

        let mut attrs = new_room(dec!(100), CurrencyCode::USD);
        attrs.max_occupancy = MAX_OCCUPANCY;
        attrs.max_stay = Some(MAX_STAY_NIGHTS);
        assert!(Room::new(attrs).is_ok());
    }

    #[test]
    fn test_open_ended_room_still_caps_stay_length() {
        let room = Room::new(new_room(dec!(100), CurrencyCode::USD)).unwrap();
        assert!(room.check_stay_length(MAX_STAY_NIGHTS).is_ok());
        assert!(matches!(
            room.check_stay_length(MAX_STAY_NIGHTS + 1),
            Err(DomainError::StayLengthOutOfBounds { max: None, .. })
        ));
    }
}
