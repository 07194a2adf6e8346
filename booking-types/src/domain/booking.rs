//! Booking domain model and its lifecycle.

use chrono::{DateTime, NaiveDate, Utc};
use exchange_rates::{CurrencyCode, round_money};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::calendar::StayRange;
use super::ids::{BookingId, HotelId, RoomId};
use super::quote::{NightlyPrice, Quote};
use super::room::{MAX_OCCUPANCY, Room};
use crate::error::DomainError;

/// Lifecycle status of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
    NoShow,
    Refunded,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::CheckedIn => "checked_in",
            BookingStatus::CheckedOut => "checked_out",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
            BookingStatus::Refunded => "refunded",
        }
    }

    /// Whether a booking in this status holds its nights.
    pub fn blocks_availability(&self) -> bool {
        !matches!(
            self,
            BookingStatus::Cancelled | BookingStatus::NoShow | BookingStatus::Refunded
        )
    }

    /// One-directional edges; refund is the only exit from a finished stay.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, CheckedIn)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
                | (CheckedIn, CheckedOut)
                | (CheckedOut, Refunded)
                | (Cancelled, Refunded)
                | (NoShow, Refunded)
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "checked_in" => Ok(BookingStatus::CheckedIn),
            "checked_out" => Ok(BookingStatus::CheckedOut),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "no_show" => Ok(BookingStatus::NoShow),
            "refunded" => Ok(BookingStatus::Refunded),
            other => Err(DomainError::ValidationError(format!(
                "unknown booking status: {}",
                other
            ))),
        }
    }
}

/// Channel a booking came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookingSource {
    #[default]
    Direct,
    Website,
    Phone,
    Email,
    WalkIn,
    Agent,
    Other,
}

impl BookingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingSource::Direct => "direct",
            BookingSource::Website => "website",
            BookingSource::Phone => "phone",
            BookingSource::Email => "email",
            BookingSource::WalkIn => "walk_in",
            BookingSource::Agent => "agent",
            BookingSource::Other => "other",
        }
    }
}

impl std::str::FromStr for BookingSource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(BookingSource::Direct),
            "website" => Ok(BookingSource::Website),
            "phone" => Ok(BookingSource::Phone),
            "email" => Ok(BookingSource::Email),
            "walk_in" => Ok(BookingSource::WalkIn),
            "agent" => Ok(BookingSource::Agent),
            "other" => Ok(BookingSource::Other),
            other => Err(DomainError::ValidationError(format!(
                "unknown booking source: {}",
                other
            ))),
        }
    }
}

fn default_adults() -> u32 {
    1
}

/// Guest contact details and party size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GuestDetails {
    #[schema(example = "Amina")]
    pub first_name: String,
    #[schema(example = "Otieno")]
    pub last_name: String,
    #[schema(example = "amina@example.com")]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default = "default_adults")]
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub infants: u32,
}

impl GuestDetails {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(DomainError::ValidationError("guest name is required".into()));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::ValidationError(format!(
                "invalid guest email: {}",
                self.email
            )));
        }
        if self.infants > MAX_OCCUPANCY {
            return Err(DomainError::ValidationError(format!(
                "at most {MAX_OCCUPANCY} infants per booking"
            )));
        }
        Ok(())
    }
}

/// Money snapshot of a booking; `total = subtotal + tax + fee - discount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookingTotals {
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub tax_amount: Decimal,
    #[schema(value_type = String)]
    pub fee_amount: Decimal,
    #[schema(value_type = String)]
    pub discount_amount: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
}

impl BookingTotals {
    pub fn compute(
        subtotal: Decimal,
        tax_amount: Decimal,
        fee_amount: Decimal,
        discount_amount: Decimal,
    ) -> Result<Self, DomainError> {
        if [subtotal, tax_amount, fee_amount, discount_amount]
            .iter()
            .any(|v| *v < Decimal::ZERO)
        {
            return Err(DomainError::NegativeAmount);
        }
        let gross = round_money(subtotal + tax_amount + fee_amount);
        let discount_amount = round_money(discount_amount);
        if discount_amount > gross {
            return Err(DomainError::ValidationError(format!(
                "discount {} exceeds booking amount {}",
                discount_amount, gross
            )));
        }
        Ok(Self {
            subtotal: round_money(subtotal),
            tax_amount: round_money(tax_amount),
            fee_amount: round_money(fee_amount),
            discount_amount,
            total: gross - discount_amount,
        })
    }
}

const REFERENCE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// `BK` + `YYYYMMDD` + four upper-case alphanumerics.
pub fn generate_reference_with<R: Rng + ?Sized>(rng: &mut R, date: NaiveDate) -> String {
    let suffix: String = (0..4)
        .map(|_| REFERENCE_CHARSET[rng.random_range(0..REFERENCE_CHARSET.len())] as char)
        .collect();
    format!("BK{}{}", date.format("%Y%m%d"), suffix)
}

pub fn generate_reference(date: NaiveDate) -> String {
    generate_reference_with(&mut rand::rng(), date)
}

/// Everything a guest supplies when accepting a quote.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub guest: GuestDetails,
    pub discount: Decimal,
    pub source: BookingSource,
    pub special_requests: Option<String>,
}

/// A committed stay with its own price snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: BookingId,
    #[schema(example = "BK20250301A7QZ")]
    pub reference: String,
    pub room_id: RoomId,
    pub hotel_id: HotelId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: u32,
    pub guest: GuestDetails,
    pub status: BookingStatus,
    pub source: BookingSource,
    pub currency: CurrencyCode,
    pub nightly: Vec<NightlyPrice>,
    pub totals: BookingTotals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_out_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Builds a pending booking from an accepted quote.
    ///
    /// Capacity and guest details are validated and totals are computed here,
    /// before anything is persisted.
    pub fn from_quote(
        room: &Room,
        quote: &Quote,
        draft: BookingDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        draft.guest.validate()?;
        room.check_capacity(draft.guest.adults, draft.guest.children)?;
        let totals = BookingTotals::compute(
            quote.subtotal,
            quote.tax_total,
            quote.fee_total,
            draft.discount,
        )?;

        Ok(Self {
            id: BookingId::new(),
            reference: generate_reference(now.date_naive()),
            room_id: room.id,
            hotel_id: room.hotel_id,
            check_in: quote.check_in,
            check_out: quote.check_out,
            nights: quote.nights,
            guest: draft.guest,
            status: BookingStatus::Pending,
            source: draft.source,
            currency: quote.currency,
            nightly: quote.per_night.clone(),
            totals,
            special_requests: draft
                .special_requests
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            cancelled_at: None,
            checked_in_at: None,
            checked_out_at: None,
            refunded_at: None,
        })
    }

    pub fn stay(&self) -> StayRange {
        StayRange {
            check_in: self.check_in,
            check_out: self.check_out,
        }
    }

    /// Applies a status transition, stamping the matching timestamp.
    pub fn transition(
        &mut self,
        next: BookingStatus,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        if next == BookingStatus::CheckedIn && self.check_in > today {
            return Err(DomainError::ValidationError(format!(
                "cannot check in before {}",
                self.check_in
            )));
        }

        let stamp = match next {
            BookingStatus::Confirmed => Some(&mut self.confirmed_at),
            BookingStatus::CheckedIn => Some(&mut self.checked_in_at),
            BookingStatus::CheckedOut => Some(&mut self.checked_out_at),
            BookingStatus::Cancelled => Some(&mut self.cancelled_at),
            BookingStatus::Refunded => Some(&mut self.refunded_at),
            BookingStatus::Pending | BookingStatus::NoShow => None,
        };
        if let Some(stamp) = stamp {
            *stamp = Some(now);
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}
