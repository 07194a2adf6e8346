//! Availability decisions against existing bookings and blocked dates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::booking::Booking;
use super::calendar::StayRange;
use super::daily_price::DailyPriceEntry;
use super::ids::{BookingId, RoomId};
use crate::error::DomainError;

/// Why a requested stay cannot be booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conflict {
    /// An active booking holds the `overlap` nights.
    Booking {
        booking_id: BookingId,
        reference: String,
        overlap: StayRange,
    },
    /// A daily override marks the date unbookable.
    BlockedDate { date: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityDecision {
    pub room_id: RoomId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub available: bool,
    pub conflicts: Vec<Conflict>,
}

impl AvailabilityDecision {
    /// Only bookings in a blocking status count. Bookings and entries for other
    /// rooms are ignored.
    pub fn evaluate(
        room_id: RoomId,
        stay: StayRange,
        bookings: &[Booking],
        entries: &[DailyPriceEntry],
    ) -> Self {
        let mut conflicts: Vec<Conflict> = bookings
            .iter()
            .filter(|b| b.room_id == room_id && b.status.blocks_availability())
            .filter_map(|b| {
                b.stay().intersection(&stay).map(|overlap| Conflict::Booking {
                    booking_id: b.id,
                    reference: b.reference.clone(),
                    overlap,
                })
            })
            .collect();

        let mut blocked: Vec<NaiveDate> = entries
            .iter()
            .filter(|e| e.room_id == room_id && !e.is_available && stay.contains(e.date))
            .map(|e| e.date)
            .collect();
        blocked.sort_unstable();
        blocked.dedup();
        conflicts.extend(blocked.into_iter().map(|date| Conflict::BlockedDate { date }));

        Self {
            room_id,
            check_in: stay.check_in,
            check_out: stay.check_out,
            available: conflicts.is_empty(),
            conflicts,
        }
    }

    pub fn blocked_dates(&self) -> Vec<NaiveDate> {
        self.conflicts
            .iter()
            .filter_map(|c| match c {
                Conflict::BlockedDate { date } => Some(*date),
                Conflict::Booking { .. } => None,
            })
            .collect()
    }

    pub fn booking_overlaps(&self) -> Vec<StayRange> {
        self.conflicts
            .iter()
            .filter_map(|c| match c {
                Conflict::Booking { overlap, .. } => Some(*overlap),
                Conflict::BlockedDate { .. } => None,
            })
            .collect()
    }

    /// Booking overlaps take precedence over blocked dates.
    pub fn ensure_available(&self) -> Result<(), DomainError> {
        let overlaps = self.booking_overlaps();
        if !overlaps.is_empty() {
            return Err(DomainError::BookingConflict {
                conflicts: overlaps,
            });
        }
        let dates = self.blocked_dates();
        if !dates.is_empty() {
            return Err(DomainError::DateUnavailable { dates });
        }
        Ok(())
    }
}
