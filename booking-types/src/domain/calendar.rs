//! Half-open stay ranges over calendar dates.

use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::DomainError;

/// Longest stay that can be quoted, searched or booked.
pub const MAX_STAY_NIGHTS: u32 = 366;

/// Nights from `check_in` up to but excluding `check_out`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct StayRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayRange {
    /// Rejects empty and inverted ranges.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, DomainError> {
        if check_out <= check_in {
            return Err(DomainError::InvalidDateRange {
                check_in,
                check_out,
            });
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    /// A guest stay: as `new`, and at most `MAX_STAY_NIGHTS` long.
    pub fn for_stay(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, DomainError> {
        let stay = Self::new(check_in, check_out)?;
        if stay.nights() > MAX_STAY_NIGHTS {
            return Err(DomainError::StayLengthOutOfBounds {
                nights: stay.nights(),
                min: 1,
                max: Some(MAX_STAY_NIGHTS),
            });
        }
        Ok(stay)
    }

    /// Range covering `start..=end`.
    pub fn inclusive(start: NaiveDate, end: NaiveDate) -> Result<Self, DomainError> {
        let check_out = end
            .checked_add_days(Days::new(1))
            .ok_or(DomainError::InvalidDateRange {
                check_in: start,
                check_out: end,
            })?;
        Self::new(start, check_out).map_err(|_| DomainError::InvalidDateRange {
            check_in: start,
            check_out: end,
        })
    }

    pub fn nights(&self) -> u32 {
        u32::try_from((self.check_out - self.check_in).num_days()).unwrap_or(u32::MAX)
    }

    /// Each night of the stay, in order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let check_out = self.check_out;
        self.check_in.iter_days().take_while(move |d| *d < check_out)
    }

    /// The final night slept, `check_out - 1`.
    pub fn last_night(&self) -> NaiveDate {
        self.check_out.pred_opt().unwrap_or(self.check_in)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.check_in <= date && date < self.check_out
    }

    /// `[A, B)` and `[C, D)` overlap iff `A < D && C < B`; same-day turnover does not.
    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    /// The shared nights, if any.
    pub fn intersection(&self, other: &StayRange) -> Option<StayRange> {
        if !self.overlaps(other) {
            return None;
        }
        Some(StayRange {
            check_in: self.check_in.max(other.check_in),
            check_out: self.check_out.min(other.check_out),
        })
    }
}

impl fmt::Display for StayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.check_in, self.check_out)
    }
}
