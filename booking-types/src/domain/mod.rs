//! Domain models and pure pricing rules for the booking service.

pub mod availability;
pub mod booking;
pub mod calendar;
pub mod charges;
pub mod daily_price;
pub mod ids;
pub mod money;
pub mod quote;
pub mod room;

pub use availability::{AvailabilityDecision, Conflict};
pub use booking::{
    Booking, BookingDraft, BookingSource, BookingStatus, BookingTotals, GuestDetails,
    generate_reference,
};
pub use calendar::{MAX_STAY_NIGHTS, StayRange};
pub use charges::{Charges, FeeLine, TaxLine};
pub use daily_price::{DailyPriceEntry, NightlyRate, PriceSource};
pub use ids::{BookingId, HotelId, RoomId};
pub use money::Money;
pub use quote::{CalendarDay, MAX_CALENDAR_DAYS, NightlyPrice, Quote, price_calendar, source_currencies};
pub use room::{Fee, MAX_OCCUPANCY, NewRoom, Room, Tax};
