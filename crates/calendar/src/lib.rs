//! Calendar access for bookly.
//!
//! Everything here is a live remote call: the remote calendar is the only
//! source of truth for events, so no availability data is cached between
//! turns.

pub mod client;
pub mod google;
pub mod windows;

pub use client::{CalendarClient, CalendarError};
pub use google::GoogleCalendarClient;
pub use windows::normalize_windows;
