//! Booking agent runtime - the orchestration layer between chat and the
//! calendar.
//!
//! The agent follows a constrained loop per turn:
//! 1. **Deterministic classification** (`conversation`) - reset and yes/no
//!    replies are recognized without the model, so cancelling and confirming
//!    never depend on provider availability.
//! 2. **Extraction** (`bookly-llm`) - free text is translated into candidate
//!    booking fields.
//! 3. **Merge + flow transition** (`bookly-core::flows`) - new fields merge
//!    into the accumulated `BookingIntent`; the state machine decides what
//!    happens next.
//! 4. **Commit** (`bookly-calendar`) - a confirmed intent is checked against
//!    live free/busy data and written to the remote calendar.
//!
//! All external-call failures are converted into user-facing replies here;
//! a failed turn never advances or corrupts session state.

pub mod conversation;
pub mod runtime;
pub mod session;

pub use runtime::BookingAgent;
pub use session::{SessionState, SessionStore};
