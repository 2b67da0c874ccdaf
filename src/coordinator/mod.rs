//! Coordinator module for pacing expensive operations
//!
//! This module contains the rate-limit coordinator and its time sources:
//! - Waiting out backoff and minimum spacing
//! - Recording operation starts and rate-limit signals
//! - Answering daily-cap, backoff, and degradation queries

mod clock;
mod throttle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use throttle::{Admission, Coordinator};
