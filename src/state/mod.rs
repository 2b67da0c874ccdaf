//! State module for tracking per-account pacing
//!
//! # Components
//!
//! - `RateLimitState`: The persisted record and its pure state transitions
//! - `DegradationMode`: Advice for callers on how much data to request
//! - `AccountKey`: Which record an operation applies to

mod account;
mod degradation;
mod rate_state;

// Re-export main types
pub use account::AccountKey;
pub use degradation::DegradationMode;
pub use rate_state::{end_of_day, RateLimitMetrics, RateLimitOutcome, RateLimitState};
