//! Data models for the club portal.
//!
//! Field names serialize in camelCase to match the frontend.

mod content;
mod session;
mod user;

pub use content::*;
pub use session::*;
pub use user::*;

use chrono::{SecondsFormat, Utc};

/// Current time as a fixed-width RFC 3339 string, so stored timestamps sort lexically.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current date as `YYYY-MM-DD`.
pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}
