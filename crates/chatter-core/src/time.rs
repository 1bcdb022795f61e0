//! Wire timestamp rendering.

use chrono::{DateTime, TimeZone};

/// Renders a timestamp as zero-padded 24-hour `HH:MM:SS`.
pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%H:%M:%S").to_string()
}
