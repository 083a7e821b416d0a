//! Creation-time rendering

use crate::config::CREATION_TIME_FORMAT;
use chrono::{DateTime, Local, Utc};

/// Local wall-clock rendering, e.g. `Tue 04 Mar 2025 09:15:02 AM +01:00`.
pub fn format_creation_time(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format(CREATION_TIME_FORMAT)
        .to_string()
}
