//! Run-wide inputs that are not upstream data.

use chrono::{DateTime, Utc};

/// Timestamp format of the `releaseTime`/`time` profile fields.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Values fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    /// Generation timestamp written into profiles.
    pub generated_at: String,
}

impl BuildContext {
    /// A context stamped with the current time.
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// A context stamped with `time`.
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            generated_at: time.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}
