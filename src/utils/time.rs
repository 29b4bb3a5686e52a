use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Error, Result};

/// Timestamp layout used by the SMS provider callbacks: date and time run together.
pub const PROVIDER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d%H:%M:%S";

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn parse_provider_timestamp(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), PROVIDER_TIMESTAMP_FORMAT)
        .map_err(|e| Error::Timestamp(format!("{:?}: {}", raw, e)))
}

/// Interprets a wall-clock time as local to `tz`.
pub fn localize(naive: NaiveDateTime, tz: Tz) -> Result<DateTime<FixedOffset>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| Error::Timestamp(format!("{} does not exist in {}", naive, tz)))
}

pub fn parse_and_localize(raw: &str, tz: Tz) -> Result<DateTime<FixedOffset>> {
    localize(parse_provider_timestamp(raw)?, tz)
}
