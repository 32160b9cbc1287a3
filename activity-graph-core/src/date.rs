//! Date parsing for activity documents and CLI flags
//!
//! Accepted input forms:
//! - RFC 3339 (`2024-01-01T10:00:00+01:00`, `2024-01-01T10:00:00Z`)
//! - Offset without a colon (`2024-01-01T10:00:00+0100`), as emitted by analysis servers
//! - Bare calendar date (`2024-01-01`), read as midnight UTC
//!
//! Output is always RFC 3339 in UTC with second precision.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

const OFFSET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";
const DAY_FORMAT: &str = "%Y-%m-%d";

/// Parse a date in any accepted form into UTC
pub fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(trimmed, OFFSET_FORMAT) {
        return Ok(dt.with_timezone(&Utc));
    }

    let day = NaiveDate::parse_from_str(trimmed, DAY_FORMAT)
        .with_context(|| format!("unrecognized date: {}", input))?;
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("date has no midnight: {}", input))?;
    Ok(midnight.and_utc())
}

/// Canonical string form used in all serialized output
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `#[serde(with = "crate::date::rfc3339")]`
pub mod rfc3339 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw).map_err(|e| serde::de::Error::custom(format!("{:#}", e)))
    }
}

/// `#[serde(with = "crate::date::rfc3339_opt")]` for optional dates
pub mod rfc3339_opt {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_str(&super::format_date(date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|raw| super::parse_date(&raw))
            .transpose()
            .map_err(|e| serde::de::Error::custom(format!("{:#}", e)))
    }
}
