//! Datetime serde helpers for collaborator payloads
//!
//! The collaborator serializes local wall-clock datetimes as
//! `"YYYY-MM-DD HH:MM:SS"`. Some deployments emit the ISO `T` separator
//! instead, so deserialization accepts both.

use chrono::NaiveDateTime;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATETIME_FORMAT_ISO: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a collaborator datetime, tolerating both separators.
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, DATETIME_FORMAT_ISO))
}

/// Serde adapter for a required collaborator datetime field.
pub mod serde_datetime {
    use super::*;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(DATETIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_datetime(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for an optional collaborator datetime field.
///
/// Absent and `null` both deserialize to `None`.
pub mod serde_datetime_opt {
    use super::*;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(DATETIME_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) if !s.is_empty() => parse_datetime(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}
