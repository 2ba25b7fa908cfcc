//! Core check-in types for rollcall.
//!
//! This module defines the records that make up the ledger and the request
//! body used to append to it.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Offset-less layouts the ledger may hold, read as UTC.
const NAIVE_LAYOUTS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Which kind of attendee a check-in belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// A visitor who is not on the member list.
    Guest,
    /// A person on the member list.
    Member,
}

impl Category {
    /// Label used when rendering a record.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Guest => "GUEST",
            Self::Member => "MEMBER",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guest => write!(f, "guest"),
            Self::Member => write!(f, "member"),
        }
    }
}

/// One ledger entry representing a person's attendance.
///
/// Records are created by the ledger owner and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInRecord {
    /// Name of the person who checked in.
    pub name: String,

    /// Guest or member.
    #[serde(rename = "type")]
    pub category: Category,

    /// When the check-in happened.
    ///
    /// The ledger stores whatever time the submitting client sent, so both
    /// RFC 3339 and offset-less ISO 8601 are accepted. See [`parse_timestamp`].
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,

    /// Server-side receive time, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<String>,
}

impl CheckInRecord {
    /// Create a record stamped at the given instant.
    #[must_use]
    pub fn new(name: impl Into<String>, category: Category, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            category,
            timestamp,
            received_at: None,
        }
    }

    /// Check if this record belongs to a guest.
    #[must_use]
    pub fn is_guest(&self) -> bool {
        self.category == Category::Guest
    }
}

/// Parse a ledger timestamp.
///
/// RFC 3339 values keep their offset. Values without an offset are taken
/// as UTC. Returns `None` for anything else.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| de::Error::custom(format!("unrecognised timestamp {raw:?}")))
}

/// The person being checked in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Display name, either typed or picked from the member list.
    pub name: String,
    /// Guest or member.
    pub category: Category,
}

impl Identity {
    /// Create a new identity.
    #[must_use]
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
        }
    }

    /// Check if no name has been chosen yet.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }
}

/// Request body for `POST /api/checkin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInPayload {
    /// Name of the person checking in.
    pub name: String,

    /// Guest or member.
    #[serde(rename = "type")]
    pub category: Category,

    /// Client clock at submission, ISO-8601. Advisory only.
    pub current_time: String,
}

impl CheckInPayload {
    /// Build a payload for `identity` stamped at `at`.
    #[must_use]
    pub fn at(identity: &Identity, at: DateTime<Utc>) -> Self {
        Self {
            name: identity.name.clone(),
            category: identity.category,
            current_time: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Build a payload for `identity` stamped now.
    #[must_use]
    pub fn now(identity: &Identity) -> Self {
        Self::at(identity, Utc::now())
    }
}
