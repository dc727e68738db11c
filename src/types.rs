//! Minimal response schemas shared across operations.
//!
//! Only the fields the SDK itself exercises are modeled; unknown fields in
//! API responses are ignored during deserialization.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Date and time type for timestamps in API responses.
pub use chrono::{DateTime, Utc};

/// Identifier that survives round-trips without precision loss.
///
/// Twitter IDs are 64-bit-range integers that the API serializes as JSON
/// strings in some places and bare numbers in others. The digits are kept
/// verbatim rather than parsed into a float, so a 19-digit ID decodes
/// exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NumericId(String);

impl NumericId {
    #[must_use]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NumericId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NumericId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for NumericId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for NumericId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for NumericId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

struct NumericIdVisitor;

impl Visitor<'_> for NumericIdVisitor {
    type Value = NumericId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a numeric identifier as a string or number")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<NumericId, E> {
        Ok(NumericId(value.to_owned()))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<NumericId, E> {
        Ok(NumericId(value.to_string()))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<NumericId, E> {
        Ok(NumericId(value.to_string()))
    }
}

impl<'de> Deserialize<'de> for NumericId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NumericIdVisitor)
    }
}

/// Structured error payload returned by the API in non-success responses.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Diagnostic {
    pub title: Option<String>,
    pub detail: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<String>,
}

impl Diagnostic {
    /// Whether the API actually filed an error in this body.
    #[must_use]
    pub fn is_filed(&self) -> bool {
        self.title.is_some() || self.detail.is_some() || self.kind.is_some()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "title: {}, detail: {}, type: {}",
            self.title.as_deref().unwrap_or(""),
            self.detail.as_deref().unwrap_or(""),
            self.kind.as_deref().unwrap_or("")
        )
    }
}

/// A single Tweet object.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Tweet {
    pub id: NumericId,
    pub text: String,
    pub author_id: Option<NumericId>,
    pub conversation_id: Option<NumericId>,
    pub created_at: Option<DateTime<Utc>>,
    pub lang: Option<String>,
}

/// A single User object.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct User {
    pub id: NumericId,
    pub name: String,
    pub username: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Referenced objects returned when an expansion parameter is included.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Includes {
    pub tweets: Vec<Tweet>,
    pub users: Vec<User>,
}
