//! Normalized string identifiers used for node IDs and node kind keys.

use std::fmt;
use std::str::FromStr;

use derive_more::{AsRef, Deref};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A normalized string identifier: lowercase ASCII letters, digits, and
/// underscores only, at most 64 characters. Used for both `Node.id` and a
/// node's `kind_key` — both are author-chosen names, not generated UUIDs.
#[derive(Clone, Hash, Deref, AsRef)]
#[deref(forward)]
pub struct Key(String);

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum KeyParseError {
    #[error("key cannot be empty or whitespace")]
    Empty,
    #[error("key contains invalid characters (only a-z, 0-9, and _ are allowed)")]
    InvalidCharacters,
    #[error("key is too long (max 64 characters)")]
    TooLong,
}

impl Key {
    pub fn new<S: AsRef<str>>(s: S) -> Result<Self, KeyParseError> {
        let s = s.as_ref().trim();
        if s.is_empty() {
            return Err(KeyParseError::Empty);
        }

        let joined = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_ascii_lowercase();

        if !joined
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(KeyParseError::InvalidCharacters);
        }

        if joined.len() > 64 {
            return Err(KeyParseError::TooLong);
        }

        Ok(Key(joined))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn is_valid<S: AsRef<str>>(s: S) -> bool {
        Key::new(s).is_ok()
    }
}

impl FromStr for Key {
    type Err = KeyParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::new(s)
    }
}

impl TryFrom<&str> for Key {
    type Error = KeyParseError;
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Key::new(s)
    }
}

impl TryFrom<String> for Key {
    type Error = KeyParseError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Key::new(&s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.0)
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for Key {}

impl<T: AsRef<str>> PartialEq<T> for Key {
    fn eq(&self, other: &T) -> bool {
        self.0 == other.as_ref()
    }
}

impl PartialEq<Key> for str {
    fn eq(&self, other: &Key) -> bool {
        self == other.as_ref()
    }
}
impl PartialEq<Key> for String {
    fn eq(&self, other: &Key) -> bool {
        self.as_str() == other.as_ref()
    }
}
impl PartialEq<Key> for &str {
    fn eq(&self, other: &Key) -> bool {
        *self == other.as_ref()
    }
}

impl Serialize for Key {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

struct KeyVisitor;

impl<'de> Visitor<'de> for KeyVisitor {
    type Value = Key;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a valid node or kind key string")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Key::new(value).map_err(|e| E::custom(e.to_string()))
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(KeyVisitor)
    }
}
