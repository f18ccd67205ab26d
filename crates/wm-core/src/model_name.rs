//! Strongly-typed model name wrapper.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

/// Name of a model, taken from its SQL file stem.
///
/// Model names double as relation names in the warehouse, so they are limited
/// to ASCII letters, digits and underscores and may not start with a digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelName(String);

impl ModelName {
    /// Validate and wrap a model name.
    pub fn parse(name: impl Into<String>) -> CoreResult<Self> {
        let name = name.into();
        match invalid_reason(&name) {
            Some(reason) => Err(CoreError::InvalidModelName {
                name,
                reason: reason.to_string(),
            }),
            None => Ok(Self(name)),
        }
    }

    /// Return the underlying name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner `String`.
    pub fn into_inner(self) -> String {
        self.0
    }
}

fn invalid_reason(name: &str) -> Option<&'static str> {
    let mut chars = name.chars();
    match chars.next() {
        None => Some("name is empty"),
        Some(c) if c.is_ascii_digit() => Some("name starts with a digit"),
        Some(c) if !(c.is_ascii_alphanumeric() || c == '_') => {
            Some("only ASCII letters, digits and '_' are allowed")
        }
        Some(_) if chars.any(|c| !(c.is_ascii_alphanumeric() || c == '_')) => {
            Some("only ASCII letters, digits and '_' are allowed")
        }
        Some(_) => None,
    }
}

impl TryFrom<String> for ModelName {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for ModelName {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<ModelName> for String {
    fn from(name: ModelName) -> Self {
        name.0
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ModelName {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ModelName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ModelName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ModelName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
