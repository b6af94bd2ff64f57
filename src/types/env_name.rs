// ABOUTME: Validated environment name (the blue/green slot, e.g. "blue").
// ABOUTME: Names double as resource-name suffixes, so they follow RFC 1123 label rules.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvNameError {
    #[error("environment name cannot be empty")]
    Empty,

    #[error("environment name is longer than 63 characters")]
    TooLong,

    #[error("environment name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("environment name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("environment name must be lowercase")]
    NotLowercase,

    #[error("invalid character in environment name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvName(String);

/// Longest name that still fits in a DNS label.
const MAX_LEN: usize = 63;

impl EnvName {
    pub fn new(value: &str) -> Result<Self, EnvNameError> {
        match value {
            "" => return Err(EnvNameError::Empty),
            v if v.len() > MAX_LEN => return Err(EnvNameError::TooLong),
            v if v.starts_with('-') => return Err(EnvNameError::StartsWithHyphen),
            v if v.ends_with('-') => return Err(EnvNameError::EndsWithHyphen),
            _ => {}
        }
        if let Some(bad) = value
            .chars()
            .find(|c| !matches!(c, 'a'..='z' | '0'..='9' | '-'))
        {
            return Err(if bad.is_ascii_uppercase() {
                EnvNameError::NotLowercase
            } else {
                EnvNameError::InvalidChar(bad)
            });
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EnvName {
    type Err = EnvNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for EnvName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EnvName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        EnvName::new(&s).map_err(serde::de::Error::custom)
    }
}
