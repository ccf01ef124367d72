use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum IdError {
    #[error("identifier is empty")]
    Empty,
    #[error("invalid identifier: {0}")]
    Invalid(String),
}

/// A video id without the `ac` prefix, e.g. `41502955`.
///
/// Parts of a multi-part video use `<base>_<part-index>`, e.g. `41502955_2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

/// Numeric uploader account id, e.g. `9876`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploaderId(String);

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl VideoId {
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        let value = value.trim();
        let value = value.strip_prefix("ac").unwrap_or(value);
        if value.is_empty() {
            return Err(IdError::Empty);
        }

        let valid = match value.split_once('_') {
            Some((base, part)) => is_digits(base) && is_digits(part),
            None => is_digits(value),
        };
        if !valid {
            return Err(IdError::Invalid(value.to_string()));
        }

        Ok(Self(value.to_string()))
    }

    /// Id of part `index` (1-based) of this video.
    pub fn part(&self, index: usize) -> Self {
        Self(format!("{}_{}", self.base(), index))
    }

    /// The id with any part suffix removed.
    pub fn base(&self) -> &str {
        self.0.split_once('_').map(|(b, _)| b).unwrap_or(&self.0)
    }

    pub fn part_index(&self) -> Option<usize> {
        self.0.split_once('_').and_then(|(_, p)| p.parse().ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn page_url(&self) -> String {
        format!("{}/v/ac{}", crate::BASE_URL, self.0)
    }
}

impl UploaderId {
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() {
            return Err(IdError::Empty);
        }
        if !is_digits(value) {
            return Err(IdError::Invalid(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    /// Placeholder used when a page does not name its uploader.
    pub fn unknown() -> Self {
        Self("0".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn page_url(&self) -> String {
        format!("{}/u/{}", crate::BASE_URL, self.0)
    }
}

impl FromStr for VideoId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for UploaderId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for UploaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
