//! Domain types shared by the ingestor and the query service.
//!
//! Newtypes over validated request values.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const MAX_KEYWORD_LEN: usize = 120;

const MAX_SKIP: u64 = i64::MAX.unsigned_abs();

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeywordError {
    #[error("keyword cannot be empty")]
    Empty,

    #[error("keyword is longer than {MAX_KEYWORD_LEN} bytes")]
    TooLong,

    #[error("keyword cannot contain '$' or NUL characters")]
    ReservedCharacter,

    #[error("keyword cannot start with 'system.'")]
    SystemNamespace,
}

/// A search keyword. Each keyword owns the store collection of the same name.
///
/// # Examples
///
/// ```rust
/// use tubewatch::domain::Keyword;
///
/// let keyword = Keyword::parse("music").unwrap();
/// assert_eq!(keyword.as_str(), "music");
/// assert!(Keyword::parse("$where").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Keyword(String);

impl Keyword {
    /// Validates `raw` against the store's collection naming rules.
    pub fn parse(raw: impl Into<String>) -> Result<Self, KeywordError> {
        let raw = raw.into();

        if raw.is_empty() {
            return Err(KeywordError::Empty);
        }
        if raw.len() > MAX_KEYWORD_LEN {
            return Err(KeywordError::TooLong);
        }
        if raw.contains('$') || raw.contains('\0') {
            return Err(KeywordError::ReservedCharacter);
        }
        if raw.starts_with("system.") {
            return Err(KeywordError::SystemNamespace);
        }

        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Keyword {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Keyword {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(serde::de::Error::custom)
    }
}

/// A validated page request against one keyword collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
    pub search: Option<String>,
}

impl PageRequest {
    /// Number of documents to skip before this page starts.
    ///
    /// Capped at `i64::MAX`, the largest skip the document store accepts. Pages that
    /// far out are simply empty.
    #[must_use]
    pub const fn skip(&self) -> u64 {
        let skip = self.page.saturating_mul(self.limit);
        if skip > MAX_SKIP { MAX_SKIP } else { skip }
    }

    /// One document past the page, used to detect whether a next page exists.
    #[must_use]
    pub const fn probe_limit(&self) -> u64 {
        self.limit.saturating_add(1)
    }
}
