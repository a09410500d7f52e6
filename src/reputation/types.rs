//! Identity and bounded-text input types
//!
//! These are validated once at the boundary so the core only ever sees
//! well-formed principals, comments and category names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Unix seconds supplied by the surrounding execution context
pub type Timestamp = u64;

/// Sequential category identifier (first category is 1)
pub type CategoryId = u64;

pub const MAX_PRINCIPAL_LENGTH: usize = 128;
pub const MAX_COMMENT_LENGTH: usize = 500;
pub const MAX_CATEGORY_NAME_LENGTH: usize = 50;

/// Rejections raised while building boundary types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("principal must not be empty")]
    EmptyPrincipal,

    #[error("principal is {len} bytes, maximum is {max}")]
    PrincipalTooLong { len: usize, max: usize },

    #[error("principal must not contain whitespace or control characters")]
    InvalidPrincipal,

    #[error("comment is {len} characters, maximum is {max}")]
    CommentTooLong { len: usize, max: usize },

    #[error("category name must not be empty")]
    EmptyCategoryName,

    #[error("category name is {len} characters, maximum is {max}")]
    CategoryNameTooLong { len: usize, max: usize },
}

/// An identity able to send and receive attestations
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    pub fn new(value: impl Into<String>) -> Result<Self, InputError> {
        let value = value.into();

        if value.is_empty() {
            return Err(InputError::EmptyPrincipal);
        }
        if value.len() > MAX_PRINCIPAL_LENGTH {
            return Err(InputError::PrincipalTooLong {
                len: value.len(),
                max: MAX_PRINCIPAL_LENGTH,
            });
        }
        if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(InputError::InvalidPrincipal);
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Principal {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Principal> for String {
    fn from(principal: Principal) -> Self {
        principal.0
    }
}

impl FromStr for Principal {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Free-text note attached to an attestation (may be empty)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Comment(String);

impl Comment {
    pub fn new(value: impl Into<String>) -> Result<Self, InputError> {
        let value = value.into();
        let len = value.chars().count();
        if len > MAX_COMMENT_LENGTH {
            return Err(InputError::CommentTooLong {
                len,
                max: MAX_COMMENT_LENGTH,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Comment {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Comment> for String {
    fn from(comment: Comment) -> Self {
        comment.0
    }
}

/// Administrator-chosen label for a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CategoryName(String);

impl CategoryName {
    pub fn new(value: impl Into<String>) -> Result<Self, InputError> {
        let value = value.into();
        if value.is_empty() {
            return Err(InputError::EmptyCategoryName);
        }
        let len = value.chars().count();
        if len > MAX_CATEGORY_NAME_LENGTH {
            return Err(InputError::CategoryNameTooLong {
                len,
                max: MAX_CATEGORY_NAME_LENGTH,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CategoryName {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CategoryName> for String {
    fn from(name: CategoryName) -> Self {
        name.0
    }
}

impl fmt::Display for CategoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_validation() {
        assert!(Principal::new("SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7").is_ok());
        assert_eq!(Principal::new(""), Err(InputError::EmptyPrincipal));
        assert_eq!(Principal::new("alice bob"), Err(InputError::InvalidPrincipal));
        assert!(matches!(
            Principal::new("a".repeat(MAX_PRINCIPAL_LENGTH + 1)),
            Err(InputError::PrincipalTooLong { .. })
        ));
    }

    #[test]
    fn test_comment_counts_characters_not_bytes() {
        // 500 multi-byte characters is still within bounds
        assert!(Comment::new("é".repeat(MAX_COMMENT_LENGTH)).is_ok());
        assert!(Comment::new("x".repeat(MAX_COMMENT_LENGTH + 1)).is_err());
        assert_eq!(Comment::default().as_str(), "");
    }

    #[test]
    fn test_category_name_bounds() {
        assert_eq!(CategoryName::new(""), Err(InputError::EmptyCategoryName));
        assert!(CategoryName::new("code-review").is_ok());
        assert!(CategoryName::new("n".repeat(MAX_CATEGORY_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_principal_rejects_invalid_json() {
        let parsed: Result<Principal, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());

        let parsed: Principal = serde_json::from_str("\"alice\"").unwrap();
        assert_eq!(parsed.as_str(), "alice");
    }
}
