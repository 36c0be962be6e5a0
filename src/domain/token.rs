use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest token value accepted into the pool
pub const MAX_TOKEN_LEN: usize = 255;

/// Bounds for generated token length (hex digits taken from a UUIDv4)
pub const MIN_GENERATED_LEN: usize = 4;
pub const MAX_GENERATED_LEN: usize = 32;
pub const DEFAULT_GENERATED_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is empty")]
    Empty,

    #[error("Token is longer than {MAX_TOKEN_LEN} characters")]
    TooLong,

    #[error("Token has leading or trailing whitespace")]
    Whitespace,

    #[error("Token contains control characters")]
    ControlCharacter,

    #[error("Generated token length must be between {MIN_GENERATED_LEN} and {MAX_GENERATED_LEN}, got {0}")]
    InvalidLength(usize),
}

/// An opaque single-use access code.
///
/// Values read back from storage are wrapped unchecked; [`Token::parse`]
/// applies only to values entering the pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Validate a token value before it is added to the pool
    pub fn parse(value: impl Into<String>) -> Result<Self, TokenError> {
        let value = value.into();

        if value.is_empty() {
            return Err(TokenError::Empty);
        }
        if value.chars().count() > MAX_TOKEN_LEN {
            return Err(TokenError::TooLong);
        }
        if value.trim() != value {
            return Err(TokenError::Whitespace);
        }
        if value.chars().any(char::is_control) {
            return Err(TokenError::ControlCharacter);
        }

        Ok(Self(value))
    }

    /// Generate a random token of `length` lowercase hex digits
    pub fn generate(length: usize) -> Result<Self, TokenError> {
        if !(MIN_GENERATED_LEN..=MAX_GENERATED_LEN).contains(&length) {
            return Err(TokenError::InvalidLength(length));
        }

        let hex = uuid::Uuid::new_v4().simple().to_string();
        Ok(Self(hex[..length].to_string()))
    }

    pub(crate) fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Result of a dispense attempt that reached storage successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispenseOutcome {
    /// A token was removed from the pool and handed out
    Dispensed(Token),
    /// The pool had no tokens left; nothing changed
    Empty,
}

impl DispenseOutcome {
    pub fn token(&self) -> Option<&Token> {
        match self {
            Self::Dispensed(token) => Some(token),
            Self::Empty => None,
        }
    }

    pub fn into_token(self) -> Option<Token> {
        match self {
            Self::Dispensed(token) => Some(token),
            Self::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}
