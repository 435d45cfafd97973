//! Error kinds shared by the store, the provider and the client-facing layer.
//!
//! Every [`crate::Error`] classifies into exactly one [`ErrorKind`]. The kind is
//! what a request dispatcher branches on; it survives the provider's message
//! wrapping, so callers never need to match on message text.
//!
//! | Kind           | Name                | Status | Client message          |
//! |----------------|---------------------|--------|-------------------------|
//! | `Validation`   | `ValidationError`   | 400    | original message        |
//! | `NotFound`     | `NotFoundError`     | 404    | original message        |
//! | `Unauthorized` | `UnauthorizedError` | 401    | `Unauthorized access`   |
//! | `Internal`     | `InternalError`     | 500    | `Internal Server Error` |
//!
//! ## Example
//!
//! ```rust
//! use user_facade::error_code::ErrorKind;
//!
//! let kind = ErrorKind::NotFound;
//! assert_eq!(kind.name(), "NotFoundError");
//! assert_eq!(kind.status_code(), 404);
//! assert!(kind.exposes_message());
//! ```

use std::fmt;

/// Closed classification of every failure this crate can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or out-of-range input fields
    Validation,
    /// Identity does not resolve to a record
    NotFound,
    /// Reserved; not raised by the store or provider
    Unauthorized,
    /// Anything else, including breaker timeouts and lock poisoning
    Internal,
}

impl ErrorKind {
    /// Returns the conventional error name (e.g., `"ValidationError"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::NotFound => "NotFoundError",
            Self::Unauthorized => "UnauthorizedError",
            Self::Internal => "InternalError",
        }
    }

    /// Transport status a dispatcher should answer with.
    #[inline]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::Unauthorized => 401,
            Self::Internal => 500,
        }
    }

    /// Whether the error's own message may be shown to a client.
    #[inline]
    pub fn exposes_message(&self) -> bool {
        matches!(self, Self::Validation | Self::NotFound)
    }

    /// Fixed client message for kinds that hide their own message.
    pub fn generic_message(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Unauthorized access",
            Self::Validation => "Bad Request",
            Self::NotFound => "Not Found",
            Self::Internal => "Internal Server Error",
        }
    }

}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorKind::Validation.status_code(), 400);
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::Unauthorized.status_code(), 401);
        assert_eq!(ErrorKind::Internal.status_code(), 500);
    }

    #[test]
    fn test_names() {
        assert_eq!(ErrorKind::Validation.to_string(), "ValidationError");
        assert_eq!(ErrorKind::Internal.name(), "InternalError");
    }

    #[test]
    fn test_message_exposure() {
        assert!(ErrorKind::Validation.exposes_message());
        assert!(ErrorKind::NotFound.exposes_message());
        assert!(!ErrorKind::Unauthorized.exposes_message());
        assert!(!ErrorKind::Internal.exposes_message());
        assert_eq!(ErrorKind::Unauthorized.generic_message(), "Unauthorized access");
    }
}
