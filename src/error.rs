use crate::error_code::ErrorKind;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field that caused the error (e.g., "name", "email")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the offending value)
    pub details: Option<String>,
    /// Component that raised the error (e.g., "memory_store", "circuit_breaker")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the facade.
///
/// The four domain variants map one-to-one onto [`ErrorKind`]. Their display
/// string is the bare message, because the provider's wrapping contract
/// (`"Failed to fetch users: <original message>"`) is built from it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{message}")]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("{message}")]
    NotFound {
        message: String,
        context: ErrorContext,
    },

    #[error("{message}")]
    Unauthorized {
        message: String,
        context: ErrorContext,
    },

    #[error("{message}")]
    Internal {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Config {
        message: String,
        context: ErrorContext,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An error re-raised by an outer layer with a human-readable prefix.
    /// The kind of `source` is kept.
    #[error("{prefix}: {source}")]
    Wrapped {
        prefix: String,
        #[source]
        source: Box<Error>,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new not-found error with structured context
    pub fn not_found_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::NotFound {
            message: msg.into(),
            context,
        }
    }

    /// Create a new unauthorized error with structured context
    pub fn unauthorized_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Unauthorized {
            message: msg.into(),
            context,
        }
    }

    /// Create a new internal error with structured context
    pub fn internal_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Internal {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn config_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Config {
            message: msg.into(),
            context,
        }
    }

    /// Lock poisoning is never unwrapped; it surfaces as an internal error.
    pub(crate) fn poisoned(component: &str) -> Self {
        Error::internal_with_context(
            format!("{} lock poisoned", component),
            ErrorContext::new().with_source(component),
        )
    }

    /// Re-raise under `prefix`, keeping this error as the source and its kind.
    pub fn wrap(self, prefix: impl Into<String>) -> Self {
        Error::Wrapped {
            prefix: prefix.into(),
            source: Box::new(self),
        }
    }

    /// Classification of this error. Wrapping never changes it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Unauthorized { .. } => ErrorKind::Unauthorized,
            Error::Internal { .. } | Error::Config { .. } | Error::Serialization(_) => {
                ErrorKind::Internal
            }
            Error::Wrapped { source, .. } => source.kind(),
        }
    }

    /// Extract error context if available (looks through wrapping)
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Validation { context, .. }
            | Error::NotFound { context, .. }
            | Error::Unauthorized { context, .. }
            | Error::Internal { context, .. }
            | Error::Config { context, .. } => Some(context),
            Error::Wrapped { source, .. } => source.context(),
            Error::Serialization(_) => None,
        }
    }

    /// Each layer's message, outermost first.
    pub fn chain(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut cur = self;
        while let Error::Wrapped { prefix, source } = cur {
            out.push(prefix.clone());
            cur = source;
        }
        out.push(cur.to_string());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_keeps_kind_and_formats_message() {
        let inner = Error::not_found_with_context("User not found", ErrorContext::new());
        let wrapped = inner.wrap("Failed to fetch user");
        assert_eq!(wrapped.kind(), ErrorKind::NotFound);
        assert_eq!(wrapped.to_string(), "Failed to fetch user: User not found");
        assert_eq!(wrapped.chain(), vec!["Failed to fetch user", "User not found"]);
    }

    #[test]
    fn test_wrap_exposes_source() {
        use std::error::Error as _;
        let wrapped = Error::validation_with_context("bad", ErrorContext::new()).wrap("outer");
        let source = wrapped.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("bad"));
    }

    #[test]
    fn test_context_visible_through_wrapping() {
        let err = Error::validation_with_context(
            "Validation error: \"email\" must be a valid email",
            ErrorContext::new().with_field_path("email"),
        )
        .wrap("Failed to create user");
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("email")
        );
        assert_eq!(err.chain().len(), 2);
    }

    #[test]
    fn test_ambient_variants_are_internal() {
        let cfg = Error::config_with_context(
            "invalid value",
            ErrorContext::new().with_field_path("USER_FACADE_CACHE_TTL_MS"),
        );
        assert_eq!(cfg.kind(), ErrorKind::Internal);
        assert!(cfg.to_string().contains("field: USER_FACADE_CACHE_TTL_MS"));

        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert_eq!(Error::from(json_err).kind(), ErrorKind::Internal);
    }
}
