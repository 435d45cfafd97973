//! User record and the validation predicate every stored record satisfies.

use crate::{Error, ErrorContext, Result};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 50;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Record role. Anything outside this set is rejected at validation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(invalid(
                "role",
                "\"role\" must be one of [user, admin]",
                other,
            )),
        }
    }
}

/// A stored user record.
///
/// `id` and `created_at` are assigned once by the store and never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Fields that passed validation, ready to be stamped into a [`Record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidFields {
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Input for creating a record. Every field is optional at the type level so
/// that a missing field is reported as a validation error, not a parse error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl RecordDraft {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            email: Some(email.into()),
            role: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Check the draft against the record schema. The first violation wins.
    pub fn validate(&self) -> Result<ValidFields> {
        if let Some(id) = self.id.as_deref() {
            if uuid::Uuid::parse_str(id).is_err() {
                return Err(invalid("id", "\"id\" must be a valid GUID", id));
            }
        }
        let name = self.name.as_deref().ok_or_else(|| required("name"))?;
        validate_name(name)?;
        let email = self.email.as_deref().ok_or_else(|| required("email"))?;
        validate_email(email)?;
        let role = match self.role.as_deref() {
            Some(r) => r.parse()?,
            None => Role::default(),
        };
        Ok(ValidFields {
            id: self.id.clone(),
            name: name.to_string(),
            email: email.to_string(),
            role,
        })
    }
}

/// Partial update. Identity and creation time are not representable here, so
/// a merge can never overwrite them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Merge onto `existing` and validate the merged result as a whole.
    /// `existing` is left untouched on failure.
    pub fn apply_to(&self, existing: &Record) -> Result<Record> {
        let name = self.name.as_deref().unwrap_or(&existing.name);
        validate_name(name)?;
        let email = self.email.as_deref().unwrap_or(&existing.email);
        validate_email(email)?;
        let role = match self.role.as_deref() {
            Some(r) => r.parse()?,
            None => existing.role,
        };
        Ok(Record {
            id: existing.id.clone(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            created_at: existing.created_at,
        })
    }
}

fn validate_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if len < NAME_MIN_CHARS {
        return Err(invalid(
            "name",
            format!("\"name\" length must be at least {} characters long", NAME_MIN_CHARS),
            name,
        ));
    }
    if len > NAME_MAX_CHARS {
        return Err(invalid(
            "name",
            format!(
                "\"name\" length must be less than or equal to {} characters long",
                NAME_MAX_CHARS
            ),
            name,
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(invalid("email", "\"email\" must be a valid email", email))
    }
}

fn required(field: &str) -> Error {
    Error::validation_with_context(
        format!("Validation error: \"{}\" is required", field),
        ErrorContext::new()
            .with_field_path(field)
            .with_source("record_schema"),
    )
}

fn invalid(field: &str, msg: impl fmt::Display, value: &str) -> Error {
    Error::validation_with_context(
        format!("Validation error: {}", msg),
        ErrorContext::new()
            .with_field_path(field)
            .with_details(format!("got {:?}", value))
            .with_source("record_schema"),
    )
}
