//! Client-side form validation.
//!
//! Runs before any network call; a non-empty result short-circuits dispatch.
//! Field keys match the backend's, so server-side rejections and local
//! checks land on the same form fields.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::{Credentials, PostDraft, PostPatch, Registration};

const TITLE_MIN_CHARS: usize = 5;
const TITLE_MAX_CHARS: usize = 100;
const CONTENT_MIN_CHARS: usize = 10;
const PASSWORD_MIN_CHARS: usize = 8;

static EMAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").ok());

/// Per-field error messages keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message for a field. A second message for the same field is
    /// appended to the first.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let message = message.into();
        self.0
            .entry(field.into())
            .and_modify(|existing| {
                existing.push(' ');
                existing.push_str(&message);
            })
            .or_insert(message);
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `None` when no field failed, matching the "null means valid" contract
    /// of the validators below.
    pub fn into_option(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

fn title_error(title: &str) -> Option<&'static str> {
    let trimmed = title.trim();
    let len = trimmed.chars().count();
    if trimmed.is_empty() {
        Some("Title is required")
    } else if len < TITLE_MIN_CHARS {
        Some("Title must be at least 5 characters long")
    } else if len > TITLE_MAX_CHARS {
        Some("Title must be less than 100 characters long")
    } else {
        None
    }
}

fn content_error(content: &str) -> Option<&'static str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        Some("Content is required")
    } else if trimmed.chars().count() < CONTENT_MIN_CHARS {
        Some("Content must be at least 10 characters long")
    } else {
        None
    }
}

/// Validates a new post. Returns `None` when both fields are acceptable.
pub fn validate_blog(draft: &PostDraft) -> Option<FieldErrors> {
    let mut errors = FieldErrors::new();
    if let Some(message) = title_error(&draft.title) {
        errors.insert("title", message);
    }
    if let Some(message) = content_error(&draft.content) {
        errors.insert("content", message);
    }
    errors.into_option()
}

impl PostPatch {
    /// Validates only the fields being changed.
    pub fn validate(&self) -> Option<FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(message) = self.title.as_deref().and_then(title_error) {
            errors.insert("title", message);
        }
        if let Some(message) = self.content.as_deref().and_then(content_error) {
            errors.insert("content", message);
        }
        errors.into_option()
    }
}

pub fn validate_credentials(credentials: &Credentials) -> Option<FieldErrors> {
    let mut errors = FieldErrors::new();
    if credentials.username.trim().is_empty() {
        errors.insert("username", "Username is required");
    }
    if credentials.password.is_empty() {
        errors.insert("password", "Password is required");
    }
    errors.into_option()
}

pub fn validate_registration(registration: &Registration) -> Option<FieldErrors> {
    let mut errors = FieldErrors::new();

    if registration.username.trim().is_empty() {
        errors.insert("username", "Username is required");
    }

    let email = registration.email.trim();
    if email.is_empty() {
        errors.insert("email", "Email is required");
    } else if !EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email)) {
        errors.insert("email", "Email is invalid");
    }

    if registration.first_name.trim().is_empty() {
        errors.insert("first_name", "First name is required");
    }
    if registration.last_name.trim().is_empty() {
        errors.insert("last_name", "Last name is required");
    }

    if registration.password.is_empty() {
        errors.insert("password", "Password is required");
    } else if registration.password.chars().count() < PASSWORD_MIN_CHARS {
        errors.insert("password", "Password must be at least 8 characters");
    }

    if registration.password != registration.password_confirm {
        errors.insert("password_confirm", "Passwords do not match");
    }

    errors.into_option()
}
