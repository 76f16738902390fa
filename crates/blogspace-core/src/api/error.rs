use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::FieldErrors;

/// Shown when the server could not be reached at all.
pub const UNREACHABLE_MESSAGE: &str = "Server is unreachable. Please try again later.";
/// Shown for 5xx responses without a usable message.
pub const SERVER_FAULT_MESSAGE: &str =
    "Something went wrong on the server. Please try again later.";
/// Shown when the session could not be renewed.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Body keys that carry a general message rather than a field error.
const NON_FIELD_KEYS: &[&str] = &["detail", "message", "non_field_errors", "code", "messages"];

/// Categories of API errors for consistent error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// Local form validation failed; nothing was sent
    Validation,
    /// The server rejected one or more fields (HTTP 400 with a field map)
    FieldRejection,
    /// Login or registration refused the supplied credentials
    InvalidCredentials,
    /// No HTTP response: connection refused, DNS failure, timeout
    NetworkUnreachable,
    /// HTTP 5xx
    ServerFault,
    /// Authorization failed and could not be renewed; the session was cleared
    AuthorizationExpired,
    /// Any other 4xx (forbidden, not found, ...)
    Rejected,
    /// A success response whose body could not be parsed
    Decode,
    /// The local session store could not be read or written
    Storage,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Validation => write!(f, "validation"),
            ApiErrorKind::FieldRejection => write!(f, "field_rejection"),
            ApiErrorKind::InvalidCredentials => write!(f, "invalid_credentials"),
            ApiErrorKind::NetworkUnreachable => write!(f, "network_unreachable"),
            ApiErrorKind::ServerFault => write!(f, "server_fault"),
            ApiErrorKind::AuthorizationExpired => write!(f, "authorization_expired"),
            ApiErrorKind::Rejected => write!(f, "rejected"),
            ApiErrorKind::Decode => write!(f, "decode"),
            ApiErrorKind::Storage => write!(f, "storage"),
        }
    }
}

/// Structured error from the API layer with kind and details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Error category
    pub kind: ApiErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// The server's own `detail`/`message` text, when it sent one
    pub detail: Option<String>,
    /// Per-field messages for validation and field rejections
    pub field_errors: FieldErrors,
    /// HTTP status, when a response was received
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            field_errors: FieldErrors::default(),
            status: None,
        }
    }

    /// Local validation failure.
    pub fn validation(field_errors: FieldErrors) -> Self {
        Self {
            field_errors,
            ..Self::new(
                ApiErrorKind::Validation,
                "Please fix the highlighted fields.",
            )
        }
    }

    pub fn unreachable(details: impl fmt::Display) -> Self {
        Self::new(
            ApiErrorKind::NetworkUnreachable,
            format!("{UNREACHABLE_MESSAGE} ({details})"),
        )
    }

    pub fn authorization_expired() -> Self {
        Self {
            status: Some(401),
            ..Self::new(ApiErrorKind::AuthorizationExpired, SESSION_EXPIRED_MESSAGE)
        }
    }

    pub fn decode(details: impl fmt::Display) -> Self {
        Self::new(
            ApiErrorKind::Decode,
            format!("Unexpected response from server: {details}"),
        )
    }

    pub fn storage(err: &anyhow::Error) -> Self {
        Self::new(ApiErrorKind::Storage, format!("{err:#}"))
    }

    /// Classifies a non-success HTTP response.
    ///
    /// `credential_exchange` marks login/register, where 401 and bare 400
    /// responses mean the credentials were refused.
    pub fn from_response(status: u16, body: &str, credential_exchange: bool) -> Self {
        let json = serde_json::from_str::<Value>(body).ok();
        let detail = json.as_ref().and_then(server_message);
        let field_errors = json.as_ref().map(field_errors_from).unwrap_or_default();

        let kind = match status {
            400 if !field_errors.is_empty() => ApiErrorKind::FieldRejection,
            400 | 401 if credential_exchange => ApiErrorKind::InvalidCredentials,
            401 => ApiErrorKind::AuthorizationExpired,
            500..=599 => ApiErrorKind::ServerFault,
            _ => ApiErrorKind::Rejected,
        };

        let message = detail.clone().unwrap_or_else(|| match kind {
            ApiErrorKind::ServerFault => SERVER_FAULT_MESSAGE.to_string(),
            ApiErrorKind::FieldRejection => "The server rejected some fields.".to_string(),
            _ => format!("HTTP {status}"),
        });

        Self {
            kind,
            message,
            detail,
            field_errors,
            status: Some(status),
        }
    }

    /// The string a UI should show: field problems first, then the server's
    /// own message, then a generic fallback.
    pub fn user_message(&self) -> String {
        match self.kind {
            ApiErrorKind::Validation | ApiErrorKind::FieldRejection
                if !self.field_errors.is_empty() =>
            {
                self.field_errors.to_string()
            }
            ApiErrorKind::NetworkUnreachable => UNREACHABLE_MESSAGE.to_string(),
            _ => self.message.clone(),
        }
    }

    /// Whether the failure carries field-level messages a form can display.
    pub fn has_field_errors(&self) -> bool {
        !self.field_errors.is_empty()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field_errors.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} ({})", self.message, self.field_errors)
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::decode(err)
        } else {
            Self::unreachable(err)
        }
    }
}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Extracts a general message, preferring `detail` over `message`.
fn server_message(json: &Value) -> Option<String> {
    let text = |v: &Value| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .next()
            .map(ToString::to_string),
        _ => None,
    };

    json.get("detail")
        .and_then(text)
        .or_else(|| json.get("message").and_then(text))
        .or_else(|| json.get("non_field_errors").and_then(text))
}

/// Maps `{"field": ["msg", ...]}` or `{"field": "msg"}` into [`FieldErrors`].
fn field_errors_from(json: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let Some(map) = json.as_object() else {
        return errors;
    };
    for (field, value) in map {
        if NON_FIELD_KEYS.contains(&field.as_str()) {
            continue;
        }
        match value {
            Value::String(message) => errors.insert(field.clone(), message.clone()),
            Value::Array(items) => {
                for message in items.iter().filter_map(Value::as_str) {
                    errors.insert(field.clone(), message);
                }
            }
            _ => {}
        }
    }
    errors
}
