//! Domain records exchanged with the blog backend.
//!
//! Posts arrive in several shapes depending on the backend serializer in use.
//! [`Post`] deserializes through [`PostRecord`] so author identity is resolved
//! once, at ingestion, into a single [`Author::display_name`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display name used when a post carries no usable author information.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Authenticated account as returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub bio: String,
}

impl User {
    /// Full name when present, otherwise the username.
    pub fn display_name(&self) -> String {
        let full = join_name(&self.first_name, &self.last_name);
        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }
}

/// Access/refresh credential pair minted by login, register or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Body returned by `auth/login/` and `auth/register/`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access: String,
    pub refresh: String,
    pub user: User,
}

impl AuthResponse {
    pub fn tokens(&self) -> TokenPair {
        TokenPair {
            access: self.access.clone(),
            refresh: self.refresh.clone(),
        }
    }
}

/// Body returned by `auth/token/refresh/`. Backends that rotate refresh
/// tokens include a new `refresh` value.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// Login form.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Registration form.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bio: String,
}

/// Partial profile update sent to `PATCH auth/profile/`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.bio.is_none()
    }
}

/// Title and content for a new post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
}

/// Fields to change on an existing post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl PostPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

/// Canonical author snapshot embedded in every [`Post`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub id: Option<i64>,
    pub display_name: String,
}

impl Author {
    pub fn anonymous(id: Option<i64>) -> Self {
        Self {
            id,
            display_name: ANONYMOUS_AUTHOR.to_string(),
        }
    }

    pub fn from_user(user: &User) -> Self {
        Self {
            id: Some(user.id),
            display_name: user.display_name(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.display_name == ANONYMOUS_AUTHOR
    }
}

/// A blog post with its author already normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PostRecord")]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author: Author,
    pub created_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Fills in the author from a locally known user when the server
    /// response did not identify one.
    #[must_use]
    pub fn attributed_to(mut self, user: &User) -> Self {
        let same_account = self.author.id.is_none_or(|id| id == user.id);
        if self.author.is_anonymous() && same_account {
            self.author = Author::from_user(user);
        }
        self
    }
}

/// Wire shape of a post. Every author-related field is optional because the
/// backend has shipped several serializers over time.
#[derive(Debug, Deserialize)]
struct PostRecord {
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    author: Option<AuthorField>,
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    author_details: Option<AuthorDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AuthorField {
    Id(i64),
    Name(String),
    Details(AuthorDetails),
}

#[derive(Debug, Default, Deserialize)]
struct AuthorDetails {
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

impl AuthorDetails {
    fn name(&self) -> Option<String> {
        if let Some(name) = non_blank(self.display_name.as_deref()) {
            return Some(name);
        }
        if let Some(name) = non_blank(self.full_name.as_deref()) {
            return Some(name);
        }
        let joined = join_name(
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default(),
        );
        if !joined.is_empty() {
            return Some(joined);
        }
        non_blank(self.username.as_deref())
    }
}

impl From<PostRecord> for Post {
    fn from(record: PostRecord) -> Self {
        let (embedded_id, embedded_name) = match &record.author {
            Some(AuthorField::Id(id)) => (Some(*id), None),
            Some(AuthorField::Name(name)) => (None, non_blank(Some(name.as_str()))),
            Some(AuthorField::Details(details)) => (details.id, details.name()),
            None => (None, None),
        };
        let details_id = record.author_details.as_ref().and_then(|d| d.id);

        let display_name = non_blank(record.author_name.as_deref())
            .or_else(|| {
                record
                    .author_details
                    .as_ref()
                    .and_then(|d| non_blank(d.full_name.as_deref()))
            })
            .or(embedded_name)
            .or_else(|| record.author_details.as_ref().and_then(AuthorDetails::name));

        let id = embedded_id.or(details_id);
        let author = match display_name {
            Some(display_name) => Author { id, display_name },
            None => Author::anonymous(id),
        };

        Post {
            id: record.id,
            title: record.title,
            content: record.content,
            author,
            created_at: record.created_at,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn join_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 || !token.is_char_boundary(12) {
        return "***".to_string();
    }
    format!("{}...", &token[..12])
}
