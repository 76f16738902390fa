//! Core library for the BlogSpace client: configuration, session state,
//! the authenticated API gateway, and post handling.

pub mod api;
pub mod config;
pub mod feed;
pub mod logging;
pub mod models;
pub mod session;
pub mod store;
pub mod validation;

pub use api::{ApiError, ApiErrorKind, ApiGateway, ApiResult, GatewayEvent};
pub use config::Config;
pub use feed::{FetchTicket, PostFeed};
pub use session::{AuthState, Session, SessionAction, SessionManager};
pub use store::SessionStore;
pub use validation::{FieldErrors, validate_blog};
