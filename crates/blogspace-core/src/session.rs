//! Client session state and the manager that drives it.
//!
//! [`Session`] is a plain value changed only through [`Session::apply`].
//! [`SessionManager`] owns one session for the life of the client and is
//! the only writer of the persisted session record, apart from the
//! gateway's token refresh and forced logout.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

use crate::api::error::SESSION_EXPIRED_MESSAGE;
use crate::api::{ApiError, ApiErrorKind, ApiGateway, ApiResult, GatewayEvent};
use crate::models::{AuthResponse, Credentials, ProfileUpdate, Registration, User};
use crate::validation::{validate_credentials, validate_registration};

const LOGIN_FAILED: &str = "Login failed. Please try again.";
const REGISTER_FAILED: &str = "Registration failed. Please try again.";
const PROFILE_FAILED: &str = "Failed to update profile";

/// Where the client stands on the authenticated/anonymous axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Startup, or a login/registration in flight.
    Loading,
    Anonymous,
    Authenticated(User),
}

/// Transitions accepted by [`Session::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// An auth operation started: enter `Loading` and drop any prior error.
    Begin,
    /// Credentials accepted, or a stored session restored.
    SignedIn(User),
    /// Back to anonymous with no error.
    SignedOut,
    /// An operation failed: return to `state` and record `message`.
    Failed { message: String, state: AuthState },
    /// Swap the signed-in user for a fresh copy. Ignored when anonymous.
    UserReplaced(User),
    ClearError,
}

/// Authentication state plus an orthogonal error annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    state: AuthState,
    error: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: AuthState::Loading,
            error: None,
        }
    }
}

impl Session {
    /// Pure reducer: returns the session after `action`.
    #[must_use]
    pub fn apply(self, action: SessionAction) -> Self {
        match action {
            SessionAction::Begin => Self {
                state: AuthState::Loading,
                error: None,
            },
            SessionAction::SignedIn(user) => Self {
                state: AuthState::Authenticated(user),
                error: None,
            },
            SessionAction::SignedOut => Self {
                state: AuthState::Anonymous,
                error: None,
            },
            SessionAction::Failed { message, state } => Self {
                state,
                error: Some(message),
            },
            SessionAction::UserReplaced(user) => match self.state {
                AuthState::Authenticated(_) => Self {
                    state: AuthState::Authenticated(user),
                    ..self
                },
                _ => self,
            },
            SessionAction::ClearError => Self {
                error: None,
                ..self
            },
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, AuthState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Picks the message recorded on the session for a failed operation:
/// the server's own wording, then a reachability hint, then `fallback`.
fn failure_message(err: &ApiError, fallback: &str) -> String {
    if let Some(detail) = &err.detail {
        return detail.clone();
    }
    match err.kind {
        ApiErrorKind::Validation
        | ApiErrorKind::NetworkUnreachable
        | ApiErrorKind::ServerFault
        | ApiErrorKind::AuthorizationExpired => err.user_message(),
        _ => fallback.to_string(),
    }
}

/// Owns the client's single [`Session`] and performs auth operations
/// through the [`ApiGateway`].
#[derive(Debug)]
pub struct SessionManager {
    session: Session,
    gateway: Arc<ApiGateway>,
    events: broadcast::Receiver<GatewayEvent>,
}

impl SessionManager {
    /// Creates a manager in the `Loading` state. Call
    /// [`initialize`](Self::initialize) before rendering protected views.
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        let events = gateway.subscribe();
        Self {
            session: Session::default(),
            gateway,
            events,
        }
    }

    /// The current session, with pending gateway events applied first so a
    /// forced logout is never reported as signed in.
    pub fn session(&mut self) -> &Session {
        self.poll_events();
        &self.session
    }

    pub fn gateway(&self) -> &Arc<ApiGateway> {
        &self.gateway
    }

    fn dispatch(&mut self, action: SessionAction) {
        debug!(?action, "session transition");
        self.session = std::mem::take(&mut self.session).apply(action);
    }

    /// Restores a persisted session without touching the network.
    ///
    /// Authenticated only when a non-empty access token and a parseable user
    /// record are both stored; otherwise every stored entry is cleared.
    pub fn initialize(&mut self) -> &Session {
        let store = Arc::clone(self.gateway.store());
        let restored = match store.load() {
            Ok(stored) => match (stored.access_token(), stored.parse_user()) {
                (Some(_), Ok(Some(user))) => Some(user),
                (_, Err(err)) => {
                    warn!(error = %format!("{err:#}"), "discarding stored session");
                    None
                }
                _ => None,
            },
            Err(err) => {
                warn!(error = %format!("{err:#}"), "unreadable session record");
                None
            }
        };

        match restored {
            Some(user) => {
                info!(username = %user.username, "restored stored session");
                self.dispatch(SessionAction::SignedIn(user));
            }
            None => {
                if let Err(err) = store.clear() {
                    error!(error = %format!("{err:#}"), "failed to clear stored session");
                }
                self.dispatch(SessionAction::SignedOut);
            }
        }
        &self.session
    }

    /// Logs in, persists the returned tokens and user, and returns the user.
    ///
    /// # Errors
    /// Returns the validation or API failure; the session records a readable
    /// message and keeps its previous state.
    pub async fn login(&mut self, credentials: &Credentials) -> ApiResult<User> {
        let previous = self.session.state.clone();
        self.dispatch(SessionAction::Begin);

        let result = match validate_credentials(credentials) {
            Some(errors) => Err(ApiError::validation(errors)),
            None => self.gateway.login(credentials).await,
        };
        self.complete_sign_in(result, previous, LOGIN_FAILED)
    }

    /// Registers a new account. Same contract as [`login`](Self::login).
    ///
    /// # Errors
    /// Returns the validation or API failure; field rejections are available
    /// on [`ApiError::field_errors`].
    pub async fn register(&mut self, registration: &Registration) -> ApiResult<User> {
        let previous = self.session.state.clone();
        self.dispatch(SessionAction::Begin);

        let result = match validate_registration(registration) {
            Some(errors) => Err(ApiError::validation(errors)),
            None => self.gateway.register(registration).await,
        };
        self.complete_sign_in(result, previous, REGISTER_FAILED)
    }

    fn complete_sign_in(
        &mut self,
        result: ApiResult<AuthResponse>,
        previous: AuthState,
        fallback: &str,
    ) -> ApiResult<User> {
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                warn!(kind = %err.kind, "sign-in failed");
                self.fail(&err, previous, fallback);
                return Err(err);
            }
        };

        if let Err(err) = self
            .gateway
            .store()
            .save_session(&response.tokens(), &response.user)
        {
            let err = ApiError::storage(&err);
            self.fail(&err, previous, fallback);
            return Err(err);
        }

        info!(username = %response.user.username, "signed in");
        self.dispatch(SessionAction::SignedIn(response.user.clone()));
        Ok(response.user)
    }

    fn fail(&mut self, err: &ApiError, state: AuthState, fallback: &str) {
        self.dispatch(SessionAction::Failed {
            message: failure_message(err, fallback),
            state,
        });
    }

    /// Best-effort remote logout, then unconditional local reset.
    pub async fn logout(&mut self) {
        let store = Arc::clone(self.gateway.store());
        if let Some(refresh) = store.refresh_token()
            && let Err(err) = self.gateway.logout(&refresh).await
        {
            warn!(error = %err, "remote logout failed");
        }

        if let Err(err) = store.clear() {
            error!(error = %format!("{err:#}"), "failed to clear stored session");
        }
        self.drain_events();
        self.dispatch(SessionAction::SignedOut);
        info!("signed out");
    }

    /// Drops the error annotation. Authentication state is untouched.
    pub fn clear_error(&mut self) {
        self.dispatch(SessionAction::ClearError);
    }

    /// Reloads the profile from the server and replaces the session user.
    ///
    /// # Errors
    /// Returns the API failure; an expired session resets to anonymous.
    pub async fn fetch_profile(&mut self) -> ApiResult<User> {
        let result = self.gateway.profile().await;
        self.store_profile(result, "Failed to load profile")
    }

    /// Sends a profile update and replaces the session user wholesale with
    /// the server's answer.
    ///
    /// # Errors
    /// Returns the API failure; an expired session resets to anonymous.
    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> ApiResult<User> {
        let result = self.gateway.update_profile(update).await;
        self.store_profile(result, PROFILE_FAILED)
    }

    fn store_profile(&mut self, result: ApiResult<User>, fallback: &str) -> ApiResult<User> {
        self.poll_events();
        let user = match result {
            Ok(user) => user,
            Err(err) => {
                if err.kind != ApiErrorKind::AuthorizationExpired {
                    let state = self.session.state.clone();
                    self.fail(&err, state, fallback);
                }
                return Err(err);
            }
        };

        self.gateway
            .store()
            .save_user(&user)
            .map_err(|e| ApiError::storage(&e))?;
        self.dispatch(SessionAction::UserReplaced(user.clone()));
        Ok(user)
    }

    /// Applies one gateway event to the session.
    pub fn handle_event(&mut self, event: GatewayEvent) {
        match event {
            GatewayEvent::TokenRefreshed => debug!("access token refreshed"),
            GatewayEvent::SessionExpired if !self.session.is_authenticated() => {
                debug!("session expiry ignored; no user signed in");
            }
            GatewayEvent::SessionExpired => {
                info!("session expired; returning to anonymous");
                self.dispatch(SessionAction::Failed {
                    message: SESSION_EXPIRED_MESSAGE.to_string(),
                    state: AuthState::Anonymous,
                });
            }
        }
    }

    /// Applies every gateway event received since the last poll.
    pub fn poll_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.handle_event(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "missed gateway events");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }

    fn drain_events(&mut self) {
        while !matches!(
            self.events.try_recv(),
            Err(TryRecvError::Empty | TryRecvError::Closed)
        ) {}
    }
}
