//! Authentication and profile endpoints.

use serde_json::json;

use super::{ApiGateway, ApiRequest, ApiResult};
use crate::models::{AuthResponse, Credentials, ProfileUpdate, Registration, User};

const LOGIN_PATH: &str = "auth/login/";
const REGISTER_PATH: &str = "auth/register/";
const LOGOUT_PATH: &str = "auth/logout/";
const PROFILE_PATH: &str = "auth/profile/";

impl ApiGateway {
    /// `POST auth/login/`. Never carries a bearer credential.
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<AuthResponse> {
        let request = ApiRequest::post(LOGIN_PATH).json(credentials)?.anonymous();
        self.fetch_json(&request).await
    }

    /// `POST auth/register/`. Never carries a bearer credential.
    pub async fn register(&self, registration: &Registration) -> ApiResult<AuthResponse> {
        let request = ApiRequest::post(REGISTER_PATH)
            .json(registration)?
            .anonymous();
        self.fetch_json(&request).await
    }

    /// `POST auth/logout/`, asking the backend to revoke the refresh token.
    pub async fn logout(&self, refresh_token: &str) -> ApiResult<()> {
        let request = ApiRequest::post(LOGOUT_PATH).json(&json!({ "refresh": refresh_token }))?;
        self.fetch_empty(&request).await
    }

    /// `GET auth/profile/`.
    pub async fn profile(&self) -> ApiResult<User> {
        self.fetch_json(&ApiRequest::get(PROFILE_PATH)).await
    }

    /// `PATCH auth/profile/`. Returns the full updated user.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<User> {
        let request = ApiRequest::patch(PROFILE_PATH).json(update)?;
        self.fetch_json(&request).await
    }
}
