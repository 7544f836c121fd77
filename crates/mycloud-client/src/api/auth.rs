//! Session and account endpoints under `/auth/`.

use tokio_util::sync::CancellationToken;

use mycloud_shared::types::{AuthResponse, Availability, Credentials, Registration, User};

use super::ApiClient;
use crate::error::ApiError;

impl ApiClient {
    pub async fn login(
        &self,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<AuthResponse, ApiError> {
        self.post("/auth/login/", credentials, cancel).await
    }

    pub async fn register(
        &self,
        registration: &Registration,
        cancel: &CancellationToken,
    ) -> Result<AuthResponse, ApiError> {
        self.post("/auth/register/", registration, cancel).await
    }

    /// Revoke the session token server-side.
    pub async fn logout(&self, cancel: &CancellationToken) -> Result<(), ApiError> {
        self.post_no_content("/auth/logout/", &serde_json::json!({}), cancel)
            .await
    }

    pub async fn current_user(&self, cancel: &CancellationToken) -> Result<User, ApiError> {
        self.get("/auth/users/me/", &[], cancel).await
    }

    pub async fn username_available(
        &self,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, ApiError> {
        let availability: Availability = self
            .get(
                "/auth/check-username/",
                &[("username", username.to_string())],
                cancel,
            )
            .await?;
        Ok(availability.available)
    }

    pub async fn email_available(
        &self,
        email: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, ApiError> {
        let availability: Availability = self
            .get("/auth/check-email/", &[("email", email.to_string())], cancel)
            .await?;
        Ok(availability.available)
    }
}
