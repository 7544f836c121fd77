//! Account administration endpoints.

use tokio_util::sync::CancellationToken;

use mycloud_shared::types::{Registration, User, UserId, UserPatch};

use super::ApiClient;
use crate::error::ApiError;

impl ApiClient {
    pub async fn list_users(&self, cancel: &CancellationToken) -> Result<Vec<User>, ApiError> {
        self.get("/auth/users/", &[], cancel).await
    }

    pub async fn update_user(
        &self,
        id: UserId,
        patch: &UserPatch,
        cancel: &CancellationToken,
    ) -> Result<User, ApiError> {
        self.patch(&format!("/auth/users/{id}/"), patch, cancel).await
    }

    pub async fn delete_user(&self, id: UserId, cancel: &CancellationToken) -> Result<(), ApiError> {
        self.delete(&format!("/auth/users/{id}/"), cancel).await
    }

    /// Create an administrator account. The response body is the new account.
    pub async fn create_admin(
        &self,
        registration: &Registration,
        cancel: &CancellationToken,
    ) -> Result<User, ApiError> {
        self.post("/auth/admin/create/", registration, cancel).await
    }
}
