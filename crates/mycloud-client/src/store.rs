//! Effect layer: runs API calls and feeds their outcomes into the state tree.
//!
//! Every operation follows the same script. Take a fresh sequence number,
//! dispatch `Pending`, await the request, then dispatch `Fulfilled` or
//! `Rejected`. If the caller's cancellation token fired in the meantime the
//! result is discarded and `Cancelled` is dispatched instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use mycloud_shared::constants::{MAX_SHARE_EXPIRY_DAYS, MIN_SHARE_EXPIRY_DAYS};
use mycloud_shared::types::{
    Credentials, FileId, FilePatch, Registration, ShareLink, ShareRequest, StoredFile, User,
    UserId, UserPatch,
};

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::state::{
    AppState, FilesAction, FilesState, SessionAction, SessionState, Tracked, UsersAction,
    UsersState,
};
use crate::vault::TokenVault;

/// Shared handle to the client: cheap to clone, all clones see one state tree.
#[derive(Clone)]
pub struct Store {
    api: ApiClient,
    state: Arc<Mutex<AppState>>,
    seq: Arc<AtomicU64>,
}

impl Store {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(AppState::default())),
            seq: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Build the API client and vault from configuration.
    pub fn from_config(config: &ClientConfig, vault: TokenVault) -> Result<Self> {
        Ok(Self::new(ApiClient::new(config, vault)?))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn vault(&self) -> &TokenVault {
        self.api.vault()
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        // a panicking reducer leaves whole values behind, so the state is still usable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the whole state tree.
    pub fn snapshot(&self) -> AppState {
        self.lock().clone()
    }

    pub fn session(&self) -> SessionState {
        self.lock().session.clone()
    }

    pub fn files(&self) -> FilesState {
        self.lock().files.clone()
    }

    pub fn users(&self) -> UsersState {
        self.lock().users.clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.lock().session.user.clone()
    }

    /// Apply one reducer step. Steps never interleave.
    pub fn dispatch(&self, step: impl FnOnce(&mut AppState)) {
        let mut state = self.lock();
        step(&mut state);
    }

    pub(crate) fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Turn a finished call into the settled action for `seq`.
    pub(crate) fn outcome<T: Clone>(
        seq: u64,
        result: &Result<T>,
        cancel: &CancellationToken,
    ) -> Tracked<T> {
        match result {
            _ if cancel.is_cancelled() => Tracked::cancelled(seq),
            Ok(value) => Tracked::fulfilled(seq, value.clone()),
            Err(e) if e.is_cancelled() => Tracked::cancelled(seq),
            Err(e) => Tracked::rejected(seq, e.to_string()),
        }
    }

    // -- session --------------------------------------------------------

    pub async fn login(&self, credentials: &Credentials, cancel: &CancellationToken) -> Result<User> {
        let seq = self.next_seq();
        self.dispatch(|s| s.session.reduce(SessionAction::Login(Tracked::pending(seq))));

        let result = self.authenticate(self.api.login(credentials, cancel).await, cancel);
        let tracked = Self::outcome(seq, &result, cancel);
        self.dispatch(|s| s.session.reduce(SessionAction::Login(tracked)));

        if result.is_ok() {
            info!(username = %credentials.username, "Signed in");
        }
        result
    }

    pub async fn register(&self, registration: &Registration, cancel: &CancellationToken) -> Result<User> {
        let seq = self.next_seq();
        self.dispatch(|s| s.session.reduce(SessionAction::Register(Tracked::pending(seq))));

        let result = self.authenticate(self.api.register(registration, cancel).await, cancel);
        let tracked = Self::outcome(seq, &result, cancel);
        self.dispatch(|s| s.session.reduce(SessionAction::Register(tracked)));

        if result.is_ok() {
            info!(username = %registration.username, "Account registered");
        }
        result
    }

    /// Persist the token of a successful login or registration.
    fn authenticate(
        &self,
        response: std::result::Result<mycloud_shared::types::AuthResponse, crate::error::ApiError>,
        cancel: &CancellationToken,
    ) -> Result<User> {
        let auth = response?;
        if cancel.is_cancelled() {
            return Err(crate::error::ApiError::Cancelled.into());
        }
        self.vault().store(&auth.token)?;
        Ok(auth.user)
    }

    /// Refresh the signed-in account. Any failure other than cancellation
    /// drops the stored credential; the in-memory user is left as it was.
    pub async fn fetch_current_user(&self, cancel: &CancellationToken) -> Result<User> {
        let seq = self.next_seq();
        self.dispatch(|s| {
            s.session
                .reduce(SessionAction::FetchCurrentUser(Tracked::pending(seq)))
        });

        let result = self.api.current_user(cancel).await.map_err(ClientError::from);
        let tracked = Self::outcome(seq, &result, cancel);
        if let Err(e) = &result {
            if !e.is_cancelled() && !cancel.is_cancelled() {
                self.vault().clear();
            }
        }
        self.dispatch(|s| s.session.reduce(SessionAction::FetchCurrentUser(tracked)));
        result
    }

    /// Local sign-out: forget the credential and every cached list.
    pub fn logout(&self) {
        self.vault().clear();
        self.dispatch(|s| {
            s.session.reduce(SessionAction::Logout);
            s.files.reduce(FilesAction::Reset);
            s.users.reduce(UsersAction::Reset);
        });
        info!("Signed out");
    }

    /// Ask the server to revoke the token, then sign out locally whatever
    /// the server said.
    pub async fn logout_remote(&self, cancel: &CancellationToken) {
        if self.vault().has_token() {
            if let Err(e) = self.api.logout(cancel).await {
                warn!(error = %e, "Server-side logout failed");
            }
        }
        self.logout();
    }

    pub fn clear_session_error(&self) {
        self.dispatch(|s| s.session.reduce(SessionAction::ClearError));
    }

    pub async fn change_own_password(&self, password: &str, cancel: &CancellationToken) -> Result<User> {
        let id = self.current_user().ok_or(ClientError::NotSignedIn)?.id;
        let patch = UserPatch {
            password: Some(password.to_string()),
            ..Default::default()
        };
        let user = self.api.update_user(id, &patch, cancel).await?;
        self.dispatch(|s| s.session.reduce(SessionAction::SetUser(Some(user.clone()))));
        info!(user_id = %id, "Password changed");
        Ok(user)
    }

    pub async fn check_username(&self, username: &str, cancel: &CancellationToken) -> Result<bool> {
        Ok(self.api.username_available(username, cancel).await?)
    }

    pub async fn check_email(&self, email: &str, cancel: &CancellationToken) -> Result<bool> {
        Ok(self.api.email_available(email, cancel).await?)
    }

    // -- files ----------------------------------------------------------

    /// Load the file list, optionally for another account (admin only).
    pub async fn list_files(
        &self,
        owner: Option<UserId>,
        cancel: &CancellationToken,
    ) -> Result<Vec<StoredFile>> {
        let seq = self.next_seq();
        self.dispatch(|s| s.files.reduce(FilesAction::List(Tracked::pending(seq))));

        let result = self.api.list_files(owner, cancel).await.map_err(ClientError::from);
        let tracked = Self::outcome(seq, &result, cancel);
        self.dispatch(|s| s.files.reduce(FilesAction::List(tracked)));
        result
    }

    pub async fn update_comment(
        &self,
        id: FileId,
        comment: &str,
        cancel: &CancellationToken,
    ) -> Result<StoredFile> {
        let seq = self.next_seq();
        self.dispatch(|s| s.files.reduce(FilesAction::Update(Tracked::pending(seq))));

        let patch = FilePatch {
            comment: Some(comment.to_string()),
            ..Default::default()
        };
        let result = self.api.update_file(id, &patch, cancel).await.map_err(ClientError::from);
        let tracked = Self::outcome(seq, &result, cancel);
        self.dispatch(|s| s.files.reduce(FilesAction::Update(tracked)));
        result
    }

    pub async fn delete_file(&self, id: FileId, cancel: &CancellationToken) -> Result<()> {
        let seq = self.next_seq();
        self.dispatch(|s| s.files.reduce(FilesAction::Delete(Tracked::pending(seq))));

        let result = self
            .api
            .delete_file(id, cancel)
            .await
            .map(|()| id)
            .map_err(ClientError::from);
        let tracked = Self::outcome(seq, &result, cancel);
        self.dispatch(|s| s.files.reduce(FilesAction::Delete(tracked)));

        if result.is_ok() {
            info!(file_id = %id, "File deleted");
        }
        result.map(|_| ())
    }

    /// Generate a fresh public link; the server computes the expiry.
    pub async fn share_file(
        &self,
        id: FileId,
        expiry_days: Option<u32>,
        cancel: &CancellationToken,
    ) -> Result<ShareLink> {
        if let Some(days) = expiry_days {
            if !(MIN_SHARE_EXPIRY_DAYS..=MAX_SHARE_EXPIRY_DAYS).contains(&days) {
                return Err(ClientError::ShareExpiry(days));
            }
        }

        let seq = self.next_seq();
        self.dispatch(|s| s.files.reduce(FilesAction::Share(Tracked::pending(seq))));

        let request = ShareRequest { expiry_days };
        let result = self
            .api
            .share_file(id, &request, cancel)
            .await
            .map(|link| (id, link))
            .map_err(ClientError::from);
        let tracked = Self::outcome(seq, &result, cancel);
        self.dispatch(|s| s.files.reduce(FilesAction::Share(tracked)));
        result.map(|(_, link)| link)
    }

    pub async fn unshare_file(&self, id: FileId, cancel: &CancellationToken) -> Result<()> {
        let seq = self.next_seq();
        self.dispatch(|s| s.files.reduce(FilesAction::Unshare(Tracked::pending(seq))));

        let result = self
            .api
            .unshare_file(id, cancel)
            .await
            .map(|()| id)
            .map_err(ClientError::from);
        let tracked = Self::outcome(seq, &result, cancel);
        self.dispatch(|s| s.files.reduce(FilesAction::Unshare(tracked)));
        result.map(|_| ())
    }

    pub async fn download_file(&self, id: FileId, cancel: &CancellationToken) -> Result<Bytes> {
        Ok(self.api.download_file(id, cancel).await?)
    }

    // -- users ----------------------------------------------------------

    pub async fn list_users(&self, cancel: &CancellationToken) -> Result<Vec<User>> {
        let seq = self.next_seq();
        self.dispatch(|s| s.users.reduce(UsersAction::List(Tracked::pending(seq))));

        let result = self.api.list_users(cancel).await.map_err(ClientError::from);
        let tracked = Self::outcome(seq, &result, cancel);
        self.dispatch(|s| s.users.reduce(UsersAction::List(tracked)));
        result
    }

    pub async fn update_user(
        &self,
        id: UserId,
        patch: &UserPatch,
        cancel: &CancellationToken,
    ) -> Result<User> {
        let seq = self.next_seq();
        self.dispatch(|s| s.users.reduce(UsersAction::Update(Tracked::pending(seq))));

        let result = self.api.update_user(id, patch, cancel).await.map_err(ClientError::from);
        let tracked = Self::outcome(seq, &result, cancel);
        self.dispatch(|s| s.users.reduce(UsersAction::Update(tracked)));
        result
    }

    pub async fn set_active(&self, id: UserId, active: bool, cancel: &CancellationToken) -> Result<User> {
        let patch = UserPatch {
            is_active: Some(active),
            ..Default::default()
        };
        let user = self.update_user(id, &patch, cancel).await?;
        info!(user_id = %id, active, "Account activation changed");
        Ok(user)
    }

    /// Set the quota in bytes.
    pub async fn set_quota(&self, id: UserId, max_storage: u64, cancel: &CancellationToken) -> Result<User> {
        let patch = UserPatch {
            max_storage: Some(max_storage),
            ..Default::default()
        };
        let user = self.update_user(id, &patch, cancel).await?;
        info!(user_id = %id, max_storage, "Quota changed");
        Ok(user)
    }

    pub async fn reset_password(&self, id: UserId, password: &str, cancel: &CancellationToken) -> Result<User> {
        let patch = UserPatch {
            password: Some(password.to_string()),
            ..Default::default()
        };
        let user = self.update_user(id, &patch, cancel).await?;
        info!(user_id = %id, "Password reset by administrator");
        Ok(user)
    }

    pub async fn delete_user(&self, id: UserId, cancel: &CancellationToken) -> Result<()> {
        let seq = self.next_seq();
        self.dispatch(|s| s.users.reduce(UsersAction::Delete(Tracked::pending(seq))));

        let result = self
            .api
            .delete_user(id, cancel)
            .await
            .map(|()| id)
            .map_err(ClientError::from);
        let tracked = Self::outcome(seq, &result, cancel);
        self.dispatch(|s| s.users.reduce(UsersAction::Delete(tracked)));

        if result.is_ok() {
            info!(user_id = %id, "Account deleted");
        }
        result.map(|_| ())
    }

    pub async fn create_admin(&self, registration: &Registration, cancel: &CancellationToken) -> Result<User> {
        let seq = self.next_seq();
        self.dispatch(|s| s.users.reduce(UsersAction::CreateAdmin(Tracked::pending(seq))));

        let result = self.api.create_admin(registration, cancel).await.map_err(ClientError::from);
        let tracked = Self::outcome(seq, &result, cancel);
        self.dispatch(|s| s.users.reduce(UsersAction::CreateAdmin(tracked)));

        if result.is_ok() {
            info!(username = %registration.username, "Administrator created");
        }
        result
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("api", &self.api)
            .field("next_seq", &self.seq.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    fn offline_store() -> Store {
        let config = ClientConfig::default().with_api_base_url("http://127.0.0.1:9");
        Store::from_config(&config, TokenVault::ephemeral("test-secret")).unwrap()
    }

    #[test]
    fn test_outcome_mapping() {
        let cancel = CancellationToken::new();
        let ok: Result<u32> = Ok(5);
        assert_eq!(Store::outcome(1, &ok, &cancel), Tracked::fulfilled(1, 5));

        let failed: Result<u32> = Err(ClientError::Api(ApiError::Server {
            message: "Failed to load data".into(),
            fields: Default::default(),
        }));
        assert_eq!(
            Store::outcome(2, &failed, &cancel),
            Tracked::rejected(2, "Failed to load data")
        );

        let aborted: Result<u32> = Err(ClientError::Api(ApiError::Cancelled));
        assert_eq!(Store::outcome(3, &aborted, &cancel), Tracked::cancelled(3));
    }

    #[test]
    fn test_fired_token_discards_success() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ok: Result<u32> = Ok(5);
        assert_eq!(Store::outcome(4, &ok, &cancel), Tracked::cancelled(4));
    }

    #[test]
    fn test_sequence_is_monotonic_across_clones() {
        let store = offline_store();
        let clone = store.clone();
        let a = store.next_seq();
        let b = clone.next_seq();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_cancelled_login_applies_nothing() {
        let store = offline_store();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let credentials = Credentials {
            username: "alice".into(),
            password: "Secret1!".into(),
        };
        let err = store.login(&credentials, &cancel).await.unwrap_err();

        assert!(err.is_cancelled());
        let session = store.session();
        assert!(!session.is_authenticated());
        assert!(!session.loading);
        assert!(session.error.is_none());
        assert!(!store.vault().has_token());
    }

    #[test]
    fn test_logout_clears_vault_and_state() {
        let store = offline_store();
        store.vault().store("abc").unwrap();
        store.dispatch(|s| {
            s.session.reduce(SessionAction::SetUser(Some(User::default())));
        });

        store.logout();

        assert!(!store.vault().has_token());
        assert!(!store.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_share_expiry_checked_before_request() {
        let store = offline_store();
        let cancel = CancellationToken::new();
        let err = store.share_file(FileId(1), Some(0), &cancel).await.unwrap_err();
        assert!(matches!(err, ClientError::ShareExpiry(0)));
    }

    #[tokio::test]
    async fn test_change_password_requires_session() {
        let store = offline_store();
        let err = store
            .change_own_password("Secret1!", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotSignedIn));
    }
}
