//! Route guarding and session bootstrap.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use mycloud_shared::types::User;

use crate::state::SessionState;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Storage,
    Admin,
}

/// Where a session lands by default.
pub fn landing(session: &SessionState) -> Route {
    if session.is_admin() {
        Route::Admin
    } else if session.is_authenticated() {
        Route::Storage
    } else {
        Route::Login
    }
}

/// The route actually shown when `requested` is asked for.
pub fn resolve(requested: Route, session: &SessionState) -> Route {
    let resolved = match requested {
        Route::Home => landing(session),
        Route::Login | Route::Register if session.is_authenticated() => landing(session),
        Route::Login | Route::Register => requested,
        Route::Storage if session.is_authenticated() => Route::Storage,
        Route::Admin if session.is_admin() => Route::Admin,
        Route::Admin if session.is_authenticated() => Route::Storage,
        Route::Storage | Route::Admin => Route::Login,
    };
    if resolved != requested {
        debug!(?requested, ?resolved, "Route redirected");
    }
    resolved
}

/// Restore the session from a persisted credential, if there is one.
///
/// A credential the server no longer accepts is dropped.
pub async fn bootstrap(store: &Store, cancel: &CancellationToken) -> Option<User> {
    if !store.vault().has_token() {
        return None;
    }
    match store.fetch_current_user(cancel).await {
        Ok(user) => {
            info!(username = %user.username, "Session restored");
            Some(user)
        }
        Err(e) => {
            debug!(error = %e, "Stored session rejected");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::state::SessionAction;
    use crate::vault::TokenVault;
    use mycloud_shared::types::UserId;

    fn session(user: Option<User>) -> SessionState {
        let mut state = SessionState::default();
        state.reduce(SessionAction::SetUser(user));
        state
    }

    fn regular() -> User {
        User {
            id: UserId(2),
            username: "alice".into(),
            ..Default::default()
        }
    }

    fn superuser() -> User {
        User {
            id: UserId(1),
            username: "root".into(),
            is_superuser: true,
            is_staff: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_anonymous_routes() {
        let s = session(None);
        assert_eq!(resolve(Route::Home, &s), Route::Login);
        assert_eq!(resolve(Route::Register, &s), Route::Register);
        assert_eq!(resolve(Route::Storage, &s), Route::Login);
        assert_eq!(resolve(Route::Admin, &s), Route::Login);
    }

    #[test]
    fn test_regular_user_routes() {
        let s = session(Some(regular()));
        assert_eq!(landing(&s), Route::Storage);
        assert_eq!(resolve(Route::Login, &s), Route::Storage);
        assert_eq!(resolve(Route::Storage, &s), Route::Storage);
        assert_eq!(resolve(Route::Admin, &s), Route::Storage);
    }

    #[test]
    fn test_superuser_routes() {
        let s = session(Some(superuser()));
        assert_eq!(landing(&s), Route::Admin);
        assert_eq!(resolve(Route::Home, &s), Route::Admin);
        assert_eq!(resolve(Route::Admin, &s), Route::Admin);
        assert_eq!(resolve(Route::Storage, &s), Route::Storage);
    }

    #[tokio::test]
    async fn test_bootstrap_without_token() {
        let store = Store::from_config(&ClientConfig::default(), TokenVault::ephemeral("s")).unwrap();
        assert!(bootstrap(&store, &CancellationToken::new()).await.is_none());
        assert!(!store.session().loading);
    }
}
