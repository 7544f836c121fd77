mod common;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use mycloud_client::forms::{RegisterForm, USERNAME_TAKEN};
use mycloud_client::guard::{self, Route};
use mycloud_client::poller;
use mycloud_client::{ApiError, ClientError, FileStorage, TokenVault};
use mycloud_shared::constants::{AUTH_FAILURE_MESSAGE, GENERIC_FAILURE_MESSAGE};
use mycloud_shared::types::{Credentials, UserId};

use common::{Backend, PASSWORD, TOKEN};

fn alice(password: &str) -> Credentials {
    Credentials {
        username: "alice".into(),
        password: password.into(),
    }
}

#[tokio::test]
async fn test_login_sends_csrf_and_then_authorization() {
    let backend = Backend::new();
    let base = common::spawn(backend.clone()).await;
    let store = common::store_for(&base, TokenVault::ephemeral("s"));
    let cancel = CancellationToken::new();

    let user = store.login(&alice(PASSWORD), &cancel).await.unwrap();
    assert_eq!(user.id, UserId(2));
    assert!(store.session().is_authenticated());
    assert!(store.session().error.is_none());
    assert_eq!(store.vault().load().as_deref(), Some(TOKEN));

    let login = backend.requests_to("POST", "/api/auth/login/");
    assert_eq!(login.len(), 1);
    assert_eq!(login[0].csrf.as_deref(), Some("csrf-1"));
    assert!(login[0].authorization.is_none());

    store.list_files(None, &cancel).await.unwrap();
    let listing = backend.requests_to("GET", "/api/storage/files/");
    assert_eq!(listing[0].authorization.as_deref(), Some("Token good-token"));
    // reads never ask for an anti-forgery token
    assert!(listing[0].csrf.is_none());
    assert_eq!(backend.lock().csrf_issued, 1);
}

#[tokio::test]
async fn test_every_mutation_fetches_a_fresh_csrf_token() {
    let (backend, _, store) = common::signed_in().await;
    let cancel = CancellationToken::new();
    let a = backend.add_file("a.txt");
    let b = backend.add_file("b.txt");

    store.delete_file(a, &cancel).await.unwrap();
    store.delete_file(b, &cancel).await.unwrap();

    let deletes: Vec<_> = backend
        .seen()
        .into_iter()
        .filter(|s| s.method == "DELETE")
        .map(|s| s.csrf)
        .collect();
    assert_eq!(deletes, vec![Some("csrf-2".to_string()), Some("csrf-3".to_string())]);
}

#[tokio::test]
async fn test_rejected_login_keeps_server_message() {
    let backend = Backend::new();
    let base = common::spawn(backend).await;
    let store = common::store_for(&base, TokenVault::ephemeral("s"));

    let err = store
        .login(&alice("wrong"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Invalid credentials");
    let session = store.session();
    assert!(!session.is_authenticated());
    assert!(!session.loading);
    assert_eq!(session.error.as_deref(), Some("Invalid credentials"));
    assert!(!store.vault().has_token());
}

#[tokio::test]
async fn test_unauthorized_uses_fixed_message_and_drops_token() {
    let (backend, _, store) = common::signed_in().await;
    backend.lock().revoked = true;

    let err = store
        .fetch_current_user(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), AUTH_FAILURE_MESSAGE);
    assert!(!store.vault().has_token());
    assert_eq!(store.session().error.as_deref(), Some(AUTH_FAILURE_MESSAGE));
    // the cached user survives a failed refresh
    assert!(store.session().is_authenticated());
}

#[tokio::test]
async fn test_unknown_failure_falls_back_to_generic_message() {
    let (_, _, store) = common::signed_in().await;

    let err = store
        .list_files(Some(UserId(999)), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), GENERIC_FAILURE_MESSAGE);
    assert_eq!(store.files().error.as_deref(), Some(GENERIC_FAILURE_MESSAGE));
}

#[tokio::test]
async fn test_registration_field_errors_are_kept() {
    let backend = Backend::new();
    let base = common::spawn(backend).await;
    let store = common::store_for(&base, TokenVault::ephemeral("s"));
    let form = RegisterForm {
        username: "bob".into(),
        email: "bob2@example.com".into(),
        full_name: String::new(),
        password: PASSWORD.into(),
        confirm_password: PASSWORD.into(),
    };

    let err = store
        .register(&form.to_registration(), &CancellationToken::new())
        .await
        .unwrap_err();

    let ClientError::Api(ApiError::Server { fields, .. }) = err else {
        panic!("expected a server error");
    };
    assert_eq!(fields["username"], vec!["A user with that username already exists."]);
}

#[tokio::test]
async fn test_availability_checks() {
    let backend = Backend::new();
    let base = common::spawn(backend.clone()).await;
    let store = common::store_for(&base, TokenVault::ephemeral("s"));
    let cancel = CancellationToken::new();

    let form = RegisterForm {
        username: "alice".into(),
        email: "fresh@example.com".into(),
        ..Default::default()
    };
    let errors = form.check_availability(&store, &cancel).await;
    assert_eq!(errors["username"], vec![USERNAME_TAKEN]);
    assert!(!errors.contains_key("email"));

    let checks = backend.requests_to("GET", "/api/auth/check-username/");
    assert_eq!(checks[0].query.as_deref(), Some("username=alice"));

    // locally invalid values never reach the server
    let form = RegisterForm {
        username: "1x".into(),
        email: "nope".into(),
        ..Default::default()
    };
    assert!(form.check_availability(&store, &cancel).await.is_empty());
    assert_eq!(backend.requests_to("GET", "/api/auth/check-username/").len(), 1);
}

#[tokio::test]
async fn test_session_survives_restart() {
    let backend = Backend::new();
    let base = common::spawn(backend).await;
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();

    let vault = || TokenVault::new(std::sync::Arc::new(FileStorage::open(dir.path()).unwrap()), "s");
    let first = common::store_for(&base, vault());
    first.login(&alice(PASSWORD), &cancel).await.unwrap();

    let second = common::store_for(&base, vault());
    let user = guard::bootstrap(&second, &cancel).await.unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(guard::resolve(Route::Home, &second.session()), Route::Storage);

    // a different secret cannot open the stored credential
    let other = common::store_for(
        &base,
        TokenVault::new(std::sync::Arc::new(FileStorage::open(dir.path()).unwrap()), "other"),
    );
    assert!(guard::bootstrap(&other, &cancel).await.is_none());
    assert_eq!(guard::resolve(Route::Admin, &other.session()), Route::Login);
}

#[tokio::test]
async fn test_remote_logout() {
    let (backend, _, store) = common::signed_in().await;

    store.logout_remote(&CancellationToken::new()).await;

    let logout = backend.requests_to("POST", "/api/auth/logout/");
    assert_eq!(logout[0].authorization.as_deref(), Some("Token good-token"));
    assert!(!store.vault().has_token());
    assert!(!store.session().is_authenticated());
}

#[tokio::test]
async fn test_change_own_password() {
    let (backend, _, store) = common::signed_in().await;

    store
        .change_own_password("NewSecret2@", &CancellationToken::new())
        .await
        .unwrap();

    let patch = backend.lock().last_user_patch.clone().unwrap();
    assert_eq!(patch, serde_json::json!({ "password": "NewSecret2@" }));
    assert_eq!(backend.requests_to("PATCH", "/api/auth/users/2/").len(), 1);
}

#[tokio::test]
async fn test_quota_poller_refreshes_user() {
    let (backend, _, store) = common::signed_in().await;
    let cancel = CancellationToken::new();

    let handle = poller::spawn_poller_every(store.clone(), Duration::from_millis(50), cancel.clone());
    tokio::time::sleep(Duration::from_millis(300)).await;
    cancel.cancel();
    handle.await.unwrap();

    let polls = backend.requests_to("GET", "/api/auth/users/me/").len();
    assert!(polls >= 2, "only {polls} polls");
}

#[tokio::test]
async fn test_cancelled_request_does_not_touch_state() {
    let (_, _, store) = common::signed_in().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = store.list_users(&cancel).await.unwrap_err();

    assert!(err.is_cancelled());
    let users = store.users();
    assert!(users.users.is_empty());
    assert!(!users.loading);
    assert!(users.error.is_none());
}
