//! In-process fake of the storage backend, just enough of the REST
//! contract to drive the client end to end.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use mycloud_client::{ClientConfig, Store, TokenVault};
use mycloud_shared::types::{FileId, StoredFile, User, UserId};

pub const TOKEN: &str = "good-token";
pub const PASSWORD: &str = "Secret1!";
pub const SHARE_TOKEN: &str = "abc123";

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub csrf: Option<String>,
}

#[derive(Debug, Default)]
pub struct Inner {
    pub users: Vec<User>,
    pub files: Vec<StoredFile>,
    pub next_file_id: u64,
    pub csrf_issued: u64,
    pub seen: Vec<Seen>,
    /// When set every authenticated endpoint answers 401.
    pub revoked: bool,
    pub last_user_patch: Option<Value>,
}

#[derive(Clone, Default)]
pub struct Backend {
    inner: Arc<Mutex<Inner>>,
}

impl Backend {
    pub fn new() -> Self {
        let user = |id: u64, username: &str, admin: bool| User {
            id: UserId(id),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            is_superuser: admin,
            is_staff: admin,
            max_storage: 1024 * 1024 * 1024,
            ..Default::default()
        };

        let backend = Self::default();
        {
            let mut inner = backend.lock();
            inner.users = vec![user(1, "root", true), user(2, "alice", false), user(3, "bob", false)];
            inner.next_file_id = 1;
        }
        backend
    }

    pub fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.lock().seen.clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Seen> {
        self.seen()
            .into_iter()
            .filter(|s| s.method == method && s.path == path)
            .collect()
    }

    pub fn add_file(&self, name: &str) -> FileId {
        let mut inner = self.lock();
        let id = FileId(inner.next_file_id);
        inner.next_file_id += 1;
        inner.files.push(stored(id, name, 3, ""));
        id
    }
}

fn stored(id: FileId, name: &str, size: u64, comment: &str) -> StoredFile {
    StoredFile {
        id,
        original_name: name.to_string(),
        size,
        comment: comment.to_string(),
        shared_link: None,
        shared_expiry: None,
        is_shared_expired: false,
        upload_date: None,
        last_download: None,
        user: Some("alice".to_string()),
    }
}

fn failure(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn authorized(backend: &Backend, headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Token {TOKEN}");
    let ok = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if ok && !backend.lock().revoked {
        Ok(())
    } else {
        Err(failure(
            StatusCode::UNAUTHORIZED,
            json!({ "detail": "Invalid token." }),
        ))
    }
}

async fn record(State(backend): State<Backend>, request: Request, next: Next) -> Response {
    let seen = {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Seen {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            query: request.uri().query().map(str::to_string),
            authorization: header("authorization"),
            csrf: header("x-csrftoken"),
        }
    };
    backend.lock().seen.push(seen);
    next.run(request).await
}

async fn csrf(State(backend): State<Backend>) -> Json<Value> {
    let mut inner = backend.lock();
    inner.csrf_issued += 1;
    Json(json!({ "csrfToken": format!("csrf-{}", inner.csrf_issued) }))
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

async fn login(State(backend): State<Backend>, Json(body): Json<LoginBody>) -> Response {
    let user = backend
        .lock()
        .users
        .iter()
        .find(|u| u.username == body.username)
        .cloned();
    match user {
        Some(user) if body.password == PASSWORD => {
            Json(json!({ "token": TOKEN, "user": user })).into_response()
        }
        _ => failure(StatusCode::BAD_REQUEST, json!({ "error": "Invalid credentials" })),
    }
}

async fn register(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let mut inner = backend.lock();
    if inner.users.iter().any(|u| u.username == username) {
        return failure(
            StatusCode::BAD_REQUEST,
            json!({ "username": ["A user with that username already exists."] }),
        );
    }
    let user = User {
        id: UserId(inner.users.len() as u64 + 1),
        username,
        email: body["email"].as_str().unwrap_or_default().to_string(),
        ..Default::default()
    };
    inner.users.push(user.clone());
    Json(json!({ "token": TOKEN, "user": user })).into_response()
}

async fn logout(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorized(&backend, &headers) {
        return denied;
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn me(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorized(&backend, &headers) {
        return denied;
    }
    let user = backend.lock().users[1].clone();
    Json(user).into_response()
}

#[derive(Deserialize)]
struct UsernameQuery {
    username: String,
}

async fn check_username(State(backend): State<Backend>, Query(q): Query<UsernameQuery>) -> Json<Value> {
    let taken = backend.lock().users.iter().any(|u| u.username == q.username);
    Json(json!({ "available": !taken }))
}

#[derive(Deserialize)]
struct EmailQuery {
    email: String,
}

async fn check_email(State(backend): State<Backend>, Query(q): Query<EmailQuery>) -> Json<Value> {
    let taken = backend.lock().users.iter().any(|u| u.email == q.email);
    Json(json!({ "available": !taken }))
}

async fn list_users(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorized(&backend, &headers) {
        return denied;
    }
    Json(backend.lock().users.clone()).into_response()
}

async fn update_user(
    State(backend): State<Backend>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = authorized(&backend, &headers) {
        return denied;
    }
    let mut inner = backend.lock();
    inner.last_user_patch = Some(body.clone());
    let Some(user) = inner.users.iter_mut().find(|u| u.id == UserId(id)) else {
        return failure(StatusCode::NOT_FOUND, json!({ "detail": "Not found." }));
    };
    if let Some(active) = body["is_active"].as_bool() {
        user.is_active = active;
    }
    if let Some(max) = body["max_storage"].as_u64() {
        user.max_storage = max;
    }
    Json(user.clone()).into_response()
}

async fn delete_user(State(backend): State<Backend>, Path(id): Path<u64>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorized(&backend, &headers) {
        return denied;
    }
    backend.lock().users.retain(|u| u.id != UserId(id));
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Deserialize)]
struct FilesQuery {
    user_id: Option<u64>,
}

async fn list_files(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Query(q): Query<FilesQuery>,
) -> Response {
    if let Err(denied) = authorized(&backend, &headers) {
        return denied;
    }
    if q.user_id == Some(999) {
        // an unexpected crash with no usable body
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    Json(backend.lock().files.clone()).into_response()
}

async fn upload(State(backend): State<Backend>, headers: HeaderMap, mut multipart: Multipart) -> Response {
    if let Err(denied) = authorized(&backend, &headers) {
        return denied;
    }
    let mut name = String::new();
    let mut size = 0;
    let mut comment = String::new();

    while let Some(field) = multipart.next_field().await.unwrap() {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                name = field.file_name().unwrap_or_default().to_string();
                size = field.bytes().await.unwrap().len() as u64;
            }
            Some("comment") => comment = field.text().await.unwrap(),
            _ => {}
        }
    }

    if name.contains("fail") {
        return failure(StatusCode::BAD_REQUEST, json!({ "error": "File type not allowed" }));
    }

    let mut inner = backend.lock();
    let id = FileId(inner.next_file_id);
    inner.next_file_id += 1;
    let file = stored(id, &name, size, &comment);
    inner.files.push(file.clone());
    (StatusCode::CREATED, Json(file)).into_response()
}

async fn update_file(
    State(backend): State<Backend>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = authorized(&backend, &headers) {
        return denied;
    }
    let mut inner = backend.lock();
    let Some(file) = inner.files.iter_mut().find(|f| f.id == FileId(id)) else {
        return failure(StatusCode::NOT_FOUND, json!({ "detail": "Not found." }));
    };
    if let Some(comment) = body["comment"].as_str() {
        file.comment = comment.to_string();
    }
    Json(file.clone()).into_response()
}

async fn delete_file(State(backend): State<Backend>, Path(id): Path<u64>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorized(&backend, &headers) {
        return denied;
    }
    backend.lock().files.retain(|f| f.id != FileId(id));
    StatusCode::NO_CONTENT.into_response()
}

async fn download(State(backend): State<Backend>, Path(id): Path<u64>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorized(&backend, &headers) {
        return denied;
    }
    format!("contents of {id}").into_response()
}

async fn share(State(backend): State<Backend>, Path(id): Path<u64>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorized(&backend, &headers) {
        return denied;
    }
    let mut inner = backend.lock();
    if let Some(file) = inner.files.iter_mut().find(|f| f.id == FileId(id)) {
        file.shared_link = Some(SHARE_TOKEN.to_string());
    }
    Json(json!({ "shared_link": SHARE_TOKEN, "shared_expiry": "2026-10-26T12:00:00Z" })).into_response()
}

async fn unshare(State(backend): State<Backend>, Path(id): Path<u64>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorized(&backend, &headers) {
        return denied;
    }
    let mut inner = backend.lock();
    if let Some(file) = inner.files.iter_mut().find(|f| f.id == FileId(id)) {
        file.shared_link = None;
    }
    StatusCode::NO_CONTENT.into_response()
}

pub fn router(backend: Backend) -> Router {
    let api = Router::new()
        .route("/auth/csrf/", get(csrf))
        .route("/auth/login/", post(login))
        .route("/auth/register/", post(register))
        .route("/auth/logout/", post(logout))
        .route("/auth/users/me/", get(me))
        .route("/auth/check-username/", get(check_username))
        .route("/auth/check-email/", get(check_email))
        .route("/auth/users/", get(list_users))
        .route("/auth/users/{id}/", patch(update_user).delete(delete_user))
        .route("/storage/files/", get(list_files).post(upload))
        .route("/storage/files/{id}/", patch(update_file).delete(delete_file))
        .route("/storage/files/{id}/download/", get(download))
        .route("/storage/files/{id}/share/", patch(share).delete(unshare));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(backend.clone(), record))
        .with_state(backend)
}

/// Serve `backend` on an ephemeral port and return the API base URL.
pub async fn spawn(backend: Backend) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(backend);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

pub fn store_for(base_url: &str, vault: TokenVault) -> Store {
    let config = ClientConfig::default().with_api_base_url(base_url);
    Store::from_config(&config, vault).unwrap()
}

/// A running backend plus a client already signed in as `alice`.
pub async fn signed_in() -> (Backend, String, Store) {
    let backend = Backend::new();
    let base = spawn(backend.clone()).await;
    let store = store_for(&base, TokenVault::ephemeral("test-secret"));
    store
        .login(
            &mycloud_shared::types::Credentials {
                username: "alice".into(),
                password: PASSWORD.into(),
            },
            &tokio_util::sync::CancellationToken::new(),
        )
        .await
        .unwrap();
    (backend, base, store)
}
