//! Async client for the MyCloud file storage service.
//!
//! [`store::Store`] is the entry point: it owns the HTTP wrapper and the
//! state tree and exposes one method per user-facing operation. The
//! remaining modules are the pieces a front end composes around it.

pub mod admin;
pub mod api;
pub mod banner;
pub mod config;
pub mod error;
pub mod forms;
pub mod guard;
pub mod poller;
pub mod share;
pub mod state;
pub mod store;
pub mod upload;
pub mod vault;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{AdminError, ApiError, ClientError, UploadError};
pub use store::Store;
pub use vault::{FileStorage, LocalStorage, MemoryStorage, TokenVault};
