use std::collections::BTreeMap;

use thiserror::Error;

use mycloud_shared::constants::{MAX_SHARE_EXPIRY_DAYS, MIN_SHARE_EXPIRY_DAYS};
use mycloud_shared::types::UserId;
use mycloud_shared::{CryptoError, LimitError, QuotaError};

/// Field name to the messages the server attached to it.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// The one error type produced by the HTTP wrapper.
///
/// Server failures are flattened to a display string; only validation
/// responses keep their per-field messages so forms can render them inline.
#[derive(Error, Debug)]
pub enum ApiError {
    /// 401 or 403. Always carries the fixed advisory message.
    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    Server { message: String, fields: FieldErrors },

    /// No response at all. The transport error is passed through as-is.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Per-field messages, empty unless the server sent them.
    pub fn fields(&self) -> FieldErrors {
        match self {
            Self::Server { fields, .. } => fields.clone(),
            _ => FieldErrors::new(),
        }
    }
}

/// Errors produced outside the HTTP round trip itself.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Local storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Token sealing error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Invalid configuration constant: {0}")]
    Limit(#[from] LimitError),

    #[error("Could not determine application data directory")]
    NoDataDir,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Share expiry must be between {min} and {max} days, got {0}", min = MIN_SHARE_EXPIRY_DAYS, max = MAX_SHARE_EXPIRY_DAYS)]
    ShareExpiry(u32),
}

impl ClientError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Api(ApiError::Cancelled))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(ApiError::Unauthorized(_)))
    }

    /// Server-side field messages, if any.
    pub fn fields(&self) -> FieldErrors {
        match self {
            Self::Api(e) => e.fields(),
            _ => FieldErrors::new(),
        }
    }
}

/// A multi-file commit where at least one upload failed.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Nothing queued for upload")]
    EmptyQueue,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to upload files: {message} ({failed} of {total} failed)")]
    Partial {
        failed: usize,
        total: usize,
        message: String,
    },

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Admin table actions refused before any request is sent.
#[derive(Error, Debug)]
pub enum AdminError {
    #[error("No editor is open")]
    NoEditor,

    #[error("No such user: {0}")]
    UnknownUser(UserId),

    #[error("Enter a new password")]
    EmptyPassword,

    #[error(transparent)]
    Quota(#[from] QuotaError),

    #[error("Confirmation phrase did not match, nothing was changed")]
    NotConfirmed,

    #[error(transparent)]
    Client(#[from] ClientError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
