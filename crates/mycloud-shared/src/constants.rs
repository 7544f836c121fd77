/// Application name
pub const APP_NAME: &str = "MyCloud";

/// Default REST API base URL when none is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Fallback secret for token sealing when none is configured
pub const DEFAULT_CRYPTO_SECRET: &str = "mycloud-secure-key";

/// Local storage key holding the sealed session token
pub const TOKEN_STORAGE_KEY: &str = "token";

/// Key derivation context (BLAKE3)
pub const KDF_CONTEXT_TOKEN_KEY: &str = "mycloud-token-key-v1";

/// XChaCha20-Poly1305 nonce size in bytes
pub const NONCE_SIZE: usize = 24;

/// Symmetric key size in bytes (for XChaCha20-Poly1305)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Shown for every 401/403 response
pub const AUTH_FAILURE_MESSAGE: &str = "Invalid credentials or your account has been deactivated. \
     Please contact the administrator at admin@mail.ru";

/// Shown when the server gives no message of its own
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to load data";

/// Rows per page in the admin user table
pub const ITEMS_PER_PAGE: f64 = 10.0;

/// Smallest quota an administrator may assign, in GB
pub const MIN_GB_LIMIT: f64 = 0.1;

/// Largest quota an administrator may assign, in GB
pub const MAX_GB_LIMIT: f64 = 1000.0;

pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Usage percentage at which the storage gauge warns the user
pub const STORAGE_WARNING_PERCENT: f64 = 90.0;

/// Session error banner lifetime in seconds
pub const BANNER_TTL_SECS: u64 = 10;

/// Interval between quota refreshes in seconds
pub const QUOTA_POLL_INTERVAL_SECS: u64 = 3;

/// Quiet period before a typed value is checked against the server
pub const DEBOUNCE_MILLIS: u64 = 500;

/// Share link lifetime bounds accepted by the server, in days
pub const MIN_SHARE_EXPIRY_DAYS: u32 = 1;
pub const MAX_SHARE_EXPIRY_DAYS: u32 = 365;

/// Typed phrase required before deleting a user
pub const DELETE_PHRASE: &str = "DELETE";

/// Typed phrase required before changing a quota or a password
pub const CONFIRM_PHRASE: &str = "CONFIRM";

/// Symbols a password must draw at least one character from
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*()_+";

/// Upload body chunk size in bytes (64 KiB)
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;
