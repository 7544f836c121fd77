use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: invalid ciphertext or wrong key")]
    DecryptionFailed,

    #[error("Sealed value is not valid base64")]
    Encoding,

    #[error("Sealed value does not hold a JSON string")]
    Payload,
}

/// A configuration constant failed its load-time sanity check.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LimitError {
    #[error("{0} must be a number")]
    NotANumber(String),

    #[error("{0} must be an integer")]
    NotAnInteger(String),

    #[error("{min} must be less than or equal to {max}")]
    InvertedRange { min: String, max: String },
}

/// A quota typed by an administrator was rejected before any request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuotaError {
    #[error("Enter a valid number")]
    NotANumber,

    #[error("Minimum limit is {0} GB")]
    BelowMinimum(f64),

    #[error("Maximum limit is {0} GB")]
    AboveMaximum(f64),
}
