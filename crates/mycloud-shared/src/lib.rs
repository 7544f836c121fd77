//! # mycloud-shared
//!
//! Types and pure helpers shared by the MyCloud client library and its
//! command line front end: the REST wire model, input validators, quota
//! arithmetic and the sealing scheme used for the persisted session token.

pub mod constants;
pub mod crypto;
pub mod error;
pub mod quota;
pub mod types;
pub mod validation;

pub use error::{CryptoError, LimitError, QuotaError};
