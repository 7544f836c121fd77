//! Input validators shared by every form.
//!
//! The predicates are pure and allocation free. `validate_number` and
//! `validate_range` guard hardcoded configuration rather than user input:
//! they are meant to fail fast when a constant is edited into nonsense.

use crate::constants::PASSWORD_SYMBOLS;
use crate::error::LimitError;

/// Starts with an ASCII letter, 4-20 characters, ASCII letters and digits only.
pub fn validate_username(username: &str) -> bool {
    let mut chars = username.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let len = username.chars().count();

    first.is_ascii_alphabetic()
        && (4..=20).contains(&len)
        && chars.all(|c| c.is_ascii_alphanumeric())
}

/// `local@domain.tld` with no whitespace and a single `@`.
pub fn validate_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.chars().any(char::is_whitespace) {
        return false;
    }
    if domain.contains('@') || domain.chars().any(char::is_whitespace) {
        return false;
    }

    // some dot with at least one character on each side
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Why a password was rejected, in the order the checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordIssue {
    TooShort,
    MissingUppercase,
    MissingDigit,
    MissingSymbol,
    DisallowedCharacter,
}

impl PasswordIssue {
    pub fn message(self) -> &'static str {
        match self {
            Self::TooShort => "At least 6 characters",
            Self::MissingUppercase => "Add an uppercase letter",
            Self::MissingDigit => "Add a digit",
            Self::MissingSymbol => "Add a special character (!@#$%^&*()_+)",
            Self::DisallowedCharacter => "Only letters, digits and !@#$%^&*()_+ are allowed",
        }
    }
}

impl std::fmt::Display for PasswordIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

fn is_password_symbol(c: char) -> bool {
    PASSWORD_SYMBOLS.contains(c)
}

/// First rule the password breaks, if any.
pub fn password_issue(password: &str) -> Option<PasswordIssue> {
    if password.chars().count() < 6 {
        return Some(PasswordIssue::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Some(PasswordIssue::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Some(PasswordIssue::MissingDigit);
    }
    if !password.chars().any(is_password_symbol) {
        return Some(PasswordIssue::MissingSymbol);
    }
    if !password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || is_password_symbol(c))
    {
        return Some(PasswordIssue::DisallowedCharacter);
    }
    None
}

/// At least 6 characters with an uppercase letter, a digit and a symbol.
pub fn validate_password(password: &str) -> bool {
    password_issue(password).is_none()
}

/// Reject non-finite values, and fractional ones when `integer_only`.
pub fn validate_number(name: &str, value: f64, integer_only: bool) -> Result<(), LimitError> {
    if !value.is_finite() {
        return Err(LimitError::NotANumber(name.to_string()));
    }
    if integer_only && value.fract() != 0.0 {
        return Err(LimitError::NotAnInteger(name.to_string()));
    }
    Ok(())
}

/// Reject a range whose lower bound exceeds its upper bound.
pub fn validate_range(
    min_name: &str,
    min_value: f64,
    max_name: &str,
    max_value: f64,
) -> Result<(), LimitError> {
    if min_value > max_value {
        return Err(LimitError::InvertedRange {
            min: min_name.to_string(),
            max: max_name.to_string(),
        });
    }
    Ok(())
}
