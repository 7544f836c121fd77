//! Account forms and their field-level validation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use mycloud_shared::constants::DEBOUNCE_MILLIS;
use mycloud_shared::types::Registration;
use mycloud_shared::validation::{password_issue, validate_email, validate_username};

use crate::error::FieldErrors;
use crate::store::Store;

pub const USERNAME_RULE: &str = "Username must be 4-20 characters and start with a letter";
pub const EMAIL_RULE: &str = "Invalid email format";
pub const PASSWORDS_DIFFER: &str = "Passwords must match";
pub const USERNAME_TAKEN: &str = "This username is already taken";
pub const EMAIL_TAKEN: &str = "This email is already in use";

fn push(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors.entry(field.to_string()).or_default().push(message.into());
}

/// Shared checks of the registration and create-admin forms.
fn validate_account(
    username: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if username.is_empty() {
        push(&mut errors, "username", "Username is required");
    } else if !validate_username(username) {
        push(&mut errors, "username", USERNAME_RULE);
    }

    if email.is_empty() {
        push(&mut errors, "email", "Email is required");
    } else if !validate_email(email) {
        push(&mut errors, "email", EMAIL_RULE);
    }

    if password.is_empty() {
        push(&mut errors, "password", "Password is required");
    } else if let Some(issue) = password_issue(password) {
        push(&mut errors, "password", issue.message());
    }

    if confirm_password.is_empty() {
        push(&mut errors, "confirmPassword", "Confirm the password");
    } else if confirm_password != password {
        push(&mut errors, "confirmPassword", PASSWORDS_DIFFER);
    }

    errors
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterForm {
    /// Local checks only. An empty map means the form may be submitted.
    pub fn validate(&self) -> FieldErrors {
        validate_account(
            self.username.trim(),
            self.email.trim(),
            &self.password,
            &self.confirm_password,
        )
    }

    /// Ask the server whether the username and email are still free.
    ///
    /// Values that fail local validation are not sent.
    pub async fn check_availability(&self, store: &Store, cancel: &CancellationToken) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let username = self.username.trim();
        let email = self.email.trim();

        if validate_username(username) {
            match store.check_username(username, cancel).await {
                Ok(true) => {}
                Ok(false) => push(&mut errors, "username", USERNAME_TAKEN),
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Username check failed");
                    push(&mut errors, "username", "Could not check username");
                }
            }
        }

        if validate_email(email) {
            match store.check_email(email, cancel).await {
                Ok(true) => {}
                Ok(false) => push(&mut errors, "email", EMAIL_TAKEN),
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Email check failed");
                    push(&mut errors, "email", "Could not check email");
                }
            }
        }

        errors
    }

    pub fn to_registration(&self) -> Registration {
        Registration {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            full_name: self.full_name.trim().to_string(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
        }
    }
}

/// New administrator account. The full name is mandatory here.
#[derive(Debug, Clone, Default)]
pub struct CreateAdminForm {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub confirm_password: String,
}

impl CreateAdminForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = validate_account(
            self.username.trim(),
            self.email.trim(),
            &self.password,
            &self.confirm_password,
        );
        if self.full_name.trim().is_empty() {
            push(&mut errors, "full_name", "Full name is required");
        }
        errors
    }

    pub fn to_registration(&self) -> Registration {
        Registration {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            full_name: self.full_name.trim().to_string(),
            password: self.password.clone(),
            confirm_password: self.confirm_password.clone(),
        }
    }
}

/// Lets only the last of a burst of values through.
///
/// Each call to [`Debouncer::settle`] waits out the quiet period and
/// returns its value only if no newer call was made in the meantime.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEBOUNCE_MILLIS))
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn settle<T>(&self, value: T) -> Option<T> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        (self.generation.load(Ordering::SeqCst) == ticket).then_some(value)
    }
}
