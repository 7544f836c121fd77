//! Command handlers. Each one maps a parsed command onto store operations
//! and renders the result on stdout.

pub mod admin;
pub mod files;
pub mod session;

use anyhow::bail;
use tokio_util::sync::CancellationToken;

use mycloud_client::error::FieldErrors;
use mycloud_client::guard::{self, Route};
use mycloud_client::Store;

use crate::cli::Command;

pub async fn run(command: Command, store: &Store, cancel: &CancellationToken) -> anyhow::Result<()> {
    match command {
        Command::Login { username, password } => session::login(store, username, password, cancel).await,
        Command::Register {
            username,
            email,
            full_name,
            password,
        } => session::register(store, username, email, full_name, password, cancel).await,
        Command::Logout { local } => session::logout(store, local, cancel).await,
        Command::CheckUsername { username } => session::check_username(store, &username, cancel).await,
        Command::CheckEmail { email } => session::check_email(store, &email, cancel).await,
        Command::Whoami { watch } => {
            require(store, Route::Storage, cancel).await?;
            session::whoami(store, watch, cancel).await
        }
        Command::Passwd { password } => {
            require(store, Route::Storage, cancel).await?;
            session::passwd(store, password, cancel).await
        }
        Command::Files(command) => {
            require(store, Route::Storage, cancel).await?;
            files::run(command, store, cancel).await
        }
        Command::Admin(command) => {
            require(store, Route::Admin, cancel).await?;
            admin::run(command, store, cancel).await
        }
    }
}

/// Restore the session and make sure it may open `route`.
async fn require(store: &Store, route: Route, cancel: &CancellationToken) -> anyhow::Result<()> {
    guard::bootstrap(store, cancel).await;
    match guard::resolve(route, &store.session()) {
        resolved if resolved == route => Ok(()),
        Route::Login => bail!("Not signed in. Run `mycloud login <username>` first."),
        _ => bail!("This command requires an administrator account."),
    }
}

/// Print per-field messages the way a form shows them inline.
pub fn print_field_errors(errors: &FieldErrors) {
    for (field, messages) in errors {
        for message in messages {
            eprintln!("  {field}: {message}");
        }
    }
}
