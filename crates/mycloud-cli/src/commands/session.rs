use std::time::Duration;

use anyhow::bail;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use mycloud_client::forms::RegisterForm;
use mycloud_client::{banner, poller, Store};
use mycloud_shared::quota::StorageUsage;
use mycloud_shared::types::{Credentials, User};
use mycloud_shared::validation::password_issue;

use super::print_field_errors;
use crate::prompt;

pub async fn login(
    store: &Store,
    username: String,
    password: Option<String>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let password = prompt::value_or_ask(password, "Password").await?;
    let credentials = Credentials { username, password };

    match store.login(&credentials, cancel).await {
        Ok(user) => {
            println!("Signed in as {}", user.username);
            Ok(())
        }
        Err(e) => bail!(banner::current(store).unwrap_or_else(|| e.to_string())),
    }
}

pub async fn register(
    store: &Store,
    username: String,
    email: String,
    full_name: String,
    password: Option<String>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let password = prompt::value_or_ask(password, "Password").await?;
    let form = RegisterForm {
        username,
        email,
        full_name,
        confirm_password: password.clone(),
        password,
    };

    let mut errors = form.validate();
    if errors.is_empty() {
        errors = form.check_availability(store, cancel).await;
    }
    if !errors.is_empty() {
        print_field_errors(&errors);
        bail!("Registration form has errors");
    }

    match store.register(&form.to_registration(), cancel).await {
        Ok(user) => {
            println!("Welcome, {}", user.username);
            Ok(())
        }
        Err(e) => {
            print_field_errors(&e.fields());
            bail!(e)
        }
    }
}

pub async fn logout(store: &Store, local: bool, cancel: &CancellationToken) -> anyhow::Result<()> {
    if local {
        store.logout();
    } else {
        store.logout_remote(cancel).await;
    }
    println!("Signed out");
    Ok(())
}

pub async fn check_username(store: &Store, username: &str, cancel: &CancellationToken) -> anyhow::Result<()> {
    let free = store.check_username(username, cancel).await?;
    println!("{username}: {}", if free { "available" } else { "taken" });
    Ok(())
}

pub async fn check_email(store: &Store, email: &str, cancel: &CancellationToken) -> anyhow::Result<()> {
    let free = store.check_email(email, cancel).await?;
    println!("{email}: {}", if free { "available" } else { "in use" });
    Ok(())
}

fn print_account(user: &User) {
    let role = if user.is_superuser { "administrator" } else { "user" };
    println!("{} <{}> ({role})", user.username, user.email);
    if let Some(name) = user.full_name.as_deref().filter(|n| !n.is_empty()) {
        println!("  name:    {name}");
    }
    print_usage(&StorageUsage::of(user));
}

fn print_usage(usage: &StorageUsage) {
    println!("  storage: {usage}");
    if usage.is_nearly_full() {
        println!("  warning: storage almost full");
    }
}

pub async fn whoami(store: &Store, watch: bool, cancel: &CancellationToken) -> anyhow::Result<()> {
    let Some(user) = store.current_user() else {
        bail!("Not signed in");
    };
    print_account(&user);
    if !watch {
        return Ok(());
    }

    let poller = poller::spawn_quota_poller(store.clone(), cancel.clone());
    let mut last = StorageUsage::of(&user);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_millis(500)) => {}
        }
        let usage = store.session().storage_usage();
        if usage != last {
            print_usage(&usage);
            last = usage;
        }
    }
    if let Err(e) = poller.await {
        debug!(error = %e, "Quota poller ended abnormally");
    }
    Ok(())
}

pub async fn passwd(store: &Store, password: Option<String>, cancel: &CancellationToken) -> anyhow::Result<()> {
    let password = prompt::value_or_ask(password, "New password").await?;
    if let Some(issue) = password_issue(&password) {
        bail!("Password rejected: {issue}");
    }
    store.change_own_password(&password, cancel).await?;
    println!("Password changed");
    Ok(())
}
