use anyhow::bail;
use tokio_util::sync::CancellationToken;

use mycloud_client::admin::{EditorKind, UserTable};
use mycloud_client::forms::CreateAdminForm;
use mycloud_client::Store;
use mycloud_shared::constants::{CONFIRM_PHRASE, DELETE_PHRASE};
use mycloud_shared::quota::StorageUsage;
use mycloud_shared::types::{User, UserId};

use super::print_field_errors;
use crate::cli::AdminCommand;
use crate::prompt;

pub async fn run(command: AdminCommand, store: &Store, cancel: &CancellationToken) -> anyhow::Result<()> {
    let mut table = UserTable::new()?;
    store.list_users(cancel).await?;

    match command {
        AdminCommand::Users { search, page } => {
            let users = store.users().users;
            table.set_search(&search, &users);
            table.go_to(page, &users);
            print_table(&table, &users);
        }
        AdminCommand::Toggle { id } => {
            let user = table.toggle_active(store, UserId(id), cancel).await?;
            let state = if user.is_active { "activated" } else { "deactivated" };
            println!("{} {state}", user.username);
        }
        AdminCommand::Quota { id, gb, confirm } => {
            table.open_editor(UserId(id), EditorKind::Quota);
            table.set_input(&gb)?;
            let phrase = phrase(confirm, CONFIRM_PHRASE).await?;
            let user = table.commit_editor(store, &phrase, cancel).await?;
            println!("{}: {}", user.username, StorageUsage::of(&user));
        }
        AdminCommand::Password { id, password, confirm } => {
            let password = prompt::value_or_ask(password, "New password").await?;
            table.open_editor(UserId(id), EditorKind::Password);
            table.set_input(&password)?;
            let phrase = phrase(confirm, CONFIRM_PHRASE).await?;
            let user = table.commit_editor(store, &phrase, cancel).await?;
            println!("Password for {} reset", user.username);
        }
        AdminCommand::Delete { id, confirm } => {
            let phrase = phrase(confirm, DELETE_PHRASE).await?;
            table.delete_user(store, UserId(id), &phrase, cancel).await?;
            println!("Deleted user {id}");
        }
        AdminCommand::CreateAdmin {
            username,
            email,
            full_name,
            password,
        } => {
            let password = prompt::value_or_ask(password, "Password").await?;
            let form = CreateAdminForm {
                username,
                email,
                full_name,
                confirm_password: password.clone(),
                password,
            };
            let errors = form.validate();
            if !errors.is_empty() {
                print_field_errors(&errors);
                bail!("Administrator form has errors");
            }
            match store.create_admin(&form.to_registration(), cancel).await {
                Ok(user) => println!("Administrator {} created", user.username),
                Err(e) => {
                    print_field_errors(&e.fields());
                    bail!(e)
                }
            }
        }
    }
    Ok(())
}

async fn phrase(given: Option<String>, expected: &str) -> anyhow::Result<String> {
    prompt::value_or_ask(given, &format!("Type {expected} to continue")).await
}

fn print_table(table: &UserTable, users: &[User]) {
    let rows = table.rows(users);
    if rows.is_empty() {
        println!("No users");
        return;
    }
    println!(
        "{:>6}  {:<20}  {:<32}  {:<8}  STORAGE",
        "ID", "USERNAME", "EMAIL", "ACTIVE"
    );
    for user in rows {
        println!(
            "{:>6}  {:<20}  {:<32}  {:<8}  {}",
            user.id,
            user.username,
            user.email,
            if user.is_active { "yes" } else { "no" },
            StorageUsage::of(user)
        );
    }
    println!(
        "page {} of {}",
        table.paginator().page(),
        table.page_count(users).max(1)
    );
}
