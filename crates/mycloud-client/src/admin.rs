//! Admin panel user table: search, client-side pagination and inline editors.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use mycloud_shared::constants::{
    CONFIRM_PHRASE, DELETE_PHRASE, ITEMS_PER_PAGE, MAX_GB_LIMIT, MIN_GB_LIMIT,
};
use mycloud_shared::quota::parse_quota_gb;
use mycloud_shared::types::{User, UserId};
use mycloud_shared::validation::{validate_number, validate_range};
use mycloud_shared::LimitError;

use crate::error::AdminError;
use crate::state::filter_users;
use crate::store::Store;

/// Sanity-check the table's hardcoded limits and return the page size.
pub fn check_limits() -> Result<usize, LimitError> {
    validate_number("ITEMS_PER_PAGE", ITEMS_PER_PAGE, true)?;
    validate_number("MIN_GB_LIMIT", MIN_GB_LIMIT, false)?;
    validate_number("MAX_GB_LIMIT", MAX_GB_LIMIT, false)?;
    validate_range("MIN_GB_LIMIT", MIN_GB_LIMIT, "MAX_GB_LIMIT", MAX_GB_LIMIT)?;
    Ok(ITEMS_PER_PAGE as usize)
}

/// 1-based page cursor over a collection held entirely in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
    page: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            page: 1,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size)
    }

    /// Pull the cursor back inside `[1, page_count]` after the collection shrank.
    pub fn clamp(&mut self, total: usize) {
        let last = self.page_count(total).max(1);
        if self.page > last {
            debug!(from = self.page, to = last, "Clamping page");
            self.page = last;
        }
    }

    pub fn go_to(&mut self, page: usize, total: usize) {
        self.page = page.max(1);
        self.clamp(total);
    }

    /// Items on the current page.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.page - 1) * self.page_size;
        if start >= items.len() {
            return &[];
        }
        let end = (start + self.page_size).min(items.len());
        &items[start..end]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorKind {
    Password,
    Quota,
}

/// An open inline editor and what has been typed into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
    pub user: UserId,
    pub kind: EditorKind,
    pub input: String,
}

/// Whether the typed confirmation matches `expected`.
pub fn phrase_matches(typed: &str, expected: &str) -> bool {
    typed.trim().eq_ignore_ascii_case(expected)
}

/// View model of the admin user table. Only regular accounts are listed.
#[derive(Debug, Clone)]
pub struct UserTable {
    search: String,
    paginator: Paginator,
    editor: Option<Editor>,
}

impl UserTable {
    pub fn new() -> Result<Self, LimitError> {
        Ok(Self {
            search: String::new(),
            paginator: Paginator::new(check_limits()?),
            editor: None,
        })
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    pub fn editor(&self) -> Option<&Editor> {
        self.editor.as_ref()
    }

    /// Regular users matching the search term.
    pub fn visible<'a>(&self, users: &'a [User]) -> Vec<&'a User> {
        filter_users(users, &self.search)
            .into_iter()
            .filter(|u| u.is_regular())
            .collect()
    }

    pub fn rows<'a>(&self, users: &'a [User]) -> Vec<&'a User> {
        let visible = self.visible(users);
        self.paginator.slice(&visible).to_vec()
    }

    pub fn page_count(&self, users: &[User]) -> usize {
        self.paginator.page_count(self.visible(users).len())
    }

    pub fn set_search(&mut self, term: &str, users: &[User]) {
        self.search = term.to_string();
        self.refresh(users);
    }

    pub fn go_to(&mut self, page: usize, users: &[User]) {
        let total = self.visible(users).len();
        self.paginator.go_to(page, total);
    }

    /// Re-clamp after the collection changed.
    pub fn refresh(&mut self, users: &[User]) {
        let total = self.visible(users).len();
        self.paginator.clamp(total);
        if let Some(editor) = &self.editor {
            if !users.iter().any(|u| u.id == editor.user) {
                self.editor = None;
            }
        }
    }

    /// Open an editor, closing whichever one was open.
    pub fn open_editor(&mut self, user: UserId, kind: EditorKind) {
        self.editor = Some(Editor {
            user,
            kind,
            input: String::new(),
        });
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    pub fn set_input(&mut self, input: &str) -> Result<(), AdminError> {
        let editor = self.editor.as_mut().ok_or(AdminError::NoEditor)?;
        editor.input = input.to_string();
        Ok(())
    }

    /// Send the open editor's change once the typed phrase is `CONFIRM`.
    pub async fn commit_editor(
        &mut self,
        store: &Store,
        confirmation: &str,
        cancel: &CancellationToken,
    ) -> Result<User, AdminError> {
        let editor = self.editor.clone().ok_or(AdminError::NoEditor)?;

        let user = match editor.kind {
            EditorKind::Password => {
                let password = editor.input.trim();
                if password.is_empty() {
                    return Err(AdminError::EmptyPassword);
                }
                if !phrase_matches(confirmation, CONFIRM_PHRASE) {
                    return Err(AdminError::NotConfirmed);
                }
                store.reset_password(editor.user, password, cancel).await?
            }
            EditorKind::Quota => {
                let bytes = parse_quota_gb(&editor.input)?;
                if !phrase_matches(confirmation, CONFIRM_PHRASE) {
                    return Err(AdminError::NotConfirmed);
                }
                store.set_quota(editor.user, bytes, cancel).await?
            }
        };

        self.editor = None;
        Ok(user)
    }

    pub async fn toggle_active(
        &mut self,
        store: &Store,
        id: UserId,
        cancel: &CancellationToken,
    ) -> Result<User, AdminError> {
        let active = store
            .users()
            .get(id)
            .map(|u| u.is_active)
            .ok_or(AdminError::UnknownUser(id))?;
        Ok(store.set_active(id, !active, cancel).await?)
    }

    /// Delete an account once the typed phrase is `DELETE`.
    pub async fn delete_user(
        &mut self,
        store: &Store,
        id: UserId,
        confirmation: &str,
        cancel: &CancellationToken,
    ) -> Result<(), AdminError> {
        if !phrase_matches(confirmation, DELETE_PHRASE) {
            return Err(AdminError::NotConfirmed);
        }
        store.delete_user(id, cancel).await?;
        self.refresh(&store.users().users);
        Ok(())
    }
}
