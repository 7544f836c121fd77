//! Client-side state tree and its reducers.
//!
//! Each slice is a plain struct mutated only through `reduce`, one action at
//! a time. Async operations are described by [`Tracked`] actions moving
//! through `Pending` to a settled phase. Every pending action carries a
//! sequence number, and each slice remembers the newest one per operation
//! kind in an [`InFlight`] table: when two requests of the same kind race,
//! the older response is dropped instead of overwriting the newer one.
//! Row mutations (update, delete, share) target distinct entities, so they
//! are only gated by resets.

pub mod files;
pub mod session;
pub mod users;

use std::collections::{HashMap, HashSet};

pub use files::{FilesAction, FilesState};
pub use session::{SessionAction, SessionState};
pub use users::{UsersAction, UsersState};

/// Lifecycle of one async operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase<T> {
    Pending,
    Fulfilled(T),
    /// Display message of the failure.
    Rejected(String),
    /// Aborted by its cancellation token; the result is never applied.
    Cancelled,
}

/// An async action tagged with the sequence number of its request.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracked<T> {
    pub seq: u64,
    pub phase: Phase<T>,
}

impl<T> Tracked<T> {
    pub fn pending(seq: u64) -> Self {
        Self {
            seq,
            phase: Phase::Pending,
        }
    }

    pub fn fulfilled(seq: u64, value: T) -> Self {
        Self {
            seq,
            phase: Phase::Fulfilled(value),
        }
    }

    pub fn rejected(seq: u64, message: impl Into<String>) -> Self {
        Self {
            seq,
            phase: Phase::Rejected(message.into()),
        }
    }

    pub fn cancelled(seq: u64) -> Self {
        Self {
            seq,
            phase: Phase::Cancelled,
        }
    }
}

/// Newest request sequence number per operation kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InFlight {
    latest: HashMap<&'static str, u64>,
    /// Kinds whose newest request has not settled yet.
    open: HashSet<&'static str>,
    /// Requests numbered below this were issued before a reset.
    floor: u64,
}

impl InFlight {
    /// Record a newly issued request.
    pub fn begin(&mut self, kind: &'static str, seq: u64) {
        let entry = self.latest.entry(kind).or_insert(seq);
        *entry = (*entry).max(seq);
        self.open.insert(kind);
    }

    /// Mark the newest request of `kind` as settled. Older requests are ignored.
    pub fn finish(&mut self, kind: &'static str, seq: u64) {
        if self.is_current(kind, seq) {
            self.open.remove(kind);
        }
    }

    /// Whether any kind still waits on its newest request.
    pub fn any_open(&self) -> bool {
        !self.open.is_empty()
    }

    /// Whether a settled request may still touch state.
    pub fn accepts(&self, kind: &'static str, seq: u64) -> bool {
        seq >= self.floor && self.latest.get(kind).map_or(true, |latest| seq >= *latest)
    }

    /// Whether a request was issued after the last reset.
    pub fn after_reset(&self, seq: u64) -> bool {
        seq >= self.floor
    }

    /// Whether `seq` is the newest request of its kind.
    pub fn is_current(&self, kind: &'static str, seq: u64) -> bool {
        self.latest.get(kind) == Some(&seq) && seq >= self.floor
    }

    /// Reject every request issued so far.
    pub fn invalidate_all(&mut self) {
        let newest = self.latest.values().copied().max().unwrap_or(0);
        self.floor = self.floor.max(newest + 1);
        self.latest.clear();
        self.open.clear();
    }
}

/// The whole client state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub session: SessionState,
    pub files: FilesState,
    pub users: UsersState,
}

/// Case-insensitive search over id, username, email and full name.
pub fn filter_users<'a>(
    users: &'a [mycloud_shared::types::User],
    term: &str,
) -> Vec<&'a mycloud_shared::types::User> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return users.iter().collect();
    }
    users
        .iter()
        .filter(|user| {
            user.id.to_string().contains(&term)
                || user.username.to_lowercase().contains(&term)
                || user.email.to_lowercase().contains(&term)
                || user
                    .full_name
                    .as_deref()
                    .is_some_and(|name| name.to_lowercase().contains(&term))
        })
        .collect()
}
