//! Session slice: who is signed in.

use mycloud_shared::quota::StorageUsage;
use mycloud_shared::types::User;

use super::{InFlight, Phase, Tracked};

pub const LOGIN: &str = "login";
pub const REGISTER: &str = "register";
pub const FETCH_CURRENT_USER: &str = "fetch_current_user";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    Login(Tracked<User>),
    Register(Tracked<User>),
    FetchCurrentUser(Tracked<User>),
    /// Local sign-out. Always lands in the empty state.
    Logout,
    ClearError,
    SetUser(Option<User>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    /// Set while any of login, register or the current-user fetch is unsettled.
    pub loading: bool,
    pub error: Option<String>,
    inflight: InFlight,
}

impl SessionState {
    /// True exactly when a user is present.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_superuser)
    }

    pub fn storage_usage(&self) -> StorageUsage {
        self.user
            .as_ref()
            .map(StorageUsage::of)
            .unwrap_or_else(StorageUsage::empty)
    }

    pub fn reduce(&mut self, action: SessionAction) {
        match action {
            SessionAction::Login(tracked) => self.settle(LOGIN, tracked),
            SessionAction::Register(tracked) => self.settle(REGISTER, tracked),
            SessionAction::FetchCurrentUser(tracked) => self.settle(FETCH_CURRENT_USER, tracked),
            SessionAction::Logout => {
                let mut inflight = std::mem::take(&mut self.inflight);
                inflight.invalidate_all();
                *self = Self {
                    inflight,
                    ..Self::default()
                };
            }
            SessionAction::ClearError => self.error = None,
            SessionAction::SetUser(user) => self.user = user,
        }
    }

    fn settle(&mut self, kind: &'static str, tracked: Tracked<User>) {
        let Tracked { seq, phase } = tracked;

        if let Phase::Pending = phase {
            self.inflight.begin(kind, seq);
            self.loading = true;
            self.error = None;
            return;
        }

        if !self.inflight.accepts(kind, seq) {
            tracing::debug!(kind, seq, "Dropping stale session response");
            return;
        }

        match phase {
            Phase::Pending => {}
            Phase::Fulfilled(user) => {
                self.user = Some(user);
                self.error = None;
            }
            Phase::Rejected(message) => self.error = Some(message),
            Phase::Cancelled => {}
        }
        self.inflight.finish(kind, seq);
        self.loading = self.inflight.any_open();
    }
}
