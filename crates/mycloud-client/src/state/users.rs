//! Users slice: the admin panel's account list.

use mycloud_shared::types::{User, UserId};

use super::{InFlight, Phase, Tracked};

pub const LIST: &str = "users.list";
pub const UPDATE: &str = "users.update";
pub const DELETE: &str = "users.delete";
pub const CREATE_ADMIN: &str = "users.create_admin";

#[derive(Debug, Clone, PartialEq)]
pub enum UsersAction {
    List(Tracked<Vec<User>>),
    Update(Tracked<User>),
    Delete(Tracked<UserId>),
    CreateAdmin(Tracked<User>),
    ClearError,
    Reset,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsersState {
    pub users: Vec<User>,
    pub loading: bool,
    pub error: Option<String>,
    inflight: InFlight,
}

impl UsersState {
    /// Accounts that are neither staff nor superuser.
    pub fn regular_users(&self) -> Vec<&User> {
        self.users.iter().filter(|u| u.is_regular()).collect()
    }

    pub fn get(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn reduce(&mut self, action: UsersAction) {
        match action {
            UsersAction::List(Tracked { seq, phase }) => match phase {
                Phase::Pending => {
                    self.inflight.begin(LIST, seq);
                    self.loading = true;
                    self.error = None;
                }
                _ if !self.inflight.accepts(LIST, seq) => {
                    tracing::debug!(seq, "Dropping stale user list");
                }
                Phase::Fulfilled(users) => {
                    self.users = users;
                    self.loading = false;
                }
                Phase::Rejected(message) => {
                    self.error = Some(message);
                    self.loading = false;
                }
                Phase::Cancelled => {
                    if self.inflight.is_current(LIST, seq) {
                        self.loading = false;
                    }
                }
            },
            UsersAction::Update(tracked) => self.mutate(UPDATE, tracked, |users, user| {
                if let Some(slot) = users.iter_mut().find(|u| u.id == user.id) {
                    *slot = user;
                }
            }),
            UsersAction::Delete(tracked) => self.mutate(DELETE, tracked, |users, id| {
                users.retain(|u| u.id != id);
            }),
            UsersAction::CreateAdmin(tracked) => self.mutate(CREATE_ADMIN, tracked, |users, user| {
                users.retain(|u| u.id != user.id);
                users.push(user);
            }),
            UsersAction::ClearError => self.error = None,
            UsersAction::Reset => {
                let mut inflight = std::mem::take(&mut self.inflight);
                inflight.invalidate_all();
                *self = Self {
                    inflight,
                    ..Self::default()
                };
            }
        }
    }

    // Row-level mutations leave `loading` alone and only a reset makes them stale.
    fn mutate<T>(
        &mut self,
        kind: &'static str,
        tracked: Tracked<T>,
        apply: impl FnOnce(&mut Vec<User>, T),
    ) {
        let Tracked { seq, phase } = tracked;
        match phase {
            Phase::Pending => {
                self.inflight.begin(kind, seq);
                self.error = None;
            }
            _ if !self.inflight.after_reset(seq) => {
                tracing::debug!(kind, seq, "Dropping stale users response");
            }
            Phase::Fulfilled(value) => apply(&mut self.users, value),
            Phase::Rejected(message) => self.error = Some(message),
            Phase::Cancelled => {}
        }
    }
}
