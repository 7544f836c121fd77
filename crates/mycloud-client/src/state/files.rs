//! Files slice: the visible file list and upload status.

use mycloud_shared::types::{FileId, ShareLink, StoredFile};

use super::{InFlight, Phase, Tracked};

pub const LIST: &str = "files.list";
pub const UPLOAD: &str = "files.upload";
pub const UPDATE: &str = "files.update";
pub const DELETE: &str = "files.delete";
pub const SHARE: &str = "files.share";
pub const UNSHARE: &str = "files.unshare";

#[derive(Debug, Clone, PartialEq)]
pub enum FilesAction {
    List(Tracked<Vec<StoredFile>>),
    /// A batch of uploads; fulfilled once per persisted file.
    Upload(Tracked<StoredFile>),
    Update(Tracked<StoredFile>),
    Delete(Tracked<FileId>),
    Share(Tracked<(FileId, ShareLink)>),
    Unshare(Tracked<FileId>),
    ClearError,
    /// Drop everything, e.g. after sign-out.
    Reset,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilesState {
    pub files: Vec<StoredFile>,
    pub loading: bool,
    pub uploading: bool,
    pub error: Option<String>,
    inflight: InFlight,
}

impl FilesState {
    pub fn get(&self, id: FileId) -> Option<&StoredFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn reduce(&mut self, action: FilesAction) {
        match action {
            FilesAction::List(Tracked { seq, phase }) => {
                if self.begin_or_gate(LIST, seq, &phase, false) {
                    self.settle(LIST, seq, phase, false, |state, files| state.files = files);
                }
            }
            FilesAction::Upload(Tracked { seq, phase }) => {
                // several uploads of one batch share a sequence number
                if let Phase::Pending = phase {
                    self.inflight.begin(UPLOAD, seq);
                    self.uploading = true;
                    self.error = None;
                    return;
                }
                if !self.inflight.accepts(UPLOAD, seq) {
                    return;
                }
                match phase {
                    Phase::Pending => {}
                    Phase::Fulfilled(file) => {
                        self.files.retain(|f| f.id != file.id);
                        self.files.push(file);
                    }
                    Phase::Rejected(message) => {
                        self.error = Some(message);
                        self.uploading = false;
                    }
                    Phase::Cancelled => self.uploading = false,
                }
            }
            FilesAction::Update(Tracked { seq, phase }) => {
                if self.begin_or_gate(UPDATE, seq, &phase, true) {
                    self.settle(UPDATE, seq, phase, true, |state, file| {
                        if let Some(slot) = state.files.iter_mut().find(|f| f.id == file.id) {
                            *slot = file;
                        }
                    });
                }
            }
            FilesAction::Delete(Tracked { seq, phase }) => {
                if self.begin_or_gate(DELETE, seq, &phase, true) {
                    self.settle(DELETE, seq, phase, true, |state, id| {
                        state.files.retain(|f| f.id != id);
                    });
                }
            }
            FilesAction::Share(Tracked { seq, phase }) => {
                if self.begin_or_gate(SHARE, seq, &phase, true) {
                    self.settle(SHARE, seq, phase, true, |state, (id, link)| {
                        if let Some(file) = state.files.iter_mut().find(|f| f.id == id) {
                            file.shared_link = link.shared_link;
                            file.shared_expiry = link.shared_expiry;
                            file.is_shared_expired = false;
                        }
                    });
                }
            }
            FilesAction::Unshare(Tracked { seq, phase }) => {
                if self.begin_or_gate(UNSHARE, seq, &phase, true) {
                    self.settle(UNSHARE, seq, phase, true, |state, id| {
                        if let Some(file) = state.files.iter_mut().find(|f| f.id == id) {
                            file.shared_link = None;
                            file.shared_expiry = None;
                            file.is_shared_expired = false;
                        }
                    });
                }
            }
            FilesAction::ClearError => self.error = None,
            FilesAction::Reset => {
                let mut inflight = std::mem::take(&mut self.inflight);
                inflight.invalidate_all();
                *self = Self {
                    inflight,
                    ..Self::default()
                };
            }
        }
    }

    /// Upload batch finished; the list refetch that follows is tracked separately.
    pub fn finish_upload(&mut self) {
        self.uploading = false;
    }

    /// Handles `Pending`; returns whether a settled phase should be applied.
    ///
    /// Row mutations (`row`) never touch `loading` and are not superseded
    /// by newer requests of the same kind on other files.
    fn begin_or_gate<T>(&mut self, kind: &'static str, seq: u64, phase: &Phase<T>, row: bool) -> bool {
        if let Phase::Pending = phase {
            self.inflight.begin(kind, seq);
            if !row {
                self.loading = true;
            }
            self.error = None;
            return false;
        }
        let accepted = if row {
            self.inflight.after_reset(seq)
        } else {
            self.inflight.accepts(kind, seq)
        };
        if accepted {
            true
        } else {
            tracing::debug!(kind, seq, "Dropping stale files response");
            false
        }
    }

    fn settle<T>(
        &mut self,
        kind: &'static str,
        seq: u64,
        phase: Phase<T>,
        row: bool,
        apply: impl FnOnce(&mut Self, T),
    ) {
        match phase {
            Phase::Pending => {}
            Phase::Fulfilled(value) => {
                apply(self, value);
                if !row {
                    self.loading = false;
                }
            }
            Phase::Rejected(message) => {
                self.error = Some(message);
                if !row {
                    self.loading = false;
                }
            }
            Phase::Cancelled => {
                if !row && self.inflight.is_current(kind, seq) {
                    self.loading = false;
                }
            }
        }
    }
}
