//! Locally hidden notes.
//!
//! Each user (or the guest) gets an ordered list of dismissed note ids kept in
//! the durable store under its own key. The list is bounded: once it holds
//! `max_entries` ids, hiding another one evicts the oldest. Nothing here is
//! synced anywhere, and every storage failure degrades to "nothing hidden"
//! instead of reaching the caller.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::session::IdentityProvider;
use crate::storage::KeyValueStore;

pub const DEFAULT_MAX_ENTRIES: usize = 500;
pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_secs(5);

const GUEST_SCOPE: &str = "guest";
const KEY_PREFIX: &str = "hidden_posts:";

/// Anything with a stable note identifier.
pub trait Identified {
    fn id(&self) -> &str;
}

/// Partition of the hidden set, one per user plus a shared guest scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    Guest,
    User(String),
}

impl ScopeKey {
    pub fn user(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.trim().is_empty() {
            return Self::guest();
        }
        Self::User(id)
    }

    pub fn guest() -> Self {
        Self::Guest
    }

    pub fn from_identity(identity: &dyn IdentityProvider) -> Self {
        match identity.current_user_id() {
            Some(id) => Self::user(id),
            None => Self::guest(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Guest => GUEST_SCOPE,
            Self::User(id) => id,
        }
    }

    // User ids live under their own namespace so no id can alias the guest.
    fn storage_key(&self) -> String {
        match self {
            Self::Guest => format!("{KEY_PREFIX}{GUEST_SCOPE}"),
            Self::User(id) => format!("{KEY_PREFIX}user:{id}"),
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Undo token handed out when a note is dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dismissal {
    pub scope: ScopeKey,
    pub note_id: String,
    pub dismissed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub max_entries: usize,
    pub undo_window: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            undo_window: DEFAULT_UNDO_WINDOW,
        }
    }
}

pub struct HiddenRegistry<S> {
    store: S,
    opts: Options,
}

impl<S: KeyValueStore> HiddenRegistry<S> {
    pub fn new(store: S, opts: Options) -> Self {
        let mut opts = opts;
        if opts.max_entries == 0 {
            opts.max_entries = DEFAULT_MAX_ENTRIES;
        }
        Self { store, opts }
    }

    pub fn max_entries(&self) -> usize {
        self.opts.max_entries
    }

    pub fn is_hidden(&self, scope: &ScopeKey, note_id: &str) -> bool {
        self.load(scope).iter().any(|id| id == note_id)
    }

    pub fn hidden_ids(&self, scope: &ScopeKey) -> Vec<String> {
        self.load(scope)
    }

    pub fn hide(&self, scope: &ScopeKey, note_id: &str) {
        let mut ids = self.load(scope);
        if ids.iter().any(|id| id == note_id) {
            return;
        }
        ids.push(note_id.to_string());
        if ids.len() > self.opts.max_entries {
            let overflow = ids.len() - self.opts.max_entries;
            let evicted: Vec<String> = ids.drain(..overflow).collect();
            tracing::debug!(scope = %scope, ?evicted, "hidden: evicted oldest entries");
        }
        self.persist(scope, &ids);
    }

    pub fn unhide(&self, scope: &ScopeKey, note_id: &str) {
        let mut ids = self.load(scope);
        let before = ids.len();
        ids.retain(|id| id != note_id);
        if ids.len() == before {
            return;
        }
        self.persist(scope, &ids);
    }

    pub fn clear(&self, scope: &ScopeKey) {
        if let Err(err) = self.store.remove(&scope.storage_key()) {
            tracing::warn!(scope = %scope, error = ?err, "hidden: failed to clear");
        }
    }

    /// Hides `note_id` and returns the token needed to take it back.
    pub fn dismiss(&self, scope: &ScopeKey, note_id: &str, now: DateTime<Utc>) -> Dismissal {
        self.hide(scope, note_id);
        Dismissal {
            scope: scope.clone(),
            note_id: note_id.to_string(),
            dismissed_at: now,
        }
    }

    /// Reverses a dismissal if it is still inside the undo window.
    pub fn undo(&self, dismissal: &Dismissal, now: DateTime<Utc>) -> bool {
        let elapsed = now.signed_duration_since(dismissal.dismissed_at);
        let within = match elapsed.to_std() {
            Ok(elapsed) => elapsed <= self.opts.undo_window,
            // Clock went backwards; treat as immediate.
            Err(_) => true,
        };
        if !within {
            tracing::debug!(note = %dismissal.note_id, "hidden: undo window expired");
            return false;
        }
        self.unhide(&dismissal.scope, &dismissal.note_id);
        true
    }

    /// Drops hidden notes, keeping the order of the rest.
    pub fn filter_visible<T: Identified>(&self, scope: &ScopeKey, notes: Vec<T>) -> Vec<T> {
        let ids = self.load(scope);
        if ids.is_empty() {
            return notes;
        }
        notes
            .into_iter()
            .filter(|note| !ids.iter().any(|id| id == note.id()))
            .collect()
    }

    fn load(&self, scope: &ScopeKey) -> Vec<String> {
        let key = scope.storage_key();
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(scope = %scope, error = ?err, "hidden: failed to read");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(ids) => ids,
            Err(err) => {
                tracing::warn!(scope = %scope, error = %err, "hidden: ignoring corrupt entry");
                Vec::new()
            }
        }
    }

    fn persist(&self, scope: &ScopeKey, ids: &[String]) {
        let ids = if ids.len() > self.opts.max_entries {
            &ids[ids.len() - self.opts.max_entries..]
        } else {
            ids
        };
        let encoded = match serde_json::to_string(ids) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(scope = %scope, error = %err, "hidden: failed to encode");
                return;
            }
        };
        if let Err(err) = self.store.set(&scope.storage_key(), &encoded) {
            tracing::warn!(scope = %scope, error = ?err, "hidden: failed to save");
        }
    }
}
