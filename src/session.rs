use anyhow::{bail, Context, Result};
use parking_lot::RwLock;

use crate::hidden::ScopeKey;
use crate::storage::KeyValueStore;

const ACTIVE_USER_KEY: &str = "session:active_user";

/// Supplies the identity of whoever is using the client right now.
pub trait IdentityProvider {
    fn current_user_id(&self) -> Option<String>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("user id must not be empty")]
    EmptyUserId,
}

/// Tracks the signed-in user and remembers it across runs.
pub struct Manager<S> {
    store: S,
    active_id: RwLock<Option<String>>,
}

impl<S: KeyValueStore> Manager<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            active_id: RwLock::new(None),
        }
    }

    pub fn load_existing(&self) -> Result<()> {
        let saved = self
            .store
            .get(ACTIVE_USER_KEY)
            .context("session: load active user")?
            .filter(|id| !id.trim().is_empty());
        if let Some(id) = saved.as_deref() {
            tracing::debug!(user = id, "session: resumed");
        }
        *self.active_id.write() = saved;
        Ok(())
    }

    pub fn active_user(&self) -> Option<String> {
        self.active_id.read().clone()
    }

    pub fn sign_in(&self, user_id: &str) -> Result<()> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            bail!(SessionError::EmptyUserId);
        }
        self.store
            .set(ACTIVE_USER_KEY, user_id)
            .context("session: save active user")?;
        *self.active_id.write() = Some(user_id.to_string());
        tracing::info!(user = user_id, "session: signed in");
        Ok(())
    }

    pub fn sign_out(&self) -> Result<()> {
        self.store
            .remove(ACTIVE_USER_KEY)
            .context("session: clear active user")?;
        if let Some(previous) = self.active_id.write().take() {
            tracing::info!(user = %previous, "session: signed out");
        }
        Ok(())
    }

    pub fn scope(&self) -> ScopeKey {
        ScopeKey::from_identity(self)
    }
}

impl<S: KeyValueStore> IdentityProvider for Manager<S> {
    fn current_user_id(&self) -> Option<String> {
        self.active_user()
    }
}
