use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::calendar::Session;
use crate::storage::session_file::{SessionStorage, SessionStorageError, StoredSession};
use crate::sync::api::AuthApi;
use crate::sync::transport::TransportError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("Session storage error: {0}")]
    Storage(#[from] SessionStorageError),
}

/// Signed-in identity plus the side menu toggle. Every change is written
/// through to the session file when one is configured.
pub struct SessionStore {
    api: Arc<dyn AuthApi>,
    storage: Option<SessionStorage>,
    state: Mutex<Session>,
}

impl SessionStore {
    pub fn new(api: Arc<dyn AuthApi>, storage: Option<SessionStorage>) -> Self {
        Self {
            api,
            storage,
            state: Mutex::new(Session::default()),
        }
    }

    /// Picks up the session stored by a previous run, if any.
    pub async fn restore(&self) -> Result<(), SessionError> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };

        match storage.load()? {
            Some(stored) => {
                tracing::info!("Restored session for {}", stored.session.name);
                self.api.restore_session_token(stored.token);
                *self.state.lock().await = stored.session;
            }
            None => tracing::debug!("No stored session at {}", storage.path().display()),
        }
        Ok(())
    }

    pub async fn current(&self) -> Session {
        self.state.lock().await.clone()
    }

    pub async fn is_signed_in(&self) -> bool {
        self.state.lock().await.signed_in
    }

    pub async fn user_id(&self) -> Option<String> {
        let session = self.state.lock().await;
        session.signed_in.then(|| session.id.clone())
    }

    pub async fn set_user(&self, id: &str, name: &str) {
        let mut session = self.state.lock().await;
        let side_menu_open = session.side_menu_open;
        *session = Session::signed_in(id, name);
        session.side_menu_open = side_menu_open;
        self.persist(&session);
    }

    pub async fn sign_in(&self, name: &str, password: &str) -> bool {
        match self.api.sign_in(name, password).await {
            Ok(id) => {
                tracing::info!("Signed in as {} ({})", name, id);
                self.set_user(&id, name).await;
                true
            }
            Err(e) => {
                tracing::warn!("Sign in failed for {}: {}", name, e);
                false
            }
        }
    }

    pub async fn sign_up(&self, name: &str, password: &str) -> bool {
        match self.api.sign_up(name, password).await {
            Ok(()) => {
                tracing::info!("Signed up as {}", name);
                true
            }
            Err(e) => {
                tracing::warn!("Sign up failed for {}: {}", name, e);
                false
            }
        }
    }

    /// Forgets the local session even when the server call fails; the
    /// failure is still reported.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        let result = self.api.sign_out().await;
        if let Err(e) = &result {
            tracing::warn!("Sign out request failed, clearing local session anyway: {}", e);
        }

        *self.state.lock().await = Session::default();
        self.api.restore_session_token(None);
        if let Some(storage) = &self.storage {
            storage.clear()?;
        }

        result.map_err(SessionError::from)
    }

    pub async fn set_side_menu(&self, open: bool) {
        let mut session = self.state.lock().await;
        session.side_menu_open = open;
        self.persist(&session);
    }

    pub async fn toggle_side_menu(&self) -> bool {
        let mut session = self.state.lock().await;
        session.side_menu_open = !session.side_menu_open;
        self.persist(&session);
        session.side_menu_open
    }

    fn persist(&self, session: &Session) {
        let Some(storage) = &self.storage else {
            return;
        };
        let stored = StoredSession {
            session: session.clone(),
            token: self.api.session_token(),
        };
        if let Err(e) = storage.save(&stored) {
            tracing::warn!("Failed to store session at {}: {}", storage.path().display(), e);
        }
    }
}
