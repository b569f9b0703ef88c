use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::info;

const SESSION_CHANNEL_CAPACITY: usize = 256;

/// Open SSE sessions, keyed by session id. Each entry is the sending half of
/// the channel feeding that session's event stream.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: RwLock<HashMap<String, mpsc::Sender<String>>>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_session(&self) -> (String, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        let session_id = uuid::Uuid::new_v4().simple().to_string();
        self.sessions.write().await.insert(session_id.clone(), tx);
        info!(session_id = %session_id, "Session opened");
        (session_id, rx)
    }

    pub async fn sender(&self, session_id: &str) -> Option<mpsc::Sender<String>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn has_session(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    pub async fn remove_session(&self, session_id: &str) {
        if self.sessions.write().await.remove(session_id).is_some() {
            info!(session_id = %session_id, "Session closed");
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops every sender so all event streams end.
    pub async fn close_all(&self) {
        let mut sessions = self.sessions.write().await;
        if !sessions.is_empty() {
            info!(count = sessions.len(), "Closing all sessions");
        }
        sessions.clear();
    }
}

/// Removes its session when the event stream owning it is dropped.
pub(crate) struct SessionGuard {
    pub sessions: Arc<SessionTable>,
    pub session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let sessions = self.sessions.clone();
        let session_id = std::mem::take(&mut self.session_id);
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                sessions.remove_session(&session_id).await;
            });
        }
    }
}
