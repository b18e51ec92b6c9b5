use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::wizard::WizardSession;

pub type SharedSession = Arc<Mutex<WizardSession>>;

struct Entry {
    session: SharedSession,
    last_seen: Instant,
}

/// In-memory registry of wizard sessions. Nothing is persisted: a session
/// ends when it is deleted, when it sits idle past the configured TTL, or
/// when the process exits.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Entry>>>,
}

impl SessionStore {
    pub async fn create(&self) -> SharedSession {
        let session = WizardSession::new();
        let id = session.id;
        let shared = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(
            id,
            Entry {
                session: shared.clone(),
                last_seen: Instant::now(),
            },
        );
        info!("Created wizard session {id}");
        shared
    }

    /// Looks up a session and marks it as active.
    pub async fn get(&self, id: Uuid) -> Result<SharedSession, AppError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
        entry.last_seen = Instant::now();
        Ok(entry.session.clone())
    }

    /// Ends a session, dropping all of its state.
    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                info!("Ended wizard session {id}");
                Ok(())
            }
            None => Err(AppError::NotFound(format!("Session {id} not found"))),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops every session not touched within `ttl`. Returns how many went.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let keep = now.duration_since(entry.last_seen) < ttl;
            if !keep {
                debug!("Evicting idle wizard session {id}");
            }
            keep
        });
        before - sessions.len()
    }

    /// Background task that runs `evict_idle` every `every`.
    pub fn spawn_sweeper(&self, ttl: Duration, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        let every = every.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle(ttl).await;
                if evicted > 0 {
                    info!("Evicted {evicted} idle wizard sessions");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_get_remove() {
        let store = SessionStore::default();
        let session = store.create().await;
        let id = session.lock().await.id;

        assert!(store.get(id).await.is_ok());
        assert_eq!(store.len().await, 1);

        store.remove(id).await.unwrap();
        assert!(matches!(store.get(id).await, Err(AppError::NotFound(_))));
        assert!(store.remove(id).await.is_err());
    }

    #[tokio::test]
    async fn test_clones_share_sessions() {
        let store = SessionStore::default();
        let other = store.clone();
        let session = store.create().await;
        let id = session.lock().await.id;
        assert!(other.get(id).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_idle_keeps_recently_used_sessions() {
        let store = SessionStore::default();
        let idle = store.create().await.lock().await.id;
        let active = store.create().await.lock().await.id;

        tokio::time::advance(Duration::from_secs(50)).await;
        store.get(active).await.unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(store.evict_idle(Duration::from_secs(60)).await, 1);
        assert!(store.get(idle).await.is_err());
        assert!(store.get(active).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_abandoned_sessions() {
        let store = SessionStore::default();
        store.create().await;
        let sweeper = store.spawn_sweeper(Duration::from_secs(300), Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(240)).await;
        assert_eq!(store.len().await, 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(store.len().await, 0);
        sweeper.abort();
    }
}
