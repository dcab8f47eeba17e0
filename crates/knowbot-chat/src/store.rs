//! Session storage.
//!
//! Each record pairs an immutable [`Session`] with its mutable
//! [`Conversation`]. The conversation sits behind its own async mutex so a
//! chat turn can hold it across the completion call while turns on other
//! sessions proceed. The map lock only guards insert, lookup and removal and
//! is never held across an await.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use knowbot_core::{Conversation, Session, SessionId};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error};

use crate::error::ChatError;

/// Storage seam for sessions and their conversations.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session holding `knowledge` with an empty conversation.
    async fn create(&self, knowledge: String) -> Result<SessionId, ChatError>;

    /// Fetch the immutable session data.
    async fn get(&self, id: &SessionId) -> Result<Session, ChatError>;

    /// Snapshot of the session's conversation.
    async fn conversation(&self, id: &SessionId) -> Result<Conversation, ChatError>;

    /// Clear context and history. Idempotent.
    async fn reset_conversation(&self, id: &SessionId) -> Result<(), ChatError>;

    /// Take exclusive access to a session for the duration of a turn.
    async fn lease(&self, id: &SessionId) -> Result<SessionLease, ChatError>;

    /// Evict every session older than the store's TTL at `now`.
    ///
    /// Returns the number of evicted sessions.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> usize;

    /// Number of live sessions.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct RecordState {
    conversation: Conversation,
    evicted: bool,
}

#[derive(Clone)]
struct Entry {
    session: Arc<Session>,
    state: Arc<Mutex<RecordState>>,
}

/// Exclusive handle on one session's conversation.
///
/// Other leases, resets and the sweep wait (or skip) until it is dropped.
pub struct SessionLease {
    session: Arc<Session>,
    guard: OwnedMutexGuard<RecordState>,
}

impl SessionLease {
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn conversation(&self) -> &Conversation {
        &self.guard.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.guard.conversation
    }
}

impl Deref for SessionLease {
    type Target = Conversation;

    fn deref(&self) -> &Conversation {
        self.conversation()
    }
}

/// Process-local session store.
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<SessionId, Entry>>,
    ttl: chrono::Duration,
}

impl InMemorySessionStore {
    /// Create an empty store evicting sessions older than `ttl`.
    pub fn new(ttl: chrono::Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<SessionId, Entry>>, ChatError> {
        self.entries
            .read()
            .map_err(|e| ChatError::Internal(format!("Lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<SessionId, Entry>>, ChatError> {
        self.entries
            .write()
            .map_err(|e| ChatError::Internal(format!("Lock poisoned: {}", e)))
    }

    fn entry(&self, id: &SessionId) -> Result<Entry, ChatError> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| ChatError::SessionNotFound(id.clone()))
    }

    /// Lock a record's state, failing if the sweep removed it meanwhile.
    async fn lock_live(
        &self,
        id: &SessionId,
    ) -> Result<(Arc<Session>, OwnedMutexGuard<RecordState>), ChatError> {
        let entry = self.entry(id)?;
        let guard = entry.state.lock_owned().await;
        if guard.evicted {
            return Err(ChatError::SessionNotFound(id.clone()));
        }
        Ok((entry.session, guard))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, knowledge: String) -> Result<SessionId, ChatError> {
        let session = Session::new(knowledge);
        let id = session.id.clone();
        let entry = Entry {
            session: Arc::new(session),
            state: Arc::new(Mutex::new(RecordState {
                conversation: Conversation::default(),
                evicted: false,
            })),
        };

        self.write()?.insert(id.clone(), entry);
        debug!(session_id = %id, "Session created");
        Ok(id)
    }

    async fn get(&self, id: &SessionId) -> Result<Session, ChatError> {
        let entry = self.entry(id)?;
        Ok(entry.session.as_ref().clone())
    }

    async fn conversation(&self, id: &SessionId) -> Result<Conversation, ChatError> {
        let (_, guard) = self.lock_live(id).await?;
        Ok(guard.conversation.clone())
    }

    async fn reset_conversation(&self, id: &SessionId) -> Result<(), ChatError> {
        let (_, mut guard) = self.lock_live(id).await?;
        guard.conversation.reset();
        debug!(session_id = %id, "Conversation reset");
        Ok(())
    }

    async fn lease(&self, id: &SessionId) -> Result<SessionLease, ChatError> {
        let (session, guard) = self.lock_live(id).await?;
        Ok(SessionLease { session, guard })
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let candidates: Vec<(SessionId, Entry)> = match self.read() {
            Ok(map) => map
                .iter()
                .filter(|(_, entry)| entry.session.is_expired_at(now, self.ttl))
                .map(|(id, entry)| (id.clone(), entry.clone()))
                .collect(),
            Err(e) => {
                error!(error = %e, "Expiry sweep aborted");
                return 0;
            }
        };

        let mut evicted = 0;
        for (id, entry) in candidates {
            // A held lock means a turn is in flight; retry on the next sweep.
            let Ok(mut guard) = entry.state.try_lock_owned() else {
                debug!(session_id = %id, "Session busy, eviction deferred");
                continue;
            };

            match self.write() {
                Ok(mut map) => {
                    guard.evicted = true;
                    map.remove(&id);
                    evicted += 1;
                }
                Err(e) => {
                    error!(error = %e, "Expiry sweep aborted");
                    break;
                }
            }
        }

        evicted
    }

    fn len(&self) -> usize {
        match self.read() {
            Ok(map) => map.len(),
            Err(e) => {
                error!(error = %e, "Session count unavailable");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowbot_core::ContextTag;
    use std::time::Duration;

    fn store() -> InMemorySessionStore {
        InMemorySessionStore::new(chrono::Duration::hours(1))
    }

    fn past_ttl(store: &InMemorySessionStore) -> DateTime<Utc> {
        Utc::now() + store.ttl() + chrono::Duration::seconds(1)
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = store();
        let id = store.create("La tienda abre a las 9am.".into()).await.unwrap();

        let session = store.get(&id).await.unwrap();
        assert_eq!(session.id, id);
        assert_eq!(session.knowledge, "La tienda abre a las 9am.");

        let conv = store.conversation(&id).await.unwrap();
        assert!(conv.context.is_none());
        assert!(conv.history.is_empty());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let store = store();
        let id = SessionId::from("missing");
        assert!(matches!(
            store.get(&id).await,
            Err(ChatError::SessionNotFound(_))
        ));
        assert!(matches!(
            store.conversation(&id).await,
            Err(ChatError::SessionNotFound(_))
        ));
        assert!(matches!(
            store.reset_conversation(&id).await,
            Err(ChatError::SessionNotFound(_))
        ));
        assert!(matches!(
            store.lease(&id).await,
            Err(ChatError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ids_are_distinct() {
        let store = store();
        let a = store.create("a".into()).await.unwrap();
        let b = store.create("b".into()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.get(&b).await.unwrap().knowledge, "b");
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let store = store();
        let id = store.create("k".into()).await.unwrap();
        {
            let mut lease = store.lease(&id).await.unwrap();
            let conv = lease.conversation_mut();
            conv.context = Some(ContextTag::Apartado360);
            conv.record_exchange("q".into(), "a".into(), 10);
        }

        store.reset_conversation(&id).await.unwrap();
        let once = store.conversation(&id).await.unwrap();
        store.reset_conversation(&id).await.unwrap();
        let twice = store.conversation(&id).await.unwrap();

        assert!(once.is_empty());
        assert_eq!(once, twice);
        // Knowledge is untouched by reset.
        assert_eq!(store.get(&id).await.unwrap().knowledge, "k");
    }

    #[tokio::test]
    async fn test_sweep_keeps_fresh_sessions() {
        let store = store();
        store.create("k".into()).await.unwrap();
        assert_eq!(store.sweep_expired(Utc::now()).await, 0);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_swept_session_is_not_found() {
        let store = store();
        let id = store.create("k".into()).await.unwrap();

        assert_eq!(store.sweep_expired(past_ttl(&store)).await, 1);
        assert!(store.is_empty());
        assert!(matches!(
            store.get(&id).await,
            Err(ChatError::SessionNotFound(_))
        ));
        assert!(matches!(
            store.conversation(&id).await,
            Err(ChatError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sweep_skips_leased_session() {
        let store = store();
        let id = store.create("k".into()).await.unwrap();

        let lease = store.lease(&id).await.unwrap();
        assert_eq!(store.sweep_expired(past_ttl(&store)).await, 0);
        assert_eq!(store.len(), 1);
        drop(lease);

        assert_eq!(store.sweep_expired(past_ttl(&store)).await, 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_waiting_lease_observes_eviction() {
        let store = Arc::new(store());
        let id = store.create("k".into()).await.unwrap();

        // Grab the entry and its lock ahead of a sweep, mimicking a lease
        // that looked the session up just before eviction.
        let entry = store.entry(&id).unwrap();
        let far_future = past_ttl(&store);
        assert_eq!(store.sweep_expired(far_future).await, 1);

        let guard = entry.state.lock_owned().await;
        assert!(guard.evicted);
        drop(guard);

        assert!(matches!(
            store.lease(&id).await,
            Err(ChatError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_lease_serializes_turns_on_same_session() {
        let store = Arc::new(store());
        let id = store.create("k".into()).await.unwrap();

        let first = store.lease(&id).await.unwrap();

        let waiter = {
            let store = Arc::clone(&store);
            let id = id.clone();
            tokio::spawn(async move {
                let mut lease = store.lease(&id).await.unwrap();
                lease
                    .conversation_mut()
                    .record_exchange("second".into(), "b".into(), 10);
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        let mut first = first;
        first
            .conversation_mut()
            .record_exchange("first".into(), "a".into(), 10);
        drop(first);

        waiter.await.unwrap();
        let conv = store.conversation(&id).await.unwrap();
        let users: Vec<&str> = conv
            .history
            .iter()
            .step_by(2)
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(users, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_other_sessions_not_blocked_by_lease() {
        let store = store();
        let a = store.create("a".into()).await.unwrap();
        let b = store.create("b".into()).await.unwrap();

        let _lease = store.lease(&a).await.unwrap();
        let conv = tokio::time::timeout(Duration::from_secs(1), store.conversation(&b))
            .await
            .expect("conversation on another session should not block")
            .unwrap();
        assert!(conv.is_empty());
        assert_eq!(
            store.get(&a).await.unwrap().knowledge,
            "a",
            "session data stays readable while leased"
        );
    }

    #[tokio::test]
    async fn test_lease_exposes_session_and_conversation() {
        let store = store();
        let id = store.create("knowledge".into()).await.unwrap();
        let lease = store.lease(&id).await.unwrap();
        assert_eq!(lease.session().knowledge, "knowledge");
        assert!(lease.history.is_empty());
    }

    #[tokio::test]
    async fn test_len_on_poisoned_map_is_zero() {
        let store = Arc::new(store());
        store.create("knowledge".into()).await.unwrap();
        assert_eq!(store.len(), 1);

        let poisoner = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.write().unwrap();
            panic!("poison the session map");
        })
        .join();

        assert!(store.entries.is_poisoned());
        assert_eq!(store.len(), 0);
        assert!(matches!(
            store.create("more".into()).await,
            Err(ChatError::Internal(_))
        ));
    }
}
