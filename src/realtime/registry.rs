use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::realtime::events::ServerEvent;

/// Outbound half of one live socket. The session id distinguishes this
/// socket from any later socket the same user opens, which is what makes
/// conditional eviction possible.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: Uuid,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

impl SessionHandle {
    pub fn new(session_id: Uuid, sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self { session_id, sender }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Queue an event for this session. Returns false when the socket's
    /// forward task has already gone away.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Process-wide map from user id to that user's current live session.
///
/// At most one session per user: `register` is last-writer-wins, so a
/// reconnect simply replaces the previous handle. `unregister` only evicts
/// when the departing session is still the registered one — a late
/// disconnect for a superseded socket must not knock the replacement
/// offline. Everything here is lost on restart; clients re-join.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoning is recovered rather than propagated: every critical section
    // is a single map operation, so the map is consistent even if a holder
    // panicked, and a poisoned lock must not turn later pushes into panics.
    fn read_sessions(&self) -> RwLockReadGuard<'_, HashMap<Uuid, SessionHandle>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, SessionHandle>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register(&self, user_id: Uuid, handle: SessionHandle) {
        self.write_sessions().insert(user_id, handle);
    }

    /// Conditional removal: evicts only if `session_id` still owns the
    /// entry. Returns whether an entry was removed.
    pub fn unregister(&self, user_id: Uuid, session_id: Uuid) -> bool {
        let mut sessions = self.write_sessions();
        match sessions.get(&user_id) {
            Some(current) if current.session_id() == session_id => {
                sessions.remove(&user_id);
                true
            }
            _ => false,
        }
    }

    pub fn lookup(&self, user_id: Uuid) -> Option<SessionHandle> {
        self.read_sessions().get(&user_id).cloned()
    }

    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.read_sessions().contains_key(&user_id)
    }

    pub fn count(&self) -> usize {
        self.read_sessions().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> (SessionHandle, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SessionHandle::new(Uuid::new_v4(), tx), rx)
    }

    #[test]
    fn register_and_lookup() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (session, _rx) = handle();

        assert!(!registry.is_online(user));
        registry.register(user, session.clone());

        assert!(registry.is_online(user));
        assert_eq!(registry.count(), 1);
        assert_eq!(
            registry.lookup(user).unwrap().session_id(),
            session.session_id()
        );
    }

    #[test]
    fn second_registration_wins() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (first, _rx_a) = handle();
        let (second, _rx_b) = handle();

        registry.register(user, first);
        registry.register(user, second.clone());

        assert_eq!(registry.count(), 1);
        assert_eq!(
            registry.lookup(user).unwrap().session_id(),
            second.session_id()
        );
    }

    #[test]
    fn stale_disconnect_does_not_evict_replacement() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (old, _rx_a) = handle();
        let (new, _rx_b) = handle();

        registry.register(user, old.clone());
        registry.register(user, new.clone());

        // The old socket's disconnect arrives after the reconnect.
        assert!(!registry.unregister(user, old.session_id()));
        assert!(registry.is_online(user));
        assert_eq!(
            registry.lookup(user).unwrap().session_id(),
            new.session_id()
        );

        // The current session's disconnect does evict.
        assert!(registry.unregister(user, new.session_id()));
        assert!(!registry.is_online(user));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn unregister_unknown_user_is_a_no_op() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.unregister(Uuid::new_v4(), Uuid::new_v4()));
    }

    #[test]
    fn poisoned_lock_does_not_take_the_registry_down() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (session, _rx) = handle();
        registry.register(user, session.clone());

        // Panic while holding the write lock to poison it.
        let poisoner = registry.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.write().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(registry.inner.is_poisoned());

        assert!(registry.is_online(user));
        assert_eq!(
            registry.lookup(user).unwrap().session_id(),
            session.session_id()
        );
        assert!(registry.unregister(user, session.session_id()));
        assert_eq!(registry.count(), 0);
    }
}
