use uuid::Uuid;

use crate::domain::notification::Notification;
use crate::realtime::events::ServerEvent;
use crate::realtime::registry::ConnectionRegistry;

/// Best-effort delivery to live sessions. Pushing is distinct from
/// persisting: a notification that cannot be pushed stays retrievable
/// through the pull path, so nothing here ever returns an error.
#[derive(Clone, Default)]
pub struct Dispatcher {
    registry: ConnectionRegistry,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Deliver `newNotification` to the recipient's session if one is
    /// registered. Offline recipients and closed channels are silent
    /// no-ops; there is no retry.
    pub fn push_if_connected(&self, recipient_id: Uuid, notification: &Notification) -> bool {
        let Some(session) = self.registry.lookup(recipient_id) else {
            tracing::debug!(recipient_id = %recipient_id, "recipient offline, skipping push");
            return false;
        };

        if !session.send(ServerEvent::NewNotification(notification.clone())) {
            tracing::warn!(
                recipient_id = %recipient_id,
                session_id = %session.session_id(),
                "session channel closed, dropping push"
            );
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::NotificationKind;
    use crate::realtime::registry::SessionHandle;
    use time::OffsetDateTime;
    use tokio::sync::mpsc;

    fn notification(recipient_id: Uuid) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            kind: NotificationKind::Follow,
            title: "New follower".into(),
            message: "A new user started following you.".into(),
            recipient_id,
            sender_id: Some(Uuid::new_v4()),
            data: serde_json::json!({}),
            is_read: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn push_to_registered_session_delivers() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatcher
            .registry()
            .register(user, SessionHandle::new(Uuid::new_v4(), tx));

        let notification = notification(user);
        assert!(dispatcher.push_if_connected(user, &notification));

        match rx.recv().await.unwrap() {
            ServerEvent::NewNotification(delivered) => {
                assert_eq!(delivered.id, notification.id);
                assert_eq!(delivered.recipient_id, user);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn push_to_offline_recipient_is_a_no_op() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        assert!(!dispatcher.push_if_connected(user, &notification(user)));
    }

    #[tokio::test]
    async fn push_to_closed_channel_is_swallowed() {
        let dispatcher = Dispatcher::new();
        let user = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        dispatcher
            .registry()
            .register(user, SessionHandle::new(Uuid::new_v4(), tx));
        drop(rx);

        assert!(!dispatcher.push_if_connected(user, &notification(user)));
    }
}
