use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::notification::Notification;

/// Frames sent to a connected client. Wire shape is
/// `{"event": <name>, "data": <payload>}`; the event names are the contract
/// clients key their listeners on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    NewNotification(Notification),
    #[serde(rename_all = "camelCase")]
    NotificationMarkedAsRead { notification_id: Uuid },
    AllNotificationsMarkedAsRead,
}

/// Control frames a client may send over the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientCommand {
    #[serde(rename_all = "camelCase")]
    Join { user_id: Uuid },
    #[serde(rename_all = "camelCase")]
    MarkAsRead { notification_id: Uuid },
    MarkAllAsRead,
}
