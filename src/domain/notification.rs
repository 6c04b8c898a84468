use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// Closed set of notification kinds. The kind decides which message
/// template and context payload a notification carries; a row with a kind
/// outside this set fails to decode instead of leaking through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
    CommentLike,
    Follow,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::CommentLike => "comment_like",
            Self::Follow => "follow",
            Self::System => "system",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "like" => Ok(Self::Like),
            "comment" => Ok(Self::Comment),
            "comment_like" => Ok(Self::CommentLike),
            "follow" => Ok(Self::Follow),
            "system" => Ok(Self::System),
            other => Err(anyhow!("unknown notification kind: {}", other)),
        }
    }
}

/// A durable user-directed event. Serialized in camelCase because this
/// struct is also the `newNotification` push payload clients consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub data: Value,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
