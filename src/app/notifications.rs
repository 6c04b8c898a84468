use std::str::FromStr;

use anyhow::Result;
use serde_json::{json, Value};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::notification::{Notification, NotificationKind};
use crate::infra::db::Db;
use crate::realtime::Dispatcher;

const EXCERPT_MAX_CHARS: usize = 50;

/// Shorten user content for embedding in a notification message: content
/// longer than 50 characters keeps the first 50 and gains a "..." suffix.
/// Counted in chars so multibyte content is never split.
pub fn excerpt(content: &str) -> String {
    if content.chars().count() <= EXCERPT_MAX_CHARS {
        return content.to_string();
    }
    let head: String = content.chars().take(EXCERPT_MAX_CHARS).collect();
    format!("{}...", head)
}

/// A notification built from event facts but not yet persisted. The
/// constructors own the title/message templates per kind; producers never
/// assemble these fields themselves.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub data: Value,
}

impl NewNotification {
    pub fn like(recipient_id: Uuid, sender_id: Uuid, post_id: Uuid, post_title: &str) -> Self {
        Self {
            kind: NotificationKind::Like,
            title: "New like".to_string(),
            message: format!("Your post \"{}\" received a new like.", post_title),
            recipient_id,
            sender_id: Some(sender_id),
            data: json!({ "postId": post_id }),
        }
    }

    pub fn comment(recipient_id: Uuid, sender_id: Uuid, post_id: Uuid, post_title: &str) -> Self {
        Self {
            kind: NotificationKind::Comment,
            title: "New comment".to_string(),
            message: format!("A new comment was left on your post \"{}\".", post_title),
            recipient_id,
            sender_id: Some(sender_id),
            data: json!({ "postId": post_id }),
        }
    }

    pub fn comment_like(
        recipient_id: Uuid,
        sender_id: Uuid,
        post_id: Uuid,
        comment_id: Uuid,
        comment_body: &str,
    ) -> Self {
        Self {
            kind: NotificationKind::CommentLike,
            title: "Comment liked".to_string(),
            message: format!("Your comment \"{}\" received a like.", excerpt(comment_body)),
            recipient_id,
            sender_id: Some(sender_id),
            data: json!({ "postId": post_id, "commentId": comment_id }),
        }
    }

    pub fn follow(recipient_id: Uuid, sender_id: Uuid) -> Self {
        Self {
            kind: NotificationKind::Follow,
            title: "New follower".to_string(),
            message: "A new user started following you.".to_string(),
            recipient_id,
            sender_id: Some(sender_id),
            data: json!({}),
        }
    }

    /// Administrative path: title and message come from the caller, there
    /// is no sender and no templating.
    pub fn system(recipient_id: Uuid, title: String, message: String, data: Option<Value>) -> Self {
        Self {
            kind: NotificationKind::System,
            title,
            message,
            recipient_id,
            sender_id: None,
            data: data.unwrap_or_else(|| json!({})),
        }
    }
}

#[derive(Debug)]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    pub total: i64,
}

/// Creates, stores and queries notifications, and hands fresh records to
/// the dispatcher for a best-effort live push.
#[derive(Clone)]
pub struct NotificationService {
    db: Db,
    dispatcher: Dispatcher,
}

impl NotificationService {
    pub fn new(db: Db, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }

    /// Persist, then push. Persistence failures propagate; a failed or
    /// skipped push does not — the caller always gets the stored record
    /// and the recipient's pull path stays authoritative.
    pub async fn create(&self, new: NewNotification) -> Result<Notification> {
        let notification = self.insert(new).await?;
        self.dispatcher
            .push_if_connected(notification.recipient_id, &notification);
        Ok(notification)
    }

    pub async fn notify_like(
        &self,
        recipient_id: Uuid,
        sender_id: Uuid,
        post_id: Uuid,
        post_title: &str,
    ) -> Result<Notification> {
        self.create(NewNotification::like(recipient_id, sender_id, post_id, post_title))
            .await
    }

    pub async fn notify_comment(
        &self,
        recipient_id: Uuid,
        sender_id: Uuid,
        post_id: Uuid,
        post_title: &str,
    ) -> Result<Notification> {
        self.create(NewNotification::comment(
            recipient_id,
            sender_id,
            post_id,
            post_title,
        ))
        .await
    }

    pub async fn notify_comment_like(
        &self,
        recipient_id: Uuid,
        sender_id: Uuid,
        post_id: Uuid,
        comment_id: Uuid,
        comment_body: &str,
    ) -> Result<Notification> {
        self.create(NewNotification::comment_like(
            recipient_id,
            sender_id,
            post_id,
            comment_id,
            comment_body,
        ))
        .await
    }

    pub async fn notify_follow(&self, recipient_id: Uuid, sender_id: Uuid) -> Result<Notification> {
        self.create(NewNotification::follow(recipient_id, sender_id))
            .await
    }

    pub async fn notify_system(
        &self,
        recipient_id: Uuid,
        title: String,
        message: String,
        data: Option<Value>,
    ) -> Result<Notification> {
        self.create(NewNotification::system(recipient_id, title, message, data))
            .await
    }

    // Ids are UUIDv7, generated here rather than by the database: they are
    // time-ordered, so the `id DESC` tiebreak keeps creation order even when
    // two rows share a `created_at` timestamp.
    async fn insert(&self, new: NewNotification) -> Result<Notification> {
        let row = sqlx::query(
            "INSERT INTO notifications (id, kind, title, message, recipient_id, sender_id, data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, kind, title, message, recipient_id, sender_id, data, is_read, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(new.kind.as_str())
        .bind(new.title)
        .bind(new.message)
        .bind(new.recipient_id)
        .bind(new.sender_id)
        .bind(new.data)
        .fetch_one(self.db.pool())
        .await?;

        decode_notification(&row)
    }

    /// Newest-first page of the recipient's notifications. The total is
    /// counted separately from the page window so the last page still
    /// reports it correctly.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: i64,
        page_size: i64,
    ) -> Result<NotificationPage> {
        let offset = (page - 1) * page_size;

        let rows = sqlx::query(
            "SELECT id, kind, title, message, recipient_id, sender_id, data, is_read, created_at \
             FROM notifications \
             WHERE recipient_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page_size)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE recipient_id = $1")
                .bind(user_id)
                .fetch_one(self.db.pool())
                .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(decode_notification(&row)?);
        }

        Ok(NotificationPage { items, total })
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(count)
    }

    /// Ownership is enforced in the WHERE clause: a caller who does not own
    /// the row affects nothing and cannot tell "not found" from "not
    /// yours". Reads are monotonic; a read row is never updated again.
    pub async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true \
             WHERE id = $1 AND recipient_id = $2 AND is_read = false",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true \
             WHERE recipient_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(&self, notification_id: Uuid, user_id: Uuid) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM notifications WHERE id = $1 AND recipient_id = $2")
                .bind(notification_id)
                .bind(user_id)
                .execute(self.db.pool())
                .await?;

        Ok(result.rows_affected())
    }
}

fn decode_notification(row: &PgRow) -> Result<Notification> {
    let kind: String = row.get("kind");
    Ok(Notification {
        id: row.get("id"),
        kind: NotificationKind::from_str(&kind)?,
        title: row.get("title"),
        message: row.get("message"),
        recipient_id: row.get("recipient_id"),
        sender_id: row.get("sender_id"),
        data: row.get("data"),
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
    })
}
