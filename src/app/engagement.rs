use anyhow::Result;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::engagement::{Comment, CommentLike, Like};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct EngagementService {
    db: Db,
}

impl EngagementService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Returns None when the user already liked the post (idempotent).
    pub async fn like_post(&self, user_id: Uuid, post_id: Uuid) -> Result<Option<Like>> {
        let row = sqlx::query(
            "INSERT INTO likes (user_id, post_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING \
             RETURNING id, user_id, post_id, created_at",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(self.db.pool())
        .await?;

        let like = row.map(|row| Like {
            id: row.get("id"),
            user_id: row.get("user_id"),
            post_id: row.get("post_id"),
            created_at: row.get("created_at"),
        });

        Ok(like)
    }

    pub async fn unlike_post(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn comment_post(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        body: String,
    ) -> Result<Comment> {
        let row = sqlx::query(
            "INSERT INTO comments (author_id, post_id, body) VALUES ($1, $2, $3) \
             RETURNING id, author_id, post_id, body, created_at",
        )
        .bind(author_id)
        .bind(post_id)
        .bind(body)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Comment {
            id: row.get("id"),
            author_id: row.get("author_id"),
            post_id: row.get("post_id"),
            body: row.get("body"),
            created_at: row.get("created_at"),
        })
    }

    pub async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        let row = sqlx::query(
            "SELECT id, author_id, post_id, body, created_at \
             FROM comments WHERE id = $1",
        )
        .bind(comment_id)
        .fetch_optional(self.db.pool())
        .await?;

        let comment = row.map(|row| Comment {
            id: row.get("id"),
            author_id: row.get("author_id"),
            post_id: row.get("post_id"),
            body: row.get("body"),
            created_at: row.get("created_at"),
        });

        Ok(comment)
    }

    pub async fn delete_comment(&self, comment_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1 AND author_id = $2")
            .bind(comment_id)
            .bind(author_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_comments(
        &self,
        post_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Comment>> {
        let rows = match cursor {
            Some((created_at, comment_id)) => {
                sqlx::query(
                    "SELECT id, author_id, post_id, body, created_at \
                     FROM comments \
                     WHERE post_id = $1 \
                       AND (created_at < $2 OR (created_at = $2 AND id < $3)) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $4",
                )
                .bind(post_id)
                .bind(created_at)
                .bind(comment_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, author_id, post_id, body, created_at \
                     FROM comments \
                     WHERE post_id = $1 \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $2",
                )
                .bind(post_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let mut comments = Vec::with_capacity(rows.len());
        for row in rows {
            comments.push(Comment {
                id: row.get("id"),
                author_id: row.get("author_id"),
                post_id: row.get("post_id"),
                body: row.get("body"),
                created_at: row.get("created_at"),
            });
        }

        Ok(comments)
    }

    /// Returns None when the user already liked the comment (idempotent).
    pub async fn like_comment(
        &self,
        user_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Option<CommentLike>> {
        let row = sqlx::query(
            "INSERT INTO comment_likes (user_id, comment_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING \
             RETURNING id, user_id, comment_id, created_at",
        )
        .bind(user_id)
        .bind(comment_id)
        .fetch_optional(self.db.pool())
        .await?;

        let like = row.map(|row| CommentLike {
            id: row.get("id"),
            user_id: row.get("user_id"),
            comment_id: row.get("comment_id"),
            created_at: row.get("created_at"),
        });

        Ok(like)
    }

    pub async fn unlike_comment(&self, user_id: Uuid, comment_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM comment_likes WHERE user_id = $1 AND comment_id = $2")
                .bind(user_id)
                .bind(comment_id)
                .execute(self.db.pool())
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
