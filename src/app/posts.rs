use anyhow::Result;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::post::Post;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_post(&self, author_id: Uuid, title: String, content: String) -> Result<Post> {
        let row = sqlx::query(
            "WITH inserted_post AS ( \
                INSERT INTO posts (author_id, title, content) \
                VALUES ($1, $2, $3) \
                RETURNING id, author_id, title, content, created_at \
             ) \
             SELECT p.*, u.handle AS author_handle \
             FROM inserted_post p \
             JOIN users u ON p.author_id = u.id",
        )
        .bind(author_id)
        .bind(title)
        .bind(content)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Post {
            id: row.get("id"),
            author_id: row.get("author_id"),
            author_handle: Some(row.get("author_handle")),
            title: row.get("title"),
            content: row.get("content"),
            created_at: row.get("created_at"),
        })
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query(
            "SELECT p.id, p.author_id, u.handle AS author_handle, p.title, p.content, p.created_at \
             FROM posts p \
             JOIN users u ON p.author_id = u.id \
             WHERE p.id = $1",
        )
        .bind(post_id)
        .fetch_optional(self.db.pool())
        .await?;

        let post = row.map(|row| Post {
            id: row.get("id"),
            author_id: row.get("author_id"),
            author_handle: Some(row.get("author_handle")),
            title: row.get("title"),
            content: row.get("content"),
            created_at: row.get("created_at"),
        });

        Ok(post)
    }

    pub async fn list_user_posts(
        &self,
        author_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        limit: i64,
    ) -> Result<Vec<Post>> {
        let rows = match cursor {
            Some((created_at, post_id)) => {
                sqlx::query(
                    "SELECT p.id, p.author_id, u.handle AS author_handle, p.title, p.content, p.created_at \
                     FROM posts p \
                     JOIN users u ON p.author_id = u.id \
                     WHERE p.author_id = $1 \
                       AND (p.created_at < $2 OR (p.created_at = $2 AND p.id < $3)) \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $4",
                )
                .bind(author_id)
                .bind(created_at)
                .bind(post_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT p.id, p.author_id, u.handle AS author_handle, p.title, p.content, p.created_at \
                     FROM posts p \
                     JOIN users u ON p.author_id = u.id \
                     WHERE p.author_id = $1 \
                     ORDER BY p.created_at DESC, p.id DESC \
                     LIMIT $2",
                )
                .bind(author_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let mut posts = Vec::with_capacity(rows.len());
        for row in rows {
            posts.push(Post {
                id: row.get("id"),
                author_id: row.get("author_id"),
                author_handle: Some(row.get("author_handle")),
                title: row.get("title"),
                content: row.get("content"),
                created_at: row.get("created_at"),
            });
        }

        Ok(posts)
    }

    pub async fn delete_post(&self, post_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
            .bind(post_id)
            .bind(author_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
