use axum::{routing::delete, routing::get, routing::post, Router};

use crate::http::{handlers, ws};
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh_token))
        .route("/auth/revoke", post(handlers::revoke_token))
        .route("/auth/me", get(handlers::get_current_user))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users", post(handlers::create_user))
        .route("/users/:id", get(handlers::get_user))
        .route("/users/:id/posts", get(handlers::list_user_posts))
        .route("/users/:id/follow", post(handlers::follow_user))
        .route("/users/:id/unfollow", post(handlers::unfollow_user))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/posts", post(handlers::create_post))
        .route("/posts/:id", get(handlers::get_post))
        .route("/posts/:id", delete(handlers::delete_post))
        .route("/posts/:id/like", post(handlers::like_post))
        .route("/posts/:id/like", delete(handlers::unlike_post))
        .route("/posts/:id/comment", post(handlers::comment_post))
        .route("/posts/:id/comments", get(handlers::list_post_comments))
        .route("/comments/:id", delete(handlers::delete_comment))
        .route("/comments/:id/like", post(handlers::like_comment))
        .route("/comments/:id/like", delete(handlers::unlike_comment))
}

pub fn notifications() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(handlers::list_notifications))
        .route(
            "/notifications/unread-count",
            get(handlers::unread_notification_count),
        )
        .route(
            "/notifications/:id/read",
            post(handlers::mark_notification_read),
        )
        .route(
            "/notifications/read-all",
            post(handlers::mark_all_notifications_read),
        )
        .route("/notifications/:id", delete(handlers::delete_notification))
}

pub fn admin() -> Router<AppState> {
    Router::new().route(
        "/admin/notifications",
        post(handlers::create_system_notification),
    )
}

pub fn realtime() -> Router<AppState> {
    Router::new().route("/ws", get(ws::upgrade))
}
