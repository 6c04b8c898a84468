//! Social Graph Tests
//!
//! Covers follows, unfollows, and the follow notification producer.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use uuid::Uuid;

// ===========================================================================
// Follow System
// ===========================================================================

#[tokio::test]
async fn follow_user() {
    let Some(app) = app().await else { return };
    let user_a = app.create_user("soc_follow_a").await;
    let user_b = app.create_user("soc_follow_b").await;

    let resp = app
        .post_json(
            &format!("/users/{}/follow", user_b.id),
            json!({}),
            Some(&user_a.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["followed"].as_bool().unwrap(), true);
}

#[tokio::test]
async fn follow_already_following() {
    let Some(app) = app().await else { return };
    let user_a = app.create_user("soc_follow_dup_a").await;
    let user_b = app.create_user("soc_follow_dup_b").await;

    let resp = app
        .post_json(
            &format!("/users/{}/follow", user_b.id),
            json!({}),
            Some(&user_a.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["followed"].as_bool().unwrap(), true);

    // Follow again — idempotent, and no second notification.
    let resp = app
        .post_json(
            &format!("/users/{}/follow", user_b.id),
            json!({}),
            Some(&user_a.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["followed"].as_bool().unwrap(), false);

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND kind = 'follow'",
    )
    .bind(user_b.id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn follow_self() {
    let Some(app) = app().await else { return };
    let user = app.create_user("soc_follow_self").await;

    let resp = app
        .post_json(
            &format!("/users/{}/follow", user.id),
            json!({}),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "cannot follow yourself");
}

#[tokio::test]
async fn follow_nonexistent_user() {
    let Some(app) = app().await else { return };
    let user = app.create_user("soc_follow_ghost").await;

    let resp = app
        .post_json(
            &format!("/users/{}/follow", Uuid::new_v4()),
            json!({}),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unfollow_user() {
    let Some(app) = app().await else { return };
    let user_a = app.create_user("soc_unfollow_a").await;
    let user_b = app.create_user("soc_unfollow_b").await;

    app.post_json(
        &format!("/users/{}/follow", user_b.id),
        json!({}),
        Some(&user_a.access_token),
    )
    .await;

    let resp = app
        .post_json(
            &format!("/users/{}/unfollow", user_b.id),
            json!({}),
            Some(&user_a.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["unfollowed"].as_bool().unwrap(), true);

    // Not following anymore.
    let resp = app
        .post_json(
            &format!("/users/{}/unfollow", user_b.id),
            json!({}),
            Some(&user_a.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["unfollowed"].as_bool().unwrap(), false);
}

// ===========================================================================
// Profiles
// ===========================================================================

#[tokio::test]
async fn profile_counts_follows() {
    let Some(app) = app().await else { return };
    let celebrity = app.create_user("soc_prof_celeb").await;
    let fan = app.create_user("soc_prof_fan").await;

    app.post_json(
        &format!("/users/{}/follow", celebrity.id),
        json!({}),
        Some(&fan.access_token),
    )
    .await;

    let resp = app.get(&format!("/users/{}", celebrity.id), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["followers_count"].as_i64().unwrap(), 1);
    assert_eq!(body["following_count"].as_i64().unwrap(), 0);

    let resp = app.get(&format!("/users/{}", fan.id), None).await;
    let body = resp.json();
    assert_eq!(body["followers_count"].as_i64().unwrap(), 0);
    assert_eq!(body["following_count"].as_i64().unwrap(), 1);
}

#[tokio::test]
async fn profile_nonexistent_user() {
    let Some(app) = app().await else { return };

    let resp = app.get(&format!("/users/{}", Uuid::new_v4()), None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}
