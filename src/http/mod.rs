use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;
mod ws;

pub use auth::{AdminToken, AuthUser};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::auth())
        .merge(routes::users())
        .merge(routes::posts())
        .merge(routes::notifications())
        .merge(routes::admin())
        .merge(routes::realtime())
        .with_state(state)
}
