pub mod auth;
pub mod engagement;
pub mod notifications;
pub mod posts;
pub mod social;
pub mod users;
