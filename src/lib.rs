pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;
pub mod realtime;

use crate::infra::db::Db;
use crate::realtime::Dispatcher;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub dispatcher: Dispatcher,
    pub admin_token: Option<String>,
    pub paseto_access_key: [u8; 32],
    pub paseto_refresh_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub refresh_ttl_days: u64,
}
