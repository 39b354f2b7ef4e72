//! `SeaORM` entities for the control-plane schema.

pub mod activity_log;
pub mod api_token;
pub mod app;
pub mod deployment;
pub mod domain;
pub mod oauth_state;
pub mod prelude;
pub mod user;
