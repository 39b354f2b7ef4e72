pub mod apps;
pub mod auth;
pub mod health;
pub mod users;
pub mod validate;
