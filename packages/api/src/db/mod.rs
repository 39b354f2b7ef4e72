//! Typed query layer over the relational schema.
//!
//! One module per entity; each function is a single prepared operation.
//! Handlers never touch `Entity::find` directly — this is the full
//! persistence surface.

pub mod activity;
pub mod apps;
pub mod deployments;
pub mod domains;
pub mod oauth_states;
pub mod tokens;
pub mod users;
