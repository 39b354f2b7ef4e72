//! `SeaORM` Entity for pending OAuth login states.
//!
//! Single-use nonces with a ten minute lifetime; consumed on callback
//! regardless of outcome.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "oauth_states")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub state: String,

    #[sea_orm(nullable)]
    pub redirect_uri: Option<String>,

    pub cli_token_exchange: bool,

    pub expires_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
