//! `SeaORM` Entity for user applications.
//!
//! `(user_id, name)` is unique per owner. The pointer to the current
//! deployment is a weak reference resolved on read; the env-var bundle is
//! an AES-GCM blob owned exclusively by the app.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "apps")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    pub name: String,

    pub region: String,
    pub size: String,

    pub status: String,

    pub deployment_count: i32,

    #[sea_orm(nullable)]
    pub current_deployment_id: Option<Uuid>,

    #[sea_orm(nullable)]
    pub env_vars_encrypted: Option<Vec<u8>>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::deployment::Entity")]
    Deployment,
    #[sea_orm(has_many = "super::domain::Entity")]
    Domain,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::deployment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deployment.def()
    }
}

impl Related<super::domain::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Domain.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
