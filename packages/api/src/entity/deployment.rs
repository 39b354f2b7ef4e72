//! `SeaORM` Entity for rollout records.
//!
//! Immutable once terminal (`running` or `failed`), apart from
//! observability fields. `version` is strictly increasing per app and is
//! assigned atomically with the insert.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deployments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub app_id: Uuid,

    pub version: i32,

    pub image: String,

    pub status: String,

    #[sea_orm(nullable)]
    pub message: Option<String>,

    #[sea_orm(nullable)]
    pub error: Option<String>,

    pub created_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub started_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub ready_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::app::Entity",
        from = "Column::AppId",
        to = "super::app::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    App,
}

impl Related<super::app::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::App.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
