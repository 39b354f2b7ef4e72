//! `SeaORM` Entity for custom domains.
//!
//! A hostname is attached to exactly one app and globally unique across
//! the platform. `verified` implies `verified_at` is set.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "domains")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub app_id: Uuid,

    #[sea_orm(unique)]
    pub domain: String,

    pub verified: bool,

    pub ssl_status: String,

    #[sea_orm(nullable)]
    pub dns_record_id: Option<String>,

    pub created_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub verified_at: Option<DateTimeUtc>,
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
