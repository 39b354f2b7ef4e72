use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde_json::Value;
use uuid::Uuid;

use crate::entity::activity_log;

pub async fn insert(
    db: &DatabaseConnection,
    user_id: Uuid,
    app_id: Option<Uuid>,
    action: &str,
    details: Option<Value>,
    ip_address: Option<String>,
) -> Result<activity_log::Model, DbErr> {
    activity_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        app_id: Set(app_id),
        action: Set(action.to_string()),
        details: Set(details),
        ip_address: Set(ip_address),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
}

pub async fn list_by_app(
    db: &DatabaseConnection,
    app_id: Uuid,
    limit: u64,
    offset: u64,
) -> Result<Vec<activity_log::Model>, DbErr> {
    activity_log::Entity::find()
        .filter(activity_log::Column::AppId.eq(app_id))
        .order_by_desc(activity_log::Column::CreatedAt)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await
}

pub async fn count_by_app(db: &DatabaseConnection, app_id: Uuid) -> Result<u64, DbErr> {
    activity_log::Entity::find()
        .filter(activity_log::Column::AppId.eq(app_id))
        .count(db)
        .await
}
