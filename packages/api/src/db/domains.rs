use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::entity::domain;

/// Insert a new domain. Global uniqueness (regardless of app) surfaces as
/// a unique constraint violation in the returned `DbErr`.
pub async fn create(
    db: &DatabaseConnection,
    app_id: Uuid,
    name: &str,
) -> Result<domain::Model, DbErr> {
    domain::ActiveModel {
        id: Set(Uuid::new_v4()),
        app_id: Set(app_id),
        domain: Set(name.to_string()),
        verified: Set(false),
        ssl_status: Set("pending".to_string()),
        dns_record_id: Set(None),
        created_at: Set(Utc::now()),
        verified_at: Set(None),
    }
    .insert(db)
    .await
}

pub async fn list_by_app(
    db: &DatabaseConnection,
    app_id: Uuid,
) -> Result<Vec<domain::Model>, DbErr> {
    domain::Entity::find()
        .filter(domain::Column::AppId.eq(app_id))
        .order_by_asc(domain::Column::Domain)
        .all(db)
        .await
}

/// Hostnames are globally unique, so lookup is by name alone; callers
/// check app ownership.
pub async fn get_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<domain::Model>, DbErr> {
    domain::Entity::find()
        .filter(domain::Column::Domain.eq(name))
        .one(db)
        .await
}

/// Attach the provider's DNS record id after a successful CNAME create.
pub async fn set_dns_record(
    db: &DatabaseConnection,
    id: Uuid,
    record_id: &str,
) -> Result<domain::Model, DbErr> {
    let active = domain::ActiveModel {
        id: Set(id),
        dns_record_id: Set(Some(record_id.to_string())),
        ..Default::default()
    };
    domain::Entity::update(active).exec(db).await
}

pub async fn delete(db: &DatabaseConnection, id: Uuid) -> Result<(), DbErr> {
    domain::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}

/// Set `verified = true` with the verification timestamp.
pub async fn mark_verified(db: &DatabaseConnection, id: Uuid) -> Result<domain::Model, DbErr> {
    let active = domain::ActiveModel {
        id: Set(id),
        verified: Set(true),
        verified_at: Set(Some(Utc::now())),
        ssl_status: Set("provisioning".to_string()),
        ..Default::default()
    };
    domain::Entity::update(active).exec(db).await
}
