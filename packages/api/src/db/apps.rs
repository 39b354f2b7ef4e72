use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::entity::app;

/// Insert a new app. A `(user_id, name)` collision surfaces as a unique
/// constraint violation in the returned `DbErr`.
pub async fn create(
    db: &DatabaseConnection,
    user_id: Uuid,
    name: &str,
    region: &str,
    size: &str,
) -> Result<app::Model, DbErr> {
    let now = Utc::now();
    app::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        name: Set(name.to_string()),
        region: Set(region.to_string()),
        size: Set(size.to_string()),
        status: Set("stopped".to_string()),
        deployment_count: Set(0),
        current_deployment_id: Set(None),
        env_vars_encrypted: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

pub async fn list_by_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<app::Model>, DbErr> {
    app::Entity::find()
        .filter(app::Column::UserId.eq(user_id))
        .order_by_asc(app::Column::Name)
        .all(db)
        .await
}

/// Ownership is part of the key: a cross-owner lookup is a miss.
pub async fn get_by_name(
    db: &DatabaseConnection,
    user_id: Uuid,
    name: &str,
) -> Result<Option<app::Model>, DbErr> {
    app::Entity::find()
        .filter(app::Column::UserId.eq(user_id))
        .filter(app::Column::Name.eq(name))
        .one(db)
        .await
}

pub async fn update_settings(
    db: &DatabaseConnection,
    app: app::Model,
    region: String,
    size: String,
) -> Result<app::Model, DbErr> {
    let mut active: app::ActiveModel = app.into();
    active.region = Set(region);
    active.size = Set(size);
    active.updated_at = Set(Utc::now());
    active.update(db).await
}

pub async fn update_status<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    status: &str,
    current_deployment_id: Option<Uuid>,
) -> Result<(), DbErr> {
    let active = app::ActiveModel {
        id: Set(id),
        status: Set(status.to_string()),
        current_deployment_id: Set(current_deployment_id),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    app::Entity::update(active).exec(conn).await?;
    Ok(())
}

pub async fn update_env_vars(
    db: &DatabaseConnection,
    id: Uuid,
    encrypted: Vec<u8>,
) -> Result<(), DbErr> {
    let active = app::ActiveModel {
        id: Set(id),
        env_vars_encrypted: Set(Some(encrypted)),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    app::Entity::update(active).exec(db).await?;
    Ok(())
}

/// Bump the monotone deployment counter, returning the new value.
pub async fn increment_deployment_count<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<i32, DbErr> {
    let found = app::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("app {id}")))?;

    let next = found.deployment_count + 1;
    let mut active: app::ActiveModel = found.into();
    active.deployment_count = Set(next);
    active.updated_at = Set(Utc::now());
    active.update(conn).await?;
    Ok(next)
}

pub async fn delete(db: &DatabaseConnection, id: Uuid) -> Result<(), DbErr> {
    app::Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}
