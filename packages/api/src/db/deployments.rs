use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::db::apps;
use crate::entity::{app, deployment};

pub async fn list_by_app(
    db: &DatabaseConnection,
    app_id: Uuid,
    limit: u64,
    offset: u64,
) -> Result<Vec<deployment::Model>, DbErr> {
    deployment::Entity::find()
        .filter(deployment::Column::AppId.eq(app_id))
        .order_by_desc(deployment::Column::Version)
        .limit(limit)
        .offset(offset)
        .all(db)
        .await
}

pub async fn get_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<deployment::Model>, DbErr> {
    deployment::Entity::find_by_id(id).one(db).await
}

/// The row with the maximum version for an app.
pub async fn get_latest(
    db: &DatabaseConnection,
    app_id: Uuid,
) -> Result<Option<deployment::Model>, DbErr> {
    deployment::Entity::find()
        .filter(deployment::Column::AppId.eq(app_id))
        .order_by_desc(deployment::Column::Version)
        .one(db)
        .await
}

/// Create a `pending` deployment with the next version number.
///
/// Runs as a single transaction that locks the app row, so concurrent
/// creators for the same app are serialized and versions come out as a
/// gap-free increasing sequence. Also bumps the app's deployment counter
/// and repoints it at the new row with status `deploying`.
pub async fn create_next_version(
    db: &DatabaseConnection,
    app_id: Uuid,
    image: &str,
) -> Result<deployment::Model, DbErr> {
    let image = image.to_string();
    let txn = db.begin().await?;

    // Row lock serializes version assignment per app.
    app::Entity::find_by_id(app_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("app {app_id}")))?;

    let latest = deployment::Entity::find()
        .filter(deployment::Column::AppId.eq(app_id))
        .order_by_desc(deployment::Column::Version)
        .one(&txn)
        .await?;
    let next_version = latest.map(|d| d.version + 1).unwrap_or(1);

    let created = deployment::ActiveModel {
        id: Set(Uuid::new_v4()),
        app_id: Set(app_id),
        version: Set(next_version),
        image: Set(image),
        status: Set("pending".to_string()),
        message: Set(None),
        error: Set(None),
        created_at: Set(Utc::now()),
        started_at: Set(None),
        ready_at: Set(None),
    }
    .insert(&txn)
    .await?;

    apps::increment_deployment_count(&txn, app_id).await?;
    apps::update_status(&txn, app_id, "deploying", Some(created.id)).await?;

    txn.commit().await?;
    Ok(created)
}

pub async fn mark_deploying(db: &DatabaseConnection, id: Uuid) -> Result<(), DbErr> {
    let active = deployment::ActiveModel {
        id: Set(id),
        status: Set("deploying".to_string()),
        started_at: Set(Some(Utc::now())),
        ..Default::default()
    };
    deployment::Entity::update(active).exec(db).await?;
    Ok(())
}

pub async fn mark_running(
    db: &DatabaseConnection,
    id: Uuid,
    message: Option<String>,
    ready_at: DateTime<Utc>,
) -> Result<(), DbErr> {
    let active = deployment::ActiveModel {
        id: Set(id),
        status: Set("running".to_string()),
        message: Set(message),
        error: Set(None),
        ready_at: Set(Some(ready_at)),
        ..Default::default()
    };
    deployment::Entity::update(active).exec(db).await?;
    Ok(())
}

pub async fn mark_failed(db: &DatabaseConnection, id: Uuid, error: String) -> Result<(), DbErr> {
    let active = deployment::ActiveModel {
        id: Set(id),
        status: Set("failed".to_string()),
        error: Set(Some(error)),
        ..Default::default()
    };
    deployment::Entity::update(active).exec(db).await?;
    Ok(())
}
