use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::entity::api_token;

pub async fn create(
    db: &DatabaseConnection,
    user_id: Uuid,
    name: &str,
    token_hash: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<api_token::Model, DbErr> {
    api_token::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        name: Set(name.to_string()),
        token_hash: Set(token_hash.to_string()),
        last_used_at: Set(None),
        expires_at: Set(expires_at),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
}

pub async fn list_by_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<api_token::Model>, DbErr> {
    api_token::Entity::find()
        .filter(api_token::Column::UserId.eq(user_id))
        .order_by_desc(api_token::Column::CreatedAt)
        .all(db)
        .await
}

/// Indexed lookup by the token's one-way digest.
pub async fn find_by_hash(
    db: &DatabaseConnection,
    token_hash: &str,
) -> Result<Option<api_token::Model>, DbErr> {
    api_token::Entity::find()
        .filter(api_token::Column::TokenHash.eq(token_hash))
        .one(db)
        .await
}

pub async fn touch_last_used(db: &DatabaseConnection, id: Uuid) -> Result<(), DbErr> {
    let active = api_token::ActiveModel {
        id: Set(id),
        last_used_at: Set(Some(Utc::now())),
        ..Default::default()
    };
    api_token::Entity::update(active).exec(db).await?;
    Ok(())
}

/// Delete a token owned by the given user. Returns the number of rows
/// removed (zero when the token is unknown or owned by someone else).
pub async fn delete_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
    id: Uuid,
) -> Result<u64, DbErr> {
    let result = api_token::Entity::delete_many()
        .filter(api_token::Column::Id.eq(id))
        .filter(api_token::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
