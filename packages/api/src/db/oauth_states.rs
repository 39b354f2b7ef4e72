use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    TransactionTrait,
};

use crate::entity::oauth_state;

pub async fn create(
    db: &DatabaseConnection,
    state: &str,
    redirect_uri: Option<String>,
    cli_token_exchange: bool,
    expires_at: DateTime<Utc>,
) -> Result<oauth_state::Model, DbErr> {
    oauth_state::ActiveModel {
        state: Set(state.to_string()),
        redirect_uri: Set(redirect_uri),
        cli_token_exchange: Set(cli_token_exchange),
        expires_at: Set(expires_at),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
}

/// Atomically fetch and delete a pending state row.
///
/// The row is removed whether or not it has expired — states are single
/// use regardless of outcome. The caller checks `expires_at`.
pub async fn consume(
    db: &DatabaseConnection,
    state: &str,
) -> Result<Option<oauth_state::Model>, DbErr> {
    let txn = db.begin().await?;

    let found = oauth_state::Entity::find_by_id(state).one(&txn).await?;
    if let Some(row) = &found {
        row.clone().delete(&txn).await?;
    }

    txn.commit().await?;
    Ok(found)
}
