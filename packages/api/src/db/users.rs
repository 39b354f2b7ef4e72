use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, TransactionTrait,
};
use uuid::Uuid;

use crate::entity::user;

/// Profile fields refreshed on every login.
#[derive(Clone, Debug)]
pub struct GitHubProfile {
    pub github_id: i64,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

pub async fn get_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find_by_id(id).one(db).await
}

pub async fn get_by_github_id(
    db: &DatabaseConnection,
    github_id: i64,
) -> Result<Option<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::GithubId.eq(github_id))
        .one(db)
        .await
}

/// Create-or-update keyed by the external GitHub id, as a single logical
/// transaction. `id` and `github_id` are never rewritten.
pub async fn upsert_github_user(
    db: &DatabaseConnection,
    profile: GitHubProfile,
) -> Result<user::Model, DbErr> {
    let txn = db.begin().await?;

    let existing = user::Entity::find()
        .filter(user::Column::GithubId.eq(profile.github_id))
        .one(&txn)
        .await?;

    let now = Utc::now();
    let model = match existing {
        Some(found) => {
            let mut active: user::ActiveModel = found.into();
            active.username = Set(profile.username);
            active.email = Set(profile.email);
            active.avatar_url = Set(profile.avatar_url);
            active.updated_at = Set(now);
            active.update(&txn).await?
        }
        None => {
            let active = user::ActiveModel {
                id: Set(Uuid::new_v4()),
                github_id: Set(profile.github_id),
                username: Set(profile.username),
                email: Set(profile.email),
                avatar_url: Set(profile.avatar_url),
                plan: Set("free".to_string()),
                created_at: Set(now),
                updated_at: Set(now),
            };
            active.insert(&txn).await?
        }
    };

    txn.commit().await?;
    Ok(model)
}
