//! Best-effort audit logging. Failures are logged and swallowed — an
//! activity write never fails the request that produced it.

use serde_json::Value;
use uuid::Uuid;

use crate::db;
use crate::state::AppState;

pub async fn record(
    state: &AppState,
    user_id: Uuid,
    app_id: Option<Uuid>,
    action: &str,
    details: Option<Value>,
    ip_address: Option<String>,
) {
    if let Err(err) =
        db::activity::insert(&state.db, user_id, app_id, action, details, ip_address).await
    {
        tracing::warn!(action, "failed to write activity log: {err}");
    }
}
