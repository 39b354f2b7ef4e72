//! Recent logs and SSE streaming.
//!
//! With `follow=true` the response is a `text/event-stream` fed by one
//! producer task per pod. Dropping the response (client disconnect) tears
//! the channel down, which stops every producer.

use std::convert::Infallible;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::kubernetes::{LogLine, LogStreamOptions};
use crate::state::AppState;

use super::fetch_owned_app;

const LOG_CHANNEL_CAPACITY: usize = 100;
const DEFAULT_TAIL_LINES: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub tail: Option<i64>,
    #[serde(default)]
    pub follow: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogsResponse {
    pub logs: Vec<LogLine>,
}

#[utoipa::path(
    get,
    path = "/api/apps/{name}/logs",
    tag = "logs",
    params(
        ("name" = String, Path, description = "App name"),
        ("tail" = Option<i64>, Query, description = "Lines per pod, default 100"),
        ("follow" = Option<String>, Query, description = "Pass `true` for an SSE stream")
    ),
    responses(
        (status = 200, description = "Recent logs as JSON, or an SSE stream"),
        (status = 404, description = "Unknown app or no pods"),
        (status = 500, description = "Cluster unavailable")
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(name = "GET /api/apps/{name}/logs", skip(state, user))]
pub async fn get_logs(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(name): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Response, ApiError> {
    let app = fetch_owned_app(&state, user.user_id, &name).await?;

    let Some(kube) = state.kube.clone() else {
        return Err(ApiError::internal("kubernetes not available"));
    };

    let tail_lines = query.tail.filter(|t| *t > 0).unwrap_or(DEFAULT_TAIL_LINES);

    if query.follow.as_deref() == Some("true") {
        let (tx, rx) = tokio::sync::mpsc::channel::<LogLine>(LOG_CHANNEL_CAPACITY);
        kube.stream_logs(
            &app.name,
            LogStreamOptions {
                follow: true,
                tail_lines,
                timestamps: true,
            },
            tx,
        )
        .await?;

        let stream = ReceiverStream::new(rx).map(|line| {
            let event = match serde_json::to_string(&line) {
                Ok(json) => Event::default().data(json),
                Err(_) => Event::default().data("{}"),
            };
            Ok::<Event, Infallible>(event)
        });

        let sse = Sse::new(stream).keep_alive(KeepAlive::default());
        return Ok(([(header::CACHE_CONTROL, "no-cache")], sse).into_response());
    }

    let logs = kube.get_recent_logs(&app.name, tail_lines).await?;
    Ok(Json(LogsResponse { logs }).into_response())
}
