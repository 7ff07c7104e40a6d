use super::{ApiError, AppState};
use crate::session::{SessionSummary, StartedSession, StatusReport};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use base64::Engine;
use bridge_core::{BridgeError, Item, ItemFilter, Platform, SessionStatus};
use serde::{Deserialize, Serialize};
use tracing::debug;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub success: bool,
    #[serde(flatten)]
    pub session: StartedSession,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialResponse {
    pub success: bool,
    pub session_id: String,
    pub status: SessionStatus,
    /// `data:` URL of the rendered login prompt.
    pub credential: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: StatusReport,
}

#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
    pub filter: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsResponse {
    pub success: bool,
    pub session_id: String,
    pub count: usize,
    pub items: Vec<Item>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseResponse {
    pub success: bool,
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub success: bool,
    pub total: usize,
    pub active: usize,
    pub sessions: Vec<SessionSummary>,
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn start(
    State(registry): State<AppState>,
    Path(platform): Path<String>,
) -> ApiResult<StartResponse> {
    let platform: Platform = platform.parse()?;
    let session = registry.start(platform).await?;
    Ok(Json(StartResponse {
        success: true,
        session,
    }))
}

pub async fn credential(
    State(registry): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CredentialResponse> {
    let (artifact, status) = registry.credential_artifact(&id).await?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&artifact.data);
    debug!(session_id = %id, bytes = artifact.data.len(), "credential served");
    Ok(Json(CredentialResponse {
        success: true,
        session_id: id,
        status,
        credential: format!("data:{};base64,{encoded}", artifact.mime_type),
    }))
}

pub async fn status(
    State(registry): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusResponse> {
    let report = registry.poll_status(&id).await?;
    Ok(Json(StatusResponse {
        success: true,
        report,
    }))
}

pub async fn items(
    State(registry): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<ItemsQuery>, QueryRejection>,
) -> ApiResult<ItemsResponse> {
    let Query(query) = query.map_err(|e| BridgeError::InvalidRequest(e.body_text()))?;
    let filter = ItemFilter {
        query: query.filter,
        limit: query.limit,
    };
    let items = registry.fetch_recent(&id, &filter).await?;
    Ok(Json(ItemsResponse {
        success: true,
        session_id: id,
        count: items.len(),
        items,
    }))
}

pub async fn close(
    State(registry): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CloseResponse> {
    registry.close(&id).await?;
    Ok(Json(CloseResponse {
        success: true,
        message: format!("session {id} closed"),
        session_id: id,
    }))
}

pub async fn list(State(registry): State<AppState>) -> Json<ListResponse> {
    let sessions = registry.list().await;
    let active = sessions.iter().filter(|s| s.active).count();
    Json(ListResponse {
        success: true,
        total: sessions.len(),
        active,
        sessions,
    })
}
