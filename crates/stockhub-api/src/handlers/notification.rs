//! Notification control-plane handlers.

use axum::extract::{Path, Query, State};
use axum::Json;

use stockhub_core::types::id::NotificationId;
use stockhub_core::types::pagination::PageResponse;
use stockhub_entity::notification::UnreadCounts;
use stockhub_entity::Notification;

use crate::dto::request::{
    NotificationFilterParams, SendBroadcastRequest, SendToRoleRequest, SendToUsersRequest,
};
use crate::dto::response::{ApiResponse, MarkReadResponse};
use crate::error::ApiError;
use crate::extractors::{AuthIdentity, PaginationParams};
use crate::state::AppState;

/// GET /api/notifications
pub async fn list(
    State(state): State<AppState>,
    auth: AuthIdentity,
    Query(filter): Query<NotificationFilterParams>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<Notification>>>, ApiError> {
    let page = state
        .queries
        .list(&auth, &filter.into_filter(), &pagination.into_page_request())
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    auth: AuthIdentity,
) -> Result<Json<ApiResponse<UnreadCounts>>, ApiError> {
    let counts = state.queries.unread_count(&auth).await?;
    Ok(Json(ApiResponse::ok(counts)))
}

/// PUT /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthIdentity,
    Path(id): Path<NotificationId>,
) -> Result<Json<ApiResponse<MarkReadResponse>>, ApiError> {
    let marked = state.queries.mark_read(&auth, Some(id)).await?;
    Ok(Json(ApiResponse::ok(MarkReadResponse { marked })))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthIdentity,
) -> Result<Json<ApiResponse<MarkReadResponse>>, ApiError> {
    let marked = state.queries.mark_read(&auth, None).await?;
    Ok(Json(ApiResponse::ok(MarkReadResponse { marked })))
}

/// POST /api/notifications/broadcast
pub async fn send_broadcast(
    State(state): State<AppState>,
    auth: AuthIdentity,
    Json(req): Json<SendBroadcastRequest>,
) -> Result<Json<ApiResponse<Notification>>, ApiError> {
    let notification = state
        .delivery
        .send_broadcast(auth.tenant_id, req.content)
        .await?;
    Ok(Json(ApiResponse::ok(notification)))
}

/// POST /api/notifications/send
pub async fn send_to_users(
    State(state): State<AppState>,
    auth: AuthIdentity,
    Json(req): Json<SendToUsersRequest>,
) -> Result<Json<ApiResponse<Vec<Notification>>>, ApiError> {
    let notifications = state
        .delivery
        .send_to_users(auth.tenant_id, &req.user_ids, req.content)
        .await?;
    Ok(Json(ApiResponse::ok(notifications)))
}

/// POST /api/notifications/send-role
pub async fn send_to_role(
    State(state): State<AppState>,
    auth: AuthIdentity,
    Json(req): Json<SendToRoleRequest>,
) -> Result<Json<ApiResponse<Vec<Notification>>>, ApiError> {
    let notifications = state
        .delivery
        .send_to_role(auth.tenant_id, &req.role_code, &req.user_ids, req.content)
        .await?;
    Ok(Json(ApiResponse::ok(notifications)))
}
