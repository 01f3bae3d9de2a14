//! Server push stream handler.
//!
//! Wire framing per event:
//!
//! ```text
//! event: connected|message|heartbeat
//! data: <JSON>
//! <blank line>
//! ```
//!
//! The `connected` frame is always first and carries the connection id;
//! clients keep the stream alive by POSTing to
//! `/api/stream/{connection_id}/ping`.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures::Stream;
use tokio::sync::mpsc;
use tracing::info;

use stockhub_core::error::AppError;
use stockhub_core::types::id::{TenantId, UserId};
use stockhub_realtime::connection::handle::ConnectionId;
use stockhub_realtime::connection::registry::ConnectionRegistry;
use stockhub_realtime::message::types::StreamEvent;

use crate::dto::response::{ApiResponse, MessageResponse};
use crate::error::ApiError;
use crate::extractors::AuthIdentity;
use crate::state::AppState;

/// GET /api/stream — open the push stream for the authenticated identity.
pub async fn stream(State(state): State<AppState>, auth: AuthIdentity) -> Sse<ClientStream> {
    let registry = state.engine.registry().clone();
    let (handle, rx) = registry.register(auth.tenant_id, auth.user_id);

    info!(
        conn_id = %handle.id,
        tenant_id = %auth.tenant_id,
        user_id = %auth.user_id,
        "Push stream opened"
    );

    Sse::new(ClientStream {
        registry,
        tenant_id: auth.tenant_id,
        user_id: auth.user_id,
        connection_id: handle.id,
        rx,
    })
}

/// POST /api/stream/{id}/ping — client liveness signal.
///
/// This is what resets a connection's timeout clock; a stream that never
/// pings is evicted by the sweep once the timeout elapses.
pub async fn ping(
    State(state): State<AppState>,
    auth: AuthIdentity,
    Path(id): Path<ConnectionId>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if state
        .engine
        .registry()
        .touch(auth.tenant_id, auth.user_id, id)
    {
        Ok(Json(ApiResponse::ok(MessageResponse {
            message: "pong".to_string(),
        })))
    } else {
        Err(AppError::not_found("Unknown connection").into())
    }
}

/// The transport adapter: turns registry events into wire frames and
/// unregisters the connection when the client goes away.
pub struct ClientStream {
    registry: Arc<ConnectionRegistry>,
    tenant_id: TenantId,
    user_id: UserId,
    connection_id: ConnectionId,
    rx: mpsc::Receiver<StreamEvent>,
}

impl Stream for ClientStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(Ok(to_sse_event(&event)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ClientStream {
    fn drop(&mut self) {
        self.registry
            .remove(self.tenant_id, self.user_id, self.connection_id);
    }
}

fn to_sse_event(event: &StreamEvent) -> Event {
    Event::default()
        .event(event.event_name())
        .data(event.payload().to_string())
}
