//! `AuthIdentity` extractor — reads the validated identity headers.
//!
//! Authentication is an upstream collaborator's job; by the time a
//! request reaches this process the gateway has already validated the
//! caller and installed `X-Tenant-Id` and `X-User-Id`. Requests without
//! both headers are rejected before any resource is created.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use stockhub_core::error::AppError;
use stockhub_core::types::id::{TenantId, UserId};
use stockhub_service::RequestContext;

use crate::error::ApiError;

/// Extracted authenticated identity available in handlers.
#[derive(Debug, Clone, Copy)]
pub struct AuthIdentity(pub RequestContext);

impl std::ops::Deref for AuthIdentity {
    type Target = RequestContext;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant_id: TenantId = header_id(parts, "x-tenant-id")?;
        let user_id: UserId = header_id(parts, "x-user-id")?;
        Ok(AuthIdentity(RequestContext::new(tenant_id, user_id)))
    }
}

fn header_id<T>(parts: &Parts, name: &str) -> Result<T, ApiError>
where
    T: std::str::FromStr,
{
    let raw = parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::authentication(format!("Missing {name} header")))?;

    raw.parse()
        .map_err(|_| AppError::authentication(format!("Invalid {name} header")).into())
}
