//! Request context carrying the authenticated identity.

use serde::{Deserialize, Serialize};

use stockhub_core::types::id::{TenantId, UserId};

/// Context for the current authenticated request.
///
/// Authentication happens upstream; by the time a request reaches a
/// service the identity has already been validated. Every operation is
/// scoped to the context's tenant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RequestContext {
    /// The tenant the caller acts within.
    pub tenant_id: TenantId,
    /// The authenticated user.
    pub user_id: UserId,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(tenant_id: TenantId, user_id: UserId) -> Self {
        Self { tenant_id, user_id }
    }
}
