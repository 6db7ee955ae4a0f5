//! Per-request context threaded through handler code.

/// Per-request context carrying identity, tenancy, and tracing information.
/// Built by the resolution middleware and inserted into request extensions,
/// so handlers can log and audit without reaching into ambient state.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Request identifier, taken from the `x-request-id` header when present.
    pub request_id: String,
    /// Tenant scope for multi-tenant isolation. `None` for admin-database requests.
    pub tenant_id: Option<String>,
    /// Subject claim of the presented credential, if any.
    pub subject: Option<String>,
}

impl RequestContext {
    /// Context for a request resolved to a tenant database.
    #[must_use]
    pub fn for_tenant(request_id: String, tenant_id: String, subject: Option<String>) -> Self {
        Self {
            request_id,
            tenant_id: Some(tenant_id),
            subject,
        }
    }

    /// Context for a request operating on the admin database.
    #[must_use]
    pub fn for_admin(request_id: String) -> Self {
        Self {
            request_id,
            tenant_id: None,
            subject: None,
        }
    }
}
