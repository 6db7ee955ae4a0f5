//! Admin-database handlers.

use axum::Json;
use serde::Serialize;

use foreman_core::TenantRecord;

use crate::tenancy::error::ApiError;
use crate::tenancy::registry;
use crate::tenancy::scope::admin_connection;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantListResponse {
    pub status_text: &'static str,
    pub status_value: u16,
    pub tenants: Vec<TenantRecord>,
}

/// `GET /admin/tenants` -- the full tenant catalog, active and inactive.
///
/// Reads through the admin pool bound by `set_admin_db` rather than the
/// registry's in-memory snapshot, so tenants provisioned after startup are
/// visible here even though they have no connection until restart.
pub async fn list_tenants_handler() -> Result<Json<TenantListResponse>, ApiError> {
    let pool = admin_connection().ok_or(ApiError::AdminUnavailable)?;

    let tenants = registry::fetch_tenant_records(&pool, false).await?;

    Ok(Json(TenantListResponse {
        status_text: "SUCCESS",
        status_value: 200,
        tenants,
    }))
}
