//! Tenant record types shared between the registry and admin handlers.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Provisioning status of a tenant. Only active tenants get a database
/// connection at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Inactive,
}

impl TenantStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// Parses a stored status string. Unknown values are treated as
    /// inactive so a bad row can never acquire a connection.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            other => {
                tracing::warn!(status = other, "unknown tenant status, treating as inactive");
                Self::Inactive
            }
        }
    }
}

/// One customer organization, as provisioned in the admin database.
///
/// Records are created by an external provisioning process and read once at
/// startup; this subsystem never mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRecord {
    /// Stable tenant identifier.
    pub tenant_id: String,
    /// Human-readable organization name.
    pub display_name: String,
    /// Geographic reference point used for geofenced attendance.
    pub location: GeoPoint,
    /// Name of the tenant's database. Unique; also the registry key.
    pub db_name: String,
    pub status: TenantStatus,
}
