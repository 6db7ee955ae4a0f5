//! Error types for tenant resolution and tenant-scoped handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

/// Wire format for every failure response this API returns.
#[derive(Debug, Serialize)]
pub struct FailBody {
    #[serde(rename = "statusText")]
    pub status_text: &'static str,
    #[serde(rename = "statusValue")]
    pub status_value: u16,
    pub message: String,
}

impl FailBody {
    fn response(status: StatusCode, message: String) -> Response {
        let body = FailBody {
            status_text: "FAIL",
            status_value: status.as_u16(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Terminal failures in the resolution middleware. The request is rejected
/// before any handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No credential was presented.
    #[error("Please provide auth Token")]
    MissingToken,
    /// The credential could not be decoded.
    #[error("Please provide client's name to connect")]
    MalformedToken,
    /// The credential decoded, but carries no usable tenant claim.
    #[error("Please provide client's name to connect")]
    MissingTenantClaim,
}

impl ResolveError {
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::MissingToken => StatusCode::FORBIDDEN,
            Self::MalformedToken | Self::MissingTenantClaim => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        FailBody::response(self.status(), self.to_string())
    }
}

/// Handler-level failures. An unresolved connection is deliberately not
/// rejected by the middleware, so every handler that needs the connection
/// surfaces [`ApiError::ClientUnavailable`] itself.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The scope has no tenant connection bound (unknown tenant, or the
    /// registry was never populated).
    #[error("The provided Client is not available")]
    ClientUnavailable,
    /// The admin database connection was never established.
    #[error("Admin database is not available")]
    AdminUnavailable,
    /// The caller is outside the tenant's geofence.
    #[error("Check-in location is {distance_m:.0}m from the site, outside the allowed area")]
    OutsideGeofence { distance_m: f64 },
    /// Check-out without a matching open check-in.
    #[error("No open attendance record for employee {employee_id}")]
    NotCheckedIn { employee_id: String },
    /// Underlying database failure.
    #[error("Database operation failed")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ClientUnavailable
            | Self::OutsideGeofence { .. }
            | Self::NotCheckedIn { .. } => StatusCode::BAD_REQUEST,
            Self::AdminUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Database(ref e) = self {
            tracing::error!(error = %e, "request failed on database operation");
        }
        FailBody::response(self.status(), self.to_string())
    }
}

/// Failures opening a database pool.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("invalid database url: {0}")]
    InvalidUrl(#[source] sqlx::Error),
    #[error("connection failed: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("schema bootstrap failed: {0}")]
    Bootstrap(#[source] sqlx::Error),
}

/// Failures populating the tenant registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The admin database could not be reached. Fatal to population: the
    /// registry stays empty and every tenant lookup fails closed.
    #[error("admin database unavailable: {0}")]
    AdminUnavailable(#[from] FactoryError),
    #[error("failed to enumerate tenants: {0}")]
    TenantQuery(#[source] sqlx::Error),
    /// `connect_all` already ran; the map is populated exactly once.
    #[error("tenant registry is already populated")]
    AlreadyPopulated,
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_token_is_403_with_documented_body() {
        let response = ResolveError::MissingToken.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let json = body_json(response).await;
        assert_eq!(json["statusText"], "FAIL");
        assert_eq!(json["statusValue"], 403);
        assert_eq!(json["message"], "Please provide auth Token");
    }

    #[tokio::test]
    async fn missing_claim_is_400_with_documented_body() {
        let response = ResolveError::MissingTenantClaim.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["statusText"], "FAIL");
        assert_eq!(json["statusValue"], 400);
        assert_eq!(json["message"], "Please provide client's name to connect");
    }

    #[tokio::test]
    async fn malformed_token_shares_the_400_body() {
        let json = body_json(ResolveError::MalformedToken.into_response()).await;
        assert_eq!(json["message"], "Please provide client's name to connect");
    }

    #[tokio::test]
    async fn client_unavailable_is_400() {
        let response = ApiError::ClientUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["message"], "The provided Client is not available");
    }

    #[tokio::test]
    async fn geofence_rejection_reports_distance() {
        let response = ApiError::OutsideGeofence { distance_m: 412.3 }.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        let message = json["message"].as_str().unwrap();
        assert!(message.contains("412m"), "got {message}");
    }

    #[tokio::test]
    async fn database_error_is_500_without_detail_leak() {
        let response = ApiError::Database(sqlx::Error::PoolClosed).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["message"], "Database operation failed");
    }
}
