//! Credential claim types.
//!
//! Claims are extracted from the bearer token presented with each request.
//! The token is decoded for claims only; signature verification happens at
//! the identity provider, not here.

use serde::{Deserialize, Serialize};

/// Claims carried by an access token.
///
/// Only the claims this subsystem reads are modeled; unknown claims are
/// ignored during deserialization. The load-bearing claim is
/// `clientDbName`, which names the tenant database the request should be
/// routed to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Database name of the tenant the caller belongs to.
    #[serde(rename = "clientDbName", default, skip_serializing_if = "Option::is_none")]
    pub client_db_name: Option<String>,
    /// Subject (user) identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiry timestamp (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    /// Issued-at timestamp (seconds since epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

impl AccessClaims {
    /// Returns the tenant database name, treating an empty or
    /// whitespace-only claim as absent.
    #[must_use]
    pub fn tenant_db_name(&self) -> Option<&str> {
        self.client_db_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
