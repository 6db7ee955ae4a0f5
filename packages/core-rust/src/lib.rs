//! Foreman Core — tenant records, credential claims, request context, and geo math.

pub mod claims;
pub mod context;
pub mod geo;
pub mod types;

pub use claims::AccessClaims;
pub use context::RequestContext;
pub use geo::GeoPoint;
pub use types::{TenantRecord, TenantStatus};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
