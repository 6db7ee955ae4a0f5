//! Factory for admin and tenant database pools.
//!
//! The admin pool is opened eagerly: if the admin database is down the
//! caller must know immediately, because tenant enumeration depends on it.
//! Tenant pools are opened lazily: `open_tenant` returns a handle
//! synchronously and the underlying connections negotiate on first use, so
//! one unreachable tenant database never blocks startup. Schema bootstrap
//! for a tenant runs in a background task whose failure is logged, not
//! propagated.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, warn};

use super::config::DatabaseConfig;
use super::error::FactoryError;

/// Tables every tenant database must have. Mirrors the schema set the
/// provisioning tooling registers for new tenants.
const TENANT_SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS attendance_records (
        id BIGSERIAL PRIMARY KEY,
        employee_id TEXT NOT NULL,
        checked_in_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        checked_out_at TIMESTAMPTZ,
        latitude DOUBLE PRECISION NOT NULL,
        longitude DOUBLE PRECISION NOT NULL,
        distance_m DOUBLE PRECISION NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_attendance_open
        ON attendance_records (employee_id) WHERE checked_out_at IS NULL",
    "CREATE TABLE IF NOT EXISTS attendance_logs (
        id BIGSERIAL PRIMARY KEY,
        employee_id TEXT NOT NULL,
        event TEXT NOT NULL,
        recorded_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        detail TEXT
    )",
    "CREATE TABLE IF NOT EXISTS holiday_lists (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        holiday_date DATE NOT NULL,
        recurring BOOLEAN NOT NULL DEFAULT FALSE
    )",
    "CREATE TABLE IF NOT EXISTS face_match_configs (
        id BIGSERIAL PRIMARY KEY,
        collection_id TEXT NOT NULL,
        similarity_threshold DOUBLE PRECISION NOT NULL DEFAULT 0.9,
        enabled BOOLEAN NOT NULL DEFAULT TRUE
    )",
    "CREATE TABLE IF NOT EXISTS attendance_settings (
        id BIGSERIAL PRIMARY KEY,
        geofence_radius_m DOUBLE PRECISION NOT NULL DEFAULT 250
    )",
];

/// Admin-side schema: the tenant catalog.
const ADMIN_SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS tenants (
        id BIGSERIAL PRIMARY KEY,
        tenant_id TEXT NOT NULL UNIQUE,
        display_name TEXT NOT NULL,
        latitude DOUBLE PRECISION NOT NULL,
        longitude DOUBLE PRECISION NOT NULL,
        db_name TEXT NOT NULL UNIQUE,
        status TEXT NOT NULL DEFAULT 'active',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
];

/// Opens database pools with the shared connection settings.
#[derive(Debug, Clone)]
pub struct ConnectionFactory {
    config: DatabaseConfig,
}

impl ConnectionFactory {
    #[must_use]
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    /// Opens the admin pool and ensures the tenant catalog exists.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::Connect`] if the admin database is
    /// unreachable, or [`FactoryError::Bootstrap`] if the catalog DDL fails.
    pub async fn open_admin(&self) -> Result<PgPool, FactoryError> {
        let url = self.config.admin_url();
        let pool = self
            .pool_options()
            .connect(&url)
            .await
            .map_err(FactoryError::Connect)?;

        for ddl in ADMIN_SCHEMA {
            sqlx::query(ddl)
                .execute(&pool)
                .await
                .map_err(FactoryError::Bootstrap)?;
        }

        debug!(db = %self.config.admin_db_name, "admin pool ready");
        Ok(pool)
    }

    /// Opens a tenant pool.
    ///
    /// Returns synchronously; the pool becomes usable once connection
    /// negotiation completes on first acquire. Schema bootstrap runs in a
    /// spawned task so a slow or unreachable tenant database only surfaces
    /// as a logged warning and later per-request errors, never a startup
    /// failure for other tenants.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::InvalidUrl`] if the derived URL does not parse.
    pub fn open_tenant(&self, db_name: &str) -> Result<PgPool, FactoryError> {
        let url = self.config.url_for(db_name);
        let pool = self
            .pool_options()
            .connect_lazy(&url)
            .map_err(FactoryError::InvalidUrl)?;

        let bootstrap_pool = pool.clone();
        let db_name = db_name.to_string();
        tokio::spawn(async move {
            if let Err(e) = ensure_tenant_schema(&bootstrap_pool).await {
                warn!(
                    db = %db_name,
                    error = %e,
                    "tenant schema bootstrap failed, pool stays registered"
                );
            } else {
                debug!(db = %db_name, "tenant schema ready");
            }
        });

        Ok(pool)
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .acquire_timeout(self.config.acquire_timeout)
    }
}

async fn ensure_tenant_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for ddl in TENANT_SCHEMA {
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn unreachable_config() -> DatabaseConfig {
        // Port 9 (discard) on localhost: connection refused immediately.
        DatabaseConfig {
            server_url: "postgres://foreman@127.0.0.1:9".to_string(),
            acquire_timeout: Duration::from_millis(500),
            ..DatabaseConfig::default()
        }
    }

    #[tokio::test]
    async fn open_tenant_returns_a_handle_without_connecting() {
        let factory = ConnectionFactory::new(unreachable_config());
        // Lazy open must succeed even though nothing listens on the port.
        let pool = factory.open_tenant("acme_db").unwrap();
        assert!(!pool.is_closed());
    }

    #[tokio::test]
    async fn open_tenant_rejects_invalid_url() {
        let factory = ConnectionFactory::new(DatabaseConfig {
            server_url: "not a url".to_string(),
            ..DatabaseConfig::default()
        });
        let err = factory.open_tenant("acme_db").unwrap_err();
        assert!(matches!(err, FactoryError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn open_admin_fails_fast_when_unreachable() {
        let factory = ConnectionFactory::new(unreachable_config());
        let err = factory.open_admin().await.unwrap_err();
        assert!(matches!(err, FactoryError::Connect(_)));
    }

    #[tokio::test]
    async fn lazy_pool_surfaces_errors_at_use_time() {
        let factory = ConnectionFactory::new(unreachable_config());
        let pool = factory.open_tenant("acme_db").unwrap();
        let result = sqlx::query("SELECT 1").execute(&pool).await;
        assert!(result.is_err());
    }
}
