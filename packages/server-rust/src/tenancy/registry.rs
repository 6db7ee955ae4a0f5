//! Process-wide registry of tenant database pools.
//!
//! The registry is populated exactly once, at startup, from the admin
//! database's tenant catalog. After population every access is a read-only
//! lookup: the map itself needs no locking discipline beyond `DashMap`'s,
//! and the admin slot is an `ArcSwapOption` so the hot read path is
//! lock-free. The registry is an explicitly constructed object owned by the
//! composition root and shared via `Arc`; it is deliberately not a
//! module-level singleton, so tests can build as many as they like.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use foreman_core::{GeoPoint, TenantRecord, TenantStatus};
use sqlx::PgPool;
use tracing::{info, warn};

use super::error::RegistryError;
use super::factory::ConnectionFactory;

/// Row shape of the admin `tenants` catalog.
#[derive(sqlx::FromRow)]
struct TenantRow {
    tenant_id: String,
    display_name: String,
    latitude: f64,
    longitude: f64,
    db_name: String,
    status: String,
}

impl From<TenantRow> for TenantRecord {
    fn from(row: TenantRow) -> Self {
        TenantRecord {
            tenant_id: row.tenant_id,
            display_name: row.display_name,
            location: GeoPoint::new(row.latitude, row.longitude),
            db_name: row.db_name,
            status: TenantStatus::parse(&row.status),
        }
    }
}

/// Fetches tenant records from an admin pool.
///
/// With `only_active` the query matches what `connect_all` provisions;
/// without it the full catalog is returned (admin listing).
pub(crate) async fn fetch_tenant_records(
    pool: &PgPool,
    only_active: bool,
) -> Result<Vec<TenantRecord>, sqlx::Error> {
    let rows: Vec<TenantRow> = if only_active {
        sqlx::query_as(
            "SELECT tenant_id, display_name, latitude, longitude, db_name, status
             FROM tenants WHERE status = $1 ORDER BY db_name",
        )
        .bind(TenantStatus::Active.as_str())
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as(
            "SELECT tenant_id, display_name, latitude, longitude, db_name, status
             FROM tenants ORDER BY display_name",
        )
        .fetch_all(pool)
        .await?
    };

    Ok(rows.into_iter().map(TenantRecord::from).collect())
}

struct TenantEntry {
    record: TenantRecord,
    pool: PgPool,
}

/// Maps tenant database names to live connection pools.
pub struct TenantRegistry {
    factory: ConnectionFactory,
    entries: DashMap<String, TenantEntry>,
    admin: ArcSwapOption<PgPool>,
}

impl TenantRegistry {
    #[must_use]
    pub fn new(factory: ConnectionFactory) -> Self {
        Self {
            factory,
            entries: DashMap::new(),
            admin: ArcSwapOption::empty(),
        }
    }

    /// Populates the registry: opens the admin pool, enumerates active
    /// tenants, and opens one pool per tenant keyed by database name.
    ///
    /// A tenant whose pool cannot be opened is logged and skipped; it stays
    /// unavailable until the process restarts. Returns the number of
    /// tenants registered.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::AlreadyPopulated`] on a second call.
    /// - [`RegistryError::AdminUnavailable`] when the admin database cannot
    ///   be reached. The registry stays empty and every subsequent tenant
    ///   lookup fails closed; a later retry is permitted.
    /// - [`RegistryError::TenantQuery`] when the catalog query fails.
    pub async fn connect_all(&self) -> Result<usize, RegistryError> {
        if self.admin.load().is_some() {
            return Err(RegistryError::AlreadyPopulated);
        }

        let admin = self.factory.open_admin().await?;
        self.install_admin(admin.clone());

        let records = fetch_tenant_records(&admin, true)
            .await
            .map_err(RegistryError::TenantQuery)?;

        let mut opened = 0;
        for record in records {
            match self.factory.open_tenant(&record.db_name) {
                Ok(pool) => {
                    self.register(record, pool);
                    opened += 1;
                }
                Err(e) => {
                    warn!(
                        tenant = %record.db_name,
                        error = %e,
                        "skipping tenant, connection could not be established"
                    );
                }
            }
        }

        info!(tenants = opened, "tenant registry populated");
        Ok(opened)
    }

    /// Looks up the pool for a tenant database name.
    ///
    /// Pure lookup with no side effects: a tenant that was not registered
    /// at startup is simply absent, never connected on demand.
    #[must_use]
    pub fn get_by_tenant(&self, db_name: &str) -> Option<PgPool> {
        self.entries.get(db_name).map(|entry| entry.pool.clone())
    }

    /// The admin pool, if `connect_all` has established it.
    #[must_use]
    pub fn get_admin(&self) -> Option<PgPool> {
        self.admin.load_full().map(|pool| (*pool).clone())
    }

    /// Provisioning record for a registered tenant.
    #[must_use]
    pub fn record_for(&self, db_name: &str) -> Option<TenantRecord> {
        self.entries.get(db_name).map(|entry| entry.record.clone())
    }

    #[must_use]
    pub fn tenant_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether `connect_all` has run to the point of an admin connection.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.admin.load().is_some()
    }

    pub(crate) fn register(&self, record: TenantRecord, pool: PgPool) {
        self.entries
            .insert(record.db_name.clone(), TenantEntry { record, pool });
    }

    pub(crate) fn install_admin(&self, pool: PgPool) {
        self.admin.store(Some(Arc::new(pool)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenancy::config::DatabaseConfig;
    use std::time::Duration;

    fn test_registry() -> TenantRegistry {
        TenantRegistry::new(ConnectionFactory::new(DatabaseConfig::default()))
    }

    fn record(db_name: &str) -> TenantRecord {
        TenantRecord {
            tenant_id: format!("t-{db_name}"),
            display_name: db_name.to_uppercase(),
            location: GeoPoint::new(12.9716, 77.5946),
            db_name: db_name.to_string(),
            status: TenantStatus::Active,
        }
    }

    fn lazy_pool(db_name: &str) -> PgPool {
        sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&format!("postgres://foreman@127.0.0.1:5432/{db_name}"))
            .unwrap()
    }

    #[tokio::test]
    async fn lookup_returns_none_for_unknown_tenant() {
        let registry = test_registry();
        assert!(registry.get_by_tenant("ghost_db").is_none());
    }

    #[tokio::test]
    async fn lookup_is_stable_across_calls() {
        let registry = test_registry();
        registry.register(record("acme_db"), lazy_pool("acme_db"));

        let first = registry.get_by_tenant("acme_db").unwrap();
        let second = registry.get_by_tenant("acme_db").unwrap();

        // Closing one clone closes the shared inner pool: both lookups
        // returned the same underlying handle.
        first.close().await;
        assert!(second.is_closed());
    }

    #[tokio::test]
    async fn admin_is_absent_until_installed() {
        let registry = test_registry();
        assert!(registry.get_admin().is_none());
        assert!(!registry.is_populated());

        registry.install_admin(lazy_pool("foreman_admin"));
        assert!(registry.get_admin().is_some());
        assert!(registry.is_populated());
    }

    #[tokio::test]
    async fn connect_all_fails_closed_when_admin_unreachable() {
        let config = DatabaseConfig {
            server_url: "postgres://foreman@127.0.0.1:9".to_string(),
            acquire_timeout: Duration::from_millis(500),
            ..DatabaseConfig::default()
        };
        let registry = TenantRegistry::new(ConnectionFactory::new(config));

        let err = registry.connect_all().await.unwrap_err();
        assert!(matches!(err, RegistryError::AdminUnavailable(_)));
        assert_eq!(registry.tenant_count(), 0);
        assert!(registry.get_by_tenant("acme_db").is_none());
        assert!(!registry.is_populated());
    }

    #[tokio::test]
    async fn connect_all_refuses_a_second_population() {
        let registry = test_registry();
        registry.install_admin(lazy_pool("foreman_admin"));

        let err = registry.connect_all().await.unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyPopulated));
    }

    #[tokio::test]
    async fn register_keeps_record_and_pool_together() {
        let registry = test_registry();
        registry.register(record("acme_db"), lazy_pool("acme_db"));
        registry.register(record("beta_db"), lazy_pool("beta_db"));

        assert_eq!(registry.tenant_count(), 2);
        let acme = registry.record_for("acme_db").unwrap();
        assert_eq!(acme.display_name, "ACME_DB");
        assert!(registry.record_for("ghost_db").is_none());
    }

    #[tokio::test]
    async fn reregistering_a_tenant_replaces_the_entry() {
        let registry = test_registry();
        registry.register(record("acme_db"), lazy_pool("acme_db"));
        registry.register(record("acme_db"), lazy_pool("acme_db"));
        assert_eq!(registry.tenant_count(), 1);
    }
}
