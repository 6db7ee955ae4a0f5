//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` creates resources,
//! `start()` binds the TCP listener, and `serve()` starts accepting
//! connections. The gap between `start()` and `serve()` is where the
//! composition root populates the tenant registry, honoring the startup
//! contract that `connect_all()` runs before traffic is accepted.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    check_in_handler, check_out_handler, health_handler, holidays_handler, list_tenants_handler,
    liveness_handler, readiness_handler, AppState,
};
use super::middleware::{build_http_layers, track_in_flight};
use super::shutdown::ShutdownController;
use crate::tenancy::resolve::{resolve_tenant, set_admin_db};
use crate::tenancy::TenantRegistry;

/// Manages the full HTTP server lifecycle.
///
/// Follows the deferred startup pattern:
/// 1. `new()` -- allocates shared state (shutdown controller, app state)
/// 2. `start()` -- binds the TCP listener to the configured address
/// 3. `serve()` -- begins accepting connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    registry: Arc<TenantRegistry>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, registry: Arc<TenantRegistry>) -> Self {
        Self {
            config,
            listener: None,
            registry,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    /// Returns a shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /health`, `/health/live`, `/health/ready` -- probes, no tenancy
    /// - `POST /api/attendance/check-in`, `/api/attendance/check-out`,
    ///   `GET /api/holidays` -- tenant-scoped (resolution middleware)
    /// - `GET /admin/tenants` -- admin-scoped
    pub fn build_router(&self) -> Router {
        let state = AppState {
            tenants: Arc::clone(&self.registry),
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::new(self.config.clone()),
            start_time: Instant::now(),
        };

        let tenant_routes = Router::new()
            .route("/attendance/check-in", post(check_in_handler))
            .route("/attendance/check-out", post(check_out_handler))
            .route("/holidays", get(holidays_handler))
            .layer(from_fn_with_state(state.clone(), resolve_tenant))
            .layer(from_fn_with_state(state.clone(), track_in_flight));

        let admin_routes = Router::new()
            .route("/tenants", get(list_tenants_handler))
            .layer(from_fn_with_state(state.clone(), set_admin_db))
            .layer(from_fn_with_state(state.clone(), track_in_flight));

        let layers = build_http_layers(&self.config);

        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .nest("/api", tenant_routes)
            .nest("/admin", admin_routes)
            .layer(layers)
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Starts serving connections until the shutdown signal fires.
    ///
    /// Consumes `self` because the listener is moved into the server.
    /// After the shutdown signal, health transitions to Draining and the
    /// server waits up to 30 seconds for in-flight requests to complete.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a fatal I/O error.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let listener = self
            .listener
            .expect("start() must be called before serve()");
        let shutdown_ctrl = Arc::clone(&self.shutdown);
        let tls = self.config.tls.clone();

        // Transition to Ready so readiness probes pass.
        shutdown_ctrl.set_ready();

        if let Some(tls_config) = tls {
            serve_tls(listener, router, &tls_config, shutdown_ctrl, shutdown).await
        } else {
            serve_plain(listener, router, shutdown_ctrl, shutdown).await
        }
    }
}

/// Serves plain HTTP connections using axum's built-in server.
async fn serve_plain(
    listener: TcpListener,
    router: Router,
    shutdown_ctrl: Arc<ShutdownController>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("Serving plain HTTP connections");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    drain(shutdown_ctrl).await;
    Ok(())
}

/// Serves TLS connections using `axum-server` with rustls.
///
/// Reuses the pre-bound TCP listener by converting it to a `std::net::TcpListener`.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls_config: &super::config::TlsConfig,
    shutdown_ctrl: Arc<ShutdownController>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls_config.cert_path, &tls_config.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!("Serving TLS connections on {}", addr);

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    drain(shutdown_ctrl).await;
    Ok(())
}

/// Transitions to Draining and waits for in-flight requests to complete.
async fn drain(shutdown_ctrl: Arc<ShutdownController>) {
    shutdown_ctrl.trigger_shutdown();

    let drained = shutdown_ctrl.wait_for_drain(Duration::from_secs(30)).await;
    if drained {
        info!("All in-flight requests drained");
    } else {
        warn!("Drain timeout expired with in-flight requests remaining");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenancy::{ConnectionFactory, DatabaseConfig};

    fn test_registry() -> Arc<TenantRegistry> {
        Arc::new(TenantRegistry::new(ConnectionFactory::new(
            DatabaseConfig::default(),
        )))
    }

    fn localhost_config() -> NetworkConfig {
        NetworkConfig {
            host: "127.0.0.1".to_string(),
            ..NetworkConfig::default()
        }
    }

    #[test]
    fn new_creates_module_without_binding() {
        let module = NetworkModule::new(localhost_config(), test_registry());
        assert!(module.listener.is_none());
    }

    #[test]
    fn shutdown_controller_returns_shared_arc() {
        let module = NetworkModule::new(localhost_config(), test_registry());
        let a = module.shutdown_controller();
        let b = module.shutdown_controller();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn build_router_creates_router() {
        let module = NetworkModule::new(localhost_config(), test_registry());
        let _router = module.build_router();
    }

    #[tokio::test]
    async fn start_binds_to_os_assigned_port() {
        let mut module = NetworkModule::new(localhost_config(), test_registry());
        let port = module.start().await.expect("start should succeed");
        assert!(port > 0, "OS-assigned port should be > 0");
        assert!(module.listener.is_some());
    }

    #[tokio::test]
    #[should_panic(expected = "start() must be called before serve()")]
    async fn serve_panics_without_start() {
        let module = NetworkModule::new(localhost_config(), test_registry());
        let _ = module.serve(std::future::pending::<()>()).await;
    }
}
