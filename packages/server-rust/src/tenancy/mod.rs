//! Multi-tenant connection routing.
//!
//! The subsystem has four pieces, wired together per request:
//! 1. [`ConnectionFactory`] opens one `PostgreSQL` pool per tenant (plus the
//!    admin pool) and ensures the schema each side needs.
//! 2. [`TenantRegistry`] holds the process-wide map from tenant database
//!    name to pool, populated once at startup by [`TenantRegistry::connect_all`].
//! 3. [`scope`] provides the task-local request scope that carries the
//!    resolved pool across await points without parameter threading.
//! 4. [`resolve`] is the axum middleware that parses the credential, looks
//!    the pool up, and runs the rest of the request inside a scope.

pub mod config;
pub mod error;
pub mod factory;
pub mod registry;
pub mod resolve;
pub mod scope;

pub use config::DatabaseConfig;
pub use error::{ApiError, FactoryError, RegistryError, ResolveError};
pub use factory::ConnectionFactory;
pub use registry::TenantRegistry;
pub use scope::{admin_connection, tenant_connection, AdminConnection, TenantConnection};
