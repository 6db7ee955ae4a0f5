//! Request-scoped ambient storage built on tokio task-locals.
//!
//! A connection reference cannot live in a global: two requests interleaved
//! at any await point would observe each other's tenant. The scope is a
//! task-local cell installed around each request's remaining middleware
//! chain, so anything transitively awaited by the handler reads its own
//! request's bindings and nothing else's.
//!
//! Values are keyed by type, mirroring the type-indexed lookup used
//! elsewhere in the server. The only bindings in practice are
//! [`TenantConnection`] and [`AdminConnection`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use sqlx::PgPool;

tokio::task_local! {
    static ACTIVE_SCOPE: Arc<ScopeStore>;
}

/// Type-indexed store for one request scope.
#[derive(Default)]
struct ScopeStore {
    values: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

/// Runs `fut` inside a fresh scope.
///
/// Bindings made by `fut` (or anything it awaits) are visible for the
/// duration of `fut` and discarded when it completes. Concurrent scopes
/// never observe each other's bindings, however their awaits interleave.
pub async fn run_scoped<F>(fut: F) -> F::Output
where
    F: Future,
{
    ACTIVE_SCOPE.scope(Arc::new(ScopeStore::default()), fut).await
}

/// Binds `value` in the active scope, replacing any previous binding of the
/// same type. Returns `false` when no scope is active (the value is dropped).
pub fn bind<T: Clone + Send + Sync + 'static>(value: T) -> bool {
    ACTIVE_SCOPE
        .try_with(|store| {
            store.values.write().insert(TypeId::of::<T>(), Box::new(value));
        })
        .is_ok()
}

/// Reads a binding from the active scope. Returns `None` outside any scope
/// or when nothing of type `T` was bound.
#[must_use]
pub fn get<T: Clone + Send + Sync + 'static>() -> Option<T> {
    ACTIVE_SCOPE
        .try_with(|store| {
            store
                .values
                .read()
                .get(&TypeId::of::<T>())
                .and_then(|boxed| boxed.downcast_ref::<T>())
                .cloned()
        })
        .ok()
        .flatten()
}

/// The tenant connection resolved for this request. `None` inside means the
/// credential named a tenant the registry does not know; the failure is
/// deferred to whichever handler first needs the pool.
#[derive(Clone)]
pub struct TenantConnection(pub Option<PgPool>);

/// The admin database connection, bound on admin-database routes.
#[derive(Clone)]
pub struct AdminConnection(pub Option<PgPool>);

/// Convenience lookup for the bound tenant pool.
///
/// Collapses "no scope", "nothing bound", and "tenant unknown" into `None`:
/// callers are contractually required to handle the absent case before use.
#[must_use]
pub fn tenant_connection() -> Option<PgPool> {
    get::<TenantConnection>().and_then(|conn| conn.0)
}

/// Convenience lookup for the bound admin pool.
#[must_use]
pub fn admin_connection() -> Option<PgPool> {
    get::<AdminConnection>().and_then(|conn| conn.0)
}
