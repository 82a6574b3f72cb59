use std::cell::Cell;
use std::future::Future;

use super::{TenantError, TenantId, DEFAULT_TENANT_ID};

tokio::task_local! {
    static CURRENT_TENANT: TenantId;
}

thread_local! {
    static BLOCKING_TENANT: Cell<Option<TenantId>> = const { Cell::new(None) };
}

/// Parse a raw header value into a tenant id.
///
/// Absent or blank values resolve to the default tenant. Anything that is not
/// a decimal integer is rejected rather than defaulted.
pub fn establish(raw: Option<&str>) -> Result<TenantId, TenantError> {
    establish_or(raw, TenantId(DEFAULT_TENANT_ID))
}

/// Same as [`establish`] with an explicit fallback tenant
pub fn establish_or(raw: Option<&str>, fallback: TenantId) -> Result<TenantId, TenantError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(fallback),
        Some(value) => value
            .parse::<i32>()
            .map(TenantId)
            .map_err(|_| TenantError::MalformedTenantId(value.to_string())),
    }
}

/// Run `fut` with `tenant` as the current tenant.
///
/// The slot belongs to this future only and is released when it completes,
/// panics, or is dropped mid-flight.
pub async fn scope<F>(tenant: TenantId, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_TENANT.scope(tenant, fut).await
}

/// Tenant of the currently executing request
pub fn current() -> Result<TenantId, TenantError> {
    if let Ok(tenant) = CURRENT_TENANT.try_with(|t| *t) {
        return Ok(tenant);
    }
    BLOCKING_TENANT
        .with(|slot| slot.get())
        .ok_or(TenantError::NotEstablished)
}

/// Install `tenant` on the calling thread until the guard is dropped.
///
/// For synchronous code on blocking worker threads, where task-locals are not
/// visible.
pub fn enter(tenant: TenantId) -> TenantGuard {
    let previous = BLOCKING_TENANT.with(|slot| slot.replace(Some(tenant)));
    TenantGuard { previous }
}

/// Remove the calling thread's tenant
pub fn clear() {
    BLOCKING_TENANT.with(|slot| slot.set(None));
}

/// Restores the thread's previous tenant slot on drop
#[must_use = "the tenant is cleared as soon as the guard is dropped"]
pub struct TenantGuard {
    previous: Option<TenantId>,
}

impl Drop for TenantGuard {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(previous) => BLOCKING_TENANT.with(|slot| slot.set(Some(previous))),
            None => clear(),
        }
    }
}

/// `tokio::task::spawn_blocking` that carries the current tenant along
pub fn spawn_blocking<F, R>(f: F) -> tokio::task::JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let tenant = current().ok();
    tokio::task::spawn_blocking(move || {
        let _guard = tenant.map(enter);
        f()
    })
}
