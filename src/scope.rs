//! Lifecycle scopes for in-flight requests.
//!
//! A state container owns a [`Scope`]. Requests run through [`Scope::run`]
//! and are aborted when the scope is cancelled or dropped, so a response that
//! resolves after its owner went away never reaches the owner's state.

use futures::future::{AbortHandle, Abortable};
use std::future::Future;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::errors::{ApiError, ApiResult};

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    /// Handles of requests still in flight, keyed by registration id.
    handles: Mutex<HashMap<u64, AbortHandle>>,
}

#[derive(Clone, Default)]
pub struct Scope {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Abort every request running under this scope and refuse new ones.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        let handles = match self.inner.handles.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for handle in handles.into_values() {
            handle.abort();
        }
    }

    /// Run `fut` under this scope. Resolves to [`ApiError::Cancelled`] when the
    /// scope is cancelled before or while `fut` runs.
    pub async fn run<T, F>(&self, fut: F) -> ApiResult<T>
    where
        F: Future<Output = ApiResult<T>>,
    {
        if self.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let (handle, registration) = AbortHandle::new_pair();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.inner.handles.lock() {
            guard.insert(id, handle);
        }
        let _registered = Registered {
            inner: &self.inner,
            id,
        };
        match Abortable::new(fut, registration).await {
            Ok(_) if self.is_cancelled() => Err(ApiError::Cancelled),
            Ok(result) => result,
            Err(_aborted) => Err(ApiError::Cancelled),
        }
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.inner.handles.lock().map(|h| h.len()).unwrap_or_default()
    }
}

/// Removes a request's handle once it finishes or its future is dropped.
struct Registered<'a> {
    inner: &'a Inner,
    id: u64,
}

impl Drop for Registered<'_> {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.inner.handles.lock() {
            guard.remove(&self.id);
        }
    }
}

/// Cancels its scope when dropped.
#[derive(Debug)]
pub struct ScopeGuard(Scope);

impl ScopeGuard {
    pub fn new(scope: Scope) -> Self {
        Self(scope)
    }

    pub fn scope(&self) -> &Scope {
        &self.0
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn run_passes_through_results() {
        let scope = Scope::new();
        let value = scope.run(async { Ok::<_, ApiError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn cancel_aborts_pending_requests() {
        let scope = Scope::new();
        let worker = scope.clone();
        let pending = tokio::spawn(async move {
            worker
                .run(async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok::<_, ApiError>(1)
                })
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        scope.cancel();
        let result = pending.await.unwrap();
        assert!(matches!(result, Err(ApiError::Cancelled)));
    }

    #[tokio::test]
    async fn cancelled_scope_refuses_new_work() {
        let scope = Scope::new();
        drop(ScopeGuard::new(scope.clone()));
        assert!(scope.is_cancelled());
        let result = scope.run(async { Ok::<_, ApiError>(()) }).await;
        assert!(result.unwrap_err().is_cancelled());
    }
    #[tokio::test]
    async fn finished_requests_release_their_handles() {
        let scope = Scope::new();
        for i in 0..100 {
            scope.run(async move { Ok::<_, ApiError>(i) }).await.unwrap();
        }
        let _ = scope
            .run(async { Err::<(), _>(ApiError::InvalidInput("bad".into())) })
            .await;
        assert_eq!(scope.in_flight(), 0);

        let worker = scope.clone();
        let pending = tokio::spawn(async move {
            worker
                .run(async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok::<_, ApiError>(())
                })
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(scope.in_flight(), 1);
        scope.cancel();
        assert!(pending.await.unwrap().unwrap_err().is_cancelled());
        assert_eq!(scope.in_flight(), 0);
    }
}
