//! Context reuse.

use std::sync::Arc;

use bytes::Bytes;
use crossbeam::queue::ArrayQueue;
use fox_router::RouteTable;
use http::Request;

use crate::context::Context;
use crate::handler::BoxedHandler;
use crate::settings::Settings;

/// A bounded pool of idle contexts.
///
/// Acquiring resets the context before loading the request, so no field of a
/// previous request is ever visible to the next one. When the pool is empty a
/// new context is allocated; when it is full a released context is dropped.
pub struct ContextPool {
    idle: ArrayQueue<Box<Context>>,
    table: Arc<RouteTable<BoxedHandler>>,
    settings: Arc<Settings>,
}

impl ContextPool {
    pub(crate) fn new(table: Arc<RouteTable<BoxedHandler>>, settings: Arc<Settings>) -> Self {
        Self {
            idle: ArrayQueue::new(settings.pool_capacity.max(1)),
            table,
            settings,
        }
    }

    /// Takes a context and loads `request` into it.
    pub fn acquire(&self, request: Request<Bytes>) -> Box<Context> {
        let mut ctx = self.idle.pop().unwrap_or_else(|| {
            Box::new(Context::new(
                Arc::clone(&self.table),
                Arc::clone(&self.settings),
            ))
        });
        ctx.reset();
        ctx.populate(request);
        ctx
    }

    /// Returns a context to the pool.
    pub fn release(&self, ctx: Box<Context>) {
        // A full pool drops the context.
        let _ = self.idle.push(ctx);
    }

    /// Number of idle contexts.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    /// Most idle contexts kept.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.idle.capacity()
    }
}

impl std::fmt::Debug for ContextPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextPool")
            .field("idle", &self.idle.len())
            .field("capacity", &self.idle.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchState;
    use http::{Method, StatusCode};

    fn pool(capacity: usize) -> ContextPool {
        let settings = Settings {
            pool_capacity: capacity,
            ..Settings::default()
        };
        let table = RouteTable::new(settings.routing_policy());
        ContextPool::new(Arc::new(table), Arc::new(settings))
    }

    fn request(uri: &str) -> Request<Bytes> {
        Request::builder()
            .method(Method::PUT)
            .uri(uri)
            .body(Bytes::from_static(b"body"))
            .unwrap()
    }

    #[test]
    fn test_acquire_allocates_when_empty() {
        let pool = pool(4);
        assert_eq!(pool.idle(), 0);
        let ctx = pool.acquire(request("/a"));
        assert_eq!(ctx.path(), "/a");
        pool.release(ctx);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_reused_context_carries_nothing_over() {
        let pool = pool(1);
        let mut ctx = pool.acquire(request("/first?x=1"));
        ctx.set_local("secret", 1_u8);
        ctx.status(StatusCode::IM_A_TEAPOT).send_string("tea");
        ctx.set_header("x-leak", "1").unwrap();
        ctx.state = DispatchState::Aborted;
        pool.release(ctx);

        let ctx = pool.acquire(request("/second"));
        assert_eq!(ctx.path(), "/second");
        assert_eq!(ctx.query_string(), None);
        assert_eq!(ctx.local::<u8>("secret"), None);
        assert_eq!(ctx.response_status(), StatusCode::OK);
        assert!(ctx.response_body().is_empty());
        assert!(ctx.response_header("x-leak").is_none());
        assert_eq!(ctx.state(), DispatchState::NotStarted);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_full_pool_drops_extra_contexts() {
        let pool = pool(1);
        let a = pool.acquire(request("/a"));
        let b = pool.acquire(request("/b"));
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.idle(), 1);
        assert_eq!(pool.capacity(), 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        assert_eq!(pool(0).capacity(), 1);
    }
}
