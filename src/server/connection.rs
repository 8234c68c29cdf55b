//! Connection bookkeeping.
//!
//! Connection state is a counter, not a collection of connection objects.
//! `ConnectionTracking` wraps the router's make-service so the counter moves
//! exactly once per accepted connection: up when the connection's service is
//! made, down when it is dropped.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use axum::Router;
use axum::extract::ConnectInfo;
use axum::extract::Request;
use axum::extract::connect_info::IntoMakeServiceWithConnectInfo;
use axum::middleware::AddExtension;
use axum::serve::IncomingStream;
use tokio::net::TcpListener;
use tower::Service;

/// Monotonic open/close counter shared between the acceptor, the monitor,
/// and shutdown. Decrements saturate at zero.
#[derive(Clone, Default)]
pub struct ConnectionCounter {
    inner: Arc<Counts>,
}

#[derive(Default)]
struct Counts {
    active: AtomicU64,
    opened: AtomicU64,
}

impl ConnectionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.inner.opened.fetch_add(1, Ordering::AcqRel);
        self.inner.active.fetch_add(1, Ordering::AcqRel);
    }

    pub fn connection_closed(&self) {
        let _ = self
            .inner
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Connections currently open.
    pub fn active(&self) -> u64 {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Connections accepted over the server's lifetime.
    pub fn total_opened(&self) -> u64 {
        self.inner.opened.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.inner.active.store(0, Ordering::Release);
        self.inner.opened.store(0, Ordering::Release);
    }
}

/// Decrements the counter when the connection's service is dropped.
pub struct ConnectionGuard {
    counter: ConnectionCounter,
}

impl ConnectionGuard {
    fn open(counter: ConnectionCounter) -> Self {
        counter.connection_opened();
        Self { counter }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.connection_closed();
    }
}

/// The per-connection service produced for each accepted stream. Clones
/// share the guard, so a connection is counted once no matter how many
/// times axum clones its service.
#[derive(Clone)]
pub struct TrackedService<S> {
    inner: S,
    _connection: Arc<ConnectionGuard>,
}

impl<S> Service<Request> for TrackedService<S>
where
    S: Service<Request>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        self.inner.call(req)
    }
}

type InnerMakeService = IntoMakeServiceWithConnectInfo<Router, SocketAddr>;
type ConnectedRouter = AddExtension<Router, ConnectInfo<SocketAddr>>;

/// Make-service wrapper installed at `axum::serve`: counts each accepted
/// connection and hands the router service through untouched.
pub struct ConnectionTracking {
    inner: InnerMakeService,
    counter: ConnectionCounter,
}

impl ConnectionTracking {
    pub fn new(router: Router, counter: ConnectionCounter) -> Self {
        Self {
            inner: router.into_make_service_with_connect_info::<SocketAddr>(),
            counter,
        }
    }
}

impl<'a> Service<IncomingStream<'a, TcpListener>> for ConnectionTracking {
    type Response = TrackedService<ConnectedRouter>;
    type Error = Infallible;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Infallible>> + Send + 'a>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        <InnerMakeService as Service<IncomingStream<'a, TcpListener>>>::poll_ready(
            &mut self.inner,
            cx,
        )
    }

    fn call(&mut self, stream: IncomingStream<'a, TcpListener>) -> Self::Future {
        let guard = ConnectionGuard::open(self.counter.clone());
        let make = self.inner.call(stream);
        Box::pin(async move {
            let service = make.await?;
            Ok(TrackedService {
                inner: service,
                _connection: Arc::new(guard),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_opens_minus_closes() {
        let counter = ConnectionCounter::new();
        for _ in 0..5 {
            counter.connection_opened();
        }
        for _ in 0..3 {
            counter.connection_closed();
        }
        assert_eq!(counter.active(), 2);
        assert_eq!(counter.total_opened(), 5);
    }

    #[test]
    fn never_goes_negative() {
        let counter = ConnectionCounter::new();
        counter.connection_opened();
        counter.connection_closed();
        counter.connection_closed();
        counter.connection_closed();
        assert_eq!(counter.active(), 0);
    }

    #[test]
    fn guard_closes_on_drop() {
        let counter = ConnectionCounter::new();
        {
            let _guard = ConnectionGuard::open(counter.clone());
            assert_eq!(counter.active(), 1);
        }
        assert_eq!(counter.active(), 0);
        assert_eq!(counter.total_opened(), 1);
    }

    #[test]
    fn reset_zeroes_both_counters() {
        let counter = ConnectionCounter::new();
        counter.connection_opened();
        counter.connection_opened();
        counter.reset();
        assert_eq!(counter.active(), 0);
        assert_eq!(counter.total_opened(), 0);
    }
}
