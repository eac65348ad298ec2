//! Bounded asynchronous connection pool.
//!
//! The pool owns every connection it hands out. A lease is represented by a
//! [`PoolGuard`] whose `Drop` returns the connection on every exit path —
//! success, error, or cancellation — so leases cannot leak. The `max_total`
//! bound is enforced by a semaphore: one permit per allowed lease.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::{debug, warn};

use curio_core::config::database::DatabaseConfig;
use curio_core::error::PoolError;

/// Opens, validates, and closes the underlying transport connections.
///
/// The pool is generic over this trait so its lease accounting can be
/// tested without a real database.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// The transport handle being pooled.
    type Conn: Send + 'static;

    /// Open a fresh connection.
    async fn connect(&self) -> Result<Self::Conn, PoolError>;

    /// Check that a connection is still alive.
    async fn ping(&self, conn: &mut Self::Conn) -> bool;

    /// Close a connection gracefully.
    async fn close(&self, conn: Self::Conn);
}

/// Pool sizing and timing knobs.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Idle connections opened eagerly at startup.
    pub min_idle: u32,
    /// Hard upper bound on connections in existence.
    pub max_total: u32,
    /// How long `acquire` waits before reporting exhaustion.
    pub acquire_timeout: Duration,
    /// Idle connections older than this are pinged before reuse.
    pub idle_validation_interval: Duration,
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            min_idle: config.min_idle,
            max_total: config.max_total,
            acquire_timeout: config.acquire_timeout(),
            idle_validation_interval: config.idle_validation_interval(),
        }
    }
}

/// A bounded set of reusable connections.
///
/// All lease-state transitions go through [`Pool::acquire`] and guard drop;
/// the mutable internals live in one mutex-guarded structure and are never
/// exposed.
pub struct Pool<F: ConnectionFactory> {
    inner: Arc<PoolInner<F>>,
}

impl<F: ConnectionFactory> Clone for Pool<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct PoolInner<F: ConnectionFactory> {
    factory: F,
    config: PoolConfig,
    /// One permit per allowed lease; enforces the `max_total` bound.
    semaphore: Arc<Semaphore>,
    state: Mutex<PoolState<F::Conn>>,
    closed: AtomicBool,
}

struct PoolState<C> {
    idle: VecDeque<IdleConn<C>>,
    /// Connections currently in existence (idle + leased).
    total: u32,
    next_id: u64,
}

struct IdleConn<C> {
    id: u64,
    conn: C,
    idle_since: Instant,
}

impl<C> PoolState<C> {
    /// Account for a newly created connection and assign it an id.
    fn register(&mut self) -> u64 {
        self.total += 1;
        self.next_id += 1;
        self.next_id
    }
}

impl<F: ConnectionFactory> PoolInner<F> {
    fn lock_state(&self) -> MutexGuard<'_, PoolState<F::Conn>> {
        self.state.lock().expect("pool state lock poisoned")
    }
}

impl<F: ConnectionFactory> Pool<F> {
    /// Create the pool and eagerly open `min_idle` connections.
    pub async fn connect(factory: F, config: PoolConfig) -> Result<Self, PoolError> {
        let pool = Self {
            inner: Arc::new(PoolInner {
                semaphore: Arc::new(Semaphore::new(config.max_total as usize)),
                state: Mutex::new(PoolState {
                    idle: VecDeque::new(),
                    total: 0,
                    next_id: 0,
                }),
                closed: AtomicBool::new(false),
                factory,
                config,
            }),
        };

        let warm = pool.inner.config.min_idle.min(pool.inner.config.max_total);
        for _ in 0..warm {
            let conn = pool.inner.factory.connect().await?;
            let mut state = pool.inner.lock_state();
            let id = state.register();
            state.idle.push_back(IdleConn {
                id,
                conn,
                idle_since: Instant::now(),
            });
        }

        debug!(
            min_idle = pool.inner.config.min_idle,
            max_total = pool.inner.config.max_total,
            "connection pool ready"
        );
        Ok(pool)
    }

    /// Lease a connection, waiting up to the acquire timeout.
    ///
    /// Returns [`PoolError::Exhausted`] when no lease frees up in time and
    /// [`PoolError::Closed`] once the pool has been shut down.
    pub async fn acquire(&self) -> Result<PoolGuard<F>, PoolError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(PoolError::Closed);
        }

        let permit = match tokio::time::timeout(
            self.inner.config.acquire_timeout,
            Arc::clone(&self.inner.semaphore).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            // The semaphore is closed during shutdown to wake waiters.
            Ok(Err(_)) => return Err(PoolError::Closed),
            Err(_) => return Err(PoolError::Exhausted),
        };

        loop {
            let candidate = self.inner.lock_state().idle.pop_front();
            match candidate {
                Some(mut idle) => {
                    if idle.idle_since.elapsed() >= self.inner.config.idle_validation_interval
                        && !self.inner.factory.ping(&mut idle.conn).await
                    {
                        warn!(conn_id = idle.id, "idle connection failed validation, discarding");
                        self.inner.lock_state().total -= 1;
                        continue;
                    }
                    return Ok(PoolGuard::lease(
                        Arc::clone(&self.inner),
                        idle.id,
                        idle.conn,
                        permit,
                    ));
                }
                None => {
                    // Holding a permit while the idle set is empty means
                    // capacity remains for exactly one more connection.
                    let conn = self.inner.factory.connect().await?;
                    let id = self.inner.lock_state().register();
                    debug!(conn_id = id, "opened new pooled connection");
                    return Ok(PoolGuard::lease(Arc::clone(&self.inner), id, conn, permit));
                }
            }
        }
    }

    /// Connections currently in existence (idle + leased).
    pub fn size(&self) -> u32 {
        self.inner.lock_state().total
    }

    /// Idle connections ready for lease.
    pub fn idle_count(&self) -> usize {
        self.inner.lock_state().idle.len()
    }

    /// Shut the pool down.
    ///
    /// Closes idle connections and wakes waiting acquirers with
    /// [`PoolError::Closed`]. Outstanding leases are discarded when their
    /// guards drop.
    pub async fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.semaphore.close();

        let drained: Vec<IdleConn<F::Conn>> = {
            let mut state = self.inner.lock_state();
            let drained: Vec<_> = state.idle.drain(..).collect();
            state.total -= drained.len() as u32;
            drained
        };
        for idle in drained {
            self.inner.factory.close(idle.conn).await;
        }
        debug!("connection pool closed");
    }
}

/// An exclusive lease on one pooled connection.
///
/// Dereferences to the transport handle. Dropping the guard releases the
/// lease; a guard marked broken discards its connection instead, and the
/// pool recreates capacity lazily on a later acquire.
pub struct PoolGuard<F: ConnectionFactory> {
    inner: Arc<PoolInner<F>>,
    conn: Option<F::Conn>,
    id: u64,
    broken: bool,
    _permit: OwnedSemaphorePermit,
}

impl<F: ConnectionFactory> PoolGuard<F> {
    fn lease(
        inner: Arc<PoolInner<F>>,
        id: u64,
        conn: F::Conn,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            inner,
            conn: Some(conn),
            id,
            broken: false,
            _permit: permit,
        }
    }

    /// Pool-assigned connection id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Mark the connection unusable; it will be discarded on release.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }
}

impl<F: ConnectionFactory> std::fmt::Debug for PoolGuard<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolGuard")
            .field("id", &self.id)
            .field("broken", &self.broken)
            .finish_non_exhaustive()
    }
}

impl<F: ConnectionFactory> std::ops::Deref for PoolGuard<F> {
    type Target = F::Conn;

    fn deref(&self) -> &F::Conn {
        self.conn.as_ref().expect("connection already released")
    }
}

impl<F: ConnectionFactory> std::ops::DerefMut for PoolGuard<F> {
    fn deref_mut(&mut self) -> &mut F::Conn {
        self.conn.as_mut().expect("connection already released")
    }
}

impl<F: ConnectionFactory> Drop for PoolGuard<F> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            let mut state = self.inner.lock_state();
            if self.broken || self.inner.closed.load(Ordering::SeqCst) {
                state.total -= 1;
                debug!(conn_id = self.id, broken = self.broken, "discarding connection");
                drop(conn);
            } else {
                state.idle.push_back(IdleConn {
                    id: self.id,
                    conn,
                    idle_since: Instant::now(),
                });
            }
        }
        // The permit drops afterwards, letting the next acquirer proceed.
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

    use super::*;

    #[derive(Clone, Default)]
    struct FakeFactory {
        created: Arc<AtomicU64>,
        live: Arc<AtomicI64>,
        max_live: Arc<AtomicI64>,
        healthy: Arc<AtomicBool>,
        fail_connect: Arc<AtomicBool>,
    }

    impl FakeFactory {
        fn new() -> Self {
            let factory = Self::default();
            factory.healthy.store(true, Ordering::SeqCst);
            factory
        }
    }

    struct FakeConn {
        serial: u64,
        live: Arc<AtomicI64>,
    }

    impl Drop for FakeConn {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ConnectionFactory for FakeFactory {
        type Conn = FakeConn;

        async fn connect(&self) -> Result<FakeConn, PoolError> {
            if self.fail_connect.load(Ordering::SeqCst) {
                return Err(PoolError::Connect("refused".to_string()));
            }
            let serial = self.created.fetch_add(1, Ordering::SeqCst) + 1;
            let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_live.fetch_max(live, Ordering::SeqCst);
            Ok(FakeConn {
                serial,
                live: Arc::clone(&self.live),
            })
        }

        async fn ping(&self, _conn: &mut FakeConn) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }

        async fn close(&self, conn: FakeConn) {
            drop(conn);
        }
    }

    fn config(max_total: u32, acquire_timeout_ms: u64) -> PoolConfig {
        PoolConfig {
            min_idle: 0,
            max_total,
            acquire_timeout: Duration::from_millis(acquire_timeout_ms),
            idle_validation_interval: Duration::from_secs(3600),
        }
    }

    #[tokio::test]
    async fn test_acquire_reuses_released_connection() {
        let factory = FakeFactory::new();
        let pool = Pool::connect(factory.clone(), config(2, 1000)).await.unwrap();

        let first_id = {
            let guard = pool.acquire().await.unwrap();
            guard.id()
        };
        let guard = pool.acquire().await.unwrap();
        assert_eq!(guard.id(), first_id);
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_min_idle_connections_opened_eagerly() {
        let factory = FakeFactory::new();
        let mut cfg = config(5, 1000);
        cfg.min_idle = 2;
        let pool = Pool::connect(factory.clone(), cfg).await.unwrap();

        assert_eq!(pool.size(), 2);
        assert_eq!(pool.idle_count(), 2);
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_lease_count_never_exceeds_max_total() {
        let factory = FakeFactory::new();
        let pool = Pool::connect(factory.clone(), config(5, 5000)).await.unwrap();

        let leased = Arc::new(AtomicI64::new(0));
        let max_leased = Arc::new(AtomicI64::new(0));
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..50 {
            let pool = pool.clone();
            let leased = Arc::clone(&leased);
            let max_leased = Arc::clone(&max_leased);
            tasks.spawn(async move {
                let guard = pool.acquire().await.unwrap();
                let now = leased.fetch_add(1, Ordering::SeqCst) + 1;
                max_leased.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                leased.fetch_sub(1, Ordering::SeqCst);
                drop(guard);
            });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap();
        }

        assert!(max_leased.load(Ordering::SeqCst) <= 5);
        assert!(factory.max_live.load(Ordering::SeqCst) <= 5);
        assert!(pool.size() <= 5);
    }

    #[tokio::test]
    async fn test_acquire_times_out_when_exhausted() {
        let factory = FakeFactory::new();
        let pool = Pool::connect(factory, config(1, 50)).await.unwrap();

        let _held = pool.acquire().await.unwrap();
        let err = pool.acquire().await.unwrap_err();
        assert_eq!(err, PoolError::Exhausted);
    }

    #[tokio::test]
    async fn test_broken_connection_replaced_by_fresh_one() {
        let factory = FakeFactory::new();
        let pool = Pool::connect(factory.clone(), config(2, 1000)).await.unwrap();

        let first_serial = {
            let mut guard = pool.acquire().await.unwrap();
            let serial = guard.serial;
            guard.mark_broken();
            serial
        };

        // The broken connection must not be back in the idle set.
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.size(), 0);

        let guard = pool.acquire().await.unwrap();
        assert_ne!(guard.serial, first_serial);
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_idle_connection_revalidated_before_reuse() {
        let factory = FakeFactory::new();
        let mut cfg = config(2, 1000);
        cfg.idle_validation_interval = Duration::ZERO;
        let pool = Pool::connect(factory.clone(), cfg).await.unwrap();

        drop(pool.acquire().await.unwrap());
        factory.healthy.store(false, Ordering::SeqCst);

        // The dead idle connection is discarded and a new one opened.
        let _guard = pool.acquire().await.unwrap();
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);
        assert_eq!(pool.size(), 1);
    }

    #[tokio::test]
    async fn test_close_rejects_pending_and_future_acquires() {
        let factory = FakeFactory::new();
        let pool = Pool::connect(factory, config(1, 5000)).await.unwrap();

        let held = pool.acquire().await.unwrap();
        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await.map(|_| ()) })
        };
        // Let the waiter park on the semaphore before closing.
        tokio::time::sleep(Duration::from_millis(10)).await;

        pool.close().await;
        assert_eq!(waiter.await.unwrap().unwrap_err(), PoolError::Closed);
        assert_eq!(pool.acquire().await.unwrap_err(), PoolError::Closed);

        // An outstanding lease released after close is discarded, not idled.
        drop(held);
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_holder_releases_lease() {
        let factory = FakeFactory::new();
        let pool = Pool::connect(factory, config(1, 200)).await.unwrap();

        let holder = {
            let pool = pool.clone();
            tokio::spawn(async move {
                let _guard = pool.acquire().await.unwrap();
                tokio::time::sleep(Duration::from_secs(60)).await;
            })
        };
        // Wait until the task actually holds the lease, then abort it.
        while pool.size() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        holder.abort();
        let _ = holder.await;

        // The abort dropped the guard, so the lease must be available again.
        let guard = pool.acquire().await;
        assert!(guard.is_ok());
    }

    #[tokio::test]
    async fn test_connect_failure_surfaces_and_frees_capacity() {
        let factory = FakeFactory::new();
        let pool = Pool::connect(factory.clone(), config(1, 200)).await.unwrap();

        factory.fail_connect.store(true, Ordering::SeqCst);
        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, PoolError::Connect(_)));

        // The failed attempt must not eat the permit or the capacity slot.
        factory.fail_connect.store(false, Ordering::SeqCst);
        assert!(pool.acquire().await.is_ok());
        assert_eq!(pool.size(), 1);
    }
}
