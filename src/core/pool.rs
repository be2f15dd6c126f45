//! 後端資源連線池。
//!
//! 兩種策略在建構時選定：
//! - transient：每次 `acquire` 建立新資源，`release` 立即銷毀。
//! - persistent：第一次使用時建立並快取，之後所有操作共用，直到 `shutdown`
//!   或 `invalidate` 清除快取。建立過程在單一臨界區內完成，並行的呼叫者
//!   不會建立兩個資源。

use crate::domain::ports::ConnectionFactory;
use crate::utils::error::{FaxError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolPolicy {
    Transient,
    Persistent,
}

impl PoolPolicy {
    pub fn from_persistent_flag(persistent: bool) -> Self {
        if persistent {
            PoolPolicy::Persistent
        } else {
            PoolPolicy::Transient
        }
    }
}

/// 借出的資源
#[derive(Debug)]
pub struct Connection<R> {
    resource: Arc<R>,
}

impl<R> Connection<R> {
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// 兩個連線是否指向同一個底層資源
    pub fn same_resource(&self, other: &Connection<R>) -> bool {
        Arc::ptr_eq(&self.resource, &other.resource)
    }
}

impl<R> std::ops::Deref for Connection<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.resource
    }
}

#[async_trait]
trait PoolStrategy<R>: Send + Sync {
    async fn acquire(&self) -> Result<Connection<R>>;
    async fn release(&self, connection: Connection<R>) -> Result<()>;
    async fn invalidate(&self, connection: Connection<R>) -> Result<()>;
    async fn shutdown(&self) -> Result<()>;
}

fn connection_error(err: FaxError) -> FaxError {
    match err {
        FaxError::ConnectionError { .. } => err,
        other => FaxError::ConnectionError {
            message: format!("Failed to create backend resource: {}", other),
            source: Some(Box::new(other)),
        },
    }
}

struct TransientStrategy<R> {
    factory: Arc<dyn ConnectionFactory<R>>,
}

#[async_trait]
impl<R: Send + Sync + 'static> PoolStrategy<R> for TransientStrategy<R> {
    async fn acquire(&self) -> Result<Connection<R>> {
        let resource = self.factory.create().await.map_err(connection_error)?;
        tracing::debug!("🔌 Created transient connection");
        Ok(Connection {
            resource: Arc::new(resource),
        })
    }

    async fn release(&self, connection: Connection<R>) -> Result<()> {
        tracing::debug!("🔌 Destroying transient connection");
        self.factory.destroy(&connection.resource).await
    }

    async fn invalidate(&self, connection: Connection<R>) -> Result<()> {
        self.release(connection).await
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

struct PersistentStrategy<R> {
    factory: Arc<dyn ConnectionFactory<R>>,
    cached: Mutex<Option<Arc<R>>>,
}

#[async_trait]
impl<R: Send + Sync + 'static> PoolStrategy<R> for PersistentStrategy<R> {
    async fn acquire(&self) -> Result<Connection<R>> {
        let mut cached = self.cached.lock().await;
        if let Some(resource) = cached.as_ref() {
            return Ok(Connection {
                resource: Arc::clone(resource),
            });
        }

        // 建立失敗時不快取
        let resource = Arc::new(self.factory.create().await.map_err(connection_error)?);
        tracing::debug!("🔌 Created persistent connection");
        *cached = Some(Arc::clone(&resource));
        Ok(Connection { resource })
    }

    async fn release(&self, _connection: Connection<R>) -> Result<()> {
        Ok(())
    }

    async fn invalidate(&self, connection: Connection<R>) -> Result<()> {
        let mut cached = self.cached.lock().await;
        let is_current = cached
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &connection.resource));
        if is_current {
            tracing::warn!("🔌 Discarding faulty persistent connection");
            *cached = None;
            self.factory.destroy(&connection.resource).await?;
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        let resource = self.cached.lock().await.take();
        if let Some(resource) = resource {
            tracing::debug!("🔌 Closing persistent connection");
            self.factory.destroy(&resource).await?;
        }
        Ok(())
    }
}

/// 管理單一後端實例的資源
pub struct ConnectionPool<R> {
    policy: PoolPolicy,
    strategy: Box<dyn PoolStrategy<R>>,
}

impl<R: Send + Sync + 'static> ConnectionPool<R> {
    pub fn new(policy: PoolPolicy, factory: Arc<dyn ConnectionFactory<R>>) -> Self {
        let strategy: Box<dyn PoolStrategy<R>> = match policy {
            PoolPolicy::Transient => Box::new(TransientStrategy { factory }),
            PoolPolicy::Persistent => Box::new(PersistentStrategy {
                factory,
                cached: Mutex::new(None),
            }),
        };
        Self { policy, strategy }
    }

    pub fn policy(&self) -> PoolPolicy {
        self.policy
    }

    pub async fn acquire(&self) -> Result<Connection<R>> {
        self.strategy.acquire().await
    }

    pub async fn release(&self, connection: Connection<R>) -> Result<()> {
        self.strategy.release(connection).await
    }

    /// 操作失敗時丟棄資源，下次 `acquire` 會重新建立
    pub async fn invalidate(&self, connection: Connection<R>) -> Result<()> {
        self.strategy.invalidate(connection).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.strategy.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug)]
    struct FakePort {
        serial: usize,
    }

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicUsize,
        destroyed: AtomicUsize,
        fail_next: AtomicUsize,
    }

    #[async_trait]
    impl ConnectionFactory<FakePort> for CountingFactory {
        async fn create(&self) -> Result<FakePort> {
            if self.fail_next.swap(0, Ordering::SeqCst) > 0 {
                return Err(FaxError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such device",
                )));
            }
            // 讓並行呼叫者有機會在建立期間競爭
            tokio::time::sleep(Duration::from_millis(20)).await;
            let serial = self.created.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(FakePort { serial })
        }

        async fn destroy(&self, _resource: &FakePort) -> Result<()> {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn pool(policy: PoolPolicy) -> (Arc<CountingFactory>, ConnectionPool<FakePort>) {
        let factory = Arc::new(CountingFactory::default());
        let pool = ConnectionPool::new(policy, factory.clone());
        (factory, pool)
    }

    #[tokio::test]
    async fn test_persistent_concurrent_acquire_shares_resource() {
        let (factory, pool) = pool(PoolPolicy::Persistent);

        let (a, b) = tokio::join!(pool.acquire(), pool.acquire());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(a.same_resource(&b));
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);

        pool.release(a).await.unwrap();
        pool.release(b).await.unwrap();
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 0);

        pool.shutdown().await.unwrap();
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_resources_are_distinct_and_destroyed_once() {
        let (factory, pool) = pool(PoolPolicy::Transient);

        let (a, b) = tokio::join!(pool.acquire(), pool.acquire());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(!a.same_resource(&b));
        assert_ne!(a.serial, b.serial);
        assert_eq!(factory.created.load(Ordering::SeqCst), 2);

        pool.release(a).await.unwrap();
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);
        pool.release(b).await.unwrap();
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 2);

        pool.shutdown().await.unwrap();
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_creation_is_not_cached() {
        let (factory, pool) = pool(PoolPolicy::Persistent);
        factory.fail_next.store(1, Ordering::SeqCst);

        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, FaxError::ConnectionError { .. }));

        let conn = pool.acquire().await.unwrap();
        assert_eq!(conn.serial, 1);
    }

    #[tokio::test]
    async fn test_invalidate_rebuilds_persistent_resource() {
        let (factory, pool) = pool(PoolPolicy::Persistent);

        let first = pool.acquire().await.unwrap();
        let stale = pool.acquire().await.unwrap();
        pool.invalidate(first).await.unwrap();
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);

        // 已被丟棄的舊資源再次 invalidate 不會重複銷毀
        pool.invalidate(stale).await.unwrap();
        assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);

        let fresh = pool.acquire().await.unwrap();
        assert_eq!(fresh.serial, 2);
    }

    #[test]
    fn test_policy_from_flag() {
        assert_eq!(PoolPolicy::from_persistent_flag(true), PoolPolicy::Persistent);
        assert_eq!(PoolPolicy::from_persistent_flag(false), PoolPolicy::Transient);
    }
}
