//! 连接注册表
//!
//! 维护 用户 -> 活跃连接集合 的映射。连接记录是纯粹的在线缓存，
//! 进程启动时无条件清空（上一次崩溃可能留下残留行）。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use domain::{ConnectionId, RepositoryError, UserId};
use tokio::sync::RwLock;

#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// 登记一条连接；同一 connection_id 重复登记时覆盖其归属用户。
    async fn register(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> Result<(), RepositoryError>;
    /// 注销一条连接；连接不存在时静默成功。
    async fn unregister(&self, connection_id: &ConnectionId) -> Result<(), RepositoryError>;
    /// 用户当前的全部活跃连接；没有则返回空集合。
    async fn connections_for(&self, user_id: UserId)
        -> Result<Vec<ConnectionId>, RepositoryError>;
    /// 进程启动时调用一次，丢弃上一次运行残留的记录。
    async fn clear(&self) -> Result<(), RepositoryError>;
}

#[derive(Default)]
struct RegistryMaps {
    /// 连接归属：connection_id -> user_id
    owners: HashMap<ConnectionId, UserId>,
    /// 反向索引：user_id -> 连接集合
    by_user: HashMap<UserId, HashSet<ConnectionId>>,
}

/// 内存实现，两张映射共用一把锁，注销与查询交错时
/// 读到的集合要么是旧的要么是新的，不会出现半更新状态。
#[derive(Default)]
pub struct InMemoryConnectionRegistry {
    inner: Arc<RwLock<RegistryMaps>>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn register(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> Result<(), RepositoryError> {
        let mut maps = self.inner.write().await;
        if let Some(previous_owner) = maps.owners.insert(connection_id.clone(), user_id) {
            if let Some(connections) = maps.by_user.get_mut(&previous_owner) {
                connections.remove(&connection_id);
                if connections.is_empty() {
                    maps.by_user.remove(&previous_owner);
                }
            }
        }
        maps.by_user
            .entry(user_id)
            .or_default()
            .insert(connection_id);
        Ok(())
    }

    async fn unregister(&self, connection_id: &ConnectionId) -> Result<(), RepositoryError> {
        let mut maps = self.inner.write().await;
        if let Some(owner) = maps.owners.remove(connection_id) {
            if let Some(connections) = maps.by_user.get_mut(&owner) {
                connections.remove(connection_id);
                if connections.is_empty() {
                    maps.by_user.remove(&owner);
                }
            }
        }
        Ok(())
    }

    async fn connections_for(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConnectionId>, RepositoryError> {
        let maps = self.inner.read().await;
        Ok(maps
            .by_user
            .get(&user_id)
            .map(|connections| connections.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        let mut maps = self.inner.write().await;
        maps.owners.clear();
        maps.by_user.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = InMemoryConnectionRegistry::new();
        let user = UserId::from(Uuid::new_v4());

        registry.register(user, conn("a")).await.unwrap();
        registry.register(user, conn("b")).await.unwrap();

        let mut connections = registry.connections_for(user).await.unwrap();
        connections.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(connections, vec![conn("a"), conn("b")]);
    }

    #[tokio::test]
    async fn test_lookup_without_connections_is_empty() {
        let registry = InMemoryConnectionRegistry::new();
        let user = UserId::from(Uuid::new_v4());

        assert!(registry.connections_for(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reregister_overwrites_owner() {
        let registry = InMemoryConnectionRegistry::new();
        let alice = UserId::from(Uuid::new_v4());
        let bob = UserId::from(Uuid::new_v4());

        registry.register(alice, conn("shared")).await.unwrap();
        registry.register(bob, conn("shared")).await.unwrap();

        // 连接归属被覆盖，旧用户不再看到它
        assert!(registry.connections_for(alice).await.unwrap().is_empty());
        assert_eq!(
            registry.connections_for(bob).await.unwrap(),
            vec![conn("shared")]
        );
    }

    #[tokio::test]
    async fn test_unregister_removes_connection() {
        let registry = InMemoryConnectionRegistry::new();
        let user = UserId::from(Uuid::new_v4());

        registry.register(user, conn("a")).await.unwrap();
        registry.unregister(&conn("a")).await.unwrap();

        assert!(registry.connections_for(user).await.unwrap().is_empty());

        // 重复注销不报错
        registry.unregister(&conn("a")).await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_discards_everything() {
        let registry = InMemoryConnectionRegistry::new();
        let user = UserId::from(Uuid::new_v4());

        registry.register(user, conn("a")).await.unwrap();
        registry.clear().await.unwrap();

        assert!(registry.connections_for(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_attach_detach_is_consistent() {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let user = UserId::from(Uuid::new_v4());

        let mut handles = Vec::new();
        for i in 0..32 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let id = conn(&format!("sock-{}", i));
                registry.register(user, id.clone()).await.unwrap();
                if i % 2 == 0 {
                    registry.unregister(&id).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let connections = registry.connections_for(user).await.unwrap();
        assert_eq!(connections.len(), 16);
    }
}
