//! Postgres 连接注册表
//!
//! 每条活跃连接一行，归属覆盖用 upsert 表达。
//! 进程启动时 clear() 清掉上一次运行（可能是崩溃）残留的行。

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use application::registry::ConnectionRegistry;
use domain::{ConnectionId, RepositoryError, UserId};

use crate::repository::map_sqlx_err;

#[derive(Clone)]
pub struct PgConnectionRegistry {
    pool: PgPool,
}

impl PgConnectionRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectionRegistry for PgConnectionRegistry {
    async fn register(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO connected_clients (connection_id, user_id, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (connection_id)
            DO UPDATE SET user_id = EXCLUDED.user_id, created_at = NOW()
            "#,
        )
        .bind(connection_id.as_str())
        .bind(Uuid::from(user_id))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn unregister(&self, connection_id: &ConnectionId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM connected_clients WHERE connection_id = $1")
            .bind(connection_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn connections_for(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ConnectionId>, RepositoryError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT connection_id FROM connected_clients WHERE user_id = $1")
                .bind(Uuid::from(user_id))
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        rows.into_iter()
            .map(|(raw,)| {
                ConnectionId::new(raw).map_err(|err| RepositoryError::storage(err.to_string()))
            })
            .collect()
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM connected_clients")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() > 0 {
            info!(
                stale_rows = result.rows_affected(),
                "discarded connection rows left over from a previous run"
            );
        }
        Ok(())
    }
}
