//! 事件扇出
//!
//! 把一次逻辑变更独立投递到每个受影响用户的每条活跃连接。
//! 单条连接的失败或超时不会阻塞、取消或回滚其他连接的投递；
//! 本调用自身永不失败，只逐条记录结果。

use std::sync::Arc;

use domain::{ConnectionId, UserId};
use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::dto::UserDto;
use crate::events::ServerEvent;
use crate::registry::ConnectionRegistry;
use crate::transport::{SocketHub, TransportError};

/// 单次投递的结果记录。
#[derive(Debug)]
pub struct DeliveryReceipt {
    pub user_id: UserId,
    pub connection_id: ConnectionId,
    pub outcome: Result<(), TransportError>,
}

impl DeliveryReceipt {
    pub fn delivered(&self) -> bool {
        self.outcome.is_ok()
    }
}

pub struct EventNotifier {
    registry: Arc<dyn ConnectionRegistry>,
    hub: Arc<dyn SocketHub>,
}

impl EventNotifier {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, hub: Arc<dyn SocketHub>) -> Self {
        Self { registry, hub }
    }

    /// 向所有参与者的全部活跃连接投递同一事件。
    ///
    /// 尽力而为、每连接至多一次、不重试。没有任何连接的用户
    /// 直接跳过，不算失败。
    pub async fn notify(
        &self,
        participants: &[UserDto],
        event: &ServerEvent,
    ) -> Vec<DeliveryReceipt> {
        let mut targets: Vec<(UserId, ConnectionId)> = Vec::new();
        for participant in participants {
            let user_id = UserId::from(participant.id);
            match self.registry.connections_for(user_id).await {
                Ok(connections) => {
                    targets.extend(connections.into_iter().map(|conn| (user_id, conn)));
                }
                Err(err) => {
                    warn!(
                        user_id = %user_id,
                        error = %err,
                        "failed to resolve connections, skipping user"
                    );
                }
            }
        }

        let attempts = targets.into_iter().map(|(user_id, connection_id)| {
            let hub = Arc::clone(&self.hub);
            async move {
                let outcome = hub.send(&connection_id, event).await;
                match &outcome {
                    Ok(()) => debug!(
                        connection_id = %connection_id,
                        event = event.name(),
                        "notification delivered"
                    ),
                    Err(err) => warn!(
                        connection_id = %connection_id,
                        event = event.name(),
                        error = %err,
                        "notification failed"
                    ),
                }
                DeliveryReceipt {
                    user_id,
                    connection_id,
                    outcome,
                }
            }
        });

        join_all(attempts).await
    }

    /// 只发给一条连接（例如查询类事件只回给发起方）。
    pub async fn send_to_connection(&self, connection_id: &ConnectionId, event: &ServerEvent) {
        if let Err(err) = self.hub.send(connection_id, event).await {
            warn!(
                connection_id = %connection_id,
                event = event.name(),
                error = %err,
                "failed to deliver event to connection"
            );
        }
    }
}
