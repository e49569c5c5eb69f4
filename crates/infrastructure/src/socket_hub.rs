//! 进程内 socket 集线器
//!
//! 连接ID到发送通道的映射。网关在连接建立时登记发送端，
//! 断开时注销；扇出层只通过 SocketHub 接口投递，
//! 不接触任何具体的 WebSocket 类型。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};

use application::events::ServerEvent;
use application::transport::{SocketHub, TransportError};
use domain::ConnectionId;

#[derive(Default)]
pub struct ChannelSocketHub {
    senders: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<String>>>,
}

impl ChannelSocketHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记连接的发送端。
    pub async fn register_sender(
        &self,
        connection_id: ConnectionId,
        sender: mpsc::UnboundedSender<String>,
    ) {
        let mut senders = self.senders.write().await;
        senders.insert(connection_id, sender);
    }

    /// 注销连接的发送端；不存在时静默成功。
    pub async fn unregister_sender(&self, connection_id: &ConnectionId) {
        let mut senders = self.senders.write().await;
        senders.remove(connection_id);
    }
}

#[async_trait]
impl SocketHub for ChannelSocketHub {
    async fn send(
        &self,
        connection_id: &ConnectionId,
        event: &ServerEvent,
    ) -> Result<(), TransportError> {
        let payload = serde_json::to_string(event)
            .map_err(|err| TransportError::SendFailed(err.to_string()))?;

        let senders = self.senders.read().await;
        let sender = senders.get(connection_id).ok_or_else(|| {
            TransportError::ConnectionClosed(format!("no sender for {}", connection_id))
        })?;

        sender
            .send(payload)
            .map_err(|_| TransportError::SendFailed("receiver dropped".to_string()))
    }
}
