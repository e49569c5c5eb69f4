use async_trait::async_trait;
use domain::ConnectionId;
use thiserror::Error;

use crate::events::ServerEvent;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed: {0}")]
    ConnectionClosed(String),
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// 传输能力接口。
///
/// 扇出层只依赖这个接口，不接触任何具体的 WebSocket 类型；
/// Ok 表示传输层已确认接收该事件。
#[async_trait]
pub trait SocketHub: Send + Sync {
    async fn send(
        &self,
        connection_id: &ConnectionId,
        event: &ServerEvent,
    ) -> Result<(), TransportError>;
}
