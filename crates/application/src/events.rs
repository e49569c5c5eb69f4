//! 推送给客户端的事件
//!
//! 每个事件在线上表现为 `{"event": "...", "data": {...}}`。
//! 同一次逻辑变更扇出给所有接收方的负载是同一个值。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::{MessagePage, RoomDetailDto, RoomSummaryDto};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDeletedNotice {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesDeletedNotice {
    pub message_ids: Vec<Uuid>,
}

/// 事件级错误信封，对调用方只暴露粗粒度信息。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionNotice {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// 连接建立后推给当前连接的房间列表
    UserAllRooms(Vec<RoomSummaryDto>),
    RoomCreated(RoomDetailDto),
    RoomUpdated(RoomDetailDto),
    RoomDeleted(RoomDeletedNotice),
    MessageSent(MessagePage),
    MessageUpdated(MessagePage),
    MessageDeleted(MessagesDeletedNotice),
    /// 只回给发起查询的连接
    RoomDetailsFetched(RoomDetailDto),
    /// 只回给发起查询的连接
    AllMessages(MessagePage),
    Exception(ExceptionNotice),
}

impl ServerEvent {
    /// 事件名，用于日志。
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserAllRooms(_) => "userAllRooms",
            Self::RoomCreated(_) => "roomCreated",
            Self::RoomUpdated(_) => "roomUpdated",
            Self::RoomDeleted(_) => "roomDeleted",
            Self::MessageSent(_) => "messageSent",
            Self::MessageUpdated(_) => "messageUpdated",
            Self::MessageDeleted(_) => "messageDeleted",
            Self::RoomDetailsFetched(_) => "roomDetailsFetched",
            Self::AllMessages(_) => "allMessages",
            Self::Exception(_) => "exception",
        }
    }

    pub fn exception(message: impl Into<String>) -> Self {
        Self::Exception(ExceptionNotice {
            status: "error".to_string(),
            message: message.into(),
        })
    }

    pub fn room_deleted(room_id: Uuid) -> Self {
        Self::RoomDeleted(RoomDeletedNotice {
            message: format!("Room with ID {} has been successfully deleted.", room_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_envelope_shape() {
        let event = ServerEvent::exception("Authentication error");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "exception");
        assert_eq!(json["data"]["status"], "error");
        assert_eq!(json["data"]["message"], "Authentication error");
    }

    #[test]
    fn test_event_names_match_wire_tags() {
        let event = ServerEvent::room_deleted(Uuid::new_v4());
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], event.name());
        assert!(json["data"]["message"]
            .as_str()
            .unwrap()
            .contains("successfully deleted"));
    }

    #[test]
    fn test_message_deleted_payload_field_names() {
        let event = ServerEvent::MessageDeleted(MessagesDeletedNotice {
            message_ids: vec![Uuid::new_v4()],
        });
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "messageDeleted");
        assert!(json["data"]["messageIds"].is_array());
    }
}
