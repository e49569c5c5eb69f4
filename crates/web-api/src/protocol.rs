//! 入站事件协议
//!
//! 每个事件在线上表现为 `{"event": "...", "data": {...}}`，
//! 负载先过结构校验再进业务逻辑。

use domain::RoomType;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomPayload {
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub name: Option<String>,
    #[validate(length(min = 1, message = "participants must not be empty"))]
    pub participants: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoomFetchPayload {
    pub room_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoomPayload {
    pub room_id: Uuid,
    pub name: Option<String>,
    pub participants: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRoomPayload {
    pub room_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub room_id: Uuid,
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: String,
}

/// 过滤分页查询；字段名沿用线上协议（first/rows/filter）。
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FilterMessagesPayload {
    pub room_id: Uuid,
    pub first: Option<u32>,
    pub rows: Option<u32>,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessagePayload {
    pub message_id: Uuid,
    #[validate(length(min = 1, message = "text must not be empty"))]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessagePayload {
    pub room_id: Uuid,
    #[validate(length(min = 1, message = "messageIds must not be empty"))]
    pub message_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    CreateRoom(CreateRoomPayload),
    GetRoomDetails(RoomFetchPayload),
    UpdateRoom(UpdateRoomPayload),
    DeleteRoom(DeleteRoomPayload),
    SendMessage(SendMessagePayload),
    FindAllMessages(FilterMessagesPayload),
    UpdateMessage(UpdateMessagePayload),
    DeleteMessage(DeleteMessagePayload),
}

impl ClientEvent {
    /// 事件名，用于日志。
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom(_) => "createRoom",
            Self::GetRoomDetails(_) => "getRoomDetails",
            Self::UpdateRoom(_) => "updateRoom",
            Self::DeleteRoom(_) => "deleteRoom",
            Self::SendMessage(_) => "sendMessage",
            Self::FindAllMessages(_) => "findAllMessages",
            Self::UpdateMessage(_) => "updateMessage",
            Self::DeleteMessage(_) => "deleteMessage",
        }
    }

    /// 负载结构校验，在触碰业务逻辑之前执行。
    pub fn validate_payload(&self) -> Result<(), ValidationErrors> {
        match self {
            Self::CreateRoom(payload) => payload.validate(),
            Self::GetRoomDetails(payload) => payload.validate(),
            Self::UpdateRoom(payload) => payload.validate(),
            Self::DeleteRoom(payload) => payload.validate(),
            Self::SendMessage(payload) => payload.validate(),
            Self::FindAllMessages(payload) => payload.validate(),
            Self::UpdateMessage(payload) => payload.validate(),
            Self::DeleteMessage(payload) => payload.validate(),
        }
    }
}
