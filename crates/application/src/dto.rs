//! 出站数据形状
//!
//! 所有离开服务层的用户信息都经过脱敏（去掉密码哈希与刷新令牌）。
//! 字段名按线上协议使用 camelCase。

use domain::{MessageWithAuthor, Room, RoomType, Timestamp, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 脱敏后的用户视图。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: Uuid::from(user.id),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.as_str().to_owned(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: Uuid,
    pub room_id: Uuid,
    pub text: String,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub creator: UserDto,
}

impl From<&MessageWithAuthor> for MessageDto {
    fn from(value: &MessageWithAuthor) -> Self {
        let MessageWithAuthor { message, author } = value;
        Self {
            id: Uuid::from(message.id),
            room_id: Uuid::from(message.room_id),
            text: message.text.as_str().to_owned(),
            created_by: Uuid::from(message.created_by),
            updated_by: Uuid::from(message.updated_by),
            created_at: message.created_at,
            updated_at: message.updated_at,
            creator: UserDto::from(author),
        }
    }
}

/// 一页消息与匹配总数，"最新状态"视图。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePage {
    pub result: Vec<MessageDto>,
    pub total: u64,
}

impl MessagePage {
    pub fn new(items: &[MessageWithAuthor], total: u64) -> Self {
        Self {
            result: items.iter().map(MessageDto::from).collect(),
            total,
        }
    }
}

/// 房间列表项：房间 + 成员 + 最近一条消息。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub id: Uuid,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub participants: Vec<UserDto>,
    pub last_message: Option<MessageDto>,
}

impl RoomSummaryDto {
    pub fn new(room: &Room, participants: &[User], last_message: Option<&MessageWithAuthor>) -> Self {
        Self {
            id: Uuid::from(room.id),
            name: room.name.clone(),
            room_type: room.room_type,
            created_by: Uuid::from(room.created_by),
            updated_by: Uuid::from(room.updated_by),
            created_at: room.created_at,
            updated_at: room.updated_at,
            participants: participants.iter().map(UserDto::from).collect(),
            last_message: last_message.map(MessageDto::from),
        }
    }
}

/// 房间详情：房间 + 脱敏成员列表 + 消息列表。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetailDto {
    pub id: Uuid,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub participants: Vec<UserDto>,
    pub messages: Vec<MessageDto>,
}

impl RoomDetailDto {
    pub fn new(room: &Room, participants: &[User], messages: &[MessageWithAuthor]) -> Self {
        Self {
            id: Uuid::from(room.id),
            name: room.name.clone(),
            room_type: room.room_type,
            created_by: Uuid::from(room.created_by),
            updated_by: Uuid::from(room.updated_by),
            created_at: room.created_at,
            updated_at: room.updated_at,
            participants: participants.iter().map(UserDto::from).collect(),
            messages: messages.iter().map(MessageDto::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Message, MessageId, MessageText, PasswordHash, RoomId, UserEmail, UserId};

    fn sample_user() -> User {
        let now = chrono::Utc::now();
        let mut user = User::register(
            UserId::from(Uuid::new_v4()),
            "Ada".to_string(),
            "Lovelace".to_string(),
            UserEmail::parse("ada@example.com").unwrap(),
            PasswordHash::new("c2FsdA==$a2V5").unwrap(),
            now,
        );
        user.rotate_refresh_token("refresh-token".to_string(), now);
        user
    }

    #[test]
    fn test_user_dto_strips_credentials() {
        let user = sample_user();
        let dto = UserDto::from(&user);
        let json = serde_json::to_value(&dto).unwrap();

        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["firstName"], "Ada");
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refreshToken").is_none());
        assert!(json.get("refresh_token").is_none());
    }

    #[test]
    fn test_message_dto_uses_camel_case_wire_names() {
        let author = sample_user();
        let now = chrono::Utc::now();
        let message = Message::create(
            MessageId::from(Uuid::new_v4()),
            RoomId::from(Uuid::new_v4()),
            MessageText::new("hello").unwrap(),
            author.id,
            now,
        );
        let dto = MessageDto::from(&MessageWithAuthor {
            message,
            author,
        });
        let json = serde_json::to_value(&dto).unwrap();

        assert!(json.get("roomId").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("room_id").is_none());
    }

    #[test]
    fn test_room_type_serializes_uppercase() {
        let user = sample_user();
        let now = chrono::Utc::now();
        let room = Room::create(
            RoomId::from(Uuid::new_v4()),
            RoomType::Direct,
            None,
            user.id,
            now,
        );
        let dto = RoomDetailDto::new(&room, &[user], &[]);
        let json = serde_json::to_value(&dto).unwrap();

        assert_eq!(json["type"], "DIRECT");
    }
}
