use serde::{Deserialize, Serialize};

use crate::user::User;
use crate::value_objects::{MessageId, MessageText, RoomId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub text: MessageText,
    pub created_by: UserId,
    pub updated_by: UserId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Message {
    pub fn create(
        id: MessageId,
        room_id: RoomId,
        text: MessageText,
        author: UserId,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            room_id,
            text,
            created_by: author,
            updated_by: author,
            created_at: now,
            updated_at: now,
        }
    }

    /// 编辑正文：身份不变，text 与 updated_at 原地更新
    pub fn edit(&mut self, text: MessageText, actor: UserId, now: Timestamp) {
        self.text = text;
        self.updated_by = actor;
        self.updated_at = now;
    }
}

/// 消息及其作者，用于需要附带发送人信息的查询结果。
#[derive(Debug, Clone)]
pub struct MessageWithAuthor {
    pub message: Message,
    pub author: User,
}
