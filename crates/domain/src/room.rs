use serde::{Deserialize, Serialize};

use crate::value_objects::{RoomId, Timestamp, UserId};

/// 房间类型，创建后不可变更。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoomType {
    /// 一对一会话：除创建者外恰好一名参与者
    Direct,
    /// 群聊：除创建者外至少一名参与者
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    /// 展示名称，可为空；非空时全局唯一
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub created_by: UserId,
    pub updated_by: UserId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Room {
    pub fn create(
        id: RoomId,
        room_type: RoomType,
        name: Option<String>,
        owner: UserId,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            name,
            room_type,
            created_by: owner,
            updated_by: owner,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn rename(&mut self, name: Option<String>, actor: UserId, now: Timestamp) {
        if let Some(name) = name {
            self.name = Some(name);
        }
        self.touch(actor, now);
    }

    pub fn touch(&mut self, actor: UserId, now: Timestamp) {
        self.updated_by = actor;
        self.updated_at = now;
    }
}
