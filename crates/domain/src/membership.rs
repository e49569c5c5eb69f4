use serde::{Deserialize, Serialize};

use crate::value_objects::{RoomId, Timestamp, UserId};

/// 房间成员关系行。
///
/// 该行的存在与否是"是否为房间参与者"的唯一事实来源；
/// 每次变更成员时整表替换（先删后插），从不做增量修补。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub created_by: UserId,
    pub updated_by: UserId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Membership {
    pub fn new(room_id: RoomId, user_id: UserId, actor: UserId, now: Timestamp) -> Self {
        Self {
            room_id,
            user_id,
            created_by: actor,
            updated_by: actor,
            created_at: now,
            updated_at: now,
        }
    }
}
