//! 参与者校验规则
//!
//! 所有会改动成员关系的操作在触碰存储之前都要过这一层。

use std::collections::HashSet;

use crate::errors::{DomainError, DomainResult};
use crate::room::RoomType;
use crate::value_objects::UserId;

/// 校验参与者列表与房间类型的约束。
///
/// - 列表不得包含操作者本人（操作者总是被隐式加入）
/// - 列表不得包含重复项
/// - DIRECT：除操作者外恰好一人；GROUP：至少一人
pub fn validate_participants(
    room_type: RoomType,
    participants: &[UserId],
    actor: UserId,
) -> DomainResult<()> {
    if participants.contains(&actor) {
        return Err(DomainError::invalid_participants(
            "the acting user must not appear in the participants list",
        ));
    }

    let unique: HashSet<&UserId> = participants.iter().collect();
    if unique.len() != participants.len() {
        return Err(DomainError::invalid_participants(
            "the participants list contains duplicates",
        ));
    }

    match room_type {
        RoomType::Direct if participants.len() != 1 => Err(DomainError::invalid_participants(
            "a direct room must include exactly one participant besides the owner",
        )),
        RoomType::Group if participants.is_empty() => Err(DomainError::invalid_participants(
            "a group room must include at least one participant besides the owner",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId::from(Uuid::new_v4())
    }

    #[test]
    fn test_direct_requires_exactly_one_participant() {
        let actor = user();
        assert!(validate_participants(RoomType::Direct, &[user()], actor).is_ok());
        assert!(validate_participants(RoomType::Direct, &[], actor).is_err());
        assert!(validate_participants(RoomType::Direct, &[user(), user()], actor).is_err());
    }

    #[test]
    fn test_group_requires_at_least_one_participant() {
        let actor = user();
        assert!(validate_participants(RoomType::Group, &[user()], actor).is_ok());
        assert!(validate_participants(RoomType::Group, &[user(), user(), user()], actor).is_ok());
        assert!(validate_participants(RoomType::Group, &[], actor).is_err());
    }

    #[test]
    fn test_actor_must_not_be_listed() {
        let actor = user();
        let result = validate_participants(RoomType::Group, &[actor], actor);
        assert!(matches!(
            result,
            Err(DomainError::InvalidParticipants { .. })
        ));
    }

    #[test]
    fn test_duplicates_rejected() {
        let actor = user();
        let other = user();
        let result = validate_participants(RoomType::Group, &[other, other], actor);
        assert!(matches!(
            result,
            Err(DomainError::InvalidParticipants { .. })
        ));
    }
}
