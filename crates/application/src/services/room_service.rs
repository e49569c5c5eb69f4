//! 成员关系管理
//!
//! 房间的创建、更新、删除以及成员整表替换。成员行的存在与否是
//! 参与者资格的唯一事实来源，涉及多条写入的操作都落在存储层的
//! 单个事务里，部分写入永远不可见。

use std::sync::Arc;

use domain::{
    validate_participants, DomainError, Room, RoomId, RoomType, UserId,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    clock::Clock,
    dto::{RoomDetailDto, RoomSummaryDto},
    error::ApplicationError,
    repository::{MembershipRepository, MessageRepository, RoomRepository},
    services::message_service::DEFAULT_PAGE_SIZE,
};

#[derive(Debug, Clone)]
pub struct CreateRoomRequest {
    pub owner_id: Uuid,
    pub room_type: RoomType,
    pub name: Option<String>,
    pub participant_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct UpdateRoomRequest {
    pub actor_id: Uuid,
    pub room_id: Uuid,
    pub name: Option<String>,
    /// None 表示不动成员；Some 表示整表替换为该列表 ∪ {操作者}
    pub participant_ids: Option<Vec<Uuid>>,
}

pub struct RoomServiceDependencies {
    pub room_repository: Arc<dyn RoomRepository>,
    pub membership_repository: Arc<dyn MembershipRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct RoomService {
    deps: RoomServiceDependencies,
}

impl RoomService {
    pub fn new(deps: RoomServiceDependencies) -> Self {
        Self { deps }
    }

    /// 创建房间。校验先于任何存储写入；参与者非空时
    /// 成员表原子替换为 参与者 ∪ {创建者}。
    pub async fn create_room(
        &self,
        request: CreateRoomRequest,
    ) -> Result<Room, ApplicationError> {
        let owner = UserId::from(request.owner_id);
        let participants: Vec<UserId> = request
            .participant_ids
            .iter()
            .copied()
            .map(UserId::from)
            .collect();

        validate_participants(request.room_type, &participants, owner)?;

        let now = self.deps.clock.now();
        let room = Room::create(
            RoomId::from(Uuid::new_v4()),
            request.room_type,
            request.name,
            owner,
            now,
        );
        let stored = self.deps.room_repository.create(room).await?;

        if !participants.is_empty() {
            let mut with_owner = participants;
            with_owner.push(owner);
            self.deps
                .membership_repository
                .replace_participants(stored.id, owner, &with_owner)
                .await?;
        }

        info!(room_id = %stored.id, owner_id = %owner, "room created");
        Ok(stored)
    }

    /// 更新房间。类型创建后不可变，参与者校验针对房间的既有类型重跑。
    pub async fn update_room(
        &self,
        request: UpdateRoomRequest,
    ) -> Result<Room, ApplicationError> {
        let actor = UserId::from(request.actor_id);
        let room_id = RoomId::from(request.room_id);

        let mut room = self
            .deps
            .room_repository
            .find_by_id(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound)?;

        let participants: Option<Vec<UserId>> = request
            .participant_ids
            .map(|ids| ids.into_iter().map(UserId::from).collect());
        if let Some(participants) = &participants {
            validate_participants(room.room_type, participants, actor)?;
        }

        room.rename(request.name, actor, self.deps.clock.now());
        let stored = self.deps.room_repository.update(room).await?;

        if let Some(mut participants) = participants {
            participants.push(actor);
            self.deps
                .membership_repository
                .replace_participants(room_id, actor, &participants)
                .await?;
        }

        info!(room_id = %room_id, actor_id = %actor, "room updated");
        Ok(stored)
    }

    /// 级联删除：消息、成员行、房间行，全部落在一个事务里。
    pub async fn delete_room(&self, room_id: Uuid) -> Result<(), ApplicationError> {
        let room_id = RoomId::from(room_id);
        self.deps
            .room_repository
            .delete_cascade(room_id)
            .await
            .map_err(|err| match err {
                domain::RepositoryError::NotFound => {
                    ApplicationError::Domain(DomainError::RoomNotFound)
                }
                other => other.into(),
            })?;

        info!(room_id = %room_id, "room deleted with all messages and memberships");
        Ok(())
    }

    /// 用户参与的全部房间，各自附带成员列表与最近一条消息。
    pub async fn find_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RoomSummaryDto>, ApplicationError> {
        let rooms = self
            .deps
            .room_repository
            .list_for_participant(UserId::from(user_id))
            .await?;

        let mut summaries = Vec::with_capacity(rooms.len());
        for room in &rooms {
            let participants = self
                .deps
                .membership_repository
                .list_participants(room.id)
                .await?;
            let last_message = self.deps.message_repository.latest_in_room(room.id).await?;
            summaries.push(RoomSummaryDto::new(
                room,
                &participants,
                last_message.as_ref(),
            ));
        }

        Ok(summaries)
    }

    /// 房间详情。请求者必须是当前参与者，否则拒绝。
    pub async fn get_detailed(
        &self,
        requester_id: Uuid,
        room_id: Uuid,
    ) -> Result<RoomDetailDto, ApplicationError> {
        let room_id = RoomId::from(room_id);
        let requester = UserId::from(requester_id);

        let room = self
            .deps
            .room_repository
            .find_by_id(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound)?;

        let participants = self
            .deps
            .membership_repository
            .list_participants(room_id)
            .await?;
        if !participants.iter().any(|user| user.id == requester) {
            return Err(DomainError::NotRoomParticipant.into());
        }

        let (messages, _total) = self
            .deps
            .message_repository
            .find_page(room_id, 0, DEFAULT_PAGE_SIZE, "")
            .await?;

        Ok(RoomDetailDto::new(&room, &participants, &messages))
    }
}
