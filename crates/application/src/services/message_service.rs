//! 消息门面
//!
//! 创建、过滤分页查询、编辑与批量删除。写入后的读取都走
//! "第一页"视图，调用方拿到的是房间的最新状态而不是单条记录。

use std::sync::Arc;

use domain::{DomainError, Message, MessageId, MessageText, RoomId, UserId};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    dto::MessagePage,
    error::ApplicationError,
    repository::MessageRepository,
};

/// 查询缺省页大小。
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone)]
pub struct MessageQuery {
    pub room_id: Uuid,
    pub offset: u32,
    pub limit: u32,
    pub filter: String,
}

impl MessageQuery {
    pub fn first_page(room_id: Uuid) -> Self {
        Self {
            room_id,
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
            filter: String::new(),
        }
    }
}

pub struct MessageServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    /// 写入一条消息，返回该房间的第一页消息。
    pub async fn create(
        &self,
        author_id: Uuid,
        room_id: Uuid,
        text: String,
    ) -> Result<MessagePage, ApplicationError> {
        let author = UserId::from(author_id);
        let text = MessageText::new(text)?;
        let now = self.deps.clock.now();

        let message = Message::create(
            MessageId::from(Uuid::new_v4()),
            RoomId::from(room_id),
            text,
            author,
            now,
        );
        self.deps.message_repository.create(message).await?;
        info!(room_id = %room_id, author_id = %author, "message created");

        self.find_by_room(MessageQuery::first_page(room_id)).await
    }

    pub async fn find_by_room(
        &self,
        query: MessageQuery,
    ) -> Result<MessagePage, ApplicationError> {
        let (items, total) = self
            .deps
            .message_repository
            .find_page(
                RoomId::from(query.room_id),
                query.offset,
                query.limit,
                &query.filter,
            )
            .await?;
        Ok(MessagePage::new(&items, total))
    }

    /// 编辑正文。只有作者本人可以编辑；updated_at 取服务端时钟。
    pub async fn update(
        &self,
        actor_id: Uuid,
        message_id: Uuid,
        text: String,
    ) -> Result<Message, ApplicationError> {
        let actor = UserId::from(actor_id);
        let mut message = self
            .deps
            .message_repository
            .find_by_id(MessageId::from(message_id))
            .await?
            .ok_or(DomainError::MessageNotFound)?;

        if message.created_by != actor {
            return Err(DomainError::NotMessageAuthor.into());
        }

        let text = MessageText::new(text)?;
        message.edit(text, actor, self.deps.clock.now());

        let stored = self.deps.message_repository.update(message).await?;
        info!(message_id = %message_id, actor_id = %actor, "message updated");
        Ok(stored)
    }

    /// 批量删除。
    ///
    /// 刻意不包事务：不属于该房间的ID跳过并记日志，遇到第一条
    /// 越权消息即中止剩余处理，此前的删除保持已提交。
    pub async fn delete(
        &self,
        actor_id: Uuid,
        room_id: Uuid,
        message_ids: &[Uuid],
    ) -> Result<(), ApplicationError> {
        let actor = UserId::from(actor_id);
        let room = RoomId::from(room_id);

        for &id in message_ids {
            let message_id = MessageId::from(id);
            let message = match self
                .deps
                .message_repository
                .find_in_room(message_id, room)
                .await?
            {
                Some(message) => message,
                None => {
                    warn!(
                        message_id = %message_id,
                        room_id = %room,
                        "message not found in room, skipping"
                    );
                    continue;
                }
            };

            if message.created_by != actor {
                warn!(
                    message_id = %message_id,
                    actor_id = %actor,
                    author_id = %message.created_by,
                    "batch deletion aborted on foreign message"
                );
                return Err(DomainError::NotMessageAuthor.into());
            }

            self.deps.message_repository.delete(message_id).await?;
            info!(message_id = %message_id, actor_id = %actor, "message deleted");
        }

        Ok(())
    }
}
