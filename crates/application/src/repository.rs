use async_trait::async_trait;
use domain::{
    Membership, Message, MessageId, MessageWithAuthor, RepositoryError, Room, RoomId, User,
    UserEmail, UserId,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn update(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, RepositoryError>;
    async fn list(&self) -> Result<Vec<User>, RepositoryError>;
    async fn delete(&self, id: UserId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn create(&self, room: Room) -> Result<Room, RepositoryError>;
    async fn update(&self, room: Room) -> Result<Room, RepositoryError>;
    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError>;
    /// 单个事务内依次删除房间消息、成员行、房间行；
    /// 房间行删除计数为零时返回 NotFound（消息/成员允许为零行）。
    async fn delete_cascade(&self, id: RoomId) -> Result<(), RepositoryError>;
    /// 用户当前参与的全部房间。
    async fn list_for_participant(&self, user_id: UserId) -> Result<Vec<Room>, RepositoryError>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// 单个事务内整表替换该房间的成员：先删光，再按列表逐行插入。
    /// 刻意不做增量差分，并发写者下整体替换在事务内仍然正确。
    async fn replace_participants(
        &self,
        room_id: RoomId,
        actor: UserId,
        participant_ids: &[UserId],
    ) -> Result<(), RepositoryError>;
    async fn list_participants(&self, room_id: RoomId) -> Result<Vec<User>, RepositoryError>;
    async fn list_rows(&self, room_id: RoomId) -> Result<Vec<Membership>, RepositoryError>;
    async fn is_participant(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError>;
    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError>;
    /// 查找限定在某个房间内的消息；房间不匹配视同不存在。
    async fn find_in_room(
        &self,
        id: MessageId,
        room_id: RoomId,
    ) -> Result<Option<Message>, RepositoryError>;
    /// 大小写不敏感的子串过滤 + 按创建时间倒序分页。
    /// 过滤串原样传入 ILIKE，模式字符不做转义。
    async fn find_page(
        &self,
        room_id: RoomId,
        offset: u32,
        limit: u32,
        filter: &str,
    ) -> Result<(Vec<MessageWithAuthor>, u64), RepositoryError>;
    async fn latest_in_room(
        &self,
        room_id: RoomId,
    ) -> Result<Option<MessageWithAuthor>, RepositoryError>;
    async fn update(&self, message: Message) -> Result<Message, RepositoryError>;
    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError>;
}
