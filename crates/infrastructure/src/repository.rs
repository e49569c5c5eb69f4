//! Postgres 仓库实现
//!
//! 需要原子性的多条写入（成员整表替换、房间级联删除）直接在
//! 仓库方法内部开事务，不引入额外的事务管理抽象。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use application::repository::{
    MembershipRepository, MessageRepository, RoomRepository, UserRepository,
};
use domain::{
    Membership, Message, MessageId, MessageText, MessageWithAuthor, PasswordHash,
    RepositoryError, Room, RoomId, RoomType, User, UserEmail, UserId,
};

pub async fn create_pg_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

pub(crate) fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict,
        _ => RepositoryError::storage(err.to_string()),
    }
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

fn parse_room_type(raw: &str) -> Result<RoomType, RepositoryError> {
    match raw {
        "DIRECT" => Ok(RoomType::Direct),
        "GROUP" => Ok(RoomType::Group),
        other => Err(invalid_data(format!("unknown room type '{}'", other))),
    }
}

fn room_type_str(room_type: RoomType) -> &'static str {
    match room_type {
        RoomType::Direct => "DIRECT",
        RoomType::Group => "GROUP",
    }
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    refresh_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let email =
            UserEmail::parse(value.email).map_err(|err| invalid_data(err.to_string()))?;
        let password_hash = PasswordHash::new(value.password_hash)
            .map_err(|err| invalid_data(err.to_string()))?;

        Ok(User {
            id: UserId::from(value.id),
            first_name: value.first_name,
            last_name: value.last_name,
            email,
            password_hash,
            refresh_token: value.refresh_token,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RoomRecord {
    id: Uuid,
    name: Option<String>,
    room_type: String,
    created_by: Uuid,
    updated_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RoomRecord> for Room {
    type Error = RepositoryError;

    fn try_from(value: RoomRecord) -> Result<Self, Self::Error> {
        Ok(Room {
            id: RoomId::from(value.id),
            name: value.name,
            room_type: parse_room_type(&value.room_type)?,
            created_by: UserId::from(value.created_by),
            updated_by: UserId::from(value.updated_by),
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MembershipRecord {
    room_id: Uuid,
    user_id: Uuid,
    created_by: Uuid,
    updated_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MembershipRecord> for Membership {
    fn from(value: MembershipRecord) -> Self {
        Membership {
            room_id: RoomId::from(value.room_id),
            user_id: UserId::from(value.user_id),
            created_by: UserId::from(value.created_by),
            updated_by: UserId::from(value.updated_by),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    room_id: Uuid,
    text: String,
    created_by: Uuid,
    updated_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let text = MessageText::new(value.text).map_err(|err| invalid_data(err.to_string()))?;
        Ok(Message {
            id: MessageId::from(value.id),
            room_id: RoomId::from(value.room_id),
            text,
            created_by: UserId::from(value.created_by),
            updated_by: UserId::from(value.updated_by),
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

/// 消息连同作者的打平行，供 JOIN 查询使用。
#[derive(Debug, FromRow)]
struct MessageWithAuthorRecord {
    id: Uuid,
    room_id: Uuid,
    text: String,
    created_by: Uuid,
    updated_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_id: Uuid,
    author_first_name: String,
    author_last_name: String,
    author_email: String,
    author_password_hash: String,
    author_refresh_token: Option<String>,
    author_created_at: DateTime<Utc>,
    author_updated_at: DateTime<Utc>,
}

impl TryFrom<MessageWithAuthorRecord> for MessageWithAuthor {
    type Error = RepositoryError;

    fn try_from(value: MessageWithAuthorRecord) -> Result<Self, Self::Error> {
        let message = Message::try_from(MessageRecord {
            id: value.id,
            room_id: value.room_id,
            text: value.text,
            created_by: value.created_by,
            updated_by: value.updated_by,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })?;
        let author = User::try_from(UserRecord {
            id: value.author_id,
            first_name: value.author_first_name,
            last_name: value.author_last_name,
            email: value.author_email,
            password_hash: value.author_password_hash,
            refresh_token: value.author_refresh_token,
            created_at: value.author_created_at,
            updated_at: value.author_updated_at,
        })?;
        Ok(MessageWithAuthor { message, author })
    }
}

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, refresh_token, created_at, updated_at";
const ROOM_COLUMNS: &str = "id, name, room_type, created_by, updated_by, created_at, updated_at";
const MESSAGE_WITH_AUTHOR_COLUMNS: &str = r#"
    m.id, m.room_id, m.text, m.created_by, m.updated_by, m.created_at, m.updated_at,
    u.id AS author_id, u.first_name AS author_first_name, u.last_name AS author_last_name,
    u.email AS author_email, u.password_hash AS author_password_hash,
    u.refresh_token AS author_refresh_token,
    u.created_at AS author_created_at, u.updated_at AS author_updated_at
"#;

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO users (id, first_name, last_name, email, password_hash, refresh_token, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::from(user.id))
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.email.as_str())
        .bind(user.password_hash.as_str())
        .bind(&user.refresh_token)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        User::try_from(record)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, email = $4, password_hash = $5,
                refresh_token = $6, updated_at = $7
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::from(user.id))
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.email.as_str())
        .bind(user.password_hash.as_str())
        .bind(&user.refresh_token)
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(record)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users ORDER BY created_at",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(User::try_from).collect()
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgRoomRepository {
    pool: PgPool,
}

impl PgRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    async fn create(&self, room: Room) -> Result<Room, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(&format!(
            r#"
            INSERT INTO rooms (id, name, room_type, created_by, updated_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            ROOM_COLUMNS
        ))
        .bind(Uuid::from(room.id))
        .bind(&room.name)
        .bind(room_type_str(room.room_type))
        .bind(Uuid::from(room.created_by))
        .bind(Uuid::from(room.updated_by))
        .bind(room.created_at)
        .bind(room.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Room::try_from(record)
    }

    async fn update(&self, room: Room) -> Result<Room, RepositoryError> {
        // 类型创建后不可变，不在更新列里
        let record = sqlx::query_as::<_, RoomRecord>(&format!(
            r#"
            UPDATE rooms
            SET name = $2, updated_by = $3, updated_at = $4
            WHERE id = $1
            RETURNING {}
            "#,
            ROOM_COLUMNS
        ))
        .bind(Uuid::from(room.id))
        .bind(&room.name)
        .bind(Uuid::from(room.updated_by))
        .bind(room.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        Room::try_from(record)
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(&format!(
            "SELECT {} FROM rooms WHERE id = $1",
            ROOM_COLUMNS
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Room::try_from).transpose()
    }

    async fn delete_cascade(&self, id: RoomId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;
        let room_id = Uuid::from(id);

        // 消息和成员行允许为零，只有房间行的计数才决定 NotFound
        sqlx::query("DELETE FROM messages WHERE room_id = $1")
            .bind(room_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;

        sqlx::query("DELETE FROM room_participants WHERE room_id = $1")
            .bind(room_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;

        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(room_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            // 事务随 drop 回滚
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn list_for_participant(&self, user_id: UserId) -> Result<Vec<Room>, RepositoryError> {
        let records = sqlx::query_as::<_, RoomRecord>(
            r#"
            SELECT r.id, r.name, r.room_type, r.created_by, r.updated_by, r.created_at, r.updated_at
            FROM rooms r
            JOIN room_participants p ON p.room_id = r.id
            WHERE p.user_id = $1
            ORDER BY r.created_at
            "#,
        )
        .bind(Uuid::from(user_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Room::try_from).collect()
    }
}

#[derive(Clone)]
pub struct PgMembershipRepository {
    pool: PgPool,
}

impl PgMembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for PgMembershipRepository {
    async fn replace_participants(
        &self,
        room_id: RoomId,
        actor: UserId,
        participant_ids: &[UserId],
    ) -> Result<(), RepositoryError> {
        // 整表替换而不是增量差分：并发写者下，事务内的
        // 先删后插仍然得到一个一致的最终集合
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        sqlx::query("DELETE FROM room_participants WHERE room_id = $1")
            .bind(Uuid::from(room_id))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;

        for &participant in participant_ids {
            sqlx::query(
                r#"
                INSERT INTO room_participants (room_id, user_id, created_by, updated_by, created_at, updated_at)
                VALUES ($1, $2, $3, $3, NOW(), NOW())
                "#,
            )
            .bind(Uuid::from(room_id))
            .bind(Uuid::from(participant))
            .bind(Uuid::from(actor))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_err)?;
        }

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn list_participants(&self, room_id: RoomId) -> Result<Vec<User>, RepositoryError> {
        let records = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT u.id, u.first_name, u.last_name, u.email, u.password_hash,
                   u.refresh_token, u.created_at, u.updated_at
            FROM users u
            JOIN room_participants p ON p.user_id = u.id
            WHERE p.room_id = $1
            ORDER BY p.created_at
            "#,
        )
        .bind(Uuid::from(room_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(User::try_from).collect()
    }

    async fn list_rows(&self, room_id: RoomId) -> Result<Vec<Membership>, RepositoryError> {
        let records = sqlx::query_as::<_, MembershipRecord>(
            r#"
            SELECT room_id, user_id, created_by, updated_by, created_at, updated_at
            FROM room_participants
            WHERE room_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(Uuid::from(room_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(records.into_iter().map(Membership::from).collect())
    }

    async fn is_participant(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM room_participants WHERE room_id = $1 AND user_id = $2)",
        )
        .bind(Uuid::from(room_id))
        .bind(Uuid::from(user_id))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(exists)
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (id, room_id, text, created_by, updated_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, room_id, text, created_by, updated_by, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.room_id))
        .bind(message.text.as_str())
        .bind(Uuid::from(message.created_by))
        .bind(Uuid::from(message.updated_by))
        .bind(message.created_at)
        .bind(message.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Message::try_from(record)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, room_id, text, created_by, updated_by, created_at, updated_at
            FROM messages WHERE id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Message::try_from).transpose()
    }

    async fn find_in_room(
        &self,
        id: MessageId,
        room_id: RoomId,
    ) -> Result<Option<Message>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, room_id, text, created_by, updated_by, created_at, updated_at
            FROM messages WHERE id = $1 AND room_id = $2
            "#,
        )
        .bind(Uuid::from(id))
        .bind(Uuid::from(room_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Message::try_from).transpose()
    }

    async fn find_page(
        &self,
        room_id: RoomId,
        offset: u32,
        limit: u32,
        filter: &str,
    ) -> Result<(Vec<MessageWithAuthor>, u64), RepositoryError> {
        // 过滤串原样进 ILIKE，调用方给出的 % 和 _ 保持通配语义
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE room_id = $1 AND text ILIKE '%' || $2 || '%'",
        )
        .bind(Uuid::from(room_id))
        .bind(filter)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let records = sqlx::query_as::<_, MessageWithAuthorRecord>(&format!(
            r#"
            SELECT {}
            FROM messages m
            JOIN users u ON u.id = m.created_by
            WHERE m.room_id = $1 AND m.text ILIKE '%' || $2 || '%'
            ORDER BY m.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            MESSAGE_WITH_AUTHOR_COLUMNS
        ))
        .bind(Uuid::from(room_id))
        .bind(filter)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let page = records
            .into_iter()
            .map(MessageWithAuthor::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((page, total as u64))
    }

    async fn latest_in_room(
        &self,
        room_id: RoomId,
    ) -> Result<Option<MessageWithAuthor>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageWithAuthorRecord>(&format!(
            r#"
            SELECT {}
            FROM messages m
            JOIN users u ON u.id = m.created_by
            WHERE m.room_id = $1
            ORDER BY m.created_at DESC
            LIMIT 1
            "#,
            MESSAGE_WITH_AUTHOR_COLUMNS
        ))
        .bind(Uuid::from(room_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(MessageWithAuthor::try_from).transpose()
    }

    async fn update(&self, message: Message) -> Result<Message, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            UPDATE messages
            SET text = $2, updated_by = $3, updated_at = $4
            WHERE id = $1
            RETURNING id, room_id, text, created_by, updated_by, created_at, updated_at
            "#,
        )
        .bind(Uuid::from(message.id))
        .bind(message.text.as_str())
        .bind(Uuid::from(message.updated_by))
        .bind(message.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        Message::try_from(record)
    }

    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        Ok(())
    }
}
