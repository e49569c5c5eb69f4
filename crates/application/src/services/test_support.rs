//! 服务单元测试的内存替身
//!
//! 用同一个内存后端支撑四个仓库特征，语义对齐 Postgres 实现：
//! 整表替换、级联删除、倒序分页、大小写不敏感过滤。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::Duration;
use domain::{
    Membership, Message, MessageId, MessageWithAuthor, PasswordHash, RepositoryError, Room,
    RoomId, Timestamp, User, UserEmail, UserId,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::clock::Clock;
use crate::password::{PasswordHasher, PasswordHasherError};
use crate::repository::{
    MembershipRepository, MessageRepository, RoomRepository, UserRepository,
};
use crate::token::{TokenClaims, TokenError, TokenIssuer};

#[derive(Default)]
pub struct InMemoryBackend {
    pub users: RwLock<HashMap<UserId, User>>,
    pub rooms: RwLock<HashMap<RoomId, Room>>,
    pub memberships: RwLock<Vec<Membership>>,
    pub messages: RwLock<Vec<Message>>,
}

impl InMemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

pub struct Users(pub Arc<InMemoryBackend>);
pub struct Rooms(pub Arc<InMemoryBackend>);
pub struct Memberships(pub Arc<InMemoryBackend>);
pub struct Messages(pub Arc<InMemoryBackend>);

#[async_trait]
impl UserRepository for Users {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.0.users.write().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::Conflict);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.0.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.0.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &UserEmail) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .0
            .users
            .read()
            .await
            .values()
            .find(|user| &user.email == email)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let mut users: Vec<User> = self.0.users.read().await.values().cloned().collect();
        users.sort_by_key(|user| user.created_at);
        Ok(users)
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        self.0.users.write().await.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl RoomRepository for Rooms {
    async fn create(&self, room: Room) -> Result<Room, RepositoryError> {
        let mut rooms = self.0.rooms.write().await;
        if let Some(name) = &room.name {
            if rooms
                .values()
                .any(|existing| existing.name.as_deref() == Some(name))
            {
                return Err(RepositoryError::Conflict);
            }
        }
        rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn update(&self, room: Room) -> Result<Room, RepositoryError> {
        let mut rooms = self.0.rooms.write().await;
        if !rooms.contains_key(&room.id) {
            return Err(RepositoryError::NotFound);
        }
        rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError> {
        Ok(self.0.rooms.read().await.get(&id).cloned())
    }

    async fn delete_cascade(&self, id: RoomId) -> Result<(), RepositoryError> {
        // 与 Pg 实现同序：消息、成员行、房间行
        self.0
            .messages
            .write()
            .await
            .retain(|message| message.room_id != id);
        self.0
            .memberships
            .write()
            .await
            .retain(|membership| membership.room_id != id);
        if self.0.rooms.write().await.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_for_participant(&self, user_id: UserId) -> Result<Vec<Room>, RepositoryError> {
        let memberships = self.0.memberships.read().await;
        let rooms = self.0.rooms.read().await;
        let mut result: Vec<Room> = memberships
            .iter()
            .filter(|membership| membership.user_id == user_id)
            .filter_map(|membership| rooms.get(&membership.room_id).cloned())
            .collect();
        result.sort_by_key(|room| room.created_at);
        Ok(result)
    }
}

#[async_trait]
impl MembershipRepository for Memberships {
    async fn replace_participants(
        &self,
        room_id: RoomId,
        actor: UserId,
        participant_ids: &[UserId],
    ) -> Result<(), RepositoryError> {
        let now = chrono::Utc::now();
        let mut memberships = self.0.memberships.write().await;
        memberships.retain(|membership| membership.room_id != room_id);
        for &user_id in participant_ids {
            memberships.push(Membership::new(room_id, user_id, actor, now));
        }
        Ok(())
    }

    async fn list_participants(&self, room_id: RoomId) -> Result<Vec<User>, RepositoryError> {
        let memberships = self.0.memberships.read().await;
        let users = self.0.users.read().await;
        Ok(memberships
            .iter()
            .filter(|membership| membership.room_id == room_id)
            .filter_map(|membership| users.get(&membership.user_id).cloned())
            .collect())
    }

    async fn list_rows(&self, room_id: RoomId) -> Result<Vec<Membership>, RepositoryError> {
        Ok(self
            .0
            .memberships
            .read()
            .await
            .iter()
            .filter(|membership| membership.room_id == room_id)
            .cloned()
            .collect())
    }

    async fn is_participant(
        &self,
        room_id: RoomId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .0
            .memberships
            .read()
            .await
            .iter()
            .any(|membership| membership.room_id == room_id && membership.user_id == user_id))
    }
}

#[async_trait]
impl MessageRepository for Messages {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        self.0.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        Ok(self
            .0
            .messages
            .read()
            .await
            .iter()
            .find(|message| message.id == id)
            .cloned())
    }

    async fn find_in_room(
        &self,
        id: MessageId,
        room_id: RoomId,
    ) -> Result<Option<Message>, RepositoryError> {
        Ok(self
            .0
            .messages
            .read()
            .await
            .iter()
            .find(|message| message.id == id && message.room_id == room_id)
            .cloned())
    }

    async fn find_page(
        &self,
        room_id: RoomId,
        offset: u32,
        limit: u32,
        filter: &str,
    ) -> Result<(Vec<MessageWithAuthor>, u64), RepositoryError> {
        let needle = filter.to_lowercase();
        let messages = self.0.messages.read().await;
        let mut matching: Vec<Message> = messages
            .iter()
            .filter(|message| message.room_id == room_id)
            .filter(|message| message.text.as_str().to_lowercase().contains(&needle))
            .cloned()
            .collect();
        drop(messages);

        // 倒序：时间戳相同的按插入序新者在前
        matching.reverse();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as u64;
        let users = self.0.users.read().await;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|message| {
                let author = users
                    .get(&message.created_by)
                    .cloned()
                    .ok_or_else(|| RepositoryError::storage("message author missing"))?;
                Ok(MessageWithAuthor { message, author })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok((page, total))
    }

    async fn latest_in_room(
        &self,
        room_id: RoomId,
    ) -> Result<Option<MessageWithAuthor>, RepositoryError> {
        let (page, _) = self.find_page(room_id, 0, 1, "").await?;
        Ok(page.into_iter().next())
    }

    async fn update(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut messages = self.0.messages.write().await;
        let slot = messages
            .iter_mut()
            .find(|existing| existing.id == message.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = message.clone();
        Ok(message)
    }

    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError> {
        self.0.messages.write().await.retain(|message| message.id != id);
        Ok(())
    }
}

/// 明文前缀哈希器，只用于服务层测试
pub struct PlainPasswordHasher;

#[async_trait]
impl PasswordHasher for PlainPasswordHasher {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError> {
        PasswordHash::new(format!("plain${}", plaintext))
            .map_err(|err| PasswordHasherError::hash_error(err.to_string()))
    }

    async fn verify(
        &self,
        plaintext: &str,
        hashed: &PasswordHash,
    ) -> Result<bool, PasswordHasherError> {
        Ok(hashed.as_str() == format!("plain${}", plaintext))
    }
}

/// 发号器式令牌签发器：每次签发唯一令牌并登记声明，
/// 验证即查表，方便断言轮换语义。
#[derive(Default)]
pub struct StubTokenIssuer {
    counter: AtomicU64,
    access: StdMutex<HashMap<String, TokenClaims>>,
    refresh: StdMutex<HashMap<String, TokenClaims>>,
}

impl StubTokenIssuer {
    fn claims(user_id: UserId, email: &UserEmail) -> TokenClaims {
        TokenClaims {
            sub: Uuid::from(user_id),
            email: email.as_str().to_owned(),
            iat: 0,
            exp: i64::MAX,
        }
    }
}

impl TokenIssuer for StubTokenIssuer {
    fn issue_access_token(
        &self,
        user_id: UserId,
        email: &UserEmail,
    ) -> Result<String, TokenError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let token = format!("access-{}", n);
        self.access
            .lock()
            .unwrap()
            .insert(token.clone(), Self::claims(user_id, email));
        Ok(token)
    }

    fn issue_refresh_token(
        &self,
        user_id: UserId,
        email: &UserEmail,
    ) -> Result<String, TokenError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let token = format!("refresh-{}", n);
        self.refresh
            .lock()
            .unwrap()
            .insert(token.clone(), Self::claims(user_id, email));
        Ok(token)
    }

    fn verify_access_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.access
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(TokenError::Invalid)
    }

    fn verify_refresh_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.refresh
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(TokenError::Invalid)
    }
}

/// 可手动推进的时钟，用于断言 updated_at 严格递增
pub struct ManualClock {
    now: StdMutex<Timestamp>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: StdMutex::new(chrono::Utc::now()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }
}

/// 直接向后端写入一个已注册用户
pub async fn seed_user(backend: &Arc<InMemoryBackend>, email: &str) -> User {
    let now = chrono::Utc::now();
    let user = User::register(
        UserId::from(Uuid::new_v4()),
        "Test".to_string(),
        "User".to_string(),
        UserEmail::parse(email).unwrap(),
        PasswordHash::new("plain$secret").unwrap(),
        now,
    );
    backend.users.write().await.insert(user.id, user.clone());
    user
}
