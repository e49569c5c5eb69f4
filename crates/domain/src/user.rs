use serde::{Deserialize, Serialize};

use crate::value_objects::{PasswordHash, Timestamp, UserEmail, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: UserEmail,
    #[serde(skip_serializing)] // 密码字段不暴露给客户端
    pub password_hash: PasswordHash,
    /// 当前有效的刷新令牌；None 表示没有活跃会话
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn register(
        id: UserId,
        first_name: String,
        last_name: String,
        email: UserEmail,
        password_hash: PasswordHash,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            first_name,
            last_name,
            email,
            password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 轮换刷新令牌：新令牌写入的同时旧令牌即告作废
    pub fn rotate_refresh_token(&mut self, token: String, now: Timestamp) {
        self.refresh_token = Some(token);
        self.updated_at = now;
    }

    /// 注销：清除刷新令牌，当前会话不再可续期
    pub fn clear_refresh_token(&mut self, now: Timestamp) {
        self.refresh_token = None;
        self.updated_at = now;
    }

    pub fn update_profile(
        &mut self,
        first_name: Option<String>,
        last_name: Option<String>,
        email: Option<UserEmail>,
        now: Timestamp,
    ) {
        if let Some(first_name) = first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = last_name {
            self.last_name = last_name;
        }
        if let Some(email) = email {
            self.email = email;
        }
        self.updated_at = now;
    }
}
