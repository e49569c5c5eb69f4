use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use domain::{UserEmail, UserId};

/// 两类令牌共享的声明载荷。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// 用户ID
    pub sub: Uuid,
    /// 用户邮箱
    pub email: String,
    /// 签发时间 (Unix timestamp)
    pub iat: i64,
    /// 过期时间 (Unix timestamp)
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
    #[error("token generation failed: {0}")]
    Generation(String),
}

/// 令牌签发与验证抽象。
///
/// 访问令牌与刷新令牌必须使用不同的密钥签名，
/// 两条验证路径互不相通。
pub trait TokenIssuer: Send + Sync {
    fn issue_access_token(&self, user_id: UserId, email: &UserEmail)
        -> Result<String, TokenError>;
    fn issue_refresh_token(
        &self,
        user_id: UserId,
        email: &UserEmail,
    ) -> Result<String, TokenError>;
    fn verify_access_token(&self, token: &str) -> Result<TokenClaims, TokenError>;
    fn verify_refresh_token(&self, token: &str) -> Result<TokenClaims, TokenError>;
}
