//! 会话核心
//!
//! 负责注册、登录、令牌轮换与注销。刷新令牌持久化在用户行上，
//! 同一用户同时只有一个有效刷新令牌，签发新令牌即作废旧令牌。

use std::sync::Arc;

use domain::{DomainError, User, UserEmail, UserId};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    clock::Clock,
    dto::UserDto,
    error::ApplicationError,
    password::PasswordHasher,
    repository::UserRepository,
    token::{TokenClaims, TokenIssuer},
};

#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// 一次成功认证的产物：令牌对 + 脱敏用户。
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserDto,
}

pub struct AuthServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub token_issuer: Arc<dyn TokenIssuer>,
    pub clock: Arc<dyn Clock>,
}

pub struct AuthService {
    deps: AuthServiceDependencies,
}

impl AuthService {
    pub fn new(deps: AuthServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn sign_up(&self, request: SignUpRequest) -> Result<AuthSession, ApplicationError> {
        let first_name = request.first_name.trim().to_owned();
        let last_name = request.last_name.trim().to_owned();
        if first_name.is_empty() {
            return Err(DomainError::invalid_argument("first_name", "cannot be empty").into());
        }
        if last_name.is_empty() {
            return Err(DomainError::invalid_argument("last_name", "cannot be empty").into());
        }
        if request.password.is_empty() {
            return Err(DomainError::invalid_argument("password", "cannot be empty").into());
        }
        let email = UserEmail::parse(request.email)?;

        if self
            .deps
            .user_repository
            .find_by_email(&email)
            .await?
            .is_some()
        {
            return Err(DomainError::UserAlreadyExists.into());
        }

        let password_hash = self.deps.password_hasher.hash(&request.password).await?;
        let now = self.deps.clock.now();
        let mut user = User::register(
            UserId::from(Uuid::new_v4()),
            first_name,
            last_name,
            email,
            password_hash,
            now,
        );

        let (access_token, refresh_token) = self.issue_pair(&user)?;
        user.rotate_refresh_token(refresh_token.clone(), now);

        let stored = self.deps.user_repository.create(user).await?;
        info!(user_id = %stored.id, "user signed up");

        Ok(AuthSession {
            access_token,
            refresh_token,
            user: UserDto::from(&stored),
        })
    }

    pub async fn sign_in(&self, request: SignInRequest) -> Result<AuthSession, ApplicationError> {
        // 无效邮箱与错误密码返回同一个错误，不泄露账号是否存在
        let email =
            UserEmail::parse(request.email).map_err(|_| ApplicationError::Authentication)?;
        let mut user = self
            .deps
            .user_repository
            .find_by_email(&email)
            .await?
            .ok_or_else(|| {
                warn!(email = %email, "sign-in with unknown email");
                ApplicationError::Authentication
            })?;

        let password_ok = self
            .deps
            .password_hasher
            .verify(&request.password, &user.password_hash)
            .await?;
        if !password_ok {
            warn!(user_id = %user.id, "sign-in with invalid password");
            return Err(ApplicationError::Authentication);
        }

        let now = self.deps.clock.now();
        let (access_token, refresh_token) = self.issue_pair(&user)?;
        user.rotate_refresh_token(refresh_token.clone(), now);

        let stored = self.deps.user_repository.update(user).await?;
        info!(user_id = %stored.id, "user signed in");

        Ok(AuthSession {
            access_token,
            refresh_token,
            user: UserDto::from(&stored),
        })
    }

    /// 刷新流程：验签 + 过期检查，再要求与存储的令牌逐字相同，
    /// 防止被替换掉的旧令牌重放。命中后轮换出新的令牌对。
    pub async fn refresh(&self, presented: &str) -> Result<AuthSession, ApplicationError> {
        let claims = self
            .deps
            .token_issuer
            .verify_refresh_token(presented)
            .map_err(|err| {
                warn!(error = %err, "refresh token rejected");
                ApplicationError::Authentication
            })?;

        let email =
            UserEmail::parse(claims.email).map_err(|_| ApplicationError::Authentication)?;
        let mut user = self
            .deps
            .user_repository
            .find_by_email(&email)
            .await?
            .ok_or(ApplicationError::Authentication)?;

        if user.refresh_token.as_deref() != Some(presented) {
            warn!(user_id = %user.id, "refresh token mismatch, possible replay of a superseded token");
            return Err(ApplicationError::Authentication);
        }

        let now = self.deps.clock.now();
        let (access_token, refresh_token) = self.issue_pair(&user)?;
        user.rotate_refresh_token(refresh_token.clone(), now);

        let stored = self.deps.user_repository.update(user).await?;
        info!(user_id = %stored.id, "refresh token rotated");

        Ok(AuthSession {
            access_token,
            refresh_token,
            user: UserDto::from(&stored),
        })
    }

    /// 注销只要求访问令牌有效（调用方已通过认证），
    /// 不要求刷新令牌仍然有效。
    pub async fn sign_out(&self, user_id: Uuid) -> Result<(), ApplicationError> {
        let user_id = UserId::from(user_id);
        let mut user = self
            .deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        user.clear_refresh_token(self.deps.clock.now());
        self.deps.user_repository.update(user).await?;
        info!(user_id = %user_id, "user signed out");
        Ok(())
    }

    /// 验证访问令牌，供 HTTP 守卫与 WebSocket 握手共用。
    pub fn verify_access_token(&self, token: &str) -> Result<TokenClaims, ApplicationError> {
        self.deps
            .token_issuer
            .verify_access_token(token)
            .map_err(|_| ApplicationError::Authentication)
    }

    fn issue_pair(&self, user: &User) -> Result<(String, String), ApplicationError> {
        let access = self
            .deps
            .token_issuer
            .issue_access_token(user.id, &user.email)?;
        let refresh = self
            .deps
            .token_issuer
            .issue_refresh_token(user.id, &user.email)?;
        Ok((access, refresh))
    }
}
