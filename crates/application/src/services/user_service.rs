use std::sync::Arc;

use domain::{DomainError, UserEmail, UserId};
use tracing::info;
use uuid::Uuid;

use crate::{
    clock::Clock, dto::UserDto, error::ApplicationError, repository::UserRepository,
};

#[derive(Debug, Clone, Default)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
}

/// 用户资料的读写门面，所有出参都是脱敏视图。
pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn find_all(&self) -> Result<Vec<UserDto>, ApplicationError> {
        let users = self.deps.user_repository.list().await?;
        Ok(users.iter().map(UserDto::from).collect())
    }

    pub async fn find_one(&self, user_id: Uuid) -> Result<UserDto, ApplicationError> {
        let user = self
            .deps
            .user_repository
            .find_by_id(UserId::from(user_id))
            .await?
            .ok_or(DomainError::UserNotFound)?;
        Ok(UserDto::from(&user))
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UserDto, ApplicationError> {
        let email = request.email.map(UserEmail::parse).transpose()?;

        let mut user = self
            .deps
            .user_repository
            .find_by_id(UserId::from(user_id))
            .await?
            .ok_or(DomainError::UserNotFound)?;

        user.update_profile(
            request.first_name,
            request.last_name,
            email,
            self.deps.clock.now(),
        );

        let stored = self.deps.user_repository.update(user).await?;
        info!(user_id = %user_id, "user profile updated");
        Ok(UserDto::from(&stored))
    }

    pub async fn remove(&self, user_id: Uuid) -> Result<(), ApplicationError> {
        let id = UserId::from(user_id);
        self.deps
            .user_repository
            .find_by_id(id)
            .await?
            .ok_or(DomainError::UserNotFound)?;

        self.deps.user_repository.delete(id).await?;
        info!(user_id = %user_id, "user removed");
        Ok(())
    }
}
