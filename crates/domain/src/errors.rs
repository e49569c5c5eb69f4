use thiserror::Error;

/// 领域层错误类型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid {field}: {reason}")]
    InvalidArgument { field: String, reason: String },
    #[error("user already exists")]
    UserAlreadyExists,
    #[error("user not found")]
    UserNotFound,
    #[error("room not found")]
    RoomNotFound,
    #[error("message not found")]
    MessageNotFound,
    #[error("user is not a participant of the room")]
    NotRoomParticipant,
    #[error("user is not the author of the message")]
    NotMessageAuthor,
    /// 参与者列表违反了房间类型约束（数量、重复、包含操作者本人）
    #[error("invalid participants: {reason}")]
    InvalidParticipants { reason: String },
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_participants(reason: impl Into<String>) -> Self {
        Self::InvalidParticipants {
            reason: reason.into(),
        }
    }
}

/// 领域层结果类型
pub type DomainResult<T> = Result<T, DomainError>;

/// 存储层错误
///
/// NotFound / Conflict 由上层映射为对应的用户可见错误，
/// Storage 携带底层驱动信息，只进日志不出网。
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("requested record not found")]
    NotFound,
    #[error("record conflicts with existing data")]
    Conflict,
    #[error("storage failure: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
