//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务，处理输入校验、事务边界、
//! 以及对外部适配器（密码派生、令牌签发、连接注册、事件扇出）的抽象。

pub mod clock;
pub mod dto;
pub mod error;
pub mod events;
pub mod notifier;
pub mod password;
pub mod registry;
pub mod repository;
pub mod services;
pub mod token;
pub mod transport;

pub use clock::{Clock, SystemClock};
pub use dto::{MessageDto, MessagePage, RoomDetailDto, RoomSummaryDto, UserDto};
pub use error::ApplicationError;
pub use events::ServerEvent;
pub use notifier::{DeliveryReceipt, EventNotifier};
pub use password::{PasswordHasher, PasswordHasherError};
pub use registry::{ConnectionRegistry, InMemoryConnectionRegistry};
pub use repository::{
    MembershipRepository, MessageRepository, RoomRepository, UserRepository,
};
pub use services::{
    AuthService, AuthServiceDependencies, MessageService, MessageServiceDependencies, RoomService,
    RoomServiceDependencies, UserService, UserServiceDependencies,
};
pub use token::{TokenClaims, TokenError, TokenIssuer};
pub use transport::{SocketHub, TransportError};
