//! 基础设施层实现。
//!
//! 应用层抽象的具体适配：Postgres 仓库、连接注册表、
//! Argon2 密码派生、JWT 签发以及进程内 socket 集线器。

pub mod password;
pub mod registry;
pub mod repository;
pub mod socket_hub;
pub mod token;

pub use password::Argon2PasswordHasher;
pub use registry::PgConnectionRegistry;
pub use repository::{
    create_pg_pool, PgMembershipRepository, PgMessageRepository, PgRoomRepository,
    PgUserRepository,
};
pub use socket_hub::ChannelSocketHub;
pub use token::JwtTokenIssuer;
