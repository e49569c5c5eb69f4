//! 聊天系统核心领域模型
//!
//! 包含用户、房间、成员关系、消息与连接等核心实体，
//! 以及参与者校验规则和错误定义。

pub mod business_rules;
pub mod errors;
pub mod membership;
pub mod message;
pub mod room;
pub mod user;
pub mod value_objects;

pub use business_rules::*;
pub use errors::*;
pub use membership::*;
pub use message::*;
pub use room::*;
pub use user::*;
pub use value_objects::*;
