//! Web API 层。
//!
//! HTTP 端点（认证、用户）与 WebSocket 网关。

pub mod auth;
pub mod error;
pub mod gateway;
pub mod protocol;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
