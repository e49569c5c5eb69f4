use std::sync::Arc;

use application::{
    AuthService, ConnectionRegistry, EventNotifier, MessageService, RoomService, UserService,
};
use infrastructure::ChannelSocketHub;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub room_service: Arc<RoomService>,
    pub message_service: Arc<MessageService>,
    pub registry: Arc<dyn ConnectionRegistry>,
    /// 具体类型而不是 trait 对象：网关需要 register_sender
    pub hub: Arc<ChannelSocketHub>,
    pub notifier: Arc<EventNotifier>,
}
