mod auth_service;
mod message_service;
mod room_service;
mod user_service;

pub use auth_service::{
    AuthService, AuthServiceDependencies, AuthSession, SignInRequest, SignUpRequest,
};
pub use message_service::{
    MessageQuery, MessageService, MessageServiceDependencies, DEFAULT_PAGE_SIZE,
};
pub use room_service::{
    CreateRoomRequest, RoomService, RoomServiceDependencies, UpdateRoomRequest,
};
pub use user_service::{UpdateUserRequest, UserService, UserServiceDependencies};

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
mod message_service_tests;
