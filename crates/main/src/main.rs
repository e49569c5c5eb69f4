//! 主应用程序入口
//!
//! 装配仓库、服务与网关，启动 Axum 服务。

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use application::services::{
    AuthServiceDependencies, MessageServiceDependencies, RoomServiceDependencies,
    UserServiceDependencies,
};
use application::{
    AuthService, Clock, ConnectionRegistry, EventNotifier, MessageService, PasswordHasher,
    RoomService, SocketHub, SystemClock, TokenIssuer, UserService,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool, Argon2PasswordHasher, ChannelSocketHub, JwtTokenIssuer,
    PgConnectionRegistry, PgMembershipRepository, PgMessageRepository, PgRoomRepository,
    PgUserRepository,
};
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );
    let pool = create_pg_pool(&config.database.url, config.database.max_connections)
        .await
        .context("failed to connect to database")?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pool).await?;

    // 仓库
    let user_repository = Arc::new(PgUserRepository::new(pool.clone()));
    let room_repository = Arc::new(PgRoomRepository::new(pool.clone()));
    let membership_repository = Arc::new(PgMembershipRepository::new(pool.clone()));
    let message_repository = Arc::new(PgMessageRepository::new(pool.clone()));

    // 连接注册表：启动即清空，丢弃上一次运行（可能是崩溃）残留的行
    let registry: Arc<dyn ConnectionRegistry> = Arc::new(PgConnectionRegistry::new(pool));
    registry
        .clear()
        .await
        .map_err(|err| anyhow::anyhow!("failed to reset connection registry: {err}"))?;

    // 适配器
    let password_hasher: Arc<dyn PasswordHasher> =
        Arc::new(Argon2PasswordHasher::new(config.auth.salt_length));
    let token_issuer: Arc<dyn TokenIssuer> = Arc::new(JwtTokenIssuer::new(&config.auth));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let hub = Arc::new(ChannelSocketHub::new());
    let notifier = Arc::new(EventNotifier::new(
        Arc::clone(&registry),
        Arc::clone(&hub) as Arc<dyn SocketHub>,
    ));

    // 应用层服务
    let auth_service = Arc::new(AuthService::new(AuthServiceDependencies {
        user_repository: user_repository.clone(),
        password_hasher,
        token_issuer,
        clock: Arc::clone(&clock),
    }));
    let user_service = Arc::new(UserService::new(UserServiceDependencies {
        user_repository: user_repository.clone(),
        clock: Arc::clone(&clock),
    }));
    let room_service = Arc::new(RoomService::new(RoomServiceDependencies {
        room_repository,
        membership_repository,
        message_repository: message_repository.clone(),
        clock: Arc::clone(&clock),
    }));
    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        message_repository,
        clock,
    }));

    let state = AppState {
        auth_service,
        user_service,
        room_service,
        message_service,
        registry,
        hub,
        notifier,
    };

    // 启动 Web 服务器
    let app = router(state);
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;

    tracing::info!(
        "聊天服务器启动在 http://{}:{}",
        config.server.host,
        config.server.port
    );
    axum::serve(listener, app).await?;

    Ok(())
}
