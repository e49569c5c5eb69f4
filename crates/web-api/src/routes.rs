use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use application::services::{SignInRequest, SignUpRequest, UpdateUserRequest};
use application::UserDto;

use crate::auth::{
    clear_refresh_cookie, current_user, refresh_cookie, refresh_token_from_headers,
};
use crate::error::ApiError;
use crate::gateway;
use crate::state::AppState;

/// 刷新令牌 cookie 的有效期（小时），与令牌本身的有效期一致
const REFRESH_COOKIE_TTL_HOURS: i64 = 24;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpPayload {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct SignInPayload {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUserPayload {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
}

/// 访问令牌走响应体，刷新令牌只走 http-only cookie
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthBody {
    access_token: String,
    user: UserDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct MessageBody {
    message: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes())
        .route("/ws", get(gateway::websocket_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/refresh-token", post(refresh_token))
        .route("/user", get(list_users))
        .route(
            "/user/{id}",
            get(get_user).patch(update_user).delete(remove_user),
        )
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .auth_service
        .sign_up(SignUpRequest {
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        [(
            header::SET_COOKIE,
            refresh_cookie(&session.refresh_token, REFRESH_COOKIE_TTL_HOURS),
        )],
        Json(AuthBody {
            access_token: session.access_token,
            user: session.user,
        }),
    ))
}

async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .auth_service
        .sign_in(SignInRequest {
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok((
        [(
            header::SET_COOKIE,
            refresh_cookie(&session.refresh_token, REFRESH_COOKIE_TTL_HOURS),
        )],
        Json(AuthBody {
            access_token: session.access_token,
            user: session.user,
        }),
    ))
}

async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let claims = current_user(&state, &headers)?;
    state.auth_service.sign_out(claims.sub).await?;

    Ok((
        [(header::SET_COOKIE, clear_refresh_cookie())],
        Json(MessageBody {
            message: "Sign-out successful",
        }),
    ))
}

async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let presented = refresh_token_from_headers(&headers)
        .ok_or_else(|| ApiError::unauthorized("Refresh token not found"))?;

    let session = state.auth_service.refresh(&presented).await?;

    Ok((
        [(
            header::SET_COOKIE,
            refresh_cookie(&session.refresh_token, REFRESH_COOKIE_TTL_HOURS),
        )],
        Json(RefreshBody {
            access_token: session.access_token,
        }),
    ))
}

async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserDto>>, ApiError> {
    current_user(&state, &headers)?;
    let users = state.user_service.find_all().await?;
    Ok(Json(users))
}

async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDto>, ApiError> {
    current_user(&state, &headers)?;
    let user = state.user_service.find_one(id).await?;
    Ok(Json(user))
}

async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<UserDto>, ApiError> {
    current_user(&state, &headers)?;
    let user = state
        .user_service
        .update(
            id,
            UpdateUserRequest {
                first_name: payload.first_name,
                last_name: payload.last_name,
                email: payload.email,
            },
        )
        .await?;
    Ok(Json(user))
}

async fn remove_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    current_user(&state, &headers)?;
    state.user_service.remove(id).await?;
    Ok(StatusCode::OK)
}
