//! 请求认证辅助
//!
//! Bearer 访问令牌的提取与校验，以及承载刷新令牌的
//! http-only cookie（名为 `jwt`，从不进 JSON 响应体）。

use application::token::TokenClaims;
use axum::http::{header, HeaderMap};

use crate::error::ApiError;
use crate::state::AppState;

/// 刷新令牌 cookie 的名字
pub const REFRESH_COOKIE: &str = "jwt";

/// 从 Authorization 头提取 Bearer 令牌。
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("No authorization header found"))?;

    value
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Invalid or missing token"))
}

/// 受保护端点的统一守卫：验证访问令牌并返回声明。
pub fn current_user(state: &AppState, headers: &HeaderMap) -> Result<TokenClaims, ApiError> {
    let token = bearer_token(headers)?;
    state
        .auth_service
        .verify_access_token(token)
        .map_err(ApiError::from)
}

/// 从 Cookie 头取出刷新令牌。
pub fn refresh_token_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        pair.trim()
            .strip_prefix(REFRESH_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
            .map(|token| token.to_string())
    })
}

/// 下发刷新令牌的 Set-Cookie 值。
pub fn refresh_cookie(token: &str, max_age_hours: i64) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        REFRESH_COOKIE,
        token,
        max_age_hours * 60 * 60
    )
}

/// 清除刷新令牌 cookie 的 Set-Cookie 值。
pub fn clear_refresh_cookie() -> String {
    format!("{}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax", REFRESH_COOKIE)
}
