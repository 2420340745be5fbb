//! 认证 API 处理器

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};

use super::router::AuthState;
use super::types::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

/// POST /auth/register
pub async fn register(
    State(state): State<AuthState>,
    Json(payload): Json<RegisterRequest>,
) -> impl IntoResponse {
    match state.service.register(payload).await {
        Ok(_) => (
            StatusCode::CREATED,
            Json(RegisterResponse {
                success: true,
                message: "user registered successfully",
            }),
        )
            .into_response(),
        Err(e) => {
            if e.status_code().is_server_error() {
                tracing::error!("注册失败: {:?}", e);
            }
            (e.status_code(), Json(e.into_response())).into_response()
        }
    }
}

/// POST /auth/login
pub async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    match state.service.login(payload).await {
        Ok(token) => Json(LoginResponse {
            success: true,
            token,
            expires_in: state.service.jwt().expiry_seconds(),
        })
        .into_response(),
        Err(e) => {
            if e.status_code().is_server_error() {
                tracing::error!("登录失败: {:?}", e);
            }
            (e.status_code(), Json(e.into_response())).into_response()
        }
    }
}
