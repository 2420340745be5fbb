//! 身份识别中间件
//!
//! 携带有效 Bearer Token 的请求识别为登录用户，其余请求按匿名用户处理

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, header, request::Parts},
    middleware::Next,
    response::Response,
};

use super::jwt::JwtManager;

/// 匿名用户标识（写入预测日志的 user_id）
pub const ANONYMOUS_USER: &str = "anonymous_user";

/// 请求身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User(i64),
}

impl Identity {
    /// 日志和历史查询使用的身份字符串
    pub fn user_key(&self) -> String {
        match self {
            Identity::Anonymous => ANONYMOUS_USER.to_string(),
            Identity::User(id) => id.to_string(),
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        match self {
            Identity::Anonymous => None,
            Identity::User(id) => Some(*id),
        }
    }
}

/// 未经过中间件的请求视为匿名
impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Identity>()
            .cloned()
            .unwrap_or(Identity::Anonymous))
    }
}

/// 从 Authorization header 提取 Bearer Token
fn extract_bearer(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// 识别请求身份并注入到请求扩展中
pub async fn identity_middleware(
    State(jwt): State<JwtManager>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let identity = match extract_bearer(&request) {
        Some(token) => match jwt.verify_token(token) {
            Ok(claims) => Identity::User(claims.user_id),
            Err(e) => {
                tracing::debug!("Token 无效，按匿名用户处理: {}", e);
                Identity::Anonymous
            }
        },
        None => Identity::Anonymous,
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}
