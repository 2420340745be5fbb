//! 认证 API 路由

use std::sync::Arc;

use axum::{Router, routing::post};

use super::handlers::{login, register};
use super::service::AuthService;

/// 认证 API 状态
#[derive(Clone)]
pub struct AuthState {
    pub service: Arc<AuthService>,
}

/// 创建认证 API 路由
///
/// # 端点
/// - `POST /register` - 注册
/// - `POST /login` - 登录并获取 JWT
pub fn create_auth_router(service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .with_state(AuthState { service })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtManager;
    use crate::db::Database;
    use axum::body::Body;
    use http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn router() -> Router {
        let service = AuthService::new(
            Database::open_in_memory().unwrap(),
            JwtManager::new("secret", 60),
        )
        .with_bcrypt_cost(4);
        create_auth_router(Arc::new(service))
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_register_and_login_flow() {
        let app = router();

        let (status, body) = post_json(
            &app,
            "/register",
            json!({"name": "alice", "email": "a@example.com", "password": "pw"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);

        let (status, body) = post_json(
            &app,
            "/register",
            json!({"name": "alice", "email": "a@example.com", "password": "pw"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "email already exists");

        let (status, body) = post_json(
            &app,
            "/login",
            json!({"email": "a@example.com", "password": "pw"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().unwrap().len() > 10);

        let (status, body) = post_json(
            &app,
            "/login",
            json!({"email": "a@example.com", "password": "nope"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "invalid credentials");
    }

    #[tokio::test]
    async fn test_register_requires_all_fields() {
        let (status, body) = post_json(&router(), "/register", json!({"email": "a@example.com"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "name, email, and password are required");
    }
}
