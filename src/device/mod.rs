//! 已保存的设备预测
//!
//! 登录用户的单条预测会写入 devices 表，这里提供查询接口

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::Serialize;

use crate::auth::Identity;
use crate::auth::types::AuthError;
use crate::db::{Database, SavedDevice};

/// 设备 API 状态
#[derive(Clone)]
pub struct DeviceState {
    pub db: Database,
}

#[derive(Debug, Serialize)]
pub struct SavedDevicesResponse {
    pub devices: Vec<SavedDevice>,
    pub total_count: usize,
}

/// GET /device/saved
async fn get_saved_devices(State(state): State<DeviceState>, identity: Identity) -> Response {
    let Some(user_id) = identity.user_id() else {
        let e = AuthError::Unauthorized;
        return (e.status_code(), Json(e.into_response())).into_response();
    };

    let db = state.db.clone();
    let result = tokio::task::spawn_blocking(move || db.get_user_predictions(user_id)).await;

    match result {
        Ok(Ok(devices)) => Json(SavedDevicesResponse {
            total_count: devices.len(),
            devices,
        })
        .into_response(),
        Ok(Err(e)) => {
            tracing::error!(user_id, "查询已保存预测失败: {:#}", e);
            let e = AuthError::Internal(e);
            (e.status_code(), Json(e.into_response())).into_response()
        }
        Err(e) => {
            tracing::error!(user_id, "查询任务执行失败: {}", e);
            let e = AuthError::Internal(e.into());
            (e.status_code(), Json(e.into_response())).into_response()
        }
    }
}

/// 创建设备 API 路由
///
/// # 端点
/// - `GET /saved` - 当前用户保存的预测（需要登录）
///
/// 历史查询路由由 `history` 模块提供，在装配时合并到 `/device` 下
pub fn create_device_router(db: Database) -> Router {
    Router::new()
        .route("/saved", get(get_saved_devices))
        .with_state(DeviceState { db })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{JwtManager, identity_middleware};
    use axum::{body::Body, middleware};
    use http::{Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn get_saved(app: Router, token: Option<String>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri("/saved");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_saved_requires_login() {
        let db = Database::open_in_memory().unwrap();
        let user_id = db.create_user("alice", "a@example.com", "h").unwrap().unwrap();
        db.save_prediction(user_id, &json!({"ram": 2048.0}), 2.0).unwrap();

        let jwt = JwtManager::new("secret", 60);
        let app = create_device_router(db)
            .layer(middleware::from_fn_with_state(jwt.clone(), identity_middleware));

        let (status, body) = get_saved(app.clone(), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, body) = get_saved(app, Some(jwt.generate_token(user_id).unwrap())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_count"], 1);
        assert_eq!(body["devices"][0]["input_data"]["ram"], 2048.0);
        assert_eq!(body["devices"][0]["predicted_price"], 2.0);
    }
}
