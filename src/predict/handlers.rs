//! 预测 API 处理器

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;

use super::error::PredictError;
use super::router::PredictState;
use crate::auth::Identity;

/// 错误转响应，服务端错误记录日志
fn error_response(e: PredictError) -> Response {
    match &e {
        PredictError::Inference(detail) | PredictError::Internal(detail) => {
            tracing::error!("预测失败: {}", detail)
        }
        PredictError::ModelUnavailable { reason, .. } => {
            tracing::warn!("模型不可用: {}", reason)
        }
        _ => tracing::debug!("请求被拒绝: {}", e),
    }
    (e.status_code(), Json(e.into_response())).into_response()
}

/// 解析 JSON 请求体；空请求体视为未提供数据
fn parse_body(body: &Bytes) -> Result<Value, PredictError> {
    #[cfg(feature = "sensitive-logs")]
    tracing::debug!(
        body = %crate::common::truncate_with_ellipsis(&String::from_utf8_lossy(body), 4096),
        "预测请求体"
    );

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(PredictError::BadRequest("No data provided".to_string()));
    }
    serde_json::from_slice(body)
        .map_err(|e| PredictError::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// POST /predict
pub async fn predict_single(
    State(state): State<PredictState>,
    identity: Identity,
    body: Bytes,
) -> Response {
    if let Err(e) = state.service.adapter().ensure_available() {
        return error_response(e);
    }

    let payload = match parse_body(&body) {
        Ok(payload) => payload,
        Err(e) => return error_response(e),
    };

    // 写日志和落库都是阻塞 IO
    let service = state.service.clone();
    let result =
        tokio::task::spawn_blocking(move || service.predict_single(&identity, payload)).await;

    match result {
        Ok(Ok(response)) => Json(response).into_response(),
        Ok(Err(e)) => error_response(e),
        Err(e) => error_response(PredictError::Internal(format!("预测任务执行失败: {}", e))),
    }
}

/// 从 multipart 中取出 `file` 字段
async fn read_upload(multipart: &mut Multipart) -> Result<(String, Bytes), PredictError> {
    let bad_upload = |e: axum::extract::multipart::MultipartError| {
        PredictError::BadRequest(format!("Invalid upload: {}", e))
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(bad_upload)?;
        return Ok((file_name, bytes));
    }

    Err(PredictError::BadRequest("No file uploaded".to_string()))
}

/// POST /predict/batch
pub async fn predict_batch(
    State(state): State<PredictState>,
    identity: Identity,
    mut multipart: Multipart,
) -> Response {
    if let Err(e) = state.service.adapter().ensure_available() {
        return error_response(e);
    }

    let (file_name, bytes) = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(e) => return error_response(e),
    };
    tracing::info!(file_name = %file_name, size = bytes.len(), "收到批量预测文件");

    let service = state.service.clone();
    let result = tokio::task::spawn_blocking(move || {
        service.predict_batch(&identity, &file_name, &bytes)
    })
    .await;

    match result {
        Ok(Ok(response)) => Json(response).into_response(),
        Ok(Err(e)) => error_response(e),
        Err(e) => error_response(PredictError::Internal(format!("批量预测任务执行失败: {}", e))),
    }
}

/// POST /predict/explain
pub async fn explain(State(state): State<PredictState>, body: Bytes) -> Response {
    if let Err(e) = state.service.adapter().ensure_available() {
        return error_response(e);
    }

    let result = parse_body(&body).and_then(|payload| state.service.explain(payload));
    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /predict/features
pub async fn get_features(State(state): State<PredictState>) -> impl IntoResponse {
    Json(state.service.features())
}
