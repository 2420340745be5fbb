//! 预测历史 API 处理器

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use super::log::PredictionLog;
use super::reader::{DebugScan, HistoryEntry, debug_scan, read_history};
use crate::auth::Identity;

/// 历史 API 状态
#[derive(Clone)]
pub struct HistoryState {
    pub log: Arc<PredictionLog>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub predictions: Vec<HistoryEntry>,
    pub total_count: usize,
    pub log_file_path: String,
    pub log_file_exists: bool,
}

#[derive(Debug, Serialize)]
pub struct HistoryDebugResponse {
    pub user_id: String,
    pub log_file_path: String,
    #[serde(flatten)]
    pub scan: DebugScan,
}

fn internal_error(message: &str, e: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": {"type": "internal_error", "message": format!("{}: {}", message, e)},
            "predictions": [],
            "total_count": 0
        })),
    )
        .into_response()
}

/// GET /predict/history, GET /device/history
pub async fn get_history(State(state): State<HistoryState>, identity: Identity) -> Response {
    let user_key = identity.user_key();
    let log = state.log.clone();
    let key = user_key.clone();
    let result = tokio::task::spawn_blocking(move || read_history(log.path(), &key)).await;

    match result {
        Ok(Ok(scan)) => Json(HistoryResponse {
            total_count: scan.entries.len(),
            predictions: scan.entries,
            log_file_path: state.log.path().display().to_string(),
            log_file_exists: state.log.exists(),
        })
        .into_response(),
        Ok(Err(e)) => {
            tracing::error!(user_id = %user_key, "读取预测历史失败: {:#}", e);
            internal_error("Failed to retrieve history", e)
        }
        Err(e) => {
            tracing::error!("读取预测历史任务失败: {}", e);
            internal_error("Failed to retrieve history", e)
        }
    }
}

/// GET /predict/history/debug, GET /device/history/debug
pub async fn get_history_debug(
    State(state): State<HistoryState>,
    identity: Identity,
) -> impl IntoResponse {
    let user_key = identity.user_key();
    let log = state.log.clone();
    let key = user_key.clone();
    let result = tokio::task::spawn_blocking(move || debug_scan(log.path(), &key)).await;

    match result {
        Ok(Ok(scan)) => Json(HistoryDebugResponse {
            user_id: user_key,
            log_file_path: state.log.path().display().to_string(),
            scan,
        })
        .into_response(),
        Ok(Err(e)) => {
            tracing::error!("调试扫描失败: {:#}", e);
            internal_error("Debug failed", e)
        }
        Err(e) => {
            tracing::error!("调试扫描任务失败: {}", e);
            internal_error("Debug failed", e)
        }
    }
}
