//! 预测服务
//!
//! 串联 校验 → 特征工程 → 模型 → 响应组装 → 预测日志

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Number, Value};

use super::error::PredictError;
use super::types::{
    BatchResponse, BatchRowPrediction, DeviceFeatureEcho, DeviceSummary, ExplainResponse,
    FeaturesResponse, ModelSummary, PredictionResponse,
};
use crate::auth::Identity;
use crate::common::sanitize_file_name;
use crate::db::Database;
use crate::estimator::ModelAdapter;
use crate::features::schema::{FEATURE_DESCRIPTIONS, RAW_FEATURES};
use crate::features::{RawDeviceRecord, engineer, validate};
use crate::history::log::{
    BatchSummary, DEFAULT_CONFIDENCE, LogEntry, LoggedFeatures, PredictionLog, PredictionLogRecord,
};

/// 批量预测日志使用的固定置信度
pub const BATCH_CONFIDENCE: f64 = 85.0;

/// 批量响应中最多返回的行级错误数
const MAX_REPORTED_ERRORS: usize = 10;

/// 解释接口返回的重要特征数
const TOP_FEATURES: usize = 5;

const EXPLANATION: &str = "Feature importance shows how each specification affects the predicted price range. Higher values indicate more influence on the prediction.";

/// 预测服务（进程内唯一，路由间共享）
pub struct PredictionService {
    adapter: Arc<ModelAdapter>,
    log: Arc<PredictionLog>,
    /// 登录用户的预测落库（可选）
    db: Option<Database>,
}

impl PredictionService {
    pub fn new(adapter: Arc<ModelAdapter>, log: Arc<PredictionLog>, db: Option<Database>) -> Self {
        Self { adapter, log, db }
    }

    pub fn adapter(&self) -> &ModelAdapter {
        &self.adapter
    }

    pub fn log(&self) -> &PredictionLog {
        &self.log
    }

    /// 单条预测
    pub fn predict_single(
        &self,
        identity: &Identity,
        body: Value,
    ) -> Result<PredictionResponse, PredictError> {
        self.adapter.ensure_available()?;

        let mut input = match body {
            Value::Object(map) if !map.is_empty() => map,
            _ => return Err(PredictError::BadRequest("No data provided".to_string())),
        };

        let raw = validate(&mut input)?;
        let features = engineer(&raw);
        let tier = self.adapter.predict(&features)?;
        let probabilities = self.adapter.predict_proba(&features)?;
        let confidence = probabilities
            .as_deref()
            .and_then(|p| p.iter().copied().reduce(f64::max))
            .map(|p| p * 100.0)
            .unwrap_or(DEFAULT_CONFIDENCE);

        let brand = text_field(&input, &["brand"]);
        let model = text_field(&input, &["model_name", "model"]);
        let record = PredictionLogRecord::new(
            identity.user_key(),
            tier,
            confidence,
            LogEntry::Single {
                brand,
                model,
                features: LoggedFeatures::from(&raw),
            },
        );
        if let Err(e) = self.log.append(&record) {
            tracing::warn!("写入预测日志失败（忽略）: {:#}", e);
        }

        if let (Some(user_id), Some(db)) = (identity.user_id(), &self.db) {
            if let Err(e) = db.save_prediction(user_id, &Value::Object(input), tier as f64) {
                tracing::warn!(user_id, "保存预测记录失败（忽略）: {:#}", e);
            }
        }

        tracing::info!(
            predicted_price_range = tier,
            confidence,
            user_id = %identity.user_key(),
            "单条预测完成"
        );

        Ok(PredictionResponse {
            predicted_price_range: tier,
            confidence,
            probabilities,
            device_features: DeviceFeatureEcho::from(&raw),
        })
    }

    /// CSV 批量预测
    ///
    /// 行级错误不会中断处理，只计入 `errors`
    pub fn predict_batch(
        &self,
        identity: &Identity,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<BatchResponse, PredictError> {
        self.adapter.ensure_available()?;

        if file_name.is_empty() {
            return Err(PredictError::BadRequest("No file selected".to_string()));
        }
        if !file_name.to_ascii_lowercase().ends_with(".csv") {
            return Err(PredictError::BadRequest("File must be a CSV".to_string()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| PredictError::BadRequest(format!("Error reading CSV: {}", e)))?
            .clone();
        let found: Vec<String> = headers.iter().map(str::to_string).collect();
        let missing: Vec<String> = RAW_FEATURES
            .iter()
            .filter(|name| !found.iter().any(|col| col == *name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PredictError::Schema {
                missing,
                required: RAW_FEATURES.iter().map(|s| s.to_string()).collect(),
                found,
            });
        }

        let mut predictions = Vec::new();
        let mut errors = Vec::new();
        let mut total_processed = 0;

        for (index, result) in reader.records().enumerate() {
            let row = index + 1;
            total_processed += 1;

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    errors.push(format!("Row {}: {}", row, e));
                    continue;
                }
            };

            let mut input: Map<String, Value> = headers
                .iter()
                .zip(record.iter())
                .map(|(name, cell)| (name.to_string(), cell_value(cell)))
                .collect();

            match self.predict_row(&mut input) {
                Ok((raw, tier)) => predictions.push(BatchRowPrediction {
                    row,
                    predicted_price_range: tier,
                    battery_power: raw.battery_power,
                    ram: raw.ram,
                    int_memory: raw.int_memory,
                }),
                Err(e) => errors.push(format!("Row {}: {}", row, row_error_message(&e))),
            }
        }

        let successful = predictions.len();
        if successful > 0 {
            let mean = predictions
                .iter()
                .map(|p| p.predicted_price_range as f64)
                .sum::<f64>()
                / successful as f64;
            let record = PredictionLogRecord::new(
                identity.user_key(),
                mean.round_ties_even() as i64,
                BATCH_CONFIDENCE,
                LogEntry::Batch {
                    file_name: sanitize_file_name(file_name),
                    total_devices: successful,
                    summary: BatchSummary {
                        total_processed,
                        successful_predictions: successful,
                        errors_count: errors.len(),
                    },
                },
            );
            if let Err(e) = self.log.append(&record) {
                tracing::warn!("写入批量预测日志失败（忽略）: {:#}", e);
            }
        }

        tracing::info!(
            total = total_processed,
            successful,
            errors = errors.len(),
            "批量预测完成"
        );

        let errors_count = errors.len();
        let (errors, additional_errors) = if errors.is_empty() {
            (None, None)
        } else {
            let additional = errors_count.checked_sub(MAX_REPORTED_ERRORS).filter(|n| *n > 0);
            errors.truncate(MAX_REPORTED_ERRORS);
            (Some(errors), additional)
        };

        Ok(BatchResponse {
            total_processed,
            successful_predictions: successful,
            errors_count,
            predictions,
            errors,
            additional_errors,
        })
    }

    fn predict_row(
        &self,
        input: &mut Map<String, Value>,
    ) -> Result<(RawDeviceRecord, i64), PredictError> {
        let raw = validate(input)?;
        let tier = self.adapter.predict(&engineer(&raw))?;
        Ok((raw, tier))
    }

    /// 预测并给出特征重要性
    pub fn explain(&self, body: Value) -> Result<ExplainResponse, PredictError> {
        self.adapter.ensure_available()?;

        let mut input = match body {
            Value::Object(map) if !map.is_empty() => map,
            _ => return Err(PredictError::BadRequest("No data provided".to_string())),
        };

        let raw = validate(&mut input)?;
        let features = engineer(&raw);
        let tier = self.adapter.predict(&features)?;
        let (importance, importance_source) = self.adapter.feature_importance(&features)?;

        let top_features = rank_by_magnitude(&importance, TOP_FEATURES);

        let features_count = importance.len();
        Ok(ExplainResponse {
            predicted_price_range: tier,
            feature_importance: importance.into_iter().collect(),
            importance_source,
            top_features,
            device_summary: DeviceSummary::from(&raw),
            explanation: EXPLANATION,
            model_info: ModelSummary {
                model_type: self.adapter.model_type().unwrap_or_default().to_string(),
                features_count,
            },
        })
    }

    /// 特征列表与模型/日志状态
    pub fn features(&self) -> FeaturesResponse {
        FeaturesResponse {
            features: RAW_FEATURES.to_vec(),
            feature_descriptions: FEATURE_DESCRIPTIONS.iter().copied().collect::<BTreeMap<_, _>>(),
            model_path: self.adapter.path().display().to_string(),
            model_exists: self.adapter.path().exists(),
            model_loaded: self.adapter.is_available(),
            feature_order: self.adapter.feature_order().ok().map(<[String]>::to_vec),
            prediction_log_path: self.log.path().display().to_string(),
            log_exists: self.log.exists(),
        }
    }
}

/// 读取字符串字段（按候选键顺序），缺失时为 `Unknown`
fn text_field(input: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| match input.get(*key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
        .unwrap_or_else(|| "Unknown".to_string())
}

/// CSV 单元格转 JSON：空为 null，能解析为数字的为数字，其余为字符串
fn cell_value(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    cell.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(cell.to_string()))
}

/// 行级错误文案（推理细节不对外暴露）
fn row_error_message(e: &PredictError) -> String {
    match e {
        PredictError::Inference(_) => "Prediction failed".to_string(),
        other => other.to_string(),
    }
}

/// 按绝对值降序取前 `limit` 项
///
/// 稳定排序，绝对值相同时保持列顺序；NaN 排在最后
fn rank_by_magnitude(importance: &[(String, f64)], limit: usize) -> Vec<(String, f64)> {
    let mut ranked = importance.to_vec();
    ranked.sort_by(|a, b| {
        a.1.is_nan()
            .cmp(&b.1.is_nan())
            .then_with(|| b.1.abs().total_cmp(&a.1.abs()))
    });
    ranked.truncate(limit);
    ranked
}
