//! 原始设备输入校验
//!
//! 检查 20 个必填字段是否齐全，并把字段值原地归一：
//! 数值字段转为浮点数，布尔字段转为 0/1。

use serde_json::{Map, Value};
use thiserror::Error;

use super::schema::{BOOLEAN_FIELDS, NUMERIC_FIELDS, RAW_FEATURES};
use super::types::RawDeviceRecord;

/// 输入校验失败（可由调用方修正，消息原样返回）
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("Invalid numeric value for field {0}")]
    InvalidNumeric(String),
    #[error("Invalid boolean value for field {0}")]
    InvalidBoolean(String),
}

/// 校验并归一原始输入
///
/// 成功时 `data` 中的字段已被改写为规范值，返回强类型记录；
/// 缺失字段会被全部列出（按声明顺序）。
pub fn validate(data: &mut Map<String, Value>) -> Result<RawDeviceRecord, ValidationError> {
    let missing: Vec<String> = RAW_FEATURES
        .iter()
        .filter(|name| !data.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    let mut record = RawDeviceRecord::default();

    for field in NUMERIC_FIELDS {
        let value = data
            .get(field)
            .and_then(coerce_numeric)
            .ok_or_else(|| ValidationError::InvalidNumeric(field.to_string()))?;
        data.insert(field.to_string(), Value::from(value));
        record.set(field, value);
    }

    for field in BOOLEAN_FIELDS {
        let flag = data
            .get(field)
            .and_then(coerce_flag)
            .ok_or_else(|| ValidationError::InvalidBoolean(field.to_string()))?;
        data.insert(field.to_string(), Value::from(flag));
        record.set(field, f64::from(flag));
    }

    Ok(record)
}

/// 数值字段：数字原样，布尔转 1/0，字符串去空白后解析
///
/// "inf"/"nan" 之类的非有限值视为无效，JSON 无法表示它们
fn coerce_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// 布尔字段：布尔值、数值真假、"true"/"1"/"yes"（不区分大小写）
fn coerce_flag(value: &Value) -> Option<u8> {
    match value {
        Value::Bool(b) => Some(u8::from(*b)),
        Value::Number(n) => n.as_f64().map(|v| u8::from(v != 0.0)),
        Value::String(s) => {
            let lowered = s.to_lowercase();
            Some(u8::from(matches!(lowered.as_str(), "true" | "1" | "yes")))
        }
        _ => None,
    }
}
