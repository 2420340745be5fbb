//! 预测历史读取
//!
//! 逐行扫描预测日志，按身份过滤并投影成前端使用的结构。
//! 每次查询都是一次全文件扫描，复杂度与日志大小成正比。

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use super::log::{LINE_SEPARATOR, LogEntry, PredictionLogRecord};
use crate::common::truncate_with_ellipsis;

/// 调试接口中单行内容的最大字节数
const DEBUG_LINE_MAX_BYTES: usize = 2000;

/// 调试接口返回的样例行数
const SAMPLE_LINES: usize = 3;

/// 历史记录（对外投影）
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub predicted_price_range: i64,
    /// 前端使用的驼峰别名
    #[serde(rename = "predictedPriceRange")]
    pub predicted_price_range_alias: i64,
    pub confidence: f64,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    /// `type` 及类型相关字段
    #[serde(flatten)]
    pub detail: LogEntry,
}

impl HistoryEntry {
    fn project(record: PredictionLogRecord, line_timestamp: &str) -> Self {
        let created_at = if record.timestamp.is_empty() {
            line_timestamp.to_string()
        } else {
            record.timestamp
        };
        Self {
            id: record.id,
            predicted_price_range: record.predicted_price_range,
            predicted_price_range_alias: record.predicted_price_range,
            confidence: record.confidence,
            created_at,
            detail: record.entry,
        }
    }
}

/// 一次历史扫描的结果
#[derive(Debug, Default)]
pub struct HistoryScan {
    /// 按 createdAt 降序
    pub entries: Vec<HistoryEntry>,
    /// 无法解析的行数
    pub parse_warnings: usize,
}

/// 调试扫描结果
#[derive(Debug, Default, Serialize)]
pub struct DebugScan {
    pub log_file_exists: bool,
    pub log_file_size: u64,
    pub total_lines: usize,
    pub sample_lines: Vec<String>,
    pub user_lines: Vec<String>,
    pub parse_warnings: usize,
}

/// 解析一行日志
///
/// 空行返回 `Ok(None)`；格式错误返回 `Err(原因)`
fn parse_line(line: &str) -> Result<Option<(&str, PredictionLogRecord)>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (prefix, json) = line
        .split_once(LINE_SEPARATOR)
        .ok_or_else(|| "缺少时间戳分隔符".to_string())?;
    let record = serde_json::from_str::<PredictionLogRecord>(json).map_err(|e| e.to_string())?;
    Ok(Some((prefix.trim(), record)))
}

/// 读取日志文件，文件不存在时返回 `None`
fn read_log(path: &Path) -> anyhow::Result<Option<String>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("读取预测日志失败: {}", path.display())),
    }
}

/// 读取某个身份的预测历史
///
/// 文件不存在时返回空结果；损坏的行计入 `parse_warnings` 后跳过
pub fn read_history(path: &Path, user_key: &str) -> anyhow::Result<HistoryScan> {
    let Some(content) = read_log(path)? else {
        tracing::info!(path = %path.display(), "预测日志不存在");
        return Ok(HistoryScan::default());
    };

    let mut scan = HistoryScan::default();
    for (index, line) in content.lines().enumerate() {
        match parse_line(line) {
            Ok(Some((prefix, record))) => {
                if record.user_id == user_key {
                    scan.entries.push(HistoryEntry::project(record, prefix));
                }
            }
            Ok(None) => {}
            Err(reason) => {
                scan.parse_warnings += 1;
                tracing::warn!(line = index + 1, "解析预测日志行失败: {}", reason);
            }
        }
    }

    // sort_by 为稳定排序，时间相同的记录保持文件顺序
    scan.entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    tracing::info!(
        user_id = user_key,
        count = scan.entries.len(),
        parse_warnings = scan.parse_warnings,
        "读取预测历史"
    );
    Ok(scan)
}

/// 调试用：日志文件概况及该身份相关的原始行
pub fn debug_scan(path: &Path, user_key: &str) -> anyhow::Result<DebugScan> {
    let Some(content) = read_log(path)? else {
        return Ok(DebugScan::default());
    };

    let quoted = serde_json::to_string(user_key)?;
    let needles = [
        format!("\"user_id\": {}", quoted),
        format!("\"user_id\":{}", quoted),
    ];

    let mut scan = DebugScan {
        log_file_exists: true,
        log_file_size: content.len() as u64,
        ..DebugScan::default()
    };
    for line in content.lines() {
        scan.total_lines += 1;
        if scan.sample_lines.len() < SAMPLE_LINES {
            scan.sample_lines
                .push(truncate_with_ellipsis(line.trim(), DEBUG_LINE_MAX_BYTES));
        }
        if needles.iter().any(|needle| line.contains(needle.as_str())) {
            scan.user_lines
                .push(truncate_with_ellipsis(line.trim(), DEBUG_LINE_MAX_BYTES));
        }
        if parse_line(line).is_err() {
            scan.parse_warnings += 1;
        }
    }

    Ok(scan)
}
