//! 预测日志（追加写）
//!
//! 每次预测追加一行 `<RFC3339 时间戳> - <JSON>`，文件只增不改。

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::features::RawDeviceRecord;

/// 日志行中时间戳与 JSON 的分隔符
pub const LINE_SEPARATOR: &str = " - ";

/// 历史记录缺少置信度时的默认值
pub const DEFAULT_CONFIDENCE: f64 = 95.0;

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

fn unknown() -> String {
    "Unknown".to_string()
}

/// 一条预测日志
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionLogRecord {
    /// RFC3339 UTC 时间（毫秒精度）
    #[serde(default)]
    pub timestamp: String,
    /// 发起预测的身份
    #[serde(default)]
    pub user_id: String,
    /// 合成 ID（毫秒时间戳）
    #[serde(default)]
    pub id: i64,
    pub predicted_price_range: i64,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(flatten)]
    pub entry: LogEntry,
}

/// 按类型区分的日志内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogEntry {
    Single {
        #[serde(default = "unknown")]
        brand: String,
        #[serde(default = "unknown")]
        model: String,
        #[serde(default)]
        features: LoggedFeatures,
    },
    Batch {
        #[serde(rename = "fileName", default)]
        file_name: String,
        #[serde(rename = "totalDevices", default)]
        total_devices: usize,
        #[serde(default)]
        summary: BatchSummary,
    },
}

impl LogEntry {
    /// 类型标签（`single` / `batch`）
    pub fn kind(&self) -> &'static str {
        match self {
            LogEntry::Single { .. } => "single",
            LogEntry::Batch { .. } => "batch",
        }
    }
}

/// 单条预测记录的设备参数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggedFeatures {
    pub battery_power: f64,
    pub ram: f64,
    pub int_memory: f64,
    pub fc: f64,
    pub pc: f64,
    pub sc_h: f64,
    pub sc_w: f64,
    pub px_height: f64,
    pub px_width: f64,
    pub blue: bool,
    pub dual_sim: bool,
    pub four_g: bool,
    pub three_g: bool,
    pub touch_screen: bool,
    pub wifi: bool,
}

impl From<&RawDeviceRecord> for LoggedFeatures {
    fn from(raw: &RawDeviceRecord) -> Self {
        Self {
            battery_power: raw.battery_power,
            ram: raw.ram,
            int_memory: raw.int_memory,
            fc: raw.fc,
            pc: raw.pc,
            sc_h: raw.sc_h,
            sc_w: raw.sc_w,
            px_height: raw.px_height,
            px_width: raw.px_width,
            blue: raw.has_bluetooth(),
            dual_sim: raw.has_dual_sim(),
            four_g: raw.has_4g(),
            three_g: raw.has_3g(),
            touch_screen: raw.has_touch_screen(),
            wifi: raw.has_wifi(),
        }
    }
}

/// 批量预测统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSummary {
    pub total_processed: usize,
    pub successful_predictions: usize,
    pub errors_count: usize,
}

impl PredictionLogRecord {
    /// 以当前时间创建记录
    pub fn new(
        user_id: impl Into<String>,
        predicted_price_range: i64,
        confidence: f64,
        entry: LogEntry,
    ) -> Self {
        Self::at(Utc::now(), user_id, predicted_price_range, confidence, entry)
    }

    /// 以指定时间创建记录
    pub fn at(
        time: DateTime<Utc>,
        user_id: impl Into<String>,
        predicted_price_range: i64,
        confidence: f64,
        entry: LogEntry,
    ) -> Self {
        Self {
            timestamp: time.to_rfc3339_opts(SecondsFormat::Millis, true),
            user_id: user_id.into(),
            id: time.timestamp_millis(),
            predicted_price_range,
            confidence,
            entry,
        }
    }

    /// 序列化为一行日志（含换行符）
    pub fn to_line(&self) -> anyhow::Result<String> {
        let json = serde_json::to_string(self).context("序列化预测日志失败")?;
        Ok(format!("{}{}{}\n", self.timestamp, LINE_SEPARATOR, json))
    }
}

/// 追加写的预测日志文件
pub struct PredictionLog {
    path: PathBuf,
    /// 进程内单写者；跨进程依赖 O_APPEND
    write_lock: Mutex<()>,
}

impl PredictionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// 追加一条记录
    ///
    /// 整行一次 `write_all`，避免并发追加时出现半行交错
    pub fn append(&self, record: &PredictionLogRecord) -> anyhow::Result<()> {
        let line = record.to_line()?;

        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("创建日志目录失败: {}", parent.display()))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("打开预测日志失败: {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("写入预测日志失败: {}", self.path.display()))?;

        tracing::debug!(
            id = record.id,
            kind = record.entry.kind(),
            user_id = %record.user_id,
            "预测日志已写入"
        );
        Ok(())
    }
}
