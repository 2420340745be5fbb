//! 预测日志与历史查询
//!
//! - `log`：追加写的预测日志
//! - `reader`：按身份读取历史

mod handlers;
pub mod log;
pub mod reader;
mod router;

pub use log::PredictionLog;
pub use router::create_history_router;
