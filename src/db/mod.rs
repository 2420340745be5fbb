//! SQLite 存储
//!
//! 用户表和已登录用户的预测记录表。连接由互斥锁串行化，
//! 调用方在异步上下文中应通过 `spawn_blocking` 使用。

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use serde::Serialize;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS devices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        input_data TEXT NOT NULL,
        predicted_price REAL NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_devices_user ON devices(user_id);";

/// 用户
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

/// 已保存的预测
#[derive(Debug, Clone, Serialize)]
pub struct SavedDevice {
    pub id: i64,
    /// 规范化后的原始输入
    pub input_data: serde_json::Value,
    pub predicted_price: f64,
    pub created_at: String,
}

/// 数据库句柄（克隆共享同一连接）
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// 打开（或创建）数据库文件
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("创建数据库目录失败: {}", parent.display()))?;
            }
        }
        let conn = Connection::open(path)
            .with_context(|| format!("打开数据库失败: {}", path.display()))?;
        Self::init(conn)
    }

    /// 内存数据库
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).context("初始化数据表失败")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 连通性检查
    pub fn ping(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    /// 创建用户
    ///
    /// 邮箱已存在时返回 `Ok(None)`
    pub fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<i64>> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, ?3)",
            params![username, email, password_hash],
        );

        match inserted {
            Ok(_) => Ok(Some(conn.last_insert_rowid())),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 按邮箱查找用户
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        let user = conn
            .query_row(
                "SELECT id, username, password_hash FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        password_hash: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// 保存一次预测
    pub fn save_prediction(
        &self,
        user_id: i64,
        input_data: &serde_json::Value,
        predicted_price: f64,
    ) -> Result<i64> {
        let input = serde_json::to_string(input_data)?;
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO devices (user_id, input_data, predicted_price, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, input, predicted_price, created_at],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 用户保存的预测，最新的在前
    pub fn get_user_predictions(&self, user_id: i64) -> Result<Vec<SavedDevice>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, input_data, predicted_price, created_at
             FROM devices WHERE user_id = ?1 ORDER BY id DESC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut devices = Vec::new();
        for row in rows {
            let (id, input, predicted_price, created_at) = row?;
            // 历史数据可能不是合法 JSON，原样返回字符串
            let input_data = serde_json::from_str(&input)
                .unwrap_or(serde_json::Value::String(input));
            devices.push(SavedDevice {
                id,
                input_data,
                predicted_price,
                created_at,
            });
        }
        Ok(devices)
    }
}
