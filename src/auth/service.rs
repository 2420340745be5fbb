//! 用户注册与登录

use anyhow::Context;

use super::jwt::JwtManager;
use super::types::{AuthError, LoginRequest, RegisterRequest, non_blank};
use crate::db::{Database, User};

/// 认证服务
pub struct AuthService {
    db: Database,
    jwt: JwtManager,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(db: Database, jwt: JwtManager) -> Self {
        Self {
            db,
            jwt,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// 调整 bcrypt 强度（测试使用最低强度）
    #[cfg(test)]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.jwt
    }

    /// 注册新用户，返回用户 ID
    pub async fn register(&self, req: RegisterRequest) -> Result<i64, AuthError> {
        let (Some(name), Some(email), Some(password)) = (
            non_blank(req.name),
            non_blank(req.email),
            req.password.filter(|p| !p.trim().is_empty()),
        ) else {
            return Err(AuthError::MissingRegisterFields);
        };

        let db = self.db.clone();
        let cost = self.bcrypt_cost;
        let created = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<i64>> {
            if db.find_user_by_email(&email)?.is_some() {
                return Ok(None);
            }
            let hash = bcrypt::hash(&password, cost).context("密码哈希失败")?;
            db.create_user(&name, &email, &hash)
        })
        .await
        .context("注册任务执行失败")??;

        match created {
            Some(id) => {
                tracing::info!(user_id = id, "用户注册成功");
                Ok(id)
            }
            None => Err(AuthError::EmailExists),
        }
    }

    /// 登录，返回 JWT
    pub async fn login(&self, req: LoginRequest) -> Result<String, AuthError> {
        let (Some(email), Some(password)) = (
            non_blank(req.email),
            req.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AuthError::MissingLoginFields);
        };

        let db = self.db.clone();
        let user = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<User>> {
            let Some(user) = db.find_user_by_email(&email)? else {
                return Ok(None);
            };
            // 哈希格式损坏按凭据错误处理
            let valid = bcrypt::verify(&password, &user.password_hash).unwrap_or(false);
            Ok(valid.then_some(user))
        })
        .await
        .context("登录任务执行失败")??;

        let Some(user) = user else {
            tracing::warn!("登录失败：凭据无效");
            return Err(AuthError::InvalidCredentials);
        };

        let token = self.jwt.generate_token(user.id)?;
        tracing::info!(user_id = user.id, username = %user.username, "用户登录成功");
        Ok(token)
    }
}
