//! JWT Token 管理模块
//!
//! 提供用户登录 Token 的生成和验证功能

use anyhow::{Result, anyhow};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// JWT Claims 结构
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject（用户 ID 的字符串形式）
    pub sub: String,
    /// 用户 ID
    pub user_id: i64,
    /// 签发时间 (Unix timestamp)
    pub iat: usize,
    /// 过期时间 (Unix timestamp)
    pub exp: usize,
}

/// 从配置的密钥派生 HMAC 签名密钥
///
/// 使用 SHA256 哈希原始密钥，使任意长度的配置值都得到 32 字节密钥
fn derive_secret_key(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    key: Vec<u8>,
    expiry_seconds: u64,
}

impl JwtManager {
    pub fn new(secret: &str, expiry_minutes: u64) -> Self {
        Self {
            key: derive_secret_key(secret),
            expiry_seconds: expiry_minutes * 60,
        }
    }

    /// 有效期（秒）
    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }

    /// 为用户生成 Token
    pub fn generate_token(&self, user_id: i64) -> Result<String> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_secs();

        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            iat: now as usize,
            exp: (now + self.expiry_seconds) as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.key),
        )?;
        Ok(token)
    }

    /// 验证 Token
    ///
    /// # Returns
    /// * `Ok(Claims)` - 验证成功
    /// * `Err(_)` - 过期、签名错误或格式错误
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.key),
            &Validation::default(),
        )
        .map_err(|e| anyhow!("Invalid token: {}", e))?;

        Ok(token_data.claims)
    }
}
