//! 用户认证
//!
//! - 注册 / 登录（bcrypt 密码哈希，HS256 JWT）
//! - 身份识别中间件：有效 Token 为登录用户，否则为匿名用户

pub mod jwt;
pub mod middleware;
mod handlers;
mod router;
pub mod service;
pub mod types;

pub use jwt::JwtManager;
pub use middleware::{Identity, identity_middleware};
pub use router::create_auth_router;
pub use service::AuthService;
