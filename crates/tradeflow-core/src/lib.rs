//! Tradeflow Core - 公共基础模块
//!
//! 提供统一的错误类型和配置管理

pub mod config;
pub mod error;

pub use config::*;
pub use error::*;
