//! 统一错误处理

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TradeflowError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("房间不存在: {0}")]
    RoomNotFound(String),

    #[error("传输错误: {0}")]
    Transport(String),

    #[error("工作流执行失败: {0}")]
    Execution(String),

    #[error("HTTP 请求错误: {0}")]
    Http(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("无效操作: {0}")]
    InvalidOperation(String),

    #[error("未知错误: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, TradeflowError>;
