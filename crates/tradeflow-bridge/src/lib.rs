//! Tradeflow Bridge - 工作流执行桥
//!
//! 外部执行服务的 HTTP 客户端：agent 注册表（调色板来源）、
//! 工作流提交与状态轮询

pub mod client;
pub mod tracker;
pub mod types;

pub use client::*;
pub use tracker::*;
pub use types::*;
