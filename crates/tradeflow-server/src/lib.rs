//! Tradeflow Server - HTTP/WebSocket 服务

pub mod api;
pub mod room_api;
pub mod workflow_api;

pub use api::*;
pub use room_api::*;
pub use workflow_api::*;
