//! Tradeflow Collab - 实时协作房间
//!
//! 共享图存储的宿主实现：房间会话、事务性提交、在场（presence）通道
//! 与协作事件广播

pub mod presence;
pub mod protocol;
pub mod room;

pub use presence::*;
pub use protocol::*;
pub use room::*;
