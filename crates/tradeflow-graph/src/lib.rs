//! Tradeflow Graph - 工作流图模型与本地交互层
//!
//! 提供画布图的规范数据结构、纯函数图操作、手势到图变更的转换，
//! 以及共享图存储的能力接口

pub mod editor;
pub mod ops;
pub mod registry;
pub mod store;
pub mod types;

pub use editor::*;
pub use ops::*;
pub use registry::*;
pub use store::*;
pub use types::*;
