//! 共享图存储的能力接口
//!
//! 交互层只通过这个小接口访问房间状态：读当前文档、整体事务性替换
//! 集合、发布本连接的光标。宿主实现见 tradeflow-collab

use crate::types::{CursorState, Edge, GraphDoc, Node};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tradeflow_core::Result;

/// 一次提交：整体替换指定的顶层集合
///
/// `None` 表示该集合不动。一个手势恰好产生一次提交，并发端要么看到
/// 完整变更要么什么都看不到
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CommitRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<Edge>>,
    #[serde(rename = "nextNodeId", default, skip_serializing_if = "Option::is_none")]
    pub next_node_id: Option<u64>,
}

impl CommitRequest {
    pub fn nodes_only(nodes: Vec<Node>) -> Self {
        Self {
            nodes: Some(nodes),
            ..Default::default()
        }
    }

    pub fn edges_only(edges: Vec<Edge>) -> Self {
        Self {
            edges: Some(edges),
            ..Default::default()
        }
    }
}

/// 共享图存储
#[async_trait]
pub trait SharedGraphStore: Send + Sync {
    /// 读取当前权威文档
    async fn read(&self) -> GraphDoc;

    /// 原子提交一次变更
    async fn commit(&self, request: CommitRequest) -> Result<()>;

    /// 发布本连接的光标；`None` 表示指针离开画布
    async fn publish_cursor(&self, cursor: Option<CursorState>) -> Result<()>;
}
