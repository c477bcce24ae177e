//! 纯函数图操作
//!
//! 所有操作以旧文档加意图推导新文档，不依赖传输层，不持有隐藏状态，
//! 可独立单元测试。不变量违规按无操作处理而不是抛错：多人实时画布
//! 绝不能因为并发端的陈旧引用而崩溃

use crate::types::{Edge, GraphDoc, Node, NodeDataPatch, Position};
use thiserror::Error;
use tracing::debug;

/// 加边被拒绝的原因，调用方静默吸收为无操作
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EdgeRejection {
    #[error("边端点不存在: {0}")]
    InvalidEndpoint(String),

    #[error("不允许节点自连: {0}")]
    SelfLoop(String),

    #[error("重复的边: {0}")]
    Duplicate(String),
}

/// 图操作
pub struct GraphOps;

impl GraphOps {
    /// 追加节点；ID 已存在或位置非有限时不变
    pub fn add_node(doc: &GraphDoc, node: Node) -> GraphDoc {
        if doc.has_node(&node.id) {
            debug!("忽略重复节点: {}", node.id);
            return doc.clone();
        }
        if !node.position.is_finite() {
            debug!("忽略非有限位置的节点: {}", node.id);
            return doc.clone();
        }

        let mut next = doc.clone();
        next.nodes.push(node);
        next
    }

    /// 删除节点，并在同一逻辑操作中级联删除所有以它为端点的边
    pub fn remove_node(doc: &GraphDoc, node_id: &str) -> GraphDoc {
        if !doc.has_node(node_id) {
            return doc.clone();
        }

        let mut next = doc.clone();
        next.nodes.retain(|n| n.id != node_id);
        next.edges
            .retain(|e| e.source != node_id && e.target != node_id);
        next
    }

    /// 替换匹配节点的位置；ID 不存在或位置非有限时不变
    pub fn update_node_position(doc: &GraphDoc, node_id: &str, position: Position) -> GraphDoc {
        if !position.is_finite() {
            return doc.clone();
        }

        let mut next = doc.clone();
        if let Some(node) = next.nodes.iter_mut().find(|n| n.id == node_id) {
            node.position = position;
        }
        next
    }

    /// 合并节点数据载荷
    ///
    /// 对完整对象做读-改-写，只覆盖补丁中的 `Some` 字段，兄弟字段原样保留
    pub fn update_node_data(doc: &GraphDoc, node_id: &str, patch: NodeDataPatch) -> GraphDoc {
        let mut next = doc.clone();
        if let Some(node) = next.nodes.iter_mut().find(|n| n.id == node_id) {
            if let Some(label) = patch.label {
                node.data.label = label;
            }
            if let Some(description) = patch.description {
                node.data.description = description;
            }
            if let Some(icon) = patch.icon {
                node.data.icon = icon;
            }
            if let Some(agent_id) = patch.agent_id {
                node.data.agent_id = agent_id;
            }
            if let Some(symbol) = patch.symbol {
                node.data.symbol = Some(symbol);
            }
        }
        next
    }

    /// 追加边，要求两个端点都在当前节点集中
    pub fn add_edge(doc: &GraphDoc, edge: Edge) -> Result<GraphDoc, EdgeRejection> {
        if edge.source == edge.target {
            return Err(EdgeRejection::SelfLoop(edge.source));
        }
        if !doc.has_node(&edge.source) {
            return Err(EdgeRejection::InvalidEndpoint(edge.source));
        }
        if !doc.has_node(&edge.target) {
            return Err(EdgeRejection::InvalidEndpoint(edge.target));
        }
        if doc.edge(&edge.id).is_some() {
            return Err(EdgeRejection::Duplicate(edge.id));
        }

        let mut next = doc.clone();
        next.edges.push(edge);
        Ok(next)
    }

    /// 按 ID 删除边；不存在时不变
    pub fn remove_edge(doc: &GraphDoc, edge_id: &str) -> GraphDoc {
        let mut next = doc.clone();
        next.edges.retain(|e| e.id != edge_id);
        next
    }

    /// 校验边端点有效性不变量：每条边的 source/target 都在节点集中
    pub fn endpoints_valid(doc: &GraphDoc) -> bool {
        doc.edges
            .iter()
            .all(|e| doc.has_node(&e.source) && doc.has_node(&e.target))
    }
}
