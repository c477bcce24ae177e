//! 执行桥的请求/响应契约

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tradeflow_graph::{Edge, GraphDoc, NodeKind, Position, TradingPair};

/// 提交给执行服务的工作流节点
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowNode {
    pub id: String,
    pub agent_id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// 提交给执行服务的工作流图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowGraph {
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<Edge>,
}

/// `POST /run-workflow` 请求体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunWorkflowRequest {
    pub workflow: WorkflowGraph,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<TradingPair>,
}

impl RunWorkflowRequest {
    /// 从当前图文档构造提交载荷
    ///
    /// `symbol` 未显式给出时取第一个携带交易对的节点
    pub fn from_doc(doc: &GraphDoc, symbol: Option<TradingPair>) -> Self {
        let symbol = symbol.or_else(|| doc.nodes.iter().find_map(|n| n.data.symbol));
        Self {
            workflow: WorkflowGraph {
                nodes: doc
                    .nodes
                    .iter()
                    .map(|n| WorkflowNode {
                        id: n.id.clone(),
                        agent_id: n.agent_id.clone(),
                        kind: n.kind.clone(),
                        position: n.position,
                        hash: n.hash.clone(),
                    })
                    .collect(),
                edges: doc.edges.clone(),
            },
            symbol,
        }
    }
}

/// `POST /run-workflow` 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunWorkflowResponse {
    pub workflow_id: String,
}

/// 工作流执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl WorkflowStatus {
    /// 终态结束轮询
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed)
    }
}

/// `GET /workflow-status/{id}` 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: WorkflowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 每个节点的执行日志
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub logs: HashMap<String, Vec<String>>,
}
