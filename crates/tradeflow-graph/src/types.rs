//! 图类型定义

use serde::{Deserialize, Serialize};

/// 房间 ID
pub type RoomId = String;

/// 节点 ID
pub type NodeId = String;

/// 用户 ID
pub type UserId = String;

/// 图坐标系中的位置
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// 四舍五入到整数坐标，拖拽结束提交时使用
    pub fn rounded(&self) -> Self {
        Self {
            x: self.x.round(),
            y: self.y.round(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// 节点类型标签
///
/// 未知标签落入 `Custom`，由渲染注册表回退到默认渲染器
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    AiAgent,
    Trading,
    #[serde(untagged)]
    Custom(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::AiAgent => "aiagent",
            NodeKind::Trading => "trading",
            NodeKind::Custom(tag) => tag,
        }
    }
}

/// 交易对（固定枚举集）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradingPair {
    Btc,
    Eth,
    Sol,
    Bnb,
    Doge,
}

impl TradingPair {
    pub fn all() -> &'static [TradingPair] {
        &[
            TradingPair::Btc,
            TradingPair::Eth,
            TradingPair::Sol,
            TradingPair::Bnb,
            TradingPair::Doge,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradingPair::Btc => "BTC",
            TradingPair::Eth => "ETH",
            TradingPair::Sol => "SOL",
            TradingPair::Bnb => "BNB",
            TradingPair::Doge => "DOGE",
        }
    }
}

/// 节点数据载荷
///
/// `symbol` 仅对 `trading` 类型节点有意义，其他类型忽略该字段
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeData {
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(rename = "agentId", default)]
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<TradingPair>,
}

/// 节点数据增量更新
///
/// 只合并 `Some` 字段，其余字段原样保留
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NodeDataPatch {
    pub label: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    #[serde(rename = "agentId")]
    pub agent_id: Option<String>,
    pub symbol: Option<TradingPair>,
}

/// 图节点
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub position: Position,
    pub data: NodeData,
    #[serde(rename = "agentId", default)]
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// 有向边
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(
        rename = "sourceHandle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_handle: Option<String>,
    #[serde(
        rename = "targetHandle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target_handle: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: EdgeKind,
}

impl Edge {
    /// 约定的边 ID：`e<source>-<target>`
    pub fn id_for(source: &str, target: &str) -> String {
        format!("e{}-{}", source, target)
    }
}

/// 边渲染类型，本系统中固定为默认
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    #[default]
    Default,
}

/// 一个房间的完整图文档
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GraphDoc {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// 单调递增的节点 ID 计数器，随文档一起存储在共享状态中，
    /// 避免从可见 ID 集合反推导致的冲突
    #[serde(rename = "nextNodeId", default)]
    pub next_node_id: u64,
}

impl GraphDoc {
    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// 分配下一个节点 ID
    ///
    /// 计数器落后于可见的数字 ID 时（例如其他端写入过文档）先追平，
    /// 非数字 ID 不参与追平
    pub fn allocate_node_id(&mut self) -> NodeId {
        let max_numeric = self
            .nodes
            .iter()
            .filter_map(|n| n.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        let next = self.next_node_id.max(max_numeric + 1);
        self.next_node_id = next + 1;
        next.to_string()
    }
}

/// 调色板条目：可拖入画布的节点模板，来源于执行桥的 agent 注册表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaletteItem {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// 视口状态（平移 + 缩放）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// 屏幕坐标映射到图坐标
    pub fn screen_to_graph(&self, p: Position) -> Position {
        Position::new((p.x - self.x) / self.zoom, (p.y - self.y) / self.zoom)
    }

    /// 图坐标映射到屏幕坐标
    pub fn graph_to_screen(&self, p: Position) -> Position {
        Position::new(p.x * self.zoom + self.x, p.y * self.zoom + self.y)
    }
}

/// 本连接的光标状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CursorState {
    pub position: Position,
    /// 最后活跃时间（毫秒时间戳）
    #[serde(rename = "lastActive")]
    pub last_active: i64,
}

impl CursorState {
    /// 是否处于活跃窗口内（活跃性启发式，与连接是否存活无关）
    pub fn is_active(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms - self.last_active <= ttl_ms
    }
}
