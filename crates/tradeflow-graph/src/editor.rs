//! 本地交互层
//!
//! 把 UI 手势转换成恰好一次图模型调用加恰好一次存储提交。每个手势
//! 都先从共享存储重新读取权威文档，绝不基于闭包捕获的陈旧快照计算
//! 增量。指向已不存在 ID 的手势一律按无操作吸收

use crate::ops::GraphOps;
use crate::store::{CommitRequest, SharedGraphStore};
use crate::types::{
    CursorState, Edge, Node, NodeData, NodeDataPatch, NodeId, PaletteItem, Position, TradingPair,
    Viewport,
};
use std::sync::Arc;
use tracing::debug;
use tradeflow_core::Result;

/// 拖拽中的两级状态：`pending` 是每帧更新的视觉位置，
/// 提交只在拖拽结束时发生一次
#[derive(Debug, Clone)]
pub struct DragState {
    pub node_id: NodeId,
    pub pending: Position,
}

/// 图编辑器（本地交互层）
///
/// 提交函数通过构造参数注入，而不是初始化后改写共享单例
pub struct GraphEditor {
    store: Arc<dyn SharedGraphStore>,
    viewport: Viewport,
    selection: Option<NodeId>,
    drag: Option<DragState>,
    cursor_throttle_ms: i64,
    last_cursor_publish: Option<i64>,
}

impl GraphEditor {
    pub fn new(store: Arc<dyn SharedGraphStore>) -> Self {
        Self {
            store,
            viewport: Viewport::default(),
            selection: None,
            drag: None,
            cursor_throttle_ms: 40,
            last_cursor_publish: None,
        }
    }

    pub fn with_cursor_throttle(mut self, throttle_ms: i64) -> Self {
        self.cursor_throttle_ms = throttle_ms;
        self
    }

    /// 视口平移/缩放变化
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn select(&mut self, node_id: Option<NodeId>) {
        self.selection = node_id;
    }

    pub fn selection(&self) -> Option<&NodeId> {
        self.selection.as_ref()
    }

    /// 调色板拖放：在屏幕坐标处创建新节点
    ///
    /// 节点 ID 由共享计数器分配，模板字段复制进节点数据
    pub async fn drop_palette_item(
        &mut self,
        item: &PaletteItem,
        screen_pos: Position,
    ) -> Result<Option<NodeId>> {
        let position = self.viewport.screen_to_graph(screen_pos);
        if !position.is_finite() {
            return Ok(None);
        }

        let mut doc = self.store.read().await;
        let node_id = doc.allocate_node_id();

        let node = Node {
            id: node_id.clone(),
            kind: item.kind.clone(),
            position,
            data: NodeData {
                label: item.label.clone(),
                description: item.description.clone(),
                icon: item.icon.clone(),
                agent_id: item.id.clone(),
                symbol: None,
            },
            agent_id: item.id.clone(),
            hash: item.hash.clone(),
        };

        let next = GraphOps::add_node(&doc, node);
        self.store
            .commit(CommitRequest {
                nodes: Some(next.nodes),
                edges: None,
                next_node_id: Some(next.next_node_id),
            })
            .await?;

        Ok(Some(node_id))
    }

    /// 开始拖拽节点
    pub fn drag_start(&mut self, node_id: NodeId, position: Position) {
        self.drag = Some(DragState {
            node_id,
            pending: position,
        });
    }

    /// 拖拽中的每一帧只更新视觉位置，不产生提交
    pub fn drag_move(&mut self, position: Position) -> Option<Position> {
        let drag = self.drag.as_mut()?;
        drag.pending = position;
        Some(drag.pending)
    }

    /// 拖拽结束：取整后提交一次最终位置
    ///
    /// 中间帧绝不单独提交，一个拖拽手势只对应一次存储事务
    pub async fn drag_stop(&mut self) -> Result<()> {
        let Some(drag) = self.drag.take() else {
            return Ok(());
        };

        let doc = self.store.read().await;
        if !doc.has_node(&drag.node_id) {
            debug!("拖拽目标已被并发删除: {}", drag.node_id);
            return Ok(());
        }

        let next = GraphOps::update_node_position(&doc, &drag.node_id, drag.pending.rounded());
        self.store.commit(CommitRequest::nodes_only(next.nodes)).await
    }

    /// 当前拖拽的视觉位置（渲染反馈用）
    pub fn drag_state(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    /// 连接手势：在两个端口之间建边
    ///
    /// 端点为空、自连、端点缺失或重复时静默中止，不产生提交
    pub async fn connect(
        &mut self,
        source: &str,
        target: &str,
        source_handle: Option<String>,
        target_handle: Option<String>,
    ) -> Result<()> {
        if source.is_empty() || target.is_empty() {
            return Ok(());
        }

        let doc = self.store.read().await;
        let edge = Edge {
            id: Edge::id_for(source, target),
            source: source.to_string(),
            target: target.to_string(),
            source_handle,
            target_handle,
            kind: Default::default(),
        };

        match GraphOps::add_edge(&doc, edge) {
            Ok(next) => self.store.commit(CommitRequest::edges_only(next.edges)).await,
            Err(rejection) => {
                debug!("连接手势被拒绝: {}", rejection);
                Ok(())
            }
        }
    }

    /// 删除节点及其所有关联边，单次事务提交
    pub async fn delete_node(&mut self, node_id: &str) -> Result<()> {
        let doc = self.store.read().await;
        if !doc.has_node(node_id) {
            return Ok(());
        }

        let next = GraphOps::remove_node(&doc, node_id);
        self.store
            .commit(CommitRequest {
                nodes: Some(next.nodes),
                edges: Some(next.edges),
                next_node_id: None,
            })
            .await?;

        if self.selection.as_deref() == Some(node_id) {
            self.selection = None;
        }
        Ok(())
    }

    /// Delete/Backspace：删除当前选中节点
    pub async fn delete_selection(&mut self) -> Result<()> {
        let Some(node_id) = self.selection.clone() else {
            return Ok(());
        };
        self.delete_node(&node_id).await
    }

    /// 删除单条边
    pub async fn delete_edge(&mut self, edge_id: &str) -> Result<()> {
        let doc = self.store.read().await;
        if doc.edge(edge_id).is_none() {
            return Ok(());
        }

        let next = GraphOps::remove_edge(&doc, edge_id);
        self.store.commit(CommitRequest::edges_only(next.edges)).await
    }

    /// 更新交易节点的交易对，保留数据中的其他字段
    pub async fn update_node_symbol(&mut self, node_id: &str, symbol: TradingPair) -> Result<()> {
        let doc = self.store.read().await;
        if !doc.has_node(node_id) {
            return Ok(());
        }

        let patch = NodeDataPatch {
            symbol: Some(symbol),
            ..Default::default()
        };
        let next = GraphOps::update_node_data(&doc, node_id, patch);
        self.store.commit(CommitRequest::nodes_only(next.nodes)).await
    }

    /// 指针在画布上移动：节流后发布图坐标光标
    pub async fn pointer_move(&mut self, screen_pos: Position) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        if let Some(last) = self.last_cursor_publish
            && now - last < self.cursor_throttle_ms
        {
            return Ok(());
        }

        let position = self.viewport.screen_to_graph(screen_pos);
        self.last_cursor_publish = Some(now);
        self.store
            .publish_cursor(Some(CursorState {
                position,
                last_active: now,
            }))
            .await
    }

    /// 指针离开画布：发布空光标
    pub async fn pointer_leave(&mut self) -> Result<()> {
        self.last_cursor_publish = None;
        self.store.publish_cursor(None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GraphDoc, NodeKind};
    use std::sync::Mutex;

    /// 记录提交与光标发布的内存存储
    struct RecordingStore {
        doc: Mutex<GraphDoc>,
        commits: Mutex<Vec<CommitRequest>>,
        cursors: Mutex<Vec<Option<CursorState>>>,
    }

    impl RecordingStore {
        fn new(doc: GraphDoc) -> Arc<Self> {
            Arc::new(Self {
                doc: Mutex::new(doc),
                commits: Mutex::new(Vec::new()),
                cursors: Mutex::new(Vec::new()),
            })
        }

        fn commit_count(&self) -> usize {
            self.commits.lock().unwrap().len()
        }

        fn doc(&self) -> GraphDoc {
            self.doc.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl SharedGraphStore for RecordingStore {
        async fn read(&self) -> GraphDoc {
            self.doc.lock().unwrap().clone()
        }

        async fn commit(&self, request: CommitRequest) -> Result<()> {
            let mut doc = self.doc.lock().unwrap();
            if let Some(nodes) = &request.nodes {
                doc.nodes = nodes.clone();
            }
            if let Some(edges) = &request.edges {
                doc.edges = edges.clone();
            }
            if let Some(next_id) = request.next_node_id {
                doc.next_node_id = next_id;
            }
            self.commits.lock().unwrap().push(request);
            Ok(())
        }

        async fn publish_cursor(&self, cursor: Option<CursorState>) -> Result<()> {
            self.cursors.lock().unwrap().push(cursor);
            Ok(())
        }
    }

    fn palette_item() -> PaletteItem {
        PaletteItem {
            kind: NodeKind::AiAgent,
            label: "Trading Agent".to_string(),
            description: "分析行情".to_string(),
            icon: "bot".to_string(),
            id: "agent-abc".to_string(),
            hash: Some("0xdeadbeef".to_string()),
        }
    }

    fn seeded_store(ids: &[&str]) -> Arc<RecordingStore> {
        let mut doc = GraphDoc::default();
        for id in ids {
            let mut item = palette_item();
            item.label = format!("Node {}", id);
            doc.nodes.push(Node {
                id: id.to_string(),
                kind: NodeKind::AiAgent,
                position: Position::new(0.0, 0.0),
                data: NodeData {
                    label: item.label,
                    description: item.description,
                    icon: item.icon,
                    agent_id: item.id.clone(),
                    symbol: None,
                },
                agent_id: item.id,
                hash: None,
            });
        }
        RecordingStore::new(doc)
    }

    #[tokio::test]
    async fn test_drag_commits_exactly_once_with_rounded_position() {
        let store = seeded_store(&["3"]);
        let mut editor = GraphEditor::new(store.clone());

        editor.drag_start("3".to_string(), Position::new(0.0, 0.0));
        editor.drag_move(Position::new(10.7, 20.1));
        editor.drag_move(Position::new(55.4, 61.9));
        editor.drag_move(Position::new(100.2, 80.6));
        editor.drag_stop().await.unwrap();

        assert_eq!(store.commit_count(), 1);
        let committed = store.doc().node("3").unwrap().position;
        assert_eq!(committed.x, 100.0);
        assert_eq!(committed.y, 81.0);
    }

    #[tokio::test]
    async fn test_drag_stop_on_concurrently_deleted_node_is_noop() {
        let store = seeded_store(&[]);
        let mut editor = GraphEditor::new(store.clone());

        editor.drag_start("99".to_string(), Position::new(1.0, 1.0));
        editor.drag_move(Position::new(5.0, 5.0));
        editor.drag_stop().await.unwrap();

        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_palette_drop_creates_node_at_mapped_position() {
        let store = seeded_store(&[]);
        let mut editor = GraphEditor::new(store.clone());
        editor.set_viewport(Viewport {
            x: 120.0,
            y: -40.0,
            zoom: 2.0,
        });

        let id = editor
            .drop_palette_item(&palette_item(), Position::new(220.0, 60.0))
            .await
            .unwrap()
            .unwrap();

        let doc = store.doc();
        assert_eq!(doc.nodes.len(), 1);
        let node = doc.node(&id).unwrap();
        assert_eq!(node.kind, NodeKind::AiAgent);
        assert_eq!(node.position.x, 50.0);
        assert_eq!(node.position.y, 50.0);
        assert_eq!(node.data.label, "Trading Agent");
        assert_eq!(node.data.agent_id, "agent-abc");
        assert_eq!(node.hash.as_deref(), Some("0xdeadbeef"));
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_self_connection_rejected_without_commit() {
        let store = seeded_store(&["1"]);
        let mut editor = GraphEditor::new(store.clone());

        editor.connect("1", "1", None, None).await.unwrap();

        assert!(store.doc().edges.is_empty());
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_missing_endpoint_aborts_silently() {
        let store = seeded_store(&["1"]);
        let mut editor = GraphEditor::new(store.clone());

        editor.connect("1", "99", None, None).await.unwrap();
        editor.connect("", "1", None, None).await.unwrap();

        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_attaches_handles() {
        let store = seeded_store(&["1", "2"]);
        let mut editor = GraphEditor::new(store.clone());

        editor
            .connect("1", "2", Some("out".to_string()), Some("in".to_string()))
            .await
            .unwrap();

        let doc = store.doc();
        assert_eq!(doc.edges.len(), 1);
        assert_eq!(doc.edges[0].id, "e1-2");
        assert_eq!(doc.edges[0].source_handle.as_deref(), Some("out"));
    }

    #[tokio::test]
    async fn test_delete_selection_cascades_in_single_commit() {
        let store = seeded_store(&["1", "2"]);
        {
            let mut doc = store.doc.lock().unwrap();
            doc.edges.push(Edge {
                id: Edge::id_for("1", "2"),
                source: "1".to_string(),
                target: "2".to_string(),
                source_handle: None,
                target_handle: None,
                kind: Default::default(),
            });
        }
        let mut editor = GraphEditor::new(store.clone());
        editor.select(Some("1".to_string()));

        editor.delete_selection().await.unwrap();

        assert_eq!(store.commit_count(), 1);
        let doc = store.doc();
        assert!(!doc.has_node("1"));
        assert!(doc.edges.is_empty());
        assert!(editor.selection().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_edge_is_noop() {
        let store = seeded_store(&["1"]);
        let mut editor = GraphEditor::new(store.clone());

        editor.delete_edge("e9-9").await.unwrap();

        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_update_symbol_preserves_sibling_fields() {
        let store = seeded_store(&["1"]);
        let mut editor = GraphEditor::new(store.clone());

        editor
            .update_node_symbol("1", TradingPair::Eth)
            .await
            .unwrap();

        let doc = store.doc();
        let data = &doc.node("1").unwrap().data;
        assert_eq!(data.symbol, Some(TradingPair::Eth));
        assert_eq!(data.label, "Node 1");
        assert_eq!(data.agent_id, "agent-abc");
    }

    #[tokio::test]
    async fn test_pointer_move_publishes_graph_coordinates() {
        let store = seeded_store(&[]);
        let mut editor = GraphEditor::new(store.clone());
        editor.set_viewport(Viewport {
            x: 100.0,
            y: 0.0,
            zoom: 1.0,
        });

        editor.pointer_move(Position::new(150.0, 30.0)).await.unwrap();
        editor.pointer_leave().await.unwrap();

        let cursors = store.cursors.lock().unwrap();
        assert_eq!(cursors.len(), 2);
        let published = cursors[0].unwrap();
        assert_eq!(published.position.x, 50.0);
        assert_eq!(published.position.y, 30.0);
        assert!(cursors[1].is_none());
    }

    #[tokio::test]
    async fn test_pointer_move_is_throttled() {
        let store = seeded_store(&[]);
        let mut editor = GraphEditor::new(store.clone()).with_cursor_throttle(1000);

        editor.pointer_move(Position::new(1.0, 1.0)).await.unwrap();
        editor.pointer_move(Position::new(2.0, 2.0)).await.unwrap();
        editor.pointer_move(Position::new(3.0, 3.0)).await.unwrap();

        assert_eq!(store.cursors.lock().unwrap().len(), 1);
    }
}
