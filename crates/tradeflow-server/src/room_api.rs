//! 协作房间 API 路由

use axum::{
    Json, Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tradeflow_collab::{
    RoomEvent, RoomManager, RoomSession, UserColorGenerator, UserInfo, WsMessage,
};
use tradeflow_core::CollabConfig;
use tradeflow_graph::{
    CommitRequest, Edge, GraphDoc, GraphOps, Node, NodeData, NodeDataPatch, PaletteItem, Position,
    RoomId,
};

/// 房间 API 状态
#[derive(Clone)]
pub struct RoomApiState {
    pub room_manager: Arc<RoomManager>,
    pub color_generator: Arc<UserColorGenerator>,
}

impl RoomApiState {
    pub fn new(config: CollabConfig) -> Self {
        Self {
            room_manager: Arc::new(RoomManager::new(config)),
            color_generator: Arc::new(UserColorGenerator::new()),
        }
    }

    pub fn with_manager(manager: Arc<RoomManager>) -> Self {
        Self {
            room_manager: manager,
            color_generator: Arc::new(UserColorGenerator::new()),
        }
    }
}

/// 创建房间 API 路由
pub fn create_room_router(state: RoomApiState) -> Router {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms", get(list_rooms))
        .route("/rooms/{id}", get(get_room))
        .route("/rooms/{id}/nodes", post(add_node))
        .route("/rooms/{id}/nodes/{node_id}", put(move_node))
        .route("/rooms/{id}/nodes/{node_id}", delete(delete_node))
        .route("/rooms/{id}/nodes/{node_id}/data", put(patch_node_data))
        .route("/rooms/{id}/edges", post(add_edge))
        .route("/rooms/{id}/edges/{edge_id}", delete(delete_edge))
        .route("/rooms/{id}/ws", get(room_websocket))
        .with_state(state)
}

/// 创建房间请求
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub id: Option<RoomId>,
}

/// 创建房间响应
#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    pub id: RoomId,
}

/// 创建（或打开）房间
async fn create_room(
    State(state): State<RoomApiState>,
    Json(req): Json<CreateRoomRequest>,
) -> Json<CreateRoomResponse> {
    let id = req.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    state.room_manager.get_or_create_session(id.clone()).await;
    Json(CreateRoomResponse { id })
}

/// 房间摘要
#[derive(Debug, Serialize)]
pub struct RoomInfo {
    pub id: RoomId,
    pub user_count: usize,
}

/// 列出活跃房间
async fn list_rooms(State(state): State<RoomApiState>) -> Json<Vec<RoomInfo>> {
    let rooms = state
        .room_manager
        .list_active_sessions()
        .await
        .into_iter()
        .map(|(id, user_count)| RoomInfo { id, user_count })
        .collect();
    Json(rooms)
}

/// 房间文档响应
#[derive(Debug, Serialize)]
pub struct RoomDocResponse {
    pub doc: GraphDoc,
    pub revision: u64,
}

/// 获取房间文档
async fn get_room(
    State(state): State<RoomApiState>,
    Path(id): Path<RoomId>,
) -> Result<Json<RoomDocResponse>, String> {
    let session = state
        .room_manager
        .get_session(&id)
        .await
        .ok_or("房间不存在")?;

    Ok(Json(RoomDocResponse {
        doc: session.snapshot().await,
        revision: session.revision().await,
    }))
}

/// 添加节点请求：调色板条目加图坐标
#[derive(Debug, Deserialize)]
pub struct AddNodeRequest {
    pub item: PaletteItem,
    pub position: Position,
}

/// 添加节点
async fn add_node(
    State(state): State<RoomApiState>,
    Path(room_id): Path<RoomId>,
    Json(req): Json<AddNodeRequest>,
) -> Result<Json<serde_json::Value>, String> {
    let session = state
        .room_manager
        .get_session(&room_id)
        .await
        .ok_or("房间不存在")?;

    let mut doc = session.snapshot().await;
    let node_id = doc.allocate_node_id();
    let node = Node {
        id: node_id.clone(),
        kind: req.item.kind.clone(),
        position: req.position,
        data: NodeData {
            label: req.item.label.clone(),
            description: req.item.description.clone(),
            icon: req.item.icon.clone(),
            agent_id: req.item.id.clone(),
            symbol: None,
        },
        agent_id: req.item.id.clone(),
        hash: req.item.hash.clone(),
    };

    let next = GraphOps::add_node(&doc, node);
    session
        .commit(CommitRequest {
            nodes: Some(next.nodes),
            edges: None,
            next_node_id: Some(next.next_node_id),
        })
        .await;

    Ok(Json(serde_json::json!({ "id": node_id })))
}

/// 移动节点
async fn move_node(
    State(state): State<RoomApiState>,
    Path((room_id, node_id)): Path<(RoomId, String)>,
    Json(position): Json<Position>,
) -> Result<Json<serde_json::Value>, String> {
    let session = state
        .room_manager
        .get_session(&room_id)
        .await
        .ok_or("房间不存在")?;

    let doc = session.snapshot().await;
    let next = GraphOps::update_node_position(&doc, &node_id, position.rounded());
    session.commit(CommitRequest::nodes_only(next.nodes)).await;

    Ok(Json(serde_json::json!({"success": true})))
}

/// 删除节点及其关联边（单次事务）
async fn delete_node(
    State(state): State<RoomApiState>,
    Path((room_id, node_id)): Path<(RoomId, String)>,
) -> Result<Json<serde_json::Value>, String> {
    let session = state
        .room_manager
        .get_session(&room_id)
        .await
        .ok_or("房间不存在")?;

    let doc = session.snapshot().await;
    let next = GraphOps::remove_node(&doc, &node_id);
    session
        .commit(CommitRequest {
            nodes: Some(next.nodes),
            edges: Some(next.edges),
            next_node_id: None,
        })
        .await;

    Ok(Json(serde_json::json!({"success": true})))
}

/// 更新节点数据
async fn patch_node_data(
    State(state): State<RoomApiState>,
    Path((room_id, node_id)): Path<(RoomId, String)>,
    Json(patch): Json<NodeDataPatch>,
) -> Result<Json<serde_json::Value>, String> {
    let session = state
        .room_manager
        .get_session(&room_id)
        .await
        .ok_or("房间不存在")?;

    let doc = session.snapshot().await;
    let next = GraphOps::update_node_data(&doc, &node_id, patch);
    session.commit(CommitRequest::nodes_only(next.nodes)).await;

    Ok(Json(serde_json::json!({"success": true})))
}

/// 添加边请求
#[derive(Debug, Deserialize)]
pub struct AddEdgeRequest {
    pub source: String,
    pub target: String,
    #[serde(rename = "sourceHandle", default)]
    pub source_handle: Option<String>,
    #[serde(rename = "targetHandle", default)]
    pub target_handle: Option<String>,
}

/// 添加边；被拒绝的连接按无操作处理
async fn add_edge(
    State(state): State<RoomApiState>,
    Path(room_id): Path<RoomId>,
    Json(req): Json<AddEdgeRequest>,
) -> Result<Json<serde_json::Value>, String> {
    let session = state
        .room_manager
        .get_session(&room_id)
        .await
        .ok_or("房间不存在")?;

    let doc = session.snapshot().await;
    let edge = Edge {
        id: Edge::id_for(&req.source, &req.target),
        source: req.source,
        target: req.target,
        source_handle: req.source_handle,
        target_handle: req.target_handle,
        kind: Default::default(),
    };

    match GraphOps::add_edge(&doc, edge) {
        Ok(next) => {
            let id = next.edges.last().map(|e| e.id.clone());
            session.commit(CommitRequest::edges_only(next.edges)).await;
            Ok(Json(serde_json::json!({ "added": true, "id": id })))
        }
        Err(rejection) => {
            debug!("房间 {} 拒绝连接: {}", room_id, rejection);
            Ok(Json(serde_json::json!({ "added": false })))
        }
    }
}

/// 删除边
async fn delete_edge(
    State(state): State<RoomApiState>,
    Path((room_id, edge_id)): Path<(RoomId, String)>,
) -> Result<Json<serde_json::Value>, String> {
    let session = state
        .room_manager
        .get_session(&room_id)
        .await
        .ok_or("房间不存在")?;

    let doc = session.snapshot().await;
    let next = GraphOps::remove_edge(&doc, &edge_id);
    session.commit(CommitRequest::edges_only(next.edges)).await;

    Ok(Json(serde_json::json!({"success": true})))
}

/// WebSocket 连接
async fn room_websocket(
    State(state): State<RoomApiState>,
    Path(room_id): Path<RoomId>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_room_ws(socket, state, room_id))
}

/// 处理 WebSocket 连接
async fn handle_room_ws(socket: WebSocket, state: RoomApiState, room_id: RoomId) {
    let (mut tx, mut rx) = socket.split();

    let session = state
        .room_manager
        .get_or_create_session(room_id.clone())
        .await;

    // 连接即身份：uuid 标识该连接的在场状态
    let user_id = uuid::Uuid::new_v4().to_string();
    let user = UserInfo {
        id: user_id.clone(),
        name: format!("User-{}", &user_id[..4]),
        color: state.color_generator.next(),
    };

    let mut event_rx = session.join(user.clone()).await;

    info!("用户 {} 连接到房间 {}", user_id, room_id);

    // 发送初始同步信息
    let sync_msg = sync_response(&session).await;
    if let Ok(msg) = serde_json::to_string(&sync_msg)
        && let Err(e) = tx.send(Message::Text(msg.into())).await
    {
        warn!("发送同步响应失败: {}", e);
    }

    // 处理消息循环
    loop {
        tokio::select! {
            // 接收客户端消息
            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(ws_msg) = serde_json::from_str::<WsMessage>(&text) {
                            if let Some(reply) = handle_ws_message(&session, &user_id, ws_msg).await
                                && let Ok(msg) = serde_json::to_string(&reply)
                                && let Err(e) = tx.send(Message::Text(msg.into())).await
                            {
                                warn!("发送同步响应失败: {}", e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    _ => {}
                }
            }
            // 转发房间事件
            event = event_rx.recv() => {
                if let Ok(event) = event
                    && let Ok(msg) = serde_json::to_string(&RoomEventWrapper { event })
                    && let Err(e) = tx.send(Message::Text(msg.into())).await
                {
                    warn!("转发房间事件失败: {}", e);
                }
            }
        }
    }

    // 离开会话，在场状态随连接丢弃
    session.leave(&user_id).await;
    state.room_manager.cleanup_session(&room_id).await;

    info!("用户 {} 断开房间 {}", user_id, room_id);
}

/// 处理 WebSocket 消息；`SyncRequest` 返回需要回复的消息
async fn handle_ws_message(
    session: &Arc<RoomSession>,
    user_id: &str,
    msg: WsMessage,
) -> Option<WsMessage> {
    match msg {
        WsMessage::CursorMove { cursor } => {
            session.update_cursor(&user_id.to_string(), cursor).await;
            None
        }
        WsMessage::Commit { request } => {
            session.commit(request).await;
            None
        }
        WsMessage::SyncRequest => Some(sync_response(session).await),
        WsMessage::SyncResponse { .. } => None,
    }
}

async fn sync_response(session: &Arc<RoomSession>) -> WsMessage {
    WsMessage::SyncResponse {
        doc: session.snapshot().await,
        revision: session.revision().await,
        users: session.users().await,
        peers: session.peers().await,
    }
}

/// 房间事件包装
#[derive(Debug, Serialize)]
struct RoomEventWrapper {
    event: RoomEvent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradeflow_graph::NodeKind;

    fn state() -> RoomApiState {
        RoomApiState::new(CollabConfig::default())
    }

    fn palette_item() -> PaletteItem {
        PaletteItem {
            kind: NodeKind::AiAgent,
            label: "Agent".to_string(),
            description: String::new(),
            icon: "bot".to_string(),
            id: "agent-abc".to_string(),
            hash: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_room() {
        let state = state();
        let created = create_room(
            State(state.clone()),
            Json(CreateRoomRequest {
                id: Some("room-1".to_string()),
            }),
        )
        .await;
        assert_eq!(created.0.id, "room-1");

        let doc = get_room(State(state), Path("room-1".to_string()))
            .await
            .unwrap();
        assert!(doc.0.doc.nodes.is_empty());
        assert_eq!(doc.0.revision, 0);
    }

    #[tokio::test]
    async fn test_get_missing_room_fails() {
        let result = get_room(State(state()), Path("nope".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_rest_node_and_edge_flow() {
        let state = state();
        create_room(
            State(state.clone()),
            Json(CreateRoomRequest {
                id: Some("r".to_string()),
            }),
        )
        .await;

        // 两个节点
        for _ in 0..2 {
            add_node(
                State(state.clone()),
                Path("r".to_string()),
                Json(AddNodeRequest {
                    item: palette_item(),
                    position: Position::new(10.0, 10.0),
                }),
            )
            .await
            .unwrap();
        }

        // 连接
        let added = add_edge(
            State(state.clone()),
            Path("r".to_string()),
            Json(AddEdgeRequest {
                source: "1".to_string(),
                target: "2".to_string(),
                source_handle: None,
                target_handle: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(added.0["added"], true);

        // 自连被拒绝
        let rejected = add_edge(
            State(state.clone()),
            Path("r".to_string()),
            Json(AddEdgeRequest {
                source: "1".to_string(),
                target: "1".to_string(),
                source_handle: None,
                target_handle: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(rejected.0["added"], false);

        // 级联删除
        delete_node(
            State(state.clone()),
            Path(("r".to_string(), "1".to_string())),
        )
        .await
        .unwrap();

        let session = state.room_manager.get_session(&"r".to_string()).await.unwrap();
        let doc = session.snapshot().await;
        assert_eq!(doc.nodes.len(), 1);
        assert!(doc.edges.is_empty());
        assert!(GraphOps::endpoints_valid(&doc));
    }
}
