//! 协作房间
//!
//! 房间是一次协作会话：一个隔离的共享图文档加一组连接的在场状态。
//! 文档是唯一跨端共享的可变状态，任何端都可以改它的任何部分；
//! 提交在写锁内整体替换集合，并发端不会观察到应用到一半的图

use crate::presence::{PeerPresence, UserInfo};
use crate::protocol::RoomEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};
use tradeflow_core::{CollabConfig, Result};
use tradeflow_graph::{
    CommitRequest, CursorState, GraphDoc, RoomId, SharedGraphStore, UserId,
};

struct RoomState {
    doc: GraphDoc,
    revision: u64,
}

/// 协作房间会话
pub struct RoomSession {
    pub room_id: RoomId,
    state: RwLock<RoomState>,
    users: RwLock<HashMap<UserId, UserInfo>>,
    cursors: RwLock<HashMap<UserId, CursorState>>,
    event_sender: broadcast::Sender<RoomEvent>,
    cursor_ttl_ms: i64,
}

impl RoomSession {
    /// 创建新房间，文档以空图 `{nodes: [], edges: []}` 播种
    pub fn new(room_id: RoomId, config: &CollabConfig) -> Self {
        let (event_sender, _) = broadcast::channel(config.event_buffer);
        Self {
            room_id,
            state: RwLock::new(RoomState {
                doc: GraphDoc::default(),
                revision: 0,
            }),
            users: RwLock::new(HashMap::new()),
            cursors: RwLock::new(HashMap::new()),
            event_sender,
            cursor_ttl_ms: config.cursor_ttl_ms,
        }
    }

    /// 用户加入
    pub async fn join(&self, user: UserInfo) -> broadcast::Receiver<RoomEvent> {
        let user_id = user.id.clone();

        {
            let mut users = self.users.write().await;
            users.insert(user_id.clone(), user.clone());
        }

        let event = RoomEvent::UserJoined {
            room_id: self.room_id.clone(),
            user,
        };
        let _ = self.event_sender.send(event);

        info!("用户 {} 加入房间 {}", user_id, self.room_id);

        self.event_sender.subscribe()
    }

    /// 用户离开，在场状态随连接生命周期丢弃
    pub async fn leave(&self, user_id: &UserId) {
        {
            let mut users = self.users.write().await;
            users.remove(user_id);
        }

        {
            let mut cursors = self.cursors.write().await;
            cursors.remove(user_id);
        }

        let event = RoomEvent::UserLeft {
            room_id: self.room_id.clone(),
            user_id: user_id.clone(),
        };
        let _ = self.event_sender.send(event);

        info!("用户 {} 离开房间 {}", user_id, self.room_id);
    }

    /// 原子提交：在写锁内整体替换指定集合并递增版本号
    ///
    /// 变更后的权威文档随 `GraphChanged` 事件广播给所有连接
    pub async fn commit(&self, request: CommitRequest) -> u64 {
        let (revision, doc) = {
            let mut state = self.state.write().await;
            if let Some(nodes) = request.nodes {
                state.doc.nodes = nodes;
            }
            if let Some(edges) = request.edges {
                state.doc.edges = edges;
            }
            if let Some(next_id) = request.next_node_id {
                state.doc.next_node_id = state.doc.next_node_id.max(next_id);
            }
            state.revision += 1;
            (state.revision, state.doc.clone())
        };

        debug!("房间 {} 提交 revision {}", self.room_id, revision);

        let event = RoomEvent::GraphChanged {
            room_id: self.room_id.clone(),
            revision,
            doc,
        };
        let _ = self.event_sender.send(event);

        revision
    }

    /// 更新某连接的光标；`None` 表示指针离开画布
    pub async fn update_cursor(&self, user_id: &UserId, cursor: Option<CursorState>) {
        {
            let mut cursors = self.cursors.write().await;
            match cursor {
                Some(c) => {
                    cursors.insert(user_id.clone(), c);
                }
                None => {
                    cursors.remove(user_id);
                }
            }
        }

        let event = RoomEvent::CursorMoved {
            room_id: self.room_id.clone(),
            user_id: user_id.clone(),
            cursor,
        };
        let _ = self.event_sender.send(event);
    }

    /// 当前权威文档快照
    pub async fn snapshot(&self) -> GraphDoc {
        let state = self.state.read().await;
        state.doc.clone()
    }

    pub async fn revision(&self) -> u64 {
        let state = self.state.read().await;
        state.revision
    }

    /// 获取所有用户
    pub async fn users(&self) -> Vec<UserInfo> {
        let users = self.users.read().await;
        users.values().cloned().collect()
    }

    /// 所有连接的在场视图
    pub async fn peers(&self) -> Vec<PeerPresence> {
        let users = self.users.read().await;
        let cursors = self.cursors.read().await;
        users
            .values()
            .map(|user| PeerPresence {
                user: user.clone(),
                cursor: cursors.get(&user.id).copied(),
            })
            .collect()
    }

    /// 活跃窗口内应当渲染的在场光标
    pub async fn active_peers(&self, now_ms: i64) -> Vec<PeerPresence> {
        self.peers()
            .await
            .into_iter()
            .filter(|p| p.cursor_visible(now_ms, self.cursor_ttl_ms))
            .collect()
    }

    /// 获取用户数量
    pub async fn user_count(&self) -> usize {
        let users = self.users.read().await;
        users.len()
    }

    /// 以某连接身份获取存储句柄，供交互层注入使用
    pub fn handle_for(self: &Arc<Self>, user_id: UserId) -> RoomHandle {
        RoomHandle {
            session: Arc::clone(self),
            user_id,
        }
    }
}

/// 某个连接对房间的存储视角
///
/// 图的读写对所有端等价；光标发布绑定该连接的身份
pub struct RoomHandle {
    session: Arc<RoomSession>,
    user_id: UserId,
}

#[async_trait::async_trait]
impl SharedGraphStore for RoomHandle {
    async fn read(&self) -> GraphDoc {
        self.session.snapshot().await
    }

    async fn commit(&self, request: CommitRequest) -> Result<()> {
        self.session.commit(request).await;
        Ok(())
    }

    async fn publish_cursor(&self, cursor: Option<CursorState>) -> Result<()> {
        self.session.update_cursor(&self.user_id, cursor).await;
        Ok(())
    }
}

/// 房间管理器
pub struct RoomManager {
    sessions: RwLock<HashMap<RoomId, Arc<RoomSession>>>,
    config: CollabConfig,
}

impl RoomManager {
    pub fn new(config: CollabConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// 获取或创建房间会话
    pub async fn get_or_create_session(&self, room_id: RoomId) -> Arc<RoomSession> {
        let mut sessions = self.sessions.write().await;

        sessions
            .entry(room_id.clone())
            .or_insert_with(|| {
                debug!("创建房间会话: {}", room_id);
                Arc::new(RoomSession::new(room_id, &self.config))
            })
            .clone()
    }

    /// 获取房间会话
    pub async fn get_session(&self, room_id: &RoomId) -> Option<Arc<RoomSession>> {
        let sessions = self.sessions.read().await;
        sessions.get(room_id).cloned()
    }

    /// 清理空房间
    pub async fn cleanup_session(&self, room_id: &RoomId) {
        let mut sessions = self.sessions.write().await;

        if let Some(session) = sessions.get(room_id)
            && session.user_count().await == 0
        {
            sessions.remove(room_id);
            info!("清理房间会话: {}", room_id);
        }
    }

    /// 列出所有活跃房间及其用户数
    pub async fn list_active_sessions(&self) -> Vec<(RoomId, usize)> {
        let sessions = self.sessions.read().await;
        let mut result = Vec::new();

        for (room_id, session) in sessions.iter() {
            result.push((room_id.clone(), session.user_count().await));
        }

        result
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(CollabConfig::default())
    }
}
