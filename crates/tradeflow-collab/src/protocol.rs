//! 协作房间的消息协议

use crate::presence::{PeerPresence, UserInfo};
use serde::{Deserialize, Serialize};
use tradeflow_graph::{CommitRequest, CursorState, GraphDoc, RoomId, UserId};

/// 房间内广播的协作事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RoomEvent {
    /// 用户加入房间
    UserJoined { room_id: RoomId, user: UserInfo },
    /// 用户离开房间
    UserLeft { room_id: RoomId, user_id: UserId },
    /// 光标移动（`None` 表示指针离开画布）
    CursorMoved {
        room_id: RoomId,
        user_id: UserId,
        cursor: Option<CursorState>,
    },
    /// 图文档整体变更，携带变更后的权威文档
    GraphChanged {
        room_id: RoomId,
        revision: u64,
        doc: GraphDoc,
    },
}

/// WebSocket 消息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    /// 光标移动
    CursorMove { cursor: Option<CursorState> },
    /// 提交一次图变更
    Commit {
        #[serde(flatten)]
        request: CommitRequest,
    },
    /// 同步请求
    SyncRequest,
    /// 同步响应
    SyncResponse {
        doc: GraphDoc,
        revision: u64,
        users: Vec<UserInfo>,
        peers: Vec<PeerPresence>,
    },
}
