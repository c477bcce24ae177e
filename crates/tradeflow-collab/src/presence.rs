//! 在场状态
//!
//! 每个连接的临时状态：光标与身份。由发布连接独占写入，其他端只读；
//! 连接断开时随之丢弃，不作为图的一部分持久化

use serde::{Deserialize, Serialize};
use tradeflow_graph::{CursorState, UserId};

/// 连接身份信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: UserId,
    pub name: String,
    /// 光标渲染颜色（十六进制）
    pub color: String,
}

/// 其他连接的在场视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerPresence {
    pub user: UserInfo,
    pub cursor: Option<CursorState>,
}

impl PeerPresence {
    /// 该光标是否应当被渲染
    ///
    /// 活跃窗口是活跃性启发式，不是断连检测：超窗即隐藏，
    /// 与连接本身是否仍然打开无关
    pub fn cursor_visible(&self, now_ms: i64, ttl_ms: i64) -> bool {
        self.cursor
            .map(|c| c.is_active(now_ms, ttl_ms))
            .unwrap_or(false)
    }
}

/// 过滤出活跃窗口内的在场光标
pub fn active_cursors(peers: &[PeerPresence], now_ms: i64, ttl_ms: i64) -> Vec<&PeerPresence> {
    peers
        .iter()
        .filter(|p| p.cursor_visible(now_ms, ttl_ms))
        .collect()
}

/// 用户颜色生成器，轮转分配
pub struct UserColorGenerator {
    colors: Vec<&'static str>,
    index: std::sync::atomic::AtomicUsize,
}

impl UserColorGenerator {
    pub fn new() -> Self {
        Self {
            colors: vec![
                "#FF6B6B", // Red
                "#4ECDC4", // Teal
                "#FFE66D", // Yellow
                "#AA6FFF", // Purple
                "#6BB9FF", // Blue
                "#FF924C", // Orange
                "#81C784", // Green
                "#FF80AB", // Pink
            ],
            index: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn next(&self) -> String {
        let idx = self.index.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.colors[idx % self.colors.len()].to_string()
    }
}

impl Default for UserColorGenerator {
    fn default() -> Self {
        Self::new()
    }
}
