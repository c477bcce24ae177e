//! 配置管理
//!
//! 配置文件为 JSON 格式，默认路径 ~/.tradeflow/config.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// 主配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// 服务配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 执行桥配置
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// 协作配置
    #[serde(default)]
    pub collab: CollabConfig,
}

/// 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 18790,
            log_level: "info".to_string(),
        }
    }
}

/// 执行桥配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// 工作流执行服务地址
    pub base_url: String,
    /// 状态轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// 请求超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            poll_interval_secs: 4,
            request_timeout_secs: 30,
        }
    }
}

/// 协作配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollabConfig {
    /// 光标活跃窗口（毫秒），超过则不再渲染
    pub cursor_ttl_ms: i64,
    /// 光标发布节流窗口（毫秒）
    pub cursor_throttle_ms: i64,
    /// 房间事件广播缓冲区大小
    pub event_buffer: usize,
}

impl Default for CollabConfig {
    fn default() -> Self {
        Self {
            cursor_ttl_ms: 2000,
            cursor_throttle_ms: 40,
            event_buffer: 1024,
        }
    }
}

impl Config {
    pub fn load(path: &PathBuf) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| crate::TradeflowError::Config(format!("读取配置失败: {}", e)))?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| crate::TradeflowError::Config(format!("解析配置失败: {}", e)))?;

        Ok(config)
    }

    pub fn save(&self, path: &PathBuf) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| crate::TradeflowError::Config(format!("创建目录失败: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| crate::TradeflowError::Config(format!("序列化配置失败: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| crate::TradeflowError::Config(format!("写入配置失败: {}", e)))?;

        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tradeflow")
            .join("config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 18790);
        assert_eq!(config.bridge.poll_interval_secs, 4);
        assert_eq!(config.collab.cursor_ttl_ms, 2000);
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let path = PathBuf::from("/nonexistent/tradeflow-config.json");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.server.port = 9000;
        config.bridge.base_url = "http://bridge.local".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.server.port, 9000);
        assert_eq!(loaded.bridge.base_url, "http://bridge.local");
    }
}
