//! 执行桥客户端

use crate::types::{RunWorkflowRequest, RunWorkflowResponse, StatusReport};
use async_trait::async_trait;
use std::time::Duration;
use tradeflow_core::{BridgeConfig, Result, TradeflowError};
use tradeflow_graph::PaletteItem;

/// 工作流执行桥
#[async_trait]
pub trait ExecutionBridge: Send + Sync {
    /// 拉取 agent 注册表，作为可拖拽调色板
    async fn fetch_agents(&self) -> Result<Vec<PaletteItem>>;

    /// 提交工作流，返回 workflow_id
    async fn run_workflow(&self, request: RunWorkflowRequest) -> Result<String>;

    /// 查询工作流状态
    async fn workflow_status(&self, workflow_id: &str) -> Result<StatusReport>;
}

/// HTTP 实现
pub struct HttpBridge {
    config: BridgeConfig,
    client: reqwest::Client,
}

impl HttpBridge {
    pub fn new(config: BridgeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TradeflowError::Http(format!("构建 HTTP 客户端失败: {}", e)))?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TradeflowError::Transport(format!(
                "执行服务返回 {}: {}",
                status, error_text
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl ExecutionBridge for HttpBridge {
    async fn fetch_agents(&self) -> Result<Vec<PaletteItem>> {
        let response = self
            .client
            .get(self.url("/agents"))
            .send()
            .await
            .map_err(|e| TradeflowError::Transport(format!("拉取 agent 注册表失败: {}", e)))?;

        Self::check(response)
            .await?
            .json::<Vec<PaletteItem>>()
            .await
            .map_err(|e| TradeflowError::Http(format!("解析 agent 注册表失败: {}", e)))
    }

    async fn run_workflow(&self, request: RunWorkflowRequest) -> Result<String> {
        let response = self
            .client
            .post(self.url("/run-workflow"))
            .json(&request)
            .send()
            .await
            .map_err(|e| TradeflowError::Transport(format!("提交工作流失败: {}", e)))?;

        let parsed: RunWorkflowResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| TradeflowError::Http(format!("解析提交响应失败: {}", e)))?;

        Ok(parsed.workflow_id)
    }

    async fn workflow_status(&self, workflow_id: &str) -> Result<StatusReport> {
        let response = self
            .client
            .get(self.url(&format!("/workflow-status/{}", workflow_id)))
            .send()
            .await
            .map_err(|e| TradeflowError::Transport(format!("查询工作流状态失败: {}", e)))?;

        Self::check(response)
            .await?
            .json::<StatusReport>()
            .await
            .map_err(|e| TradeflowError::Http(format!("解析状态响应失败: {}", e)))
    }
}
