//! 工作流执行 API 路由
//!
//! 调色板与工作流提交都转发给外部执行服务，本服务只保存轮询状态

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use tradeflow_bridge::{ExecutionBridge, RunWorkflowRequest, StatusReport, WorkflowTracker};
use tradeflow_collab::RoomManager;
use tradeflow_graph::{PaletteItem, RoomId, TradingPair};

/// 工作流 API 状态
#[derive(Clone)]
pub struct WorkflowApiState {
    pub bridge: Arc<dyn ExecutionBridge>,
    pub tracker: Arc<WorkflowTracker>,
    pub room_manager: Arc<RoomManager>,
}

impl WorkflowApiState {
    pub fn new(
        bridge: Arc<dyn ExecutionBridge>,
        tracker: Arc<WorkflowTracker>,
        room_manager: Arc<RoomManager>,
    ) -> Self {
        Self {
            bridge,
            tracker,
            room_manager,
        }
    }
}

/// 创建工作流 API 路由
pub fn create_workflow_router(state: WorkflowApiState) -> Router {
    Router::new()
        .route("/agents", get(list_agents))
        .route("/workflows", post(run_workflow))
        .route("/workflows/current", delete(reset_tracking))
        .route("/workflows/{id}", get(workflow_status))
        .with_state(state)
}

/// 拉取 agent 调色板
async fn list_agents(
    State(state): State<WorkflowApiState>,
) -> Result<Json<Vec<PaletteItem>>, String> {
    state
        .bridge
        .fetch_agents()
        .await
        .map(Json)
        .map_err(|e| e.to_string())
}

/// 提交工作流请求
#[derive(Debug, Deserialize)]
pub struct SubmitWorkflowRequest {
    pub room_id: RoomId,
    pub symbol: Option<TradingPair>,
}

/// 提交工作流响应
#[derive(Debug, Serialize)]
pub struct SubmitWorkflowResponse {
    pub workflow_id: String,
}

/// 把房间当前图提交给执行服务并开始轮询
async fn run_workflow(
    State(state): State<WorkflowApiState>,
    Json(req): Json<SubmitWorkflowRequest>,
) -> Result<Json<SubmitWorkflowResponse>, String> {
    let session = state
        .room_manager
        .get_session(&req.room_id)
        .await
        .ok_or("房间不存在")?;

    let doc = session.snapshot().await;
    let payload = RunWorkflowRequest::from_doc(&doc, req.symbol);

    let workflow_id = state
        .bridge
        .run_workflow(payload)
        .await
        .map_err(|e| e.to_string())?;

    info!("房间 {} 提交工作流 {}", req.room_id, workflow_id);
    state.tracker.track(workflow_id.clone()).await;

    Ok(Json(SubmitWorkflowResponse { workflow_id }))
}

/// 查询工作流状态
async fn workflow_status(
    State(state): State<WorkflowApiState>,
    Path(id): Path<String>,
) -> Result<Json<StatusReport>, String> {
    state
        .bridge
        .workflow_status(&id)
        .await
        .map(Json)
        .map_err(|e| e.to_string())
}

/// 重置跟踪状态：停止轮询，不撤回已派发的执行
async fn reset_tracking(State(state): State<WorkflowApiState>) -> Json<serde_json::Value> {
    state.tracker.reset().await;
    Json(serde_json::json!({"success": true}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tradeflow_core::{CollabConfig, Result, TradeflowError};
    use tradeflow_graph::NodeKind;

    struct StubBridge;

    #[async_trait]
    impl ExecutionBridge for StubBridge {
        async fn fetch_agents(&self) -> Result<Vec<PaletteItem>> {
            Ok(vec![PaletteItem {
                kind: NodeKind::AiAgent,
                label: "Agent".to_string(),
                description: String::new(),
                icon: "bot".to_string(),
                id: "agent-abc".to_string(),
                hash: None,
            }])
        }

        async fn run_workflow(&self, _request: RunWorkflowRequest) -> Result<String> {
            Ok("wf-42".to_string())
        }

        async fn workflow_status(&self, workflow_id: &str) -> Result<StatusReport> {
            if workflow_id == "wf-42" {
                Ok(serde_json::from_str(r#"{"status":"in_progress"}"#).unwrap())
            } else {
                Err(TradeflowError::Transport("未知工作流".to_string()))
            }
        }
    }

    fn state() -> WorkflowApiState {
        let bridge: Arc<dyn ExecutionBridge> = Arc::new(StubBridge);
        let tracker = WorkflowTracker::new(bridge.clone(), std::time::Duration::from_secs(4));
        WorkflowApiState::new(
            bridge,
            tracker,
            Arc::new(RoomManager::new(CollabConfig::default())),
        )
    }

    #[tokio::test]
    async fn test_list_agents_proxies_bridge() {
        let agents = list_agents(State(state())).await.unwrap();
        assert_eq!(agents.0.len(), 1);
        assert_eq!(agents.0[0].label, "Agent");
    }

    #[tokio::test]
    async fn test_run_workflow_tracks_id() {
        let state = state();
        state
            .room_manager
            .get_or_create_session("r".to_string())
            .await;

        let response = run_workflow(
            State(state.clone()),
            Json(SubmitWorkflowRequest {
                room_id: "r".to_string(),
                symbol: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.0.workflow_id, "wf-42");
        assert_eq!(state.tracker.current().await.as_deref(), Some("wf-42"));

        reset_tracking(State(state.clone())).await;
        assert!(state.tracker.current().await.is_none());
    }

    #[tokio::test]
    async fn test_run_workflow_missing_room_fails() {
        let result = run_workflow(
            State(state()),
            Json(SubmitWorkflowRequest {
                room_id: "nope".to_string(),
                symbol: None,
            }),
        )
        .await;
        assert!(result.is_err());
    }
}
