//! HTTP API 路由

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::room_api::{RoomApiState, create_room_router};
use crate::workflow_api::{WorkflowApiState, create_workflow_router};

/// 创建完整 API 路由
pub fn create_router(rooms: RoomApiState, workflows: WorkflowApiState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // 协作房间 API
        .merge(create_room_router(rooms))
        // 工作流执行 API
        .merge(create_workflow_router(workflows))
}

/// 健康检查
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}
