//! 工作流状态轮询
//!
//! 工作流标记为运行中时按固定间隔轮询执行服务，终态结束轮询。
//! 取消只是重置本地跟踪状态停止轮询，已派发给执行服务的工作不会被撤回

use crate::client::ExecutionBridge;
use crate::types::StatusReport;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, warn};

/// 轮询过程中产生的更新
#[derive(Debug, Clone)]
pub enum WorkflowUpdate {
    /// 新的状态报告
    Status {
        workflow_id: String,
        report: StatusReport,
    },
    /// 执行服务不可达，稍后继续轮询
    TransportError {
        workflow_id: String,
        message: String,
    },
}

struct RunningWorkflow {
    workflow_id: String,
    handle: JoinHandle<()>,
}

/// 工作流轮询跟踪器
pub struct WorkflowTracker {
    bridge: Arc<dyn ExecutionBridge>,
    poll_interval: Duration,
    running: Mutex<Option<RunningWorkflow>>,
    update_sender: broadcast::Sender<WorkflowUpdate>,
}

impl WorkflowTracker {
    pub fn new(bridge: Arc<dyn ExecutionBridge>, poll_interval: Duration) -> Arc<Self> {
        let (update_sender, _) = broadcast::channel(64);
        Arc::new(Self {
            bridge,
            poll_interval,
            running: Mutex::new(None),
            update_sender,
        })
    }

    /// 订阅状态更新
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowUpdate> {
        self.update_sender.subscribe()
    }

    /// 当前跟踪的工作流
    pub async fn current(&self) -> Option<String> {
        let running = self.running.lock().await;
        running.as_ref().map(|r| r.workflow_id.clone())
    }

    /// 开始跟踪一个工作流，替换已有跟踪
    pub async fn track(self: &Arc<Self>, workflow_id: String) {
        self.reset().await;

        let tracker = Arc::clone(self);
        let id = workflow_id.clone();
        let handle = tokio::spawn(async move {
            tracker.poll_loop(id).await;
        });

        let mut running = self.running.lock().await;
        *running = Some(RunningWorkflow {
            workflow_id,
            handle,
        });
    }

    /// 重置跟踪状态：停止轮询，不取消已派发的执行
    pub async fn reset(&self) {
        let mut running = self.running.lock().await;
        if let Some(previous) = running.take() {
            previous.handle.abort();
            debug!("停止轮询工作流 {}", previous.workflow_id);
        }
    }

    async fn poll_loop(self: Arc<Self>, workflow_id: String) {
        let mut interval = tokio::time::interval(self.poll_interval);
        // 第一次 tick 立即返回，先等一个完整间隔再查
        interval.tick().await;

        loop {
            interval.tick().await;

            match self.bridge.workflow_status(&workflow_id).await {
                Ok(report) => {
                    let terminal = report.status.is_terminal();
                    if let Some(error) = &report.error {
                        warn!("工作流 {} 报告错误: {}", workflow_id, error);
                    }
                    let _ = self.update_sender.send(WorkflowUpdate::Status {
                        workflow_id: workflow_id.clone(),
                        report,
                    });

                    if terminal {
                        break;
                    }
                }
                Err(e) => {
                    // 读操作失败不终止跟踪，下个间隔继续
                    warn!("轮询工作流 {} 失败: {}", workflow_id, e);
                    let _ = self.update_sender.send(WorkflowUpdate::TransportError {
                        workflow_id: workflow_id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        // 终态清理运行中标记，UI 不会卡在运行状态
        let mut running = self.running.lock().await;
        if running
            .as_ref()
            .is_some_and(|r| r.workflow_id == workflow_id)
        {
            *running = None;
        }
    }
}
