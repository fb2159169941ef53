//! 事件驱动的冲突监听器
//!
//! 消费事件总线上的领域事件，按事件涉及的任务/志愿者做定向冲突扫描，
//! 避免每次状态变更都全量扫描。

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use volunteer_core::EngineResult;
use volunteer_domain::events::{DomainEvent, EngineEvent};

use crate::conflict::ConflictDetector;

/// 状态变更监听器，驱动定向冲突扫描
pub struct ConflictStateListener {
    detector: Arc<ConflictDetector>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    listener_handle: Option<tokio::task::JoinHandle<()>>,
}

impl ConflictStateListener {
    pub fn new(detector: Arc<ConflictDetector>) -> Self {
        Self {
            detector,
            shutdown_tx: None,
            listener_handle: None,
        }
    }

    /// 启动监听器，接管事件通道的消费端
    pub fn start(&mut self, mut receiver: mpsc::UnboundedReceiver<EngineEvent>) {
        info!("启动冲突监听器");

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let detector = self.detector.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = receiver.recv() => {
                        match event {
                            Some(event) => {
                                if let Err(e) = Self::handle_event(&detector, &event).await {
                                    // 单个事件处理失败不中断监听循环
                                    error!(
                                        "处理事件 {} ({}) 失败: {}",
                                        event.event_type(),
                                        event.aggregate_id(),
                                        e
                                    );
                                }
                            }
                            None => {
                                warn!("事件通道已关闭，冲突监听器退出");
                                break;
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        info!("冲突监听器收到停机请求");
                        break;
                    }
                }
            }
            info!("冲突监听器已停止");
        });
        self.listener_handle = Some(handle);
    }

    /// 停止监听器并等待后台任务退出
    pub async fn stop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(handle) = self.listener_handle.take() {
            if let Err(e) = handle.await {
                warn!("等待冲突监听器退出时出错: {}", e);
            }
        }
    }

    /// 按事件涉及的聚合做定向扫描
    async fn handle_event(
        detector: &Arc<ConflictDetector>,
        event: &EngineEvent,
    ) -> EngineResult<()> {
        if let Some(task_id) = event.task_id() {
            detector.scan_task(task_id).await?;
        } else if let Some(volunteer_id) = event.volunteer_id() {
            // 目前只有合规变更事件不带任务引用
            detector.scan_volunteer(volunteer_id).await?;
        }
        Ok(())
    }
}
