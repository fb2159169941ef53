//! 周期巡检服务
//!
//! 事件通道可能丢失（进程重启、监听器短暂落后），巡检是兜底：
//! 周期性拉取合规状态并做一次全量冲突扫描。单个志愿者/任务出错
//! 只记日志并继续，绝不让一个坏记录拖垮整轮巡检。

use std::sync::Arc;

use tokio::time::interval;
use tracing::{debug, error, info, warn};

use volunteer_core::{ConflictConfig, EngineResult};
use volunteer_domain::ports::ComplianceProvider;

use crate::conflict::ConflictDetector;
use crate::registry::VolunteerRegistry;

/// 后台巡检服务
pub struct ConflictSweepService {
    registry: Arc<VolunteerRegistry>,
    detector: Arc<ConflictDetector>,
    compliance: Arc<dyn ComplianceProvider>,
    config: ConflictConfig,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    sweep_handle: Option<tokio::task::JoinHandle<()>>,
}

impl ConflictSweepService {
    pub fn new(
        registry: Arc<VolunteerRegistry>,
        detector: Arc<ConflictDetector>,
        compliance: Arc<dyn ComplianceProvider>,
        config: ConflictConfig,
    ) -> Self {
        Self {
            registry,
            detector,
            compliance,
            config,
            shutdown_tx: None,
            sweep_handle: None,
        }
    }

    pub fn start(&mut self) {
        if !self.config.sweep_enabled {
            info!("周期巡检已禁用");
            return;
        }
        info!(
            "启动周期巡检，间隔 {} 秒",
            self.config.sweep_interval_seconds
        );

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let registry = self.registry.clone();
        let detector = self.detector.clone();
        let compliance = self.compliance.clone();
        let period = std::time::Duration::from_secs(self.config.sweep_interval_seconds);

        let handle = tokio::spawn(async move {
            let mut sweep_interval = interval(period);
            // 第一次 tick 立即触发，启动即巡检一轮
            loop {
                tokio::select! {
                    _ = sweep_interval.tick() => {
                        if let Err(e) = Self::sweep(&registry, &detector, &compliance).await {
                            error!("巡检失败: {}", e);
                        }
                    }
                    _ = &mut shutdown_rx => {
                        info!("周期巡检收到停机请求");
                        break;
                    }
                }
            }
            info!("周期巡检已停止");
        });
        self.sweep_handle = Some(handle);
    }

    pub async fn stop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(handle) = self.sweep_handle.take() {
            if let Err(e) = handle.await {
                warn!("等待巡检任务退出时出错: {}", e);
            }
        }
    }

    /// 执行一轮巡检（测试与手动触发入口）
    pub async fn run_once(&self) -> EngineResult<()> {
        Self::sweep(&self.registry, &self.detector, &self.compliance).await
    }

    async fn sweep(
        registry: &Arc<VolunteerRegistry>,
        detector: &Arc<ConflictDetector>,
        compliance: &Arc<dyn ComplianceProvider>,
    ) -> EngineResult<()> {
        debug!("开始一轮巡检");

        // 先刷新合规状态，让随后的冲突扫描基于最新数据。
        // 外部系统没有记录（None）时保留本地状态，不回落默认值。
        let volunteers = registry.list_volunteers().await?;
        for volunteer in volunteers.iter().filter(|v| v.active) {
            match compliance.get_compliance_status(volunteer.id).await {
                Ok(Some(status)) if status != volunteer.compliance_status => {
                    if let Err(e) = registry.set_compliance_status(volunteer.id, status).await {
                        warn!("更新志愿者 {} 合规状态失败: {}", volunteer.id, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("查询志愿者 {} 合规状态失败: {}", volunteer.id, e);
                }
            }
        }

        let detected = detector.scan_all().await?;
        debug!("巡检完成，本轮新增冲突 {} 项", detected.len());
        Ok(())
    }
}
