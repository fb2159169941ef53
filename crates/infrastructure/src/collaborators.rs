//! 外部协作方适配器
//!
//! 通知与合规文档系统都不在本引擎职责内，这里提供进程内适配器：
//! 通知只记日志；合规状态由一个可更新的内存表提供，供巡检轮询。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use volunteer_core::EngineResult;
use volunteer_domain::entities::ComplianceStatus;
use volunteer_domain::ports::{ComplianceProvider, NotificationPort};

/// 日志通知适配器
///
/// 通知投递相对状态机是发后即忘，失败不回滚状态转换。
#[derive(Debug, Default, Clone)]
pub struct LoggingNotifier;

impl LoggingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationPort for LoggingNotifier {
    async fn send_reminder(&self, volunteer_id: i64, task_id: i64) -> EngineResult<()> {
        info!(
            "发送任务提醒: 志愿者 {} <- 任务 {}",
            volunteer_id, task_id
        );
        Ok(())
    }
}

/// 内存合规状态提供方
///
/// 查询不到记录时返回 None，表示外部系统尚无该志愿者的档案。
#[derive(Debug, Default)]
pub struct StaticComplianceProvider {
    statuses: RwLock<HashMap<i64, ComplianceStatus>>,
}

impl StaticComplianceProvider {
    pub fn new() -> Self {
        Self {
            statuses: RwLock::new(HashMap::new()),
        }
    }

    /// 写入某志愿者的合规状态（模拟外部系统的证书变更）
    pub async fn set_status(&self, volunteer_id: i64, status: ComplianceStatus) {
        self.statuses.write().await.insert(volunteer_id, status);
    }
}

#[async_trait]
impl ComplianceProvider for StaticComplianceProvider {
    async fn get_compliance_status(
        &self,
        volunteer_id: i64,
    ) -> EngineResult<Option<ComplianceStatus>> {
        Ok(self.statuses.read().await.get(&volunteer_id).copied())
    }
}
