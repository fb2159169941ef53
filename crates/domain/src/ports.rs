//! 外部协作方端口
//!
//! 通知发送与合规文档系统均为外部协作方：通知相对状态机是发后即忘，
//! 发送失败不回滚任何状态转换；合规状态由后台巡检周期性拉取。

use async_trait::async_trait;

use crate::entities::ComplianceStatus;
use crate::events::EngineEvent;
use volunteer_core::EngineResult;

/// 通知协作方（提醒、招募邮件等）
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn send_reminder(&self, volunteer_id: i64, task_id: i64) -> EngineResult<()>;
}

/// 合规文档协作方，巡检时查询志愿者当前合规状态
///
/// 外部系统没有该志愿者的记录时返回 None，调用方保留本地状态不变；
/// 默认回落到 Pending 会把已标记 Expired/Flagged 的志愿者重新解禁。
#[async_trait]
pub trait ComplianceProvider: Send + Sync {
    async fn get_compliance_status(
        &self,
        volunteer_id: i64,
    ) -> EngineResult<Option<ComplianceStatus>>;
}

/// 领域事件发布端口
///
/// 实现必须是非阻塞的；通道关闭时允许丢弃事件并记录日志。
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: EngineEvent);
}
