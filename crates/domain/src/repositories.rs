//! 领域仓储抽象
//!
//! 定义数据访问的抽象接口，遵循依赖倒置原则

use async_trait::async_trait;

use crate::entities::{
    Assignment, Conflict, ConflictKind, Prospect, Task, TaskStatus, Volunteer,
};
use volunteer_core::EngineResult;

/// 志愿者仓储抽象
#[async_trait]
pub trait VolunteerRepository: Send + Sync {
    /// 创建志愿者，id 由仓储分配
    async fn create(&self, volunteer: &Volunteer) -> EngineResult<Volunteer>;
    async fn get_by_id(&self, id: i64) -> EngineResult<Option<Volunteer>>;
    async fn update(&self, volunteer: &Volunteer) -> EngineResult<()>;
    async fn list_all(&self) -> EngineResult<Vec<Volunteer>>;
    /// 仅返回 active 的志愿者，作为匹配候选池
    async fn list_active(&self) -> EngineResult<Vec<Volunteer>>;
}

/// 任务仓储抽象
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: &Task) -> EngineResult<Task>;
    async fn get_by_id(&self, id: i64) -> EngineResult<Option<Task>>;
    async fn update(&self, task: &Task) -> EngineResult<()>;
    async fn list(&self, status: Option<TaskStatus>) -> EngineResult<Vec<Task>>;
}

/// 分配仓储抽象
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    async fn create(&self, assignment: &Assignment) -> EngineResult<Assignment>;
    async fn get_by_id(&self, id: i64) -> EngineResult<Option<Assignment>>;
    async fn update(&self, assignment: &Assignment) -> EngineResult<()>;
    async fn list_by_task(&self, task_id: i64) -> EngineResult<Vec<Assignment>>;
    async fn list_by_volunteer(&self, volunteer_id: i64) -> EngineResult<Vec<Assignment>>;
    async fn list_all(&self) -> EngineResult<Vec<Assignment>>;
}

/// 冲突仓储抽象
#[async_trait]
pub trait ConflictRepository: Send + Sync {
    async fn create(&self, conflict: &Conflict) -> EngineResult<Conflict>;
    async fn get_by_id(&self, id: i64) -> EngineResult<Option<Conflict>>;
    async fn update(&self, conflict: &Conflict) -> EngineResult<()>;
    async fn list(&self, resolved: Option<bool>) -> EngineResult<Vec<Conflict>>;
    /// 查找同类且涉及相同任务/志愿者的未解决冲突，用于去重
    async fn find_open_matching(
        &self,
        kind: ConflictKind,
        task_ids: &[i64],
        volunteer_ids: &[i64],
    ) -> EngineResult<Option<Conflict>>;
}

/// 招募候选人仓储抽象
#[async_trait]
pub trait ProspectRepository: Send + Sync {
    async fn create(&self, prospect: &Prospect) -> EngineResult<Prospect>;
    async fn get_by_id(&self, id: i64) -> EngineResult<Option<Prospect>>;
    async fn update(&self, prospect: &Prospect) -> EngineResult<()>;
    async fn list_all(&self) -> EngineResult<Vec<Prospect>>;
}
