use thiserror::Error;

/// 引擎统一错误类型
///
/// 所有错误均可由调用方恢复：操作在变更前完成校验，不存在部分写入。
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("志愿者不存在: id={id}")]
    VolunteerNotFound { id: i64 },
    #[error("任务不存在: id={id}")]
    TaskNotFound { id: i64 },
    #[error("分配记录不存在: id={id}")]
    AssignmentNotFound { id: i64 },
    #[error("冲突记录不存在: id={id}")]
    ConflictNotFound { id: i64 },
    #[error("招募候选人不存在: id={id}")]
    ProspectNotFound { id: i64 },
    #[error("任务定义无效: {0}")]
    InvalidSpec(String),
    #[error("非法状态转换: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("任务 {task_id} 名额已满，无法再创建分配")]
    CapacityExceeded { task_id: i64 },
    #[error("志愿者 {volunteer_id} 合规状态为 {status}，禁止分配")]
    ComplianceBlocked { volunteer_id: i64, status: String },
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("系统内部错误: {0}")]
    Internal(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn volunteer_not_found(id: i64) -> Self {
        Self::VolunteerNotFound { id }
    }
    pub fn task_not_found(id: i64) -> Self {
        Self::TaskNotFound { id }
    }
    pub fn assignment_not_found(id: i64) -> Self {
        Self::AssignmentNotFound { id }
    }
    pub fn conflict_not_found(id: i64) -> Self {
        Self::ConflictNotFound { id }
    }
    pub fn prospect_not_found(id: i64) -> Self {
        Self::ProspectNotFound { id }
    }
    pub fn invalid_spec<S: Into<String>>(msg: S) -> Self {
        Self::InvalidSpec(msg.into())
    }
    pub fn invalid_transition<F: Into<String>, T: Into<String>>(from: F, to: T) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// 是否属于"资源不存在"一类
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::VolunteerNotFound { .. }
                | EngineError::TaskNotFound { .. }
                | EngineError::AssignmentNotFound { .. }
                | EngineError::ConflictNotFound { .. }
                | EngineError::ProspectNotFound { .. }
        )
    }

    /// 后台扫描中遇到此错误时是否应中止整个扫描
    ///
    /// 单个聚合的处理错误只记录日志并继续，配置/内部错误才视为致命。
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::Configuration(_) | EngineError::Internal(_)
        )
    }
}
