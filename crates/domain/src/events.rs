//! 领域事件
//!
//! 分配/任务的每次状态变更都会发布事件，冲突检测器通过事件通道被驱动，
//! 避免轮询。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{AssignmentStatus, ComplianceStatus, TaskStatus};

/// 领域事件基础trait
pub trait DomainEvent: Send + Sync {
    fn event_id(&self) -> Uuid;
    fn event_type(&self) -> &str;
    fn occurred_at(&self) -> DateTime<Utc>;
    fn aggregate_id(&self) -> String;
}

/// 引擎内全部领域事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    TaskCreated {
        id: Uuid,
        task_id: i64,
        occurred_at: DateTime<Utc>,
    },
    TaskCancelled {
        id: Uuid,
        task_id: i64,
        occurred_at: DateTime<Utc>,
    },
    TaskStatusChanged {
        id: Uuid,
        task_id: i64,
        from: TaskStatus,
        to: TaskStatus,
        occurred_at: DateTime<Utc>,
    },
    AssignmentCreated {
        id: Uuid,
        assignment_id: i64,
        task_id: i64,
        volunteer_id: i64,
        match_score: i32,
        occurred_at: DateTime<Utc>,
    },
    AssignmentTransitioned {
        id: Uuid,
        assignment_id: i64,
        task_id: i64,
        volunteer_id: i64,
        from: AssignmentStatus,
        to: AssignmentStatus,
        occurred_at: DateTime<Utc>,
    },
    ComplianceChanged {
        id: Uuid,
        volunteer_id: i64,
        from: ComplianceStatus,
        to: ComplianceStatus,
        occurred_at: DateTime<Utc>,
    },
    ProspectConverted {
        id: Uuid,
        prospect_id: i64,
        volunteer_id: i64,
        occurred_at: DateTime<Utc>,
    },
}

impl EngineEvent {
    pub fn task_created(task_id: i64) -> Self {
        EngineEvent::TaskCreated {
            id: Uuid::new_v4(),
            task_id,
            occurred_at: Utc::now(),
        }
    }

    pub fn task_cancelled(task_id: i64) -> Self {
        EngineEvent::TaskCancelled {
            id: Uuid::new_v4(),
            task_id,
            occurred_at: Utc::now(),
        }
    }

    pub fn task_status_changed(task_id: i64, from: TaskStatus, to: TaskStatus) -> Self {
        EngineEvent::TaskStatusChanged {
            id: Uuid::new_v4(),
            task_id,
            from,
            to,
            occurred_at: Utc::now(),
        }
    }

    pub fn assignment_created(
        assignment_id: i64,
        task_id: i64,
        volunteer_id: i64,
        match_score: i32,
    ) -> Self {
        EngineEvent::AssignmentCreated {
            id: Uuid::new_v4(),
            assignment_id,
            task_id,
            volunteer_id,
            match_score,
            occurred_at: Utc::now(),
        }
    }

    pub fn assignment_transitioned(
        assignment_id: i64,
        task_id: i64,
        volunteer_id: i64,
        from: AssignmentStatus,
        to: AssignmentStatus,
    ) -> Self {
        EngineEvent::AssignmentTransitioned {
            id: Uuid::new_v4(),
            assignment_id,
            task_id,
            volunteer_id,
            from,
            to,
            occurred_at: Utc::now(),
        }
    }

    pub fn compliance_changed(
        volunteer_id: i64,
        from: ComplianceStatus,
        to: ComplianceStatus,
    ) -> Self {
        EngineEvent::ComplianceChanged {
            id: Uuid::new_v4(),
            volunteer_id,
            from,
            to,
            occurred_at: Utc::now(),
        }
    }

    pub fn prospect_converted(prospect_id: i64, volunteer_id: i64) -> Self {
        EngineEvent::ProspectConverted {
            id: Uuid::new_v4(),
            prospect_id,
            volunteer_id,
            occurred_at: Utc::now(),
        }
    }

    /// 事件涉及的任务 id（冲突检测器据此定向扫描）
    pub fn task_id(&self) -> Option<i64> {
        match self {
            EngineEvent::TaskCreated { task_id, .. }
            | EngineEvent::TaskCancelled { task_id, .. }
            | EngineEvent::TaskStatusChanged { task_id, .. }
            | EngineEvent::AssignmentCreated { task_id, .. }
            | EngineEvent::AssignmentTransitioned { task_id, .. } => Some(*task_id),
            _ => None,
        }
    }

    /// 事件涉及的志愿者 id
    pub fn volunteer_id(&self) -> Option<i64> {
        match self {
            EngineEvent::AssignmentCreated { volunteer_id, .. }
            | EngineEvent::AssignmentTransitioned { volunteer_id, .. }
            | EngineEvent::ComplianceChanged { volunteer_id, .. } => Some(*volunteer_id),
            _ => None,
        }
    }
}

impl DomainEvent for EngineEvent {
    fn event_id(&self) -> Uuid {
        match self {
            EngineEvent::TaskCreated { id, .. }
            | EngineEvent::TaskCancelled { id, .. }
            | EngineEvent::TaskStatusChanged { id, .. }
            | EngineEvent::AssignmentCreated { id, .. }
            | EngineEvent::AssignmentTransitioned { id, .. }
            | EngineEvent::ComplianceChanged { id, .. }
            | EngineEvent::ProspectConverted { id, .. } => *id,
        }
    }

    fn event_type(&self) -> &str {
        match self {
            EngineEvent::TaskCreated { .. } => "TaskCreated",
            EngineEvent::TaskCancelled { .. } => "TaskCancelled",
            EngineEvent::TaskStatusChanged { .. } => "TaskStatusChanged",
            EngineEvent::AssignmentCreated { .. } => "AssignmentCreated",
            EngineEvent::AssignmentTransitioned { .. } => "AssignmentTransitioned",
            EngineEvent::ComplianceChanged { .. } => "ComplianceChanged",
            EngineEvent::ProspectConverted { .. } => "ProspectConverted",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            EngineEvent::TaskCreated { occurred_at, .. }
            | EngineEvent::TaskCancelled { occurred_at, .. }
            | EngineEvent::TaskStatusChanged { occurred_at, .. }
            | EngineEvent::AssignmentCreated { occurred_at, .. }
            | EngineEvent::AssignmentTransitioned { occurred_at, .. }
            | EngineEvent::ComplianceChanged { occurred_at, .. }
            | EngineEvent::ProspectConverted { occurred_at, .. } => *occurred_at,
        }
    }

    fn aggregate_id(&self) -> String {
        match self {
            EngineEvent::TaskCreated { task_id, .. }
            | EngineEvent::TaskCancelled { task_id, .. }
            | EngineEvent::TaskStatusChanged { task_id, .. } => format!("task:{task_id}"),
            EngineEvent::AssignmentCreated { assignment_id, .. }
            | EngineEvent::AssignmentTransitioned { assignment_id, .. } => {
                format!("assignment:{assignment_id}")
            }
            EngineEvent::ComplianceChanged { volunteer_id, .. } => {
                format!("volunteer:{volunteer_id}")
            }
            EngineEvent::ProspectConverted { prospect_id, .. } => {
                format!("prospect:{prospect_id}")
            }
        }
    }
}
