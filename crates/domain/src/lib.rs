//! 领域层：实体、值对象、领域事件、仓储与外部协作方抽象

pub mod entities;
pub mod events;
pub mod ports;
pub mod repositories;
pub mod value_objects;

pub use entities::{
    Assignment, AssignmentStatus, ComplianceStatus, Conflict, ConflictKind, ConflictSeverity,
    NewProspect, NewTask, PipelineStage, Prospect, Task, TaskPriority, TaskStatus, Volunteer,
    VolunteerProfile,
};
pub use events::{DomainEvent, EngineEvent};
pub use value_objects::{DayPart, TimeWindow};
