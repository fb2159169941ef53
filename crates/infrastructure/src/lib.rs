//! 基础设施层：内存仓储、按 id 加锁、事件总线与外部协作方适配器

pub mod collaborators;
pub mod event_bus;
pub mod locks;
pub mod memory;

pub use collaborators::{LoggingNotifier, StaticComplianceProvider};
pub use event_bus::{EventBus, MpscEventPublisher};
pub use locks::{KeyedLockManager, LockKind};
pub use memory::{
    InMemoryAssignmentRepository, InMemoryConflictRepository, InMemoryProspectRepository,
    InMemoryTaskRepository, InMemoryVolunteerRepository,
};
