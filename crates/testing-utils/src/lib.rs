//! 测试工具：实体构建器与内存仓储的统一出口
//!
//! 单元测试与集成测试共享这里的构建器，避免在各测试文件里手写完整实体。

pub mod builders;

pub use builders::{
    saturday_morning, AssignmentBuilder, ProspectBuilder, TaskBuilder, VolunteerBuilder,
};
// 测试里直接复用生产内存仓储作为 mock
pub use volunteer_infrastructure::{
    InMemoryAssignmentRepository, InMemoryConflictRepository, InMemoryProspectRepository,
    InMemoryTaskRepository, InMemoryVolunteerRepository,
};
