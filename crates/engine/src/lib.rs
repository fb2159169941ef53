//! 志愿者任务匹配与排班引擎
//!
//! 组件一览：
//! - `matcher`: 纯函数匹配评分，产出按分数排序的候选列表
//! - `registry`: 志愿者档案（技能、可用性、可靠度、合规状态）
//! - `assignment`: 任务与分配的状态机，聚合的唯一变更入口
//! - `conflict`: 冲突检测与裁决（重复排班/人员不足/人员过剩）
//! - `listener`: 事件驱动的冲突扫描
//! - `sweep`: 周期巡检（时间流逝引发的冲突、合规状态轮询）
//! - `pipeline`: 招募漏斗，Active 阶段转正为志愿者

pub mod assignment;
pub mod conflict;
pub mod listener;
pub mod matcher;
pub mod pipeline;
pub mod registry;
pub mod sweep;

pub use assignment::{AssignmentManager, TaskOverview};
pub use conflict::{ConflictDetector, ResolutionOutcome};
pub use listener::ConflictStateListener;
pub use matcher::{rank_candidates, Candidate};
pub use pipeline::{FunnelStage, RecruitmentPipeline};
pub use registry::VolunteerRegistry;
pub use sweep::ConflictSweepService;
