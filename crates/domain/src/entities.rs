//! 领域实体
//!
//! 五个聚合：志愿者、任务、分配、冲突、招募候选人。
//! 每个聚合有唯一的所有者服务与明确的变更入口，不存在全局可变数组。

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{DayPart, TimeWindow};

/// 志愿者档案
///
/// 由招募候选人到达 Active 阶段时创建；可靠度仅由分配管理器在任务
/// 完成/缺席时调整；只停用，永不删除。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volunteer {
    pub id: i64,
    pub name: String,
    /// 联系方式，引擎不解析其内容
    pub contact: String,
    pub skills: HashSet<String>,
    /// 日期 -> 时段 -> 是否可用；缺失的键视为不可用
    pub availability: HashMap<NaiveDate, HashMap<DayPart, bool>>,
    /// 可靠度评分，0-100，由历史完成率推导
    pub reliability_score: i32,
    pub compliance_status: ComplianceStatus,
    pub active: bool,
    /// 来源招募候选人 id，仅用于漏斗分析
    pub origin_prospect_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Volunteer {
    pub fn is_available(&self, date: NaiveDate, part: DayPart) -> bool {
        self.availability
            .get(&date)
            .and_then(|parts| parts.get(&part))
            .copied()
            .unwrap_or(false)
    }

    /// 志愿者是否对时间窗触及的全部时段都可用
    pub fn covers_window(&self, window: &TimeWindow) -> bool {
        window
            .day_parts()
            .iter()
            .all(|(date, part)| self.is_available(*date, *part))
    }

    /// 记录某日期某时段的可用性，同键重复写入以最后一次为准
    pub fn set_availability(&mut self, date: NaiveDate, part: DayPart, available: bool) {
        self.availability.entry(date).or_default().insert(part, available);
    }

    /// 调整可靠度并夹取到 [0, 100]
    pub fn apply_reliability_delta(&mut self, delta: i32) {
        self.reliability_score = (self.reliability_score + delta).clamp(0, 100);
    }

    pub fn is_compliance_blocked(&self) -> bool {
        self.compliance_status.is_blocked()
    }
}

/// 合规状态（背景审查/证书有效性）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ComplianceStatus {
    #[serde(rename = "CLEARED")]
    Cleared,
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "EXPIRED")]
    Expired,
    #[serde(rename = "FLAGGED")]
    Flagged,
}

impl ComplianceStatus {
    /// Expired 与 Flagged 禁止参与匹配与分配确认
    pub fn is_blocked(&self) -> bool {
        matches!(self, ComplianceStatus::Expired | ComplianceStatus::Flagged)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Cleared => "CLEARED",
            ComplianceStatus::Pending => "PENDING",
            ComplianceStatus::Expired => "EXPIRED",
            ComplianceStatus::Flagged => "FLAGGED",
        }
    }
}

impl std::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 任务定义
///
/// 由外部排期方创建，创建后由分配管理器独占管理其状态。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub required_skills: HashSet<String>,
    pub window: TimeWindow,
    pub location: String,
    pub priority: TaskPriority,
    pub volunteers_needed: i32,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_terminal(&self) -> bool {
        self.status == TaskStatus::Cancelled
    }

    /// 任务是否仍可接收新分配
    pub fn accepts_assignments(&self) -> bool {
        matches!(
            self.status,
            TaskStatus::Open | TaskStatus::PartiallyFilled | TaskStatus::Filled
        )
    }

    /// 根据已确认人数推导任务状态（Cancelled 除外）
    pub fn derive_status(&self, confirmed_count: i64) -> TaskStatus {
        if self.status == TaskStatus::Cancelled {
            TaskStatus::Cancelled
        } else if confirmed_count >= self.volunteers_needed as i64 {
            TaskStatus::Filled
        } else if confirmed_count > 0 {
            TaskStatus::PartiallyFilled
        } else {
            TaskStatus::Open
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    #[serde(rename = "OPEN")]
    Open,
    #[serde(rename = "PARTIALLY_FILLED")]
    PartiallyFilled,
    #[serde(rename = "FILLED")]
    Filled,
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "OPEN",
            TaskStatus::PartiallyFilled => "PARTIALLY_FILLED",
            TaskStatus::Filled => "FILLED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OPEN" => Some(TaskStatus::Open),
            "PARTIALLY_FILLED" => Some(TaskStatus::PartiallyFilled),
            "FILLED" => Some(TaskStatus::Filled),
            "CANCELLED" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 任务优先级，冲突裁决时高优先级任务保留原分配
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum TaskPriority {
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "HIGH")]
    High,
}

/// 创建任务的输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub required_skills: HashSet<String>,
    pub window: TimeWindow,
    pub location: String,
    pub priority: TaskPriority,
    pub volunteers_needed: i32,
}

/// 注册/更新志愿者档案的输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolunteerProfile {
    pub id: Option<i64>,
    pub name: String,
    pub contact: String,
    pub skills: HashSet<String>,
}

/// 志愿者与任务之间的一次分配
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub task_id: i64,
    pub volunteer_id: i64,
    pub status: AssignmentStatus,
    /// 创建时由匹配器计算，0-100，之后不可变；重匹配会创建新分配
    pub match_score: i32,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    /// Pending/Confirmed 占用任务名额
    pub fn occupies_slot(&self) -> bool {
        matches!(
            self.status,
            AssignmentStatus::Pending | AssignmentStatus::Confirmed
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssignmentStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "CONFIRMED")]
    Confirmed,
    #[serde(rename = "DECLINED")]
    Declined,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "NO_SHOW")]
    NoShow,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "PENDING",
            AssignmentStatus::Confirmed => "CONFIRMED",
            AssignmentStatus::Declined => "DECLINED",
            AssignmentStatus::Completed => "COMPLETED",
            AssignmentStatus::NoShow => "NO_SHOW",
        }
    }

    /// 合法的状态转换边
    ///
    /// Confirmed -> Declined 用于冲突裁决中被顶替的分配。
    pub fn can_transition_to(&self, to: AssignmentStatus) -> bool {
        matches!(
            (self, to),
            (
                AssignmentStatus::Pending,
                AssignmentStatus::Confirmed | AssignmentStatus::Declined
            ) | (
                AssignmentStatus::Confirmed,
                AssignmentStatus::Completed
                    | AssignmentStatus::NoShow
                    | AssignmentStatus::Declined
            )
        )
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 检测到的排班冲突
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub id: i64,
    pub kind: ConflictKind,
    pub severity: ConflictSeverity,
    pub task_ids: Vec<i64>,
    pub volunteer_ids: Vec<i64>,
    pub assignment_ids: Vec<i64>,
    pub resolved: bool,
    pub resolution_note: Option<String>,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConflictKind {
    #[serde(rename = "VOLUNTEER_DOUBLE_BOOKED")]
    VolunteerDoubleBooked,
    #[serde(rename = "TASK_UNDERSTAFFED")]
    TaskUnderstaffed,
    #[serde(rename = "TASK_OVERSTAFFED")]
    TaskOverstaffed,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::VolunteerDoubleBooked => "VOLUNTEER_DOUBLE_BOOKED",
            ConflictKind::TaskUnderstaffed => "TASK_UNDERSTAFFED",
            ConflictKind::TaskOverstaffed => "TASK_OVERSTAFFED",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConflictSeverity {
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "HIGH")]
    High,
}

/// 招募漏斗阶段，顺序固定
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PipelineStage {
    #[serde(rename = "INTERESTED")]
    Interested,
    #[serde(rename = "APPLIED")]
    Applied,
    #[serde(rename = "SCREENED")]
    Screened,
    #[serde(rename = "BACKGROUND_CHECKED")]
    BackgroundChecked,
    #[serde(rename = "ONBOARDED")]
    Onboarded,
    #[serde(rename = "ACTIVE")]
    Active,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 6] = [
        PipelineStage::Interested,
        PipelineStage::Applied,
        PipelineStage::Screened,
        PipelineStage::BackgroundChecked,
        PipelineStage::Onboarded,
        PipelineStage::Active,
    ];

    pub fn order(&self) -> usize {
        match self {
            PipelineStage::Interested => 0,
            PipelineStage::Applied => 1,
            PipelineStage::Screened => 2,
            PipelineStage::BackgroundChecked => 3,
            PipelineStage::Onboarded => 4,
            PipelineStage::Active => 5,
        }
    }

    /// 顺序上的下一个阶段，Active 之后没有阶段
    pub fn next(&self) -> Option<PipelineStage> {
        Self::ALL.get(self.order() + 1).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Interested => "INTERESTED",
            PipelineStage::Applied => "APPLIED",
            PipelineStage::Screened => "SCREENED",
            PipelineStage::BackgroundChecked => "BACKGROUND_CHECKED",
            PipelineStage::Onboarded => "ONBOARDED",
            PipelineStage::Active => "ACTIVE",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 招募候选人
///
/// 到达 Active 阶段后单向转换为志愿者，只保留来源 id 用于漏斗统计。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prospect {
    pub id: i64,
    pub name: String,
    pub contact: String,
    pub skills: HashSet<String>,
    pub stage: PipelineStage,
    /// 每个到达过的阶段的进入时间
    pub stage_entered_at: HashMap<PipelineStage, DateTime<Utc>>,
    pub rejected: bool,
    pub rejected_at_stage: Option<PipelineStage>,
    /// 转换后生成的志愿者 id
    pub volunteer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prospect {
    pub fn has_reached(&self, stage: PipelineStage) -> bool {
        self.stage_entered_at.contains_key(&stage)
    }
}

/// 创建招募候选人的输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProspect {
    pub name: String,
    pub contact: String,
    pub skills: HashSet<String>,
}
