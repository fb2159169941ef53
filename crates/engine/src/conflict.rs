//! 冲突检测与裁决
//!
//! 检测三类冲突：志愿者重复排班、任务人员不足、任务人员过剩。
//! 检测由状态变更事件驱动（见 `listener`），另有周期巡检兜底（见
//! `sweep`）。同一组任务/志愿者的同类未解决冲突只记录一次。
//!
//! 裁决绝不静默：每次都返回结构化的 `ResolutionOutcome`（保留/顶替/
//! 新建了哪些分配）供审计。

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use volunteer_core::{ConflictConfig, EngineError, EngineResult, MatcherConfig};
use volunteer_domain::entities::{
    Assignment, AssignmentStatus, Conflict, ConflictKind, ConflictSeverity, Task, TaskStatus,
};
use volunteer_domain::repositories::{
    AssignmentRepository, ConflictRepository, TaskRepository, VolunteerRepository,
};

use crate::assignment::{exclude_volunteers, occupying_volunteer_ids, AssignmentManager};
use crate::matcher;

/// 一次裁决的结构化结果
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionOutcome {
    pub conflict_id: i64,
    pub kind: ConflictKind,
    pub resolved: bool,
    /// 裁决中保留的分配
    pub kept_assignment_ids: Vec<i64>,
    /// 被顶替（转为 Declined）的分配
    pub displaced_assignment_ids: Vec<i64>,
    /// 新建的 Pending 分配
    pub created_assignment_ids: Vec<i64>,
    pub note: String,
}

pub struct ConflictDetector {
    task_repo: Arc<dyn TaskRepository>,
    volunteer_repo: Arc<dyn VolunteerRepository>,
    assignment_repo: Arc<dyn AssignmentRepository>,
    conflict_repo: Arc<dyn ConflictRepository>,
    assignments: Arc<AssignmentManager>,
    matcher_config: MatcherConfig,
    config: ConflictConfig,
}

impl ConflictDetector {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        volunteer_repo: Arc<dyn VolunteerRepository>,
        assignment_repo: Arc<dyn AssignmentRepository>,
        conflict_repo: Arc<dyn ConflictRepository>,
        assignments: Arc<AssignmentManager>,
        matcher_config: MatcherConfig,
        config: ConflictConfig,
    ) -> Self {
        Self {
            task_repo,
            volunteer_repo,
            assignment_repo,
            conflict_repo,
            assignments,
            matcher_config,
            config,
        }
    }

    pub async fn list_conflicts(&self, resolved: Option<bool>) -> EngineResult<Vec<Conflict>> {
        self.conflict_repo.list(resolved).await
    }

    /// 扫描单个任务：人员不足/过剩 + 其已确认志愿者的重复排班
    pub async fn scan_task(&self, task_id: i64) -> EngineResult<Vec<Conflict>> {
        let Some(task) = self.task_repo.get_by_id(task_id).await? else {
            // 事件可能晚于任务删除/取消到达，不视为错误
            return Ok(Vec::new());
        };
        if task.status == TaskStatus::Cancelled {
            return Ok(Vec::new());
        }

        let assignments = self.assignment_repo.list_by_task(task_id).await?;
        let confirmed: Vec<&Assignment> = assignments
            .iter()
            .filter(|a| a.status == AssignmentStatus::Confirmed)
            .collect();

        let mut detected = Vec::new();
        if let Some(conflict) = self.detect_understaffed(&task, confirmed.len() as i64).await? {
            detected.push(conflict);
        }
        if let Some(conflict) = self.detect_overstaffed(&task, confirmed.len() as i64).await? {
            detected.push(conflict);
        }
        for assignment in &confirmed {
            detected.extend(self.detect_double_booked(&task, assignment).await?);
        }
        Ok(detected)
    }

    /// 扫描单个志愿者的重复排班
    pub async fn scan_volunteer(&self, volunteer_id: i64) -> EngineResult<Vec<Conflict>> {
        let assignments = self.assignment_repo.list_by_volunteer(volunteer_id).await?;
        let mut detected = Vec::new();
        for assignment in assignments
            .iter()
            .filter(|a| a.status == AssignmentStatus::Confirmed)
        {
            if let Some(task) = self.task_repo.get_by_id(assignment.task_id).await? {
                if task.status != TaskStatus::Cancelled {
                    detected.extend(self.detect_double_booked(&task, assignment).await?);
                }
            }
        }
        Ok(detected)
    }

    /// 全量扫描，逐任务隔离错误：单个任务失败只记日志，不中断整次扫描
    pub async fn scan_all(&self) -> EngineResult<Vec<Conflict>> {
        let now = Utc::now();
        let tasks = self.task_repo.list(None).await?;
        let mut detected = Vec::new();
        for task in tasks {
            if task.status == TaskStatus::Cancelled || task.window.end() < now {
                continue;
            }
            match self.scan_task(task.id).await {
                Ok(conflicts) => detected.extend(conflicts),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("扫描任务 {} 冲突时出错，跳过: {}", task.id, e);
                }
            }
        }
        if !detected.is_empty() {
            info!("冲突扫描新发现 {} 项冲突", detected.len());
        }
        Ok(detected)
    }

    async fn detect_understaffed(
        &self,
        task: &Task,
        confirmed: i64,
    ) -> EngineResult<Option<Conflict>> {
        let now = Utc::now();
        let lead = Duration::hours(self.config.understaffed_lead_hours);
        let needed = task.volunteers_needed as i64;
        if confirmed >= needed || !task.window.starts_within(now, lead) {
            return Ok(None);
        }
        let gap = needed - confirmed;
        // 离开始越近、缺口越大越严重
        let severity = if task.window.starts_within(now, Duration::hours(24)) || gap * 2 >= needed
        {
            ConflictSeverity::High
        } else {
            ConflictSeverity::Medium
        };
        self.record(
            ConflictKind::TaskUnderstaffed,
            severity,
            vec![task.id],
            Vec::new(),
            Vec::new(),
        )
        .await
    }

    async fn detect_overstaffed(
        &self,
        task: &Task,
        confirmed: i64,
    ) -> EngineResult<Option<Conflict>> {
        if confirmed <= task.volunteers_needed as i64 {
            return Ok(None);
        }
        self.record(
            ConflictKind::TaskOverstaffed,
            ConflictSeverity::Low,
            vec![task.id],
            Vec::new(),
            Vec::new(),
        )
        .await
    }

    /// 同一志愿者两条已确认分配的时间窗重叠
    async fn detect_double_booked(
        &self,
        task: &Task,
        assignment: &Assignment,
    ) -> EngineResult<Vec<Conflict>> {
        let mut detected = Vec::new();
        let others = self
            .assignment_repo
            .list_by_volunteer(assignment.volunteer_id)
            .await?;
        for other in others
            .iter()
            .filter(|a| a.status == AssignmentStatus::Confirmed && a.task_id != task.id)
        {
            let Some(other_task) = self.task_repo.get_by_id(other.task_id).await? else {
                continue;
            };
            if other_task.status == TaskStatus::Cancelled
                || !task.window.overlaps(&other_task.window)
            {
                continue;
            }
            let mut task_ids = vec![task.id, other_task.id];
            task_ids.sort_unstable();
            let mut assignment_ids = vec![assignment.id, other.id];
            assignment_ids.sort_unstable();
            if let Some(conflict) = self
                .record(
                    ConflictKind::VolunteerDoubleBooked,
                    ConflictSeverity::High,
                    task_ids,
                    vec![assignment.volunteer_id],
                    assignment_ids,
                )
                .await?
            {
                detected.push(conflict);
            }
        }
        Ok(detected)
    }

    /// 记录冲突，对同类同对象的未解决冲突去重
    async fn record(
        &self,
        kind: ConflictKind,
        severity: ConflictSeverity,
        task_ids: Vec<i64>,
        volunteer_ids: Vec<i64>,
        assignment_ids: Vec<i64>,
    ) -> EngineResult<Option<Conflict>> {
        if let Some(existing) = self
            .conflict_repo
            .find_open_matching(kind, &task_ids, &volunteer_ids)
            .await?
        {
            debug!(
                "同类冲突已存在（id={}），跳过重复记录",
                existing.id
            );
            return Ok(None);
        }
        let conflict = Conflict {
            id: 0,
            kind,
            severity,
            task_ids,
            volunteer_ids,
            assignment_ids,
            resolved: false,
            resolution_note: None,
            detected_at: Utc::now(),
        };
        let created = self.conflict_repo.create(&conflict).await?;
        info!(
            "检测到冲突: id={} 类型={} 严重度={:?} 任务={:?}",
            created.id,
            created.kind.as_str(),
            created.severity,
            created.task_ids
        );
        Ok(Some(created))
    }

    /// 裁决冲突
    pub async fn resolve(&self, conflict_id: i64) -> EngineResult<ResolutionOutcome> {
        let conflict = self
            .conflict_repo
            .get_by_id(conflict_id)
            .await?
            .ok_or(EngineError::conflict_not_found(conflict_id))?;
        if conflict.resolved {
            return Err(EngineError::invalid_transition("RESOLVED", "RESOLVE"));
        }

        let outcome = match conflict.kind {
            ConflictKind::TaskUnderstaffed => self.resolve_understaffed(&conflict).await?,
            ConflictKind::VolunteerDoubleBooked => self.resolve_double_booked(&conflict).await?,
            ConflictKind::TaskOverstaffed => self.resolve_overstaffed(&conflict).await?,
        };

        if outcome.resolved {
            let mut updated = conflict;
            updated.resolved = true;
            updated.resolution_note = Some(outcome.note.clone());
            self.conflict_repo.update(&updated).await?;
        }
        info!(
            "冲突 {} 裁决完成: resolved={} 保留={:?} 顶替={:?} 新建={:?} ({})",
            conflict_id,
            outcome.resolved,
            outcome.kept_assignment_ids,
            outcome.displaced_assignment_ids,
            outcome.created_assignment_ids,
            outcome.note
        );
        Ok(outcome)
    }

    /// 人员不足：排除已占名额的志愿者后重新匹配，为缺口创建 Pending 分配
    async fn resolve_understaffed(&self, conflict: &Conflict) -> EngineResult<ResolutionOutcome> {
        let task_id = *conflict
            .task_ids
            .first()
            .ok_or_else(|| EngineError::internal("人员不足冲突缺少任务引用"))?;
        let Some(task) = self.task_repo.get_by_id(task_id).await? else {
            return Ok(self.outcome(conflict, true, "任务已不存在，冲突自动关闭"));
        };
        if task.status == TaskStatus::Cancelled {
            return Ok(self.outcome(conflict, true, "任务已取消，冲突自动关闭"));
        }

        let assignments = self.assignment_repo.list_by_task(task_id).await?;
        let confirmed = assignments
            .iter()
            .filter(|a| a.status == AssignmentStatus::Confirmed)
            .count() as i64;
        let gap = task.volunteers_needed as i64 - confirmed;
        if gap <= 0 {
            return Ok(self.outcome(conflict, true, "人员缺口已补齐，冲突自动关闭"));
        }

        let pool = exclude_volunteers(
            self.volunteer_repo.list_active().await?,
            &occupying_volunteer_ids(&assignments),
        );
        let ranked = matcher::rank_candidates(&task, &pool, &self.matcher_config);
        if ranked.is_empty() {
            // 空候选列表不是错误：需要人工处理或招募升级
            return Ok(self.outcome(
                conflict,
                false,
                "无合格候选人，需人工安排或招募升级",
            ));
        }

        let mut created = Vec::new();
        for candidate in ranked.iter().take(gap as usize) {
            // 排序与创建之间任务可能被取消，create_assignment 会再次校验
            match self
                .assignments
                .create_assignment(task_id, candidate.volunteer_id)
                .await
            {
                Ok(assignment) => created.push(assignment.id),
                Err(EngineError::InvalidSpec(msg)) => {
                    warn!("补员中断（任务状态变化）: {}", msg);
                    break;
                }
                Err(EngineError::CapacityExceeded { .. }) => break,
                Err(e) => {
                    warn!(
                        "为任务 {} 补员志愿者 {} 失败: {}",
                        task_id, candidate.volunteer_id, e
                    );
                }
            }
        }
        let resolved = !created.is_empty();
        let note = if resolved {
            format!("重新匹配补员 {} 人（待确认）", created.len())
        } else {
            "补员未成功，需人工安排".to_string()
        };
        Ok(ResolutionOutcome {
            conflict_id: conflict.id,
            kind: conflict.kind,
            resolved,
            kept_assignment_ids: Vec::new(),
            displaced_assignment_ids: Vec::new(),
            created_assignment_ids: created,
            note,
        })
    }

    /// 重复排班：高优先级任务保留，其次比较匹配分；被顶替的任务走重新匹配
    async fn resolve_double_booked(&self, conflict: &Conflict) -> EngineResult<ResolutionOutcome> {
        if conflict.assignment_ids.len() != 2 {
            return Err(EngineError::internal("重复排班冲突必须引用两条分配"));
        }
        let first = self.assignment_repo.get_by_id(conflict.assignment_ids[0]).await?;
        let second = self.assignment_repo.get_by_id(conflict.assignment_ids[1]).await?;
        let (Some(first), Some(second)) = (first, second) else {
            return Ok(self.outcome(conflict, true, "分配已不存在，冲突自动关闭"));
        };
        if first.status != AssignmentStatus::Confirmed
            || second.status != AssignmentStatus::Confirmed
        {
            return Ok(self.outcome(conflict, true, "冲突分配已不再同时确认，自动关闭"));
        }

        let first_task = self
            .task_repo
            .get_by_id(first.task_id)
            .await?
            .ok_or(EngineError::task_not_found(first.task_id))?;
        let second_task = self
            .task_repo
            .get_by_id(second.task_id)
            .await?
            .ok_or(EngineError::task_not_found(second.task_id))?;

        // 裁决顺序：任务优先级 > 匹配分 > 任务 id（保证确定性）
        let keep_first = (first_task.priority, first.match_score, std::cmp::Reverse(first.task_id))
            > (
                second_task.priority,
                second.match_score,
                std::cmp::Reverse(second.task_id),
            );
        let (kept, displaced, displaced_task) = if keep_first {
            (first, second, second_task)
        } else {
            (second, first, first_task)
        };

        self.assignments
            .transition_assignment(
                displaced.id,
                AssignmentStatus::Declined,
                Some("排班冲突裁决：让位于更高优先级分配".to_string()),
            )
            .await?;

        // 为被顶替的任务提议替补，排除当事志愿者
        let assignments = self.assignment_repo.list_by_task(displaced_task.id).await?;
        let mut excluded = occupying_volunteer_ids(&assignments);
        excluded.push(displaced.volunteer_id);
        let pool = exclude_volunteers(self.volunteer_repo.list_active().await?, &excluded);
        let ranked = matcher::rank_candidates(&displaced_task, &pool, &self.matcher_config);

        let mut created = Vec::new();
        if let Some(candidate) = ranked.first() {
            match self
                .assignments
                .create_assignment(displaced_task.id, candidate.volunteer_id)
                .await
            {
                Ok(assignment) => created.push(assignment.id),
                Err(e) => warn!(
                    "为被顶替任务 {} 创建替补分配失败: {}",
                    displaced_task.id, e
                ),
            }
        }

        let note = if created.is_empty() {
            format!(
                "保留分配 {}，顶替分配 {}；无替补候选，需人工跟进",
                kept.id, displaced.id
            )
        } else {
            format!(
                "保留分配 {}，顶替分配 {}，已创建替补分配",
                kept.id, displaced.id
            )
        };
        Ok(ResolutionOutcome {
            conflict_id: conflict.id,
            kind: conflict.kind,
            resolved: true,
            kept_assignment_ids: vec![kept.id],
            displaced_assignment_ids: vec![displaced.id],
            created_assignment_ids: created,
            note,
        })
    }

    /// 人员过剩：按匹配分从低到高释放超额的已确认分配
    async fn resolve_overstaffed(&self, conflict: &Conflict) -> EngineResult<ResolutionOutcome> {
        let task_id = *conflict
            .task_ids
            .first()
            .ok_or_else(|| EngineError::internal("人员过剩冲突缺少任务引用"))?;
        let Some(task) = self.task_repo.get_by_id(task_id).await? else {
            return Ok(self.outcome(conflict, true, "任务已不存在，冲突自动关闭"));
        };
        let assignments = self.assignment_repo.list_by_task(task_id).await?;
        let mut confirmed: Vec<&Assignment> = assignments
            .iter()
            .filter(|a| a.status == AssignmentStatus::Confirmed)
            .collect();
        let surplus = confirmed.len() as i64 - task.volunteers_needed as i64;
        if surplus <= 0 {
            return Ok(self.outcome(conflict, true, "人员已不超编，冲突自动关闭"));
        }
        // 低分优先释放，同分释放 id 较大者
        confirmed.sort_by(|a, b| {
            a.match_score
                .cmp(&b.match_score)
                .then_with(|| b.id.cmp(&a.id))
        });

        let mut displaced = Vec::new();
        for assignment in confirmed.iter().take(surplus as usize) {
            self.assignments
                .transition_assignment(
                    assignment.id,
                    AssignmentStatus::Declined,
                    Some("人员过剩裁决：释放超额名额".to_string()),
                )
                .await?;
            displaced.push(assignment.id);
        }
        Ok(ResolutionOutcome {
            conflict_id: conflict.id,
            kind: conflict.kind,
            resolved: true,
            kept_assignment_ids: Vec::new(),
            displaced_assignment_ids: displaced,
            created_assignment_ids: Vec::new(),
            note: format!("释放 {} 条超额确认分配", surplus),
        })
    }

    fn outcome(&self, conflict: &Conflict, resolved: bool, note: &str) -> ResolutionOutcome {
        ResolutionOutcome {
            conflict_id: conflict.id,
            kind: conflict.kind,
            resolved,
            kept_assignment_ids: Vec::new(),
            displaced_assignment_ids: Vec::new(),
            created_assignment_ids: Vec::new(),
            note: note.to_string(),
        }
    }
}
