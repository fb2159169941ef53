//! 分配管理器
//!
//! 任务与分配两个状态机的唯一所有者。任务状态：
//! Open -> PartiallyFilled -> Filled，任一非终态可取消；Filled 在任务
//! 开始前可因 Declined/NoShow 回退到 PartiallyFilled，并触发冲突检测器
//! 重新匹配。分配状态：Pending -> Confirmed | Declined；
//! Confirmed -> Completed | NoShow，另有冲突裁决使用的 Confirmed -> Declined。
//!
//! 同一任务上的变更按任务 id 加锁串行，不同任务并行。

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use volunteer_core::{AssignmentConfig, EngineError, EngineResult, MatcherConfig};
use volunteer_domain::entities::{
    Assignment, AssignmentStatus, NewTask, Task, TaskStatus, Volunteer,
};
use volunteer_domain::events::EngineEvent;
use volunteer_domain::ports::{EventPublisher, NotificationPort};
use volunteer_domain::repositories::{
    AssignmentRepository, TaskRepository, VolunteerRepository,
};
use volunteer_domain::value_objects::TimeWindow;
use volunteer_infrastructure::{KeyedLockManager, LockKind};

use crate::matcher::{self, Candidate};

/// 任务及其实时确认人数，供查询接口使用
#[derive(Debug, Clone, Serialize)]
pub struct TaskOverview {
    #[serde(flatten)]
    pub task: Task,
    pub confirmed_count: i64,
}

pub struct AssignmentManager {
    task_repo: Arc<dyn TaskRepository>,
    volunteer_repo: Arc<dyn VolunteerRepository>,
    assignment_repo: Arc<dyn AssignmentRepository>,
    locks: Arc<KeyedLockManager>,
    events: Arc<dyn EventPublisher>,
    notifier: Arc<dyn NotificationPort>,
    matcher_config: MatcherConfig,
    config: AssignmentConfig,
}

impl AssignmentManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        volunteer_repo: Arc<dyn VolunteerRepository>,
        assignment_repo: Arc<dyn AssignmentRepository>,
        locks: Arc<KeyedLockManager>,
        events: Arc<dyn EventPublisher>,
        notifier: Arc<dyn NotificationPort>,
        matcher_config: MatcherConfig,
        config: AssignmentConfig,
    ) -> Self {
        Self {
            task_repo,
            volunteer_repo,
            assignment_repo,
            locks,
            events,
            notifier,
            matcher_config,
            config,
        }
    }

    /// 创建任务，初始状态 Open
    pub async fn create_task(&self, spec: NewTask) -> EngineResult<Task> {
        if spec.volunteers_needed < 1 {
            return Err(EngineError::invalid_spec(format!(
                "任务所需志愿者人数必须至少为1，当前为 {}",
                spec.volunteers_needed
            )));
        }
        // 借助构造函数校验时间窗（结束不得早于开始）
        let window = TimeWindow::new(spec.window.start, spec.window.duration_minutes)?;

        let now = Utc::now();
        let task = Task {
            id: 0,
            title: spec.title,
            required_skills: spec.required_skills,
            window,
            location: spec.location,
            priority: spec.priority,
            volunteers_needed: spec.volunteers_needed,
            status: TaskStatus::Open,
            created_at: now,
            updated_at: now,
        };
        let created = self.task_repo.create(&task).await?;
        info!("创建任务: id={} title={}", created.id, created.title);
        self.events.publish(EngineEvent::task_created(created.id));
        Ok(created)
    }

    /// 取消任务并级联拒绝其全部 Pending/Confirmed 分配
    pub async fn cancel_task(&self, task_id: i64) -> EngineResult<Task> {
        let _guard = self.locks.acquire(LockKind::Task, task_id).await;
        let mut task = self
            .task_repo
            .get_by_id(task_id)
            .await?
            .ok_or(EngineError::task_not_found(task_id))?;
        if task.status == TaskStatus::Cancelled {
            return Err(EngineError::invalid_transition(
                TaskStatus::Cancelled.as_str(),
                TaskStatus::Cancelled.as_str(),
            ));
        }

        let previous = task.status;
        task.status = TaskStatus::Cancelled;
        task.updated_at = Utc::now();
        self.task_repo.update(&task).await?;
        info!("取消任务: id={} (原状态 {})", task_id, previous);

        for mut assignment in self.assignment_repo.list_by_task(task_id).await? {
            if !assignment.occupies_slot() {
                continue;
            }
            let from = assignment.status;
            assignment.status = AssignmentStatus::Declined;
            assignment.note = Some("任务已取消".to_string());
            assignment.updated_at = Utc::now();
            self.assignment_repo.update(&assignment).await?;
            self.events.publish(EngineEvent::assignment_transitioned(
                assignment.id,
                task_id,
                assignment.volunteer_id,
                from,
                AssignmentStatus::Declined,
            ));
        }

        self.events.publish(EngineEvent::task_cancelled(task_id));
        Ok(task)
    }

    /// 创建分配（Pending）
    ///
    /// 校验全部通过后才写入：任务存在且未取消、志愿者存在且在册、
    /// 合规未阻塞、名额未超限。match_score 在此刻计算并固定。
    pub async fn create_assignment(
        &self,
        task_id: i64,
        volunteer_id: i64,
    ) -> EngineResult<Assignment> {
        let _guard = self.locks.acquire(LockKind::Task, task_id).await;
        let task = self
            .task_repo
            .get_by_id(task_id)
            .await?
            .ok_or(EngineError::task_not_found(task_id))?;
        if !task.accepts_assignments() {
            // 裁决流程中任务被并发取消时走到这里，调用方据此放弃
            return Err(EngineError::invalid_spec(format!(
                "任务 {task_id} 已取消，无法创建分配"
            )));
        }

        let volunteer = self
            .volunteer_repo
            .get_by_id(volunteer_id)
            .await?
            .ok_or(EngineError::volunteer_not_found(volunteer_id))?;
        if !volunteer.active {
            return Err(EngineError::invalid_spec(format!(
                "志愿者 {volunteer_id} 已停用"
            )));
        }
        if volunteer.is_compliance_blocked() {
            return Err(EngineError::ComplianceBlocked {
                volunteer_id,
                status: volunteer.compliance_status.to_string(),
            });
        }

        let existing = self.assignment_repo.list_by_task(task_id).await?;
        if existing
            .iter()
            .any(|a| a.volunteer_id == volunteer_id && a.occupies_slot())
        {
            return Err(EngineError::invalid_spec(format!(
                "志愿者 {volunteer_id} 在任务 {task_id} 上已有有效分配"
            )));
        }
        let occupied = existing.iter().filter(|a| a.occupies_slot()).count() as i64;
        let capacity = (task.volunteers_needed + self.config.overbook_allowance) as i64;
        if occupied >= capacity {
            return Err(EngineError::CapacityExceeded { task_id });
        }

        let now = Utc::now();
        let assignment = Assignment {
            id: 0,
            task_id,
            volunteer_id,
            status: AssignmentStatus::Pending,
            match_score: matcher::score(&task, &volunteer, &self.matcher_config),
            note: None,
            created_at: now,
            updated_at: now,
        };
        let created = self.assignment_repo.create(&assignment).await?;
        info!(
            "创建分配: id={} 任务={} 志愿者={} 匹配分={}",
            created.id, task_id, volunteer_id, created.match_score
        );
        self.events.publish(EngineEvent::assignment_created(
            created.id,
            task_id,
            volunteer_id,
            created.match_score,
        ));
        self.send_reminder_fire_and_forget(volunteer_id, task_id);
        Ok(created)
    }

    /// 分配状态转换
    ///
    /// Completed/NoShow 同步结算志愿者可靠度（完成 +bonus，缺席
    /// -penalty，扣分幅度更大）。每次转换后重新推导任务状态。
    pub async fn transition_assignment(
        &self,
        assignment_id: i64,
        to: AssignmentStatus,
        note: Option<String>,
    ) -> EngineResult<Assignment> {
        let probe = self
            .assignment_repo
            .get_by_id(assignment_id)
            .await?
            .ok_or(EngineError::assignment_not_found(assignment_id))?;

        // 锁序固定：先任务后志愿者，避免死锁
        let _task_guard = self.locks.acquire(LockKind::Task, probe.task_id).await;
        let _volunteer_guard = self
            .locks
            .acquire(LockKind::Volunteer, probe.volunteer_id)
            .await;

        // 持锁后重读，避免并发转换的写丢失
        let mut assignment = self
            .assignment_repo
            .get_by_id(assignment_id)
            .await?
            .ok_or(EngineError::assignment_not_found(assignment_id))?;
        let from = assignment.status;
        if !from.can_transition_to(to) {
            return Err(EngineError::invalid_transition(from.as_str(), to.as_str()));
        }

        if to == AssignmentStatus::Confirmed {
            let volunteer = self
                .volunteer_repo
                .get_by_id(assignment.volunteer_id)
                .await?
                .ok_or(EngineError::volunteer_not_found(assignment.volunteer_id))?;
            if volunteer.is_compliance_blocked() {
                return Err(EngineError::ComplianceBlocked {
                    volunteer_id: volunteer.id,
                    status: volunteer.compliance_status.to_string(),
                });
            }
        }

        assignment.status = to;
        if note.is_some() {
            assignment.note = note;
        }
        assignment.updated_at = Utc::now();
        self.assignment_repo.update(&assignment).await?;
        debug!(
            "分配 {} 状态转换: {} -> {}",
            assignment_id, from, to
        );

        match to {
            AssignmentStatus::Completed => {
                self.settle_reliability(assignment.volunteer_id, self.config.completion_bonus)
                    .await?;
            }
            AssignmentStatus::NoShow => {
                self.settle_reliability(assignment.volunteer_id, -self.config.no_show_penalty)
                    .await?;
            }
            _ => {}
        }

        self.events.publish(EngineEvent::assignment_transitioned(
            assignment.id,
            assignment.task_id,
            assignment.volunteer_id,
            from,
            to,
        ));

        self.refresh_task_status(assignment.task_id).await?;
        Ok(assignment)
    }

    /// 对任务的候选池排序（供查询接口与裁决使用）
    pub async fn rank_for_task(&self, task_id: i64) -> EngineResult<Vec<Candidate>> {
        let task = self
            .task_repo
            .get_by_id(task_id)
            .await?
            .ok_or(EngineError::task_not_found(task_id))?;
        let pool = self.volunteer_repo.list_active().await?;
        Ok(matcher::rank_candidates(&task, &pool, &self.matcher_config))
    }

    /// 任务列表及实时确认人数
    pub async fn list_tasks(
        &self,
        status: Option<TaskStatus>,
    ) -> EngineResult<Vec<TaskOverview>> {
        let tasks = self.task_repo.list(status).await?;
        let mut overviews = Vec::with_capacity(tasks.len());
        for task in tasks {
            let confirmed_count = self.confirmed_count(task.id).await?;
            overviews.push(TaskOverview {
                task,
                confirmed_count,
            });
        }
        Ok(overviews)
    }

    pub async fn get_task(&self, task_id: i64) -> EngineResult<Task> {
        self.task_repo
            .get_by_id(task_id)
            .await?
            .ok_or(EngineError::task_not_found(task_id))
    }

    pub async fn get_assignment(&self, assignment_id: i64) -> EngineResult<Assignment> {
        self.assignment_repo
            .get_by_id(assignment_id)
            .await?
            .ok_or(EngineError::assignment_not_found(assignment_id))
    }

    pub async fn confirmed_count(&self, task_id: i64) -> EngineResult<i64> {
        Ok(self
            .assignment_repo
            .list_by_task(task_id)
            .await?
            .iter()
            .filter(|a| a.status == AssignmentStatus::Confirmed)
            .count() as i64)
    }

    /// 根据确认人数重新推导任务状态，发生变化时发布事件
    ///
    /// Filled 回退到 PartiallyFilled（任务尚未开始）意味着需要重新
    /// 匹配，事件会唤醒冲突检测器。调用方需已持有任务锁。
    async fn refresh_task_status(&self, task_id: i64) -> EngineResult<()> {
        let mut task = self
            .task_repo
            .get_by_id(task_id)
            .await?
            .ok_or(EngineError::task_not_found(task_id))?;
        if task.status == TaskStatus::Cancelled {
            return Ok(());
        }
        let confirmed = self.confirmed_count(task_id).await?;
        let derived = task.derive_status(confirmed);
        if derived != task.status {
            let previous = task.status;
            task.status = derived;
            task.updated_at = Utc::now();
            self.task_repo.update(&task).await?;
            info!(
                "任务 {} 状态变更: {} -> {} (已确认 {}/{})",
                task_id, previous, derived, confirmed, task.volunteers_needed
            );
            self.events
                .publish(EngineEvent::task_status_changed(task_id, previous, derived));
        }
        Ok(())
    }

    async fn settle_reliability(&self, volunteer_id: i64, delta: i32) -> EngineResult<()> {
        let mut volunteer = self
            .volunteer_repo
            .get_by_id(volunteer_id)
            .await?
            .ok_or(EngineError::volunteer_not_found(volunteer_id))?;
        let before = volunteer.reliability_score;
        volunteer.apply_reliability_delta(delta);
        volunteer.updated_at = Utc::now();
        self.volunteer_repo.update(&volunteer).await?;
        debug!(
            "志愿者 {} 可靠度结算: {} -> {}",
            volunteer_id, before, volunteer.reliability_score
        );
        Ok(())
    }

    /// 发后即忘的任务提醒，投递失败只记日志，不影响状态机
    fn send_reminder_fire_and_forget(&self, volunteer_id: i64, task_id: i64) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send_reminder(volunteer_id, task_id).await {
                warn!(
                    "任务提醒发送失败（不回滚状态）: 志愿者={} 任务={} 错误={}",
                    volunteer_id, task_id, e
                );
            }
        });
    }
}

/// 供裁决流程使用的只读辅助：当前占用名额的志愿者 id 集合
pub(crate) fn occupying_volunteer_ids(assignments: &[Assignment]) -> Vec<i64> {
    assignments
        .iter()
        .filter(|a| a.occupies_slot())
        .map(|a| a.volunteer_id)
        .collect()
}

/// 供裁决流程使用：从候选池中剔除指定志愿者
pub(crate) fn exclude_volunteers(pool: Vec<Volunteer>, excluded: &[i64]) -> Vec<Volunteer> {
    pool.into_iter()
        .filter(|v| !excluded.contains(&v.id))
        .collect()
}
