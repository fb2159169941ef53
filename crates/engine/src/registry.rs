//! 志愿者档案注册表
//!
//! 志愿者聚合的唯一变更入口（可靠度的任务结算调整除外，那由分配
//! 管理器负责）。所有写操作按志愿者 id 加锁串行。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use volunteer_core::{EngineError, EngineResult};
use volunteer_domain::entities::{ComplianceStatus, Volunteer, VolunteerProfile};
use volunteer_domain::events::EngineEvent;
use volunteer_domain::ports::EventPublisher;
use volunteer_domain::repositories::VolunteerRepository;
use volunteer_domain::value_objects::DayPart;
use volunteer_infrastructure::{KeyedLockManager, LockKind};

pub struct VolunteerRegistry {
    volunteer_repo: Arc<dyn VolunteerRepository>,
    locks: Arc<KeyedLockManager>,
    events: Arc<dyn EventPublisher>,
    /// 直接注册（不经招募漏斗）的志愿者初始可靠度
    initial_reliability: i32,
}

impl VolunteerRegistry {
    pub fn new(
        volunteer_repo: Arc<dyn VolunteerRepository>,
        locks: Arc<KeyedLockManager>,
        events: Arc<dyn EventPublisher>,
        initial_reliability: i32,
    ) -> Self {
        Self {
            volunteer_repo,
            locks,
            events,
            initial_reliability,
        }
    }

    /// 创建或更新志愿者档案
    ///
    /// 带 id 时更新既有档案（不存在则 NotFound），不带 id 时新建。
    pub async fn upsert_volunteer(&self, profile: VolunteerProfile) -> EngineResult<Volunteer> {
        match profile.id {
            Some(id) => {
                let _guard = self.locks.acquire(LockKind::Volunteer, id).await;
                let mut volunteer = self
                    .volunteer_repo
                    .get_by_id(id)
                    .await?
                    .ok_or(EngineError::volunteer_not_found(id))?;
                volunteer.name = profile.name;
                volunteer.contact = profile.contact;
                volunteer.skills = profile.skills;
                volunteer.updated_at = Utc::now();
                self.volunteer_repo.update(&volunteer).await?;
                debug!("更新志愿者档案: id={}", id);
                Ok(volunteer)
            }
            None => {
                let now = Utc::now();
                let volunteer = Volunteer {
                    id: 0,
                    name: profile.name,
                    contact: profile.contact,
                    skills: profile.skills,
                    availability: HashMap::new(),
                    reliability_score: self.initial_reliability,
                    compliance_status: ComplianceStatus::Pending,
                    active: true,
                    origin_prospect_id: None,
                    created_at: now,
                    updated_at: now,
                };
                let created = self.volunteer_repo.create(&volunteer).await?;
                info!("注册志愿者: id={} name={}", created.id, created.name);
                Ok(created)
            }
        }
    }

    /// 记录可用性，幂等：同一 日期+时段 以最后一次写入为准
    pub async fn record_availability(
        &self,
        volunteer_id: i64,
        date: NaiveDate,
        part: DayPart,
        available: bool,
    ) -> EngineResult<Volunteer> {
        let _guard = self.locks.acquire(LockKind::Volunteer, volunteer_id).await;
        let mut volunteer = self
            .volunteer_repo
            .get_by_id(volunteer_id)
            .await?
            .ok_or(EngineError::volunteer_not_found(volunteer_id))?;
        volunteer.set_availability(date, part, available);
        volunteer.updated_at = Utc::now();
        self.volunteer_repo.update(&volunteer).await?;
        debug!(
            "记录可用性: 志愿者 {} {} {} -> {}",
            volunteer_id, date, part, available
        );
        Ok(volunteer)
    }

    /// 设置合规状态，变化时发布事件供冲突检测器响应
    pub async fn set_compliance_status(
        &self,
        volunteer_id: i64,
        status: ComplianceStatus,
    ) -> EngineResult<Volunteer> {
        let _guard = self.locks.acquire(LockKind::Volunteer, volunteer_id).await;
        let mut volunteer = self
            .volunteer_repo
            .get_by_id(volunteer_id)
            .await?
            .ok_or(EngineError::volunteer_not_found(volunteer_id))?;
        let previous = volunteer.compliance_status;
        if previous != status {
            volunteer.compliance_status = status;
            volunteer.updated_at = Utc::now();
            self.volunteer_repo.update(&volunteer).await?;
            info!(
                "志愿者 {} 合规状态变更: {} -> {}",
                volunteer_id, previous, status
            );
            self.events
                .publish(EngineEvent::compliance_changed(volunteer_id, previous, status));
        }
        Ok(volunteer)
    }

    /// 手工调整可靠度，夹取到 [0, 100]
    pub async fn adjust_reliability(
        &self,
        volunteer_id: i64,
        delta: i32,
    ) -> EngineResult<Volunteer> {
        let _guard = self.locks.acquire(LockKind::Volunteer, volunteer_id).await;
        let mut volunteer = self
            .volunteer_repo
            .get_by_id(volunteer_id)
            .await?
            .ok_or(EngineError::volunteer_not_found(volunteer_id))?;
        volunteer.apply_reliability_delta(delta);
        volunteer.updated_at = Utc::now();
        self.volunteer_repo.update(&volunteer).await?;
        Ok(volunteer)
    }

    /// 停用志愿者（档案永不删除）
    pub async fn deactivate_volunteer(&self, volunteer_id: i64) -> EngineResult<Volunteer> {
        let _guard = self.locks.acquire(LockKind::Volunteer, volunteer_id).await;
        let mut volunteer = self
            .volunteer_repo
            .get_by_id(volunteer_id)
            .await?
            .ok_or(EngineError::volunteer_not_found(volunteer_id))?;
        volunteer.active = false;
        volunteer.updated_at = Utc::now();
        self.volunteer_repo.update(&volunteer).await?;
        info!("停用志愿者: id={}", volunteer_id);
        Ok(volunteer)
    }

    pub async fn get_volunteer(&self, volunteer_id: i64) -> EngineResult<Volunteer> {
        self.volunteer_repo
            .get_by_id(volunteer_id)
            .await?
            .ok_or(EngineError::volunteer_not_found(volunteer_id))
    }

    pub async fn list_volunteers(&self) -> EngineResult<Vec<Volunteer>> {
        self.volunteer_repo.list_all().await
    }
}
