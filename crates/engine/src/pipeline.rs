//! 招募漏斗
//!
//! 候选人沿固定六阶段推进，每次只前进一步；拒绝是旁路标记而非阶段。
//! 到达 Active 即单向转换为志愿者，漏斗统计只按"到达过"计数，
//! 因此各阶段人数必然单调不增。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use volunteer_core::{EngineError, EngineResult};
use volunteer_domain::entities::{
    ComplianceStatus, NewProspect, PipelineStage, Prospect, Volunteer,
};
use volunteer_domain::events::EngineEvent;
use volunteer_domain::ports::EventPublisher;
use volunteer_domain::repositories::{ProspectRepository, VolunteerRepository};

/// 漏斗单阶段统计
#[derive(Debug, Clone, Serialize)]
pub struct FunnelStage {
    pub stage: PipelineStage,
    /// 到达过该阶段的候选人数（含后来被拒绝的）
    pub reached: usize,
    /// 相对候选人总数的百分比
    pub percentage: f64,
}

pub struct RecruitmentPipeline {
    prospect_repo: Arc<dyn ProspectRepository>,
    volunteer_repo: Arc<dyn VolunteerRepository>,
    events: Arc<dyn EventPublisher>,
    initial_reliability: i32,
}

impl RecruitmentPipeline {
    pub fn new(
        prospect_repo: Arc<dyn ProspectRepository>,
        volunteer_repo: Arc<dyn VolunteerRepository>,
        events: Arc<dyn EventPublisher>,
        initial_reliability: i32,
    ) -> Self {
        Self {
            prospect_repo,
            volunteer_repo,
            events,
            initial_reliability,
        }
    }

    /// 登记新候选人，从 Interested 阶段开始
    pub async fn add_prospect(&self, spec: NewProspect) -> EngineResult<Prospect> {
        if spec.name.trim().is_empty() {
            return Err(EngineError::invalid_spec("候选人姓名不能为空"));
        }
        let now = Utc::now();
        let mut stage_entered_at = HashMap::new();
        stage_entered_at.insert(PipelineStage::Interested, now);
        let prospect = Prospect {
            id: 0,
            name: spec.name,
            contact: spec.contact,
            skills: spec.skills,
            stage: PipelineStage::Interested,
            stage_entered_at,
            rejected: false,
            rejected_at_stage: None,
            volunteer_id: None,
            created_at: now,
            updated_at: now,
        };
        let created = self.prospect_repo.create(&prospect).await?;
        info!("登记招募候选人: id={} name={}", created.id, created.name);
        Ok(created)
    }

    /// 将候选人推进到指定阶段，到达 Active 时转换为志愿者
    ///
    /// 只接受紧邻的下一阶段，回退与跳级都是 InvalidTransition。
    pub async fn advance_stage(
        &self,
        prospect_id: i64,
        to: PipelineStage,
    ) -> EngineResult<Prospect> {
        let mut prospect = self.get_prospect(prospect_id).await?;
        if prospect.rejected {
            return Err(EngineError::invalid_transition("REJECTED", to.as_str()));
        }
        if prospect.stage.next() != Some(to) {
            return Err(EngineError::invalid_transition(
                prospect.stage.as_str(),
                to.as_str(),
            ));
        }

        prospect.stage = to;
        prospect.stage_entered_at.insert(to, Utc::now());
        prospect.updated_at = Utc::now();

        if to == PipelineStage::Active {
            let volunteer = self.convert_to_volunteer(&prospect).await?;
            prospect.volunteer_id = Some(volunteer.id);
            self.events
                .publish(EngineEvent::prospect_converted(prospect.id, volunteer.id));
            info!(
                "候选人 {} 转正为志愿者 {}",
                prospect.id, volunteer.id
            );
        }

        self.prospect_repo.update(&prospect).await?;
        Ok(prospect)
    }

    /// 在当前阶段拒绝候选人（旁路标记，阶段保持不变）
    pub async fn reject_prospect(&self, prospect_id: i64) -> EngineResult<Prospect> {
        let mut prospect = self.get_prospect(prospect_id).await?;
        if prospect.rejected {
            return Err(EngineError::invalid_transition("REJECTED", "REJECT"));
        }
        if prospect.stage == PipelineStage::Active {
            // 已转正的候选人走志愿者停用流程，不能回到漏斗里拒绝
            return Err(EngineError::invalid_transition("ACTIVE", "REJECT"));
        }
        prospect.rejected = true;
        prospect.rejected_at_stage = Some(prospect.stage);
        prospect.updated_at = Utc::now();
        self.prospect_repo.update(&prospect).await?;
        info!(
            "候选人 {} 在 {} 阶段被拒绝",
            prospect.id, prospect.stage
        );
        Ok(prospect)
    }

    pub async fn get_prospect(&self, prospect_id: i64) -> EngineResult<Prospect> {
        self.prospect_repo
            .get_by_id(prospect_id)
            .await?
            .ok_or(EngineError::prospect_not_found(prospect_id))
    }

    pub async fn list_prospects(&self) -> EngineResult<Vec<Prospect>> {
        self.prospect_repo.list_all().await
    }

    /// 各阶段到达人数与转化率，阶段计数天然单调不增
    pub async fn conversion_funnel(&self) -> EngineResult<Vec<FunnelStage>> {
        let prospects = self.prospect_repo.list_all().await?;
        let total = prospects.len();
        let funnel = PipelineStage::ALL
            .iter()
            .map(|stage| {
                let reached = prospects.iter().filter(|p| p.has_reached(*stage)).count();
                let percentage = if total == 0 {
                    0.0
                } else {
                    (reached as f64 / total as f64) * 100.0
                };
                FunnelStage {
                    stage: *stage,
                    reached,
                    percentage,
                }
            })
            .collect();
        Ok(funnel)
    }

    async fn convert_to_volunteer(&self, prospect: &Prospect) -> EngineResult<Volunteer> {
        let now = Utc::now();
        let volunteer = Volunteer {
            id: 0,
            name: prospect.name.clone(),
            contact: prospect.contact.clone(),
            skills: prospect.skills.clone(),
            availability: HashMap::new(),
            reliability_score: self.initial_reliability,
            // 背景审查材料仍需合规方确认，转正不等于放行
            compliance_status: ComplianceStatus::Pending,
            active: true,
            origin_prospect_id: Some(prospect.id),
            created_at: now,
            updated_at: now,
        };
        self.volunteer_repo.create(&volunteer).await
    }
}
