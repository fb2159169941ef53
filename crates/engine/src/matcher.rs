//! 匹配器
//!
//! 纯函数、无副作用，可并发调用无需加锁。评分为三项加权和，各项先
//! 归一化到 [0,1] 再加权，最终放大到 0-100：
//! - 技能重合度（权重 0.45）：|任务技能 ∩ 志愿者技能| / max(1, |任务技能|)
//! - 可用性（权重 0.35）：硬过滤项，时间窗触及的每个时段都可用才入选
//! - 可靠度（权重 0.20）：reliability_score / 100
//!
//! 同分时按可靠度降序、志愿者 id 升序排列，结果可复现。

use serde::Serialize;

use volunteer_core::MatcherConfig;
use volunteer_domain::entities::{Task, Volunteer};

/// 排序后的候选项
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Candidate {
    pub volunteer_id: i64,
    /// 0-100 的匹配分
    pub score: i32,
}

/// 对候选池打分并排序
///
/// 合规状态为 Expired/Flagged 的志愿者与已停用的志愿者在评分前剔除；
/// 可用性不满足的志愿者整体排除而非降分；任务声明了所需技能时，
/// 技能零重合的志愿者同样整体排除。没有合格候选人时返回空表
/// （不是错误），调用方应视为需要人工或招募升级。
pub fn rank_candidates(
    task: &Task,
    pool: &[Volunteer],
    weights: &MatcherConfig,
) -> Vec<Candidate> {
    let mut scored: Vec<(i64, i32, i32)> = pool
        .iter()
        .filter(|v| v.active && !v.is_compliance_blocked())
        .filter(|v| v.covers_window(&task.window))
        .filter(|v| {
            task.required_skills.is_empty()
                || task.required_skills.intersection(&v.skills).next().is_some()
        })
        .map(|v| (v.id, score(task, v, weights), v.reliability_score))
        .collect();

    scored.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| b.2.cmp(&a.2))
            .then_with(|| a.0.cmp(&b.0))
    });

    scored
        .into_iter()
        .map(|(volunteer_id, score, _)| Candidate {
            volunteer_id,
            score,
        })
        .collect()
}

/// 单个志愿者对某任务的匹配分（0-100）
///
/// 不做硬过滤，可用性不满足时该项计 0。分配管理器在人工强制创建
/// 分配时也用它记录 match_score。
pub fn score(task: &Task, volunteer: &Volunteer, weights: &MatcherConfig) -> i32 {
    let skill_overlap = task
        .required_skills
        .intersection(&volunteer.skills)
        .count() as f64
        / std::cmp::max(1, task.required_skills.len()) as f64;
    let availability = if volunteer.covers_window(&task.window) {
        1.0
    } else {
        0.0
    };
    let reliability = volunteer.reliability_score as f64 / 100.0;

    let weighted = weights.skill_weight * skill_overlap
        + weights.availability_weight * availability
        + weights.reliability_weight * reliability;
    (weighted * 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use volunteer_core::AppConfig;
    use volunteer_domain::entities::ComplianceStatus;
    use volunteer_testing_utils::{saturday_morning, TaskBuilder, VolunteerBuilder};

    fn weights() -> MatcherConfig {
        AppConfig::default().matcher
    }

    #[test]
    fn test_scorekeeping_scenario() {
        // 任务要求记分技能，周六上午 10:00-11:30，需 1 人
        let task = TaskBuilder::new()
            .with_required_skills(&["Scorekeeping"])
            .with_window(saturday_morning(), 90)
            .with_volunteers_needed(1)
            .build();

        let a = VolunteerBuilder::new()
            .with_id(1)
            .with_skills(&["Scorekeeping"])
            .with_reliability(90)
            .available_for(&task.window)
            .build();
        // B 缺技能但时段可用
        let b = VolunteerBuilder::new()
            .with_id(2)
            .with_skills(&["Photography"])
            .with_reliability(95)
            .available_for(&task.window)
            .build();

        // B 技能零重合，整体排除而非降分
        let ranked = rank_candidates(&task, &[a, b], &weights());
        assert_eq!(ranked.len(), 1);
        // 0.45 + 0.35 + 0.2*0.9 = 0.98
        assert_eq!(ranked[0].volunteer_id, 1);
        assert_eq!(ranked[0].score, 98);
    }

    #[test]
    fn test_availability_is_a_hard_filter() {
        let task = TaskBuilder::new()
            .with_required_skills(&["Scorekeeping"])
            .build();
        // 技能完全匹配但没有标记任何可用时段
        let unavailable = VolunteerBuilder::new()
            .with_skills(&["Scorekeeping"])
            .with_reliability(100)
            .build();
        assert!(rank_candidates(&task, &[unavailable], &weights()).is_empty());
    }

    #[test]
    fn test_blocked_compliance_excluded_before_scoring() {
        let task = TaskBuilder::new().build();
        let expired = VolunteerBuilder::new()
            .with_id(1)
            .with_compliance(ComplianceStatus::Expired)
            .available_for(&task.window)
            .build();
        let flagged = VolunteerBuilder::new()
            .with_id(2)
            .with_compliance(ComplianceStatus::Flagged)
            .available_for(&task.window)
            .build();
        let pending = VolunteerBuilder::new()
            .with_id(3)
            .with_compliance(ComplianceStatus::Pending)
            .available_for(&task.window)
            .build();

        let ranked = rank_candidates(&task, &[expired, flagged, pending], &weights());
        // Pending 不阻塞匹配，Expired/Flagged 在评分前整体剔除
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].volunteer_id, 3);
    }

    #[test]
    fn test_inactive_volunteers_excluded() {
        let task = TaskBuilder::new().build();
        let inactive = VolunteerBuilder::new()
            .available_for(&task.window)
            .inactive()
            .build();
        assert!(rank_candidates(&task, &[inactive], &weights()).is_empty());
    }

    #[test]
    fn test_tie_break_reliability_then_id() {
        let task = TaskBuilder::new().build();
        // 三人技能与可用性相同
        let make = |id: i64, reliability: i32| {
            VolunteerBuilder::new()
                .with_id(id)
                .with_reliability(reliability)
                .available_for(&task.window)
                .build()
        };
        // 90 与 91 四舍五入到同一分数区间外，用相同可靠度验证 id 升序
        let ranked = rank_candidates(&task, &[make(3, 80), make(1, 80), make(2, 90)], &weights());
        assert_eq!(
            ranked.iter().map(|c| c.volunteer_id).collect::<Vec<_>>(),
            vec![2, 1, 3]
        );
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let task = TaskBuilder::new()
            .with_required_skills(&["Setup", "EarlyMorning"])
            .build();
        let pool: Vec<_> = (1..=5)
            .map(|id| {
                VolunteerBuilder::new()
                    .with_id(id)
                    .with_skills(&["Setup"])
                    .with_reliability(70 + id as i32)
                    .available_for(&task.window)
                    .build()
            })
            .collect();
        let first = rank_candidates(&task, &pool, &weights());
        let second = rank_candidates(&task, &pool, &weights());
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_pool_returns_empty_list() {
        let task = TaskBuilder::new().build();
        assert!(rank_candidates(&task, &[], &weights()).is_empty());
    }

    #[test]
    fn test_task_without_required_skills_scores_zero_skill_term() {
        let task = TaskBuilder::new().build();
        let v = VolunteerBuilder::new()
            .with_skills(&["Anything"])
            .with_reliability(100)
            .available_for(&task.window)
            .build();
        // 0.45*0 + 0.35*1 + 0.2*1 = 0.55
        assert_eq!(score(&task, &v, &weights()), 55);
    }
}
