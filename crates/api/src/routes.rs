use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use volunteer_engine::{
    AssignmentManager, ConflictDetector, RecruitmentPipeline, VolunteerRegistry,
};

use crate::handlers::{
    assignments::{create_assignment, get_assignment, transition_assignment},
    conflicts::{list_conflicts, resolve_conflict, scan_conflicts},
    health::health_check,
    pipeline::{
        add_prospect, advance_prospect, conversion_funnel, list_prospects, reject_prospect,
    },
    tasks::{cancel_task, create_task, get_task, list_candidates, list_tasks},
    volunteers::{
        deactivate_volunteer, get_volunteer, list_volunteers, record_availability,
        set_compliance, upsert_volunteer,
    },
};

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<AssignmentManager>,
    pub registry: Arc<VolunteerRegistry>,
    pub detector: Arc<ConflictDetector>,
    pub pipeline: Arc<RecruitmentPipeline>,
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health_check))
        // 任务与分配
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{id}", get(get_task))
        .route("/api/tasks/{id}/cancel", post(cancel_task))
        .route("/api/tasks/{id}/candidates", get(list_candidates))
        .route("/api/tasks/{id}/assignments", post(create_assignment))
        .route("/api/assignments/{id}", get(get_assignment))
        .route("/api/assignments/{id}/transition", post(transition_assignment))
        // 志愿者档案
        .route("/api/volunteers", get(list_volunteers).post(upsert_volunteer))
        .route("/api/volunteers/{id}", get(get_volunteer))
        .route("/api/volunteers/{id}/availability", post(record_availability))
        .route("/api/volunteers/{id}/compliance", post(set_compliance))
        .route("/api/volunteers/{id}/deactivate", post(deactivate_volunteer))
        // 冲突
        .route("/api/conflicts", get(list_conflicts))
        .route("/api/conflicts/scan", post(scan_conflicts))
        .route("/api/conflicts/{id}/resolve", post(resolve_conflict))
        // 招募漏斗
        .route("/api/pipeline/prospects", get(list_prospects).post(add_prospect))
        .route("/api/pipeline/prospects/{id}/advance", post(advance_prospect))
        .route("/api/pipeline/prospects/{id}/reject", post(reject_prospect))
        .route("/api/pipeline/funnel", get(conversion_funnel))
        .with_state(state)
}
