//! 志愿者排班引擎的 REST API
//!
//! 基于 Axum 的 HTTP 接口层，覆盖任务/分配管理、志愿者档案、
//! 冲突查询与裁决、招募漏斗。
//!
//! ## 端点一览
//!
//! - `GET /health` - 健康检查
//! - `GET|POST /api/tasks`，`GET /api/tasks/{id}`，`POST /api/tasks/{id}/cancel`
//! - `GET /api/tasks/{id}/candidates` - 按匹配分排序的候选列表
//! - `POST /api/tasks/{id}/assignments`，`POST /api/assignments/{id}/transition`
//! - `GET|POST /api/volunteers`，可用性登记、合规状态回写与停用
//! - `GET /api/conflicts?resolved=`，`POST /api/conflicts/{id}/resolve`
//! - `GET|POST /api/pipeline/prospects`，`GET /api/pipeline/funnel`
//!
//! 成功响应统一使用 `ApiResponse` 信封，错误响应带 `type`/`code`/
//! `suggestions` 字段（见 [`error::ApiError`]）。

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;

use middleware::{cors_layer, request_logging, trace_layer};
use routes::{create_routes, AppState};
use volunteer_core::ApiConfig;
use volunteer_engine::{
    AssignmentManager, ConflictDetector, RecruitmentPipeline, VolunteerRegistry,
};

/// 创建完整的API应用
pub fn create_app(
    manager: Arc<AssignmentManager>,
    registry: Arc<VolunteerRegistry>,
    detector: Arc<ConflictDetector>,
    pipeline: Arc<RecruitmentPipeline>,
    api_config: &ApiConfig,
) -> Router {
    let state = AppState {
        manager,
        registry,
        detector,
        pipeline,
    };

    let router = create_routes(state).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(axum::middleware::from_fn(request_logging)),
    );
    if api_config.cors_enabled {
        router.layer(cors_layer())
    } else {
        router
    }
}
