use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use volunteer_domain::entities::AssignmentStatus;

use crate::{
    error::ApiResult,
    response::{created, success},
    routes::AppState,
};

/// 分配创建请求
#[derive(Debug, Deserialize)]
pub struct CreateAssignmentRequest {
    pub volunteer_id: i64,
}

/// 分配状态转换请求
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub to: AssignmentStatus,
    pub note: Option<String>,
}

/// 在任务上创建分配（Pending）
pub async fn create_assignment(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Json(request): Json<CreateAssignmentRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let assignment = state
        .manager
        .create_assignment(task_id, request.volunteer_id)
        .await?;
    Ok(created(assignment))
}

/// 获取单条分配
pub async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let assignment = state.manager.get_assignment(id).await?;
    Ok(success(assignment))
}

/// 分配状态转换
pub async fn transition_assignment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<TransitionRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let assignment = state
        .manager
        .transition_assignment(id, request.to, request.note)
        .await?;
    Ok(success(assignment))
}
