use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashSet;

use volunteer_domain::entities::{NewTask, TaskPriority, TaskStatus};
use volunteer_domain::value_objects::TimeWindow;

use crate::{
    error::{ApiError, ApiResult},
    response::{created, success},
    routes::AppState,
};

/// 任务创建请求
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub required_skills: HashSet<String>,
    pub start: DateTime<Utc>,
    pub duration_minutes: i64,
    pub location: String,
    pub priority: Option<TaskPriority>,
    pub volunteers_needed: i32,
}

/// 任务查询参数
#[derive(Debug, Deserialize)]
pub struct TaskQueryParams {
    pub status: Option<String>,
}

/// 创建任务
pub async fn create_task(
    State(state): State<AppState>,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let task = state
        .manager
        .create_task(NewTask {
            title: request.title,
            required_skills: request.required_skills,
            window: TimeWindow {
                start: request.start,
                duration_minutes: request.duration_minutes,
            },
            location: request.location,
            priority: request.priority.unwrap_or(TaskPriority::Medium),
            volunteers_needed: request.volunteers_needed,
        })
        .await?;
    Ok(created(task))
}

/// 任务列表（含实时确认人数），可按状态过滤
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<TaskQueryParams>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let status = match params.status.as_deref() {
        Some(raw) => Some(
            TaskStatus::parse(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("未知任务状态: {raw}")))?,
        ),
        None => None,
    };
    let overviews = state.manager.list_tasks(status).await?;
    Ok(success(overviews))
}

/// 获取单个任务
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let task = state.manager.get_task(id).await?;
    Ok(success(task))
}

/// 取消任务（级联拒绝其全部有效分配）
pub async fn cancel_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let task = state.manager.cancel_task(id).await?;
    Ok(success(task))
}

/// 任务的排序候选列表
pub async fn list_candidates(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let candidates = state.manager.rank_for_task(id).await?;
    Ok(success(candidates))
}
