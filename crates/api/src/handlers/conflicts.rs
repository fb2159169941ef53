use axum::{
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::{error::ApiResult, response::success, routes::AppState};

/// 冲突查询参数
#[derive(Debug, Deserialize)]
pub struct ConflictQueryParams {
    pub resolved: Option<bool>,
}

/// 冲突列表，可按是否已解决过滤
pub async fn list_conflicts(
    State(state): State<AppState>,
    Query(params): Query<ConflictQueryParams>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let conflicts = state.detector.list_conflicts(params.resolved).await?;
    Ok(success(conflicts))
}

/// 手动触发一次全量冲突扫描
pub async fn scan_conflicts(
    State(state): State<AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let detected = state.detector.scan_all().await?;
    Ok(success(detected))
}

/// 裁决冲突，返回结构化结果
pub async fn resolve_conflict(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let outcome = state.detector.resolve(id).await?;
    Ok(success(outcome))
}
