use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::collections::HashSet;

use volunteer_domain::entities::{NewProspect, PipelineStage};

use crate::{
    error::ApiResult,
    response::{created, success},
    routes::AppState,
};

/// 候选人登记请求
#[derive(Debug, Deserialize)]
pub struct AddProspectRequest {
    pub name: String,
    pub contact: String,
    #[serde(default)]
    pub skills: HashSet<String>,
}

/// 登记新候选人（从 INTERESTED 阶段开始）
pub async fn add_prospect(
    State(state): State<AppState>,
    Json(request): Json<AddProspectRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let prospect = state
        .pipeline
        .add_prospect(NewProspect {
            name: request.name,
            contact: request.contact,
            skills: request.skills,
        })
        .await?;
    Ok(created(prospect))
}

pub async fn list_prospects(
    State(state): State<AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let prospects = state.pipeline.list_prospects().await?;
    Ok(success(prospects))
}

/// 阶段推进请求，只接受紧邻的下一阶段
#[derive(Debug, Deserialize)]
pub struct AdvanceProspectRequest {
    pub to: PipelineStage,
}

/// 推进候选人到指定阶段（到达 ACTIVE 时转正为志愿者）
pub async fn advance_prospect(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AdvanceProspectRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let prospect = state.pipeline.advance_stage(id, request.to).await?;
    Ok(success(prospect))
}

/// 在当前阶段拒绝候选人
pub async fn reject_prospect(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let prospect = state.pipeline.reject_prospect(id).await?;
    Ok(success(prospect))
}

/// 漏斗转化统计
pub async fn conversion_funnel(
    State(state): State<AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let funnel = state.pipeline.conversion_funnel().await?;
    Ok(success(funnel))
}
