use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;

use volunteer_domain::entities::{ComplianceStatus, VolunteerProfile};
use volunteer_domain::value_objects::DayPart;

use crate::{
    error::ApiResult,
    response::{created, success},
    routes::AppState,
};

/// 志愿者档案创建/更新请求
#[derive(Debug, Deserialize)]
pub struct UpsertVolunteerRequest {
    pub id: Option<i64>,
    pub name: String,
    pub contact: String,
    #[serde(default)]
    pub skills: HashSet<String>,
}

/// 可用性登记请求（同一日期时段重复提交以最后一次为准）
#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub date: NaiveDate,
    pub part: DayPart,
    pub available: bool,
}

/// 创建或更新志愿者档案
pub async fn upsert_volunteer(
    State(state): State<AppState>,
    Json(request): Json<UpsertVolunteerRequest>,
) -> ApiResult<Response> {
    let is_update = request.id.is_some();
    let volunteer = state
        .registry
        .upsert_volunteer(VolunteerProfile {
            id: request.id,
            name: request.name,
            contact: request.contact,
            skills: request.skills,
        })
        .await?;
    // 更新返回200，新建返回201；两个分支先落成具体Response再返回
    if is_update {
        Ok(success(volunteer).into_response())
    } else {
        Ok(created(volunteer).into_response())
    }
}

pub async fn list_volunteers(
    State(state): State<AppState>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let volunteers = state.registry.list_volunteers().await?;
    Ok(success(volunteers))
}

pub async fn get_volunteer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let volunteer = state.registry.get_volunteer(id).await?;
    Ok(success(volunteer))
}

/// 登记某日期某时段的可用性
pub async fn record_availability(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AvailabilityRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let volunteer = state
        .registry
        .record_availability(id, request.date, request.part, request.available)
        .await?;
    Ok(success(volunteer))
}

/// 合规状态变更请求
#[derive(Debug, Deserialize)]
pub struct ComplianceRequest {
    pub status: ComplianceStatus,
}

/// 更新志愿者合规状态（合规文档系统的回写入口）
pub async fn set_compliance(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ComplianceRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let volunteer = state
        .registry
        .set_compliance_status(id, request.status)
        .await?;
    Ok(success(volunteer))
}

/// 停用志愿者（档案保留，不再进入候选池）
pub async fn deactivate_volunteer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let volunteer = state.registry.deactivate_volunteer(id).await?;
    Ok(success(volunteer))
}
