use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use volunteer_core::EngineError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("引擎错误: {0}")]
    Engine(#[from] EngineError),

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("未找到资源")]
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_type, suggestions) = match &self {
            ApiError::Engine(e) if e.is_not_found() => (
                StatusCode::NOT_FOUND,
                e.to_string(),
                "NOT_FOUND".to_string(),
                vec![
                    "请检查资源ID是否正确".to_string(),
                    "使用对应的列表接口查看现有资源".to_string(),
                ],
            ),
            ApiError::Engine(EngineError::InvalidSpec(msg)) => (
                StatusCode::BAD_REQUEST,
                format!("请求内容无效: {}", msg),
                "INVALID_SPEC".to_string(),
                vec![
                    "请检查请求字段是否完整且格式正确".to_string(),
                    "任务所需人数必须至少为1，时间窗持续时间必须为正".to_string(),
                ],
            ),
            ApiError::Engine(EngineError::InvalidTransition { from, to }) => (
                StatusCode::BAD_REQUEST,
                format!("状态转换不合法: {} -> {}", from, to),
                "INVALID_TRANSITION".to_string(),
                vec![
                    "请先查询资源当前状态".to_string(),
                    "分配只允许 PENDING->CONFIRMED/DECLINED 与 CONFIRMED->COMPLETED/NO_SHOW".to_string(),
                ],
            ),
            ApiError::Engine(EngineError::CapacityExceeded { task_id }) => (
                StatusCode::CONFLICT,
                format!("任务 {} 名额已满", task_id),
                "CAPACITY_EXCEEDED".to_string(),
                vec![
                    "该任务的名额（含超额缓冲）已被占满".to_string(),
                    "可先拒绝既有分配，或提高任务所需人数".to_string(),
                ],
            ),
            ApiError::Engine(EngineError::ComplianceBlocked {
                volunteer_id,
                status,
            }) => (
                StatusCode::FORBIDDEN,
                format!("志愿者 {} 合规状态为 {}，禁止排班", volunteer_id, status),
                "COMPLIANCE_BLOCKED".to_string(),
                vec![
                    "合规状态为 EXPIRED/FLAGGED 的志愿者不能创建或确认分配".to_string(),
                    "请先在合规系统更新志愿者的审查状态".to_string(),
                ],
            ),
            ApiError::Engine(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "系统内部错误".to_string(),
                "INTERNAL_ERROR".to_string(),
                vec![
                    "系统遇到内部错误，请稍后重试".to_string(),
                    format!("错误详情: {}", e),
                ],
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                format!("请求参数错误: {}", msg),
                "BAD_REQUEST".to_string(),
                vec![
                    "请检查请求格式和参数".to_string(),
                    "确保Content-Type正确设置".to_string(),
                ],
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                "请求的资源不存在".to_string(),
                "NOT_FOUND".to_string(),
                vec!["请检查请求URL是否正确".to_string()],
            ),
        };

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type,
                "code": status.as_u16(),
                "suggestions": suggestions,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
