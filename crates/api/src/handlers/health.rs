use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::routes::AppState;

/// 健康检查，附带未解决冲突数便于快速巡检
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let open_conflicts = state
        .detector
        .list_conflicts(Some(false))
        .await
        .map(|conflicts| conflicts.len())
        .unwrap_or(0);

    Json(json!({
        "status": "ok",
        "service": "volunteer-scheduler",
        "version": env!("CARGO_PKG_VERSION"),
        "open_conflicts": open_conflicts,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
