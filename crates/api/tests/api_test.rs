//! HTTP 接口的进程内集成测试

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use volunteer_api::create_app;
use volunteer_core::AppConfig;
use volunteer_engine::{
    AssignmentManager, ConflictDetector, RecruitmentPipeline, VolunteerRegistry,
};
use volunteer_infrastructure::{EventBus, KeyedLockManager, LoggingNotifier};
use volunteer_testing_utils::{
    InMemoryAssignmentRepository, InMemoryConflictRepository, InMemoryProspectRepository,
    InMemoryTaskRepository, InMemoryVolunteerRepository,
};

fn test_app() -> Router {
    let config = AppConfig::default();
    let bus = EventBus::new();

    let volunteer_repo = Arc::new(InMemoryVolunteerRepository::new());
    let task_repo = Arc::new(InMemoryTaskRepository::new());
    let assignment_repo = Arc::new(InMemoryAssignmentRepository::new());
    let conflict_repo = Arc::new(InMemoryConflictRepository::new());
    let prospect_repo = Arc::new(InMemoryProspectRepository::new());
    let locks = Arc::new(KeyedLockManager::new());

    let manager = Arc::new(AssignmentManager::new(
        task_repo.clone(),
        volunteer_repo.clone(),
        assignment_repo.clone(),
        locks.clone(),
        Arc::new(bus.publisher.clone()),
        Arc::new(LoggingNotifier::new()),
        config.matcher.clone(),
        config.assignment.clone(),
    ));
    let detector = Arc::new(ConflictDetector::new(
        task_repo,
        volunteer_repo.clone(),
        assignment_repo,
        conflict_repo,
        manager.clone(),
        config.matcher.clone(),
        config.conflict.clone(),
    ));
    let registry = Arc::new(VolunteerRegistry::new(
        volunteer_repo.clone(),
        locks,
        Arc::new(bus.publisher.clone()),
        config.pipeline.initial_reliability,
    ));
    let pipeline = Arc::new(RecruitmentPipeline::new(
        prospect_repo,
        volunteer_repo,
        Arc::new(bus.publisher.clone()),
        config.pipeline.initial_reliability,
    ));

    create_app(manager, registry, detector, pipeline, &config.api)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(json_body) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();
    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "volunteer-scheduler");
    assert_eq!(body["open_conflicts"], 0);
}

#[tokio::test]
async fn test_task_assignment_full_flow() {
    let app = test_app();

    // 注册志愿者
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/volunteers",
        Some(json!({
            "name": "李雷",
            "contact": "lilei@example.com",
            "skills": ["Scorekeeping"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let volunteer_id = body["data"]["id"].as_i64().unwrap();

    // 登记周六上午可用
    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/volunteers/{volunteer_id}/availability"),
        Some(json!({"date": "2030-07-20", "part": "MORNING", "available": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // 创建周六上午的任务
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({
            "title": "计分台",
            "required_skills": ["Scorekeeping"],
            "start": "2030-07-20T10:00:00Z",
            "duration_minutes": 90,
            "location": "主场馆",
            "volunteers_needed": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "OPEN");
    let task_id = body["data"]["id"].as_i64().unwrap();

    // 候选列表包含该志愿者
    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/tasks/{task_id}/candidates"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["volunteer_id"].as_i64(), Some(volunteer_id));

    // 创建并确认分配
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/tasks/{task_id}/assignments"),
        Some(json!({"volunteer_id": volunteer_id})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "PENDING");
    let assignment_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/assignments/{assignment_id}/transition"),
        Some(json!({"to": "CONFIRMED"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "CONFIRMED");

    // 任务进入 FILLED，确认人数为 1
    let (status, body) = call(&app, Method::GET, "/api/tasks?status=FILLED", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"].as_i64(), Some(task_id));
    assert_eq!(body["data"][0]["confirmed_count"].as_i64(), Some(1));
}

#[tokio::test]
async fn test_error_mapping() {
    let app = test_app();

    // 不存在的任务 -> 404
    let (status, body) = call(&app, Method::GET, "/api/tasks/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "NOT_FOUND");

    // 人数为0的任务 -> 400
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({
            "title": "空任务",
            "start": "2030-07-20T10:00:00Z",
            "duration_minutes": 60,
            "location": "无",
            "volunteers_needed": 0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "INVALID_SPEC");

    // 未知状态过滤 -> 400
    let (status, _) = call(&app, Method::GET, "/api/tasks?status=BOGUS", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_capacity_and_compliance_status_codes() {
    let app = test_app();

    // 两名可用志愿者 + 1 个名额
    let mut ids = Vec::new();
    for name in ["甲", "乙"] {
        let (_, body) = call(
            &app,
            Method::POST,
            "/api/volunteers",
            Some(json!({"name": name, "contact": format!("{name}@example.com")})),
        )
        .await;
        let id = body["data"]["id"].as_i64().unwrap();
        call(
            &app,
            Method::POST,
            &format!("/api/volunteers/{id}/availability"),
            Some(json!({"date": "2030-07-20", "part": "MORNING", "available": true})),
        )
        .await;
        ids.push(id);
    }
    let (_, body) = call(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({
            "title": "单人岗",
            "start": "2030-07-20T09:00:00Z",
            "duration_minutes": 60,
            "location": "东门",
            "volunteers_needed": 1
        })),
    )
    .await;
    let task_id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/tasks/{task_id}/assignments"),
        Some(json!({"volunteer_id": ids[0]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // 名额占满 -> 409
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/tasks/{task_id}/assignments"),
        Some(json!({"volunteer_id": ids[1]})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["type"], "CAPACITY_EXCEEDED");
}

#[tokio::test]
async fn test_upsert_volunteer_create_and_update_status_codes() {
    let app = test_app();

    // 新建 -> 201
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/volunteers",
        Some(json!({"name": "韩梅梅", "contact": "han@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let volunteer_id = body["data"]["id"].as_i64().unwrap();

    // 带 id 更新 -> 200，姓名生效
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/volunteers",
        Some(json!({
            "id": volunteer_id,
            "name": "韩梅梅（改）",
            "contact": "han@example.com"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"].as_i64(), Some(volunteer_id));
    assert_eq!(body["data"]["name"], "韩梅梅（改）");
}

#[tokio::test]
async fn test_compliance_endpoint_blocks_assignment() {
    let app = test_app();

    let (_, body) = call(
        &app,
        Method::POST,
        "/api/volunteers",
        Some(json!({"name": "证件过期者", "contact": "exp@example.com"})),
    )
    .await;
    let volunteer_id = body["data"]["id"].as_i64().unwrap();
    call(
        &app,
        Method::POST,
        &format!("/api/volunteers/{volunteer_id}/availability"),
        Some(json!({"date": "2030-07-20", "part": "MORNING", "available": true})),
    )
    .await;

    let (_, body) = call(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({
            "title": "器材管理",
            "start": "2030-07-20T09:00:00Z",
            "duration_minutes": 60,
            "location": "器材房",
            "volunteers_needed": 1
        })),
    )
    .await;
    let task_id = body["data"]["id"].as_i64().unwrap();

    // 合规回写 EXPIRED
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/volunteers/{volunteer_id}/compliance"),
        Some(json!({"status": "EXPIRED"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["compliance_status"], "EXPIRED");

    // 候选列表不再出现该志愿者
    let (_, body) = call(
        &app,
        Method::GET,
        &format!("/api/tasks/{task_id}/candidates"),
        None,
    )
    .await;
    assert!(body["data"].as_array().unwrap().is_empty());

    // 强行创建分配 -> 403
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/tasks/{task_id}/assignments"),
        Some(json!({"volunteer_id": volunteer_id})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["type"], "COMPLIANCE_BLOCKED");
}

#[tokio::test]
async fn test_pipeline_endpoints() {
    let app = test_app();

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/pipeline/prospects",
        Some(json!({"name": "新候选人", "contact": "new@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["stage"], "INTERESTED");
    let prospect_id = body["data"]["id"].as_i64().unwrap();

    // 一路推进到 ACTIVE，转正生成志愿者
    for to in [
        "APPLIED",
        "SCREENED",
        "BACKGROUND_CHECKED",
        "ONBOARDED",
        "ACTIVE",
    ] {
        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/api/pipeline/prospects/{prospect_id}/advance"),
            Some(json!({"to": to})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["stage"], to);
    }

    let (_, body) = call(&app, Method::GET, "/api/volunteers", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // 漏斗各阶段均为 1 人
    let (status, body) = call(&app, Method::GET, "/api/pipeline/funnel", None).await;
    assert_eq!(status, StatusCode::OK);
    let funnel = body["data"].as_array().unwrap();
    assert_eq!(funnel.len(), 6);
    assert!(funnel.iter().all(|s| s["reached"].as_u64() == Some(1)));

    // ACTIVE 之后继续推进 -> 400
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/pipeline/prospects/{prospect_id}/advance"),
        Some(json!({"to": "ACTIVE"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_pipeline_stage_regression_rejected() {
    let app = test_app();

    let (_, body) = call(
        &app,
        Method::POST,
        "/api/pipeline/prospects",
        Some(json!({"name": "退阶者", "contact": "back@example.com"})),
    )
    .await;
    let prospect_id = body["data"]["id"].as_i64().unwrap();

    for to in ["APPLIED", "SCREENED"] {
        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/api/pipeline/prospects/{prospect_id}/advance"),
            Some(json!({"to": to})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // 回退 SCREENED -> INTERESTED 与跳级 SCREENED -> ACTIVE 都拒绝
    for to in ["INTERESTED", "ACTIVE"] {
        let (status, body) = call(
            &app,
            Method::POST,
            &format!("/api/pipeline/prospects/{prospect_id}/advance"),
            Some(json!({"to": to})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "INVALID_TRANSITION");
    }
}

#[tokio::test]
async fn test_conflict_endpoints() {
    let app = test_app();

    // 同一志愿者确认两个重叠任务，触发手动扫描
    let (_, body) = call(
        &app,
        Method::POST,
        "/api/volunteers",
        Some(json!({"name": "双排者", "contact": "dup@example.com"})),
    )
    .await;
    let volunteer_id = body["data"]["id"].as_i64().unwrap();
    call(
        &app,
        Method::POST,
        &format!("/api/volunteers/{volunteer_id}/availability"),
        Some(json!({"date": "2030-07-20", "part": "MORNING", "available": true})),
    )
    .await;

    for title in ["检录", "看台引导"] {
        let (_, body) = call(
            &app,
            Method::POST,
            "/api/tasks",
            Some(json!({
                "title": title,
                "start": "2030-07-20T09:00:00Z",
                "duration_minutes": 120,
                "location": "主场馆",
                "volunteers_needed": 1
            })),
        )
        .await;
        let task_id = body["data"]["id"].as_i64().unwrap();
        let (_, body) = call(
            &app,
            Method::POST,
            &format!("/api/tasks/{task_id}/assignments"),
            Some(json!({"volunteer_id": volunteer_id})),
        )
        .await;
        let assignment_id = body["data"]["id"].as_i64().unwrap();
        call(
            &app,
            Method::POST,
            &format!("/api/assignments/{assignment_id}/transition"),
            Some(json!({"to": "CONFIRMED"})),
        )
        .await;
    }

    let (status, body) = call(&app, Method::POST, "/api/conflicts/scan", None).await;
    assert_eq!(status, StatusCode::OK);
    let detected = body["data"].as_array().unwrap();
    assert!(detected
        .iter()
        .any(|c| c["kind"] == "VOLUNTEER_DOUBLE_BOOKED"));

    let (status, body) = call(&app, Method::GET, "/api/conflicts?resolved=false", None).await;
    assert_eq!(status, StatusCode::OK);
    let conflict_id = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["kind"] == "VOLUNTEER_DOUBLE_BOOKED")
        .and_then(|c| c["id"].as_i64())
        .unwrap();

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/conflicts/{conflict_id}/resolve"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["resolved"], true);
    assert_eq!(
        body["data"]["displaced_assignment_ids"]
            .as_array()
            .unwrap()
            .len(),
        1
    );
}
