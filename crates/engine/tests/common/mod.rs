//! 集成测试公共装配：内存仓储 + 默认配置组装整套引擎

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;

use volunteer_core::AppConfig;
use volunteer_domain::entities::{NewTask, TaskPriority, Volunteer};
use volunteer_domain::events::EngineEvent;
use volunteer_domain::value_objects::TimeWindow;
use volunteer_engine::{AssignmentManager, ConflictDetector, VolunteerRegistry};
use volunteer_infrastructure::{
    EventBus, InMemoryAssignmentRepository, InMemoryConflictRepository, InMemoryTaskRepository,
    InMemoryVolunteerRepository, KeyedLockManager, LoggingNotifier,
};

pub struct TestEngine {
    pub manager: Arc<AssignmentManager>,
    pub detector: Arc<ConflictDetector>,
    pub registry: Arc<VolunteerRegistry>,
    pub volunteer_repo: Arc<InMemoryVolunteerRepository>,
    pub task_repo: Arc<InMemoryTaskRepository>,
    pub assignment_repo: Arc<InMemoryAssignmentRepository>,
    pub conflict_repo: Arc<InMemoryConflictRepository>,
    /// 持有消费端避免发布侧丢事件；监听器测试用 take_receiver 取走
    pub receiver: mpsc::UnboundedReceiver<EngineEvent>,
}

impl TestEngine {
    /// 取走事件消费端，原位换成一个空通道
    pub fn take_receiver(&mut self) -> mpsc::UnboundedReceiver<EngineEvent> {
        let (_detached, empty) = mpsc::unbounded_channel();
        std::mem::replace(&mut self.receiver, empty)
    }
}

pub fn engine() -> TestEngine {
    let config = AppConfig::default();
    let bus = EventBus::new();

    let volunteer_repo = Arc::new(InMemoryVolunteerRepository::new());
    let task_repo = Arc::new(InMemoryTaskRepository::new());
    let assignment_repo = Arc::new(InMemoryAssignmentRepository::new());
    let conflict_repo = Arc::new(InMemoryConflictRepository::new());
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
        task_repo.clone(),
        volunteer_repo.clone(),
        assignment_repo.clone(),
        conflict_repo.clone(),
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

    TestEngine {
        manager,
        detector,
        registry,
        volunteer_repo,
        task_repo,
        assignment_repo,
        conflict_repo,
        receiver: bus.receiver,
    }
}

/// 从现在起 `hours` 小时后开始的时间窗
pub fn window_in(hours: i64, duration_minutes: i64) -> TimeWindow {
    TimeWindow {
        start: Utc::now() + Duration::hours(hours),
        duration_minutes,
    }
}

pub fn task_spec(title: &str, window: TimeWindow, needed: i32) -> NewTask {
    NewTask {
        title: title.to_string(),
        required_skills: Default::default(),
        window,
        location: "一号场地".to_string(),
        priority: TaskPriority::Medium,
        volunteers_needed: needed,
    }
}

/// 直接入库一名志愿者（绕开注册表，测试自己控制字段）
pub async fn seed_volunteer(engine: &TestEngine, volunteer: Volunteer) -> Volunteer {
    use volunteer_domain::repositories::VolunteerRepository;
    engine.volunteer_repo.create(&volunteer).await.unwrap()
}

/// 取空事件通道，返回期间积累的全部事件
pub fn drain_events(receiver: &mut mpsc::UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

pub fn hours_from_now(hours: i64) -> DateTime<Utc> {
    Utc::now() + Duration::hours(hours)
}
