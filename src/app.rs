use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{error, info};

use volunteer_api::create_app;
use volunteer_core::AppConfig;
use volunteer_engine::{
    AssignmentManager, ConflictDetector, ConflictStateListener, ConflictSweepService,
    RecruitmentPipeline, VolunteerRegistry,
};
use volunteer_infrastructure::{
    EventBus, InMemoryAssignmentRepository, InMemoryConflictRepository,
    InMemoryProspectRepository, InMemoryTaskRepository, InMemoryVolunteerRepository,
    KeyedLockManager, LoggingNotifier, StaticComplianceProvider,
};

/// 主应用程序
///
/// 组装仓储、事件总线与各引擎服务，并托管冲突监听器、周期巡检和 API 服务器。
pub struct Application {
    config: AppConfig,
    manager: Arc<AssignmentManager>,
    registry: Arc<VolunteerRegistry>,
    detector: Arc<ConflictDetector>,
    pipeline: Arc<RecruitmentPipeline>,
    listener: ConflictStateListener,
    sweep: ConflictSweepService,
    event_bus: EventBus,
}

impl Application {
    /// 创建新的应用实例
    pub fn new(config: AppConfig) -> Self {
        info!("初始化志愿者排班引擎");

        let volunteer_repo = Arc::new(InMemoryVolunteerRepository::new());
        let task_repo = Arc::new(InMemoryTaskRepository::new());
        let assignment_repo = Arc::new(InMemoryAssignmentRepository::new());
        let conflict_repo = Arc::new(InMemoryConflictRepository::new());
        let prospect_repo = Arc::new(InMemoryProspectRepository::new());

        let locks = Arc::new(KeyedLockManager::new());
        let event_bus = EventBus::new();
        let publisher = Arc::new(event_bus.publisher.clone());
        let notifier = Arc::new(LoggingNotifier::new());
        let compliance = Arc::new(StaticComplianceProvider::new());

        let manager = Arc::new(AssignmentManager::new(
            task_repo.clone(),
            volunteer_repo.clone(),
            assignment_repo.clone(),
            locks.clone(),
            publisher.clone(),
            notifier,
            config.matcher.clone(),
            config.assignment.clone(),
        ));

        let registry = Arc::new(VolunteerRegistry::new(
            volunteer_repo.clone(),
            locks,
            publisher.clone(),
            config.pipeline.initial_reliability,
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

        let pipeline = Arc::new(RecruitmentPipeline::new(
            prospect_repo,
            volunteer_repo,
            publisher,
            config.pipeline.initial_reliability,
        ));

        let listener = ConflictStateListener::new(detector.clone());
        let sweep = ConflictSweepService::new(
            registry.clone(),
            detector.clone(),
            compliance,
            config.conflict.clone(),
        );

        Self {
            config,
            manager,
            registry,
            detector,
            pipeline,
            listener,
            sweep,
            event_bus,
        }
    }

    /// 运行应用程序，收到关闭信号后停止全部后台服务
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let Self {
            config,
            manager,
            registry,
            detector,
            pipeline,
            mut listener,
            mut sweep,
            event_bus,
        } = self;

        listener.start(event_bus.receiver);
        sweep.start();

        let server_handle = if config.api.enabled {
            let bind_address = config.api.bind_address.clone();
            info!("启动API服务器: {}", bind_address);

            let app = create_app(manager, registry, detector, pipeline, &config.api);
            let tcp_listener = TcpListener::bind(&bind_address)
                .await
                .with_context(|| format!("绑定地址失败: {bind_address}"))?;

            info!("API服务器启动在 http://{}", bind_address);

            Some(tokio::spawn(async move {
                if let Err(e) = axum::serve(tcp_listener, app.into_make_service()).await {
                    error!("API服务器运行失败: {}", e);
                }
            }))
        } else {
            info!("API服务器被禁用");
            None
        };

        let _ = shutdown_rx.recv().await;
        info!("应用收到关闭信号");

        if let Some(handle) = server_handle {
            handle.abort();
            info!("API服务器已停止");
        }
        sweep.stop().await;
        listener.stop().await;

        info!("全部后台服务已停止");
        Ok(())
    }
}
