//! 任务与分配状态机的端到端测试

mod common;

use common::{drain_events, engine, seed_volunteer, task_spec, window_in};

use volunteer_core::EngineError;
use volunteer_domain::entities::{AssignmentStatus, ComplianceStatus, TaskStatus};
use volunteer_domain::events::EngineEvent;
use volunteer_testing_utils::VolunteerBuilder;

#[tokio::test]
async fn test_capacity_never_exceeded() {
    let engine = engine();
    let window = window_in(72, 120);
    let task = engine
        .manager
        .create_task(task_spec("赛事检录", window, 2))
        .await
        .unwrap();

    let mut ids = Vec::new();
    for name in ["甲", "乙", "丙"] {
        let v = seed_volunteer(
            &engine,
            VolunteerBuilder::new()
                .with_name(name)
                .available_for(&window)
                .build(),
        )
        .await;
        ids.push(v.id);
    }

    engine.manager.create_assignment(task.id, ids[0]).await.unwrap();
    engine.manager.create_assignment(task.id, ids[1]).await.unwrap();
    // 名额已占满（Pending 也占名额），第三人被拒
    let err = engine.manager.create_assignment(task.id, ids[2]).await.unwrap_err();
    assert!(matches!(err, EngineError::CapacityExceeded { task_id } if task_id == task.id));
}

#[tokio::test]
async fn test_duplicate_assignment_rejected() {
    let engine = engine();
    let window = window_in(72, 90);
    let task = engine
        .manager
        .create_task(task_spec("器材搬运", window, 3))
        .await
        .unwrap();
    let v = seed_volunteer(
        &engine,
        VolunteerBuilder::new().available_for(&window).build(),
    )
    .await;

    engine.manager.create_assignment(task.id, v.id).await.unwrap();
    let err = engine.manager.create_assignment(task.id, v.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidSpec(_)));
}

#[tokio::test]
async fn test_compliance_blocks_create_and_confirm() {
    let engine = engine();
    let window = window_in(72, 90);
    let task = engine
        .manager
        .create_task(task_spec("医疗点值守", window, 2))
        .await
        .unwrap();

    // Flagged 在创建分配时即被拒
    let flagged = seed_volunteer(
        &engine,
        VolunteerBuilder::new()
            .with_compliance(ComplianceStatus::Flagged)
            .available_for(&window)
            .build(),
    )
    .await;
    let err = engine
        .manager
        .create_assignment(task.id, flagged.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ComplianceBlocked { .. }));

    // Pending 可以创建分配；确认前证书过期则确认被拒
    let pending = seed_volunteer(
        &engine,
        VolunteerBuilder::new()
            .with_compliance(ComplianceStatus::Pending)
            .available_for(&window)
            .build(),
    )
    .await;
    let assignment = engine
        .manager
        .create_assignment(task.id, pending.id)
        .await
        .unwrap();
    engine
        .registry
        .set_compliance_status(pending.id, ComplianceStatus::Expired)
        .await
        .unwrap();
    let err = engine
        .manager
        .transition_assignment(assignment.id, AssignmentStatus::Confirmed, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ComplianceBlocked { .. }));
}

#[tokio::test]
async fn test_task_status_tracks_confirmed_count() {
    let mut engine = engine();
    let window = window_in(72, 90);
    let task = engine
        .manager
        .create_task(task_spec("计分台", window, 2))
        .await
        .unwrap();
    assert_eq!(task.status, TaskStatus::Open);

    let mut assignments = Vec::new();
    for name in ["甲", "乙"] {
        let v = seed_volunteer(
            &engine,
            VolunteerBuilder::new()
                .with_name(name)
                .available_for(&window)
                .build(),
        )
        .await;
        assignments.push(engine.manager.create_assignment(task.id, v.id).await.unwrap());
    }
    // Pending 占名额但不计入确认数
    assert_eq!(engine.manager.get_task(task.id).await.unwrap().status, TaskStatus::Open);

    engine
        .manager
        .transition_assignment(assignments[0].id, AssignmentStatus::Confirmed, None)
        .await
        .unwrap();
    assert_eq!(
        engine.manager.get_task(task.id).await.unwrap().status,
        TaskStatus::PartiallyFilled
    );

    engine
        .manager
        .transition_assignment(assignments[1].id, AssignmentStatus::Confirmed, None)
        .await
        .unwrap();
    assert_eq!(
        engine.manager.get_task(task.id).await.unwrap().status,
        TaskStatus::Filled
    );

    // 任务未开始时 NoShow 导致 Filled 回退，并发布状态变更事件
    drain_events(&mut engine.receiver);
    engine
        .manager
        .transition_assignment(assignments[0].id, AssignmentStatus::NoShow, None)
        .await
        .unwrap();
    assert_eq!(
        engine.manager.get_task(task.id).await.unwrap().status,
        TaskStatus::PartiallyFilled
    );
    let regression = drain_events(&mut engine.receiver).into_iter().any(|e| {
        matches!(
            e,
            EngineEvent::TaskStatusChanged {
                from: TaskStatus::Filled,
                to: TaskStatus::PartiallyFilled,
                ..
            }
        )
    });
    assert!(regression, "Filled 回退应发布状态变更事件");
}

#[tokio::test]
async fn test_reliability_settlement_is_asymmetric() {
    let engine = engine();
    let window = window_in(72, 90);
    let task = engine
        .manager
        .create_task(task_spec("颁奖礼仪", window, 2))
        .await
        .unwrap();

    let completer = seed_volunteer(
        &engine,
        VolunteerBuilder::new()
            .with_name("完成者")
            .with_reliability(80)
            .available_for(&window)
            .build(),
    )
    .await;
    let absentee = seed_volunteer(
        &engine,
        VolunteerBuilder::new()
            .with_name("缺席者")
            .with_reliability(80)
            .available_for(&window)
            .build(),
    )
    .await;

    for (volunteer_id, terminal) in [
        (completer.id, AssignmentStatus::Completed),
        (absentee.id, AssignmentStatus::NoShow),
    ] {
        let a = engine.manager.create_assignment(task.id, volunteer_id).await.unwrap();
        engine
            .manager
            .transition_assignment(a.id, AssignmentStatus::Confirmed, None)
            .await
            .unwrap();
        engine
            .manager
            .transition_assignment(a.id, terminal, None)
            .await
            .unwrap();
    }

    // 默认配置：完成 +3，缺席 -8
    let completer = engine.registry.get_volunteer(completer.id).await.unwrap();
    assert_eq!(completer.reliability_score, 83);
    let absentee = engine.registry.get_volunteer(absentee.id).await.unwrap();
    assert_eq!(absentee.reliability_score, 72);
}

#[tokio::test]
async fn test_invalid_transitions_rejected() {
    let engine = engine();
    let window = window_in(72, 90);
    let task = engine
        .manager
        .create_task(task_spec("引导签到", window, 1))
        .await
        .unwrap();
    let v = seed_volunteer(
        &engine,
        VolunteerBuilder::new().available_for(&window).build(),
    )
    .await;
    let a = engine.manager.create_assignment(task.id, v.id).await.unwrap();

    // Pending 不能直接完成
    let err = engine
        .manager
        .transition_assignment(a.id, AssignmentStatus::Completed, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));

    // Declined 是终态
    engine
        .manager
        .transition_assignment(a.id, AssignmentStatus::Declined, None)
        .await
        .unwrap();
    let err = engine
        .manager
        .transition_assignment(a.id, AssignmentStatus::Confirmed, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_cancel_cascades_to_assignments() {
    let engine = engine();
    let window = window_in(72, 90);
    let task = engine
        .manager
        .create_task(task_spec("饮水补给", window, 2))
        .await
        .unwrap();

    let v1 = seed_volunteer(
        &engine,
        VolunteerBuilder::new().with_name("甲").available_for(&window).build(),
    )
    .await;
    let v2 = seed_volunteer(
        &engine,
        VolunteerBuilder::new().with_name("乙").available_for(&window).build(),
    )
    .await;
    let a1 = engine.manager.create_assignment(task.id, v1.id).await.unwrap();
    let a2 = engine.manager.create_assignment(task.id, v2.id).await.unwrap();
    engine
        .manager
        .transition_assignment(a2.id, AssignmentStatus::Confirmed, None)
        .await
        .unwrap();

    let cancelled = engine.manager.cancel_task(task.id).await.unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    for id in [a1.id, a2.id] {
        let a = engine.manager.get_assignment(id).await.unwrap();
        assert_eq!(a.status, AssignmentStatus::Declined);
    }

    // 已取消的任务拒绝新分配与再次取消
    let err = engine.manager.create_assignment(task.id, v1.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidSpec(_)));
    let err = engine.manager.cancel_task(task.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_list_tasks_reports_confirmed_count() {
    let engine = engine();
    let window = window_in(72, 90);
    let task = engine
        .manager
        .create_task(task_spec("检录", window, 2))
        .await
        .unwrap();
    let v = seed_volunteer(
        &engine,
        VolunteerBuilder::new().available_for(&window).build(),
    )
    .await;
    let a = engine.manager.create_assignment(task.id, v.id).await.unwrap();
    engine
        .manager
        .transition_assignment(a.id, AssignmentStatus::Confirmed, None)
        .await
        .unwrap();

    let overviews = engine
        .manager
        .list_tasks(Some(TaskStatus::PartiallyFilled))
        .await
        .unwrap();
    assert_eq!(overviews.len(), 1);
    assert_eq!(overviews[0].task.id, task.id);
    assert_eq!(overviews[0].confirmed_count, 1);

    let empty = engine.manager.list_tasks(Some(TaskStatus::Filled)).await.unwrap();
    assert!(empty.is_empty());
}
