//! 内存仓储实现
//!
//! 使用 `tokio::sync::RwLock` 保护的 HashMap 存储各聚合，id 由仓储内部
//! 的序列分配。引擎读多写少，读路径只持读锁。

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use volunteer_core::EngineResult;
use volunteer_domain::entities::{
    Assignment, Conflict, ConflictKind, Prospect, Task, TaskStatus, Volunteer,
};
use volunteer_domain::repositories::{
    AssignmentRepository, ConflictRepository, ProspectRepository, TaskRepository,
    VolunteerRepository,
};

/// 内存志愿者仓储
#[derive(Debug, Default)]
pub struct InMemoryVolunteerRepository {
    volunteers: RwLock<HashMap<i64, Volunteer>>,
    next_id: AtomicI64,
}

impl InMemoryVolunteerRepository {
    pub fn new() -> Self {
        Self {
            volunteers: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl VolunteerRepository for InMemoryVolunteerRepository {
    async fn create(&self, volunteer: &Volunteer) -> EngineResult<Volunteer> {
        let mut volunteers = self.volunteers.write().await;
        let mut stored = volunteer.clone();
        stored.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        volunteers.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: i64) -> EngineResult<Option<Volunteer>> {
        Ok(self.volunteers.read().await.get(&id).cloned())
    }

    async fn update(&self, volunteer: &Volunteer) -> EngineResult<()> {
        let mut volunteers = self.volunteers.write().await;
        volunteers.insert(volunteer.id, volunteer.clone());
        Ok(())
    }

    async fn list_all(&self) -> EngineResult<Vec<Volunteer>> {
        let mut all: Vec<Volunteer> = self.volunteers.read().await.values().cloned().collect();
        all.sort_by_key(|v| v.id);
        Ok(all)
    }

    async fn list_active(&self) -> EngineResult<Vec<Volunteer>> {
        let mut active: Vec<Volunteer> = self
            .volunteers
            .read()
            .await
            .values()
            .filter(|v| v.active)
            .cloned()
            .collect();
        active.sort_by_key(|v| v.id);
        Ok(active)
    }
}

/// 内存任务仓储
#[derive(Debug, Default)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<HashMap<i64, Task>>,
    next_id: AtomicI64,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create(&self, task: &Task) -> EngineResult<Task> {
        let mut tasks = self.tasks.write().await;
        let mut stored = task.clone();
        stored.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        tasks.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: i64) -> EngineResult<Option<Task>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn update(&self, task: &Task) -> EngineResult<()> {
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn list(&self, status: Option<TaskStatus>) -> EngineResult<Vec<Task>> {
        let mut filtered: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        filtered.sort_by_key(|t| t.id);
        Ok(filtered)
    }
}

/// 内存分配仓储
#[derive(Debug, Default)]
pub struct InMemoryAssignmentRepository {
    assignments: RwLock<HashMap<i64, Assignment>>,
    next_id: AtomicI64,
}

impl InMemoryAssignmentRepository {
    pub fn new() -> Self {
        Self {
            assignments: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryAssignmentRepository {
    async fn create(&self, assignment: &Assignment) -> EngineResult<Assignment> {
        let mut assignments = self.assignments.write().await;
        let mut stored = assignment.clone();
        stored.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        assignments.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: i64) -> EngineResult<Option<Assignment>> {
        Ok(self.assignments.read().await.get(&id).cloned())
    }

    async fn update(&self, assignment: &Assignment) -> EngineResult<()> {
        let mut assignments = self.assignments.write().await;
        assignments.insert(assignment.id, assignment.clone());
        Ok(())
    }

    async fn list_by_task(&self, task_id: i64) -> EngineResult<Vec<Assignment>> {
        let mut hits: Vec<Assignment> = self
            .assignments
            .read()
            .await
            .values()
            .filter(|a| a.task_id == task_id)
            .cloned()
            .collect();
        hits.sort_by_key(|a| a.id);
        Ok(hits)
    }

    async fn list_by_volunteer(&self, volunteer_id: i64) -> EngineResult<Vec<Assignment>> {
        let mut hits: Vec<Assignment> = self
            .assignments
            .read()
            .await
            .values()
            .filter(|a| a.volunteer_id == volunteer_id)
            .cloned()
            .collect();
        hits.sort_by_key(|a| a.id);
        Ok(hits)
    }

    async fn list_all(&self) -> EngineResult<Vec<Assignment>> {
        let mut all: Vec<Assignment> = self.assignments.read().await.values().cloned().collect();
        all.sort_by_key(|a| a.id);
        Ok(all)
    }
}

/// 内存冲突仓储
#[derive(Debug, Default)]
pub struct InMemoryConflictRepository {
    conflicts: RwLock<HashMap<i64, Conflict>>,
    next_id: AtomicI64,
}

impl InMemoryConflictRepository {
    pub fn new() -> Self {
        Self {
            conflicts: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl ConflictRepository for InMemoryConflictRepository {
    async fn create(&self, conflict: &Conflict) -> EngineResult<Conflict> {
        let mut conflicts = self.conflicts.write().await;
        let mut stored = conflict.clone();
        stored.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        conflicts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: i64) -> EngineResult<Option<Conflict>> {
        Ok(self.conflicts.read().await.get(&id).cloned())
    }

    async fn update(&self, conflict: &Conflict) -> EngineResult<()> {
        let mut conflicts = self.conflicts.write().await;
        conflicts.insert(conflict.id, conflict.clone());
        Ok(())
    }

    async fn list(&self, resolved: Option<bool>) -> EngineResult<Vec<Conflict>> {
        let mut filtered: Vec<Conflict> = self
            .conflicts
            .read()
            .await
            .values()
            .filter(|c| resolved.map_or(true, |r| c.resolved == r))
            .cloned()
            .collect();
        filtered.sort_by_key(|c| c.id);
        Ok(filtered)
    }

    async fn find_open_matching(
        &self,
        kind: ConflictKind,
        task_ids: &[i64],
        volunteer_ids: &[i64],
    ) -> EngineResult<Option<Conflict>> {
        let conflicts = self.conflicts.read().await;
        Ok(conflicts
            .values()
            .filter(|c| !c.resolved && c.kind == kind)
            .find(|c| {
                let mut a = c.task_ids.clone();
                let mut b = task_ids.to_vec();
                a.sort_unstable();
                b.sort_unstable();
                let mut x = c.volunteer_ids.clone();
                let mut y = volunteer_ids.to_vec();
                x.sort_unstable();
                y.sort_unstable();
                a == b && x == y
            })
            .cloned())
    }
}

/// 内存招募候选人仓储
#[derive(Debug, Default)]
pub struct InMemoryProspectRepository {
    prospects: RwLock<HashMap<i64, Prospect>>,
    next_id: AtomicI64,
}

impl InMemoryProspectRepository {
    pub fn new() -> Self {
        Self {
            prospects: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl ProspectRepository for InMemoryProspectRepository {
    async fn create(&self, prospect: &Prospect) -> EngineResult<Prospect> {
        let mut prospects = self.prospects.write().await;
        let mut stored = prospect.clone();
        stored.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        prospects.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: i64) -> EngineResult<Option<Prospect>> {
        Ok(self.prospects.read().await.get(&id).cloned())
    }

    async fn update(&self, prospect: &Prospect) -> EngineResult<()> {
        let mut prospects = self.prospects.write().await;
        prospects.insert(prospect.id, prospect.clone());
        Ok(())
    }

    async fn list_all(&self) -> EngineResult<Vec<Prospect>> {
        let mut all: Vec<Prospect> = self.prospects.read().await.values().cloned().collect();
        all.sort_by_key(|p| p.id);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;
    use volunteer_domain::entities::{ComplianceStatus, ConflictSeverity};
    use volunteer_domain::value_objects::TimeWindow;

    fn sample_volunteer() -> Volunteer {
        Volunteer {
            id: 0,
            name: "张三".to_string(),
            contact: "zhangsan@example.com".to_string(),
            skills: HashSet::new(),
            availability: HashMap::new(),
            reliability_score: 80,
            compliance_status: ComplianceStatus::Cleared,
            active: true,
            origin_prospect_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_volunteer_ids_are_sequential() {
        let repo = InMemoryVolunteerRepository::new();
        let a = repo.create(&sample_volunteer()).await.unwrap();
        let b = repo.create(&sample_volunteer()).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(repo.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_active_filters_deactivated() {
        let repo = InMemoryVolunteerRepository::new();
        let a = repo.create(&sample_volunteer()).await.unwrap();
        let mut b = repo.create(&sample_volunteer()).await.unwrap();
        b.active = false;
        repo.update(&b).await.unwrap();
        let active = repo.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, a.id);
    }

    #[tokio::test]
    async fn test_conflict_dedup_lookup_ignores_order() {
        let repo = InMemoryConflictRepository::new();
        let conflict = Conflict {
            id: 0,
            kind: ConflictKind::VolunteerDoubleBooked,
            severity: ConflictSeverity::High,
            task_ids: vec![2, 1],
            volunteer_ids: vec![7],
            assignment_ids: vec![3, 4],
            resolved: false,
            resolution_note: None,
            detected_at: Utc::now(),
        };
        repo.create(&conflict).await.unwrap();

        let hit = repo
            .find_open_matching(ConflictKind::VolunteerDoubleBooked, &[1, 2], &[7])
            .await
            .unwrap();
        assert!(hit.is_some());

        let miss = repo
            .find_open_matching(ConflictKind::TaskUnderstaffed, &[1, 2], &[7])
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_task_list_filters_by_status() {
        let repo = InMemoryTaskRepository::new();
        let window = TimeWindow::new(Utc::now(), 60).unwrap();
        let task = Task {
            id: 0,
            title: "器材布置".to_string(),
            required_skills: HashSet::new(),
            window,
            location: "主场地".to_string(),
            priority: volunteer_domain::entities::TaskPriority::Medium,
            volunteers_needed: 2,
            status: TaskStatus::Open,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let mut cancelled = task.clone();
        cancelled.status = TaskStatus::Cancelled;
        repo.create(&task).await.unwrap();
        repo.create(&cancelled).await.unwrap();

        assert_eq!(repo.list(Some(TaskStatus::Open)).await.unwrap().len(), 1);
        assert_eq!(repo.list(None).await.unwrap().len(), 2);
    }
}
