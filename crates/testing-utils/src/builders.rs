//! 测试数据构建器
//!
//! 提供带合理默认值的构建器，测试只覆盖自己关心的字段。

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use volunteer_domain::entities::{
    Assignment, AssignmentStatus, ComplianceStatus, PipelineStage, Prospect, Task, TaskPriority,
    TaskStatus, Volunteer,
};
use volunteer_domain::value_objects::{DayPart, TimeWindow};

/// 测试常用的固定时间点：2024-07-20（周六）10:00 UTC
pub fn saturday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, 20, 10, 0, 0).unwrap()
}

/// 志愿者构建器
pub struct VolunteerBuilder {
    volunteer: Volunteer,
}

impl VolunteerBuilder {
    pub fn new() -> Self {
        Self {
            volunteer: Volunteer {
                id: 1,
                name: "测试志愿者".to_string(),
                contact: "volunteer@example.com".to_string(),
                skills: HashSet::new(),
                availability: HashMap::new(),
                reliability_score: 80,
                compliance_status: ComplianceStatus::Cleared,
                active: true,
                origin_prospect_id: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.volunteer.id = id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.volunteer.name = name.to_string();
        self
    }

    pub fn with_skills(mut self, skills: &[&str]) -> Self {
        self.volunteer.skills = skills.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_reliability(mut self, score: i32) -> Self {
        self.volunteer.reliability_score = score;
        self
    }

    pub fn with_compliance(mut self, status: ComplianceStatus) -> Self {
        self.volunteer.compliance_status = status;
        self
    }

    pub fn available_on(mut self, date: NaiveDate, part: DayPart) -> Self {
        self.volunteer.set_availability(date, part, true);
        self
    }

    /// 对某个时间窗触及的全部时段标记可用
    pub fn available_for(mut self, window: &TimeWindow) -> Self {
        for (date, part) in window.day_parts() {
            self.volunteer.set_availability(date, part, true);
        }
        self
    }

    pub fn inactive(mut self) -> Self {
        self.volunteer.active = false;
        self
    }

    pub fn build(self) -> Volunteer {
        self.volunteer
    }
}

impl Default for VolunteerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 任务构建器
pub struct TaskBuilder {
    task: Task,
}

impl TaskBuilder {
    pub fn new() -> Self {
        Self {
            task: Task {
                id: 1,
                title: "测试任务".to_string(),
                required_skills: HashSet::new(),
                window: TimeWindow {
                    start: saturday_morning(),
                    duration_minutes: 90,
                },
                location: "三号场地".to_string(),
                priority: TaskPriority::Medium,
                volunteers_needed: 1,
                status: TaskStatus::Open,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.task.id = id;
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.task.title = title.to_string();
        self
    }

    pub fn with_required_skills(mut self, skills: &[&str]) -> Self {
        self.task.required_skills = skills.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_window(mut self, start: DateTime<Utc>, duration_minutes: i64) -> Self {
        self.task.window = TimeWindow {
            start,
            duration_minutes,
        };
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn with_volunteers_needed(mut self, needed: i32) -> Self {
        self.task.volunteers_needed = needed;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.task.status = status;
        self
    }

    pub fn build(self) -> Task {
        self.task
    }
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 分配构建器
pub struct AssignmentBuilder {
    assignment: Assignment,
}

impl AssignmentBuilder {
    pub fn new() -> Self {
        Self {
            assignment: Assignment {
                id: 1,
                task_id: 1,
                volunteer_id: 1,
                status: AssignmentStatus::Pending,
                match_score: 80,
                note: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.assignment.id = id;
        self
    }

    pub fn with_task(mut self, task_id: i64) -> Self {
        self.assignment.task_id = task_id;
        self
    }

    pub fn with_volunteer(mut self, volunteer_id: i64) -> Self {
        self.assignment.volunteer_id = volunteer_id;
        self
    }

    pub fn with_status(mut self, status: AssignmentStatus) -> Self {
        self.assignment.status = status;
        self
    }

    pub fn with_match_score(mut self, score: i32) -> Self {
        self.assignment.match_score = score;
        self
    }

    pub fn build(self) -> Assignment {
        self.assignment
    }
}

impl Default for AssignmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 招募候选人构建器
pub struct ProspectBuilder {
    prospect: Prospect,
}

impl ProspectBuilder {
    pub fn new() -> Self {
        let now = Utc::now();
        let mut stage_entered_at = HashMap::new();
        stage_entered_at.insert(PipelineStage::Interested, now);
        Self {
            prospect: Prospect {
                id: 1,
                name: "测试候选人".to_string(),
                contact: "prospect@example.com".to_string(),
                skills: HashSet::new(),
                stage: PipelineStage::Interested,
                stage_entered_at,
                rejected: false,
                rejected_at_stage: None,
                volunteer_id: None,
                created_at: now,
                updated_at: now,
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.prospect.id = id;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.prospect.name = name.to_string();
        self
    }

    pub fn with_skills(mut self, skills: &[&str]) -> Self {
        self.prospect.skills = skills.iter().map(|s| s.to_string()).collect();
        self
    }

    /// 直接置于某阶段，并补齐之前所有阶段的进入时间
    pub fn at_stage(mut self, stage: PipelineStage) -> Self {
        let now = Utc::now();
        for s in PipelineStage::ALL {
            if s.order() <= stage.order() {
                self.prospect.stage_entered_at.entry(s).or_insert(now);
            }
        }
        self.prospect.stage = stage;
        self
    }

    pub fn build(self) -> Prospect {
        self.prospect
    }
}

impl Default for ProspectBuilder {
    fn default() -> Self {
        Self::new()
    }
}
