//! 值对象：时段与任务时间窗

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use volunteer_core::{EngineError, EngineResult};

/// 一天中的时段
///
/// 志愿者可用性按 日期 + 时段 粒度记录。划分规则：
/// 12:00 之前为 Morning，12:00-18:00 为 Afternoon，18:00 之后为 Evening。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DayPart {
    #[serde(rename = "MORNING")]
    Morning,
    #[serde(rename = "AFTERNOON")]
    Afternoon,
    #[serde(rename = "EVENING")]
    Evening,
}

impl DayPart {
    pub fn of_hour(hour: u32) -> Self {
        if hour < 12 {
            DayPart::Morning
        } else if hour < 18 {
            DayPart::Afternoon
        } else {
            DayPart::Evening
        }
    }

    /// 当前时段在当天的结束小时（开区间上界）
    fn end_hour(&self) -> u32 {
        match self {
            DayPart::Morning => 12,
            DayPart::Afternoon => 18,
            DayPart::Evening => 24,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayPart::Morning => "MORNING",
            DayPart::Afternoon => "AFTERNOON",
            DayPart::Evening => "EVENING",
        }
    }
}

impl std::fmt::Display for DayPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 任务时间窗：开始时间 + 持续分钟数
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl TimeWindow {
    /// 构造时间窗，持续时间必须为正
    pub fn new(start: DateTime<Utc>, duration_minutes: i64) -> EngineResult<Self> {
        if duration_minutes <= 0 {
            return Err(EngineError::invalid_spec(format!(
                "时间窗结束不能早于开始: 持续{duration_minutes}分钟"
            )));
        }
        Ok(Self {
            start,
            duration_minutes,
        })
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(self.duration_minutes)
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start <= now
    }

    /// 是否在 `lead` 时间内即将开始（尚未开始）
    pub fn starts_within(&self, now: DateTime<Utc>, lead: Duration) -> bool {
        self.start > now && self.start - now <= lead
    }

    /// 时间窗触及的全部 日期+时段 槽位，按时间顺序去重
    ///
    /// 志愿者必须对其中每一个槽位都标记可用才算满足可用性。
    pub fn day_parts(&self) -> Vec<(NaiveDate, DayPart)> {
        let mut slots = Vec::new();
        let end = self.end();
        let mut current = self.start;
        while current < end {
            let date = current.date_naive();
            let part = DayPart::of_hour(current.hour());
            slots.push((date, part));
            // 跳到下一时段边界
            let boundary_hour = part.end_hour();
            let next = if boundary_hour == 24 {
                (date + Duration::days(1)).and_hms_opt(0, 0, 0)
            } else {
                date.and_hms_opt(boundary_hour, 0, 0)
            };
            match next {
                Some(naive) => current = naive.and_utc(),
                None => break,
            }
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_zero_duration_rejected() {
        assert!(TimeWindow::new(at(2024, 7, 20, 10, 0), 0).is_err());
        assert!(TimeWindow::new(at(2024, 7, 20, 10, 0), -30).is_err());
    }

    #[test]
    fn test_overlap_detection() {
        let a = TimeWindow::new(at(2024, 7, 20, 10, 0), 60).unwrap();
        let b = TimeWindow::new(at(2024, 7, 20, 10, 30), 60).unwrap();
        let c = TimeWindow::new(at(2024, 7, 20, 11, 0), 60).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        // 首尾相接不算重叠
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_day_parts_single_slot() {
        let w = TimeWindow::new(at(2024, 7, 20, 10, 0), 90).unwrap();
        assert_eq!(
            w.day_parts(),
            vec![(
                NaiveDate::from_ymd_opt(2024, 7, 20).unwrap(),
                DayPart::Morning
            )]
        );
    }

    #[test]
    fn test_day_parts_crossing_noon() {
        // 11:30 开始 90 分钟，跨越中午边界
        let w = TimeWindow::new(at(2024, 7, 20, 11, 30), 90).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 7, 20).unwrap();
        assert_eq!(
            w.day_parts(),
            vec![(date, DayPart::Morning), (date, DayPart::Afternoon)]
        );
    }

    #[test]
    fn test_day_parts_crossing_midnight() {
        let w = TimeWindow::new(at(2024, 7, 20, 23, 0), 120).unwrap();
        assert_eq!(
            w.day_parts(),
            vec![
                (
                    NaiveDate::from_ymd_opt(2024, 7, 20).unwrap(),
                    DayPart::Evening
                ),
                (
                    NaiveDate::from_ymd_opt(2024, 7, 21).unwrap(),
                    DayPart::Morning
                ),
            ]
        );
    }

    #[test]
    fn test_starts_within() {
        let now = at(2024, 7, 19, 10, 0);
        let w = TimeWindow::new(at(2024, 7, 20, 10, 0), 60).unwrap();
        assert!(w.starts_within(now, Duration::hours(48)));
        assert!(!w.starts_within(now, Duration::hours(12)));
        // 已开始的任务不算"即将开始"
        assert!(!w.starts_within(at(2024, 7, 20, 10, 30), Duration::hours(48)));
    }
}
