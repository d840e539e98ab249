use serde::Serialize;

use crate::models::CourseSchedule;
use crate::time_utils::format_display_time;

pub const DAYS_FULL: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

pub const DAYS_SHORT: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub fn day_name(day_of_week: u8) -> &'static str {
    DAYS_FULL.get(day_of_week as usize).copied().unwrap_or("Unknown")
}

pub fn day_short_name(day_of_week: u8) -> &'static str {
    DAYS_SHORT.get(day_of_week as usize).copied().unwrap_or("?")
}

/// Schedules of a single weekday, in the order they were given.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup<'a> {
    pub day: &'static str,
    pub schedules: Vec<&'a CourseSchedule>,
}

/// Groups schedules by weekday name. Days appear in first-seen order and
/// schedules keep their input order within a day; nothing is sorted.
pub fn group_by_day(schedules: &[CourseSchedule]) -> Vec<DayGroup<'_>> {
    let mut groups: Vec<DayGroup<'_>> = Vec::new();

    for schedule in schedules {
        let day = day_name(schedule.day_of_week);
        match groups.iter_mut().find(|g| g.day == day) {
            Some(group) => group.schedules.push(schedule),
            None => groups.push(DayGroup {
                day,
                schedules: vec![schedule],
            }),
        }
    }

    groups
}

/// One-line summary used on catalog cards, e.g. `Mon 9:00 AM, Wed 9:00 AM`.
pub fn schedule_summary(schedules: &[CourseSchedule]) -> String {
    schedules
        .iter()
        .map(|s| {
            format!(
                "{} {}",
                day_short_name(s.day_of_week),
                format_display_time(&s.start_time)
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Serializable form of a [`DayGroup`] for the detail panel.
#[derive(Debug, Clone, Serialize)]
pub struct DaySchedule {
    pub day: String,
    pub sessions: Vec<SessionTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionTime {
    pub start: String,
    pub end: String,
    pub location: String,
}

impl From<DayGroup<'_>> for DaySchedule {
    fn from(group: DayGroup<'_>) -> Self {
        Self {
            day: group.day.to_string(),
            sessions: group
                .schedules
                .into_iter()
                .map(|s| SessionTime {
                    start: format_display_time(&s.start_time),
                    end: format_display_time(&s.end_time),
                    location: s.location.clone(),
                })
                .collect(),
        }
    }
}
