//! Weekly calendar layout.
//!
//! Turns every (course, schedule) pair into a block positioned on a
//! Monday-Friday grid. Blocks in the same column are not collision-checked:
//! overlapping meetings overlap on screen. Weekend meetings are collected
//! but never placed, since the grid has no weekend columns.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use crate::models::CourseWithSchedules;
use crate::schedule::day_name;
use crate::time_utils::time_to_minutes;

/// Weekday columns rendered by the grid (1 = Monday .. 5 = Friday).
pub const GRID_DAYS: std::ops::RangeInclusive<u8> = 1..=5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarLayout {
    pub window_start_hour: u32,
    pub window_end_hour: u32,
    /// Height of one hour slot; pixels per minute is this over 60.
    pub hour_height_px: f64,
}

impl Default for CalendarLayout {
    fn default() -> Self {
        Self {
            window_start_hour: 8,
            window_end_hour: 19,
            hour_height_px: 80.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CalendarEvent<'a> {
    pub course: &'a CourseWithSchedules,
    pub day_of_week: u8,
    pub start_minutes: i32,
    pub duration_minutes: i32,
    pub location: &'a str,
    pub is_enrolled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventBlock {
    pub course_id: Uuid,
    pub code: String,
    pub title: String,
    pub location: String,
    pub top: f64,
    pub height: f64,
    pub is_enrolled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayColumn {
    pub day_of_week: u8,
    pub day: &'static str,
    pub blocks: Vec<EventBlock>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekGrid {
    pub time_slots: Vec<String>,
    pub slot_height: f64,
    pub columns: Vec<DayColumn>,
}

/// Flattens courses into one event per schedule entry, all seven days included.
pub fn collect_events<'a>(
    courses: &'a [CourseWithSchedules],
    enrolled_course_ids: &HashSet<Uuid>,
) -> Vec<CalendarEvent<'a>> {
    courses
        .iter()
        .flat_map(|course| {
            let is_enrolled = enrolled_course_ids.contains(&course.id());
            course.course_schedules.iter().map(move |schedule| {
                let start_minutes = time_to_minutes(&schedule.start_time);
                let end_minutes = time_to_minutes(&schedule.end_time);
                CalendarEvent {
                    course,
                    day_of_week: schedule.day_of_week,
                    start_minutes,
                    duration_minutes: end_minutes - start_minutes,
                    location: &schedule.location,
                    is_enrolled,
                }
            })
        })
        .collect()
}

impl CalendarLayout {
    pub fn pixels_per_minute(&self) -> f64 {
        self.hour_height_px / 60.0
    }

    /// `(top, height)` in pixels. Events starting before the window get a
    /// negative `top`; nothing is clamped.
    pub fn position(&self, start_minutes: i32, duration_minutes: i32) -> (f64, f64) {
        let window_start = (self.window_start_hour * 60) as i32;
        let top = f64::from(start_minutes - window_start) * self.hour_height_px / 60.0;
        let height = f64::from(duration_minutes) * self.hour_height_px / 60.0;
        (top, height)
    }

    /// Hour labels for the left gutter: `08:00`, `09:00`, ... up to the last
    /// hour before the window end.
    pub fn time_slots(&self) -> Vec<String> {
        (self.window_start_hour..self.window_end_hour)
            .map(|hour| format!("{:02}:00", hour))
            .collect()
    }

    pub fn render(
        &self,
        courses: &[CourseWithSchedules],
        enrolled_course_ids: &HashSet<Uuid>,
    ) -> WeekGrid {
        let events = collect_events(courses, enrolled_course_ids);

        let columns = GRID_DAYS
            .map(|day_of_week| DayColumn {
                day_of_week,
                day: day_name(day_of_week),
                blocks: events
                    .iter()
                    .filter(|e| e.day_of_week == day_of_week)
                    .map(|e| self.block(e))
                    .collect(),
            })
            .collect();

        WeekGrid {
            time_slots: self.time_slots(),
            slot_height: self.hour_height_px,
            columns,
        }
    }

    fn block(&self, event: &CalendarEvent<'_>) -> EventBlock {
        let (top, height) = self.position(event.start_minutes, event.duration_minutes);
        EventBlock {
            course_id: event.course.id(),
            code: event.course.course.code.clone(),
            title: event.course.course.title.clone(),
            location: event.location.to_string(),
            top,
            height,
            is_enrolled: event.is_enrolled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Course, CourseSchedule};
    use chrono::Utc;

    fn course(code: &str, meetings: &[(u8, &str, &str)]) -> CourseWithSchedules {
        let id = Uuid::new_v4();
        CourseWithSchedules {
            course: Course {
                id,
                code: code.to_string(),
                title: format!("{} title", code),
                description: String::new(),
                instructor: String::new(),
                credits: 3,
                max_capacity: 10,
                created_at: Utc::now(),
            },
            course_schedules: meetings
                .iter()
                .map(|(day, start, end)| CourseSchedule {
                    id: Uuid::new_v4(),
                    course_id: id,
                    day_of_week: *day,
                    start_time: start.to_string(),
                    end_time: end.to_string(),
                    location: "Room 1".to_string(),
                    created_at: Utc::now(),
                })
                .collect(),
            enrollments: None,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn ninety_minute_block_after_window_start() {
        let layout = CalendarLayout::default();
        let (top, height) = layout.position(time_to_minutes("09:00"), 90);
        assert!(approx(top, 80.0), "top was {}", top);
        assert!(approx(height, 120.0), "height was {}", height);
        assert!(approx(layout.pixels_per_minute(), 80.0 / 60.0));
    }

    #[test]
    fn events_before_window_are_not_clamped() {
        let layout = CalendarLayout::default();
        let (top, _) = layout.position(time_to_minutes("07:30"), 60);
        assert!(approx(top, -40.0));
    }

    #[test]
    fn weekend_meetings_are_collected_but_not_placed() {
        let courses = vec![course("ART100", &[(0, "10:00", "11:00"), (6, "10:00", "11:00"), (2, "10:00", "11:00")])];
        let enrolled = HashSet::new();

        assert_eq!(collect_events(&courses, &enrolled).len(), 3);

        let grid = CalendarLayout::default().render(&courses, &enrolled);
        assert_eq!(grid.columns.len(), 5);
        let placed: usize = grid.columns.iter().map(|c| c.blocks.len()).sum();
        assert_eq!(placed, 1);
        assert_eq!(grid.columns[1].day, "Tuesday");
        assert_eq!(grid.columns[1].blocks.len(), 1);
    }

    #[test]
    fn overlapping_meetings_keep_their_positions() {
        let courses = vec![
            course("CS101", &[(1, "09:00", "10:00")]),
            course("CS102", &[(1, "09:30", "10:30")]),
        ];
        let enrolled: HashSet<Uuid> = [courses[1].id()].into_iter().collect();

        let grid = CalendarLayout::default().render(&courses, &enrolled);
        let monday = &grid.columns[0];

        assert_eq!(monday.blocks.len(), 2);
        assert!(approx(monday.blocks[0].top, 80.0));
        assert!(approx(monday.blocks[1].top, 120.0));
        assert!(!monday.blocks[0].is_enrolled);
        assert!(monday.blocks[1].is_enrolled);
    }

    #[test]
    fn time_slots_cover_the_window() {
        let slots = CalendarLayout::default().time_slots();
        assert_eq!(slots.len(), 11);
        assert_eq!(slots.first().map(String::as_str), Some("08:00"));
        assert_eq!(slots.last().map(String::as_str), Some("18:00"));
    }
}
