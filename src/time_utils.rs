//! Helpers for the 24-hour `HH:MM` times stored on course schedules.

/// Minutes since midnight for an `HH:MM` (or `HH:MM:SS`) string.
///
/// Input is not validated; unparsable components count as zero.
pub fn time_to_minutes(time: &str) -> i32 {
    let mut parts = time.split(':');
    let hours = parse_component(parts.next());
    let minutes = parse_component(parts.next());
    hours * 60 + minutes
}

/// `"13:05"` -> `"1:05 PM"`. Hours 0 and 12 both display as 12.
pub fn format_display_time(time: &str) -> String {
    let mut parts = time.split(':');
    let hour = parse_component(parts.next());
    let minutes = parts.next().unwrap_or("00");
    let ampm = if hour >= 12 { "PM" } else { "AM" };
    let display_hour = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:{} {}", display_hour, minutes, ampm)
}

fn parse_component(part: Option<&str>) -> i32 {
    part.and_then(|p| p.trim().parse::<i32>().ok()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_since_midnight() {
        assert_eq!(time_to_minutes("09:30"), 570);
        assert_eq!(time_to_minutes("00:00"), 0);
        assert_eq!(time_to_minutes("23:59"), 1439);
    }

    #[test]
    fn seconds_suffix_is_ignored() {
        assert_eq!(time_to_minutes("10:30:00"), 630);
        assert_eq!(format_display_time("10:30:00"), "10:30 AM");
    }

    #[test]
    fn twelve_hour_boundaries() {
        assert_eq!(format_display_time("00:00"), "12:00 AM");
        assert_eq!(format_display_time("12:00"), "12:00 PM");
        assert_eq!(format_display_time("13:05"), "1:05 PM");
        assert_eq!(format_display_time("23:59"), "11:59 PM");
        assert_eq!(format_display_time("09:15"), "9:15 AM");
    }
}
