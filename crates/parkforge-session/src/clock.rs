//! Human-readable time formatting for live timers and finish times.

use std::time::Duration;

/// Formats whole seconds as `HH:MM:SS`. Negative values clamp to zero,
/// which is what a countdown shows once it has run out.
pub fn format_clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Formats a finish time as `HH:MM:SS.mmm`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60,
        duration.subsec_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock_pads_fields() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(65), "00:01:05");
        assert_eq!(format_clock(3_725), "01:02:05");
    }

    #[test]
    fn test_format_clock_negative_clamps_to_zero() {
        assert_eq!(format_clock(-4), "00:00:00");
    }

    #[test]
    fn test_format_duration_includes_millis() {
        assert_eq!(format_duration(Duration::from_millis(61_042)), "00:01:01.042");
    }
}
