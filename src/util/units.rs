//! Units formatting and conversion utilities
//!
//! Human-readable formatting of durations and loads, and duration parsing
//! for the command line.

use std::time::Duration;

/// Format duration into human-readable string
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use cpuload::util::units::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 3600 {
        let hours = total_secs / 3600;
        let minutes = (total_secs % 3600) / 60;
        let seconds = total_secs % 60;
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if total_secs >= 60 {
        let minutes = total_secs / 60;
        let seconds = total_secs % 60;
        format!("{}m {}s", minutes, seconds)
    } else if total_secs > 0 {
        if millis > 0 {
            format!("{}.{:02}s", total_secs, millis / 10)
        } else {
            format!("{}s", total_secs)
        }
    } else {
        format!("{}ms", millis)
    }
}

/// Format a run length, where `None` means until stopped
pub fn format_run_duration(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => format_duration(d),
        None => "until stopped".to_string(),
    }
}

/// Format a load fraction as a percentage
///
/// # Examples
/// ```
/// use cpuload::util::units::format_load;
///
/// assert_eq!(format_load(0.255), "25.5%");
/// ```
pub fn format_load(load: f64) -> String {
    format!("{:.1}%", load * 100.0)
}

/// Parse a run length: bare seconds (`"30"`) or a humantime string (`"1m 30s"`)
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use cpuload::util::units::parse_duration;
///
/// assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
/// assert_eq!(parse_duration("1m 30s").unwrap(), Duration::from_secs(90));
/// assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(input).map_err(|e| format!("Invalid duration '{}': {}", input, e))
}
