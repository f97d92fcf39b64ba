use std::time::Duration;

/// Human-friendly time parser.
///
/// Some examples are "5h", "5h 30m" and "5h_30m".
pub fn parse_humantime_str(s: &str) -> Result<Duration, humantime::DurationError> {
    let s = s.trim();
    if s.contains('_') {
        humantime::parse_duration(&s.replace('_', " "))
    } else {
        humantime::parse_duration(s)
    }
}
