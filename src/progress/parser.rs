use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"time=(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").expect("valid time pattern")
});

/// Extracts elapsed media time from one line of encoder output
pub trait ProgressParser: Send + Sync {
    fn parse_line(&self, line: &str) -> Option<Duration>;
}

/// Understands both `out_time=` (`-progress`) and `time=` (stats line) tokens
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegProgressParser;

impl ProgressParser for FfmpegProgressParser {
    fn parse_line(&self, line: &str) -> Option<Duration> {
        parse_progress_line(line)
    }
}

/// Elapsed time from the first `time=HH:MM:SS[.fraction]` token on the line.
pub fn parse_progress_line(line: &str) -> Option<Duration> {
    let caps = TIME_PATTERN.captures(line)?;
    let hours: u64 = caps[1].parse().ok()?;
    let minutes: u64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;

    let whole = hours.checked_mul(3600)?.checked_add(minutes * 60)?;
    Duration::try_from_secs_f64(whole as f64 + seconds).ok()
}
