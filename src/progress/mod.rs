// Encoder progress handling
//
// - Parser: turns encoder output lines into elapsed media time
// - Tracker: percentage, ETA and throughput per task
// - Ticker: renders snapshots, never touches job state

pub mod parser;
pub mod ticker;
pub mod tracker;

pub use parser::*;
pub use ticker::*;
pub use tracker::*;

use crate::job::TrimRange;

/// Denominator used when neither the probe nor the trim range gives a length.
///
/// Percentages computed against it are only an approximation.
pub const UNKNOWN_DURATION_FALLBACK_SECS: f64 = 60.0;

/// Seconds of output a job is expected to produce.
pub fn effective_duration(duration: f64, trim: &TrimRange) -> f64 {
    let total = match (trim.start, trim.end) {
        (Some(start), Some(end)) => end - start,
        (Some(start), None) => duration - start,
        (None, Some(end)) => end,
        (None, None) => duration,
    };

    if total.is_finite() && total > 0.0 {
        total
    } else {
        UNKNOWN_DURATION_FALLBACK_SECS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_duration() {
        assert_eq!(effective_duration(30.0, &TrimRange::new(Some(10.0), Some(20.0))), 10.0);
        assert_eq!(effective_duration(30.0, &TrimRange::new(Some(10.0), None)), 20.0);
        assert_eq!(effective_duration(30.0, &TrimRange::new(None, Some(12.0))), 12.0);
        assert_eq!(effective_duration(30.0, &TrimRange::default()), 30.0);
    }

    #[test]
    fn test_unknown_duration_uses_fallback() {
        assert_eq!(
            effective_duration(0.0, &TrimRange::default()),
            UNKNOWN_DURATION_FALLBACK_SECS
        );
        // start only, duration unknown
        assert_eq!(
            effective_duration(0.0, &TrimRange::new(Some(5.0), None)),
            UNKNOWN_DURATION_FALLBACK_SECS
        );
    }
}
