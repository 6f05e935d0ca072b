// Time-derived progress. The backend exposes no progress signal, so the
// estimate is a linear ramp over the expected job length, capped below 100.
use chrono::{DateTime, Utc};
use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressModel {
    pub expected_secs: u64,
    pub cap_percent: f64,
}

impl ProgressModel {
    pub fn new(expected_secs: u64, cap_percent: f64) -> Self {
        Self {
            expected_secs: expected_secs.max(1),
            cap_percent,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.progress.expected_duration_secs, config.progress.cap_percent)
    }

    /// Estimate for a task that has not reached a terminal state.
    pub fn estimate(&self, elapsed_secs: u64) -> f64 {
        let ramp = elapsed_secs as f64 / self.expected_secs as f64 * 100.0;
        ramp.clamp(0.0, self.cap_percent)
    }
}

impl Default for ProgressModel {
    fn default() -> Self {
        Self::new(1200, 95.0)
    }
}

// Whole seconds between two instants, never negative
pub fn elapsed_between(start: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    now.signed_duration_since(start).num_seconds().max(0) as u64
}

// 65 -> "1:05"; minutes are not wrapped into hours
pub fn format_elapsed(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

pub fn elapsed_minutes_label(secs: u64) -> String {
    match secs / 60 {
        0 => "<1".to_string(),
        minutes => minutes.to_string(),
    }
}

// 4200 -> "4,200"
pub fn format_grouped(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "0:00");
        assert_eq!(format_elapsed(9), "0:09");
        assert_eq!(format_elapsed(65), "1:05");
        assert_eq!(format_elapsed(3661), "61:01");
    }

    #[test]
    fn test_elapsed_minutes_label() {
        assert_eq!(elapsed_minutes_label(0), "<1");
        assert_eq!(elapsed_minutes_label(59), "<1");
        assert_eq!(elapsed_minutes_label(60), "1");
        assert_eq!(elapsed_minutes_label(1250), "20");
    }

    #[test]
    fn test_format_grouped() {
        assert_eq!(format_grouped(0), "0");
        assert_eq!(format_grouped(999), "999");
        assert_eq!(format_grouped(4200), "4,200");
        assert_eq!(format_grouped(1234567), "1,234,567");
    }

    #[test]
    fn test_estimate_is_monotone_and_capped() {
        let model = ProgressModel::default();
        let mut previous = 0.0;
        for secs in (0..3000).step_by(7) {
            let estimate = model.estimate(secs);
            assert!(estimate >= previous);
            assert!((0.0..=95.0).contains(&estimate));
            previous = estimate;
        }
        assert_eq!(model.estimate(0), 0.0);
        assert_eq!(model.estimate(600), 50.0);
        assert_eq!(model.estimate(1200), 95.0);
        assert_eq!(model.estimate(100_000), 95.0);
    }

    #[test]
    fn test_elapsed_between_clamps_clock_skew() {
        let start = Utc::now();
        assert_eq!(elapsed_between(start, start + Duration::seconds(65)), 65);
        assert_eq!(elapsed_between(start, start - Duration::seconds(5)), 0);
    }
}
