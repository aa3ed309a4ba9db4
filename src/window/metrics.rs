//! Rolling log of render durations

use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// Samples kept in the persisted log
pub const METRIC_CAPACITY: usize = 24;

/// One observed render duration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderSample {
    pub ms: f64,
    /// Epoch milliseconds
    #[serde(default, deserialize_with = "lenient_at")]
    pub at: i64,
}

/// Sample time never invalidates a sample: fractional epochs are truncated,
/// RFC 3339 text is converted, anything else is 0
fn lenient_at<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|d| d.timestamp_millis())
            .unwrap_or(0),
        _ => 0,
    })
}

impl RenderSample {
    pub fn new(duration_ms: f64, at: i64) -> Self {
        Self { ms: round_ms(duration_ms), at }
    }

    pub fn is_valid(&self) -> bool {
        self.ms.is_finite() && self.ms > 0.0
    }
}

/// Round to two decimals
pub fn round_ms(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}

/// Parse a persisted log, keeping only valid samples in stored order.
/// Anything that is not a JSON array yields an empty log.
pub fn parse_log(raw: &str) -> Vec<RenderSample> {
    let items = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            debug!("render metric log is not an array, ignoring");
            return Vec::new();
        }
        Err(e) => {
            debug!("render metric log unreadable: {}", e);
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RenderSample>(item).ok())
        .filter(RenderSample::is_valid)
        .collect()
}

/// Append a sample, evicting the oldest beyond capacity
pub fn push_sample(log: &mut Vec<RenderSample>, sample: RenderSample) {
    log.push(sample);
    if log.len() > METRIC_CAPACITY {
        let overflow = log.len() - METRIC_CAPACITY;
        log.drain(..overflow);
    }
}

/// Nearest-rank 75th percentile of the durations
pub fn p75(samples: &[RenderSample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut durations: Vec<f64> = samples.iter().map(|s| s.ms).collect();
    durations.sort_by(f64::total_cmp);
    let idx = ((0.75 * (durations.len() - 1) as f64).floor() as usize).min(durations.len() - 1);
    Some(durations[idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(ms: &[f64]) -> Vec<RenderSample> {
        ms.iter()
            .enumerate()
            .map(|(i, ms)| RenderSample::new(*ms, i as i64))
            .collect()
    }

    #[test]
    fn test_round_ms() {
        assert_eq!(round_ms(12.3456), 12.35);
        assert_eq!(round_ms(7.0), 7.0);
        assert_eq!(RenderSample::new(33.333, 0).ms, 33.33);
    }

    #[test]
    fn test_parse_log_malformed() {
        assert!(parse_log("").is_empty());
        assert!(parse_log("not json").is_empty());
        assert!(parse_log("{\"ms\": 5}").is_empty());
        assert!(parse_log("null").is_empty());
    }

    #[test]
    fn test_parse_log_drops_bad_entries() {
        let raw = r#"[
            {"ms": 12.5, "at": 1},
            {"ms": -3, "at": 2},
            {"ms": 0, "at": 3},
            {"ms": "fast", "at": 4},
            {"at": 5},
            42,
            {"ms": 30, "at": 6}
        ]"#;
        let log = parse_log(raw);
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].at, 1);
        assert_eq!(log[1].ms, 30.0);
    }

    #[test]
    fn test_parse_log_tolerates_odd_timestamps() {
        let raw = r#"[
            {"ms": 80, "at": 1700000000000.5},
            {"ms": 80, "at": "2024-01-01T00:00:00Z"},
            {"ms": 80, "at": 1.5},
            {"ms": 80, "at": null},
            {"ms": 80, "at": {"when": "now"}}
        ]"#;
        let log = parse_log(raw);
        assert_eq!(log.len(), 5);
        assert_eq!(log[0].at, 1_700_000_000_000);
        assert_eq!(log[1].at, 1_704_067_200_000);
        assert_eq!(log[2].at, 1);
        assert_eq!(log[3].at, 0);
        assert!(log.iter().all(|s| s.ms == 80.0));
    }

    #[test]
    fn test_push_sample_evicts_oldest() {
        let mut log = Vec::new();
        for i in 0..30 {
            push_sample(&mut log, RenderSample::new(10.0 + i as f64, i));
        }
        assert_eq!(log.len(), METRIC_CAPACITY);
        assert_eq!(log.first().unwrap().at, 6);
        assert_eq!(log.last().unwrap().at, 29);
    }

    #[test]
    fn test_p75_nearest_rank() {
        assert_eq!(p75(&[]), None);
        assert_eq!(p75(&samples(&[42.0])), Some(42.0));
        // n = 5 -> idx = floor(0.75 * 4) = 3
        assert_eq!(p75(&samples(&[50.0, 10.0, 40.0, 20.0, 30.0])), Some(40.0));
        // n = 8 -> idx = floor(0.75 * 7) = 5
        assert_eq!(
            p75(&samples(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0])),
            Some(6.0)
        );
    }
}
