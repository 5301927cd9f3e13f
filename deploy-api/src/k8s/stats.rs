use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::k8s::K8sError;

/// One resource-usage sample.
///
/// `time` is an absolute Unix-millisecond instant as a float, matching the
/// representation of the metrics backend boundary; it is never reformatted
/// after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UsagePoint {
    /// Sample instant, Unix milliseconds.
    pub time: f64,
    /// CPU usage in cores.
    pub cores: f64,
    /// Memory usage in bytes.
    pub memory: f64,
}

/// A bounded, time-ordered sequence of usage samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UsageSeries {
    /// Window start, Unix milliseconds.
    pub start: f64,
    /// Window end, Unix milliseconds.
    pub end: f64,
    /// Samples in non-decreasing time order, at most the caller's limit.
    pub samples: Vec<UsagePoint>,
}

/// Validates the caller-supplied window of a series query.
pub fn validate_series_window(start: f64, end: f64, limit: usize) -> Result<(), K8sError> {
    if end < start {
        return Err(K8sError::bad_parameter(format!(
            "series end {end} precedes start {start}"
        )));
    }
    if limit == 0 {
        return Err(K8sError::bad_parameter("series limit must be positive"));
    }

    Ok(())
}

/// Reduces a series to at most `limit` samples by fixed-stride selection.
///
/// The first sample is always kept. The last sample is always kept for any
/// `limit >= 2`; at `limit == 1` only the most recent sample survives.
/// Intermediate samples are taken every `ceil(len / limit)` positions, so
/// the result never exceeds `limit`.
pub fn downsample(samples: Vec<UsagePoint>, limit: usize) -> Vec<UsagePoint> {
    if samples.len() <= limit {
        return samples;
    }
    let last = *samples.last().expect("samples is non-empty");
    if limit == 1 {
        return vec![last];
    }

    let stride = samples.len().div_ceil(limit);
    let mut reduced: Vec<UsagePoint> = samples.iter().copied().step_by(stride).collect();

    if reduced.last() != Some(&last) {
        if reduced.len() < limit {
            reduced.push(last);
        } else {
            *reduced.last_mut().expect("reduced is non-empty") = last;
        }
    }

    reduced
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: usize) -> Vec<UsagePoint> {
        (0..n)
            .map(|i| UsagePoint {
                time: (i * 1000) as f64,
                cores: i as f64,
                memory: (i * 1024) as f64,
            })
            .collect()
    }

    #[test]
    fn window_with_end_before_start_is_rejected() {
        let err = validate_series_window(2000.0, 1000.0, 10).unwrap_err();

        assert!(matches!(err, K8sError::BadParameter(_)));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = validate_series_window(1000.0, 2000.0, 0).unwrap_err();

        assert!(matches!(err, K8sError::BadParameter(_)));
    }

    #[test]
    fn equal_start_and_end_is_a_valid_window() {
        assert!(validate_series_window(1000.0, 1000.0, 1).is_ok());
    }

    #[test]
    fn short_series_pass_through_unchanged() {
        let samples = series(5);

        assert_eq!(downsample(samples.clone(), 10), samples);
        assert_eq!(downsample(samples.clone(), 5), samples);
    }

    #[test]
    fn downsampling_preserves_first_and_last() {
        for (len, limit) in [(100, 7), (17, 4), (9, 2), (1000, 13)] {
            let samples = series(len);
            let first = *samples.first().unwrap();
            let last = *samples.last().unwrap();

            let reduced = downsample(samples, limit);

            assert!(reduced.len() <= limit, "len {len} limit {limit}");
            assert_eq!(*reduced.first().unwrap(), first);
            assert_eq!(*reduced.last().unwrap(), last);
        }
    }

    #[test]
    fn downsampled_times_stay_ordered() {
        let reduced = downsample(series(250), 16);

        let times: Vec<f64> = reduced.iter().map(|sample| sample.time).collect();
        let mut sorted = times.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(times, sorted);
    }

    #[test]
    fn limit_of_one_keeps_the_most_recent_sample() {
        let samples = series(10);
        let last = *samples.last().unwrap();

        assert_eq!(downsample(samples, 1), vec![last]);
    }
}
