//! # Aggregate statistics
//!
//! Statistics are only ever computed over successful latency samples. An empty
//! sample set is represented explicitly as [`AggregateStatistics::NoData`], so no
//! caller can observe a mean computed over zero values.

use std::fmt;
use std::time::Duration;

use super::event::ProbeEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum QualityRating {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityRating {
    pub fn from_latency(mean: Duration) -> Self {
        match mean.as_secs_f64() * 1000.0 {
            ms if ms < 50.0 => QualityRating::Excellent,
            ms if ms < 100.0 => QualityRating::Good,
            ms if ms < 200.0 => QualityRating::Fair,
            _ => QualityRating::Poor,
        }
    }
}

impl fmt::Display for QualityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QualityRating::Excellent => "Excellent",
            QualityRating::Good => "Good",
            QualityRating::Fair => "Fair",
            QualityRating::Poor => "Poor",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyStats {
    pub count: usize,
    pub min: Duration,
    pub max: Duration,
    pub mean: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregateStatistics {
    #[default]
    NoData,
    Latency(LatencyStats),
}

impl AggregateStatistics {
    pub fn from_samples(samples: &[Duration]) -> Self {
        let (Some(min), Some(max)) = (samples.iter().min(), samples.iter().max()) else {
            return AggregateStatistics::NoData;
        };

        let total: Duration = samples.iter().sum();
        AggregateStatistics::Latency(LatencyStats {
            count: samples.len(),
            min: *min,
            max: *max,
            mean: total / samples.len() as u32,
        })
    }

    /// Collects the latency of every successful event and aggregates it.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a ProbeEvent>) -> Self {
        let samples: Vec<Duration> = events
            .into_iter()
            .filter(|event| event.is_success())
            .filter_map(ProbeEvent::latency)
            .collect();
        Self::from_samples(&samples)
    }

    pub fn latency(&self) -> Option<&LatencyStats> {
        match self {
            AggregateStatistics::NoData => None,
            AggregateStatistics::Latency(stats) => Some(stats),
        }
    }

    pub fn quality(&self) -> Option<QualityRating> {
        self.latency()
            .map(|stats| QualityRating::from_latency(stats.mean))
    }
}

impl fmt::Display for AggregateStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateStatistics::NoData => f.write_str("no data"),
            AggregateStatistics::Latency(stats) => write!(
                f,
                "min {:.1} ms, max {:.1} ms, avg {:.1} ms over {} samples",
                stats.min.as_secs_f64() * 1000.0,
                stats.max.as_secs_f64() * 1000.0,
                stats.mean.as_secs_f64() * 1000.0,
                stats.count
            ),
        }
    }
}

/// Megabits per second for `bytes` moved in `elapsed`.
///
/// A zero duration is clamped to one microsecond.
pub fn mbps(bytes: u64, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64().max(1e-6);
    (bytes as f64 * 8.0) / seconds / 1_000_000.0
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn quality_thresholds() {
        assert_eq!(QualityRating::from_latency(ms(0)), QualityRating::Excellent);
        assert_eq!(QualityRating::from_latency(ms(49)), QualityRating::Excellent);
        assert_eq!(QualityRating::from_latency(ms(50)), QualityRating::Good);
        assert_eq!(QualityRating::from_latency(ms(99)), QualityRating::Good);
        assert_eq!(QualityRating::from_latency(ms(100)), QualityRating::Fair);
        assert_eq!(QualityRating::from_latency(ms(199)), QualityRating::Fair);
        assert_eq!(QualityRating::from_latency(ms(200)), QualityRating::Poor);
        assert_eq!(QualityRating::from_latency(ms(5000)), QualityRating::Poor);
    }

    #[test]
    fn quality_never_improves_as_latency_grows() {
        let mut previous = QualityRating::Excellent;
        for value in (0..400).step_by(5) {
            let rating = QualityRating::from_latency(ms(value));
            assert!(rating >= previous);
            previous = rating;
        }
    }

    #[test]
    fn empty_samples_yield_no_data() {
        let stats = AggregateStatistics::from_samples(&[]);
        assert_eq!(stats, AggregateStatistics::NoData);
        assert_eq!(stats.quality(), None);
    }

    #[test]
    fn min_max_mean() {
        let stats = AggregateStatistics::from_samples(&[ms(10), ms(30), ms(20)]);
        let latency = stats.latency().unwrap();
        assert_eq!(latency.count, 3);
        assert_eq!(latency.min, ms(10));
        assert_eq!(latency.max, ms(30));
        assert_eq!(latency.mean, ms(20));
        assert_eq!(stats.quality(), Some(QualityRating::Excellent));
    }

    #[test]
    fn mbps_uses_bits_over_seconds() {
        let rate = mbps(1024 * 1024, Duration::from_secs(1));
        assert!((rate - 8.388608).abs() < 1e-9);
        assert!(mbps(1024, Duration::ZERO).is_finite());
    }
}
