//! Metric emission and recording.
//!
//! Stations emit four scalar metrics through [`StationIo::emit`]. The
//! runtime routes them into a [`MetricsSink`]; the bundled [`Recorder`]
//! keeps time series for the sampled metrics and totals for the
//! counters, and can summarise a run with means and 95% confidence
//! intervals.
//!
//! [`StationIo::emit`]: crate::station::StationIo::emit

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::station::StationId;
use crate::time::VirtualTime;

/// z-score for a two-sided 95% confidence interval.
const Z_95: f64 = 1.96;

// ── Metric ────────────────────────────────────────────────────────────

/// The metrics a station emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    /// Creation-to-completion time of a finished task, in units.
    ResponseTime,
    /// Queue length after an admission or a dequeue.
    QueueLength,
    /// One task forwarded to a peer.
    ForwardedCount,
    /// One task dropped.
    DroppedCount,
}

impl Metric {
    /// The externally visible metric name.
    pub fn name(self) -> &'static str {
        match self {
            Metric::ResponseTime => "responseTime",
            Metric::QueueLength => "queueLength",
            Metric::ForwardedCount => "forwardedCount",
            Metric::DroppedCount => "droppedCount",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Receiver of metric emissions.
pub trait MetricsSink {
    fn record(&mut self, station: StationId, at: VirtualTime, metric: Metric, value: f64);
}

// ── Recorder ──────────────────────────────────────────────────────────

/// One sample of a time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub value: f64,
}

/// Everything recorded for one station.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationSeries {
    #[serde(rename = "responseTime")]
    pub response_time: Vec<Sample>,
    #[serde(rename = "queueLength")]
    pub queue_length: Vec<Sample>,
    #[serde(rename = "forwardedCount")]
    pub forwarded: u64,
    #[serde(rename = "droppedCount")]
    pub dropped: u64,
}

/// In-memory metrics sink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recorder {
    stations: BTreeMap<StationId, StationSeries>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Series for one station, if it emitted anything.
    pub fn series(&self, station: StationId) -> Option<&StationSeries> {
        self.stations.get(&station)
    }

    /// All stations that emitted at least one metric, in id order.
    pub fn stations(&self) -> impl Iterator<Item = (StationId, &StationSeries)> {
        self.stations.iter().map(|(id, s)| (*id, s))
    }

    pub fn total_forwarded(&self) -> u64 {
        self.stations.values().map(|s| s.forwarded).sum()
    }

    pub fn total_dropped(&self) -> u64 {
        self.stations.values().map(|s| s.dropped).sum()
    }

    pub fn total_completed(&self) -> usize {
        self.stations.values().map(|s| s.response_time.len()).sum()
    }

    /// Summarise the run per station and across the whole mesh.
    pub fn summary(&self) -> Summary {
        let stations: BTreeMap<StationId, StationSummary> = self
            .stations
            .iter()
            .map(|(id, series)| (*id, StationSummary::from_series(series)))
            .collect();

        let all_response: Vec<f64> = self
            .stations
            .values()
            .flat_map(|s| s.response_time.iter().map(|x| x.value))
            .collect();
        let all_queue: Vec<f64> = self
            .stations
            .values()
            .flat_map(|s| s.queue_length.iter().map(|x| x.value))
            .collect();

        Summary {
            response_time: Estimate::of(&all_response),
            mean_queue_length: mean(&all_queue),
            forwarded: self.total_forwarded(),
            dropped: self.total_dropped(),
            stations,
        }
    }
}

impl MetricsSink for Recorder {
    fn record(&mut self, station: StationId, at: VirtualTime, metric: Metric, value: f64) {
        let series = self.stations.entry(station).or_default();
        let sample = Sample {
            time: at.as_units(),
            value,
        };
        match metric {
            Metric::ResponseTime => series.response_time.push(sample),
            Metric::QueueLength => series.queue_length.push(sample),
            Metric::ForwardedCount => series.forwarded += value.max(0.0) as u64,
            Metric::DroppedCount => series.dropped += value.max(0.0) as u64,
        }
    }
}

// ── Summary ───────────────────────────────────────────────────────────

/// Sample mean with a 95% confidence half-width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub count: usize,
    pub mean: f64,
    /// Half-width of the 95% interval; zero for fewer than two samples.
    pub margin: f64,
}

impl Estimate {
    /// Mean and normal-approximation interval using the n-1 standard
    /// deviation.
    pub fn of(values: &[f64]) -> Self {
        let count = values.len();
        if count == 0 {
            return Estimate::default();
        }
        let mean = mean(values);
        if count < 2 {
            return Estimate {
                count,
                mean,
                margin: 0.0,
            };
        }
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        Estimate {
            count,
            mean,
            margin: Z_95 * var.sqrt() / (count as f64).sqrt(),
        }
    }

    pub fn low(&self) -> f64 {
        self.mean - self.margin
    }

    pub fn high(&self) -> f64 {
        self.mean + self.margin
    }
}

/// Per-station figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationSummary {
    pub response_time: Estimate,
    pub mean_queue_length: f64,
    pub max_queue_length: f64,
    pub forwarded: u64,
    pub dropped: u64,
}

impl StationSummary {
    fn from_series(series: &StationSeries) -> Self {
        let response: Vec<f64> = series.response_time.iter().map(|s| s.value).collect();
        let queue: Vec<f64> = series.queue_length.iter().map(|s| s.value).collect();
        StationSummary {
            response_time: Estimate::of(&response),
            mean_queue_length: mean(&queue),
            max_queue_length: queue.iter().copied().fold(0.0, f64::max),
            forwarded: series.forwarded,
            dropped: series.dropped,
        }
    }
}

/// Whole-run figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub response_time: Estimate,
    pub mean_queue_length: f64,
    pub forwarded: u64,
    pub dropped: u64,
    pub stations: BTreeMap<StationId, StationSummary>,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
