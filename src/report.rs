//! Timing verdicts and summary statistics over alignment records.

use serde::Serialize;
use std::fmt;

use crate::align::continuous::AlignmentRecord;
use crate::align::segment::SegmentRecord;

/// Whether the user hit a moment early, late or on time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TimingStatus {
    Early,
    Late,
    #[serde(rename = "On-time")]
    OnTime,
}

impl TimingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TimingStatus::Early => "Early",
            TimingStatus::Late => "Late",
            TimingStatus::OnTime => "On-time",
        }
    }
}

impl fmt::Display for TimingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Early/late tolerances in seconds (both positive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub early: f64,
    pub late: f64,
}

/// Classify a time offset (positive = user behind the reference).
pub fn classify(time_offset_seconds: f64, thresholds: &Thresholds) -> TimingStatus {
    if time_offset_seconds > thresholds.late {
        TimingStatus::Late
    } else if time_offset_seconds < -thresholds.early {
        TimingStatus::Early
    } else {
        TimingStatus::OnTime
    }
}

/// Anything carrying a time offset can be classified.
pub trait Timed {
    fn time_offset_seconds(&self) -> f64;
}

impl Timed for AlignmentRecord {
    fn time_offset_seconds(&self) -> f64 {
        self.time_offset_seconds
    }
}

impl Timed for SegmentRecord {
    fn time_offset_seconds(&self) -> f64 {
        self.time_offset_seconds
    }
}

/// A record together with its verdict.
#[derive(Debug, Clone, Serialize)]
pub struct Entry<R> {
    #[serde(flatten)]
    pub record: R,
    pub status: TimingStatus,
}

/// Counts and percentage breakdown per status.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub early: usize,
    pub on_time: usize,
    pub late: usize,
    pub early_pct: f64,
    pub on_time_pct: f64,
    pub late_pct: f64,
}

impl StatusCounts {
    pub fn tally<'a, I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = &'a TimingStatus>,
    {
        let mut counts = StatusCounts::default();
        for status in statuses {
            counts.total += 1;
            match status {
                TimingStatus::Early => counts.early += 1,
                TimingStatus::OnTime => counts.on_time += 1,
                TimingStatus::Late => counts.late += 1,
            }
        }
        if counts.total > 0 {
            let pct = |n: usize| n as f64 * 100.0 / counts.total as f64;
            counts.early_pct = pct(counts.early);
            counts.on_time_pct = pct(counts.on_time);
            counts.late_pct = pct(counts.late);
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContinuousSummary {
    pub counts: StatusCounts,
    pub mean_pose_similarity: f64,
    pub mean_velocity_similarity: f64,
    pub mean_combined_score: f64,
    pub mean_abs_time_offset: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentSummary {
    pub counts: StatusCounts,
    pub mean_similarity: f64,
    pub mean_position_error: f64,
    pub mean_abs_time_offset: f64,
}

/// Classified records plus their summary.
#[derive(Debug, Clone, Serialize)]
pub struct Report<R, S> {
    pub thresholds: Thresholds,
    pub entries: Vec<Entry<R>>,
    pub summary: S,
}

pub type ContinuousReport = Report<AlignmentRecord, ContinuousSummary>;
pub type SegmentReport = Report<SegmentRecord, SegmentSummary>;

fn classify_all<R: Timed>(records: Vec<R>, thresholds: &Thresholds) -> Vec<Entry<R>> {
    records
        .into_iter()
        .map(|record| {
            let status = classify(record.time_offset_seconds(), thresholds);
            Entry { record, status }
        })
        .collect()
}

fn mean<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

pub fn continuous_report(
    records: Vec<AlignmentRecord>,
    thresholds: Thresholds,
) -> ContinuousReport {
    let entries = classify_all(records, &thresholds);
    let summary = ContinuousSummary {
        counts: StatusCounts::tally(entries.iter().map(|e| &e.status)),
        mean_pose_similarity: mean(entries.iter().map(|e| e.record.pose_similarity)),
        mean_velocity_similarity: mean(entries.iter().map(|e| e.record.velocity_similarity)),
        mean_combined_score: mean(entries.iter().map(|e| e.record.combined_score)),
        mean_abs_time_offset: mean(entries.iter().map(|e| e.record.time_offset_seconds.abs())),
    };
    log::info!(
        "{} points: {} early, {} on time, {} late",
        summary.counts.total,
        summary.counts.early,
        summary.counts.on_time,
        summary.counts.late
    );
    Report {
        thresholds,
        entries,
        summary,
    }
}

pub fn segment_report(records: Vec<SegmentRecord>, thresholds: Thresholds) -> SegmentReport {
    let entries = classify_all(records, &thresholds);
    let summary = SegmentSummary {
        counts: StatusCounts::tally(entries.iter().map(|e| &e.status)),
        mean_similarity: mean(entries.iter().map(|e| e.record.mean_similarity)),
        mean_position_error: mean(entries.iter().map(|e| e.record.position_error)),
        mean_abs_time_offset: mean(entries.iter().map(|e| e.record.time_offset_seconds.abs())),
    };
    log::info!(
        "{} segments: {} early, {} on time, {} late",
        summary.counts.total,
        summary.counts.early,
        summary.counts.on_time,
        summary.counts.late
    );
    Report {
        thresholds,
        entries,
        summary,
    }
}
