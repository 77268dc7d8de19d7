//! Continuous windowed alignment.
//!
//! At each query time the reference frame is compared against a bounded window
//! of user frames around the same moment. Matches are monotonic: once user frame
//! `k` has been matched, later queries only consider frames after `k`, so a
//! repeated move can never pull the alignment backwards.

use rayon::prelude::*;
use serde::Serialize;
use std::ops::RangeInclusive;

use crate::config::ContinuousConfig;
use crate::motion::MotionPair;
use crate::similarity::frame_similarity;

/// Absorbs float error in `t · fps` (0.7 · 30 = 20.999…).
const INDEX_EPSILON: f64 = 1e-9;

/// Best user match for one reference moment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentRecord {
    pub query_time: f64,
    pub reference_frame_idx: usize,
    pub reference_frame_id: String,
    pub matched_user_frame_idx: usize,
    pub matched_user_frame_id: String,
    /// `matched_user_frame_idx - reference_frame_idx`; positive = user behind.
    pub frame_offset: i64,
    pub time_offset_seconds: f64,
    pub pose_similarity: f64,
    pub velocity_similarity: f64,
    pub combined_score: f64,
}

/// Query times `0, Δ, 2Δ, …` strictly below `duration`.
pub fn query_times(duration: f64, interval: f64) -> impl Iterator<Item = f64> {
    (0u64..)
        .map(move |k| k as f64 * interval)
        .take_while(move |&t| t < duration)
}

/// Frame index at time `t`, rounded down and clamped to `len - 1`.
pub fn time_to_index(t: f64, fps: f64, len: usize) -> usize {
    let raw = (t * fps + INDEX_EPSILON).floor().max(0.0) as usize;
    raw.min(len.saturating_sub(1))
}

/// User indices eligible at this query: `expected ± radius`, inside the
/// sequence, and not below `floor`. `None` when nothing is left.
pub fn search_window(
    expected: usize,
    radius: usize,
    len: usize,
    floor: usize,
) -> Option<RangeInclusive<usize>> {
    if len == 0 {
        return None;
    }
    let start = expected.saturating_sub(radius).max(floor);
    let end = expected.saturating_add(radius).min(len - 1);
    (start <= end).then_some(start..=end)
}

/// Monotonicity state carried from one query to the next.
#[derive(Debug, Clone, Default)]
pub struct AlignState {
    /// Lowest user index the next query may match.
    pub floor: usize,
    pub records: Vec<AlignmentRecord>,
}

impl AlignState {
    /// Fold step: try one query time, advancing the floor on a match.
    pub fn step(mut self, motion: &MotionPair, config: &ContinuousConfig, query_time: f64) -> Self {
        match match_query(motion, config, query_time, self.floor) {
            Some(record) => {
                self.floor = record.matched_user_frame_idx + 1;
                self.records.push(record);
            }
            None => {
                log::debug!(
                    "t={:.3}s: search window empty (floor {}), skipped",
                    query_time,
                    self.floor
                );
            }
        }
        self
    }
}

/// Run the aligner over the whole reference.
pub fn align(motion: &MotionPair, config: &ContinuousConfig) -> Vec<AlignmentRecord> {
    let state = query_times(motion.duration(), config.analysis_interval_sec)
        .fold(AlignState::default(), |state, t| state.step(motion, config, t));

    log::info!(
        "Continuous alignment: {} matched points over {:.2}s",
        state.records.len(),
        motion.duration()
    );
    state.records
}

/// Best match for a single query time given the current monotonicity floor.
pub fn match_query(
    motion: &MotionPair,
    config: &ContinuousConfig,
    query_time: f64,
    floor: usize,
) -> Option<AlignmentRecord> {
    let fps = motion.fps;
    let reference = &motion.original;
    let user = &motion.user;

    let ref_idx = time_to_index(query_time, fps, reference.len());
    let expected = time_to_index(query_time, fps, user.len());
    // A radius past the sequence length covers everything anyway
    let radius = ((config.window_radius_sec * fps).floor() as usize).min(user.len());
    let window = search_window(expected, radius, user.len(), floor)?;

    let ref_pos = reference.position(ref_idx);
    let ref_vel = reference.velocity(ref_idx);

    // Scoring is independent per candidate; selection stays sequential so
    // ties go to the lowest index.
    let scored: Vec<(usize, f64, f64, f64)> = window
        .into_par_iter()
        .map(|k| {
            let pose = frame_similarity(ref_pos, user.position(k));
            let vel = frame_similarity(ref_vel, user.velocity(k));
            let combined = config.pose_weight * pose + config.velocity_weight * vel;
            (k, pose, vel, combined)
        })
        .collect();

    let mut best = *scored.first()?;
    for candidate in &scored[1..] {
        if candidate.3 > best.3 {
            best = *candidate;
        }
    }
    let (matched, pose, vel, combined) = best;

    let frame_offset = matched as i64 - ref_idx as i64;
    Some(AlignmentRecord {
        query_time,
        reference_frame_idx: ref_idx,
        reference_frame_id: reference.frame_ids[ref_idx].clone(),
        matched_user_frame_idx: matched,
        matched_user_frame_id: user.frame_ids[matched].clone(),
        frame_offset,
        time_offset_seconds: frame_offset as f64 / fps,
        pose_similarity: pose,
        velocity_similarity: vel,
        combined_score: combined,
    })
}
