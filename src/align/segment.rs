//! Discrete per-segment alignment.
//!
//! Each key-pose segment is slid over the user sequence by whole-frame offsets
//! around its nominal position; the offset with the best mean pose similarity
//! wins. Segments carry no state between them.

use rayon::prelude::*;
use serde::Serialize;

use super::keypose::Segment;
use crate::config::SegmentConfig;
use crate::motion::{MotionData, MotionPair};
use crate::similarity::mean_frame_similarity;

/// Alignment verdict for one reference segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentRecord {
    pub segment_index: usize,
    /// Reference frames `[reference_start, reference_end)`.
    pub reference_start: usize,
    pub reference_end: usize,
    pub reference_start_id: String,
    pub best_offset: i64,
    /// Matched user frames `[user_start, user_end)`.
    pub user_start: usize,
    pub user_end: usize,
    pub user_start_id: String,
    pub time_offset_seconds: f64,
    pub mean_similarity: f64,
    /// Mean per-joint Euclidean distance over the aligned overlap.
    pub position_error: f64,
}

/// User frames covered by `segment` shifted by `offset`: start clamped at 0,
/// length cut at the end of the user sequence. `None` if nothing overlaps.
pub fn candidate_window(segment: Segment, offset: i64, user_len: usize) -> Option<(usize, usize)> {
    let start = (segment.start as i64 + offset).max(0) as usize;
    if start >= user_len {
        return None;
    }
    let len = segment.len().min(user_len - start);
    (len > 0).then_some((start, len))
}

/// Mean pose similarity of `len` frame pairs starting at `ref_start` / `user_start`.
fn overlap_similarity(
    reference: &MotionData,
    user: &MotionData,
    ref_start: usize,
    user_start: usize,
    len: usize,
) -> f64 {
    mean_frame_similarity(
        (0..len).map(|i| (reference.position(ref_start + i), user.position(user_start + i))),
    )
}

/// Mean Euclidean joint distance over `len` aligned frames.
fn position_error(
    reference: &MotionData,
    user: &MotionData,
    ref_start: usize,
    user_start: usize,
    len: usize,
) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for i in 0..len {
        let r = reference.position(ref_start + i);
        let u = user.position(user_start + i);
        for (rj, uj) in r.outer_iter().zip(u.outer_iter()) {
            let dist: f64 = rj
                .iter()
                .zip(uj.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
                .sqrt();
            total += dist;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Find the best offset for one segment. `None` when no offset produced a
/// defined similarity.
pub fn align_segment(
    motion: &MotionPair,
    segment_index: usize,
    segment: Segment,
    offset_window: usize,
) -> Option<SegmentRecord> {
    let reference = &motion.original;
    let user = &motion.user;
    let w = offset_window as i64;

    let mut best: Option<(i64, f64)> = None;
    for offset in -w..=w {
        let Some((user_start, len)) = candidate_window(segment, offset, user.len()) else {
            continue;
        };
        let sim = overlap_similarity(reference, user, segment.start, user_start, len);
        if sim.is_nan() {
            continue;
        }
        // First-seen wins on ties
        if best.is_none_or(|(_, b)| sim > b) {
            best = Some((offset, sim));
        }
    }

    let Some((best_offset, mean_similarity)) = best else {
        log::debug!(
            "Segment {} [{}, {}): no offset with a defined similarity, skipped",
            segment_index,
            segment.start,
            segment.end
        );
        return None;
    };

    let (user_start, user_len) = candidate_window(segment, best_offset, user.len())?;
    let overlap = user_len.min(segment.len());
    let error = position_error(reference, user, segment.start, user_start, overlap);

    Some(SegmentRecord {
        segment_index,
        reference_start: segment.start,
        reference_end: segment.end,
        reference_start_id: reference.frame_ids[segment.start].clone(),
        best_offset,
        user_start,
        user_end: user_start + user_len,
        user_start_id: user.frame_ids[user_start].clone(),
        time_offset_seconds: best_offset as f64 / motion.fps,
        mean_similarity,
        position_error: error,
    })
}

/// Align every segment independently (in parallel), preserving segment order.
pub fn align(
    motion: &MotionPair,
    segments: &[Segment],
    config: &SegmentConfig,
) -> Vec<SegmentRecord> {
    let records: Vec<SegmentRecord> = segments
        .par_iter()
        .enumerate()
        .filter_map(|(i, &segment)| align_segment(motion, i, segment, config.offset_window))
        .collect();

    log::info!(
        "Segment alignment: {} of {} segments matched",
        records.len(),
        segments.len()
    );
    records
}
