pub mod normalize;
pub mod velocity;

use crate::pose::{PosePair, Sequence};
use ndarray::{Array3, ArrayView2, Axis};
use normalize::RootReference;

/// Derived fields for one dancer, built once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct MotionData {
    pub frame_ids: Vec<String>,
    pub root: RootReference,
    /// Root-relative positions, `(frame, joint, axis)`.
    pub positions: Array3<f64>,
    /// Velocities of the root-relative positions, `(frame, joint, 2)`.
    pub velocities: Array3<f64>,
}

impl MotionData {
    pub fn from_sequence(seq: &Sequence, joints: &[String], fps: f64) -> Self {
        let root = RootReference::resolve(joints);
        log::debug!("{} root reference: {}", seq.dancer, root.describe(joints));
        let positions = normalize::normalize(&seq.coords, root);
        let velocities = velocity::estimate(&positions, fps);
        Self {
            frame_ids: seq.frame_ids.clone(),
            root,
            positions,
            velocities,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self, t: usize) -> ArrayView2<'_, f64> {
        self.positions.index_axis(Axis(0), t)
    }

    pub fn velocity(&self, t: usize) -> ArrayView2<'_, f64> {
        self.velocities.index_axis(Axis(0), t)
    }
}

/// Both dancers' derived fields plus the frame rate they were built at.
/// Both aligners consume this; neither modifies it.
#[derive(Debug, Clone)]
pub struct MotionPair {
    pub fps: f64,
    pub original: MotionData,
    pub user: MotionData,
}

impl MotionPair {
    pub fn prepare(pair: &PosePair, fps: f64) -> Self {
        Self {
            fps,
            original: MotionData::from_sequence(&pair.original, &pair.joints, fps),
            user: MotionData::from_sequence(&pair.user, &pair.joints, fps),
        }
    }

    /// Reference duration in seconds.
    pub fn duration(&self) -> f64 {
        self.original.len() as f64 / self.fps
    }
}
