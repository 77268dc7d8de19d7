pub mod continuous;
pub mod keypose;
pub mod segment;

use crate::config::AppConfig;
use crate::motion::MotionPair;
use crate::report::{self, ContinuousReport, SegmentReport};

/// Continuous windowed alignment, classified with the continuous thresholds.
pub fn run_continuous(motion: &MotionPair, config: &AppConfig) -> ContinuousReport {
    let records = continuous::align(motion, &config.continuous);
    report::continuous_report(records, config.continuous.thresholds())
}

/// Key-pose segmentation followed by per-segment alignment.
pub fn run_segments(motion: &MotionPair, config: &AppConfig) -> SegmentReport {
    let key_poses =
        keypose::detect_key_poses(&motion.original.velocities, config.segments.motion_threshold);
    let segments = keypose::segments_from_key_poses(&key_poses);
    log::info!(
        "{} key poses → {} segments",
        key_poses.len(),
        segments.len()
    );
    let records = segment::align(motion, &segments, &config.segments);
    report::segment_report(records, config.segments.thresholds())
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::motion::MotionPair;
    use crate::pose::{Dancer, PosePair, Sequence};
    use ndarray::Array3;

    /// Joint order of [`swing`]: left_shoulder, left_wrist, right_shoulder, right_wrist.
    pub const JOINTS: [&str; 4] = ["left_shoulder", "left_wrist", "right_shoulder", "right_wrist"];

    fn rotate(x: f64, y: f64, angle: f64) -> (f64, f64) {
        let (s, c) = angle.sin_cos();
        (x * c - y * s, x * s + y * c)
    }

    /// A drifting dancer whose upper body turns and whose right arm swings at
    /// its own rate, so no two frames within a few dozen share a pose.
    pub fn swing(n: usize) -> Array3<f64> {
        let mut out = Array3::<f64>::zeros((n, JOINTS.len(), 2));
        for t in 0..n {
            let tf = t as f64;
            let theta = 0.15 * tf + 0.002 * tf * tf;
            let (cx, cy) = (3.0 + 0.05 * tf, 1.0 - 0.02 * tf);
            let points = [
                rotate(-1.0, 0.0, theta),
                rotate(-2.0, 1.5, theta),
                rotate(1.0, 0.0, theta),
                rotate(2.5, -1.0, 1.8 * theta),
            ];
            for (j, (x, y)) in points.iter().enumerate() {
                out[[t, j, 0]] = cx + x;
                out[[t, j, 1]] = cy + y;
            }
        }
        out
    }

    fn sequence(dancer: Dancer, coords: &Array3<f64>) -> Sequence {
        Sequence {
            dancer,
            frame_ids: (1..=coords.shape()[0]).map(|i| format!("frame_{i}")).collect(),
            coords: coords.clone(),
        }
    }

    pub fn motion_from_arrays(original: &Array3<f64>, user: &Array3<f64>, fps: f64) -> MotionPair {
        let pair = PosePair {
            joints: JOINTS.iter().map(|s| s.to_string()).collect(),
            depth: original.shape()[2],
            original: sequence(Dancer::Original, original),
            user: sequence(Dancer::User, user),
        };
        MotionPair::prepare(&pair, fps)
    }
}
