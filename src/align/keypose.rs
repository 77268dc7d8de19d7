use ndarray::Array3;
use serde::Serialize;

use crate::motion::velocity::mean_speed;

/// A reference frame range `[start, end)` between two consecutive key poses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Interior frames whose mean joint speed is a local minimum (≤ both
/// neighbours) and below `threshold`. Strictly increasing, never 0 or N-1.
pub fn detect_key_poses(velocities: &Array3<f64>, threshold: f64) -> Vec<usize> {
    let speed = mean_speed(velocities);
    key_poses_from_speed(&speed, threshold)
}

pub fn key_poses_from_speed(speed: &[f64], threshold: f64) -> Vec<usize> {
    let key_poses: Vec<usize> = speed
        .windows(3)
        .enumerate()
        .filter(|(_, w)| w[1] <= w[0] && w[1] <= w[2] && w[1] < threshold)
        .map(|(i, _)| i + 1)
        .collect();
    log::debug!("Detected {} key poses: {:?}", key_poses.len(), key_poses);
    key_poses
}

/// Consecutive key-pose pairs. Fewer than two key poses → no segments.
pub fn segments_from_key_poses(key_poses: &[usize]) -> Vec<Segment> {
    key_poses
        .windows(2)
        .map(|w| Segment {
            start: w[0],
            end: w[1],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_dips() {
        // Busy motion with dips at frames 5 and 20
        let speed: Vec<f64> = (0..26)
            .map(|t| match t {
                5 | 20 => 0.01,
                4 | 6 | 19 | 21 => 0.5,
                _ => 1.0,
            })
            .collect();
        let key_poses = key_poses_from_speed(&speed, 0.1);
        assert_eq!(key_poses, vec![5, 20]);
        assert_eq!(
            segments_from_key_poses(&key_poses),
            vec![Segment { start: 5, end: 20 }]
        );
    }

    #[test]
    fn test_minimum_above_threshold_is_ignored() {
        let speed = vec![1.0, 0.5, 1.0, 0.05, 1.0];
        assert_eq!(key_poses_from_speed(&speed, 0.1), vec![3]);
    }

    #[test]
    fn test_endpoints_never_key_poses() {
        let speed = vec![0.0, 1.0, 1.0, 0.0];
        assert!(key_poses_from_speed(&speed, 0.1).is_empty());
        assert!(key_poses_from_speed(&[0.0, 0.0], 0.1).is_empty());
    }

    #[test]
    fn test_fewer_than_two_key_poses_gives_no_segments() {
        assert!(segments_from_key_poses(&[]).is_empty());
        assert!(segments_from_key_poses(&[7]).is_empty());
    }

    #[test]
    fn test_detect_from_velocity_field() {
        let mut v = Array3::<f64>::from_elem((6, 2, 2), 1.0);
        v[[2, 0, 0]] = 0.0;
        v[[2, 0, 1]] = 0.0;
        v[[2, 1, 0]] = 0.0;
        v[[2, 1, 1]] = 0.0;
        assert_eq!(detect_key_poses(&v, 0.05), vec![2]);
    }

    #[test]
    fn test_indices_strictly_inside_and_increasing() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(3);
        let speed: Vec<f64> = (0..200).map(|_| rng.random_range(0.0..1.0)).collect();
        let key_poses = key_poses_from_speed(&speed, 0.3);
        assert!(!key_poses.is_empty());
        assert!(key_poses.windows(2).all(|w| w[0] < w[1]));
        assert!(key_poses.iter().all(|&k| k > 0 && k < speed.len() - 1));
    }
}
