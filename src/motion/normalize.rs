use ndarray::{Array1, Array3, ArrayView2, Axis};
use serde::Serialize;

const ROOT_JOINT: &str = "midpoint_shoulder";
const LEFT_SHOULDER: &str = "left_shoulder";
const RIGHT_SHOULDER: &str = "right_shoulder";

/// Per-frame translation baseline subtracted from every joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RootReference {
    /// A single joint (by index into the joint vocabulary).
    Joint { index: usize },
    /// Midpoint of two joints.
    Midpoint { a: usize, b: usize },
}

impl RootReference {
    /// Resolve the root from a sorted joint vocabulary.
    ///
    /// Prefers an explicit `midpoint_shoulder` joint, then the midpoint of the
    /// two shoulders, and finally falls back to the first joint.
    pub fn resolve(joints: &[String]) -> Self {
        let find = |name: &str| joints.iter().position(|j| j == name);

        if let Some(index) = find(ROOT_JOINT) {
            return RootReference::Joint { index };
        }
        if let (Some(a), Some(b)) = (find(LEFT_SHOULDER), find(RIGHT_SHOULDER)) {
            return RootReference::Midpoint { a, b };
        }
        log::warn!(
            "No shoulder joints found; using {:?} as the root reference",
            joints.first().map(String::as_str).unwrap_or("?")
        );
        RootReference::Joint { index: 0 }
    }

    /// Root coordinate of one frame (`joint × axis` view).
    pub fn locate(&self, frame: ArrayView2<f64>) -> Array1<f64> {
        match *self {
            RootReference::Joint { index } => frame.row(index).to_owned(),
            RootReference::Midpoint { a, b } => (&frame.row(a) + &frame.row(b)) / 2.0,
        }
    }

    /// Human-readable description using the vocabulary's names.
    pub fn describe(&self, joints: &[String]) -> String {
        let name = |i: usize| joints.get(i).map(String::as_str).unwrap_or("?");
        match *self {
            RootReference::Joint { index } => name(index).to_string(),
            RootReference::Midpoint { a, b } => format!("midpoint({}, {})", name(a), name(b)),
        }
    }
}

/// Re-express every joint relative to its own frame's root.
///
/// Purely per-frame: frame t only ever reads frame t.
pub fn normalize(coords: &Array3<f64>, root: RootReference) -> Array3<f64> {
    let mut out = coords.clone();
    for mut frame in out.axis_iter_mut(Axis(0)) {
        let origin = root.locate(frame.view());
        for mut joint in frame.axis_iter_mut(Axis(0)) {
            joint -= &origin;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_prefers_explicit_root() {
        let joints = names(&["left_shoulder", "midpoint_shoulder", "right_shoulder"]);
        assert_eq!(RootReference::resolve(&joints), RootReference::Joint { index: 1 });
    }

    #[test]
    fn test_resolve_shoulder_midpoint() {
        let joints = names(&["left_shoulder", "left_wrist", "right_shoulder"]);
        assert_eq!(
            RootReference::resolve(&joints),
            RootReference::Midpoint { a: 0, b: 2 }
        );
    }

    #[test]
    fn test_resolve_fallback_first_joint() {
        let joints = names(&["hip", "knee"]);
        let root = RootReference::resolve(&joints);
        assert_eq!(root, RootReference::Joint { index: 0 });
        assert_eq!(root.describe(&joints), "hip");
    }

    #[test]
    fn test_joint_root_becomes_zero() {
        // 2 frames, 2 joints, 2 axes
        let coords = array![
            [[1.0, 1.0], [3.0, 5.0]],
            [[10.0, 10.0], [12.0, 14.0]]
        ];
        let out = normalize(&coords, RootReference::Joint { index: 0 });
        assert_eq!(out, array![[[0.0, 0.0], [2.0, 4.0]], [[0.0, 0.0], [2.0, 4.0]]]);
    }

    #[test]
    fn test_midpoint_root() {
        let coords = array![[[0.0, 0.0], [4.0, 2.0], [1.0, 5.0]]];
        let out = normalize(&coords, RootReference::Midpoint { a: 0, b: 1 });
        assert_eq!(out, array![[[-2.0, -1.0], [2.0, 1.0], [-1.0, 4.0]]]);
    }

    #[test]
    fn test_normalize_is_idempotent_with_fixed_root() {
        let coords = array![
            [[0.3, 1.0], [4.0, 2.0], [1.0, 5.0]],
            [[2.0, 7.0], [4.5, 2.5], [9.0, 0.0]]
        ];
        for root in [
            RootReference::Joint { index: 2 },
            RootReference::Midpoint { a: 0, b: 1 },
        ] {
            let once = normalize(&coords, root);
            let twice = normalize(&once, root);
            for (x, y) in once.iter().zip(twice.iter()) {
                assert!((x - y).abs() < 1e-12);
            }
        }
    }
}
