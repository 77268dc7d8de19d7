pub mod frame_id;
pub mod load;

use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Unrecognized pose data format: {0}")]
    UnknownFormat(String),
    #[error("The {0} sequence has no frames")]
    EmptySequence(Dancer),
    #[error("The {0} sequence's first frame has no joints")]
    EmptyVocabulary(Dancer),
    #[error("Bad frame identifier in {dancer} sequence: {frame_id:?} (expected frame_<n>)")]
    BadFrameId { dancer: Dancer, frame_id: String },
    #[error("The user sequence is missing reference joints: {}", .missing.join(", "))]
    VocabularyMismatch { missing: Vec<String> },
    #[error("{dancer} {frame_id} is missing joint {joint}")]
    MissingJoint {
        dancer: Dancer,
        frame_id: String,
        joint: String,
    },
    #[error("{dancer} {frame_id} joint {joint} has {len} coordinates (expected 2 or 3)")]
    BadCoordinate {
        dancer: Dancer,
        frame_id: String,
        joint: String,
        len: usize,
    },
    #[error("{dancer} {frame_id} joint {joint} has a non-finite coordinate")]
    NonFinite {
        dancer: Dancer,
        frame_id: String,
        joint: String,
    },
    #[error("Non-numeric value {value:?} in column {column}")]
    NonNumeric { column: String, value: String },
}

/// Which performance a sequence belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dancer {
    Original,
    User,
}

impl fmt::Display for Dancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dancer::Original => write!(f, "original"),
            Dancer::User => write!(f, "user"),
        }
    }
}

/// One joint position as found in the input document.
/// Accepts `[x, y]`, `[x, y, z]`, `{ "x": .., "y": .., "z": .. }` or
/// `{ "position": [x, y] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Array(Vec<f64>),
    Object {
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        z: Option<f64>,
    },
    Position {
        position: Vec<f64>,
    },
}

impl Coordinate {
    pub fn components(&self) -> Vec<f64> {
        match self {
            Coordinate::Array(values) | Coordinate::Position { position: values } => {
                values.clone()
            }
            Coordinate::Object { x, y, z: Some(z) } => vec![*x, *y, *z],
            Coordinate::Object { x, y, z: None } => vec![*x, *y],
        }
    }
}

/// Joint name → coordinate for one frame.
pub type RawFrame = BTreeMap<String, Coordinate>;

/// Frame identifier → frame, for one dancer. Key order is NOT frame order.
pub type RawSequence = BTreeMap<String, RawFrame>;

/// The input document: both dancers' raw frame tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoseData {
    pub original: RawSequence,
    pub user: RawSequence,
}

/// One dancer's frames as a dense `(frame, joint, axis)` array.
/// Joint order matches [`PosePair::joints`].
#[derive(Debug, Clone)]
pub struct Sequence {
    pub dancer: Dancer,
    /// Frame identifiers in numeric order; index i ↔ `coords[i, .., ..]`.
    pub frame_ids: Vec<String>,
    pub coords: Array3<f64>,
}

impl Sequence {
    pub fn len(&self) -> usize {
        self.frame_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_ids.is_empty()
    }

    /// Length in seconds at the given frame rate.
    pub fn duration(&self, fps: f64) -> f64 {
        self.len() as f64 / fps
    }
}

/// A validated original/user pair sharing one joint vocabulary.
///
/// Construction is the only place malformed input is detected; everything
/// downstream can assume both sequences are non-empty and fully populated.
#[derive(Debug, Clone)]
pub struct PosePair {
    /// Sorted joint vocabulary, taken from the reference's first frame.
    pub joints: Vec<String>,
    /// Coordinate axes kept per joint (2 or 3).
    pub depth: usize,
    pub original: Sequence,
    pub user: Sequence,
}

impl PosePair {
    pub fn new(data: &PoseData) -> Result<Self, LoadError> {
        // Emptiness is checked first so it's reported before anything else
        if data.original.is_empty() {
            return Err(LoadError::EmptySequence(Dancer::Original));
        }
        if data.user.is_empty() {
            return Err(LoadError::EmptySequence(Dancer::User));
        }

        let original_ids = sorted_ids(Dancer::Original, &data.original)?;
        let user_ids = sorted_ids(Dancer::User, &data.user)?;

        let first = &data.original[&original_ids[0]];
        let joints: Vec<String> = first.keys().cloned().collect();
        if joints.is_empty() {
            return Err(LoadError::EmptyVocabulary(Dancer::Original));
        }

        let user_first = &data.user[&user_ids[0]];
        let missing: Vec<String> = joints
            .iter()
            .filter(|j| !user_first.contains_key(*j))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(LoadError::VocabularyMismatch { missing });
        }
        let extra = user_first.keys().filter(|k| !first.contains_key(*k)).count();
        if extra > 0 {
            log::warn!("Ignoring {} user joints not in the reference vocabulary", extra);
        }

        let depth = coordinate_depth(Dancer::Original, &data.original, &original_ids, &joints)?
            .min(coordinate_depth(Dancer::User, &data.user, &user_ids, &joints)?);

        let original =
            build_sequence(Dancer::Original, &data.original, original_ids, &joints, depth);
        let user = build_sequence(Dancer::User, &data.user, user_ids, &joints, depth);

        log::info!(
            "Loaded {} original and {} user frames ({} joints, {}D)",
            original.len(),
            user.len(),
            joints.len(),
            depth
        );

        Ok(Self {
            joints,
            depth,
            original,
            user,
        })
    }
}

fn sorted_ids(dancer: Dancer, seq: &RawSequence) -> Result<Vec<String>, LoadError> {
    frame_id::sort_ids(seq.keys()).map_err(|frame_id| LoadError::BadFrameId { dancer, frame_id })
}

/// Smallest coordinate length over every vocabulary joint of every frame.
/// Also validates that each frame carries the full vocabulary with finite values.
fn coordinate_depth(
    dancer: Dancer,
    seq: &RawSequence,
    ids: &[String],
    joints: &[String],
) -> Result<usize, LoadError> {
    let mut depth = 3;
    for id in ids {
        let frame = &seq[id];
        for joint in joints {
            let coord = frame.get(joint).ok_or_else(|| LoadError::MissingJoint {
                dancer,
                frame_id: id.clone(),
                joint: joint.clone(),
            })?;
            let components = coord.components();
            let len = components.len();
            if !(2..=3).contains(&len) {
                return Err(LoadError::BadCoordinate {
                    dancer,
                    frame_id: id.clone(),
                    joint: joint.clone(),
                    len,
                });
            }
            if components.iter().any(|v| !v.is_finite()) {
                return Err(LoadError::NonFinite {
                    dancer,
                    frame_id: id.clone(),
                    joint: joint.clone(),
                });
            }
            depth = depth.min(len);
        }
    }
    Ok(depth)
}

// Callers have already validated every (frame, joint) entry via coordinate_depth
fn build_sequence(
    dancer: Dancer,
    seq: &RawSequence,
    ids: Vec<String>,
    joints: &[String],
    depth: usize,
) -> Sequence {
    let mut coords = Array3::<f64>::zeros((ids.len(), joints.len(), depth));
    for (t, id) in ids.iter().enumerate() {
        let frame = &seq[id];
        for (j, joint) in joints.iter().enumerate() {
            if let Some(coord) = frame.get(joint) {
                for (d, value) in coord.components().into_iter().take(depth).enumerate() {
                    coords[[t, j, d]] = value;
                }
            }
        }
    }
    Sequence {
        dancer,
        frame_ids: ids,
        coords,
    }
}
