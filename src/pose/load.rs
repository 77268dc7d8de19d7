//! Reading pose documents from disk.
//!
//! JSON and YAML carry the `{ original: {...}, user: {...} }` document directly,
//! or a frame list (`{ frames: [...] }`, `{ poses: [...] }` or a bare array)
//! whose entries each hold one `original`/`user` (or `reference`/`cover`) pose.
//! CSV carries one frame per row with `<section>_<joint>_<axis>` columns, e.g.
//! `original_left_wrist_x`, `user_left_wrist_y`.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use super::{frame_id, Coordinate, LoadError, PoseData, RawFrame, RawSequence};

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
    Csv,
}

impl Format {
    /// Guess the format from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            "csv" => Some(Format::Csv),
            _ => None,
        }
    }
}

/// Load a pose document, detecting its format from the extension.
/// Files without a known extension are tried as JSON, then as CSV.
pub fn load_path(path: &Path) -> Result<PoseData, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    match Format::from_path(path) {
        Some(format) => {
            log::info!("Reading {} as {:?}", path.display(), format);
            parse(&contents, format)
        }
        None => match parse(&contents, Format::Json) {
            Ok(data) => {
                log::info!("Detected JSON in {}", path.display());
                Ok(data)
            }
            Err(json_err) => {
                log::debug!("Not JSON ({}), trying CSV", json_err);
                parse(&contents, Format::Csv).map_err(|csv_err| {
                    LoadError::UnknownFormat(format!(
                        "{}: not JSON ({json_err}) and not CSV ({csv_err})",
                        path.display()
                    ))
                })
            }
        },
    }
}

/// Parse a pose document held in memory.
pub fn parse(contents: &str, format: Format) -> Result<PoseData, LoadError> {
    match format {
        Format::Json => Ok(serde_json::from_str::<Document>(contents)?.into()),
        Format::Yaml => Ok(serde_yaml::from_str::<Document>(contents)?.into()),
        Format::Csv => read_csv(contents.as_bytes()),
    }
}

/// Accepted JSON/YAML layouts, tried in order. The bare list goes first:
/// derived struct impls also accept sequences, so a two-element list would
/// otherwise be read positionally as `{ original, user }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    FrameList(Vec<FramePair>),
    Sections(PoseData),
    FrameArray(FrameArray),
}

#[derive(Deserialize)]
struct FrameArray {
    #[serde(alias = "poses")]
    frames: Vec<FramePair>,
}

/// Both dancers' poses for one frame of a frame list.
#[derive(Deserialize)]
struct FramePair {
    #[serde(alias = "reference")]
    original: RawFrame,
    #[serde(alias = "cover")]
    user: RawFrame,
}

impl From<Document> for PoseData {
    fn from(doc: Document) -> Self {
        let frames = match doc {
            Document::Sections(data) => return data,
            Document::FrameArray(FrameArray { frames }) | Document::FrameList(frames) => frames,
        };
        log::debug!("Frame-list document with {} frames", frames.len());

        let mut data = PoseData::default();
        for (i, pair) in frames.into_iter().enumerate() {
            let id = frame_id::format(i as u64 + 1);
            data.original.insert(id.clone(), pair.original);
            data.user.insert(id, pair.user);
        }
        data
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Original,
    User,
}

/// A recognised CSV column: which dancer, which joint, which axis.
struct Column {
    section: Section,
    joint: String,
    axis: usize,
}

// reference ≡ original, cover ≡ user
static COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<section>original|reference|user|cover)_(?P<joint>.+)_(?P<axis>[xyz])$")
        .expect("valid column regex")
});

fn parse_column(header: &str) -> Option<Column> {
    let caps = COLUMN_RE.captures(header.trim())?;
    let section = match &caps["section"] {
        "original" | "reference" => Section::Original,
        _ => Section::User,
    };
    let axis = match &caps["axis"] {
        "x" => 0,
        "y" => 1,
        _ => 2,
    };
    Some(Column {
        section,
        joint: caps["joint"].to_string(),
        axis,
    })
}

/// Read the column-per-coordinate CSV layout.
pub fn read_csv<R: Read>(reader: R) -> Result<PoseData, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let columns: Vec<Option<Column>> = headers.iter().map(parse_column).collect();

    let recognised = columns.iter().flatten().count();
    if recognised == 0 {
        return Err(LoadError::UnknownFormat(
            "CSV has no original_/user_ coordinate columns".to_string(),
        ));
    }
    log::debug!("CSV: {} of {} columns are coordinates", recognised, headers.len());

    let mut original = RawSequence::new();
    let mut user = RawSequence::new();

    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        // joint → [x, y, z?] per section
        let mut orig_joints: BTreeMap<String, [Option<f64>; 3]> = BTreeMap::new();
        let mut user_joints: BTreeMap<String, [Option<f64>; 3]> = BTreeMap::new();

        for (i, cell) in record.iter().enumerate() {
            let Some(Some(column)) = columns.get(i) else {
                continue;
            };
            let value = if cell.is_empty() {
                0.0
            } else {
                // "nan" and "inf" parse as f64 but are not coordinates
                cell.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| LoadError::NonNumeric {
                        column: headers.get(i).unwrap_or("?").to_string(),
                        value: cell.to_string(),
                    })?
            };
            let target = match column.section {
                Section::Original => &mut orig_joints,
                Section::User => &mut user_joints,
            };
            target.entry(column.joint.clone()).or_default()[column.axis] = Some(value);
        }

        let id = frame_id::format(row as u64 + 1);
        if !orig_joints.is_empty() {
            original.insert(id.clone(), to_frame(orig_joints));
        }
        if !user_joints.is_empty() {
            user.insert(id, to_frame(user_joints));
        }
    }

    Ok(PoseData { original, user })
}

// A missing x or y column reads as 0.0, the same as an empty cell
fn to_frame(joints: BTreeMap<String, [Option<f64>; 3]>) -> BTreeMap<String, Coordinate> {
    joints
        .into_iter()
        .map(|(joint, [x, y, z])| {
            let mut values = vec![x.unwrap_or(0.0), y.unwrap_or(0.0)];
            if let Some(z) = z {
                values.push(z);
            }
            (joint, Coordinate::Array(values))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const JSON_DOC: &str = r#"{
        "original": {
            "frame_2": { "left_shoulder": [1.0, 2.0], "right_shoulder": {"x": 3.0, "y": 4.0} },
            "frame_1": { "left_shoulder": [0.0, 0.0], "right_shoulder": [2.0, 0.0] }
        },
        "user": {
            "frame_1": { "left_shoulder": [0.0, 0.0, 1.0], "right_shoulder": [2.0, 0.0, 1.0] }
        }
    }"#;

    #[test]
    fn test_parse_json_mixed_coordinate_styles() {
        let data = parse(JSON_DOC, Format::Json).unwrap();
        assert_eq!(data.original.len(), 2);
        assert_eq!(
            data.original["frame_2"]["right_shoulder"].components(),
            vec![3.0, 4.0]
        );
        assert_eq!(data.user["frame_1"]["left_shoulder"].components().len(), 3);
    }

    #[test]
    fn test_non_numeric_json_coordinate_fails() {
        let doc = r#"{"original": {"frame_1": {"a": ["x", 1.0]}}, "user": {}}"#;
        assert!(matches!(parse(doc, Format::Json), Err(LoadError::Json(_))));
    }

    #[test]
    fn test_parse_yaml() {
        let doc = "original:\n  frame_1:\n    a: [1.0, 2.0]\n\
                   user:\n  frame_1:\n    a: {x: 1.0, y: 2.0}\n";
        let data = parse(doc, Format::Yaml).unwrap();
        assert_eq!(data.user["frame_1"]["a"].components(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_read_csv_sections_and_aliases() {
        let csv = "time,original_wrist_x,original_wrist_y,cover_wrist_x,cover_wrist_y\n\
                   0.0,1,2,3,4\n\
                   0.1,5,,7,8\n";
        let data = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(data.original.len(), 2);
        assert_eq!(data.user.len(), 2);
        assert_eq!(data.original["frame_1"]["wrist"].components(), vec![1.0, 2.0]);
        // Empty cell reads as zero
        assert_eq!(data.original["frame_2"]["wrist"].components(), vec![5.0, 0.0]);
        assert_eq!(data.user["frame_2"]["wrist"].components(), vec![7.0, 8.0]);
    }

    #[test]
    fn test_read_csv_joint_names_with_underscores() {
        let csv = "user_left_wrist_x,user_left_wrist_y,user_left_wrist_z\n1,2,3\n";
        let data = read_csv(csv.as_bytes()).unwrap();
        assert!(data.original.is_empty());
        assert_eq!(
            data.user["frame_1"]["left_wrist"].components(),
            vec![1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn test_read_csv_non_numeric() {
        let csv = "original_a_x,original_a_y\n1,abc\n";
        match read_csv(csv.as_bytes()) {
            Err(LoadError::NonNumeric { column, value }) => {
                assert_eq!(column, "original_a_y");
                assert_eq!(value, "abc");
            }
            other => panic!("expected NonNumeric, got {other:?}"),
        }
    }

    #[test]
    fn test_read_csv_non_finite() {
        for cell in ["nan", "inf", "-Infinity"] {
            let csv = format!("original_a_x,original_a_y\n{cell},1\n");
            match read_csv(csv.as_bytes()) {
                Err(LoadError::NonNumeric { column, value }) => {
                    assert_eq!(column, "original_a_x");
                    assert_eq!(value, cell);
                }
                other => panic!("expected NonNumeric for {cell}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_yaml_nan_reaches_validation() {
        let doc = "original:\n  frame_1:\n    a: [.nan, 2.0]\n\
                   user:\n  frame_1:\n    a: [1.0, 2.0]\n";
        let data = parse(doc, Format::Yaml).unwrap();
        assert!(matches!(
            crate::pose::PosePair::new(&data),
            Err(LoadError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_parse_frames_array() {
        let doc = r#"{"frames": [
            {"original": {"a": [1.0, 2.0]}, "user": {"a": [1.5, 2.5]}},
            {"original": {"a": [3.0, 4.0]}, "user": {"a": {"position": [3.5, 4.5]}}}
        ]}"#;
        let data = parse(doc, Format::Json).unwrap();
        assert_eq!(data.original.len(), 2);
        assert_eq!(data.original["frame_2"]["a"].components(), vec![3.0, 4.0]);
        assert_eq!(data.user["frame_2"]["a"].components(), vec![3.5, 4.5]);
    }

    #[test]
    fn test_parse_poses_array_with_reference_cover() {
        let doc = r#"{"poses": [{"reference": {"a": [1.0, 2.0]}, "cover": {"a": [5.0, 6.0]}}]}"#;
        let data = parse(doc, Format::Json).unwrap();
        assert_eq!(data.original["frame_1"]["a"].components(), vec![1.0, 2.0]);
        assert_eq!(data.user["frame_1"]["a"].components(), vec![5.0, 6.0]);
    }

    #[test]
    fn test_parse_bare_frame_list() {
        let doc = "- original: {a: [0.0, 1.0]}\n  user: {a: [0.0, 2.0]}\n\
                   - original: {a: [1.0, 1.0]}\n  user: {a: [1.0, 2.0]}\n\
                   - original: {a: [2.0, 1.0]}\n  user: {a: [2.0, 2.0]}\n";
        let data = parse(doc, Format::Yaml).unwrap();
        assert_eq!(data.user.len(), 3);
        assert_eq!(data.user["frame_3"]["a"].components(), vec![2.0, 2.0]);

        let json = r#"[
            {"original": {"a": [0.0, 1.0]}, "user": {"a": [0.0, 2.0]}},
            {"original": {"a": [1.0, 1.0]}, "user": {"a": [1.0, 2.0]}}
        ]"#;
        let data = parse(json, Format::Json).unwrap();
        assert_eq!(data.original.len(), 2);
        assert_eq!(data.original["frame_2"]["a"].components(), vec![1.0, 1.0]);
    }

    #[test]
    fn test_read_csv_without_coordinate_columns() {
        assert!(matches!(
            read_csv("a,b\n1,2\n".as_bytes()),
            Err(LoadError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_load_path_sniffs_json_without_extension() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(JSON_DOC.as_bytes()).unwrap();
        let data = load_path(file.path()).unwrap();
        assert_eq!(data.user.len(), 1);
    }

    #[test]
    fn test_load_path_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pose.csv");
        std::fs::write(&path, "original_a_x,original_a_y\n1,2\n").unwrap();
        let data = load_path(&path).unwrap();
        assert_eq!(data.original.len(), 1);
        assert_eq!(Format::from_path(Path::new("x.YML")), Some(Format::Yaml));
    }
}
