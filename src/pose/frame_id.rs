use regex::Regex;
use std::sync::LazyLock;

// frame_1, frame_042, ...
static FRAME_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^frame_(?P<n>\d+)$").expect("valid frame id regex"));

/// Extract the numeric suffix of a `frame_<n>` identifier.
pub fn parse(frame_id: &str) -> Option<u64> {
    FRAME_ID_RE
        .captures(frame_id.trim())
        .and_then(|caps| caps["n"].parse().ok())
}

/// Build the identifier for a 1-based frame number.
pub fn format(n: u64) -> String {
    format!("frame_{n}")
}

/// Timestamp of a frame in seconds: `frame_1` is t = 0.
pub fn timestamp(frame_id: &str, fps: f64) -> Option<f64> {
    parse(frame_id).map(|n| n.saturating_sub(1) as f64 / fps)
}

/// Sort frame identifiers by their numeric suffix (not lexically).
/// Returns the first identifier that doesn't parse as the error.
pub fn sort_ids<'a, I>(ids: I) -> Result<Vec<String>, String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut keyed = Vec::new();
    for id in ids {
        match parse(id) {
            Some(n) => keyed.push((n, id.clone())),
            None => return Err(id.clone()),
        }
    }
    keyed.sort_by_key(|(n, _)| *n);
    Ok(keyed.into_iter().map(|(_, id)| id).collect())
}
