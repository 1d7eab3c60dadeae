//! Client filename sanitization.
//!
//! Every name that reaches the storage directory goes through
//! [`sanitize_filename`]. The output is a plain basename made of
//! `[A-Za-z0-9_.-]` that never starts with `.` and never contains a path
//! separator, so joining it onto the storage root always yields a direct
//! child of the root.

use unicode_normalization::UnicodeNormalization;

const MAX_NAME_LEN: usize = 255;

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Converts an untrusted filename into a safe basename.
///
/// Returns `None` when nothing usable is left (empty input, `..`, a bare
/// separator, only unsupported characters).
pub fn sanitize_filename(raw: &str) -> Option<String> {
    // Compatibility decomposition splits accented letters into base letter
    // plus combining mark, so `é` keeps its `e` when non-ASCII is dropped.
    let spaced: String = raw
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let mut name = trim_edges(&filtered).to_string();
    if name.is_empty() {
        return None;
    }
    if is_device_name(&name) {
        name.insert(0, '_');
    }
    if name.len() > MAX_NAME_LEN {
        // ASCII only at this point, so any byte index is a char boundary.
        name.truncate(MAX_NAME_LEN);
        name = trim_edges(&name).to_string();
    }

    Some(name)
}

fn trim_edges(value: &str) -> &str {
    value.trim_matches(|c| c == '.' || c == '_')
}

fn is_device_name(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name);
    WINDOWS_DEVICE_NAMES
        .iter()
        .any(|device| device.eq_ignore_ascii_case(stem))
}
