//! Path formatting and cube-list file helpers.

use std::fs;
use std::path::Path;

use crate::constants::label::LIST_COMMENT_PREFIX;
use crate::errors::ComposeError;
use crate::types::{CubeId, DisplayName};

/// Return the base file name of `cube_id`, or the id itself when it has no
/// file-name component.
pub fn base_name(cube_id: &str) -> DisplayName {
    Path::new(cube_id)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| cube_id.to_string())
}

/// Format `cube_id` for display: the full path when `full_paths`, the base
/// name otherwise.
pub fn display_name(cube_id: &str, full_paths: bool) -> DisplayName {
    if full_paths {
        cube_id.to_string()
    } else {
        base_name(cube_id)
    }
}

/// Read a cube-list file: one identifier per line, with blank lines and
/// `#` comment lines skipped.
pub fn read_cube_list(path: impl AsRef<Path>) -> Result<Vec<CubeId>, ComposeError> {
    let contents = fs::read_to_string(path)?;
    let mut ids = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(LIST_COMMENT_PREFIX) {
            continue;
        }
        ids.push(line.to_string());
    }
    Ok(ids)
}
