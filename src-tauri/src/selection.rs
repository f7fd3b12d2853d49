//! Image-set selection: turns a raw dialog or drag-drop payload into a
//! clean list of absolute paths to supported images.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Extensions accepted as input images, matched case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tiff", "tga"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no supported image files in selection (expected png, jpg, jpeg, bmp, tiff or tga)")]
    NoValidImages,
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

/// Resolves a raw payload to absolute paths of existing, supported image
/// files. Unsupported and unreadable entries are dropped silently;
/// duplicates keep their first-seen position.
pub fn filter_supported(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut kept: Vec<PathBuf> = Vec::new();
    for path in paths {
        if !is_supported(path) {
            continue;
        }
        let abs = match fs::canonicalize(path) {
            Ok(abs) => abs,
            Err(_) => continue,
        };
        if !abs.is_file() {
            continue;
        }
        if !kept.contains(&abs) {
            kept.push(abs);
        }
    }
    kept
}

/// Replaces `current` with the valid subset of `incoming`. A payload that
/// yields zero valid images is an error and leaves `current` untouched,
/// so a stray drop cannot wipe a good selection.
pub fn replace_selection(
    current: &mut Vec<PathBuf>,
    incoming: &[PathBuf],
) -> Result<usize, SelectionError> {
    let kept = filter_supported(incoming);
    if kept.is_empty() {
        return Err(SelectionError::NoValidImages);
    }
    let count = kept.len();
    *current = kept;
    Ok(count)
}
