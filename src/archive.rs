use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ArchiveError;
use crate::post::PostItem;

/// Fixed location of the first post record file inside the export.
pub const POSTS_RELATIVE_PATH: &str = "your_instagram_activity/content/posts_1.json";

const POSTS_DIR: &str = "your_instagram_activity/content";

static POSTS_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^posts_(\d+)\.json$").unwrap());

/// Read every post record from the archive, in export order.
///
/// `posts_1.json` must exist. Large accounts are split across numbered files
/// (`posts_2.json`, ...); all of them are read and concatenated in numeric
/// order.
pub fn read_posts(archive_root: &Path) -> Result<Vec<PostItem>, ArchiveError> {
    if !archive_root.is_dir() {
        return Err(ArchiveError::ArchiveNotFound(archive_root.to_path_buf()));
    }

    let first = archive_root.join(POSTS_RELATIVE_PATH);
    if !first.is_file() {
        return Err(ArchiveError::RecordFileNotFound(first));
    }

    let content_dir = archive_root.join(POSTS_DIR);
    let mut numbered: Vec<(u32, PathBuf)> = Vec::new();
    let entries = fs::read_dir(&content_dir).map_err(|source| ArchiveError::Io {
        path: content_dir.clone(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ArchiveError::Io {
            path: content_dir.clone(),
            source,
        })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(caps) = POSTS_FILE_RE.captures(name) {
            if let Ok(n) = caps[1].parse::<u32>() {
                numbered.push((n, entry.path()));
            }
        }
    }
    numbered.sort_by_key(|(n, _)| *n);

    let mut items = Vec::new();
    for (_, path) in &numbered {
        items.extend(parse_record_file(path)?);
    }
    Ok(items)
}

fn parse_record_file(path: &Path) -> Result<Vec<PostItem>, ArchiveError> {
    let bytes = fs::read(path).map_err(|source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArchiveError::MalformedArchive {
        path: path.to_path_buf(),
        source,
    })
}
