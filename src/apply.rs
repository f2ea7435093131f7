use std::io;
use std::path::Path;

use filetime::FileTime;

use crate::error::ItemError;
use crate::exiftool::TagWriter;
use crate::resolve::ResolvedItem;

/// Write the resolved metadata into the file and pin its filesystem
/// timestamps to the capture time.
///
/// Timestamps are set before and again after the tag write: the metadata
/// writer touches mtime as a side effect of rewriting the file, and the
/// final on-disk mtime must equal the archive's recorded capture time.
/// A failed tag write leaves the first timestamp update in place.
pub fn apply(resolved: &ResolvedItem, writer: &mut dyn TagWriter) -> Result<(), ItemError> {
    set_times(&resolved.path, resolved.file_time)?;

    writer
        .write_tags(&resolved.path, &resolved.tags)
        .map_err(|cause| ItemError::MetadataWriteFailed {
            path: resolved.path.clone(),
            cause,
        })?;

    set_times(&resolved.path, resolved.file_time)
}

fn set_times(path: &Path, t: FileTime) -> Result<(), ItemError> {
    filetime::set_file_times(path, t, t).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ItemError::FileNotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => ItemError::PermissionDenied(path.to_path_buf()),
        _ => ItemError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}
