pub mod apply;
pub mod archive;
pub mod error;
pub mod exiftool;
pub mod post;
pub mod resolve;

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::ItemError;
use crate::exiftool::TagWriter;
use crate::post::PostItem;

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Root directory of the extracted export
    pub archive: PathBuf,
    /// Resolve and report without touching any files
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessResult {
    pub total: u64,
    pub processed: u64,
    pub skipped: u64,
    pub warnings: Vec<String>,
}

/// Run the full pipeline: read the post records, then resolve and apply each
/// item in order, one at a time. Item-level failures become warnings and the
/// run continues; only archive-level failures abort.
pub fn process(
    options: &ProcessOptions,
    writer: &mut dyn TagWriter,
) -> anyhow::Result<ProcessResult> {
    let items = archive::read_posts(&options.archive)?;
    let total = items.len() as u64;

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} embedding metadata")
            .unwrap(),
    );

    let mut result = ProcessResult {
        total,
        ..Default::default()
    };

    for (index, item) in items.iter().enumerate() {
        match process_item(item, &options.archive, options.dry_run, writer) {
            Ok(path) => {
                result.processed += 1;
                pb.println(progress_line(&path, options.dry_run));
            }
            Err(err) => {
                result.skipped += 1;
                let line = match &err {
                    ItemError::NoMediaInItem => format!("Skipped post {}: {}", index, err),
                    _ => format!("Skipped: {}", err),
                };
                pb.println(&line);
                result.warnings.push(line);
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(result)
}

fn progress_line(path: &Path, dry_run: bool) -> String {
    if dry_run {
        format!("Would process {}", path.display())
    } else {
        format!("Processed {}", path.display())
    }
}

fn process_item(
    item: &PostItem,
    archive_root: &Path,
    dry_run: bool,
    writer: &mut dyn TagWriter,
) -> Result<PathBuf, ItemError> {
    let resolved = resolve::resolve(item, archive_root)?;
    if dry_run {
        return Ok(resolved.path);
    }
    apply::apply(&resolved, writer)?;
    Ok(resolved.path)
}
