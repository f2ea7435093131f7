use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use igexif_rs::exiftool::{ExifTool, NullWriter};
use igexif_rs::{process, ProcessOptions};

#[derive(Parser)]
#[command(name = "igexif-rs", version, about = "Instagram Export EXIF Writer - embed archive metadata into image files")]
struct Cli {
    /// Root directory of the extracted Instagram data export
    archive: PathBuf,

    /// Resolve and report without touching any files
    #[arg(long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let t_total = std::time::Instant::now();

    let options = ProcessOptions {
        archive: cli.archive,
        dry_run: cli.dry_run,
    };

    let result = if options.dry_run {
        process(&options, &mut NullWriter)?
    } else {
        let mut writer = ExifTool::spawn()
            .context("failed to start exiftool (is it installed and on PATH?)")?;
        let run = process(&options, &mut writer);
        let closed = writer.close();
        let result = run?;
        closed.context("failed to shut down exiftool")?;
        result
    };

    eprintln!(
        "Done! {} posts, {} processed, {} skipped ({:.2}s)",
        result.total,
        result.processed,
        result.skipped,
        t_total.elapsed().as_secs_f64()
    );

    Ok(())
}
