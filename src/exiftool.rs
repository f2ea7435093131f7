use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};

use crate::resolve::ResolvedMetadata;

/// Batch metadata writer: applies a full tag set to one file per call and
/// reports success or failure for the call as a whole, never per tag.
pub trait TagWriter {
    fn write_tags(&mut self, path: &Path, tags: &ResolvedMetadata) -> Result<(), String>;
}

/// Sentinel exiftool prints to stdout after each `-execute` in stay-open
/// mode.
const READY: &str = "{ready}";

/// Sentinel we ask exiftool to echo to stderr (via `-echo4`) so the error
/// stream can be read per command without a drain thread.
const READY_ERR: &str = "{readyerr}";

/// Build the argument batch for one file: a `-TAG=VALUE` line per non-empty
/// tag, target path last. The batch is newline-delimited on the wire, so
/// newlines inside a value are flattened to spaces; left alone they would
/// frame the rest of the value as extra file-path arguments.
pub fn tag_args(path: &Path, tags: &ResolvedMetadata) -> Vec<String> {
    let mut args: Vec<String> = tags
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| format!("-{}={}", name, value).replace(['\n', '\r'], " "))
        .collect();
    args.push(path.to_string_lossy().into_owned());
    args
}

/// Judge one batch response. exiftool prints its summary to stdout and its
/// diagnostics to stderr; warnings are tolerated, errors and a missing
/// update confirmation are not.
fn evaluate_response(out: &str, err: &str) -> Result<(), String> {
    if err.lines().any(|l| l.trim_start().starts_with("Error")) {
        return Err(err.trim().to_string());
    }
    if out.contains("weren't updated") || !out.contains("updated") {
        let detail = if out.trim().is_empty() { err.trim() } else { out.trim() };
        if detail.is_empty() {
            return Err("no update confirmation from exiftool".to_string());
        }
        return Err(detail.to_string());
    }
    Ok(())
}

/// A single long-lived `exiftool -stay_open` worker process.
///
/// Spawned once per run; call [`close`](ExifTool::close) to shut it down
/// cleanly. If it is still running on drop the child is killed and reaped.
pub struct ExifTool {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: BufReader<ChildStderr>,
    closed: bool,
}

impl ExifTool {
    pub fn spawn() -> io::Result<Self> {
        let mut child = Command::new("exiftool")
            .args(["-stay_open", "True", "-@", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "exiftool stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "exiftool stdout unavailable"))?;
        let stderr = child
            .stderr
            .take()
            .map(BufReader::new)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "exiftool stderr unavailable"))?;
        Ok(Self {
            child,
            stdin,
            stdout,
            stderr,
            closed: false,
        })
    }

    /// Send one argument batch and collect the (stdout, stderr) response up
    /// to the ready markers. `-echo4` makes exiftool emit the stderr marker
    /// after the command, so both streams can be drained in sequence.
    /// Blocks until exiftool answers; there is no timeout.
    fn execute(&mut self, args: &[String]) -> io::Result<(String, String)> {
        let mut batch = String::new();
        for arg in args {
            batch.push_str(arg);
            batch.push('\n');
        }
        batch.push_str("-echo4\n");
        batch.push_str(READY_ERR);
        batch.push('\n');
        batch.push_str("-execute\n");
        self.stdin.write_all(batch.as_bytes())?;
        self.stdin.flush()?;

        let response = read_until_marker(&mut self.stdout, READY)?;
        let diagnostics = read_until_marker(&mut self.stderr, READY_ERR)?;
        Ok((response, diagnostics))
    }

    /// Ask the worker to exit and wait for it.
    pub fn close(&mut self) -> io::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stdin.write_all(b"-stay_open\nFalse\n")?;
        self.stdin.flush()?;
        self.child.wait()?;
        Ok(())
    }
}

fn read_until_marker<R: BufRead>(reader: &mut R, marker: &str) -> io::Result<String> {
    let mut collected = String::new();
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "exiftool exited mid-command",
            ));
        }
        if line.trim_end() == marker {
            return Ok(collected);
        }
        collected.push_str(&line);
    }
}

impl TagWriter for ExifTool {
    fn write_tags(&mut self, path: &Path, tags: &ResolvedMetadata) -> Result<(), String> {
        let args = tag_args(path, tags);
        if args.len() <= 1 {
            // Only the path itself; nothing to write
            return Ok(());
        }
        let (response, diagnostics) = self.execute(&args).map_err(|e| e.to_string())?;
        evaluate_response(&response, &diagnostics)
    }
}

impl Drop for ExifTool {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Writer that accepts every batch without touching anything; used for dry
/// runs.
pub struct NullWriter;

impl TagWriter for NullWriter {
    fn write_tags(&mut self, _path: &Path, _tags: &ResolvedMetadata) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::TagValue;

    #[test]
    fn test_tag_args_format_and_order() {
        let mut tags = ResolvedMetadata::default();
        tags.set("EXIF:DateTimeOriginal", TagValue::Text("2023:11:14 22:13:20".into()));
        tags.set("EXIF:GPSLatitude", TagValue::Number(33.8));
        tags.set("EXIF:GPSLatitudeRef", TagValue::Text("S".into()));

        let args = tag_args(Path::new("/archive/media/img.jpg"), &tags);
        assert_eq!(
            args,
            vec![
                "-EXIF:DateTimeOriginal=2023:11:14 22:13:20".to_string(),
                "-EXIF:GPSLatitude=33.8".to_string(),
                "-EXIF:GPSLatitudeRef=S".to_string(),
                "/archive/media/img.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn test_tag_args_skip_empty_values() {
        let mut tags = ResolvedMetadata::default();
        tags.set("EXIF:ImageDescription", TagValue::Text(String::new()));
        tags.set("EXIF:CreateDate", TagValue::Text("2023:11:14 22:13:20".into()));

        let args = tag_args(Path::new("img.jpg"), &tags);
        assert_eq!(
            args,
            vec![
                "-EXIF:CreateDate=2023:11:14 22:13:20".to_string(),
                "img.jpg".to_string(),
            ]
        );
    }

    #[test]
    fn test_tag_args_one_line_per_argument() {
        // Multi-line values must not gain extra argfile lines; the tail of
        // the value would otherwise be read as a separate file path
        let mut tags = ResolvedMetadata::default();
        tags.set(
            "EXIF:ImageDescription",
            TagValue::Text("first line\nsecond line".into()),
        );

        let args = tag_args(Path::new("img.jpg"), &tags);
        assert_eq!(args.len(), 2);
        assert!(args.iter().all(|a| !a.contains('\n') && !a.contains('\r')));
        assert_eq!(args[0], "-EXIF:ImageDescription=first line second line");
    }

    #[test]
    fn test_evaluate_response_update_confirmed() {
        assert!(evaluate_response("    1 image files updated\n", "").is_ok());
    }

    #[test]
    fn test_evaluate_response_warning_tolerated() {
        let err = "Warning: [minor] Maker notes could not be parsed - img.jpg\n";
        assert!(evaluate_response("    1 image files updated\n", err).is_ok());
    }

    #[test]
    fn test_evaluate_response_error_on_stderr() {
        let err = "Error: Not a valid JPG (looks more like a PNG) - img.jpg\n";
        let cause = evaluate_response("    0 image files updated\n", err).unwrap_err();
        assert!(cause.contains("Not a valid JPG"));
    }

    #[test]
    fn test_evaluate_response_missing_confirmation_fails() {
        let cause = evaluate_response("", "").unwrap_err();
        assert_eq!(cause, "no update confirmation from exiftool");
    }

    #[test]
    fn test_evaluate_response_nothing_updated_fails() {
        let out = "    0 image files updated\n    1 files weren't updated due to errors\n";
        assert!(evaluate_response(out, "").is_err());
    }

    #[test]
    fn test_read_until_marker_collects_preceding_lines() {
        let mut input = std::io::Cursor::new("line one\nline two\n{ready}\nleftover\n");
        let collected = read_until_marker(&mut input, READY).unwrap();
        assert_eq!(collected, "line one\nline two\n");

        let mut truncated = std::io::Cursor::new("half a response\n");
        let err = read_until_marker(&mut truncated, READY).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_null_writer_accepts_everything() {
        let mut writer = NullWriter;
        let tags = ResolvedMetadata::default();
        assert!(writer.write_tags(Path::new("x.jpg"), &tags).is_ok());
    }
}
