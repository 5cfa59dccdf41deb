//! File shards

use mapfold_common::error::{CommonError, ErrorContext, Result};
use mapfold_core::ShardInput;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One input file, read line by line when its shard task runs.
#[derive(Debug, Clone)]
pub struct FileShard {
    path: PathBuf,
    name: String,
}

impl FileShard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ShardInput for FileShard {
    fn name(&self) -> &str {
        &self.name
    }

    fn lines(&self) -> Result<Box<dyn Iterator<Item = Result<String>> + '_>> {
        let file = File::open(&self.path)
            .with_io_context(|| format!("Failed to open shard {}", self.path.display()))?;
        Ok(Box::new(LossyLines::new(BufReader::new(file), &self.name)))
    }
}

/// Lines of a reader, decoded as UTF-8 with invalid bytes replaced.
///
/// Only a failing read yields an error. Bad bytes are data, not I/O faults.
struct LossyLines<'a, R> {
    reader: R,
    shard: &'a str,
    buf: Vec<u8>,
}

impl<'a, R: BufRead> LossyLines<'a, R> {
    fn new(reader: R, shard: &'a str) -> Self {
        Self {
            reader,
            shard,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<'_, R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                let line = match String::from_utf8_lossy(&self.buf) {
                    Cow::Borrowed(line) => line.to_string(),
                    Cow::Owned(line) => {
                        debug!("Replaced invalid UTF-8 in a line of {}", self.shard);
                        line
                    }
                };
                Some(Ok(line))
            }
            Err(error) => Some(Err(CommonError::io_error_with_source(
                format!("Failed to read shard {}", self.shard),
                error,
            ))),
        }
    }
}

/// Files starting with `_` or `.` are bookkeeping files, not input.
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('_') || name.starts_with('.'))
}

/// Find the input shards under `path`.
///
/// A file is a single shard. A directory is walked recursively and every
/// visible file becomes a shard, in path order.
pub fn discover_shards(path: &Path) -> Result<Vec<FileShard>> {
    if !path.exists() {
        return Err(CommonError::io_error(format!(
            "Input path {} does not exist",
            path.display()
        )));
    }
    let mut files = Vec::new();
    if path.is_dir() {
        collect_files(path, &mut files)?;
        files.sort();
    } else {
        files.push(path.to_path_buf());
    }
    debug!("Found {} input file(s) under {}", files.len(), path.display());
    Ok(files.into_iter().map(FileShard::new).collect())
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_io_context(|| format!("Failed to list {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if is_hidden(&path) {
            continue;
        }
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("input.txt");
        fs::write(&file, "a\nb\n").unwrap();

        let shards = discover_shards(&file).unwrap();
        assert_eq!(shards.len(), 1);
        let lines: Vec<String> = shards[0].lines().unwrap().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mixed.txt");
        fs::write(&file, b"a b\n\xff\xfe bad\r\nc").unwrap();

        let shard = FileShard::new(&file);
        let lines: Vec<String> = shard.lines().unwrap().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["a b", "\u{FFFD}\u{FFFD} bad", "c"]);
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("crlf.txt");
        fs::write(&file, "x\r\n\r\n\ny\r\n").unwrap();

        let lines: Vec<String> = FileShard::new(&file)
            .lines()
            .unwrap()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines, vec!["x", "", "", "y"]);
    }

    #[test]
    fn test_discover_directory_skips_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "1").unwrap();
        fs::write(dir.path().join("a.txt"), "2").unwrap();
        fs::write(dir.path().join("_SUCCESS"), "").unwrap();
        fs::write(dir.path().join(".a.txt.crc"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.txt"), "3").unwrap();
        fs::create_dir(dir.path().join("_temporary")).unwrap();
        fs::write(dir.path().join("_temporary").join("d.txt"), "4").unwrap();

        let shards = discover_shards(dir.path()).unwrap();
        let names: Vec<PathBuf> = shards
            .iter()
            .map(|s| s.path().strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.txt"),
                PathBuf::from("b.txt"),
                PathBuf::from("nested/c.txt")
            ]
        );
    }

    #[test]
    fn test_missing_input_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = discover_shards(&dir.path().join("nope"));
        assert!(matches!(result, Err(CommonError::IoError { .. })));
    }

    #[test]
    fn test_deleted_shard_fails_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("gone.txt");
        fs::write(&file, "x").unwrap();
        let shard = FileShard::new(&file);
        fs::remove_file(&file).unwrap();
        assert!(matches!(shard.lines(), Err(CommonError::IoError { .. })));
    }
}
