//! # Input Splits
//!
//! Cuts file-based input into byte-range partitions and streams the lines of
//! each one.
//!
//! A line belongs to the split containing its first byte. A split that does
//! not start at offset 0 discards everything up to the first line boundary at
//! or after its start, and stops once the next line would start at or past its
//! end. Every line is therefore read by exactly one split, whatever the split
//! size.

use crate::error::InputError;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A source of raw records processed by one partition reducer.
pub trait PartitionSource: Send {
    type Records: Iterator<Item = Result<String, InputError>>;

    /// Human-readable origin, used in logs.
    fn label(&self) -> String;

    /// Start streaming the records.
    fn open(self) -> Result<Self::Records, InputError>;
}

/// In-memory partition, one record per item.
impl PartitionSource for Vec<String> {
    type Records = std::iter::Map<std::vec::IntoIter<String>, fn(String) -> Result<String, InputError>>;

    fn label(&self) -> String {
        format!("memory[{}]", self.len())
    }

    fn open(self) -> Result<Self::Records, InputError> {
        Ok(self.into_iter().map(Ok as fn(String) -> Result<String, InputError>))
    }
}

/// Byte range `[start, start + len)` of one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSplit {
    pub path: PathBuf,
    pub start: u64,
    pub len: u64,
}

impl InputSplit {
    pub fn new(path: impl Into<PathBuf>, start: u64, len: u64) -> Self {
        Self {
            path: path.into(),
            start,
            len,
        }
    }

    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.len)
    }
}

impl PartitionSource for InputSplit {
    type Records = SplitLines;

    fn label(&self) -> String {
        format!("{}:{}+{}", self.path.display(), self.start, self.len)
    }

    fn open(self) -> Result<SplitLines, InputError> {
        SplitLines::open(self)
    }
}

/// Plan the splits for `path`.
///
/// A directory contributes each visible regular file in name order; names
/// starting with `.` or `_` are skipped. Empty files produce no split.
pub fn plan_splits(path: &Path, split_size: u64) -> Result<Vec<InputSplit>, InputError> {
    let split_size = split_size.max(1);
    let meta = fs::metadata(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => InputError::NotFound(path.to_path_buf()),
        _ => InputError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let files = if meta.is_dir() {
        list_input_files(path)?
    } else {
        vec![(path.to_path_buf(), meta.len())]
    };

    let mut splits = Vec::new();
    for (file, len) in files {
        let mut start = 0;
        while start < len {
            let chunk = split_size.min(len - start);
            splits.push(InputSplit::new(file.clone(), start, chunk));
            start += chunk;
        }
    }
    if splits.is_empty() {
        warn!(path = %path.display(), "input contains no data");
    }
    debug!(path = %path.display(), splits = splits.len(), "planned input splits");
    Ok(splits)
}

fn list_input_files(dir: &Path) -> Result<Vec<(PathBuf, u64)>, InputError> {
    let io_err = |source| InputError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }
        // follows symlinks, unlike `DirEntry::metadata`
        let meta = fs::metadata(entry.path()).map_err(io_err)?;
        if meta.is_file() {
            files.push((entry.path(), meta.len()));
        }
    }
    files.sort();
    Ok(files)
}

/// Lines of one split, without their terminators.
pub struct SplitLines {
    reader: BufReader<File>,
    path: PathBuf,
    pos: u64,
    end: u64,
    buf: Vec<u8>,
    failed: bool,
}

impl SplitLines {
    pub fn open(split: InputSplit) -> Result<Self, InputError> {
        let io_err = |source| InputError::Io {
            path: split.path.clone(),
            source,
        };
        let file = File::open(&split.path).map_err(io_err)?;
        let mut reader = BufReader::new(file);
        let mut pos = split.start;
        if split.start > 0 {
            // a line starting exactly at `start` is ours, so look from the byte before
            reader.seek(SeekFrom::Start(split.start - 1)).map_err(io_err)?;
            let mut skipped = Vec::new();
            let n = reader.read_until(b'\n', &mut skipped).map_err(io_err)?;
            pos = split.start - 1 + n as u64;
        }
        Ok(Self {
            reader,
            pos,
            end: split.end(),
            buf: Vec::new(),
            path: split.path,
            failed: false,
        })
    }
}

impl Iterator for SplitLines {
    type Item = Result<String, InputError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.end {
            return None;
        }
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(n) => {
                self.pos += n as u64;
                let mut line = &self.buf[..];
                if let Some(rest) = line.strip_suffix(b"\n") {
                    line = rest;
                }
                if let Some(rest) = line.strip_suffix(b"\r") {
                    line = rest;
                }
                Some(Ok(String::from_utf8_lossy(line).into_owned()))
            }
            Err(source) => {
                self.failed = true;
                Some(Err(InputError::Io {
                    path: self.path.clone(),
                    source,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn read_all(splits: Vec<InputSplit>) -> Vec<String> {
        splits
            .into_iter()
            .flat_map(|split| split.open().unwrap())
            .map(|line| line.unwrap())
            .collect()
    }

    #[test]
    fn every_line_read_once_for_any_split_size() {
        let dir = tempfile::tempdir().unwrap();
        let contents = "alpha\nbe\n\ngamma-gamma\r\nd\nlast-without-newline";
        let path = write_file(dir.path(), "rows.xml", contents);
        let expected = vec!["alpha", "be", "", "gamma-gamma", "d", "last-without-newline"];

        for split_size in 1..=(contents.len() as u64 + 1) {
            let splits = plan_splits(&path, split_size).unwrap();
            assert_eq!(read_all(splits), expected, "split_size={split_size}");
        }
    }

    #[test]
    fn directory_skips_hidden_files_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "b.xml", "2\n");
        write_file(dir.path(), "a.xml", "1\n");
        write_file(dir.path(), "_SUCCESS", "");
        write_file(dir.path(), ".a.xml.crc", "junk\n");
        write_file(dir.path(), "empty.xml", "");

        let splits = plan_splits(dir.path(), 1024).unwrap();
        assert_eq!(splits.len(), 2);
        assert_eq!(read_all(splits), vec!["1", "2"]);
    }

    #[cfg(unix)]
    #[test]
    fn directory_follows_symlinked_files() {
        let dir = tempfile::tempdir().unwrap();
        let real = write_file(dir.path(), "real.xml", "1\n2\n");
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        std::os::unix::fs::symlink(&real, data.join("part-0")).unwrap();

        let splits = plan_splits(&data, 1024).unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].len, 4);
        assert_eq!(read_all(splits), vec!["1", "2"]);
    }

    #[test]
    fn missing_path_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = plan_splits(&dir.path().join("nope"), 10).unwrap_err();
        assert!(matches!(err, InputError::NotFound(_)));
    }

    #[test]
    fn memory_partition_yields_items() {
        let part = vec!["x".to_string(), "y".to_string()];
        assert_eq!(part.label(), "memory[2]");
        let lines: Vec<String> = part.open().unwrap().map(Result::unwrap).collect();
        assert_eq!(lines, vec!["x", "y"]);
    }
}
