//! Output sinks
//!
//! [`FileSink`] writes into a temporary file next to the destination and
//! only moves it into place on [`FileSink::finish`], so a failed run never
//! leaves a truncated output behind.

use crate::error::{Error, Result};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Sequential line writer
pub trait OutputSink {
    fn write_line(&mut self, line: &str) -> std::io::Result<()>;
    fn flush(&mut self) -> std::io::Result<()>;
}

/// Atomic file output
pub struct FileSink {
    path: PathBuf,
    writer: BufWriter<NamedTempFile>,
    lines: usize,
}

impl FileSink {
    pub fn create(path: &Path) -> Result<Self> {
        let unwritable = |source| Error::OutputUnwritable {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(unwritable)?;
        let temp = NamedTempFile::new_in(&dir).map_err(unwritable)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(temp),
            lines: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> usize {
        self.lines
    }

    /// Flush and move the finished output into place
    pub fn finish(self) -> Result<PathBuf> {
        let path = self.path;
        let temp = self
            .writer
            .into_inner()
            .map_err(|e| Error::OutputUnwritable {
                path: path.clone(),
                source: e.into_error(),
            })?;
        temp.persist(&path).map_err(|e| Error::OutputUnwritable {
            path: path.clone(),
            source: e.error,
        })?;
        Ok(path)
    }
}

impl OutputSink for FileSink {
    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Collects output lines in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Vec<String>,
    flushes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Output joined with `\n`, no trailing newline
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl OutputSink for MemorySink {
    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
