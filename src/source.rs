//! Template sources
//!
//! Templates are read forward-only, one line at a time; a template is never
//! materialized in memory as a whole. A [`TemplateStore`] resolves template
//! names (as written in requests and `INCLUDE` triggers) to sources.

use crate::error::{Error, Result};
use crate::line::Line;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Sequential line reader over a named template
pub trait TemplateSource {
    fn name(&self) -> &str;

    /// Next line, without its terminator. `None` at end of template.
    fn next_line(&mut self) -> std::io::Result<Option<Line>>;
}

/// [`TemplateSource`] over any buffered reader
pub struct LineReader<R> {
    name: String,
    reader: R,
    number: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
            number: 0,
            buf: Vec::new(),
        }
    }
}

impl LineReader<Cursor<Vec<u8>>> {
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, Cursor::new(text.into().into_bytes()))
    }
}

impl LineReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::TemplateNotFound {
            name: path.display().to_string(),
            source,
        })?;
        Ok(Self::new(path.display().to_string(), BufReader::new(file)))
    }
}

impl<R: BufRead> TemplateSource for LineReader<R> {
    fn name(&self) -> &str {
        &self.name
    }

    /// Bytes that are not valid UTF-8 (Latin-1 comments in old copybooks)
    /// are replaced with U+FFFD and the line is still processed.
    fn next_line(&mut self) -> std::io::Result<Option<Line>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        let bytes = self
            .buf
            .strip_suffix(b"\n")
            .map(|b| b.strip_suffix(b"\r").unwrap_or(b))
            .unwrap_or(&self.buf);
        self.number += 1;
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(e) => {
                warn!(
                    template = %self.name,
                    line = self.number,
                    column = e.valid_up_to() + 1,
                    "invalid UTF-8, replacing undecodable bytes"
                );
                String::from_utf8_lossy(bytes).into_owned()
            }
        };
        Ok(Some(Line::new(self.number, text)))
    }
}

/// Resolves template names to sources
pub trait TemplateStore {
    fn open(&self, name: &str) -> Result<Box<dyn TemplateSource>>;
}

/// Templates on disk, relative names resolved under a root directory
#[derive(Debug, Clone)]
pub struct DirTemplateStore {
    root: PathBuf,
}

impl DirTemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl TemplateStore for DirTemplateStore {
    fn open(&self, name: &str) -> Result<Box<dyn TemplateSource>> {
        let path = self.resolve(name);
        let reader = LineReader::open(&path).map_err(|e| match e {
            Error::TemplateNotFound { source, .. } => Error::TemplateNotFound {
                name: name.to_string(),
                source,
            },
            other => other,
        })?;
        Ok(Box::new(reader))
    }
}

/// Named templates held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplateStore {
    templates: HashMap<String, String>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.templates.insert(name.into(), text.into());
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn open(&self, name: &str) -> Result<Box<dyn TemplateSource>> {
        let text = self
            .templates
            .get(name)
            .ok_or_else(|| Error::TemplateNotFound {
                name: name.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such template"),
            })?;
        Ok(Box::new(LineReader::from_text(name, text.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn drain(source: &mut dyn TemplateSource) -> Vec<(usize, String)> {
        let mut lines = Vec::new();
        while let Some(line) = source.next_line().unwrap() {
            lines.push((line.number(), line.into_text()));
        }
        lines
    }

    #[test]
    fn test_reader_strips_terminators() {
        let mut reader = LineReader::from_text("t", "A\r\nB\n\nC");
        assert_eq!(
            drain(&mut reader),
            vec![
                (1, "A".to_string()),
                (2, "B".to_string()),
                (3, String::new()),
                (4, "C".to_string()),
            ]
        );
    }

    #[test]
    fn test_reader_replaces_invalid_utf8() {
        let bytes = b"      * PR\xc9MIUM\r\n       PROGRAM-ID. X.\n".to_vec();
        let mut reader = LineReader::new("latin1.cpy", Cursor::new(bytes));
        assert_eq!(
            drain(&mut reader),
            vec![
                (1, "      * PR\u{FFFD}MIUM".to_string()),
                (2, "       PROGRAM-ID. X.".to_string()),
            ]
        );
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTemplateStore::new().with("main", "&PGM|\n");
        let mut source = store.open("main").unwrap();
        assert_eq!(source.name(), "main");
        assert_eq!(drain(source.as_mut()).len(), 1);
        assert!(matches!(
            store.open("missing"),
            Err(Error::TemplateNotFound { ref name, .. }) if name == "missing"
        ));
    }

    #[test]
    fn test_dir_store_resolves_relative_names() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("frag")).unwrap();
        fs::write(temp.path().join("frag/hdr.cbt"), "      * HEADER\n").unwrap();

        let store = DirTemplateStore::new(temp.path());
        let mut source = store.open("frag/hdr.cbt").unwrap();
        assert_eq!(drain(source.as_mut()), vec![(1, "      * HEADER".to_string())]);

        let err = store.open("nope.cbt").err().unwrap();
        assert!(err.to_string().starts_with("Template not found: nope.cbt"));
    }
}
