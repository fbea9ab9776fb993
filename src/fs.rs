//! File access boundary
//!
//! The filter document is read through [`FileSource`] so tests can swap the
//! real filesystem for an in-memory one.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Something that can read a whole file as text
pub trait FileSource: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl FileSource for OsFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// In-memory files keyed by path
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    files: HashMap<PathBuf, String>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

impl FileSource for MemFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }
}
