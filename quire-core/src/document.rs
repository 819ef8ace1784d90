//! Documents handed to the translator.
//!
//! The engine never discovers files itself: callers wrap whatever they have
//! in a [`Document`] that supplies an identity, the raw text and, optionally,
//! where rendered output should be written.

use quire_types::DocId;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub trait Document: Send + Sync {
    /// Stable identity, used as the AST cache key
    fn id(&self) -> &DocId;

    /// Raw text to tokenize
    fn content(&self) -> io::Result<String>;

    /// Where rendered output is written, if anywhere
    fn destination(&self) -> Option<&Path> {
        None
    }
}

/// In-memory document
#[derive(Debug, Clone)]
pub struct TextDocument {
    id: DocId,
    text: String,
    destination: Option<PathBuf>,
}

impl TextDocument {
    pub fn new(id: impl Into<DocId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            destination: None,
        }
    }

    pub fn with_destination(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination = Some(path.into());
        self
    }
}

impl Document for TextDocument {
    fn id(&self) -> &DocId {
        &self.id
    }

    fn content(&self) -> io::Result<String> {
        Ok(self.text.clone())
    }

    fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }
}

/// Document read from disk each time its content is requested
#[derive(Debug, Clone)]
pub struct FileDocument {
    id: DocId,
    source: PathBuf,
    destination: Option<PathBuf>,
}

impl FileDocument {
    pub fn new(
        id: impl Into<DocId>,
        source: impl Into<PathBuf>,
        destination: Option<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            destination,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl Document for FileDocument {
    fn id(&self) -> &DocId {
        &self.id
    }

    fn content(&self) -> io::Result<String> {
        fs::read_to_string(&self.source)
    }

    fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }
}
