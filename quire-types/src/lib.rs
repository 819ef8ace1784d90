//! Shared types for quire
//!
//! This crate provides the identifiers shared by the translation engine and
//! the command-line front end: document identity and output backends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Document identifier, used as the AST cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocId(pub String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocId {
    fn from(id: &str) -> Self {
        DocId(id.to_string())
    }
}

impl From<String> for DocId {
    fn from(id: String) -> Self {
        DocId(id)
    }
}

/// Rendering target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Plain HTML fragment rooted at `<body>`
    #[default]
    Html,
    /// HTML page using the Materialize front-end framework
    Materialize,
    /// LaTeX document
    Latex,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Html, Backend::Materialize, Backend::Latex];

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Html => "html",
            Backend::Materialize => "materialize",
            Backend::Latex => "latex",
        }
    }

    /// File extension for written output
    pub fn file_extension(&self) -> &'static str {
        match self {
            Backend::Html | Backend::Materialize => "html",
            Backend::Latex => "tex",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(Backend::Html),
            "materialize" => Ok(Backend::Materialize),
            "latex" | "tex" => Ok(Backend::Latex),
            other => Err(format!(
                "unknown backend '{}' (expected html, materialize or latex)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!("html".parse::<Backend>(), Ok(Backend::Html));
        assert_eq!("LaTeX".parse::<Backend>(), Ok(Backend::Latex));
        assert!("pdf".parse::<Backend>().is_err());
    }

    #[test]
    fn test_backend_extension() {
        assert_eq!(Backend::Materialize.file_extension(), "html");
        assert_eq!(Backend::Latex.file_extension(), "tex");
    }

    #[test]
    fn test_doc_id_display() {
        let id = DocId::new("guide/intro.md");
        assert_eq!(id.to_string(), "guide/intro.md");
        assert_eq!(id.as_str(), "guide/intro.md");
    }
}
