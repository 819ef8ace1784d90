//! Error types for the translation engine.
//!
//! Configuration errors ([`ConfigError`]) mean the extension set itself is
//! inconsistent and halt a build before any document is read. Everything
//! else is scoped to one document: builder failures ([`TokenizeError`]) become
//! placeholder nodes in the AST, render failures ([`RenderError`]) and IO
//! failures ([`TranslateError`]) are reported per document.

use quire_render::TreeError;
use quire_types::{Backend, DocId};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("the key '{0}' already exists")]
    Duplicate(String),

    #[error("the key '{0}' does not exist")]
    NotFound(String),

    #[error("index {index} is out of range for {len} items")]
    OutOfRange { index: usize, len: usize },

    #[error("invalid location '{0}'")]
    InvalidLocation(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("unknown setting '{key}' (known settings: {known})")]
    UnknownKey { key: String, known: String },

    #[error("missing required setting '{0}'")]
    MissingRequired(String),

    #[error("setting '{key}' expects {expected} but got '{found}'")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: String,
    },

    #[error("malformed settings text '{0}', expected key=value pairs")]
    Malformed(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
    #[error("invalid {variant}: {message}")]
    Constraint {
        variant: &'static str,
        message: String,
    },

    #[error("{child} cannot be placed under {parent}")]
    InvalidParent {
        child: &'static str,
        parent: &'static str,
    },

    #[error("token node #{0} does not exist")]
    MissingNode(usize),
}

impl TokenError {
    pub fn constraint(variant: &'static str, message: impl Into<String>) -> Self {
        TokenError::Constraint {
            variant,
            message: message.into(),
        }
    }
}

/// Failure raised by a pattern builder while processing one fragment
#[derive(Error, Debug)]
pub enum TokenizeError {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: Box<TokenizeError>,
    },
}

impl TokenizeError {
    pub fn msg(message: impl Into<String>) -> Self {
        TokenizeError::Message(message.into())
    }

    /// Wrap this error with a higher-level message
    pub fn context(self, message: impl Into<String>) -> Self {
        TokenizeError::Context {
            message: message.into(),
            source: Box::new(self),
        }
    }

    /// Messages from this error and every underlying cause, outermost first
    pub fn chain(&self) -> Vec<String> {
        let mut out = vec![self.to_string()];
        let mut current = std::error::Error::source(self);
        while let Some(err) = current {
            out.push(err.to_string());
            current = err.source();
        }
        out
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("no {backend} binding for token '{variant}'")]
    MissingBinding {
        variant: &'static str,
        backend: Backend,
    },

    #[error("cannot render {variant}: {message}")]
    Content {
        variant: &'static str,
        message: String,
    },

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("invalid pattern '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("cannot register '{name}' in grammar '{grammar}': {source}")]
    Registration {
        grammar: String,
        name: String,
        #[source]
        source: StorageError,
    },

    #[error("a {backend} binding for token '{variant}' is already registered")]
    DuplicateBinding {
        variant: &'static str,
        backend: Backend,
    },

    #[error("binding for token '{variant}' renders {given} output, not {backend}")]
    BackendMismatch {
        variant: &'static str,
        backend: Backend,
        given: &'static str,
    },

    #[error("component '{component}' produces '{variant}', which has no {backend} binding")]
    MissingBinding {
        component: String,
        variant: &'static str,
        backend: Backend,
    },

    #[error("unknown extension '{0}'")]
    UnknownExtension(String),

    #[error("extension '{0}' is loaded twice")]
    DuplicateExtension(String),

    #[error("invalid configuration for extension '{extension}': {source}")]
    ExtensionOption {
        extension: String,
        #[source]
        source: SettingsError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Per-document failure while translating
#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("failed to read {id}: {source}")]
    Read {
        id: DocId,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to tokenize: {0}")]
    Grammar(#[from] StorageError),

    #[error("failed to render {id}: {source}")]
    Render {
        id: DocId,
        #[source]
        source: RenderError,
    },
    #[error("render queue closed before {id} was queued")]
    QueueClosed { id: DocId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_error_chain() {
        let err = TokenizeError::from(TokenError::constraint("Heading", "level must be 1..=6"))
            .context("failed to build heading");
        assert_eq!(
            err.chain(),
            vec![
                "failed to build heading".to_string(),
                "invalid Heading: level must be 1..=6".to_string(),
            ]
        );
    }
}
