//! # quire-core
//!
//! Core library for the quire document translator.
//!
//! Text is tokenized by a recursive, first-match-wins [`Lexer`] whose
//! grammars are filled by extensions, producing a typed [`Ast`]. A
//! [`Renderer`] walks the AST and dispatches each node to the binding
//! registered for its token variant on the active backend. The
//! [`Translator`] ties both together with an AST cache and parallel batch
//! rendering.

pub mod components;
pub mod config;
pub mod document;
pub mod error;
pub mod extension;
pub mod extensions;
pub mod lexer;
pub mod reader;
pub mod renderer;
pub mod settings;
pub mod slug;
pub mod storage;
pub mod tokens;
pub mod translator;

pub use components::{ReaderComponent, RenderComponent, RenderResult};
pub use config::Config;
pub use document::{Document, FileDocument, TextDocument};
pub use error::{
    ConfigError, RenderError, SettingsError, StorageError, TokenError, TokenizeError,
    TranslateError,
};
pub use extension::{Extension, ExtensionCatalog, ExtensionFactory};
pub use extensions::{CoreExtension, FloatsExtension};
pub use lexer::{BuildContext, BuildResult, Grammar, Lexer, LexerMatch, Pattern};
pub use reader::{Reader, BLOCK, INLINE};
pub use renderer::Renderer;
pub use settings::{Kind, Schema, SettingSpec, Settings, Value};
pub use slug::slugify;
pub use storage::{Location, Storage};
pub use tokens::{Ast, Node, NodeId, Token, TokenVariant, Unmatched};
pub use translator::{BuildSummary, Diagnostic, DocumentReport, Translator};

pub use quire_render::Output;
pub use quire_types::{Backend, DocId};
