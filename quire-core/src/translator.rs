//! The translator: owns the reader, the renderer and the loaded extensions,
//! caches one AST per document, and runs batch builds.
//!
//! A batch build tokenizes every document in order on the calling thread,
//! then renders the cached ASTs on a bounded pool of scoped worker threads.
//! Workers pull `(index, ast)` tasks from a shared queue and send results
//! back over a channel; they only read the renderer and their own AST.

use crate::config::Config;
use crate::document::Document;
use crate::error::{ConfigError, TranslateError};
use crate::extension::{Extension, ExtensionCatalog};
use crate::reader::Reader;
use crate::renderer::Renderer;
use crate::tokens::{Ast, Unmatched};
use parking_lot::Mutex;
use quire_render::Output;
use quire_types::{Backend, DocId};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::thread;

pub struct Translator {
    reader: Reader,
    renderer: Renderer,
    extensions: Vec<Box<dyn Extension>>,
    cache: HashMap<DocId, Arc<Ast>>,
}

impl Translator {
    /// Install `extensions` into the reader and renderer, then check that
    /// every token variant a reader component can produce has a binding for
    /// the renderer's backend
    pub fn new(
        mut reader: Reader,
        mut renderer: Renderer,
        extensions: Vec<Box<dyn Extension>>,
    ) -> Result<Self, ConfigError> {
        let mut seen: Vec<&str> = Vec::new();
        for extension in &extensions {
            if seen.contains(&extension.name()) {
                return Err(ConfigError::DuplicateExtension(extension.name().to_string()));
            }
            seen.push(extension.name());
        }

        for extension in &extensions {
            tracing::debug!("Extending with '{}'", extension.name());
            extension.extend(&mut reader, &mut renderer)?;
        }

        let backend = renderer.backend();
        for component in reader.components() {
            for variant in component.variants() {
                if !renderer.has_binding(variant, backend) {
                    return Err(ConfigError::MissingBinding {
                        component: component.name().to_string(),
                        variant: variant.name(),
                        backend,
                    });
                }
            }
        }

        Ok(Self {
            reader,
            renderer,
            extensions,
            cache: HashMap::new(),
        })
    }

    /// Markdown translator with the extensions and backend named by `config`
    pub fn from_config(config: &Config, catalog: &ExtensionCatalog) -> Result<Self, ConfigError> {
        let names = config.extension_names();
        if let Some(stray) = config
            .extension_config
            .keys()
            .find(|key| !names.contains(key))
        {
            return Err(ConfigError::UnknownExtension(stray.clone()));
        }

        let extensions = names
            .iter()
            .map(|name| catalog.load(name, config.options_for(name)))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(Reader::markdown(), Renderer::new(config.backend), extensions)
    }

    pub fn backend(&self) -> Backend {
        self.renderer.backend()
    }

    pub fn reader(&self) -> &Reader {
        &self.reader
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn extension_names(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(|e| e.name())
    }

    /// Cached AST for `id`, if it has been tokenized since the last reinit
    pub fn ast(&self, id: &DocId) -> Option<Arc<Ast>> {
        self.cache.get(id).cloned()
    }

    /// Clear per-run state everywhere and drop every cached AST
    pub fn reinit(&mut self) {
        for extension in &self.extensions {
            extension.reinit();
        }
        self.reader.reinit();
        self.renderer.reinit();
        self.cache.clear();
    }

    /// Reinitialize, then tokenize `doc` and cache its AST
    pub fn tokenize(&mut self, doc: &dyn Document) -> Result<Arc<Ast>, TranslateError> {
        self.reinit();
        self.tokenize_one(doc)
    }

    /// Render the cached AST for `doc` (tokenizing it first if needed) and
    /// write it to the document's destination
    pub fn render(&mut self, doc: &dyn Document) -> Result<Output, TranslateError> {
        let ast = match self.cache.get(doc.id()) {
            Some(ast) => Arc::clone(ast),
            None => self.tokenize(doc)?,
        };
        let (output, _) = render_document(&self.renderer, doc, &ast)?;
        Ok(output)
    }

    /// Tokenize then render one document
    pub fn build(&mut self, doc: &dyn Document) -> Result<Output, TranslateError> {
        self.tokenize(doc)?;
        self.render(doc)
    }

    /// Tokenize `docs` in order, then render them on up to `workers` threads
    /// (0 uses the available parallelism). Failures are recorded per document.
    pub fn build_all(&mut self, docs: &[Arc<dyn Document>], workers: usize) -> BuildSummary {
        self.reinit();

        let mut reports = Vec::with_capacity(docs.len());
        let mut tasks = Vec::new();
        for (index, doc) in docs.iter().enumerate() {
            let mut report = DocumentReport::new(doc.id().clone());
            match self.tokenize_one(doc.as_ref()) {
                Ok(ast) => {
                    report.record(&ast);
                    tasks.push((index, ast));
                }
                Err(err) => {
                    tracing::error!("Failed to tokenize {}: {}", doc.id(), err);
                    report.failure = Some(err.to_string());
                }
            }
            reports.push(report);
        }
        tracing::info!("Tokenized {} documents", tasks.len());

        let workers = pool_size(workers, tasks.len());
        let rendered = tasks.len();
        for (index, result) in self.render_parallel(docs, tasks, workers) {
            match result {
                Ok(written) => reports[index].written = written,
                Err(err) => {
                    tracing::error!("Failed to render {}: {}", docs[index].id(), err);
                    reports[index].failure = Some(err.to_string());
                }
            }
        }
        tracing::info!("Rendered {} documents with {} workers", rendered, workers);

        BuildSummary { documents: reports }
    }

    fn tokenize_one(&mut self, doc: &dyn Document) -> Result<Arc<Ast>, TranslateError> {
        let text = doc.content().map_err(|source| TranslateError::Read {
            id: doc.id().clone(),
            source,
        })?;

        let mut ast = Ast::new(doc.id().clone());
        self.reader.parse(&mut ast, &text)?;
        tracing::debug!("Tokenized {} into {} nodes", doc.id(), ast.len());

        let ast = Arc::new(ast);
        self.cache.insert(doc.id().clone(), Arc::clone(&ast));
        Ok(ast)
    }

    fn render_parallel(
        &self,
        docs: &[Arc<dyn Document>],
        tasks: Vec<(usize, Arc<Ast>)>,
        workers: usize,
    ) -> Vec<(usize, Result<Option<PathBuf>, TranslateError>)> {
        let (task_tx, task_rx) = mpsc::channel::<(usize, Arc<Ast>)>();
        let (result_tx, result_rx) = mpsc::channel();
        let mut unqueued = Vec::new();
        for task in tasks {
            if let Err(mpsc::SendError((index, _))) = task_tx.send(task) {
                tracing::error!("Failed to queue {} for rendering", docs[index].id());
                let id = docs[index].id().clone();
                unqueued.push((index, Err(TranslateError::QueueClosed { id })));
            }
        }
        drop(task_tx);

        let task_rx = Mutex::new(task_rx);
        let renderer = &self.renderer;
        thread::scope(|scope| {
            for _ in 0..workers {
                let task_rx = &task_rx;
                let result_tx = result_tx.clone();
                scope.spawn(move || loop {
                    let next = task_rx.lock().recv();
                    let Ok((index, ast)) = next else {
                        break;
                    };
                    let result = render_document(renderer, docs[index].as_ref(), &ast)
                        .map(|(_, written)| written);
                    if result_tx.send((index, result)).is_err() {
                        break;
                    }
                });
            }
        });
        drop(result_tx);

        unqueued.extend(result_rx);
        unqueued
    }
}

/// Render `ast` and write the output to the document's destination, if any
fn render_document(
    renderer: &Renderer,
    doc: &dyn Document,
    ast: &Ast,
) -> Result<(Output, Option<PathBuf>), TranslateError> {
    let output = renderer.render(ast).map_err(|source| TranslateError::Render {
        id: doc.id().clone(),
        source,
    })?;

    let Some(path) = doc.destination() else {
        return Ok((output, None));
    };
    let write_err = |source| TranslateError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, output.write()).map_err(write_err)?;
    tracing::debug!("Wrote {}", path.display());

    Ok((output, Some(path.to_path_buf())))
}

fn pool_size(requested: usize, tasks: usize) -> usize {
    let requested = if requested == 0 {
        thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    } else {
        requested
    };
    requested.clamp(1, tasks.max(1))
}

/// A content error left in a document's AST
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub line: usize,
    pub pattern: String,
    pub message: String,
}

/// Outcome of building one document
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub id: DocId,
    pub errors: Vec<Diagnostic>,
    pub unmatched: Vec<Unmatched>,
    pub written: Option<PathBuf>,
    /// Read, render or write failure; the document produced no output
    pub failure: Option<String>,
}

impl DocumentReport {
    fn new(id: DocId) -> Self {
        Self {
            id,
            errors: Vec::new(),
            unmatched: Vec::new(),
            written: None,
            failure: None,
        }
    }

    fn record(&mut self, ast: &Ast) {
        self.errors = ast
            .errors()
            .into_iter()
            .map(|(id, error)| Diagnostic {
                line: ast.node(id).map(|n| n.line()).unwrap_or(1),
                pattern: error.pattern.clone(),
                message: error.message.clone(),
            })
            .collect();
        self.unmatched = ast.unmatched().to_vec();
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.unmatched.is_empty() && self.failure.is_none()
    }
}

/// Per-document reports of a batch build, in input order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildSummary {
    pub documents: Vec<DocumentReport>,
}

impl BuildSummary {
    pub fn is_clean(&self) -> bool {
        self.documents.iter().all(DocumentReport::is_clean)
    }

    pub fn error_count(&self) -> usize {
        self.documents.iter().map(|d| d.errors.len()).sum()
    }

    pub fn unmatched_count(&self) -> usize {
        self.documents.iter().map(|d| d.unmatched.len()).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.documents.iter().filter(|d| d.failure.is_some()).count()
    }

    pub fn written_count(&self) -> usize {
        self.documents.iter().filter(|d| d.written.is_some()).count()
    }
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} documents: {} written, {} content errors, {} unmatched, {} failed",
            self.documents.len(),
            self.written_count(),
            self.error_count(),
            self.unmatched_count(),
            self.failure_count()
        )
    }
}
