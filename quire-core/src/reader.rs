//! The reader: reader components registered into a lexer, plus diagnostics.

use crate::components::ReaderComponent;
use crate::error::{ConfigError, StorageError};
use crate::lexer::{Lexer, Pattern};
use crate::storage::Location;
use crate::tokens::{Ast, ErrorToken, Unmatched};
use std::borrow::Cow;
use std::sync::Arc;

/// Grammar for block content; the root grammar of markdown documents
pub const BLOCK: &str = "block";
/// Grammar for text inside blocks
pub const INLINE: &str = "inline";

pub struct Reader {
    lexer: Lexer,
    root: String,
    components: Vec<Arc<dyn ReaderComponent>>,
}

impl Reader {
    /// Reader over the given grammars; the first one is the root grammar
    pub fn new(grammars: &[&str]) -> Self {
        Self {
            lexer: Lexer::new(grammars),
            root: grammars.first().copied().unwrap_or(BLOCK).to_string(),
            components: Vec::new(),
        }
    }

    /// Reader with the `block` and `inline` grammars
    pub fn markdown() -> Self {
        Self::new(&[BLOCK, INLINE])
    }

    pub fn lexer(&self) -> &Lexer {
        &self.lexer
    }

    pub fn root_grammar(&self) -> &str {
        &self.root
    }

    pub fn components(&self) -> &[Arc<dyn ReaderComponent>] {
        &self.components
    }

    /// Register `component` as a pattern in `grammar`
    pub fn add<C: ReaderComponent + 'static>(
        &mut self,
        grammar: &str,
        component: C,
        location: Location,
    ) -> Result<(), ConfigError> {
        let component: Arc<dyn ReaderComponent> = Arc::new(component);
        let schema = component.settings();
        let handle = Arc::clone(&component);

        let pattern = Pattern::new(component.name(), component.pattern(), move |cx, m| {
            let settings = if handle.parse_settings() {
                schema.parse(m.group("settings").unwrap_or("").trim())?
            } else {
                schema.defaults()
            };
            handle.create_token(cx, m, &settings)
        })?;

        tracing::debug!(
            "Adding reader component '{}' to '{}' at {}",
            component.name(),
            grammar,
            location
        );
        self.lexer.add(grammar, pattern, location)?;
        self.components.push(component);
        Ok(())
    }

    pub fn add_block<C: ReaderComponent + 'static>(
        &mut self,
        component: C,
        location: Location,
    ) -> Result<(), ConfigError> {
        self.add(BLOCK, component, location)
    }

    pub fn add_inline<C: ReaderComponent + 'static>(
        &mut self,
        component: C,
        location: Location,
    ) -> Result<(), ConfigError> {
        self.add(INLINE, component, location)
    }

    pub fn reinit(&self) {
        for component in &self.components {
            component.reinit();
        }
    }

    /// Lex `text` into `ast` with the root grammar and log any diagnostics.
    /// CRLF line endings are read as `\n`.
    pub fn parse(&self, ast: &mut Ast, text: &str) -> Result<(), StorageError> {
        let text = if text.contains("\r\n") {
            Cow::Owned(text.replace("\r\n", "\n"))
        } else {
            Cow::Borrowed(text)
        };
        let root = ast.root();
        self.lexer.tokenize(ast, root, &self.root, &text, 1)?;

        for (id, error) in ast.errors() {
            let line = ast.node(id).map(|n| n.line()).unwrap_or(1);
            tracing::error!("\n{}", report(error, line));
        }
        for unmatched in ast.unmatched() {
            tracing::warn!("{}", describe_unmatched(ast, unmatched));
        }
        Ok(())
    }
}

/// One-line description of text no pattern matched
pub fn describe_unmatched(ast: &Ast, unmatched: &Unmatched) -> String {
    format!(
        "{}:{}: no pattern matched at '{}'",
        ast.doc_id(),
        unmatched.line,
        unmatched.snippet
    )
}

/// Multi-line report for a failed builder: location, the boxed source
/// fragment with line numbers, then the error and its causes
pub fn report(error: &ErrorToken, line: usize) -> String {
    const WIDTH: usize = 78;

    let mut out = format!(
        "An error occurred while tokenizing, the error was raised by the '{}' pattern \
         while processing the following content.\n{}:{}\n",
        error.pattern, error.doc, line
    );

    let lines: Vec<&str> = error.text.trim_matches('\n').lines().collect();
    let last = line + lines.len().saturating_sub(1);
    let gutter = last.to_string().len();

    out.push_str(&format!("{}┌{}\n", " ".repeat(gutter + 1), "─".repeat(WIDTH)));
    for (i, text) in lines.iter().enumerate() {
        let shown: String = text.chars().take(WIDTH - 1).collect();
        out.push_str(&format!("{:>gutter$} │ {}\n", line + i, shown, gutter = gutter));
    }
    out.push_str(&format!("{}└{}\n", " ".repeat(gutter + 1), "─".repeat(WIDTH)));

    out.push_str(&error.message);
    for cause in &error.causes {
        out.push_str(&format!("\n  caused by: {}", cause));
    }
    out
}
