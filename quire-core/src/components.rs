//! Reader and render component contracts.
//!
//! A reader component owns one pattern: its regular expression, the settings
//! its `settings` group accepts, and the builder that turns a match into
//! tokens. A render component owns the output for one token variant on every
//! backend. Extensions bundle both kinds and register them through
//! [`Reader::add`](crate::reader::Reader::add) and
//! [`Renderer::add`](crate::renderer::Renderer::add).

use crate::error::RenderError;
use crate::lexer::{BuildContext, BuildResult, LexerMatch};
use crate::settings::{Schema, Settings};
use crate::tokens::{Ast, NodeId, TokenVariant};
use quire_render::{Html, Latex, OutId, Tree};

/// Output insertion point for the rendered node's children, or `None` to
/// attach them to the parent the node was rendered under
pub type RenderResult = Result<Option<OutId>, RenderError>;

pub trait ReaderComponent: Send + Sync {
    /// Pattern name, unique within its grammar
    fn name(&self) -> &str;

    /// Regular expression, anchored by the lexer
    fn pattern(&self) -> &str;

    /// Settings accepted by the `settings` group of the pattern
    fn settings(&self) -> Schema {
        Schema::attributes()
    }

    /// Whether the `settings` group is parsed before `create_token` runs
    fn parse_settings(&self) -> bool {
        true
    }

    /// Token variants this component can produce; each needs a render binding
    fn variants(&self) -> Vec<TokenVariant>;

    fn create_token(
        &self,
        cx: &mut BuildContext<'_>,
        m: &LexerMatch<'_>,
        settings: &Settings,
    ) -> BuildResult;

    /// Clear per-run state
    fn reinit(&self) {}
}

pub trait RenderComponent: Send + Sync {
    fn create_html(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult;

    /// Materialize output; plain HTML unless overridden
    fn create_materialize(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        self.create_html(ast, node, tree, parent)
    }

    fn create_latex(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult;

    /// Clear per-run state
    fn reinit(&self) {}
}

/// Fetch the token a render component was bound to
pub fn token<'a, T: crate::tokens::Token>(
    ast: &'a Ast,
    node: NodeId,
) -> Result<&'a T, RenderError> {
    let found = ast.node(node)?;
    found.get::<T>().ok_or_else(|| RenderError::Content {
        variant: found.token().name(),
        message: format!("expected a {} token", TokenVariant::of::<T>().name()),
    })
}
