//! Per-backend render dispatch.
//!
//! The renderer holds one binding table per backend, keyed by token variant.
//! A render pass walks the AST in pre-order and calls the binding for each
//! node; the returned output node becomes the insertion point for that
//! node's children.

use crate::components::{token, RenderComponent, RenderResult};
use crate::error::{ConfigError, RenderError};
use crate::tokens::{Ast, ErrorToken, NodeId, Token, TokenVariant};
use quire_render::{Html, Latex, LatexDocument, Markup, OutId, Output, Tag, Tree};
use quire_types::Backend;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

pub type RenderFn<N> =
    Arc<dyn Fn(&Ast, NodeId, &mut Tree<N>, OutId) -> RenderResult + Send + Sync>;

/// A render function for one backend's output tree
#[derive(Clone)]
pub enum Binding {
    Html(RenderFn<Html>),
    Latex(RenderFn<Latex>),
}

impl Binding {
    fn kind(&self) -> &'static str {
        match self {
            Binding::Html(_) => "html",
            Binding::Latex(_) => "latex",
        }
    }
}

const MATERIALIZE_HEAD: &[&str] = &[
    "https://fonts.googleapis.com/icon?family=Material+Icons",
    "https://cdnjs.cloudflare.com/ajax/libs/materialize/1.0.0/css/materialize.min.css",
];

const MATERIALIZE_SCRIPTS: &[&str] = &[
    "https://code.jquery.com/jquery-3.7.1.min.js",
    "https://cdnjs.cloudflare.com/ajax/libs/materialize/1.0.0/js/materialize.min.js",
];

struct Table<N> {
    backend: Backend,
    functions: HashMap<TypeId, (TokenVariant, RenderFn<N>)>,
}

impl<N: Markup> Table<N> {
    fn new(backend: Backend) -> Self {
        Self {
            backend,
            functions: HashMap::new(),
        }
    }

    fn insert(&mut self, variant: TokenVariant, function: RenderFn<N>) -> Result<(), ConfigError> {
        if self.functions.contains_key(&variant.type_id()) {
            return Err(ConfigError::DuplicateBinding {
                variant: variant.name(),
                backend: self.backend,
            });
        }
        self.functions.insert(variant.type_id(), (variant, function));
        Ok(())
    }

    fn with(mut self, variant: TokenVariant, function: RenderFn<N>) -> Self {
        self.functions.insert(variant.type_id(), (variant, function));
        self
    }

    fn contains(&self, variant: TokenVariant) -> bool {
        self.functions.contains_key(&variant.type_id())
    }

    /// Render the children of `node` under `parent`
    fn walk(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<N>,
        parent: OutId,
    ) -> Result<(), RenderError> {
        for &child in ast.children(node) {
            let variant = ast.node(child)?.variant();
            let (_, function) = self
                .functions
                .get(&variant.type_id())
                .ok_or(RenderError::MissingBinding {
                    variant: variant.name(),
                    backend: self.backend,
                })?;
            let inserted = function(ast, child, tree, parent)?;
            self.walk(ast, child, tree, inserted.unwrap_or(parent))?;
        }
        Ok(())
    }
}

/// One render function per backend, all calling into `component`
fn bindings(
    component: &Arc<dyn RenderComponent>,
) -> (RenderFn<Html>, RenderFn<Html>, RenderFn<Latex>) {
    let html = Arc::clone(component);
    let materialize = Arc::clone(component);
    let latex = Arc::clone(component);
    (
        Arc::new(move |ast: &Ast, node: NodeId, tree: &mut Tree<Html>, parent: OutId| {
            html.create_html(ast, node, tree, parent)
        }),
        Arc::new(move |ast: &Ast, node: NodeId, tree: &mut Tree<Html>, parent: OutId| {
            materialize.create_materialize(ast, node, tree, parent)
        }),
        Arc::new(move |ast: &Ast, node: NodeId, tree: &mut Tree<Latex>, parent: OutId| {
            latex.create_latex(ast, node, tree, parent)
        }),
    )
}

pub struct Renderer {
    backend: Backend,
    html: Table<Html>,
    materialize: Table<Html>,
    latex: Table<Latex>,
    packages: Vec<String>,
    components: Vec<Arc<dyn RenderComponent>>,
}

impl Renderer {
    /// Renderer for `backend` with the error placeholder bindings installed
    pub fn new(backend: Backend) -> Self {
        let exception: Arc<dyn RenderComponent> = Arc::new(RenderException);
        let (html, materialize, latex) = bindings(&exception);
        let variant = TokenVariant::of::<ErrorToken>();
        Self {
            backend,
            html: Table::new(Backend::Html).with(variant, html),
            materialize: Table::new(Backend::Materialize).with(variant, materialize),
            latex: Table::new(Backend::Latex).with(variant, latex),
            packages: Vec::new(),
            components: vec![exception],
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Register one render function for `(variant, backend)`
    pub fn add_binding(
        &mut self,
        variant: TokenVariant,
        backend: Backend,
        binding: Binding,
    ) -> Result<(), ConfigError> {
        tracing::debug!("Adding {} binding for {}", backend, variant);
        match (backend, binding) {
            (Backend::Html, Binding::Html(f)) => self.html.insert(variant, f),
            (Backend::Materialize, Binding::Html(f)) => self.materialize.insert(variant, f),
            (Backend::Latex, Binding::Latex(f)) => self.latex.insert(variant, f),
            (backend, binding) => Err(ConfigError::BackendMismatch {
                variant: variant.name(),
                backend,
                given: binding.kind(),
            }),
        }
    }

    /// Bind `component` to token type `T` on every backend
    pub fn add<T: Token>(
        &mut self,
        component: impl RenderComponent + 'static,
    ) -> Result<(), ConfigError> {
        let variant = TokenVariant::of::<T>();
        for backend in Backend::ALL {
            if self.has_binding(variant, backend) {
                return Err(ConfigError::DuplicateBinding {
                    variant: variant.name(),
                    backend,
                });
            }
        }

        let component: Arc<dyn RenderComponent> = Arc::new(component);
        let (html, materialize, latex) = bindings(&component);
        self.add_binding(variant, Backend::Html, Binding::Html(html))?;
        self.add_binding(variant, Backend::Materialize, Binding::Html(materialize))?;
        self.add_binding(variant, Backend::Latex, Binding::Latex(latex))?;
        self.components.push(component);
        Ok(())
    }

    pub fn has_binding(&self, variant: TokenVariant, backend: Backend) -> bool {
        match backend {
            Backend::Html => self.html.contains(variant),
            Backend::Materialize => self.materialize.contains(variant),
            Backend::Latex => self.latex.contains(variant),
        }
    }

    /// Require a LaTeX package in the preamble; repeated names are kept once
    pub fn add_package(&mut self, package: &str) {
        if !self.packages.iter().any(|p| p == package) {
            self.packages.push(package.to_string());
        }
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    pub fn reinit(&self) {
        for component in &self.components {
            component.reinit();
        }
    }

    /// Render a whole document for the active backend
    pub fn render(&self, ast: &Ast) -> Result<Output, RenderError> {
        match self.backend {
            Backend::Html => {
                let mut tree = Tree::new(Html::tag("body"));
                let root = tree.root();
                self.html.walk(ast, ast.root(), &mut tree, root)?;
                Ok(Output::Html(tree))
            }
            Backend::Materialize => {
                let mut tree = Tree::new(Html::tag("html"));
                let head = tree.tag(tree.root(), Tag::new("head"))?;
                for href in MATERIALIZE_HEAD {
                    tree.tag(
                        head,
                        Tag::void("link").attr("rel", "stylesheet").attr("href", *href),
                    )?;
                }
                let body = tree.tag(tree.root(), Tag::new("body"))?;
                let container = tree.tag(body, Tag::new("div").class("container"))?;
                for src in MATERIALIZE_SCRIPTS {
                    tree.tag(body, Tag::new("script").attr("src", *src))?;
                }
                self.materialize.walk(ast, ast.root(), &mut tree, container)?;
                Ok(Output::Html(tree))
            }
            Backend::Latex => {
                let mut tree = Tree::new(Latex::environment("document"));
                let root = tree.root();
                self.latex.walk(ast, ast.root(), &mut tree, root)?;

                let mut packages = self.packages.clone();
                if !ast.errors().is_empty() && !packages.iter().any(|p| p == "xcolor") {
                    packages.push("xcolor".to_string());
                }
                Ok(Output::Latex(LatexDocument::new(packages, tree)))
            }
        }
    }
}

/// Built-in placeholder output for failed fragments
struct RenderException;

impl RenderComponent for RenderException {
    fn create_html(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        let error = token::<ErrorToken>(ast, node)?;
        let div = tree.tag(parent, Tag::new("div").class("quire-exception"))?;
        tree.text(div, error.message.as_str())?;
        Ok(Some(div))
    }

    fn create_materialize(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        let error = token::<ErrorToken>(ast, node)?;
        let line = ast.node(node)?.line();

        let card = tree.tag(parent, Tag::new("div").class("card red lighten-4 quire-exception"))?;
        let content = tree.tag(card, Tag::new("div").class("card-content"))?;
        let title = tree.tag(content, Tag::new("span").class("card-title"))?;
        tree.text(title, "Tokenize Exception")?;
        let p = tree.tag(content, Tag::new("p"))?;
        tree.text(
            p,
            format!(
                "The '{}' pattern failed on {}:{}: {}",
                error.pattern, error.doc, line, error.message
            ),
        )?;
        let pre = tree.tag(content, Tag::new("pre"))?;
        let code = tree.tag(pre, Tag::new("code").class("language-markdown"))?;
        tree.text(code, error.text.as_str())?;
        Ok(Some(content))
    }

    fn create_latex(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        let error = token::<ErrorToken>(ast, node)?;
        let color = tree.push(parent, Latex::custom("textcolor", "\n", "\n"))?;
        tree.brace_with(color, "red")?;
        tree.brace_with(color, &error.message)?;
        Ok(Some(color))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TokenizeError;
    use crate::tokens::{Attributes, Heading, Word};
    use quire_types::DocId;

    struct RenderHeading;

    impl RenderComponent for RenderHeading {
        fn create_html(
            &self,
            ast: &Ast,
            node: NodeId,
            tree: &mut Tree<Html>,
            parent: OutId,
        ) -> RenderResult {
            let heading = token::<Heading>(ast, node)?;
            Ok(Some(tree.tag(parent, Tag::new(format!("h{}", heading.level)))?))
        }

        fn create_latex(
            &self,
            _ast: &Ast,
            _node: NodeId,
            tree: &mut Tree<Latex>,
            parent: OutId,
        ) -> RenderResult {
            Ok(Some(tree.push(parent, Latex::command_line("section"))?))
        }
    }

    struct RenderWord;

    impl RenderComponent for RenderWord {
        fn create_html(
            &self,
            ast: &Ast,
            node: NodeId,
            tree: &mut Tree<Html>,
            parent: OutId,
        ) -> RenderResult {
            tree.text(parent, token::<Word>(ast, node)?.content.as_str())?;
            Ok(None)
        }

        fn create_latex(
            &self,
            ast: &Ast,
            node: NodeId,
            tree: &mut Tree<Latex>,
            parent: OutId,
        ) -> RenderResult {
            tree.text(parent, token::<Word>(ast, node)?.content.as_str())?;
            Ok(None)
        }
    }

    fn heading_ast() -> Ast {
        let mut ast = Ast::new(DocId::new("doc"));
        let root = ast.root();
        let h = ast
            .push(root, Heading::new(2, Attributes::default()).unwrap(), 1)
            .unwrap();
        ast.push(h, Word::new("Intro").unwrap(), 1).unwrap();
        ast
    }

    fn renderer(backend: Backend) -> Renderer {
        let mut renderer = Renderer::new(backend);
        renderer.add::<Heading>(RenderHeading).unwrap();
        renderer.add::<Word>(RenderWord).unwrap();
        renderer
    }

    #[test]
    fn test_html_dispatch() {
        let output = renderer(Backend::Html).render(&heading_ast()).unwrap();
        assert_eq!(output.write(), "<body><h2>Intro</h2></body>");
    }

    #[test]
    fn test_latex_document() {
        let mut renderer = renderer(Backend::Latex);
        renderer.add_package("hyperref");
        renderer.add_package("hyperref");
        let output = renderer.render(&heading_ast()).unwrap();
        assert_eq!(
            output.write(),
            "\\documentclass{article}\n\\usepackage{hyperref}\n\n\\begin{document}\n\n\\section{Intro}\n\n\\end{document}\n"
        );
    }

    #[test]
    fn test_materialize_shell() {
        let output = renderer(Backend::Materialize)
            .render(&heading_ast())
            .unwrap()
            .write();
        assert!(output.starts_with("<html><head><link rel=\"stylesheet\""));
        assert!(output.contains("<body><div class=\"container\"><h2>Intro</h2></div><script"));
        assert!(output.ends_with("</script></body></html>"));
    }

    #[test]
    fn test_duplicate_binding_is_rejected() {
        let mut renderer = renderer(Backend::Html);
        let err = renderer.add::<Heading>(RenderHeading).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateBinding {
                variant: "Heading",
                backend: Backend::Html,
            }
        ));

        let f: RenderFn<Html> =
            Arc::new(|_: &Ast, _: NodeId, _: &mut Tree<Html>, _: OutId| Ok(None));
        let err = renderer
            .add_binding(TokenVariant::of::<Heading>(), Backend::Html, Binding::Html(f))
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateBinding { .. }));
    }

    #[test]
    fn test_backend_mismatch() {
        let mut renderer = Renderer::new(Backend::Latex);
        let f: RenderFn<Html> =
            Arc::new(|_: &Ast, _: NodeId, _: &mut Tree<Html>, _: OutId| Ok(None));
        let err = renderer
            .add_binding(TokenVariant::of::<Word>(), Backend::Latex, Binding::Html(f))
            .unwrap_err();
        assert!(matches!(err, ConfigError::BackendMismatch { given: "html", .. }));
    }

    #[test]
    fn test_missing_binding_fails_render() {
        let renderer = Renderer::new(Backend::Html);
        let err = renderer.render(&heading_ast()).unwrap_err();
        assert!(matches!(
            err,
            RenderError::MissingBinding {
                variant: "Heading",
                backend: Backend::Html,
            }
        ));
    }

    #[test]
    fn test_error_placeholder_renders_everywhere() {
        let mut ast = Ast::new(DocId::new("doc"));
        let root = ast.root();
        let error = ErrorToken::new(
            "heading",
            &TokenizeError::msg("bad & broken"),
            "# x",
            DocId::new("doc"),
        );
        ast.push_error(root, error, 4);

        let html = renderer(Backend::Html).render(&ast).unwrap().write();
        assert_eq!(
            html,
            "<body><div class=\"quire-exception\">bad &amp; broken</div></body>"
        );

        let latex = renderer(Backend::Latex).render(&ast).unwrap().write();
        assert!(latex.contains("\\usepackage{xcolor}"));
        assert!(latex.contains("\\textcolor{red}{bad \\& broken}"));

        let materialize = renderer(Backend::Materialize).render(&ast).unwrap().write();
        assert!(materialize.contains("failed on doc:4: bad &amp; broken"));
    }

    #[test]
    fn test_error_bindings_are_built_in() {
        let mut renderer = Renderer::new(Backend::Html);
        let variant = TokenVariant::of::<ErrorToken>();
        for backend in Backend::ALL {
            assert!(renderer.has_binding(variant, backend));
        }

        let err = renderer.add::<ErrorToken>(RenderWord).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateBinding {
                variant: "ErrorToken",
                backend: Backend::Html,
            }
        ));
    }
}
