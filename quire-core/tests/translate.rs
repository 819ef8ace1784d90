//! End-to-end tests for the translator
//!
//! These tests drive the built-in extensions through tokenize, render and
//! batch builds, the way the command-line front end does.

use quire_core::{
    Backend, ConfigError, CoreExtension, Document, Extension, ExtensionCatalog, FloatsExtension,
    Reader, RenderComponent, RenderResult, Renderer, TextDocument, Translator,
};
use quire_core::tokens::{Ast, Heading, NodeId};
use quire_render::{Html, Latex, OutId, Tag, Tree};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

const PAGE: &str = "# Cats

!float id=fig-one caption=Asleep
A cat on a mat.

Some *text* with a [link](https://example.org).

!float
Another cat.
";

fn translator(backend: Backend) -> Translator {
    Translator::new(
        Reader::markdown(),
        Renderer::new(backend),
        vec![
            Box::new(CoreExtension::default()),
            Box::new(FloatsExtension::default()),
        ],
    )
    .unwrap()
}

#[test]
fn test_reinit_between_builds_is_idempotent() {
    let mut translator = translator(Backend::Html);
    let doc = TextDocument::new("cats.md", PAGE);

    let first = translator.build(&doc).unwrap().write();
    let first_ast = translator.ast(doc.id()).unwrap().dump();
    let second = translator.build(&doc).unwrap().write();
    let second_ast = translator.ast(doc.id()).unwrap().dump();

    assert_eq!(first, second);
    assert_eq!(first_ast, second_ast);
    assert!(second.contains("<span class=\"quire-caption-heading\">Figure 1:</span>"));
    assert!(second.contains("<span class=\"quire-caption-heading\">Figure 2</span>"));
    assert!(!second.contains("Figure 3"));
}

#[test]
fn test_every_backend_renders_the_page() {
    for backend in Backend::ALL {
        let mut translator = translator(backend);
        let doc = TextDocument::new("cats.md", PAGE);
        let output = translator.build(&doc).unwrap().write();

        let ast = translator.ast(doc.id()).unwrap();
        assert!(ast.errors().is_empty(), "{}: {:?}", backend, ast.errors());
        assert!(ast.unmatched().is_empty());
        match backend {
            Backend::Html => assert!(output.starts_with("<body><h1 id=\"cats\">Cats</h1>")),
            Backend::Materialize => assert!(output.contains("<div class=\"container\">")),
            Backend::Latex => {
                assert!(output.contains("\\section{Cats}\n\\label{cats}"));
                assert!(output.contains("\\href{https://example.org}{link}"));
                assert!(output.contains("\\caption{Asleep}\\label{fig-one}"));
            }
        }
    }
}

#[test]
fn test_content_error_is_isolated() {
    let mut translator = translator(Backend::Html);
    let doc = TextDocument::new("broken.md", "before\n\n- item\nnot indented\n\nafter\n");
    let output = translator.build(&doc).unwrap().write();

    let ast = translator.ast(doc.id()).unwrap();
    let errors = ast.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(ast.node(errors[0].0).unwrap().line(), 3);

    assert!(output.starts_with("<body><p>before</p><div class=\"quire-exception\">"));
    assert!(output.ends_with("<p>after</p></body>"));
}

struct LoudHeading;

impl RenderComponent for LoudHeading {
    fn create_html(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        Ok(Some(tree.tag(parent, Tag::new("h1").class("loud"))?))
    }

    fn create_latex(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        Ok(Some(tree.push(parent, Latex::command("textbf"))?))
    }
}

/// Tries to take over heading output, which `core` already binds
struct Shadowing;

impl Extension for Shadowing {
    fn name(&self) -> &str {
        "shadowing"
    }

    fn extend(&self, _reader: &mut Reader, renderer: &mut Renderer) -> Result<(), ConfigError> {
        renderer.add::<Heading>(LoudHeading)
    }
}

#[test]
fn test_second_heading_binding_is_rejected() {
    let err = Translator::new(
        Reader::markdown(),
        Renderer::new(Backend::Html),
        vec![Box::new(CoreExtension::default()), Box::new(Shadowing)],
    )
    .err()
    .unwrap();

    assert!(matches!(
        err,
        ConfigError::DuplicateBinding {
            variant: "Heading",
            backend: Backend::Html,
        }
    ));
}

#[test]
fn test_floats_without_core_has_unbound_paragraph_anchor() {
    let config = quire_core::Config::from_yaml("disable_defaults: true\nextensions: [floats]\n")
        .unwrap();
    let err = Translator::from_config(&config, &ExtensionCatalog::builtin())
        .err()
        .unwrap();
    assert!(matches!(err, ConfigError::Registration { .. }));
}

#[test]
fn test_build_all_writes_every_document() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("site");

    let docs: Vec<Arc<dyn Document>> = vec![
        Arc::new(
            TextDocument::new("a.md", "# A\n\n!float\nx\n")
                .with_destination(out.join("a.html")),
        ),
        Arc::new(
            TextDocument::new("nested/b.md", "# B\n\n!float\ny\n")
                .with_destination(out.join("nested/b.html")),
        ),
        Arc::new(
            TextDocument::new("c.md", "see [nowhere]").with_destination(out.join("c.html")),
        ),
    ];

    let mut translator = translator(Backend::Html);
    let summary = translator.build_all(&docs, 2);

    assert_eq!(summary.documents.len(), 3);
    assert_eq!(summary.written_count(), 2);
    assert_eq!(summary.failure_count(), 1);
    assert!(!summary.is_clean());
    assert!(summary.documents[2].failure.as_deref().unwrap().contains("nowhere"));

    // Float numbering runs across the batch in document order
    let a = fs::read_to_string(out.join("a.html")).unwrap();
    let b = fs::read_to_string(out.join("nested/b.html")).unwrap();
    assert!(a.contains("Figure 1"));
    assert!(b.contains("Figure 2"));
    assert!(!out.join("c.html").exists());

    assert_eq!(
        summary.to_string(),
        "3 documents: 2 written, 0 content errors, 0 unmatched, 1 failed"
    );
}

#[test]
fn test_html_page_snapshot() {
    let mut translator = translator(Backend::Html);
    let doc = TextDocument::new("cats.md", PAGE);
    let html = translator.build(&doc).unwrap().write();

    insta::assert_snapshot!(
        html.replace("><", ">\n<"),
        @r#"
    <body>
    <h1 id="cats">Cats</h1>
    <div id="fig-one" class="quire-float">
    <p class="quire-caption">
    <span class="quire-caption-heading">Figure 1:</span> <span class="quire-caption-text">Asleep</span>
    </p>
    <p>A cat on a mat.</p>
    </div>
    <p>Some <em>text</em> with a <a href="https://example.org">link</a>.</p>
    <div class="quire-float">
    <p class="quire-caption">
    <span class="quire-caption-heading">Figure 2</span>
    </p>
    <p>Another cat.</p>
    </div>
    </body>
    "#
    );
}
