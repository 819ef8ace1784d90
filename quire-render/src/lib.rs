//! # quire-render
//!
//! Output trees for the quire document translator.
//!
//! A render pass builds one [`Tree`] per document: HTML tags and text for the
//! `html` and `materialize` backends, LaTeX commands and environments for the
//! `latex` backend. Trees are arenas addressed by [`OutId`]; the only thing a
//! caller ever needs from a finished tree is [`Output::write`].

pub mod html;
pub mod latex;
pub mod tree;

pub use html::{Html, Tag};
pub use latex::Latex;
pub use tree::{Markup, OutId, Tree, TreeError};

/// A fully rendered document
#[derive(Debug, Clone)]
pub enum Output {
    Html(Tree<Html>),
    Latex(LatexDocument),
}

impl Output {
    /// Serialize the output tree to its final markup text
    pub fn write(&self) -> String {
        match self {
            Output::Html(tree) => tree.write(),
            Output::Latex(doc) => doc.write(),
        }
    }
}

/// LaTeX body plus the preamble needed to typeset it
#[derive(Debug, Clone)]
pub struct LatexDocument {
    pub class: String,
    pub packages: Vec<String>,
    pub body: Tree<Latex>,
}

impl LatexDocument {
    pub fn new(packages: Vec<String>, body: Tree<Latex>) -> Self {
        Self {
            class: "article".to_string(),
            packages,
            body,
        }
    }

    pub fn write(&self) -> String {
        let mut out = format!("\\documentclass{{{}}}\n", self.class);
        for package in &self.packages {
            out.push_str(&format!("\\usepackage{{{}}}\n", package));
        }
        out.push_str(&self.body.write());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latex_document_preamble() {
        let mut body = Tree::new(Latex::environment("document"));
        let root = body.root();
        body.push(root, Latex::text("Hi")).unwrap();

        let doc = LatexDocument::new(vec!["hyperref".into(), "ulem".into()], body);
        assert_eq!(
            Output::Latex(doc).write(),
            "\\documentclass{article}\n\\usepackage{hyperref}\n\\usepackage{ulem}\n\n\\begin{document}\nHi\n\\end{document}\n"
        );
    }
}
