//! LaTeX output nodes.

use crate::tree::{Markup, OutId, Tree, TreeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Latex {
    /// `start\name{children}end`
    Command {
        name: String,
        start: String,
        end: String,
    },
    /// `start\name children end`, for commands whose arguments are built as children
    CustomCommand {
        name: String,
        start: String,
        end: String,
    },
    /// `\begin{name}children\end{name}`, each on its own line
    Environment { name: String },
    /// Children wrapped in a pair of delimiters: `{}`, `[]`, `$$`
    Enclosure { open: &'static str, close: &'static str },
    Text { content: String, escape: bool },
}

impl Latex {
    pub fn command(name: impl Into<String>) -> Self {
        Latex::Command {
            name: name.into(),
            start: String::new(),
            end: String::new(),
        }
    }

    /// Command on its own line
    pub fn command_line(name: impl Into<String>) -> Self {
        Latex::Command {
            name: name.into(),
            start: "\n".to_string(),
            end: "\n".to_string(),
        }
    }

    pub fn custom(name: impl Into<String>, start: &str, end: &str) -> Self {
        Latex::CustomCommand {
            name: name.into(),
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    pub fn environment(name: impl Into<String>) -> Self {
        Latex::Environment { name: name.into() }
    }

    pub fn brace() -> Self {
        Latex::Enclosure {
            open: "{",
            close: "}",
        }
    }

    pub fn bracket() -> Self {
        Latex::Enclosure {
            open: "[",
            close: "]",
        }
    }

    pub fn inline_math() -> Self {
        Latex::Enclosure {
            open: "$",
            close: "$",
        }
    }

    /// Text escaped on output
    pub fn text(content: impl Into<String>) -> Self {
        Latex::Text {
            content: content.into(),
            escape: true,
        }
    }

    pub fn raw(content: impl Into<String>) -> Self {
        Latex::Text {
            content: content.into(),
            escape: false,
        }
    }
}

impl Markup for Latex {
    fn open(&self, out: &mut String) {
        match self {
            Latex::Command { name, start, .. } => {
                out.push_str(start);
                out.push('\\');
                out.push_str(name);
                out.push('{');
            }
            Latex::CustomCommand { name, start, .. } => {
                out.push_str(start);
                out.push('\\');
                out.push_str(name);
            }
            Latex::Environment { name } => out.push_str(&format!("\n\\begin{{{}}}\n", name)),
            Latex::Enclosure { open, .. } => out.push_str(open),
            Latex::Text {
                content,
                escape: true,
            } => out.push_str(&escape(content)),
            Latex::Text { content, .. } => out.push_str(content),
        }
    }

    fn close(&self, out: &mut String) {
        match self {
            Latex::Command { end, .. } => {
                out.push('}');
                out.push_str(end);
            }
            Latex::CustomCommand { end, .. } => out.push_str(end),
            Latex::Environment { name } => out.push_str(&format!("\n\\end{{{}}}\n", name)),
            Latex::Enclosure { close, .. } => out.push_str(close),
            Latex::Text { .. } => {}
        }
    }

    fn is_leaf(&self) -> bool {
        matches!(self, Latex::Text { .. })
    }

    fn describe(&self) -> String {
        match self {
            Latex::Command { name, .. } | Latex::CustomCommand { name, .. } => {
                format!("\\{}", name)
            }
            Latex::Environment { name } => format!("environment '{}'", name),
            Latex::Enclosure { open, close } => format!("{}{}", open, close),
            Latex::Text { .. } => "latex text".to_string(),
        }
    }
}

impl Tree<Latex> {
    /// Append `\name{text}` with escaped text
    pub fn command_with(
        &mut self,
        parent: OutId,
        name: &str,
        text: &str,
    ) -> Result<OutId, TreeError> {
        let cmd = self.push(parent, Latex::command(name))?;
        self.push(cmd, Latex::text(text))?;
        Ok(cmd)
    }

    /// Append `{text}` with escaped text
    pub fn brace_with(&mut self, parent: OutId, text: &str) -> Result<OutId, TreeError> {
        let brace = self.push(parent, Latex::brace())?;
        self.push(brace, Latex::text(text))?;
        Ok(brace)
    }

    pub fn text(&mut self, parent: OutId, content: impl Into<String>) -> Result<OutId, TreeError> {
        self.push(parent, Latex::text(content))
    }
}

/// Escape LaTeX special characters
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '^' => out.push_str("\\^{}"),
            '~' => out.push_str("\\textasciitilde{}"),
            '\\' => out.push_str("\\textbackslash{}"),
            '<' => out.push_str("\\textless{}"),
            '>' => out.push_str("\\textgreater{}"),
            _ => out.push(c),
        }
    }
    out
}
