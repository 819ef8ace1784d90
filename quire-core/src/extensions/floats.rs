//! The `floats` extension: numbered, captioned blocks.
//!
//! ```text
//! !float id=fig-cat caption=A sleeping cat
//! Any block content, up to the next blank line.
//! ```
//!
//! Numbers are counted per prefix and restart whenever the extension is
//! reinitialized.

use crate::components::{token, ReaderComponent, RenderComponent, RenderResult};
use crate::error::{ConfigError, RenderError, TokenError};
use crate::extension::Extension;
use crate::lexer::{BuildContext, BuildResult, LexerMatch};
use crate::reader::{Reader, BLOCK};
use crate::renderer::Renderer;
use crate::settings::{Kind, Schema, SettingSpec, Settings, Value};
use crate::storage::Location;
use crate::tokens::{Ast, Attributes, Counter, NodeId, Token, TokenVariant};
use quire_render::{Html, Latex, OutId, Tag, Tree};
use std::sync::Arc;

const DEFAULT_PREFIX: &str = "Figure";

/// A numbered block with an optional caption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Float {
    pub prefix: String,
    pub number: usize,
    pub caption: Option<String>,
    pub attributes: Attributes,
}

impl Float {
    pub fn new(
        prefix: impl Into<String>,
        number: usize,
        caption: Option<String>,
        attributes: Attributes,
    ) -> Result<Self, TokenError> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(TokenError::constraint("Float", "'prefix' must not be empty"));
        }
        if number == 0 {
            return Err(TokenError::constraint("Float", "number must be at least 1"));
        }
        Ok(Self {
            prefix,
            number,
            caption,
            attributes,
        })
    }

    /// `Figure 1`
    pub fn heading(&self) -> String {
        format!("{} {}", self.prefix, self.number)
    }
}

impl Token for Float {
    fn properties(&self) -> Vec<(&'static str, String)> {
        let mut props = vec![
            ("prefix", format!("{:?}", self.prefix)),
            ("number", self.number.to_string()),
        ];
        if let Some(caption) = &self.caption {
            props.push(("caption", format!("{:?}", caption)));
        }
        if let Some(id) = &self.attributes.id {
            props.push(("id", format!("{:?}", id)));
        }
        props
    }
}

#[derive(Debug)]
pub struct FloatsExtension {
    prefix: String,
    counter: Arc<Counter>,
}

impl Default for FloatsExtension {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            counter: Arc::new(Counter::new()),
        }
    }
}

impl FloatsExtension {
    /// Current count for `prefix`, for tests and diagnostics
    pub fn count(&self, prefix: &str) -> usize {
        self.counter.current(&prefix.to_lowercase())
    }
}

impl Extension for FloatsExtension {
    fn name(&self) -> &str {
        "floats"
    }

    fn config_schema(&self) -> Schema {
        Schema::new().with(SettingSpec::new(
            "prefix",
            Kind::Str,
            DEFAULT_PREFIX,
            "Default caption prefix for floats.",
        ))
    }

    fn configure(&mut self, settings: Settings) {
        if let Some(prefix) = settings.str("prefix").filter(|p| !p.is_empty()) {
            self.prefix = prefix.to_string();
        }
    }

    fn extend(&self, reader: &mut Reader, renderer: &mut Renderer) -> Result<(), ConfigError> {
        reader.add_block(
            FloatComponent {
                prefix: self.prefix.clone(),
                counter: Arc::clone(&self.counter),
            },
            Location::before("paragraph"),
        )?;
        renderer.add::<Float>(RenderFloat)?;
        Ok(())
    }

    fn reinit(&self) {
        self.counter.reset();
    }
}

struct FloatComponent {
    prefix: String,
    counter: Arc<Counter>,
}

impl ReaderComponent for FloatComponent {
    fn name(&self) -> &str {
        "float"
    }

    fn pattern(&self) -> &str {
        concat!(
            r"\s*!float(?P<settings>[^\n]*)\n(?s:(?P<body>.*?))",
            r"(?:(?:[ \t]*\n){2,}|\s*\z)"
        )
    }

    fn settings(&self) -> Schema {
        Schema::attributes()
            .with(SettingSpec::new(
                "prefix",
                Kind::Str,
                self.prefix.as_str(),
                "Caption prefix, counted separately from other prefixes.",
            ))
            .with(SettingSpec::new(
                "caption",
                Kind::Str,
                Value::Null,
                "Caption text.",
            ))
    }

    fn variants(&self) -> Vec<TokenVariant> {
        vec![TokenVariant::of::<Float>()]
    }

    fn create_token(
        &self,
        cx: &mut BuildContext<'_>,
        m: &LexerMatch<'_>,
        settings: &Settings,
    ) -> BuildResult {
        let prefix = settings.str("prefix").unwrap_or(&self.prefix);
        if prefix.is_empty() {
            return Err(TokenError::constraint("Float", "'prefix' must not be empty").into());
        }
        let caption = settings.str("caption").map(str::to_string);
        let key = prefix.to_lowercase();

        // Committed only after the body tokenizes
        let pending = self.counter.current(&key) + 1;
        let float = Float::new(prefix, pending, caption, Attributes::from_settings(settings))?;
        let node = cx.push(float, m.line())?;
        cx.tokenize(node, BLOCK, m.group("body").unwrap_or(""), m.group_line("body"))?;

        let number = self.counter.next(&key);
        if let Some(float) = cx.ast_mut().get_mut::<Float>(node) {
            float.number = number;
        }
        Ok(Some(node))
    }

    fn reinit(&self) {
        self.counter.reset();
    }
}

struct RenderFloat;

impl RenderFloat {
    fn caption(float: &Float, tree: &mut Tree<Html>, parent: OutId) -> Result<(), RenderError> {
        let p = tree.tag(parent, Tag::new("p").class("quire-caption"))?;
        let heading = tree.tag(p, Tag::new("span").class("quire-caption-heading"))?;
        match &float.caption {
            Some(caption) => {
                tree.text(heading, format!("{}:", float.heading()))?;
                tree.text(p, " ")?;
                let text = tree.tag(p, Tag::new("span").class("quire-caption-text"))?;
                tree.text(text, caption.as_str())?;
            }
            None => {
                tree.text(heading, float.heading())?;
            }
        }
        Ok(())
    }
}

impl RenderComponent for RenderFloat {
    fn create_html(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        let float = token::<Float>(ast, node)?;
        let mut tag = float.attributes.tag("div");
        let class = match &float.attributes.class {
            Some(extra) => format!("quire-float {}", extra),
            None => "quire-float".to_string(),
        };
        tag.set("class", class);

        let div = tree.tag(parent, tag)?;
        Self::caption(float, tree, div)?;
        Ok(Some(div))
    }

    fn create_materialize(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        let float = token::<Float>(ast, node)?;
        let mut tag = float.attributes.tag("div");
        tag.set("class", "card");

        let card = tree.tag(parent, tag)?;
        let content = tree.tag(card, Tag::new("div").class("card-content"))?;
        Self::caption(float, tree, content)?;
        Ok(Some(content))
    }

    fn create_latex(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        let float = token::<Float>(ast, node)?;
        let figure = tree.push(parent, Latex::environment("figure"))?;
        if let Some(caption) = &float.caption {
            tree.command_with(figure, "caption", caption)?;
        }
        if let Some(id) = &float.attributes.id {
            let label = tree.push(figure, Latex::command("label"))?;
            tree.push(label, Latex::raw(id.as_str()))?;
        }
        Ok(Some(figure))
    }
}
