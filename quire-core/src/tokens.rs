//! The AST: typed token variants stored in a per-document arena.
//!
//! Every node variant is its own Rust type implementing [`Token`]. Constructors
//! validate the variant's properties and return [`TokenError`] on a violation,
//! so a node that exists in an [`Ast`] always satisfies its declared
//! constraints. Renderers dispatch on [`TokenVariant`], the type identity of
//! the concrete token.

use crate::error::{TokenError, TokenizeError};
use crate::settings::Settings;
use parking_lot::Mutex;
use quire_render::Tag;
use quire_types::DocId;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Type identity of a token variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenVariant {
    id: TypeId,
    name: &'static str,
}

impl TokenVariant {
    pub fn of<T: Any>() -> Self {
        let full = std::any::type_name::<T>();
        Self {
            id: TypeId::of::<T>(),
            name: full.rsplit("::").next().unwrap_or(full),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }
}

impl fmt::Display for TokenVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Object-safe access to the concrete token type
pub trait TokenAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn variant(&self) -> TokenVariant;
}

impl<T: Any> TokenAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn variant(&self) -> TokenVariant {
        TokenVariant::of::<T>()
    }
}

/// An AST node variant
pub trait Token: TokenAny + Send + Sync + fmt::Debug {
    /// Named properties, used for AST dumps
    fn properties(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Reject placement under an incompatible parent
    fn check_parent(&self, parent: &dyn Token) -> Result<(), TokenError> {
        let _ = parent;
        Ok(())
    }
}

impl dyn Token {
    pub fn is<T: Token>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Token>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Token>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn name(&self) -> &'static str {
        self.variant().name()
    }
}

/// Handle to a node in an [`Ast`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub struct Node {
    token: Box<dyn Token>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    line: usize,
}

impl Node {
    pub fn token(&self) -> &dyn Token {
        self.token.as_ref()
    }

    pub fn token_mut(&mut self) -> &mut dyn Token {
        self.token.as_mut()
    }

    pub fn variant(&self) -> TokenVariant {
        self.token().variant()
    }

    pub fn get<T: Token>(&self) -> Option<&T> {
        self.token().downcast_ref::<T>()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Source line the node was built from (1-based)
    pub fn line(&self) -> usize {
        self.line
    }
}

/// Text the lexer could not match, reported as a degraded parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unmatched {
    pub line: usize,
    pub offset: usize,
    pub snippet: String,
}

impl Unmatched {
    const SNIPPET_LEN: usize = 40;

    pub fn new(line: usize, offset: usize, rest: &str) -> Self {
        let first = rest.lines().next().unwrap_or("");
        let snippet = match first.char_indices().nth(Self::SNIPPET_LEN) {
            Some((cut, _)) => format!("{}...", &first[..cut]),
            None => first.to_string(),
        };
        Self {
            line,
            offset,
            snippet,
        }
    }
}

/// Arena position used to undo a partially built subtree
#[derive(Debug, Clone, Copy)]
pub struct Mark {
    nodes: usize,
    unmatched: usize,
}

/// One document's syntax tree
#[derive(Debug)]
pub struct Ast {
    doc: DocId,
    nodes: Vec<Node>,
    unmatched: Vec<Unmatched>,
}

impl Ast {
    pub fn new(doc: DocId) -> Self {
        Self {
            doc,
            nodes: vec![Node {
                token: Box::new(Root),
                parent: None,
                children: Vec::new(),
                line: 1,
            }],
            unmatched: Vec::new(),
        }
    }

    pub fn doc_id(&self) -> &DocId {
        &self.doc
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    /// Attach a token as the last child of `parent`
    pub fn push<T: Token>(
        &mut self,
        parent: NodeId,
        token: T,
        line: usize,
    ) -> Result<NodeId, TokenError> {
        self.push_boxed(parent, Box::new(token), line)
    }

    pub fn push_boxed(
        &mut self,
        parent: NodeId,
        token: Box<dyn Token>,
        line: usize,
    ) -> Result<NodeId, TokenError> {
        let parent_node = self
            .nodes
            .get(parent.0)
            .ok_or(TokenError::MissingNode(parent.0))?;
        token.check_parent(parent_node.token())?;

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            token,
            parent: Some(parent),
            children: Vec::new(),
            line,
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Attach an error placeholder; a stale parent handle falls back to the root
    pub(crate) fn push_error(&mut self, parent: NodeId, token: ErrorToken, line: usize) -> NodeId {
        let parent = if parent.0 < self.nodes.len() {
            parent
        } else {
            self.root()
        };
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            token: Box::new(token),
            parent: Some(parent),
            children: Vec::new(),
            line,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, TokenError> {
        self.nodes.get(id.0).ok_or(TokenError::MissingNode(id.0))
    }

    pub fn get<T: Token>(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id.0).and_then(|node| node.get::<T>())
    }

    pub fn get_mut<T: Token>(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes
            .get_mut(id.0)
            .and_then(|node| node.token_mut().downcast_mut::<T>())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    /// Pre-order walk of the subtree rooted at `id`, including `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if next.0 >= self.nodes.len() {
                continue;
            }
            out.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev());
        }
        out
    }

    /// All tokens of type `T` in document order
    pub fn find<T: Token>(&self) -> impl Iterator<Item = (NodeId, &T)> + '_ {
        self.descendants(self.root())
            .into_iter()
            .filter_map(move |id| self.get::<T>(id).map(|token| (id, token)))
    }

    /// Error placeholders left by failed builders
    pub fn errors(&self) -> Vec<(NodeId, &ErrorToken)> {
        self.find::<ErrorToken>().collect()
    }

    pub fn unmatched(&self) -> &[Unmatched] {
        &self.unmatched
    }

    pub(crate) fn record_unmatched(&mut self, unmatched: Unmatched) {
        self.unmatched.push(unmatched);
    }

    pub fn mark(&self) -> Mark {
        Mark {
            nodes: self.nodes.len(),
            unmatched: self.unmatched.len(),
        }
    }

    /// Discard every node and unmatched report created after `mark`
    pub fn rollback(&mut self, mark: Mark) {
        if mark.nodes < self.nodes.len() {
            self.nodes.truncate(mark.nodes);
            for node in &mut self.nodes {
                node.children.retain(|child| child.0 < mark.nodes);
            }
        }
        self.unmatched.truncate(mark.unmatched);
    }

    /// Indented tree listing: `Variant(prop=value, ...) line=N`
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(self.root(), 0, &mut out);
        out
    }

    fn dump_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = &self.nodes[id.0];
        out.push_str(&"  ".repeat(depth));
        out.push_str(node.token().name());
        let props = node.token().properties();
        if !props.is_empty() {
            let joined = props
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("({})", joined));
        }
        out.push_str(&format!(" line={}\n", node.line));
        for &child in &node.children {
            self.dump_node(child, depth + 1, out);
        }
    }
}

/// Per-key counters for auto-numbering, owned by an extension and reset on reinit
#[derive(Debug, Default)]
pub struct Counter {
    counts: Mutex<HashMap<String, usize>>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the count for `key`, starting at 1
    pub fn next(&self, key: &str) -> usize {
        let mut counts = self.counts.lock();
        let count = counts.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn current(&self, key: &str) -> usize {
        self.counts.lock().get(key).copied().unwrap_or(0)
    }

    pub fn reset(&self) {
        self.counts.lock().clear();
    }
}

/// HTML attributes carried by tokens built from `id`/`class`/`style` settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    pub id: Option<String>,
    pub class: Option<String>,
    pub style: Option<String>,
}

impl Attributes {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            id: settings.str("id").map(str::to_string),
            class: settings.str("class").map(str::to_string),
            style: settings.str("style").map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.class.is_none() && self.style.is_none()
    }

    /// An HTML tag carrying these attributes
    pub fn tag(&self, name: &str) -> Tag {
        let mut tag = Tag::new(name);
        if let Some(id) = &self.id {
            tag.set("id", id.as_str());
        }
        if let Some(class) = &self.class {
            tag.set("class", class.as_str());
        }
        if let Some(style) = &self.style {
            tag.set("style", style.as_str());
        }
        tag
    }

    fn describe(&self, props: &mut Vec<(&'static str, String)>) {
        if let Some(id) = &self.id {
            props.push(("id", format!("{:?}", id)));
        }
        if let Some(class) = &self.class {
            props.push(("class", format!("{:?}", class)));
        }
        if let Some(style) = &self.style {
            props.push(("style", format!("{:?}", style)));
        }
    }
}

fn non_empty(variant: &'static str, field: &str, value: &str) -> Result<(), TokenError> {
    if value.is_empty() {
        Err(TokenError::constraint(
            variant,
            format!("'{}' must not be empty", field),
        ))
    } else {
        Ok(())
    }
}

/// Document root
#[derive(Debug, Default)]
pub struct Root;

impl Token for Root {}

/// Placeholder for a fragment whose builder failed
#[derive(Debug, Clone)]
pub struct ErrorToken {
    pub pattern: String,
    pub message: String,
    pub causes: Vec<String>,
    pub text: String,
    pub doc: DocId,
}

impl ErrorToken {
    pub fn new(pattern: &str, error: &TokenizeError, text: &str, doc: DocId) -> Self {
        let mut chain = error.chain().into_iter();
        Self {
            pattern: pattern.to_string(),
            message: chain.next().unwrap_or_default(),
            causes: chain.collect(),
            text: text.to_string(),
            doc,
        }
    }
}

impl Token for ErrorToken {
    fn properties(&self) -> Vec<(&'static str, String)> {
        vec![
            ("pattern", format!("{:?}", self.pattern)),
            ("message", format!("{:?}", self.message)),
        ]
    }
}

macro_rules! text_token {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub content: String,
        }

        impl $name {
            pub fn new(content: impl Into<String>) -> Result<Self, TokenError> {
                let content = content.into();
                non_empty(stringify!($name), "content", &content)?;
                Ok(Self { content })
            }
        }

        impl Token for $name {
            fn properties(&self) -> Vec<(&'static str, String)> {
                vec![("content", format!("{:?}", self.content))]
            }
        }
    };
}

text_token!(
    /// Run of letters
    Word
);
text_token!(
    /// Run of digits
    Number
);
text_token!(
    /// Run of characters that are neither letters, digits nor whitespace
    Punctuation
);

macro_rules! counted_token {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name {
            pub count: usize,
        }

        impl $name {
            pub fn new(count: usize) -> Result<Self, TokenError> {
                if count == 0 {
                    return Err(TokenError::constraint(
                        stringify!($name),
                        "count must be at least 1",
                    ));
                }
                Ok(Self { count })
            }
        }

        impl Token for $name {
            fn properties(&self) -> Vec<(&'static str, String)> {
                vec![("count", self.count.to_string())]
            }
        }
    };
}

counted_token!(
    /// Run of spaces
    Space
);
counted_token!(
    /// Run of newlines inside inline content
    Break
);

macro_rules! container_token {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
            pub struct $name;

            impl Token for $name {}
        )+
    };
}

container_token!(
    Paragraph,
    Quote,
    UnorderedList,
    Strong,
    Emphasis,
    Underline,
    Strikethrough,
    Superscript,
    Subscript,
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub attributes: Attributes,
}

impl Heading {
    pub fn new(level: u8, attributes: Attributes) -> Result<Self, TokenError> {
        if !(1..=6).contains(&level) {
            return Err(TokenError::constraint(
                "Heading",
                format!("level must be between 1 and 6, got {}", level),
            ));
        }
        Ok(Self { level, attributes })
    }
}

impl Token for Heading {
    fn properties(&self) -> Vec<(&'static str, String)> {
        let mut props = vec![("level", self.level.to_string())];
        self.attributes.describe(&mut props);
        props
    }
}

/// Cross-reference target, rendered as `\label` in LaTeX
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub text: String,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Result<Self, TokenError> {
        let text = text.into();
        non_empty("Label", "text", &text)?;
        Ok(Self { text })
    }
}

impl Token for Label {
    fn properties(&self) -> Vec<(&'static str, String)> {
        vec![("text", format!("{:?}", self.text))]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub code: String,
    pub language: String,
    pub attributes: Attributes,
}

impl Token for Code {
    fn properties(&self) -> Vec<(&'static str, String)> {
        let mut props = vec![("language", format!("{:?}", self.language))];
        self.attributes.describe(&mut props);
        props
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderedList {
    pub start: usize,
}

impl Token for OrderedList {
    fn properties(&self) -> Vec<(&'static str, String)> {
        vec![("start", self.start.to_string())]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListItem;

impl Token for ListItem {
    fn check_parent(&self, parent: &dyn Token) -> Result<(), TokenError> {
        if parent.is::<OrderedList>() || parent.is::<UnorderedList>() {
            Ok(())
        } else {
            Err(TokenError::InvalidParent {
                child: "ListItem",
                parent: parent.name(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub attributes: Attributes,
}

impl Link {
    pub fn new(url: impl Into<String>, attributes: Attributes) -> Result<Self, TokenError> {
        let url = url.into();
        non_empty("Link", "url", &url)?;
        Ok(Self { url, attributes })
    }
}

impl Token for Link {
    fn properties(&self) -> Vec<(&'static str, String)> {
        let mut props = vec![("url", format!("{:?}", self.url))];
        self.attributes.describe(&mut props);
        props
    }
}

/// `[key]: link` definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    pub key: String,
    pub link: String,
}

impl Shortcut {
    pub fn new(key: impl Into<String>, link: impl Into<String>) -> Result<Self, TokenError> {
        let key = key.into();
        let link = link.into();
        non_empty("Shortcut", "key", &key)?;
        non_empty("Shortcut", "link", &link)?;
        Ok(Self { key, link })
    }
}

impl Token for Shortcut {
    fn properties(&self) -> Vec<(&'static str, String)> {
        vec![
            ("key", format!("{:?}", self.key)),
            ("link", format!("{:?}", self.link)),
        ]
    }
}

/// `[key]` use of a shortcut
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutLink {
    pub key: String,
}

impl ShortcutLink {
    pub fn new(key: impl Into<String>) -> Result<Self, TokenError> {
        let key = key.into();
        non_empty("ShortcutLink", "key", &key)?;
        Ok(Self { key })
    }
}

impl Token for ShortcutLink {
    fn properties(&self) -> Vec<(&'static str, String)> {
        vec![("key", format!("{:?}", self.key))]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monospace {
    pub code: String,
}

impl Token for Monospace {
    fn properties(&self) -> Vec<(&'static str, String)> {
        vec![("code", format!("{:?}", self.code))]
    }
}
