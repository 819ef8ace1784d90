//! HTML output nodes.

use crate::tree::{Markup, OutId, Tree, TreeError};

/// An HTML element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    attrs: Vec<(String, String)>,
    style: Vec<(String, String)>,
    close: bool,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            style: Vec::new(),
            close: true,
        }
    }

    /// Element without a closing tag (`<link>`, `<br>`)
    pub fn void(name: impl Into<String>) -> Self {
        Self {
            close: false,
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    /// Parse a `key:value;key:value` declaration list into the style map
    pub fn style(mut self, declarations: &str) -> Self {
        for pair in declarations.split(';') {
            if let Some((key, value)) = pair.split_once(':') {
                let key = key.trim();
                if !key.is_empty() {
                    self.set_style(key, value.trim());
                }
            }
        }
        self
    }

    /// Insert or replace an attribute
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if key == "style" {
            *self = std::mem::replace(self, Tag::new("")).style(&value);
            return;
        }
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    pub fn set_style(&mut self, key: &str, value: &str) {
        match self.style.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.style.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// HTML output node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Html {
    Tag(Tag),
    Text { content: String, escape: bool },
}

impl Html {
    pub fn tag(name: impl Into<String>) -> Self {
        Html::Tag(Tag::new(name))
    }

    /// Text that is escaped on output
    pub fn text(content: impl Into<String>) -> Self {
        Html::Text {
            content: content.into(),
            escape: true,
        }
    }

    /// Text written verbatim (entities, pre-built markup)
    pub fn raw(content: impl Into<String>) -> Self {
        Html::Text {
            content: content.into(),
            escape: false,
        }
    }

    pub fn as_tag_mut(&mut self) -> Option<&mut Tag> {
        match self {
            Html::Tag(tag) => Some(tag),
            Html::Text { .. } => None,
        }
    }
}

impl From<Tag> for Html {
    fn from(tag: Tag) -> Self {
        Html::Tag(tag)
    }
}

impl Markup for Html {
    fn open(&self, out: &mut String) {
        match self {
            Html::Tag(tag) => {
                out.push('<');
                out.push_str(&tag.name);
                for (key, value) in &tag.attrs {
                    if !value.is_empty() {
                        out.push_str(&format!(" {}=\"{}\"", key, escape(value)));
                    }
                }
                if !tag.style.is_empty() {
                    let style = tag
                        .style
                        .iter()
                        .filter(|(_, v)| !v.is_empty())
                        .map(|(k, v)| format!("{}:{}", k, v))
                        .collect::<Vec<_>>()
                        .join(";");
                    out.push_str(&format!(" style=\"{}\"", escape(&style)));
                }
                out.push('>');
            }
            Html::Text { content, escape: true } => out.push_str(&escape(content)),
            Html::Text { content, .. } => out.push_str(content),
        }
    }

    fn close(&self, out: &mut String) {
        if let Html::Tag(tag) = self {
            if tag.close {
                out.push_str(&format!("</{}>", tag.name));
            }
        }
    }

    fn is_leaf(&self) -> bool {
        match self {
            Html::Tag(tag) => !tag.close,
            Html::Text { .. } => true,
        }
    }

    fn describe(&self) -> String {
        match self {
            Html::Tag(tag) => format!("<{}>", tag.name),
            Html::Text { .. } => "html text".to_string(),
        }
    }
}

impl Tree<Html> {
    /// Append an element and return its handle
    pub fn tag(&mut self, parent: OutId, tag: Tag) -> Result<OutId, TreeError> {
        self.push(parent, Html::Tag(tag))
    }

    /// Append escaped text
    pub fn text(&mut self, parent: OutId, content: impl Into<String>) -> Result<OutId, TreeError> {
        self.push(parent, Html::text(content))
    }

    pub fn tag_mut(&mut self, id: OutId) -> Option<&mut Tag> {
        self.get_mut(id).and_then(Html::as_tag_mut)
    }
}

/// Escape text for use in element content and attribute values
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
