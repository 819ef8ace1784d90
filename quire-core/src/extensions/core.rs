//! The `core` extension: block and inline markdown plus renders for every backend.
//!
//! Block patterns start by skipping blank lines and end by consuming the
//! blank-line separator that follows the block (or trailing whitespace at the
//! end of the text), so the next block starts on its first character.

use crate::components::{token, ReaderComponent, RenderComponent, RenderResult};
use crate::error::{ConfigError, RenderError, TokenizeError};
use crate::extension::Extension;
use crate::lexer::{BuildContext, BuildResult, LexerMatch};
use crate::reader::{Reader, BLOCK, INLINE};
use crate::renderer::Renderer;
use crate::settings::{Kind, Schema, SettingSpec, Settings};
use crate::slug::slugify;
use crate::storage::Location;
use crate::tokens::{
    Ast, Attributes, Break, Code, Emphasis, Heading, Label, Link, ListItem, Monospace, NodeId,
    Number, OrderedList, Paragraph, Punctuation, Quote, Shortcut, ShortcutLink, Space,
    Strikethrough, Strong, Subscript, Superscript, TokenVariant, Underline,
    UnorderedList, Word,
};
use once_cell::sync::Lazy;
use quire_render::{Html, Latex, OutId, Tag, Tree};
use regex::Regex;

/// Wrap a block body: skip leading blank lines, consume the separator after it
macro_rules! block {
    ($($body:literal),+ $(,)?) => {
        concat!(r"\s*", $($body,)+ r"(?:(?:[ \t]*\n){2,}|\s*\z)")
    };
}

static UNORDERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-*] ").expect("valid list item regex"));
static ORDERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+\. ").expect("valid list item regex"));

#[derive(Debug, Clone)]
pub struct CoreExtension {
    smart_punctuation: bool,
}

impl Default for CoreExtension {
    fn default() -> Self {
        Self {
            smart_punctuation: true,
        }
    }
}

impl Extension for CoreExtension {
    fn name(&self) -> &str {
        "core"
    }

    fn config_schema(&self) -> Schema {
        Schema::new().with(SettingSpec::new(
            "smart_punctuation",
            Kind::Bool,
            true,
            "Render '--' and '---' as en and em dashes in HTML.",
        ))
    }

    fn configure(&mut self, settings: Settings) {
        self.smart_punctuation = settings.bool("smart_punctuation").unwrap_or(true);
    }

    fn extend(&self, reader: &mut Reader, renderer: &mut Renderer) -> Result<(), ConfigError> {
        reader.add_block(CodeComponent, Location::End)?;
        reader.add_block(QuoteComponent, Location::End)?;
        reader.add_block(HeadingComponent, Location::End)?;
        reader.add_block(ListComponent::ordered(), Location::End)?;
        reader.add_block(ListComponent::unordered(), Location::End)?;
        reader.add_block(ShortcutComponent, Location::End)?;
        reader.add_block(ParagraphComponent, Location::End)?;

        reader.add_inline(MonospaceComponent, Location::End)?;
        reader.add_inline(FormatComponent, Location::End)?;
        reader.add_inline(LinkComponent, Location::End)?;
        reader.add_inline(ShortcutLinkComponent, Location::End)?;
        reader.add_inline(PunctuationComponent, Location::End)?;
        reader.add_inline(NumberComponent, Location::End)?;
        reader.add_inline(WordComponent, Location::End)?;
        reader.add_inline(BreakComponent, Location::End)?;
        reader.add_inline(SpaceComponent, Location::End)?;

        renderer.add::<Heading>(RenderHeading)?;
        renderer.add::<Label>(RenderLabel)?;
        renderer.add::<Code>(RenderCode)?;
        renderer.add::<Quote>(RenderQuote)?;
        renderer.add::<OrderedList>(RenderOrderedList)?;
        renderer.add::<UnorderedList>(RenderUnorderedList)?;
        renderer.add::<ListItem>(RenderListItem)?;
        renderer.add::<Shortcut>(RenderShortcut)?;
        renderer.add::<ShortcutLink>(RenderShortcutLink)?;
        renderer.add::<Paragraph>(RenderParagraph)?;
        renderer.add::<Link>(RenderLink)?;
        renderer.add::<Monospace>(RenderMonospace)?;
        renderer.add::<Strong>(RenderFormat::new("strong", "textbf"))?;
        renderer.add::<Emphasis>(RenderFormat::new("em", "emph"))?;
        renderer.add::<Underline>(RenderFormat::new("u", "underline"))?;
        renderer.add::<Strikethrough>(RenderFormat::new("strike", "sout"))?;
        renderer.add::<Superscript>(RenderScript::new("sup", "^"))?;
        renderer.add::<Subscript>(RenderScript::new("sub", "_"))?;
        renderer.add::<Word>(RenderText)?;
        renderer.add::<Number>(RenderText)?;
        renderer.add::<Punctuation>(RenderPunctuation {
            smart: self.smart_punctuation,
        })?;
        renderer.add::<Space>(RenderSpace)?;
        renderer.add::<Break>(RenderSpace)?;

        renderer.add_package("hyperref");
        renderer.add_package("ulem");
        Ok(())
    }
}

// Block components

/// Fenced code: ```` ```lang settings ```` ... ```` ``` ````
struct CodeComponent;

impl ReaderComponent for CodeComponent {
    fn name(&self) -> &str {
        "code"
    }

    fn pattern(&self) -> &str {
        block!(
            r"(?m:^)```(?P<language>[^\s`]*)(?P<settings>[^\n]*)\n",
            r"(?s:(?P<code>.*?))(?m:^)```[ \t]*",
        )
    }

    fn variants(&self) -> Vec<TokenVariant> {
        vec![TokenVariant::of::<Code>()]
    }

    fn create_token(
        &self,
        cx: &mut BuildContext<'_>,
        m: &LexerMatch<'_>,
        settings: &Settings,
    ) -> BuildResult {
        let language = match m.group("language") {
            Some(lang) if !lang.is_empty() => lang,
            _ => "text",
        };
        let code = Code {
            code: m.group("code").unwrap_or("").to_string(),
            language: language.to_string(),
            attributes: Attributes::from_settings(settings),
        };
        Ok(Some(cx.push(code, m.line())?))
    }
}

/// `> ` prefixed lines; the stripped content is read as blocks
struct QuoteComponent;

impl ReaderComponent for QuoteComponent {
    fn name(&self) -> &str {
        "quote"
    }

    fn pattern(&self) -> &str {
        block!(r"(?s:(?P<quote>>.*?))")
    }

    fn parse_settings(&self) -> bool {
        false
    }

    fn variants(&self) -> Vec<TokenVariant> {
        vec![TokenVariant::of::<Quote>()]
    }

    fn create_token(
        &self,
        cx: &mut BuildContext<'_>,
        m: &LexerMatch<'_>,
        _settings: &Settings,
    ) -> BuildResult {
        let mut content = Vec::new();
        for line in m.group("quote").unwrap_or("").trim_end().lines() {
            if line == ">" {
                content.push("");
            } else if let Some(stripped) = line.strip_prefix("> ") {
                content.push(stripped);
            } else {
                return Err(TokenizeError::msg(format!(
                    "quote lines must start with '> ', found '{}'",
                    line
                )));
            }
        }

        let quote = cx.push(Quote, m.line())?;
        cx.tokenize(quote, BLOCK, &content.join("\n"), m.group_line("quote"))?;
        Ok(Some(quote))
    }
}

/// `#` to `######` headings with optional trailing settings
struct HeadingComponent;

impl ReaderComponent for HeadingComponent {
    fn name(&self) -> &str {
        "heading"
    }

    fn pattern(&self) -> &str {
        block!(r"(?P<level>#{1,6})[ \t]+(?s:(?P<inline>.*?))(?P<settings>[ \t]+\w+=[^\n]*)?")
    }

    fn variants(&self) -> Vec<TokenVariant> {
        vec![TokenVariant::of::<Heading>(), TokenVariant::of::<Label>()]
    }

    fn create_token(
        &self,
        cx: &mut BuildContext<'_>,
        m: &LexerMatch<'_>,
        settings: &Settings,
    ) -> BuildResult {
        let level = m.group("level").map(str::len).unwrap_or(1);
        let attributes = Attributes::from_settings(settings);
        let label = match &attributes.id {
            Some(id) => id.clone(),
            None => slugify(m.group("inline").unwrap_or("")),
        };

        let heading = cx.push(Heading::new(level as u8, attributes)?, m.line())?;
        if !label.is_empty() {
            cx.push_under(heading, Label::new(label)?, m.line())?;
        }
        Ok(Some(heading))
    }
}

/// Ordered (`1. `) or unordered (`- `, `* `) lists; items are read as blocks
struct ListComponent {
    ordered: bool,
}

impl ListComponent {
    fn ordered() -> Self {
        Self { ordered: true }
    }

    fn unordered() -> Self {
        Self { ordered: false }
    }

    fn marker(&self) -> &'static Regex {
        if self.ordered {
            &ORDERED_ITEM
        } else {
            &UNORDERED_ITEM
        }
    }

    /// Split the list text into `(line offset, content)` per item, stripping
    /// the indentation of continuation lines
    fn split_items(&self, items: &str) -> Result<Vec<(usize, String)>, TokenizeError> {
        let mut out: Vec<(usize, String)> = Vec::new();
        let mut indent = 0;
        let mut marker = "";

        for (i, line) in items.lines().enumerate() {
            if let Some(found) = self.marker().find(line) {
                indent = found.end();
                marker = found.as_str();
                out.push((i, line[indent..].to_string()));
                continue;
            }

            let Some((_, content)) = out.last_mut() else {
                return Err(TokenizeError::msg("list text does not start with an item"));
            };
            content.push('\n');
            if line.trim().is_empty() {
                continue;
            }
            let lead = line.len() - line.trim_start_matches(' ').len();
            if lead < indent {
                return Err(TokenizeError::msg(format!(
                    "List item content must be indented by {} to match the list item \
                     characters of '{}', to end a list item you must use two empty lines.",
                    indent, marker
                )));
            }
            content.push_str(&line[indent..]);
        }
        Ok(out)
    }
}

impl ReaderComponent for ListComponent {
    fn name(&self) -> &str {
        if self.ordered {
            "orderedlist"
        } else {
            "unorderedlist"
        }
    }

    fn pattern(&self) -> &str {
        if self.ordered {
            block!(
                r"(?P<items>(?P<marker>[0-9]+\. )[^\n]*",
                r"(?:\n[^\n]*\S[^\n]*|\n[ \t]*\n(?:[0-9]+\. |[ \t]+\S)[^\n]*)*)",
            )
        } else {
            block!(
                r"(?P<items>(?P<marker>[-*] )[^\n]*",
                r"(?:\n[^\n]*\S[^\n]*|\n[ \t]*\n(?:[-*] |[ \t]+\S)[^\n]*)*)",
            )
        }
    }

    fn parse_settings(&self) -> bool {
        false
    }

    fn variants(&self) -> Vec<TokenVariant> {
        let list = if self.ordered {
            TokenVariant::of::<OrderedList>()
        } else {
            TokenVariant::of::<UnorderedList>()
        };
        vec![list, TokenVariant::of::<ListItem>()]
    }

    fn create_token(
        &self,
        cx: &mut BuildContext<'_>,
        m: &LexerMatch<'_>,
        _settings: &Settings,
    ) -> BuildResult {
        let items = self.split_items(m.group("items").unwrap_or(""))?;
        let first = m.group_line("items");

        let list = if self.ordered {
            let start = m
                .group("marker")
                .and_then(|marker| marker.trim_end_matches(". ").parse().ok())
                .unwrap_or(1);
            cx.push(OrderedList { start }, m.line())?
        } else {
            cx.push(UnorderedList, m.line())?
        };

        for (offset, content) in items {
            let item = cx.push_under(list, ListItem, first + offset)?;
            cx.tokenize(item, BLOCK, &content, first + offset)?;
        }
        Ok(Some(list))
    }
}

/// `[key]: link` definitions
struct ShortcutComponent;

impl ReaderComponent for ShortcutComponent {
    fn name(&self) -> &str {
        "shortcut"
    }

    fn pattern(&self) -> &str {
        block!(r"\[(?P<key>[^\]\n]+)\]:[ \t]+(?s:(?P<link>.*?))")
    }

    fn parse_settings(&self) -> bool {
        false
    }

    fn variants(&self) -> Vec<TokenVariant> {
        vec![TokenVariant::of::<Shortcut>()]
    }

    fn create_token(
        &self,
        cx: &mut BuildContext<'_>,
        m: &LexerMatch<'_>,
        _settings: &Settings,
    ) -> BuildResult {
        let shortcut = Shortcut::new(
            m.group("key").unwrap_or(""),
            m.group("link").unwrap_or("").trim(),
        )?;
        Ok(Some(cx.push(shortcut, m.line())?))
    }
}

/// Any other text up to a blank line
struct ParagraphComponent;

impl ReaderComponent for ParagraphComponent {
    fn name(&self) -> &str {
        "paragraph"
    }

    fn pattern(&self) -> &str {
        block!(r"(?s:(?P<inline>\S.*?))")
    }

    fn parse_settings(&self) -> bool {
        false
    }

    fn variants(&self) -> Vec<TokenVariant> {
        vec![TokenVariant::of::<Paragraph>()]
    }

    fn create_token(
        &self,
        cx: &mut BuildContext<'_>,
        m: &LexerMatch<'_>,
        _settings: &Settings,
    ) -> BuildResult {
        Ok(Some(cx.push(Paragraph, m.line())?))
    }
}

// Inline components

struct MonospaceComponent;

impl ReaderComponent for MonospaceComponent {
    fn name(&self) -> &str {
        "monospace"
    }

    fn pattern(&self) -> &str {
        r"`(?s:(?P<code>.+?))`"
    }

    fn parse_settings(&self) -> bool {
        false
    }

    fn variants(&self) -> Vec<TokenVariant> {
        vec![TokenVariant::of::<Monospace>()]
    }

    fn create_token(
        &self,
        cx: &mut BuildContext<'_>,
        m: &LexerMatch<'_>,
        _settings: &Settings,
    ) -> BuildResult {
        let code = m.group("code").unwrap_or("").to_string();
        Ok(Some(cx.push(Monospace { code }, m.line())?))
    }
}

/// `_sub_`, `^sup^`, `=underline=`, `*emphasis*`, `+strong+`, `~strike~`
struct FormatComponent;

impl FormatComponent {
    const GROUPS: [&'static str; 6] = [
        "subscript",
        "superscript",
        "underline",
        "emphasis",
        "strong",
        "strikethrough",
    ];
}

impl ReaderComponent for FormatComponent {
    fn name(&self) -> &str {
        "format"
    }

    fn pattern(&self) -> &str {
        concat!(
            r"(?s:",
            r"_(?P<subscript>\S(?:.*?\S)?)_",
            r"|\^(?P<superscript>\S(?:.*?\S)?)\^",
            r"|=(?P<underline>\S(?:.*?\S)?)=",
            r"|\*(?P<emphasis>\S(?:.*?\S)?)\*",
            r"|\+(?P<strong>\S(?:.*?\S)?)\+",
            r"|~(?P<strikethrough>\S(?:.*?\S)?)~",
            r")"
        )
    }

    fn parse_settings(&self) -> bool {
        false
    }

    fn variants(&self) -> Vec<TokenVariant> {
        vec![
            TokenVariant::of::<Subscript>(),
            TokenVariant::of::<Superscript>(),
            TokenVariant::of::<Underline>(),
            TokenVariant::of::<Emphasis>(),
            TokenVariant::of::<Strong>(),
            TokenVariant::of::<Strikethrough>(),
        ]
    }

    fn create_token(
        &self,
        cx: &mut BuildContext<'_>,
        m: &LexerMatch<'_>,
        _settings: &Settings,
    ) -> BuildResult {
        let Some((group, content)) = Self::GROUPS
            .iter()
            .find_map(|&group| m.group(group).map(|content| (group, content)))
        else {
            return Ok(None);
        };

        let line = m.line();
        let node = match group {
            "subscript" => cx.push(Subscript, line)?,
            "superscript" => cx.push(Superscript, line)?,
            "underline" => cx.push(Underline, line)?,
            "emphasis" => cx.push(Emphasis, line)?,
            "strong" => cx.push(Strong, line)?,
            _ => cx.push(Strikethrough, line)?,
        };
        cx.tokenize(node, INLINE, content, m.group_line(group))?;
        Ok(Some(node))
    }
}

/// `[text](url settings)`
struct LinkComponent;

impl ReaderComponent for LinkComponent {
    fn name(&self) -> &str {
        "link"
    }

    fn pattern(&self) -> &str {
        r"\[(?P<text>[^\]]*)\]\((?P<url>[^)\s]*)(?:[ \t]+(?P<settings>[^)]*))?\)"
    }

    fn variants(&self) -> Vec<TokenVariant> {
        vec![TokenVariant::of::<Link>()]
    }

    fn create_token(
        &self,
        cx: &mut BuildContext<'_>,
        m: &LexerMatch<'_>,
        settings: &Settings,
    ) -> BuildResult {
        let link = Link::new(
            m.group("url").unwrap_or(""),
            Attributes::from_settings(settings),
        )?;
        let node = cx.push(link, m.line())?;
        let text = m.group("text").unwrap_or("");
        if !text.is_empty() {
            cx.tokenize(node, INLINE, text, m.group_line("text"))?;
        }
        Ok(Some(node))
    }
}

/// `[key]`, resolved against the document's shortcuts when rendered
struct ShortcutLinkComponent;

impl ReaderComponent for ShortcutLinkComponent {
    fn name(&self) -> &str {
        "shortcutlink"
    }

    fn pattern(&self) -> &str {
        r"\[(?P<key>[^\]\n]+)\]"
    }

    fn parse_settings(&self) -> bool {
        false
    }

    fn variants(&self) -> Vec<TokenVariant> {
        vec![TokenVariant::of::<ShortcutLink>()]
    }

    fn create_token(
        &self,
        cx: &mut BuildContext<'_>,
        m: &LexerMatch<'_>,
        _settings: &Settings,
    ) -> BuildResult {
        let key = m.group("key").unwrap_or("");
        Ok(Some(cx.push(ShortcutLink::new(key)?, m.line())?))
    }
}

/// Single-regex inline components whose token is built from the matched text
macro_rules! text_component {
    ($component:ident, $name:literal, $pattern:literal, $token:ident, $build:expr) => {
        struct $component;

        impl ReaderComponent for $component {
            fn name(&self) -> &str {
                $name
            }

            fn pattern(&self) -> &str {
                $pattern
            }

            fn parse_settings(&self) -> bool {
                false
            }

            fn variants(&self) -> Vec<TokenVariant> {
                vec![TokenVariant::of::<$token>()]
            }

            fn create_token(
                &self,
                cx: &mut BuildContext<'_>,
                m: &LexerMatch<'_>,
                _settings: &Settings,
            ) -> BuildResult {
                let build: fn(&str) -> Result<$token, crate::error::TokenError> = $build;
                Ok(Some(cx.push(build(m.as_str())?, m.line())?))
            }
        }
    };
}

text_component!(
    PunctuationComponent,
    "punctuation",
    r"[^A-Za-z0-9\s]+",
    Punctuation,
    |s| Punctuation::new(s)
);
text_component!(NumberComponent, "number", r"[0-9]+", Number, |s| Number::new(s));
text_component!(WordComponent, "word", r"[A-Za-z]+", Word, |s| Word::new(s));
text_component!(BreakComponent, "break", r"\n+", Break, |s| Break::new(s.len()));
text_component!(SpaceComponent, "space", r"[ \t]+", Space, |s| Space::new(s.len()));

// Render components

fn html_tag(tree: &mut Tree<Html>, parent: OutId, tag: Tag) -> RenderResult {
    Ok(Some(tree.tag(parent, tag)?))
}

struct RenderHeading;

impl RenderHeading {
    fn section(level: u8) -> &'static str {
        match level {
            1 => "section",
            2 => "subsection",
            3 => "subsubsection",
            4 => "paragraph",
            _ => "subparagraph",
        }
    }
}

impl RenderComponent for RenderHeading {
    fn create_html(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        let heading = token::<Heading>(ast, node)?;
        let mut tag = heading.attributes.tag(&format!("h{}", heading.level));
        if tag.get("id").is_none() {
            let label = ast
                .children(node)
                .iter()
                .find_map(|&child| ast.get::<Label>(child));
            if let Some(label) = label {
                tag.set("id", label.text.as_str());
            }
        }
        html_tag(tree, parent, tag)
    }

    fn create_latex(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        let heading = token::<Heading>(ast, node)?;
        let section = Latex::command_line(Self::section(heading.level));
        Ok(Some(tree.push(parent, section)?))
    }
}

struct RenderLabel;

impl RenderComponent for RenderLabel {
    fn create_html(&self, _: &Ast, _: NodeId, _: &mut Tree<Html>, _: OutId) -> RenderResult {
        Ok(None)
    }

    fn create_latex(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        let label = token::<Label>(ast, node)?;
        // A heading's label follows the sectioning command, not inside its argument
        let under_heading = ast
            .parent(node)
            .and_then(|p| ast.get::<Heading>(p))
            .is_some();
        let target = match tree.parent(parent) {
            Some(outer) if under_heading => outer,
            _ => parent,
        };
        let cmd = tree.push(target, Latex::command("label"))?;
        tree.push(cmd, Latex::raw(label.text.as_str()))?;
        Ok(None)
    }
}

struct RenderCode;

impl RenderComponent for RenderCode {
    fn create_html(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        let code = token::<Code>(ast, node)?;
        let pre = tree.tag(parent, code.attributes.tag("pre"))?;
        let inner = tree.tag(
            pre,
            Tag::new("code").class(format!("language-{}", code.language)),
        )?;
        tree.text(inner, code.code.as_str())?;
        Ok(Some(pre))
    }

    fn create_latex(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        let code = token::<Code>(ast, node)?;
        let env = tree.push(parent, Latex::environment("verbatim"))?;
        tree.push(env, Latex::raw(code.code.trim_end_matches('\n')))?;
        Ok(Some(env))
    }
}

struct RenderQuote;

impl RenderComponent for RenderQuote {
    fn create_html(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        html_tag(tree, parent, Tag::new("blockquote"))
    }

    fn create_latex(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        Ok(Some(tree.push(parent, Latex::environment("quote"))?))
    }
}

struct RenderOrderedList;

impl RenderComponent for RenderOrderedList {
    fn create_html(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        html_tag(tree, parent, Tag::new("ol"))
    }

    fn create_materialize(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        let list = token::<OrderedList>(ast, node)?;
        let tag = Tag::new("ol")
            .class("browser-default")
            .attr("start", list.start.to_string());
        html_tag(tree, parent, tag)
    }

    fn create_latex(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        Ok(Some(tree.push(parent, Latex::environment("enumerate"))?))
    }
}

struct RenderUnorderedList;

impl RenderComponent for RenderUnorderedList {
    fn create_html(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        html_tag(tree, parent, Tag::new("ul"))
    }

    fn create_materialize(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        html_tag(tree, parent, Tag::new("ul").class("browser-default"))
    }

    fn create_latex(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        Ok(Some(tree.push(parent, Latex::environment("itemize"))?))
    }
}

struct RenderListItem;

impl RenderComponent for RenderListItem {
    fn create_html(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        html_tag(tree, parent, Tag::new("li"))
    }

    fn create_latex(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        tree.push(parent, Latex::custom("item", "\n", " "))?;
        Ok(None)
    }
}

struct RenderParagraph;

impl RenderComponent for RenderParagraph {
    fn create_html(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        html_tag(tree, parent, Tag::new("p"))
    }

    fn create_latex(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        tree.push(parent, Latex::custom("par", "\n", "\n"))?;
        Ok(None)
    }
}

struct RenderLink;

impl RenderComponent for RenderLink {
    fn create_html(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        let link = token::<Link>(ast, node)?;
        let mut tag = link.attributes.tag("a");
        tag.set("href", link.url.as_str());
        html_tag(tree, parent, tag)
    }

    fn create_latex(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        let link = token::<Link>(ast, node)?;
        let href = tree.push(parent, Latex::custom("href", "", ""))?;
        tree.brace_with(href, link.url.trim_start_matches('#'))?;
        Ok(Some(tree.push(href, Latex::brace())?))
    }
}

struct RenderShortcut;

impl RenderComponent for RenderShortcut {
    fn create_html(&self, _: &Ast, _: NodeId, _: &mut Tree<Html>, _: OutId) -> RenderResult {
        Ok(None)
    }

    fn create_latex(&self, _: &Ast, _: NodeId, _: &mut Tree<Latex>, _: OutId) -> RenderResult {
        Ok(None)
    }
}

struct RenderShortcutLink;

impl RenderShortcutLink {
    fn resolve<'a>(ast: &'a Ast, node: NodeId) -> Result<(&'a str, &'a str), RenderError> {
        let key = token::<ShortcutLink>(ast, node)?.key.as_str();
        ast.find::<Shortcut>()
            .find(|(_, shortcut)| shortcut.key == key)
            .map(|(_, shortcut)| (key, shortcut.link.as_str()))
            .ok_or_else(|| RenderError::Content {
                variant: "ShortcutLink",
                message: format!(
                    "the shortcut link key '{}' was not located in the list of shortcuts",
                    key
                ),
            })
    }
}

impl RenderComponent for RenderShortcutLink {
    fn create_html(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        let (key, link) = Self::resolve(ast, node)?;
        let a = tree.tag(parent, Tag::new("a").attr("href", link))?;
        tree.text(a, key)?;
        Ok(Some(a))
    }

    fn create_latex(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        let (key, link) = Self::resolve(ast, node)?;
        let href = tree.push(parent, Latex::custom("href", "", ""))?;
        tree.brace_with(href, link)?;
        tree.brace_with(href, key)?;
        Ok(Some(href))
    }
}

struct RenderMonospace;

impl RenderComponent for RenderMonospace {
    fn create_html(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        let mono = token::<Monospace>(ast, node)?;
        let code = tree.tag(parent, Tag::new("code"))?;
        tree.text(code, mono.code.as_str())?;
        Ok(Some(code))
    }

    fn create_latex(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        let mono = token::<Monospace>(ast, node)?;
        Ok(Some(tree.command_with(parent, "texttt", &mono.code)?))
    }
}

/// Inline formatting that maps to one HTML tag and one LaTeX command
struct RenderFormat {
    tag: &'static str,
    command: &'static str,
}

impl RenderFormat {
    fn new(tag: &'static str, command: &'static str) -> Self {
        Self { tag, command }
    }
}

impl RenderComponent for RenderFormat {
    fn create_html(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        html_tag(tree, parent, Tag::new(self.tag))
    }

    fn create_latex(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        Ok(Some(tree.push(parent, Latex::command(self.command))?))
    }
}

/// Super- and subscripts: `$^{\text{..}}$` in LaTeX
struct RenderScript {
    tag: &'static str,
    operator: &'static str,
}

impl RenderScript {
    fn new(tag: &'static str, operator: &'static str) -> Self {
        Self { tag, operator }
    }
}

impl RenderComponent for RenderScript {
    fn create_html(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        html_tag(tree, parent, Tag::new(self.tag))
    }

    fn create_latex(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        let math = tree.push(parent, Latex::inline_math())?;
        tree.push(math, Latex::raw(format!("{}{{", self.operator)))?;
        let text = tree.push(math, Latex::command("text"))?;
        tree.push(math, Latex::raw("}"))?;
        Ok(Some(text))
    }
}

/// Words, numbers and plain punctuation
struct RenderText;

impl RenderText {
    fn content(ast: &Ast, node: NodeId) -> Result<&str, RenderError> {
        let found = ast.node(node)?;
        found
            .get::<Word>()
            .map(|w| w.content.as_str())
            .or_else(|| found.get::<Number>().map(|n| n.content.as_str()))
            .or_else(|| found.get::<Punctuation>().map(|p| p.content.as_str()))
            .ok_or_else(|| RenderError::Content {
                variant: found.token().name(),
                message: "expected a text token".to_string(),
            })
    }
}

impl RenderComponent for RenderText {
    fn create_html(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        tree.text(parent, Self::content(ast, node)?)?;
        Ok(None)
    }

    fn create_latex(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        tree.text(parent, Self::content(ast, node)?)?;
        Ok(None)
    }
}

struct RenderPunctuation {
    smart: bool,
}

impl RenderComponent for RenderPunctuation {
    fn create_html(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        let content = token::<Punctuation>(ast, node)?.content.as_str();
        match content {
            "--" if self.smart => tree.push(parent, Html::raw("&ndash;"))?,
            "---" if self.smart => tree.push(parent, Html::raw("&mdash;"))?,
            _ => tree.text(parent, content)?,
        };
        Ok(None)
    }

    fn create_latex(
        &self,
        ast: &Ast,
        node: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        RenderText.create_latex(ast, node, tree, parent)
    }
}

/// Spaces and line breaks collapse to one space
struct RenderSpace;

impl RenderComponent for RenderSpace {
    fn create_html(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Html>,
        parent: OutId,
    ) -> RenderResult {
        tree.text(parent, " ")?;
        Ok(None)
    }

    fn create_latex(
        &self,
        _: &Ast,
        _: NodeId,
        tree: &mut Tree<Latex>,
        parent: OutId,
    ) -> RenderResult {
        tree.text(parent, " ")?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::ErrorToken;
    use quire_types::{Backend, DocId};

    fn setup(extension: &CoreExtension, backend: Backend) -> (Reader, Renderer) {
        let mut reader = Reader::markdown();
        let mut renderer = Renderer::new(backend);
        extension.extend(&mut reader, &mut renderer).unwrap();
        (reader, renderer)
    }

    fn parse(text: &str) -> Ast {
        let (reader, _) = setup(&CoreExtension::default(), Backend::Html);
        let mut ast = Ast::new(DocId::new("test.md"));
        reader.parse(&mut ast, text).unwrap();
        ast
    }

    fn render_with(extension: &CoreExtension, text: &str, backend: Backend) -> String {
        let (reader, renderer) = setup(extension, backend);
        let mut ast = Ast::new(DocId::new("test.md"));
        reader.parse(&mut ast, text).unwrap();
        renderer.render(&ast).unwrap().write()
    }

    fn render(text: &str, backend: Backend) -> String {
        render_with(&CoreExtension::default(), text, backend)
    }

    #[test]
    fn test_heading_and_paragraph_html() {
        let html = render("# Hello World\n\nSome *bold* text.\n", Backend::Html);
        assert_eq!(
            html,
            "<body><h1 id=\"hello-world\">Hello World</h1><p>Some <em>bold</em> text.</p></body>"
        );
    }

    #[test]
    fn test_heading_settings() {
        let html = render("## Intro id=start class=lead", Backend::Html);
        assert_eq!(
            html,
            "<body><h2 id=\"start\" class=\"lead\">Intro</h2></body>"
        );
    }

    #[test]
    fn test_heading_latex_sections() {
        let latex = render("# One\n\n#### Four\n\n###### Six", Backend::Latex);
        assert!(latex.contains("\\section{One}\n\\label{one}"));
        assert!(latex.contains("\\paragraph{Four}\n\\label{four}"));
        assert!(latex.contains("\\subparagraph{Six}\n\\label{six}"));
        assert!(latex.starts_with(
            "\\documentclass{article}\n\\usepackage{hyperref}\n\\usepackage{ulem}\n"
        ));
    }

    #[test]
    fn test_lists() {
        let text = "- one\n- two\n\n3. three\n4. four\n";
        assert_eq!(
            render(text, Backend::Html),
            "<body><ul><li><p>one</p></li><li><p>two</p></li></ul>\
             <ol><li><p>three</p></li><li><p>four</p></li></ol></body>"
        );

        let materialize = render(text, Backend::Materialize);
        assert!(materialize.contains("<ul class=\"browser-default\">"));
        assert!(materialize.contains("<ol class=\"browser-default\" start=\"3\">"));

        let latex = render(text, Backend::Latex);
        assert!(latex.contains("\\begin{itemize}\n\n\\item \n\\par\none"));
        assert!(latex.contains("\\begin{enumerate}"));
    }

    #[test]
    fn test_list_item_lines() {
        let ast = parse("intro\n\n- first\n  more\n\n- second");
        let items: Vec<_> = ast
            .find::<ListItem>()
            .map(|(id, _)| ast.node(id).unwrap().line())
            .collect();
        assert_eq!(items, vec![3, 6]);

        let words: Vec<_> = ast
            .find::<Word>()
            .map(|(id, w)| (w.content.as_str(), ast.node(id).unwrap().line()))
            .collect();
        assert_eq!(
            words,
            vec![("intro", 1), ("first", 3), ("more", 4), ("second", 6)]
        );
    }

    #[test]
    fn test_unindented_list_content_is_an_error() {
        let ast = parse("- a\nb\n\nafter");
        let errors = ast.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].1.pattern, "unorderedlist");
        assert!(errors[0].1.message.starts_with("List item content must be indented by 2"));
        assert_eq!(ast.find::<Paragraph>().count(), 1);
    }

    #[test]
    fn test_quote_nests_blocks() {
        let html = render("> # Title\n>\n> body text", Backend::Html);
        assert_eq!(
            html,
            "<body><blockquote><h1 id=\"title\">Title</h1><p>body text</p></blockquote></body>"
        );

        let ast = parse(">bad");
        assert_eq!(ast.errors().len(), 1);
    }

    #[test]
    fn test_code_block() {
        let html = render("```rust\nfn main() {}\n```\n\nafter", Backend::Html);
        assert_eq!(
            html,
            "<body><pre><code class=\"language-rust\">fn main() {}\n</code></pre><p>after</p></body>"
        );

        let latex = render("```\na_b\n```", Backend::Latex);
        assert!(latex.contains("\\begin{verbatim}\na_b\n\\end{verbatim}"));
    }

    #[test]
    fn test_links_and_shortcuts() {
        let html = render(
            "[home]: https://example.org\n\nGo [home] or [the site](https://x.org class=ext) now.",
            Backend::Html,
        );
        assert_eq!(
            html,
            "<body><p>Go <a href=\"https://example.org\">home</a> or \
             <a class=\"ext\" href=\"https://x.org\">the site</a> now.</p></body>"
        );

        let latex = render("[home]: https://example.org\n\n[home]", Backend::Latex);
        assert!(latex.contains("\\href{https://example.org}{home}"));
    }

    #[test]
    fn test_unknown_shortcut_is_a_render_error() {
        let (reader, renderer) = setup(&CoreExtension::default(), Backend::Html);
        let mut ast = Ast::new(DocId::new("test.md"));
        reader.parse(&mut ast, "see [nowhere]").unwrap();

        let err = renderer.render(&ast).unwrap_err();
        assert!(matches!(err, RenderError::Content { variant: "ShortcutLink", .. }));
    }

    #[test]
    fn test_inline_formats() {
        let html = render("+strong+ =under= ~gone~ x^2^ H_2_O `a < b`", Backend::Html);
        assert_eq!(
            html,
            "<body><p><strong>strong</strong> <u>under</u> <strike>gone</strike> \
             x<sup>2</sup> H<sub>2</sub>O <code>a &lt; b</code></p></body>"
        );

        let latex = render("x^2^ +bold+", Backend::Latex);
        assert!(latex.contains("x$^{\\text{2}}$ \\textbf{bold}"));
    }

    #[test]
    fn test_smart_punctuation() {
        assert_eq!(
            render("a -- b --- c", Backend::Html),
            "<body><p>a &ndash; b &mdash; c</p></body>"
        );

        let plain = CoreExtension {
            smart_punctuation: false,
        };
        assert_eq!(
            render_with(&plain, "a -- b", Backend::Html),
            "<body><p>a -- b</p></body>"
        );
    }

    #[test]
    fn test_every_variant_has_every_backend() {
        let (reader, renderer) = setup(&CoreExtension::default(), Backend::Html);
        for component in reader.components() {
            for variant in component.variants() {
                for backend in Backend::ALL {
                    assert!(
                        renderer.has_binding(variant, backend),
                        "{} has no {} binding",
                        variant,
                        backend
                    );
                }
            }
        }
        assert!(renderer.has_binding(TokenVariant::of::<ErrorToken>(), Backend::Latex));
    }

    #[test]
    fn test_grammar_order() {
        let (reader, _) = setup(&CoreExtension::default(), Backend::Html);
        let block: Vec<_> = reader.lexer().grammar(BLOCK).unwrap().names().collect();
        assert_eq!(
            block,
            vec![
                "code",
                "quote",
                "heading",
                "orderedlist",
                "unorderedlist",
                "shortcut",
                "paragraph"
            ]
        );
    }
}
