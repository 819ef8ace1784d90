//! Recursive, first-match-wins lexer.
//!
//! A [`Grammar`] is an ordered [`Storage`] of [`Pattern`]s. At each position
//! the lexer tries the patterns in order and hands the first anchored match to
//! that pattern's builder. Named capture groups whose name is another grammar
//! are then lexed recursively with that grammar, under the node the builder
//! returned.
//!
//! Builder failures never abort the region: the partial subtree is rolled
//! back and a single [`ErrorToken`] takes its place.

use crate::error::{ConfigError, StorageError, TokenError, TokenizeError};
use crate::storage::{Location, Storage};
use crate::tokens::{Ast, ErrorToken, NodeId, Token, Unmatched};
use quire_types::DocId;
use regex::{Captures, Regex};
use std::fmt;
use std::sync::Arc;

/// Builder outcome: the node that becomes the parent of recursive groups, or
/// `None` to decline the match and let the next pattern try
pub type BuildResult = Result<Option<NodeId>, TokenizeError>;

type BuildFn = dyn Fn(&mut BuildContext<'_>, &LexerMatch<'_>) -> BuildResult + Send + Sync;

/// A named regular expression paired with the builder that turns a match into nodes
#[derive(Clone)]
pub struct Pattern {
    name: String,
    source: String,
    regex: Regex,
    builder: Arc<BuildFn>,
}

impl Pattern {
    /// Compile `pattern`, anchored at the current lexer position
    pub fn new<F>(name: impl Into<String>, pattern: &str, builder: F) -> Result<Self, ConfigError>
    where
        F: Fn(&mut BuildContext<'_>, &LexerMatch<'_>) -> BuildResult + Send + Sync + 'static,
    {
        let name = name.into();
        let regex = Regex::new(&format!(r"\A(?:{})", pattern)).map_err(|source| {
            ConfigError::InvalidPattern {
                name: name.clone(),
                source,
            }
        })?;
        Ok(Self {
            name,
            source: pattern.to_string(),
            regex,
            builder: Arc::new(builder),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The regular expression as written, before anchoring
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of the capture groups in this pattern
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.regex.capture_names().flatten()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}

pub type Grammar = Storage<Pattern>;

/// One successful anchored match, with its position in the source
pub struct LexerMatch<'t> {
    pattern: &'t str,
    caps: Captures<'t>,
    line: usize,
    offset: usize,
}

impl<'t> LexerMatch<'t> {
    pub fn pattern(&self) -> &str {
        self.pattern
    }

    /// Full matched text
    pub fn as_str(&self) -> &'t str {
        self.caps.get(0).map(|m| m.as_str()).unwrap_or("")
    }

    /// Text of a named group, if it participated in the match
    pub fn group(&self, name: &str) -> Option<&'t str> {
        self.caps.name(name).map(|m| m.as_str())
    }

    pub fn has(&self, name: &str) -> bool {
        self.caps.name(name).is_some()
    }

    /// Line of the first non-whitespace character of the match
    pub fn line(&self) -> usize {
        let text = self.as_str();
        let lead = text.len() - text.trim_start().len();
        self.line + newlines(&text[..lead])
    }

    /// Line on which a named group starts
    pub fn group_line(&self, name: &str) -> usize {
        match self.caps.name(name) {
            Some(group) => self.line + newlines(&self.as_str()[..group.start()]),
            None => self.line(),
        }
    }

    /// Byte offset of the match within the lexed region
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a builder can see and modify while handling one match
pub struct BuildContext<'a> {
    ast: &'a mut Ast,
    parent: NodeId,
    lexer: &'a Lexer,
    grammar: &'a str,
}

impl<'a> BuildContext<'a> {
    /// Node the match is being attached under
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    /// Grammar being lexed
    pub fn grammar(&self) -> &str {
        self.grammar
    }

    pub fn doc_id(&self) -> &DocId {
        self.ast.doc_id()
    }

    pub fn ast(&self) -> &Ast {
        &*self.ast
    }

    pub fn ast_mut(&mut self) -> &mut Ast {
        &mut *self.ast
    }

    /// Attach a token under the current parent
    pub fn push<T: Token>(&mut self, token: T, line: usize) -> Result<NodeId, TokenError> {
        self.ast.push(self.parent, token, line)
    }

    pub fn push_under<T: Token>(
        &mut self,
        parent: NodeId,
        token: T,
        line: usize,
    ) -> Result<NodeId, TokenError> {
        self.ast.push(parent, token, line)
    }

    /// Lex `text` with another grammar under `parent`
    pub fn tokenize(
        &mut self,
        parent: NodeId,
        grammar: &str,
        text: &str,
        line: usize,
    ) -> Result<usize, TokenizeError> {
        Ok(self.lexer.tokenize(&mut *self.ast, parent, grammar, text, line)?)
    }
}

/// Named grammars; the first registered grammar is the root grammar
#[derive(Debug, Default)]
pub struct Lexer {
    grammars: Storage<Grammar>,
}

impl Lexer {
    pub fn new(grammars: &[&str]) -> Self {
        let mut lexer = Self::default();
        for name in grammars {
            lexer.add_grammar(name);
        }
        lexer
    }

    /// Create an empty grammar; existing grammars are left untouched
    pub fn add_grammar(&mut self, name: &str) -> &mut Grammar {
        self.grammars.get_or_insert_default(name)
    }

    pub fn grammar(&self, name: &str) -> Result<&Grammar, StorageError> {
        self.grammars.get(name)
    }

    pub fn grammars(&self) -> impl Iterator<Item = (&str, &Grammar)> {
        self.grammars.iter()
    }

    /// Register `pattern` in `grammar` at `location`
    pub fn add(
        &mut self,
        grammar: &str,
        pattern: Pattern,
        location: Location,
    ) -> Result<(), ConfigError> {
        let name = pattern.name.clone();
        self.grammars
            .get_mut(grammar)
            .and_then(|rules| rules.add(name.clone(), pattern, location))
            .map_err(|source| ConfigError::Registration {
                grammar: grammar.to_string(),
                name,
                source,
            })
    }

    /// Lex `text` with `grammar`, attaching nodes under `parent`.
    ///
    /// Returns the number of bytes consumed. Scanning stops at the first
    /// position no pattern matches; trailing text that is not whitespace is
    /// recorded on the AST as [`Unmatched`].
    pub fn tokenize(
        &self,
        ast: &mut Ast,
        parent: NodeId,
        grammar: &str,
        text: &str,
        line: usize,
    ) -> Result<usize, StorageError> {
        let (grammar, rules) = self
            .grammars
            .iter()
            .find(|(name, _)| *name == grammar)
            .ok_or_else(|| StorageError::NotFound(grammar.to_string()))?;

        let mut pos = 0;
        let mut line = line;
        while pos < text.len() {
            match self.step(ast, parent, grammar, rules, text, pos, line) {
                Some(end) => {
                    line += newlines(&text[pos..end]);
                    pos = end;
                }
                None => {
                    let rest = &text[pos..];
                    let trimmed = rest.trim_start();
                    if !trimmed.is_empty() {
                        let lead = rest.len() - trimmed.len();
                        let report =
                            Unmatched::new(line + newlines(&rest[..lead]), pos + lead, trimmed);
                        ast.record_unmatched(report);
                    }
                    break;
                }
            }
        }
        Ok(pos)
    }

    /// Try each pattern at `pos`; returns the end of the consumed match
    #[allow(clippy::too_many_arguments)]
    fn step(
        &self,
        ast: &mut Ast,
        parent: NodeId,
        grammar: &str,
        rules: &Grammar,
        text: &str,
        pos: usize,
        line: usize,
    ) -> Option<usize> {
        let rest = &text[pos..];
        for (name, pattern) in rules.iter() {
            let Some(caps) = pattern.regex.captures(rest) else {
                continue;
            };
            let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
            if end == 0 {
                continue;
            }

            let m = LexerMatch {
                pattern: name,
                caps,
                line,
                offset: pos,
            };
            let mark = ast.mark();
            match self.build(ast, parent, grammar, pattern, &m) {
                Ok(Some(_)) => return Some(pos + end),
                Ok(None) => ast.rollback(mark),
                Err(err) => {
                    ast.rollback(mark);
                    tracing::debug!(
                        "{}:{}: pattern '{}' failed: {}",
                        ast.doc_id(),
                        m.line(),
                        name,
                        err
                    );
                    let token = ErrorToken::new(name, &err, m.as_str(), ast.doc_id().clone());
                    ast.push_error(parent, token, m.line());
                    return Some(pos + end);
                }
            }
        }
        None
    }

    fn build(
        &self,
        ast: &mut Ast,
        parent: NodeId,
        grammar: &str,
        pattern: &Pattern,
        m: &LexerMatch<'_>,
    ) -> BuildResult {
        let built = {
            let mut cx = BuildContext {
                ast: &mut *ast,
                parent,
                lexer: self,
                grammar,
            };
            (pattern.builder)(&mut cx, m)?
        };
        let Some(node) = built else {
            return Ok(None);
        };

        for group in pattern.group_names() {
            if group == grammar || !self.grammars.contains(group) {
                continue;
            }
            if let Some(sub) = m.group(group) {
                self.tokenize(ast, node, group, sub, m.group_line(group))?;
            }
        }
        Ok(Some(node))
    }
}

fn newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{Number, Paragraph, Space, Word};

    fn word() -> Pattern {
        Pattern::new("word", "[A-Za-z]+", |cx, m| {
            Ok(Some(cx.push(Word::new(m.as_str())?, m.line())?))
        })
        .unwrap()
    }

    fn number() -> Pattern {
        Pattern::new("number", "[0-9]+", |cx, m| {
            Ok(Some(cx.push(Number::new(m.as_str())?, m.line())?))
        })
        .unwrap()
    }

    fn words(ast: &Ast) -> Vec<String> {
        ast.descendants(ast.root())
            .into_iter()
            .skip(1)
            .map(|id| {
                let node = ast.node(id).unwrap();
                let token = node.token();
                match (token.downcast_ref::<Word>(), token.downcast_ref::<Number>()) {
                    (Some(w), _) => format!("Word({})", w.content),
                    (_, Some(n)) => format!("Number({})", n.content),
                    _ => token.name().to_string(),
                }
            })
            .collect()
    }

    fn lex(lexer: &Lexer, text: &str) -> Ast {
        let mut ast = Ast::new(DocId::new("test"));
        let root = ast.root();
        lexer.tokenize(&mut ast, root, "inline", text, 1).unwrap();
        ast
    }

    #[test]
    fn test_word_then_number() {
        let mut lexer = Lexer::new(&["inline"]);
        lexer.add("inline", number(), Location::End).unwrap();
        lexer.add("inline", word(), "<number".parse().unwrap()).unwrap();

        let ast = lex(&lexer, "ab12");
        assert_eq!(words(&ast), vec!["Word(ab)", "Number(12)"]);

        let mut swapped = Lexer::new(&["inline"]);
        swapped.add("inline", word(), Location::End).unwrap();
        swapped.add("inline", number(), "<word".parse().unwrap()).unwrap();
        assert_eq!(words(&lex(&swapped, "ab12")), vec!["Word(ab)", "Number(12)"]);
    }

    #[test]
    fn test_first_match_wins_over_longest() {
        let short = Pattern::new("short", "a", |cx, m| {
            Ok(Some(cx.push(Word::new(m.as_str())?, m.line())?))
        })
        .unwrap();

        let mut lexer = Lexer::new(&["inline"]);
        lexer.add("inline", short, Location::End).unwrap();
        lexer.add("inline", word(), Location::End).unwrap();

        assert_eq!(words(&lex(&lexer, "aaa")), vec!["Word(a)", "Word(a)", "Word(a)"]);
    }

    #[test]
    fn test_builder_error_is_isolated() {
        let failing = Pattern::new("bad", "[0-9]+", |cx, m| {
            let para = cx.push(Paragraph, m.line())?;
            cx.push_under(para, Word::new("partial")?, m.line())?;
            Err(TokenizeError::msg("numbers are not allowed"))
        })
        .unwrap();

        let mut lexer = Lexer::new(&["inline"]);
        lexer.add("inline", word(), Location::End).unwrap();
        lexer.add("inline", failing, Location::End).unwrap();

        let ast = lex(&lexer, "ab12cd");
        assert_eq!(words(&ast), vec!["Word(ab)", "ErrorToken", "Word(cd)"]);

        let errors = ast.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].1.pattern, "bad");
        assert_eq!(errors[0].1.message, "numbers are not allowed");
        assert_eq!(errors[0].1.text, "12");
    }

    #[test]
    fn test_declined_match_tries_next_pattern() {
        let picky = Pattern::new("picky", "[a-z]+", |cx, m| {
            if m.as_str() == "skip" {
                return Ok(None);
            }
            Ok(Some(cx.push(Word::new(m.as_str().to_uppercase())?, m.line())?))
        })
        .unwrap();

        let mut lexer = Lexer::new(&["inline"]);
        lexer.add("inline", picky, Location::End).unwrap();
        lexer.add("inline", word(), Location::End).unwrap();

        assert_eq!(words(&lex(&lexer, "skip")), vec!["Word(skip)"]);
        assert_eq!(words(&lex(&lexer, "keep")), vec!["Word(KEEP)"]);
    }

    #[test]
    fn test_unmatched_text_is_recorded() {
        let mut lexer = Lexer::new(&["inline"]);
        lexer.add("inline", word(), Location::End).unwrap();

        let mut ast = Ast::new(DocId::new("test"));
        let root = ast.root();
        let consumed = lexer.tokenize(&mut ast, root, "inline", "abc?def", 3).unwrap();

        assert_eq!(consumed, 3);
        assert_eq!(
            ast.unmatched(),
            &[Unmatched {
                line: 3,
                offset: 3,
                snippet: "?def".to_string(),
            }]
        );

        let mut ast = Ast::new(DocId::new("test"));
        let consumed = lexer.tokenize(&mut ast, root, "inline", "abc \n ", 1).unwrap();
        assert_eq!(consumed, 3);
        assert!(ast.unmatched().is_empty());
    }

    #[test]
    fn test_recursion_keeps_line_numbers() {
        let mut lexer = Lexer::new(&["block", "inline"]);
        let para = Pattern::new(
            "paragraph",
            r"\s*(?P<inline>.+?)(?:\n(?:[ \t]*\n)+|\s*\z)",
            |cx, m| Ok(Some(cx.push(Paragraph, m.line())?)),
        )
        .unwrap();
        let space = Pattern::new("space", " +", |cx, m| {
            Ok(Some(cx.push(Space::new(m.len())?, m.line())?))
        })
        .unwrap();
        lexer.add("block", para.clone(), Location::End).unwrap();
        lexer.add("inline", word(), Location::End).unwrap();
        lexer.add("inline", space, Location::End).unwrap();

        let mut ast = Ast::new(DocId::new("test"));
        let root = ast.root();
        lexer
            .tokenize(&mut ast, root, "block", "\n\nfirst\n\n\nsecond two", 1)
            .unwrap();

        let lines: Vec<_> = ast
            .find::<Word>()
            .map(|(id, w)| (w.content.clone(), ast.node(id).unwrap().line()))
            .collect();
        assert_eq!(
            lines,
            vec![
                ("first".to_string(), 3),
                ("second".to_string(), 6),
                ("two".to_string(), 6),
            ]
        );
        let paras: Vec<_> = ast
            .find::<Paragraph>()
            .map(|(id, _)| ast.node(id).unwrap().line())
            .collect();
        assert_eq!(paras, vec![3, 6]);
    }

    #[test]
    fn test_registration_errors() {
        let mut lexer = Lexer::new(&["inline"]);
        lexer.add("inline", word(), Location::End).unwrap();

        let err = lexer.add("inline", word(), Location::End).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Registration {
                source: StorageError::Duplicate(_),
                ..
            }
        ));

        let err = lexer.add("missing", number(), Location::End).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Registration {
                source: StorageError::NotFound(_),
                ..
            }
        ));

        assert!(matches!(
            Pattern::new("broken", "(", |_, _| Ok(None)),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }
}
