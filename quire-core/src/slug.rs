//! Slugs for heading anchors and LaTeX labels.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

static HYPHENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").expect("valid hyphen regex"));

/// Convert heading text to an identifier usable as an HTML id or `\label` key
///
/// ```
/// use quire_core::slugify;
///
/// assert_eq!(slugify("Getting Started"), "getting-started");
/// assert_eq!(slugify("C++ & Rust"), "c-rust");
/// ```
pub fn slugify(input: &str) -> String {
    let cleaned = input
        .to_lowercase()
        .graphemes(true)
        .filter_map(|g| match g {
            " " | "_" | "\t" | "\n" => Some("-"),
            _ => {
                let c = g.chars().next()?;
                (c.is_alphanumeric() || c == '-').then_some(g)
            }
        })
        .collect::<String>();

    HYPHENS
        .replace_all(&cleaned, "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_text() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Section 2.1: Results  "), "section-21-results");
        assert_eq!(slugify("snake_case_name"), "snake-case-name");
    }

    #[test]
    fn test_unicode_letters_survive() {
        assert_eq!(slugify("Café Menu"), "café-menu");
    }

    #[test]
    fn test_nothing_left() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("?!"), "");
    }
}
