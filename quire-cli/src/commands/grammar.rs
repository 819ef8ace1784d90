//! List the loaded grammars.

use super::{load_config, translator};
use anyhow::Result;
use std::path::Path;

/// Print each grammar's patterns in the order the lexer tries them
pub fn show_grammar(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let translator = translator(&config)?;

    println!(
        "Extensions: {}",
        translator.extension_names().collect::<Vec<_>>().join(", ")
    );
    for (name, grammar) in translator.reader().lexer().grammars() {
        println!("{}:", name);
        for (position, (pattern, rule)) in grammar.iter().enumerate() {
            println!("  {:>2}. {:<16} {}", position + 1, pattern, rule.source());
        }
    }
    Ok(())
}
