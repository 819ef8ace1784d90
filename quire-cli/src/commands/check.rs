//! Tokenize a single file and surface its diagnostics.

use super::{load_config, translator};
use anyhow::{bail, Context, Result};
use quire_core::reader::describe_unmatched;
use quire_core::FileDocument;
use std::path::Path;

pub fn check_file(config_path: &Path, file: &Path, show_ast: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let mut translator = translator(&config)?;

    let doc = FileDocument::new(file.to_string_lossy().to_string(), file, None);
    let ast = translator
        .tokenize(&doc)
        .with_context(|| format!("Failed to tokenize {:?}", file))?;

    if show_ast {
        print!("{}", ast.dump());
    }

    let errors = ast.errors();
    for (id, error) in &errors {
        let line = ast.node(*id).map(|n| n.line()).unwrap_or(1);
        println!("- error {}:{} [{}]: {}", ast.doc_id(), line, error.pattern, error.message);
    }
    for unmatched in ast.unmatched() {
        println!("- {}", describe_unmatched(&ast, unmatched));
    }

    if !errors.is_empty() || !ast.unmatched().is_empty() {
        bail!(
            "{} content errors, {} unmatched regions",
            errors.len(),
            ast.unmatched().len()
        );
    }
    println!("{}: ok ({} nodes)", ast.doc_id(), ast.len());
    Ok(())
}
