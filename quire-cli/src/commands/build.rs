//! Build command implementation.

use super::{load_config, translator};
use anyhow::{bail, Context, Result};
use quire_core::{Document, FileDocument};
use quire_types::Backend;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

pub struct BuildOptions {
    pub backend: Option<Backend>,
    pub workers: Option<usize>,
    pub json: bool,
}

/// Translate every `*.md` file under the source directory into the output directory
pub fn build_documents(config_path: &Path, opts: BuildOptions) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(backend) = opts.backend {
        config.backend = backend;
    }
    let workers = opts.workers.unwrap_or(config.workers);

    let mut translator = translator(&config)?;

    let source_dir = config.source_dir();
    let output_dir = config.output_dir();
    let files = discover_markdown_files(&source_dir)?;
    tracing::info!("Found {} markdown files", files.len());

    fs::create_dir_all(&output_dir).context("Failed to create output directory")?;
    let extension = config.backend.file_extension();
    let docs: Vec<Arc<dyn Document>> = files
        .iter()
        .map(|path| {
            let rel = path.strip_prefix(&source_dir).unwrap_or(path);
            let destination = output_dir.join(rel).with_extension(extension);
            Arc::new(FileDocument::new(
                rel.to_string_lossy().replace('\\', "/"),
                path.clone(),
                Some(destination),
            )) as Arc<dyn Document>
        })
        .collect();

    let summary = translator.build_all(&docs, workers);

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Build complete: {}", summary);
        for doc in summary.documents.iter().filter(|d| !d.is_clean()) {
            for error in &doc.errors {
                println!(
                    "- error {}:{} [{}]: {}",
                    doc.id, error.line, error.pattern, error.message
                );
            }
            for unmatched in &doc.unmatched {
                println!(
                    "- unmatched {}:{}: {}",
                    doc.id, unmatched.line, unmatched.snippet
                );
            }
            if let Some(failure) = &doc.failure {
                println!("- failed {}: {}", doc.id, failure);
            }
        }
    }

    if !summary.is_clean() {
        bail!(
            "{} of {} documents did not build cleanly",
            summary.documents.iter().filter(|d| !d.is_clean()).count(),
            summary.documents.len()
        );
    }
    Ok(())
}

/// Markdown files under `dir`, sorted so that builds are deterministic
fn discover_markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Source directory {:?} does not exist", dir);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.context("Failed to read source directory")?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}
