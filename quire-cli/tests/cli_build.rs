use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

fn write_site(root: &std::path::Path, config: &str) -> Result<(), Box<dyn std::error::Error>> {
    let docs = root.join("docs");
    fs::create_dir_all(docs.join("guide"))?;
    fs::write(root.join("quire.yml"), config)?;
    fs::write(
        docs.join("index.md"),
        "# Welcome\n\nSee the [guide](guide/intro.html).\n",
    )?;
    fs::write(
        docs.join("guide/intro.md"),
        "# Intro\n\n!float caption=Overview\n- one\n- two\n",
    )?;
    Ok(())
}

#[test]
fn build_writes_html_for_every_document() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_site(dir.path(), "paths:\n  source: docs\n  output: site\nworkers: 2\n")?;

    #[allow(deprecated)]
    Command::cargo_bin("quire")?
        .current_dir(dir.path())
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "2 documents: 2 written, 0 content errors, 0 unmatched, 0 failed",
        ));

    let index = fs::read_to_string(dir.path().join("site/index.html"))?;
    assert!(index.starts_with("<body><h1 id=\"welcome\">Welcome</h1>"));
    let intro = fs::read_to_string(dir.path().join("site/guide/intro.html"))?;
    assert!(intro.contains("<span class=\"quire-caption-heading\">Figure 1:</span>"));
    Ok(())
}

#[test]
fn build_backend_flag_overrides_config() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_site(dir.path(), "backend: html\n")?;

    #[allow(deprecated)]
    Command::cargo_bin("quire")?
        .current_dir(dir.path())
        .args(["build", "--backend", "latex"])
        .assert()
        .success();

    let tex = fs::read_to_string(dir.path().join("site/guide/intro.tex"))?;
    assert!(tex.starts_with("\\documentclass{article}"));
    assert!(tex.contains("\\begin{itemize}"));
    assert!(!dir.path().join("site/guide/intro.html").exists());
    Ok(())
}

#[test]
fn build_json_reports_content_errors_and_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_site(dir.path(), "workers: 1\n")?;
    fs::write(
        dir.path().join("docs/broken.md"),
        "- item\nnot indented\n",
    )?;

    #[allow(deprecated)]
    let assert = Command::cargo_bin("quire")?
        .current_dir(dir.path())
        .args(["build", "--json"])
        .assert()
        .failure();

    let payload: Value = serde_json::from_slice(&assert.get_output().stdout)?;
    let documents = payload["documents"].as_array().expect("documents array");
    assert_eq!(documents.len(), 3);

    let broken = documents
        .iter()
        .find(|d| d["id"] == "broken.md")
        .expect("broken.md report");
    assert_eq!(broken["errors"][0]["pattern"], "unorderedlist");
    assert_eq!(broken["errors"][0]["line"], 1);
    Ok(())
}

#[test]
fn unknown_extension_is_a_configuration_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_site(dir.path(), "extensions: [tables]\n")?;

    #[allow(deprecated)]
    Command::cargo_bin("quire")?
        .current_dir(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown extension 'tables'"));

    assert!(!dir.path().join("site").exists());
    Ok(())
}

#[test]
fn check_dumps_the_ast() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("page.md"), "## Hi there\n")?;

    #[allow(deprecated)]
    Command::cargo_bin("quire")?
        .current_dir(dir.path())
        .args(["check", "page.md", "--ast"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  Heading(level=2) line=1\n"))
        .stdout(predicate::str::contains("    Label(text=\"hi-there\") line=1\n"))
        .stdout(predicate::str::contains("page.md: ok"));
    Ok(())
}

#[test]
fn grammar_lists_patterns_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    #[allow(deprecated)]
    let assert = Command::cargo_bin("quire")?
        .current_dir(dir.path())
        .arg("grammar")
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    assert!(stdout.contains("Extensions: core, floats"));
    let float = stdout.find(" float ").expect("float pattern listed");
    let paragraph = stdout.find(" paragraph ").expect("paragraph pattern listed");
    assert!(float < paragraph);
    Ok(())
}
