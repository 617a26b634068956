//! Reading documents to ingest from disk.

use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;
use serde::Deserialize;

/// Layout of a document file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DocumentFormat {
    /// One JSON object per line with a `text` field.
    #[value(name = "jsonl")]
    JsonLines,
    /// Documents separated by one or more blank lines.
    #[value(name = "text")]
    PlainText,
}

impl DocumentFormat {
    /// Infer the format from the file extension; anything but `.jsonl` or
    /// `.ndjson` is read as plain text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") => {
                DocumentFormat::JsonLines
            }
            _ => DocumentFormat::PlainText,
        }
    }
}

#[derive(Deserialize)]
struct Record {
    text: String,
}

/// Parse JSON Lines input. Blank lines are ignored.
pub fn parse_json_lines(input: &str) -> anyhow::Result<Vec<String>> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<Record>(line)
                .map(|r| r.text)
                .with_context(|| format!("line {}: expected an object with a \"text\" field", i + 1))
        })
        .collect()
}

/// Split plain text into blank-line separated blocks.
pub fn parse_plain_text(input: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    for line in input.lines() {
        if line.trim().is_empty() {
            if !block.is_empty() {
                documents.push(block.join("\n"));
                block.clear();
            }
        } else {
            block.push(line);
        }
    }
    if !block.is_empty() {
        documents.push(block.join("\n"));
    }
    documents
}

/// Read every document in `path`.
pub async fn read_documents(
    path: &Path,
    format: Option<DocumentFormat>,
) -> anyhow::Result<Vec<String>> {
    let input = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    match format.unwrap_or_else(|| DocumentFormat::from_path(path)) {
        DocumentFormat::JsonLines => {
            parse_json_lines(&input).with_context(|| format!("invalid JSON Lines in {}", path.display()))
        }
        DocumentFormat::PlainText => Ok(parse_plain_text(&input)),
    }
}
