use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::app::App;
use crate::documents::{DocumentFormat, read_documents};

/// Run the `tinyrag ingest` command.
pub async fn run_ingest(
    app: &App,
    file: &Path,
    format: Option<DocumentFormat>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let documents = read_documents(file, format).await?;
    info!(path = %file.display(), document_count = documents.len(), "read documents");

    let report = app.pipeline().ingest(&documents).await?;
    app.persist().await?;

    writeln!(
        out,
        "Ingested {} documents from {} ({} skipped).",
        report.inserted,
        file.display(),
        report.skipped
    )?;
    Ok(())
}
