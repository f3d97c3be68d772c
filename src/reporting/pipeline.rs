//! Serializes the generated pipeline document for the CI agent.

use crate::core::models::PipelineDocument;
use anyhow::{Context, Result};
use std::io::Write;

/// First line of the emitted document; lets editors validate against the Buildkite schema.
pub const SCHEMA_COMMENT: &str =
    "# yaml-language-server: $schema=https://raw.githubusercontent.com/buildkite/pipeline-schema/main/schema.json";

/// Renders the document as YAML, preceded by the schema comment.
pub fn render_pipeline(document: &PipelineDocument) -> Result<String> {
    let body = serde_yaml::to_string(document).context("Failed to serialize pipeline document")?;
    Ok(format!("{SCHEMA_COMMENT}\n{body}"))
}

/// Writes the rendered document to `out`.
pub fn write_pipeline<W: Write>(document: &PipelineDocument, mut out: W) -> Result<()> {
    let rendered = render_pipeline(document)?;
    out.write_all(rendered.as_bytes())
        .context("Failed to write pipeline document")?;
    out.flush().context("Failed to write pipeline document")
}
