//! # Generate Command Module / 生成命令模块
//!
//! Implements `stack-matrix generate`: fetch the release manifest, resolve
//! the tracks selected by the CI environment and print the pipeline document.
//!
//! 实现 `stack-matrix generate`：获取发布清单，解析由 CI 环境选择的轨道，
//! 并打印流水线文档。

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::{
    core::{
        config::{AppConfig, CiEnvironment, PipelineKind},
        manifest::ReleaseManifest,
    },
    infra::http::{HttpClient, RetryPolicy},
    reporting::write_pipeline,
};

/// Where the manifest document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    Url(String),
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct GenerateArgs {
    pub pipeline: PipelineKind,
    pub ci: CiEnvironment,
    /// Overrides the profile's manifest URL.
    pub manifest: Option<ManifestSource>,
    pub config: Option<PathBuf>,
}

/// Fetches or reads the manifest. Only URL sources are retried.
pub async fn load_manifest(source: &ManifestSource, policy: RetryPolicy) -> Result<ReleaseManifest> {
    let document = match source {
        ManifestSource::Url(url) => {
            tracing::info!(%url, "fetching release manifest");
            HttpClient::new(policy)?.get_text(url).await?
        }
        ManifestSource::File(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest file: {}", path.display()))?,
    };
    ReleaseManifest::parse(&document).context("Failed to parse release manifest")
}

pub async fn execute(args: GenerateArgs) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref())?;
    let profile = config.profile(args.pipeline);
    let selection = args.ci.selection_mode(&profile)?;
    tracing::info!(
        pipeline = %profile.kind,
        target_branch = selection.display_track(),
        "Running with target_branch"
    );

    let source = args
        .manifest
        .unwrap_or_else(|| ManifestSource::Url(profile.manifest_url.clone()));
    let manifest = load_manifest(&source, config.retry.policy()).await?;

    let document = profile
        .build_document(&manifest, &selection)
        .with_context(|| format!("Failed to resolve versions for {}", selection.display_track()))?;
    if document.test_steps().is_empty() {
        tracing::warn!(
            target_branch = selection.display_track(),
            "no manifest entry matches, emitting an empty step group"
        );
    }

    write_pipeline(&document, std::io::stdout().lock())
}
