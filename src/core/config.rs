//! # Configuration Module / 配置模块
//!
//! Built-in pipeline profiles, the optional `StackMatrix.toml` settings file,
//! and the mapping from CI environment variables to a [`SelectionMode`].
//!
//! 内置的流水线配置、可选的 `StackMatrix.toml` 设置文件，
//! 以及从 CI 环境变量到 [`SelectionMode`] 的映射。

use crate::core::manifest::ReleaseManifest;
use crate::core::models::{expand_steps, Agents, PipelineDocument, StepGroup, TestMode};
use crate::core::resolver::{self, ResolveError, SelectionMode};
use crate::infra::http::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "StackMatrix.toml";

pub const LOGSTASH_RELEASES_JSON_URL: &str =
    "https://raw.githubusercontent.com/elastic/logstash/main/ci/logstash_releases.json";
pub const LOGSTASH_VERSIONS_YAML_URL: &str =
    "https://raw.githubusercontent.com/logstash-plugins/.ci/refs/heads/1.x/logstash-versions.yml";

pub const UNIT_TEST_COMMAND: &str = ".buildkite/scripts/run_tests.sh";
pub const E2E_TEST_COMMAND: &str = ".buildkite/scripts/run_e2e_tests.sh";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown pipeline `{0}`, expected one of: pull-request, build, e2e")]
    UnknownPipeline(String),

    #[error("no target branch given; set {0} or MANUAL_TARGET_BRANCH")]
    MissingTargetBranch(&'static str),
}

/// The pipelines this tool can generate.
/// 此工具可以生成的流水线类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineKind {
    /// Unit and integration tests for a pull request.
    PullRequest,
    /// Unit and integration tests after merges and on schedule.
    Build,
    /// End-to-end tests against a full stack.
    #[serde(rename = "e2e")]
    EndToEnd,
}

impl PipelineKind {
    pub const NAMES: [&'static str; 3] = ["pull-request", "build", "e2e"];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::PullRequest => "pull-request",
            PipelineKind::Build => "build",
            PipelineKind::EndToEnd => "e2e",
        }
    }

    /// The CI variable carrying the target branch for this pipeline.
    pub fn target_branch_var(&self) -> &'static str {
        match self {
            PipelineKind::PullRequest => "GITHUB_PR_TARGET_BRANCH",
            PipelineKind::Build | PipelineKind::EndToEnd => "TARGET_BRANCH",
        }
    }
}

impl FromStr for PipelineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pull-request" => Ok(PipelineKind::PullRequest),
            "build" => Ok(PipelineKind::Build),
            "e2e" => Ok(PipelineKind::EndToEnd),
            other => Err(ConfigError::UnknownPipeline(other.to_string())),
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that differs between the generated pipelines.
/// 生成的各流水线之间的所有差异。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineProfile {
    pub kind: PipelineKind,
    pub manifest_url: String,
    pub command: String,
    pub agents: Agents,
    pub test_mode: TestMode,
    pub group_key: String,
    /// Whether scheduled or `main` builds enumerate every snapshot track.
    pub supports_all_tracks: bool,
}

impl PipelineProfile {
    pub fn builtin(kind: PipelineKind) -> Self {
        match kind {
            PipelineKind::PullRequest => Self {
                kind,
                manifest_url: LOGSTASH_RELEASES_JSON_URL.to_string(),
                command: UNIT_TEST_COMMAND.to_string(),
                agents: Agents {
                    provider: "gcp".to_string(),
                    machine_type: "n1-standard-4".to_string(),
                    image_project: None,
                    image: "family/core-ubuntu-2204".to_string(),
                    disk_size_gb: None,
                },
                test_mode: TestMode::UnitAndIntegration,
                group_key: "pr-and-build-steps".to_string(),
                supports_all_tracks: false,
            },
            PipelineKind::Build => Self {
                kind,
                manifest_url: LOGSTASH_VERSIONS_YAML_URL.to_string(),
                command: UNIT_TEST_COMMAND.to_string(),
                agents: logstash_agents("n2-standard-4", None),
                test_mode: TestMode::UnitAndIntegration,
                group_key: "pr-and-build-steps".to_string(),
                supports_all_tracks: true,
            },
            PipelineKind::EndToEnd => Self {
                kind,
                manifest_url: LOGSTASH_VERSIONS_YAML_URL.to_string(),
                command: E2E_TEST_COMMAND.to_string(),
                agents: logstash_agents("n2-standard-16", Some(120)),
                test_mode: TestMode::EndToEnd,
                group_key: "e2e-steps".to_string(),
                supports_all_tracks: true,
            },
        }
    }

    /// Resolves `selection` against `manifest` and builds the pipeline document.
    ///
    /// 根据 `manifest` 解析 `selection` 并构建流水线文档。
    pub fn build_document(
        &self,
        manifest: &ReleaseManifest,
        selection: &SelectionMode,
    ) -> Result<PipelineDocument, ResolveError> {
        let resolved = resolver::resolve(manifest, selection)?;
        let steps = expand_steps(&resolved, self.test_mode, selection, &self.command);
        let group = StepGroup {
            group: self.group_title(selection),
            key: self.group_key.clone(),
            steps,
        };
        Ok(PipelineDocument::new(self.agents.clone(), group))
    }

    /// Title of the single step group for the given selection.
    pub fn group_title(&self, selection: &SelectionMode) -> String {
        let track = selection.display_track();
        match self.test_mode {
            TestMode::UnitAndIntegration => format!("{track} branch steps"),
            TestMode::EndToEnd => format!("{track} branch E2E steps"),
        }
    }
}

fn logstash_agents(machine_type: &str, disk_size_gb: Option<u32>) -> Agents {
    Agents {
        provider: "gcp".to_string(),
        machine_type: machine_type.to_string(),
        image_project: Some("elastic-images-prod".to_string()),
        image: "family/platform-ingest-logstash-multi-jdk-ubuntu-2204".to_string(),
        disk_size_gb,
    }
}

/// The CI variables that pick the tracks to test.
/// 决定要测试哪些轨道的 CI 变量。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiEnvironment {
    /// `GITHUB_PR_TARGET_BRANCH` or `TARGET_BRANCH`, depending on the pipeline.
    pub target_branch: Option<String>,
    /// Manual override of the target branch.
    pub manual_target_branch: Option<String>,
    /// `BUILDKITE_SOURCE`: `webhook`, `schedule`, `ui`, ...
    pub source: Option<String>,
    /// `BUILDKITE_BRANCH`.
    pub branch: Option<String>,
}

impl CiEnvironment {
    /// Scheduled runs and runs of `main` itself test every track.
    pub fn is_scheduled(&self) -> bool {
        self.source.as_deref() == Some("schedule") || self.branch.as_deref() == Some("main")
    }

    /// The target branch, preferring a non-empty manual override.
    pub fn effective_target_branch(&self) -> Option<&str> {
        non_empty(self.manual_target_branch.as_deref())
            .or_else(|| non_empty(self.target_branch.as_deref()))
    }

    /// Chooses the selection mode for `profile`.
    pub fn selection_mode(&self, profile: &PipelineProfile) -> Result<SelectionMode, ConfigError> {
        if profile.supports_all_tracks && self.is_scheduled() {
            return Ok(SelectionMode::AllTracks);
        }
        self.effective_target_branch()
            .map(|track| SelectionMode::SingleTrack(track.to_string()))
            .ok_or(ConfigError::MissingTargetBranch(profile.kind.target_branch_var()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Retry settings for manifest and API fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub backoff_factor_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            backoff_factor_ms: policy.backoff_factor.as_millis() as u64,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_factor: Duration::from_millis(self.backoff_factor_ms),
            ..RetryPolicy::default()
        }
    }
}

/// Tunables of the E2E run.
/// E2E 运行的可调参数。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct E2eSettings {
    /// Integration packages tested when `--integrations` is not given.
    pub packages: Vec<String>,
    pub stats_url: String,
    pub container: String,
    /// How many times to poll the stats API after a restart or config change.
    pub poll_attempts: u32,
    pub poll_interval_secs: u64,
    /// Pause between a system test and sampling the stats.
    pub settle_secs: u64,
}

impl Default for E2eSettings {
    fn default() -> Self {
        Self {
            packages: ["apache", "m365_defender", "nginx", "tomcat"]
                .into_iter()
                .map(String::from)
                .collect(),
            stats_url: "http://localhost:9600/_node/stats".to_string(),
            container: "elastic-package-stack-e2e-logstash-1".to_string(),
            poll_attempts: 30,
            poll_interval_secs: 2,
            settle_secs: 2,
        }
    }
}

/// Per-pipeline manifest URL overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ManifestUrls {
    pub pull_request: Option<String>,
    pub build: Option<String>,
    pub e2e: Option<String>,
}

/// Contents of `StackMatrix.toml`. Every field is optional.
/// `StackMatrix.toml` 的内容。所有字段都是可选的。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// The language for the runner's messages (e.g. "en", "zh-CN").
    /// Falls back to the system locale when unset.
    pub language: Option<String>,
    pub retry: RetrySettings,
    pub e2e: E2eSettings,
    pub manifest_urls: ManifestUrls,
}

impl AppConfig {
    /// Loads the config file.
    ///
    /// An explicitly given path must exist; without one, `StackMatrix.toml` in
    /// the working directory is used if present and defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
    }

    /// The built-in profile for `kind` with this config's overrides applied.
    pub fn profile(&self, kind: PipelineKind) -> PipelineProfile {
        let mut profile = PipelineProfile::builtin(kind);
        let url_override = match kind {
            PipelineKind::PullRequest => &self.manifest_urls.pull_request,
            PipelineKind::Build => &self.manifest_urls.build,
            PipelineKind::EndToEnd => &self.manifest_urls.e2e,
        };
        if let Some(url) = url_override {
            profile.manifest_url = url.clone();
        }
        profile
    }
}
