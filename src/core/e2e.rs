//! # E2E Bootstrap Module / E2E 引导模块
//!
//! Brings up the `elastic-package` stack with the plugin installed in its
//! Logstash container, and tests integration packages against it. Every step
//! shells out to a CLI and runs strictly one after another.
//!
//! 启动 `elastic-package` 技术栈并在其 Logstash 容器中安装插件，
//! 然后针对它测试集成包。每个步骤都调用外部 CLI，并严格按顺序执行。

use anyhow::{Context, Result};
use colored::*;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::{
    core::{
        config::E2eSettings,
        models::{FailureReason, PackageResult},
        stats::{self, EventCounters},
    },
    infra::{
        command::Step,
        fs::{self as infra_fs, ProcessorUsage},
        http::{HttpClient, RetryPolicy},
        t,
    },
};

pub const ELASTIC_PACKAGE_RELEASE_URL: &str =
    "https://api.github.com/repos/elastic/elastic-package/releases/latest";
pub const INTEGRATIONS_REPO_URL: &str = "https://github.com/elastic/integrations.git";
pub const PLUGIN_NAME: &str = "logstash-filter-elastic_integration";
pub const PROFILE_NAME: &str = "e2e";

const CONTAINER_LOGSTASH_HOME: &str = "/usr/share/logstash";
const CONTAINER_PIPELINE_CONFIG: &str = "/usr/share/logstash/pipeline/logstash.conf";
const LOCAL_PIPELINE_CONFIG_DIR: &str = ".buildkite/scripts/e2e-pipeline/config";

/// Ingest processors the plugin can execute.
pub const SUPPORTED_PROCESSORS: &[&str] = &[
    "append",
    "bytes",
    "community_id",
    "convert",
    "csv",
    "date",
    "date_index_name",
    "dissect",
    "dot_expander",
    "drop",
    "fail",
    "fingerprint",
    "foreach",
    "grok",
    "gsub",
    "html_strip",
    "join",
    "json",
    "kv",
    "lowercase",
    "network_direction",
    "pipeline",
    "registered_domain",
    "remove",
    "rename",
    "reroute",
    "script",
    "set",
    "sort",
    "split",
    "terminate",
    "trim",
    "uppercase",
    "uri_parts",
    "urldecode",
    "user_agent",
    "redact",
    "geoip",
];

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("ELASTIC_STACK_VERSION environment variable is missing, please export and try again.")]
    MissingStackVersion,

    #[error("project type accepts [on_prems, serverless] only, got `{0}`")]
    UnknownProjectType(String),

    #[error("unsupported platform `{0}`, E2E can run on [macos, linux] only")]
    UnsupportedPlatform(String),

    #[error("could not resolve an elastic-package download URL for `{0}`")]
    NoDistroAsset(String),

    #[error("unsupported processors found: {}", format_usage(.0))]
    UnsupportedProcessors(ProcessorUsage),

    #[error("following packages failed: {0:?}")]
    PackagesFailed(Vec<String>),
}

fn format_usage(usage: &ProcessorUsage) -> String {
    usage
        .iter()
        .map(|(processor, files)| {
            let files: Vec<_> = files.iter().map(|f| f.display().to_string()).collect();
            format!("{processor}: [{}]", files.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Where the stack runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectType {
    OnPrems,
    Serverless,
}

impl ProjectType {
    /// Local pipeline config copied into the container.
    pub fn pipeline_config_file(&self) -> &'static str {
        match self {
            ProjectType::OnPrems => "pipeline.conf",
            ProjectType::Serverless => "serverless_pipeline.conf",
        }
    }
}

impl FromStr for ProjectType {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_prems" => Ok(ProjectType::OnPrems),
            "serverless" => Ok(ProjectType::Serverless),
            other => Err(BootstrapError::UnknownProjectType(other.to_string())),
        }
    }
}

/// `elastic-package` archive suffix for an OS as named by `std::env::consts::OS`.
pub fn distro_for(os: &str) -> Result<&'static str, BootstrapError> {
    match os {
        "macos" => Ok("darwin_amd64.tar.gz"),
        "linux" => Ok("linux_amd64.tar.gz"),
        other => Err(BootstrapError::UnsupportedPlatform(other.to_string())),
    }
}

/// File name of the plugin gem built for `version`.
pub fn plugin_gem(version: &str) -> String {
    format!("{PLUGIN_NAME}-{version}-java.gem")
}

#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Deserialize)]
struct ReleaseAsset {
    browser_download_url: String,
}

/// Picks the first asset whose URL names the distro.
fn pick_asset_url(release: &ReleaseInfo, distro: &str) -> Option<String> {
    release
        .assets
        .iter()
        .map(|asset| asset.browser_download_url.trim())
        .find(|url| !url.is_empty() && url.contains(distro))
        .map(str::to_string)
}

/// Reads the Logstash node stats API.
/// 读取 Logstash 节点统计 API。
#[derive(Debug, Clone)]
pub struct StatsApi {
    url: String,
    /// Retries transient failures; used when a sample is required.
    client: HttpClient,
    /// Never retries; used while polling.
    probe: HttpClient,
}

impl StatsApi {
    pub fn new(url: impl Into<String>, policy: RetryPolicy) -> Result<Self> {
        let probe_policy = RetryPolicy {
            max_retries: 0,
            ..policy.clone()
        };
        Ok(Self {
            url: url.into(),
            client: HttpClient::new(policy)?,
            probe: HttpClient::new(probe_policy)?,
        })
    }

    pub async fn get(&self) -> Result<Value> {
        self.client
            .get_json(&self.url)
            .await
            .context("Failed to read Logstash node stats")
    }

    /// Polls until `ready` accepts a sample. Returns `false` if it never did.
    pub async fn wait_until<F>(&self, attempts: u32, interval: Duration, ready: F) -> bool
    where
        F: Fn(&Value) -> bool,
    {
        for attempt in 1..=attempts {
            match self.probe.get_json::<Value>(&self.url).await {
                Ok(stats) if ready(&stats) => return true,
                Ok(_) => tracing::debug!(attempt, "node stats not ready yet"),
                Err(e) => tracing::debug!(attempt, "node stats unavailable: {e}"),
            }
            tokio::time::sleep(interval).await;
        }
        false
    }
}

/// Brings the E2E stack up and down.
/// 启动和关闭 E2E 技术栈。
#[derive(Debug)]
pub struct Bootstrap {
    stack_version: String,
    project_type: ProjectType,
    distro: &'static str,
    work_dir: PathBuf,
    settings: E2eSettings,
    http: HttpClient,
    stats: StatsApi,
    stack_requested: bool,
}

impl Bootstrap {
    pub fn new(
        stack_version: &str,
        project_type: ProjectType,
        work_dir: &Path,
        settings: E2eSettings,
        policy: RetryPolicy,
    ) -> Result<Self> {
        let distro = distro_for(std::env::consts::OS)?;
        println!("{}", t!("e2e.stack_version", version = stack_version));
        println!("{}", t!("e2e.project_type", project_type = format!("{project_type:?}")));
        println!("{}", t!("e2e.platform", os = std::env::consts::OS));

        Ok(Self {
            stack_version: stack_version.to_string(),
            project_type,
            distro,
            work_dir: work_dir.to_path_buf(),
            stats: StatsApi::new(&settings.stats_url, policy.clone())?,
            http: HttpClient::new(policy)?,
            settings,
            stack_requested: false,
        })
    }

    pub fn stats(&self) -> &StatsApi {
        &self.stats
    }

    /// Whether `elastic-package stack up` was attempted, so teardown is needed.
    pub fn stack_requested(&self) -> bool {
        self.stack_requested
    }

    fn step<I, S>(&self, program: &str, args: I, failure_message: impl Into<String>) -> Step
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Step::new(program, args, failure_message).in_dir(&self.work_dir)
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.settings.poll_interval_secs)
    }

    /// Downloads `elastic-package`, prepares its profile, starts the stack and
    /// installs the plugin into the Logstash container.
    pub async fn run_elastic_stack(&mut self, skip_setup: bool) -> Result<()> {
        if !skip_setup {
            self.download_elastic_package().await?;
            self.make_elastic_package_global().await?;
            self.clone_integrations_repo().await?;
            self.scan_for_unsupported_processors()?;
            self.setup_elastic_package_profile().await?;
        }
        self.spin_stack().await?;
        self.install_plugin().await?;
        self.reload_container().await?;
        self.update_pipeline_config().await?;
        Ok(())
    }

    pub async fn stop_elastic_stack(&self) -> Result<()> {
        println!("{}", t!("e2e.stopping_stack").blue());
        self.step(
            "elastic-package",
            ["stack", "down"],
            "Error occurred while stopping stacks with elastic-package. Check logs for details.",
        )
        .run()
        .await?;
        Ok(())
    }

    async fn download_elastic_package(&self) -> Result<()> {
        let release: ReleaseInfo = self
            .http
            .get_json(ELASTIC_PACKAGE_RELEASE_URL)
            .await
            .context("Failed to fetch elastic-package release info")?;
        let url = pick_asset_url(&release, self.distro)
            .ok_or_else(|| BootstrapError::NoDistroAsset(self.distro.to_string()))?;

        let file_name = format!("downloaded_elastic_package_{}", self.distro);
        // curl keeps the archive intact where a streamed client download has corrupted it
        self.step(
            "curl",
            ["-o", file_name.as_str(), "--retry", "5", "--retry-delay", "5", "-fSL", url.as_str()],
            "Failed to download elastic-package",
        )
        .run()
        .await?;
        println!("{}", t!("e2e.downloaded").green());

        self.step(
            "tar",
            ["zxf", file_name.as_str()],
            format!("Error occurred while unzipping {file_name}"),
        )
        .run()
        .await?;
        Ok(())
    }

    async fn make_elastic_package_global(&self) -> Result<()> {
        self.step(
            "sudo",
            ["mv", "elastic-package", "/usr/local/bin"],
            "Could not make `elastic-package` global",
        )
        .run()
        .await?;
        Ok(())
    }

    async fn clone_integrations_repo(&self) -> Result<()> {
        self.step(
            "retry",
            ["-t", "3", "--", "git", "clone", "--single-branch", INTEGRATIONS_REPO_URL],
            "Error occurred while cloning an integrations repo. Check logs for details.",
        )
        .run()
        .await?;
        Ok(())
    }

    fn scan_for_unsupported_processors(&self) -> Result<()> {
        let unsupported = infra_fs::find_unsupported_processors(&self.work_dir, SUPPORTED_PROCESSORS)?;
        if !unsupported.is_empty() {
            return Err(BootstrapError::UnsupportedProcessors(unsupported).into());
        }
        Ok(())
    }

    async fn setup_elastic_package_profile(&self) -> Result<()> {
        // Deleting a profile that does not exist still succeeds.
        self.step(
            "elastic-package",
            ["profiles", "delete", PROFILE_NAME],
            "Error occurred while deleting and then creating a profile. Check logs for details.",
        )
        .run()
        .await?;
        self.step(
            "elastic-package",
            ["profiles", "create", PROFILE_NAME],
            "Error occurred while creating a profile. Check logs for details.",
        )
        .run()
        .await?;
        println!("{}", t!("e2e.profile_created", profile = PROFILE_NAME));

        let profile_dir = infra_fs::profile_dir(PROFILE_NAME);
        infra_fs::write_profile_config(
            &profile_dir.join("config.yml.example"),
            &profile_dir.join("config.yml"),
        )?;

        self.step(
            "elastic-package",
            ["profiles", "use", PROFILE_NAME],
            "Error occurred while selecting a profile. Check logs for details.",
        )
        .run()
        .await?;
        Ok(())
    }

    async fn spin_stack(&mut self) -> Result<()> {
        let mut args = vec!["stack", "up", "-d", "--version", self.stack_version.as_str()];
        if self.project_type == ProjectType::Serverless {
            args.extend(["--provider", "serverless"]);
        }
        self.stack_requested = true;
        self.step(
            "elastic-package",
            args,
            "Error occurred while running stacks with elastic-package. Check logs for details.",
        )
        .run()
        .await?;
        Ok(())
    }

    async fn install_plugin(&self) -> Result<()> {
        let version = infra_fs::read_plugin_version(&self.work_dir.join("VERSION"))?;
        let gem = plugin_gem(&version);
        let container = self.settings.container.as_str();

        self.step(
            "docker",
            ["cp".to_string(), gem.clone(), format!("{container}:{CONTAINER_LOGSTASH_HOME}")],
            "Error occurred while copying plugin to container, see logs for details.",
        )
        .run()
        .await?;

        println!("{}", t!("e2e.installing_plugin", plugin = PLUGIN_NAME).blue());
        self.step(
            "docker",
            ["exec", container, "bin/logstash-plugin", "install", gem.as_str()],
            "Error occurred installing plugin in Logstash container",
        )
        .run()
        .await?;
        println!("{}", t!("e2e.plugin_installed").green());
        Ok(())
    }

    async fn reload_container(&self) -> Result<()> {
        println!("{}", t!("e2e.restarting_container").blue());
        self.step(
            "docker",
            ["restart", self.settings.container.as_str()],
            "Error occurred while reloading Logstash container, see logs for details.",
        )
        .run()
        .await?;

        let started = self
            .stats
            .wait_until(self.settings.poll_attempts, self.poll_interval(), |stats| {
                stats::reload_successes(stats).is_some()
            })
            .await;
        if !started {
            tracing::warn!("Logstash main pipeline did not report after restart");
        }
        Ok(())
    }

    async fn update_pipeline_config(&self) -> Result<()> {
        let before = match self.stats.get().await {
            Ok(stats) => stats::reload_successes(&stats).unwrap_or(0),
            Err(e) => {
                tracing::warn!("{e:#}");
                0
            }
        };

        let local_config = Path::new(LOCAL_PIPELINE_CONFIG_DIR).join(self.project_type.pipeline_config_file());
        self.step(
            "docker",
            [
                "cp".to_string(),
                local_config.display().to_string(),
                format!("{}:{CONTAINER_PIPELINE_CONFIG}", self.settings.container),
            ],
            "Error occurred while replacing pipeline config, see logs for details",
        )
        .run()
        .await?;

        let reloaded = self
            .stats
            .wait_until(self.settings.poll_attempts, self.poll_interval(), |stats| {
                stats::reload_successes(stats).is_some_and(|count| count > before)
            })
            .await;
        if reloaded {
            println!("{}", t!("e2e.pipeline_reloaded").green());
        } else {
            tracing::warn!(before, "no pipeline reload observed after replacing the config");
        }
        Ok(())
    }
}

/// Runs `elastic-package test system` for one package and checks the
/// plugin's throughput against the previous sample.
///
/// 为单个包运行 `elastic-package test system`，并根据上一次采样检查插件的吞吐量。
#[derive(Debug)]
pub struct PackageTester<'a> {
    packages_dir: PathBuf,
    stats: &'a StatsApi,
    settle: Duration,
}

impl<'a> PackageTester<'a> {
    pub fn new(work_dir: &Path, stats: &'a StatsApi, settings: &E2eSettings) -> Self {
        Self {
            packages_dir: work_dir.join("integrations").join("packages"),
            stats,
            settle: Duration::from_secs(settings.settle_secs),
        }
    }

    /// Tests `package` and returns its result with the counters to compare the next package against.
    pub async fn test(&self, package: &str, previous: EventCounters) -> (PackageResult, EventCounters) {
        println!("{}", t!("e2e.testing_package", package = package).blue());
        let started = Instant::now();
        let failed = |reason, output: String| PackageResult::Failed {
            package: package.to_string(),
            output,
            reason,
            duration: started.elapsed(),
        };

        // The system test deploys the package and finishes once every event was sent.
        let system_test = Step::new(
            "elastic-package",
            ["test", "system"],
            format!("Error occurred while testing {package}"),
        )
        .in_dir(self.packages_dir.join(package));
        let outcome = match system_test.output().await {
            Ok(outcome) => outcome,
            Err(e) => return (failed(FailureReason::Command, e.to_string()), previous),
        };

        if !outcome.success() {
            let code = outcome
                .status
                .code()
                .map_or_else(|| "-".to_string(), |c| c.to_string());
            println!(
                "{}",
                t!("e2e.system_test_failed", package = package, code = code).yellow()
            );
            for line in outcome.output.lines() {
                println!("{line}");
            }
        }

        // Give Logstash time to forward the events downstream.
        tokio::time::sleep(self.settle).await;

        let current = match self.stats.get().await.and_then(|s| Ok(stats::integration_counters(&s)?)) {
            Ok(current) => current,
            Err(e) => return (failed(FailureReason::Stats, format!("{e:#}")), previous),
        };
        println!(
            "{}",
            t!(
                "e2e.found_stats",
                events_in = current.events_in,
                events_out = current.events_out
            )
        );

        match stats::analyze_throughput(previous, current, outcome.success()) {
            Ok(report) => {
                let warnings: Vec<String> = report.warnings.iter().map(ToString::to_string).collect();
                for warning in &warnings {
                    println!("{}", t!("e2e.throughput_warning", warning = warning).yellow());
                }
                println!("{}", t!("e2e.package_passed", package = package).green());
                let result = PackageResult::Passed {
                    package: package.to_string(),
                    events: report.delta,
                    warnings,
                    duration: started.elapsed(),
                };
                (result, report.baseline)
            }
            Err(e) => {
                let output = format!("{e}\n{}", outcome.output);
                // A failed package does not advance the baseline.
                (failed(FailureReason::Throughput, output), previous)
            }
        }
    }
}
