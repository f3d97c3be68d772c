//! # File System Operations Module / 文件系统操作模块
//!
//! File chores of the E2E bootstrap: locating the `elastic-package` profile,
//! rewriting its config, reading the plugin version and scanning the cloned
//! integrations for ingest processors the plugin cannot run.
//!
//! E2E 引导过程中的文件操作：定位 `elastic-package` 配置目录、重写其配置、
//! 读取插件版本，以及扫描克隆的集成仓库中插件无法运行的 ingest 处理器。

use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Line of the profile config that turns on the Logstash service.
pub const LOGSTASH_ENABLED_SETTING: &str = "stack.logstash_enabled: true";

/// Ingest pipeline definitions of every data stream, relative to the clone's parent.
pub const INGEST_PIPELINE_GLOB: &str =
    "integrations/packages/**/data_stream/**/elasticsearch/ingest_pipeline/*.yml";

/// Processor type -> files using it.
pub type ProcessorUsage = BTreeMap<String, BTreeSet<PathBuf>>;

/// Directory of an `elastic-package` profile under the user's home.
pub fn profile_dir(profile: &str) -> PathBuf {
    let raw = format!("~/.elastic-package/profiles/{profile}");
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}

/// Uncomments the Logstash switch of a profile config, leaving other lines untouched.
/// 取消注释配置中的 Logstash 开关，其他行保持不变。
pub fn enable_logstash(config: &str) -> String {
    config
        .split_inclusive('\n')
        .map(|line| {
            if line.contains(LOGSTASH_ENABLED_SETTING) {
                line.trim_start().trim_start_matches('#').trim_start()
            } else {
                line
            }
        })
        .collect()
}

/// Writes `config_file` from `example_file` with Logstash enabled.
pub fn write_profile_config(example_file: &Path, config_file: &Path) -> Result<()> {
    let example = fs::read_to_string(example_file)
        .with_context(|| format!("Failed to read profile config: {}", example_file.display()))?;
    fs::write(config_file, enable_logstash(&example))
        .with_context(|| format!("Failed to write profile config: {}", config_file.display()))
}

/// Reads the plugin version from a `VERSION` file, trimming whitespace.
pub fn read_plugin_version(version_file: &Path) -> Result<String> {
    let version = fs::read_to_string(version_file)
        .with_context(|| format!("Failed to read plugin version: {}", version_file.display()))?;
    let version = version.trim();
    anyhow::ensure!(!version.is_empty(), "{} is empty", version_file.display());
    Ok(version.to_string())
}

/// Finds processors outside `supported` in the ingest pipelines under `root`.
///
/// Files that cannot be read or parsed are reported through `tracing` and skipped.
///
/// 在 `root` 下的 ingest 流水线中查找不在 `supported` 中的处理器。
/// 无法读取或解析的文件会通过 `tracing` 报告并跳过。
pub fn find_unsupported_processors(root: &Path, supported: &[&str]) -> Result<ProcessorUsage> {
    let pattern = root.join(INGEST_PIPELINE_GLOB);
    let pattern = pattern
        .to_str()
        .with_context(|| format!("Non UTF-8 path: {}", root.display()))?;

    let mut unsupported = ProcessorUsage::new();
    for entry in glob::glob(pattern).context("Invalid ingest pipeline pattern")? {
        let file = match entry {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Failed to access file: {e}");
                continue;
            }
        };
        let processors = match processor_types(&file) {
            Ok(processors) => processors,
            Err(e) => {
                tracing::warn!("Failed to parse file: {}. Error: {e:#}", file.display());
                continue;
            }
        };
        for processor in processors {
            if !supported.contains(&processor.as_str()) {
                unsupported.entry(processor).or_default().insert(file.clone());
            }
        }
    }
    Ok(unsupported)
}

/// Top-level processor types of one ingest pipeline file.
fn processor_types(file: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(file)?;
    let document: serde_yaml::Value = serde_yaml::from_str(&content)?;
    let Some(processors) = document.get("processors").and_then(|p| p.as_sequence()) else {
        return Ok(Vec::new());
    };

    let types = processors
        .iter()
        .filter_map(|processor| processor.as_mapping())
        .flat_map(|processor| processor.keys())
        .filter_map(|key| key.as_str().map(str::to_string))
        .collect();
    Ok(types)
}
