//! # Data Models Module / 数据模型模块
//!
//! This module defines the data structures shared by the generator and the
//! E2E runner: the generated pipeline document and its test steps, and the
//! per-package results of an E2E run.
//!
//! 此模块定义了生成器和 E2E 运行器共享的数据结构：
//! 生成的流水线文档及其测试步骤，以及 E2E 运行中每个包的结果。

use crate::core::resolver::{ResolvedVersion, SelectionMode};
use crate::core::stats::EventDelta;
use crate::infra::t;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// How each resolved version is expanded into test steps.
/// 每个解析出的版本如何展开为测试步骤。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestMode {
    /// One unit-test step and one integration-test step per version.
    /// 每个版本一个单元测试步骤和一个集成测试步骤。
    UnitAndIntegration,
    /// One end-to-end step per version.
    /// 每个版本一个端到端测试步骤。
    EndToEnd,
}

/// A single generated CI step.
/// 单个生成的 CI 步骤。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStepDescriptor {
    pub label: String,
    pub command: String,
    /// Sorted so that serialization is stable across runs.
    pub env: BTreeMap<String, String>,
}

/// Builds the steps for every resolved version, in resolution order.
///
/// 按解析顺序为每个已解析的版本构建步骤。
pub fn expand_steps(
    resolved: &[ResolvedVersion],
    mode: TestMode,
    selection: &SelectionMode,
    command: &str,
) -> Vec<TestStepDescriptor> {
    resolved
        .iter()
        .flat_map(|version| match mode {
            TestMode::UnitAndIntegration => unit_and_integration_steps(version, command),
            TestMode::EndToEnd => vec![end_to_end_step(version, selection, command)],
        })
        .collect()
}

/// The unit step and the integration step for one version.
pub fn unit_and_integration_steps(
    version: &ResolvedVersion,
    command: &str,
) -> Vec<TestStepDescriptor> {
    let snapshot = version.snapshot.to_string();
    let base_env = || {
        BTreeMap::from([
            ("SNAPSHOT".to_string(), snapshot.clone()),
            ("ELASTIC_STACK_VERSION".to_string(), version.version.clone()),
        ])
    };

    let mut unit_env = base_env();
    unit_env.insert("INTEGRATION".to_string(), "false".to_string());

    let mut integration_env = base_env();
    integration_env.insert("INTEGRATION".to_string(), "true".to_string());
    integration_env.insert("SECURE_INTEGRATION".to_string(), "true".to_string());
    integration_env.insert("LOG_LEVEL".to_string(), "info".to_string());

    vec![
        TestStepDescriptor {
            label: format!("Unit test for {}, snapshot: {}", version.version, snapshot),
            command: command.to_string(),
            env: unit_env,
        },
        TestStepDescriptor {
            label: format!(
                "Integration test for {}, snapshot: {}",
                version.version, snapshot
            ),
            command: command.to_string(),
            env: integration_env,
        },
    ]
}

/// The E2E step for one version. Scheduled runs also pin `TARGET_BRANCH`.
pub fn end_to_end_step(
    version: &ResolvedVersion,
    selection: &SelectionMode,
    command: &str,
) -> TestStepDescriptor {
    let snapshot = version.snapshot.to_string();
    let mut env = BTreeMap::from([
        ("SNAPSHOT".to_string(), snapshot.clone()),
        ("ELASTIC_STACK_VERSION".to_string(), version.version.clone()),
        ("ELASTICSEARCH_TREEISH".to_string(), version.track.clone()),
    ]);
    if *selection == SelectionMode::AllTracks {
        env.insert("TARGET_BRANCH".to_string(), version.track.clone());
    }

    TestStepDescriptor {
        label: format!("E2E tests for {}, snapshot: {}", version.version, snapshot),
        command: command.to_string(),
        env,
    }
}

/// Machine sizing for the CI agents that run the generated steps.
/// 运行生成步骤的 CI 代理的机器规格。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agents {
    pub provider: String,
    pub machine_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_project: Option<String>,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepGroup {
    pub group: String,
    pub key: String,
    pub steps: Vec<TestStepDescriptor>,
}

/// The generated pipeline: agents plus exactly one group of steps.
/// 生成的流水线：代理配置加上恰好一个步骤组。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDocument {
    pub agents: Agents,
    pub steps: Vec<StepGroup>,
}

impl PipelineDocument {
    pub fn new(agents: Agents, group: StepGroup) -> Self {
        Self {
            agents,
            steps: vec![group],
        }
    }

    /// All test steps of the document's group.
    pub fn test_steps(&self) -> &[TestStepDescriptor] {
        self.steps
            .first()
            .map(|group| group.steps.as_slice())
            .unwrap_or_default()
    }
}

/// Why a package failed during the E2E run.
/// 包在 E2E 运行中失败的原因。
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum FailureReason {
    /// The stats endpoint could not be read or did not list the plugin.
    /// 无法读取统计端点，或其中未列出插件。
    Stats,
    /// The plugin did not process the package's events as expected.
    /// 插件没有按预期处理该包的事件。
    Throughput,
    /// The system test could not be started at all.
    /// 系统测试根本无法启动。
    Command,
}

/// The outcome of testing one integration package.
/// 测试一个集成包的结果。
#[derive(Debug, Clone)]
pub enum PackageResult {
    Passed {
        package: String,
        events: EventDelta,
        /// Throughput anomalies tolerated because the system test itself passed.
        warnings: Vec<String>,
        duration: Duration,
    },
    Failed {
        package: String,
        output: String,
        reason: FailureReason,
        duration: Duration,
    },
}

impl PackageResult {
    pub fn package(&self) -> &str {
        match self {
            PackageResult::Passed { package, .. } => package,
            PackageResult::Failed { package, .. } => package,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, PackageResult::Failed { .. })
    }

    pub fn duration(&self) -> Duration {
        match self {
            PackageResult::Passed { duration, .. } => *duration,
            PackageResult::Failed { duration, .. } => *duration,
        }
    }

    /// Gets the status of the result as a localized string for display.
    /// 以本地化字符串形式获取结果状态以供显示。
    pub fn status_str(&self, locale: &str) -> String {
        match self {
            PackageResult::Passed { warnings, .. } if !warnings.is_empty() => {
                t!("report.status_warned", locale = locale).to_string()
            }
            PackageResult::Passed { .. } => t!("report.status_passed", locale = locale).to_string(),
            PackageResult::Failed { .. } => t!("report.status_failed", locale = locale).to_string(),
        }
    }
}

impl fmt::Display for PackageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageResult::Passed { package, events, .. } => {
                write!(f, "{package}: passed ({events})")
            }
            PackageResult::Failed {
                package, reason, ..
            } => write!(f, "{package}: failed ({reason:?})"),
        }
    }
}
