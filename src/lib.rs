//! # Stack Matrix Library / Stack Matrix 库
//!
//! This library provides the core functionality for the Stack Matrix tool,
//! which turns a Logstash release manifest into a Buildkite test matrix and
//! drives the end-to-end integration suite.
//!
//! 此库为 Stack Matrix 工具提供核心功能，
//! 它将 Logstash 发布清单转换为 Buildkite 测试矩阵，并驱动端到端集成测试。
//!
//! ## Modules / 模块
//!
//! - `core` - Manifest model, version resolution, step expansion and the E2E driver
//! - `infra` - Infrastructure services like HTTP, command execution and file system operations
//! - `reporting` - Pipeline rendering and console summaries
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 清单模型、版本解析、步骤展开和 E2E 驱动
//! - `infra` - 基础设施服务，如 HTTP、命令执行和文件系统操作
//! - `reporting` - 流水线渲染和控制台摘要
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use crate::core::config;
pub use crate::core::models;

/// Detects the language to use from the system locale.
///
/// It attempts to match the full locale (e.g., "zh-CN"), then just the
/// language code (e.g., "en"), and finally falls back to "en".
pub fn detect_language() -> String {
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    let available_locales = rust_i18n::available_locales!();

    if available_locales.contains(&locale.as_str()) {
        return locale;
    }
    locale
        .split('-')
        .next()
        .filter(|lang_code| available_locales.contains(lang_code))
        .unwrap_or("en")
        .to_string()
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
