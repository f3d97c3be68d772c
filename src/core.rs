//! # Core Module / 核心模块
//!
//! This module contains the core functionality of the stack matrix tool:
//! manifest parsing, version resolution, step expansion, configuration,
//! node stats analysis and the E2E bootstrap.
//!
//! 此模块包含本工具的核心功能：
//! 清单解析、版本解析、步骤展开、配置、节点统计分析以及 E2E 引导。

pub mod config;
pub mod e2e;
pub mod manifest;
pub mod models;
pub mod resolver;
pub mod stats;

// Re-exports
pub use manifest::ReleaseManifest;
pub use models::{PipelineDocument, TestStepDescriptor};
pub use resolver::{resolve, ResolvedVersion, SelectionMode};
