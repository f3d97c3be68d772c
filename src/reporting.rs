//! # Reporting Module / 报告模块
//!
//! This module emits the generated pipeline document and prints the E2E
//! run's console summary with internationalization support.
//!
//! 此模块输出生成的流水线文档，并打印支持国际化的 E2E 运行控制台摘要。

pub mod console;
pub mod pipeline;

// Re-export common reporting functions
pub use console::{print_container_logs, print_failure_details, print_summary};
pub use pipeline::{render_pipeline, write_pipeline};
