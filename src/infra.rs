//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for the stack matrix tool,
//! including HTTP fetches, command execution, file system chores, logging
//! and i18n support.
//!
//! 此模块为本工具提供基础设施服务，
//! 包括 HTTP 请求、命令执行、文件系统操作、日志和国际化支持。

pub mod command;
pub mod fs;
pub mod http;
pub mod logging;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
