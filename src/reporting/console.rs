//! # Console Reporting Module / 控制台报告模块
//!
//! Prints the E2E package summary and container logs with colors and
//! localized labels.
//!
//! 以彩色和本地化标签打印 E2E 包摘要和容器日志。

use colored::*;
use crate::core::models::PackageResult;
use crate::infra::t;

/// Prints a formatted summary of package results to the console.
///
/// 在控制台打印格式化的包测试结果摘要。
///
/// # Output Format / 输出格式
/// ```text
/// --- E2E Summary ---
///   - Passed           | apache                         |     12.30s  in: 40, out: 40
///   - Passed (warned)  | nginx                          |      8.10s  in: 10, out: 9
///   - Failed           | tomcat                         |      5.02s
/// ```
pub fn print_summary(results: &[PackageResult], locale: &str) {
    println!("\n{}", t!("report.summary_banner", locale = locale).bold());

    for result in results {
        let status_str = result.status_str(locale);
        let status_colored = match result {
            PackageResult::Passed { warnings, .. } if !warnings.is_empty() => status_str.yellow(),
            PackageResult::Passed { .. } => status_str.green(),
            PackageResult::Failed { .. } => status_str.red(),
        };
        let events = match result {
            PackageResult::Passed { events, .. } => events.to_string(),
            PackageResult::Failed { .. } => String::new(),
        };

        println!(
            "  - {:<18} | {:<30} | {:>10.2?}  {}",
            status_colored,
            result.package(),
            result.duration(),
            events
        );
    }
}

/// Prints the output of every failed package, numbered.
/// 按编号打印每个失败包的输出。
pub fn print_failure_details(failures: &[&PackageResult], locale: &str) {
    if failures.is_empty() {
        return;
    }

    println!("\n{}", t!("report.failure_banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));

    for (i, result) in failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}'",
            i + 1,
            failures.len(),
            t!("report.header_failure", locale = locale).red(),
            result.package().cyan()
        );

        if let PackageResult::Failed { output, reason, .. } = result {
            println!("\n--- {:?} ---\n", reason);
            println!("{output}");
            println!("\n{}", "-".repeat(80));
        }
    }
}

/// Prints one container's logs between separators, indented.
pub fn print_container_logs(container: &str, logs: &str) {
    let separator = "=".repeat(80);
    println!("\n{separator}");
    println!("{} {}", t!("report.container").bold(), container.cyan());
    println!("{separator}");
    for line in logs.lines() {
        println!("  {line}");
    }
    println!("{separator}\n");
}
