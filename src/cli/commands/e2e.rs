//! # E2E Command Module / E2E 命令模块
//!
//! Implements `stack-matrix e2e`: bootstrap the stack, test each integration
//! package, print the Logstash logs and always tear the stack down.
//!
//! 实现 `stack-matrix e2e`：引导技术栈，测试每个集成包，
//! 打印 Logstash 日志，并始终关闭技术栈。

use anyhow::{anyhow, Result};
use colored::*;
use std::path::{Path, PathBuf};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::{AppConfig, E2eSettings},
        e2e::{Bootstrap, BootstrapError, PackageTester, ProjectType},
        models::PackageResult,
        stats::EventCounters,
    },
    infra::{command::Step, t},
    reporting::{print_container_logs, print_failure_details, print_summary},
};

#[derive(Debug, Clone)]
pub struct E2eArgs {
    pub stack_version: Option<String>,
    pub project_type: String,
    pub skip_setup: bool,
    /// Packages to test; the configured defaults when empty.
    pub integrations: Vec<String>,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: E2eArgs, locale: &str) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref())?;
    let stack_version = args
        .stack_version
        .filter(|v| !v.trim().is_empty())
        .ok_or(BootstrapError::MissingStackVersion)?;
    let project_type: ProjectType = args.project_type.parse()?;
    let packages = if args.integrations.is_empty() {
        config.e2e.packages.clone()
    } else {
        args.integrations
    };

    println!(
        "{}",
        t!(
            "e2e.starting",
            locale = locale,
            version = &stack_version,
            time = chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )
        .bold()
    );
    tracing::info!(skip_setup = args.skip_setup, ?packages, "e2e run options");

    let work_dir = std::env::current_dir()?;
    let stop_token = setup_signal_handler(locale);
    let mut bootstrap = Bootstrap::new(
        &stack_version,
        project_type,
        &work_dir,
        config.e2e.clone(),
        config.retry.policy(),
    )?;

    let outcome = tokio::select! {
        biased;
        _ = stop_token.cancelled() => Err(anyhow!(t!("e2e.cancelled", locale = locale).to_string())),
        res = run_suite(&mut bootstrap, &work_dir, &packages, args.skip_setup, &config.e2e) => res,
    };

    if bootstrap.stack_requested() {
        show_container_logs(&[config.e2e.container.as_str()]).await;
        if let Err(e) = bootstrap.stop_elastic_stack().await {
            if outcome.is_ok() {
                return Err(e);
            }
            tracing::error!("{e:#}");
        }
    }

    let results = outcome?;
    print_summary(&results, locale);

    let failures: Vec<_> = results.iter().filter(|r| r.is_failure()).collect();
    if failures.is_empty() {
        println!("\n{}", t!("e2e.all_packages_passed", locale = locale).green().bold());
        return Ok(());
    }
    print_failure_details(&failures, locale);
    let names = failures.iter().map(|r| r.package().to_string()).collect();
    Err(BootstrapError::PackagesFailed(names).into())
}

async fn run_suite(
    bootstrap: &mut Bootstrap,
    work_dir: &Path,
    packages: &[String],
    skip_setup: bool,
    settings: &E2eSettings,
) -> Result<Vec<PackageResult>> {
    bootstrap.run_elastic_stack(skip_setup).await?;

    let tester = PackageTester::new(work_dir, bootstrap.stats(), settings);
    let mut baseline = EventCounters::default();
    let mut results = Vec::with_capacity(packages.len());
    for package in packages {
        let (result, next_baseline) = tester.test(package, baseline).await;
        if result.is_failure() {
            println!("{}", t!("e2e.package_failed", package = package).red());
        }
        baseline = next_baseline;
        results.push(result);
    }
    Ok(results)
}

/// Prints the logs of every container whose name contains one of `prefixes`.
async fn try_show_container_logs(prefixes: &[&str]) -> Result<()> {
    let listing = Step::new(
        "docker",
        ["ps", "-a", "--format", "{{.Names}}"],
        "Failed to list containers",
    )
    .run()
    .await?;
    let names: Vec<&str> = listing.lines().map(str::trim).filter(|n| !n.is_empty()).collect();
    tracing::debug!(?names, "available containers");

    let matching: Vec<&str> = names
        .into_iter()
        .filter(|name| prefixes.iter().any(|prefix| name.contains(prefix)))
        .collect();
    if matching.is_empty() {
        println!("{}", t!("e2e.no_containers", prefixes = prefixes.join(", ")).yellow());
        return Ok(());
    }

    for name in matching {
        let logs = Step::new("docker", ["logs", name], format!("Failed to read logs of {name}"))
            .output()
            .await?;
        print_container_logs(name, &logs.output);
    }
    Ok(())
}

async fn show_container_logs(prefixes: &[&str]) {
    if let Err(e) = try_show_container_logs(prefixes).await {
        tracing::warn!("{e:#}");
    }
}

fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            println!("\n{}", t!("shutdown_signal", locale = &locale).yellow());
            token_clone.cancel();
        }
    });

    token
}
