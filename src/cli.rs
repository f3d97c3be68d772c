// src/cli.rs
use anyhow::Result;
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use std::{env, path::PathBuf};

use crate::core::config::{AppConfig, CiEnvironment, PipelineKind};
use crate::infra::{logging, t};

pub mod commands;

use commands::e2e::E2eArgs;
use commands::generate::{GenerateArgs, ManifestSource};

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` argument.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    let pos = args.iter().position(|arg| arg == "--lang")?;
    args.get(pos + 1).cloned()
}

fn config_arg(locale: &str) -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help(t!("arg_config", locale = locale).to_string())
        .value_name("CONFIG")
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

pub fn build_cli(locale: &str) -> Command {
    Command::new("stack-matrix")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli_about", locale = locale).to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help(t!("arg_verbose", locale = locale).to_string())
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("generate")
                .about(t!("cmd_generate_about", locale = locale).to_string())
                .arg(
                    Arg::new("pipeline")
                        .short('p')
                        .long("pipeline")
                        .help(t!("arg_pipeline", locale = locale).to_string())
                        .value_name("PIPELINE")
                        .value_parser(PipelineKind::NAMES)
                        .required(true)
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("target-branch")
                        .long("target-branch")
                        .help(t!("arg_target_branch", locale = locale).to_string())
                        .value_name("BRANCH")
                        .env("TARGET_BRANCH")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("pr-target-branch")
                        .long("pr-target-branch")
                        .help(t!("arg_pr_target_branch", locale = locale).to_string())
                        .value_name("BRANCH")
                        .env("GITHUB_PR_TARGET_BRANCH")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("manual-target-branch")
                        .long("manual-target-branch")
                        .help(t!("arg_manual_target_branch", locale = locale).to_string())
                        .value_name("BRANCH")
                        .env("MANUAL_TARGET_BRANCH")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("source")
                        .long("source")
                        .help(t!("arg_source", locale = locale).to_string())
                        .value_name("SOURCE")
                        .env("BUILDKITE_SOURCE")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("branch")
                        .long("branch")
                        .help(t!("arg_branch", locale = locale).to_string())
                        .value_name("BRANCH")
                        .env("BUILDKITE_BRANCH")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("manifest-url")
                        .long("manifest-url")
                        .help(t!("arg_manifest_url", locale = locale).to_string())
                        .value_name("URL")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("manifest-file")
                        .long("manifest-file")
                        .help(t!("arg_manifest_file", locale = locale).to_string())
                        .value_name("PATH")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .group(ArgGroup::new("manifest").args(["manifest-url", "manifest-file"]))
                .arg(config_arg(locale)),
        )
        .subcommand(
            Command::new("e2e")
                .about(t!("cmd_e2e_about", locale = locale).to_string())
                .arg(
                    Arg::new("skip-setup")
                        .long("skip-setup")
                        .help(t!("arg_skip_setup", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("integrations")
                        .long("integrations")
                        .help(t!("arg_integrations", locale = locale).to_string())
                        .value_name("PACKAGES")
                        .value_delimiter(',')
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("stack-version")
                        .long("stack-version")
                        .help(t!("arg_stack_version", locale = locale).to_string())
                        .value_name("VERSION")
                        .env("ELASTIC_STACK_VERSION")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("project-type")
                        .long("project-type")
                        .help(t!("arg_project_type", locale = locale).to_string())
                        .value_name("TYPE")
                        .env("E2E_PROJECT_TYPE")
                        .default_value("on_prems")
                        .action(ArgAction::Set),
                )
                .arg(config_arg(locale)),
        )
}

fn string_arg(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.get_one::<String>(id).cloned()
}

fn generate_args(matches: &ArgMatches) -> Result<GenerateArgs> {
    let pipeline: PipelineKind = matches
        .get_one::<String>("pipeline")
        .map(String::as_str)
        .unwrap_or_default()
        .parse()?;
    let target_branch = match pipeline {
        PipelineKind::PullRequest => string_arg(matches, "pr-target-branch"),
        PipelineKind::Build | PipelineKind::EndToEnd => string_arg(matches, "target-branch"),
    };
    let manifest = string_arg(matches, "manifest-url")
        .map(ManifestSource::Url)
        .or_else(|| {
            matches
                .get_one::<PathBuf>("manifest-file")
                .cloned()
                .map(ManifestSource::File)
        });

    Ok(GenerateArgs {
        pipeline,
        ci: CiEnvironment {
            target_branch,
            manual_target_branch: string_arg(matches, "manual-target-branch"),
            source: string_arg(matches, "source"),
            branch: string_arg(matches, "branch"),
        },
        manifest,
        config: matches.get_one::<PathBuf>("config").cloned(),
    })
}

fn e2e_args(matches: &ArgMatches) -> E2eArgs {
    E2eArgs {
        stack_version: string_arg(matches, "stack-version"),
        project_type: string_arg(matches, "project-type").unwrap_or_else(|| "on_prems".to_string()),
        skip_setup: matches.get_flag("skip-setup"),
        integrations: matches
            .get_many::<String>("integrations")
            .map(|values| values.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).collect())
            .unwrap_or_default(),
        config: matches.get_one::<PathBuf>("config").cloned(),
    }
}

/// Picks the message language: `--lang`, then the config file, then the system locale.
fn resolve_language(flag: Option<String>, config: Option<&PathBuf>) -> String {
    flag.or_else(|| {
        AppConfig::load(config.map(PathBuf::as_path))
            .ok()
            .and_then(|config| config.language)
    })
    .unwrap_or_else(crate::detect_language)
}

pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let early_language = pre_parse_language().unwrap_or_else(crate::detect_language);
    rust_i18n::set_locale(&early_language);

    let matches = build_cli(&early_language).get_matches();
    logging::init(matches.get_flag("verbose"));

    let (name, sub_matches) = matches
        .subcommand()
        .ok_or_else(|| anyhow::anyhow!("no subcommand given"))?;
    let language = resolve_language(
        sub_matches.get_one::<String>("lang").cloned(),
        sub_matches.get_one::<PathBuf>("config"),
    );
    rust_i18n::set_locale(&language);

    match name {
        "generate" => commands::generate::execute(generate_args(sub_matches)?).await,
        "e2e" => commands::e2e::execute(e2e_args(sub_matches), &language).await,
        other => anyhow::bail!("unknown subcommand `{other}`"),
    }
}
