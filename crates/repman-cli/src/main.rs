// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use repman_app::{ArtifactResolver, ReportRenderer};
use repman_db::Store;
use runtime::{CatalogRuntime, CommandRenderer, JsonRenderer, parse_assignment};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `repman --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;
    init_tracing(&config.log_level());

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or REPMAN_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    if options.demo {
        store.seed_demo_data()?;
    }

    let reports_dir = config.reports_dir()?;
    let resolver = ArtifactResolver::new(&reports_dir, config.extension());
    let wait = config.viewer_wait()?;
    if options.check_only {
        info!(
            db = %db_path.display(),
            reports = %reports_dir.display(),
            "configuration and database look usable"
        );
        return Ok(());
    }

    let runtime = CatalogRuntime::new(&store);
    match &options.action {
        None => println!("{}", runtime.summary_line()?),
        Some(Action::ListDepartments) => print_lines(runtime.department_lines()?),
        Some(Action::ListReports(department)) => print_lines(runtime.report_lines(department)?),
        Some(Action::Describe(report)) => print_lines(runtime.describe(report)?),
        Some(Action::Generate(report)) => {
            let renderer: Arc<dyn ReportRenderer> = match config.viewer_command() {
                Some(command) => Arc::new(CommandRenderer::new(command)),
                None => Arc::new(JsonRenderer),
            };
            let job = runtime.generate(report, &options.assignments, resolver, renderer, wait)?;
            info!(job, report_code = %report, "report generated");
        }
    }
    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    ListDepartments,
    ListReports(String),
    Describe(String),
    Generate(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    action: Option<Action>,
    assignments: Vec<(String, String)>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
        action: None,
        assignments: Vec::new(),
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let action = match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
                None
            }
            "--print-config-path" => {
                options.print_config_path = true;
                None
            }
            "--print-path" => {
                options.print_db_path = true;
                None
            }
            "--print-example-config" => {
                options.print_example = true;
                None
            }
            "--demo" => {
                options.demo = true;
                None
            }
            "--check" => {
                options.check_only = true;
                None
            }
            "--help" | "-h" => {
                options.show_help = true;
                None
            }
            "--list-departments" => Some(Action::ListDepartments),
            "--list-reports" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--list-reports requires a department code"))?;
                Some(Action::ListReports(value.as_ref().to_owned()))
            }
            "--describe" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--describe requires a report code"))?;
                Some(Action::Describe(value.as_ref().to_owned()))
            }
            "--generate" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--generate requires a report code"))?;
                Some(Action::Generate(value.as_ref().to_owned()))
            }
            "--set" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--set requires ID=VALUE"))?;
                options.assignments.push(parse_assignment(value.as_ref())?);
                None
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        };

        if let Some(action) = action {
            if options.action.is_some() {
                bail!(
                    "only one of --list-departments, --list-reports, --describe, --generate may be given"
                );
            }
            options.action = Some(action);
        }
    }

    if !options.assignments.is_empty() && !matches!(options.action, Some(Action::Generate(_))) {
        bail!("--set only applies together with --generate <report>");
    }

    Ok(options)
}

fn print_help() {
    println!("repman");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Use seeded demo data (in-memory)");
    println!("  --check                  Validate config + DB and exit");
    println!("  --list-departments       List department codes and names");
    println!("  --list-reports <dept>    List the reports of one department");
    println!("  --describe <report>      List a report's active parameters");
    println!("  --generate <report>      Fill, validate and open a report");
    println!("  --set <ID=VALUE>         Parameter value for --generate (repeatable)");
    println!("  --help                   Show this help");
}
