mod cli;
mod error_fmt;
mod report;
mod sim;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::{Result, WrapErr};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn load_config(path: Option<&Path>) -> Result<els_config::Config> {
    let Some(path) = path else {
        return Ok(els_config::Config::default());
    };
    let text =
        std::fs::read_to_string(path).wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = els_config::load_toml(&text).wrap_err("parse config")?;
    cfg.validate()?;
    Ok(cfg)
}

fn init_tracing(json: bool, level: &str, logging: &els_config::Logging) {
    use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };

    // Optional JSON-lines file sink
    let file = logging.file.as_deref().map(|file| {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "els.log".into(), |n| n.to_os_string());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_level = logging.level.as_deref().unwrap_or("info");
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(EnvFilter::new(file_level))
            .boxed()
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let _ = color_eyre::install();
    let cfg = load_config(cli.config.as_deref())?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || {
            flag.store(true, Ordering::Relaxed);
        }) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    let catalog = sim::load_catalog(&cfg, cli.pitches.as_deref())?;
    let json = cli.json;

    match cli.cmd {
        Commands::Simulate {
            feed,
            rpm,
            revs,
            reverse,
            toward,
            follow,
        } => {
            let selection = sim::select_feed(&cfg, &catalog, &feed)?;
            let rig = sim::build_rig(&cfg, catalog, selection)?;
            let params = sim::SimulateParams {
                rpm,
                revs,
                reverse,
                toward: toward.into(),
                follow: follow.then(|| Duration::from_millis(cfg.status.refresh_ms)),
            };
            let outcome = sim::run_simulate(&rig, &params, &shutdown, |s| {
                report::print_status(s, json)
            })?;
            report::print_report("simulate", &outcome, json);
        }
        Commands::Table { feed, entries } => {
            let selection = sim::select_feed(&cfg, &catalog, &feed)?;
            let table = sim::table_for(&cfg, selection)?;
            report::print_table(&table, entries, json);
        }
        Commands::Feeds { mode } => {
            report::print_feeds(
                &catalog,
                mode.map(Into::into),
                |sel| sim::table_for(&cfg, sel),
                json,
            );
        }
        Commands::Jog { side, hold_ms } => {
            let selection = sim::select_feed(&cfg, &catalog, &cli::FeedArgs::default())?;
            let rig = sim::build_rig(&cfg, catalog, selection)?;
            let outcome = sim::run_jog(&rig, side.into(), Duration::from_millis(hold_ms))?;
            report::print_report("jog", &outcome, json);
        }
        Commands::SelfCheck => {
            let lines = sim::self_check(&cfg, &catalog)?;
            if json {
                println!("{}", serde_json::json!({ "ok": true, "checks": lines }));
            } else {
                for l in &lines {
                    println!("{l}");
                }
                println!("self-check ok");
            }
        }
    }
    Ok(())
}
