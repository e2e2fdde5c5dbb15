mod cli;
mod config;
mod paths;
mod ui;

use anyhow::{Result, bail};
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use cli::Cli;
use config::RuninConfig;
use fanout::{
    CancelToken, Engine, ExecutionReport, GitProbe, OutputSink, ProcessRunner, Resolver,
    filter_dirty, install_interrupt_handler,
};

/// Exit status for a batch abandoned by Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "runin", &mut io::stdout());
        return Ok(ExitCode::SUCCESS);
    }

    if cli.no_color {
        colored::control::set_override(false);
    }

    let saw_separator = std::env::args_os().any(|arg| arg == "--");
    let command = cli.command_line(saw_separator)?;
    let options = cli.run_options();

    let cancel = CancelToken::new();
    if let Err(e) = install_interrupt_handler(&cancel) {
        log::warn!("Ctrl-C will not stop the batch cleanly: {e}");
    }

    let explicit = cli.config.as_ref().map(|p| paths::expand(&p.to_string_lossy()));
    let config = RuninConfig::discover(explicit.as_deref());

    let resolution = Resolver::new(&config.groups).resolve_detailed(&cli.targets);
    for warning in &resolution.warnings {
        log::info!("{warning}");
    }
    let mut dirs = resolution.dirs;
    if dirs.is_empty() {
        bail!("no directories matched");
    }

    if cli.dirty {
        dirs = filter_dirty(&dirs, &GitProbe::default());
        if dirs.is_empty() {
            ui::nothing_dirty();
            return Ok(ExitCode::SUCCESS);
        }
    }

    ui::running(dirs.len(), &options);

    let runner = ProcessRunner::new(options.clone(), Arc::new(OutputSink::stdio()));
    let engine = Engine::new(&options, runner);

    let started = Instant::now();
    let report = engine.execute(&cancel, &dirs, &command)?;
    let elapsed = started.elapsed();

    if report.cancelled {
        ui::cancelled();
    }
    ui::summary(elapsed, &report, options.quiet);
    ui::failures(&report);

    Ok(ExitCode::from(exit_code(&report)))
}

/// 1 if anything failed, 130 if Ctrl-C abandoned jobs, otherwise 0
fn exit_code(report: &ExecutionReport) -> u8 {
    if !report.failed.is_empty() {
        1
    } else if report.cancelled && !report.skipped.is_empty() {
        EXIT_INTERRUPTED
    } else {
        0
    }
}
