// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod watch;

use std::future::Future;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{fatal_channel, Watcher, WatcherHandle};
use crate::exec::run_init_commands;
use crate::watch::{WatchSpec, WatchStrategy};

/// Host-level switches that are not part of the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostOptions {
    /// Force `debug = true` on every watcher.
    pub force_debug: bool,
    pub strategy: WatchStrategy,
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - init commands
/// - one watcher per `[[watchers]]` entry
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg, args.debug)?;
        return Ok(());
    }

    let options = HostOptions {
        force_debug: args.debug,
        strategy: args.strategy(),
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Ctrl+C received, shutting down");
    };

    run_config(&cfg, options, shutdown).await?;
    Ok(())
}

/// Run an already validated config until a watcher reports a fatal error or
/// `shutdown` completes.
///
/// Returns the first fatal error. Every run process is stopped before this
/// returns, in both cases.
pub async fn run_config<F>(cfg: &ConfigFile, options: HostOptions, shutdown: F) -> errors::Result<()>
where
    F: Future<Output = ()>,
{
    let specs = cfg
        .watchers
        .iter()
        .map(|w| WatchSpec::from_config(w, options.force_debug))
        .collect::<errors::Result<Vec<_>>>()?;

    run_init_commands(&cfg.init_commands).await?;

    let (fatal_tx, mut fatal_rx) = fatal_channel();

    // Construction is sequential so build output of different watchers does
    // not interleave at startup.
    let mut watchers = Vec::with_capacity(specs.len());
    for spec in specs {
        watchers.push(Watcher::new(spec, options.strategy, fatal_tx.clone()).await?);
    }

    let handles: Vec<WatcherHandle> = watchers.into_iter().map(Watcher::spawn).collect();
    info!(watchers = handles.len(), "watching for changes");

    let outcome = tokio::select! {
        Some(err) = fatal_rx.recv() => Err(err),
        () = shutdown => Ok(()),
    };

    if let Err(err) = &outcome {
        debug!(error = %err, fatal = err.is_fatal(), "stopping after fatal error");
    }

    for handle in handles {
        handle.shutdown().await;
    }

    outcome
}

/// Simple dry-run output: print every watcher with its defaults applied.
fn print_dry_run(cfg: &ConfigFile, force_debug: bool) -> errors::Result<()> {
    println!("observer dry-run");
    println!();

    if !cfg.init_commands.is_empty() {
        println!("init_commands ({}):", cfg.init_commands.len());
        for cmd in &cfg.init_commands {
            println!("  - {cmd}");
        }
        println!();
    }

    println!("watchers ({}):", cfg.watchers.len());
    for watcher in &cfg.watchers {
        let spec = WatchSpec::from_config(watcher, force_debug)?;
        println!("  - {}", spec.label);
        println!("      build_command: {}", spec.build_command);
        if let Some(ref run) = spec.run_command {
            println!("      run_command: {run}");
        }
        if !spec.extensions.is_empty() {
            println!("      extensions: {:?}", spec.extensions);
        }
        println!("      include_dirs: {:?}", spec.include_dirs);
        if !spec.ignore_dirs.is_empty() {
            println!("      ignore_dirs: {:?}", spec.ignore_dirs);
        }
        if !spec.include_patterns.is_empty() {
            let patterns: Vec<&str> = spec.include_patterns.iter().map(|r| r.as_str()).collect();
            println!("      include_patterns: {patterns:?}");
        }
        if !spec.ignore_patterns.is_empty() {
            let patterns: Vec<&str> = spec.ignore_patterns.iter().map(|r| r.as_str()).collect();
            println!("      ignore_patterns: {patterns:?}");
        }
        println!("      rebuild_delay: {}ms", spec.rebuild_delay.as_millis());
        if spec.debug {
            println!("      debug: true");
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
