use anyhow::{Context, Result};
use colored::Colorize;
use oneview_compiler::{BuildOptions, BuildPipeline, BuildReport, CompileOptions, WatchTick};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{base_dir, OneviewConfig};
use crate::ui;

#[derive(Debug, Clone, Copy, Default)]
pub struct CompileArgs {
    pub watch: bool,
    pub force: bool,
    pub minify: bool,
    pub sourcemap: bool,
}

/// Compile one context (or all of them), then optionally keep watching.
///
/// Per-file failures are reported but never make the command fail; only
/// driver-level problems (configuration, unknown context) do.
pub fn compile(
    config_path: &str,
    context: Option<&str>,
    args: CompileArgs,
    json: bool,
) -> Result<()> {
    let path = Path::new(config_path);
    let config = OneviewConfig::load(path)
        .context("Failed to load configuration. Run `ov init` to create a configuration file.")?;
    let names = select_contexts(&config, context)?;

    let options = BuildOptions::default()
        .with_force(args.force)
        .with_suffix(config.compiler.suffix.clone())
        .with_compile_options(
            CompileOptions::default()
                .with_minify(args.minify)
                .with_source_map(args.sourcemap),
        );
    let pipeline = BuildPipeline::new(config.context_specs(&base_dir(path)), options);
    let names: Vec<&str> = names.iter().map(String::as_str).collect();

    if args.watch {
        return watch(&pipeline, &names, config.watch_interval(), json);
    }

    let spinner = (!json).then(|| ui::create_spinner("Compiling views..."));
    let report = pipeline.build(&names);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// `None` and `all` select every configured context.
fn select_contexts(config: &OneviewConfig, context: Option<&str>) -> Result<Vec<String>> {
    match context {
        None | Some("all") => Ok(config.context_names().map(str::to_string).collect()),
        Some(name) if config.contexts.contains_key(name) => Ok(vec![name.to_string()]),
        Some(name) => {
            let available: Vec<&str> = config.context_names().collect();
            anyhow::bail!(
                "Unknown context '{}'. Available contexts: {}",
                name,
                available.join(", ")
            )
        }
    }
}

fn print_report(report: &BuildReport) {
    for context in &report.contexts {
        let line = format!(
            "{}: {}",
            context.context.bold(),
            ui::format_counts(context.compiled, context.skipped, context.errors.len())
        );
        if context.is_success() {
            ui::print_success(&line);
        } else {
            ui::print_warning(&line);
        }

        for error in &context.errors {
            ui::print_error(&format!("{}: {}", error.path.display(), error.message));
        }
        if let Some(cleanup) = &context.cleanup {
            ui::print_info(&format!(
                "cleaned {} file(s), {} empty dir(s)",
                cleanup.files_removed, cleanup.dirs_removed
            ));
        }
        if let Some(registry) = &context.registry {
            ui::print_info(&format!("registry: {}", registry.display()));
        }
    }

    println!();
    println!(
        "{} ({}) in {}",
        "Done".bold(),
        ui::format_counts(report.compiled(), report.skipped(), report.error_count()),
        ui::format_elapsed(report.elapsed_ms)
    );
}

fn watch(pipeline: &BuildPipeline, names: &[&str], interval: Duration, json: bool) -> Result<()> {
    let cancel = Arc::new(AtomicBool::new(false));
    install_signal_handlers(&cancel)?;

    if !json {
        ui::print_step(&format!(
            "Watching {} every {} (Ctrl-C to stop)",
            names.join(", ").bold(),
            ui::format_elapsed(interval.as_millis() as u64)
        ));
    }

    pipeline.watch(names, interval, &cancel, |tick| {
        if tick.is_idle() {
            return;
        }
        if json {
            match serde_json::to_string(tick) {
                Ok(line) => println!("{line}"),
                Err(err) => tracing::warn!(error = %err, "cannot serialize watch tick"),
            }
        } else {
            print_tick(tick);
        }
    });

    if !json {
        ui::print_info("Stopped watching");
    }
    Ok(())
}

/// SIGINT and SIGTERM set `cancel`; the watch loop stops at its next tick.
#[cfg(unix)]
fn install_signal_handlers(cancel: &Arc<AtomicBool>) -> Result<()> {
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(cancel))
            .context("Failed to install signal handler")?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn install_signal_handlers(_cancel: &Arc<AtomicBool>) -> Result<()> {
    Ok(())
}

fn print_tick(tick: &WatchTick) {
    let stamp = format!("[{}]", ui::timestamp_now()).dimmed();
    for path in &tick.compiled {
        println!("{} {} {}", stamp, ui::symbols::ACTIVE.green(), path.display());
    }
    for error in &tick.errors {
        println!(
            "{} {} {}: {}",
            stamp,
            ui::symbols::FAILURE.red().bold(),
            error.path.display(),
            error.message
        );
    }
    for registry in &tick.registries {
        println!("{} {}", stamp, format!("registry: {}", registry.display()).dimmed());
    }
    if tick.removed > 0 {
        println!("{} {}", stamp, format!("{} view(s) removed", tick.removed).dimmed());
    }
}
