use anyhow::{Context, Result};
use colored::Colorize;

use crate::config::OneviewConfig;
use crate::ui;

pub fn validate(config_path: &str, json: bool) -> Result<()> {
    if !json {
        ui::print_step("Validating configuration...");
    }

    let config = OneviewConfig::load(config_path)
        .context("Failed to load configuration. Run `ov init` to create a configuration file.")?;

    if json {
        let summary = serde_json::json!({
            "valid": true,
            "project": config.project.name,
            "compiler": config.compiler,
            "contexts": config.contexts,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    ui::print_success("Configuration is valid!");
    println!();
    println!("  Project: {}", config.project.name.bold());
    println!("  Suffix: {}", config.compiler.suffix);
    println!("  Watch interval: {}ms", config.compiler.watch_interval_ms);
    println!();

    println!("  {} Contexts ({}):", "•".dimmed(), config.contexts.len());
    for (name, context) in &config.contexts {
        println!(
            "    {} {} -> {}",
            "•".dimmed(),
            name.bold(),
            context.output.display()
        );
        for root in &context.views {
            println!("        {}", root.display().to_string().dimmed());
        }
    }

    Ok(())
}
