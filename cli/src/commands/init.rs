use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::config::{base_dir, discover_view_roots, starter_config, DEFAULT_VIEWS_DIR};
use crate::ui;

pub fn init(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);

    if path.exists() {
        anyhow::bail!(
            "Configuration file already exists: {}\nUse a different path or remove the existing file.",
            path.display()
        );
    }

    ui::print_step("Initializing Oneview project...\n");

    ui::print_step(&format!("Scanning {} for view directories...", DEFAULT_VIEWS_DIR));
    let roots = discover_view_roots(&base_dir(path))?;

    if roots.is_empty() {
        println!("  {}", "No view directories found.".yellow());
        println!("  A default `web` context will be configured.\n");
    } else {
        println!("  {} Found {} view director(ies):", "✓".green(), roots.len());
        for root in &roots {
            let kind = if root.shared { "shared" } else { "context" };
            println!(
                "    {} {} ({}, {})",
                "•".dimmed(),
                root.name,
                root.path.display(),
                kind
            );
        }
        println!();
    }

    let project_name = prompt_project_name()?;
    let config = starter_config(&project_name, &roots);

    let config_toml = toml::to_string_pretty(&config)?;
    fs::write(path, &config_toml)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    ui::print_success(&format!("Created {}", path.display()));
    println!();
    println!("{}", "Next steps:".bold());
    println!(
        "  {} to verify your configuration",
        "ov config validate".cyan()
    );
    println!("  {} to compile every context", "ov compile".cyan());
    println!("  {} to recompile on change", "ov compile --watch".cyan());

    Ok(())
}

fn prompt_project_name() -> Result<String> {
    let default_name = std::env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "my-project".to_string());

    print!("Project name [{}]: ", default_name.dimmed());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    if input.is_empty() {
        Ok(default_name)
    } else {
        Ok(input.to_string())
    }
}
