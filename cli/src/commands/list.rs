use anyhow::{Context, Result};
use colored::Colorize;
use oneview_compiler::pipeline::{discover, is_stale, plan_artifact};
use oneview_compiler::ContextSpec;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{base_dir, OneviewConfig};
use crate::ui;

#[derive(Debug, Serialize)]
struct ListedView {
    name: String,
    source: PathBuf,
    output: PathBuf,
    stale: bool,
}

#[derive(Debug, Serialize)]
struct ListedContext {
    context: String,
    views: Vec<ListedView>,
}

pub fn list(config_path: &str, json: bool) -> Result<()> {
    let path = Path::new(config_path);
    let config = OneviewConfig::load(path)
        .context("Failed to load configuration. Run `ov init` to create a configuration file.")?;

    let listed: Vec<ListedContext> = config
        .context_specs(&base_dir(path))
        .iter()
        .map(|spec| list_context(spec, &config.compiler.suffix))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    for context in &listed {
        ui::print_section(&format!("{} ({} views)", context.context, context.views.len()));
        if context.views.is_empty() {
            ui::print_info("no views found");
        }
        for view in &context.views {
            let marker = if view.stale {
                "stale".yellow().to_string()
            } else {
                "up to date".dimmed().to_string()
            };
            ui::print_bullet(&format!("{} [{}]", view.name.bold(), marker));
        }
    }
    Ok(())
}

fn list_context(spec: &ContextSpec, suffix: &str) -> ListedContext {
    let views = discover(spec, suffix)
        .iter()
        .filter_map(|file| match plan_artifact(spec, file, suffix) {
            Ok(artifact) => Some(artifact),
            Err(err) => {
                tracing::warn!(path = %file.path.display(), error = %err, "cannot place view");
                None
            }
        })
        .map(|artifact| ListedView {
            stale: is_stale(&artifact.source_path, &artifact.output_path),
            name: artifact.symbolic_name,
            source: artifact.source_path,
            output: artifact.output_path,
        })
        .collect();

    ListedContext {
        context: spec.name.clone(),
        views,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_context_reports_symbolic_names() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("views/web");
        std::fs::create_dir_all(root.join("components")).unwrap();
        std::fs::write(root.join("components/button.blade.php"), "<button/>").unwrap();
        std::fs::write(root.join("notes.txt"), "ignored").unwrap();

        let spec = ContextSpec::new("web", vec![root], dir.path().join("ts/web"));
        let listed = list_context(&spec, ".blade.php");
        assert_eq!(listed.views.len(), 1);
        assert_eq!(listed.views[0].name, "components.button");
        assert!(listed.views[0].stale);
    }
}
