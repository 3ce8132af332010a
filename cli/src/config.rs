use anyhow::{Context, Result};
use oneview_compiler::pipeline::DEFAULT_SUFFIX;
use oneview_compiler::ContextSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "oneview.toml";

/// Conventional location of view templates, one subdirectory per context.
pub const DEFAULT_VIEWS_DIR: &str = "resources/views";
/// Conventional location of generated modules.
pub const DEFAULT_OUTPUT_DIR: &str = "resources/ts/views";

const DEFAULT_WATCH_INTERVAL_MS: u64 = 1000;

/// Main configuration structure for oneview.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneviewConfig {
    pub project: ProjectConfig,

    #[serde(default)]
    pub compiler: CompilerConfig,

    #[serde(default)]
    pub contexts: BTreeMap<String, ContextConfig>,
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Template file suffix, stripped from symbolic view names
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Polling interval of `ov compile --watch`
    #[serde(default = "default_watch_interval")]
    pub watch_interval_ms: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            watch_interval_ms: default_watch_interval(),
        }
    }
}

fn default_suffix() -> String {
    DEFAULT_SUFFIX.to_string()
}

fn default_watch_interval() -> u64 {
    DEFAULT_WATCH_INTERVAL_MS
}

/// One compilation context: view roots compiled into one output tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    pub views: Vec<PathBuf>,
    pub output: PathBuf,
}

impl OneviewConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: OneviewConfig =
            toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.project.name.trim().is_empty() {
            anyhow::bail!("Project name cannot be empty");
        }

        if !self.compiler.suffix.starts_with('.') {
            anyhow::bail!(
                "Compiler suffix must start with '.': {}",
                self.compiler.suffix
            );
        }

        if self.contexts.is_empty() {
            anyhow::bail!("At least one context must be defined under [contexts.<name>]");
        }

        for (name, context) in &self.contexts {
            if name.trim().is_empty() {
                anyhow::bail!("Context names cannot be empty");
            }
            if context.views.is_empty() {
                anyhow::bail!("Context '{}' has no view roots", name);
            }
            if context.output.as_os_str().is_empty() {
                anyhow::bail!("Context '{}' has no output path", name);
            }
        }

        Ok(())
    }

    pub fn context_names(&self) -> impl Iterator<Item = &str> {
        self.contexts.keys().map(String::as_str)
    }

    /// Pipeline contexts with paths resolved against `base_dir`.
    pub fn context_specs(&self, base_dir: &Path) -> Vec<ContextSpec> {
        self.contexts
            .iter()
            .map(|(name, context)| {
                ContextSpec::new(
                    name.clone(),
                    context.views.iter().map(|root| base_dir.join(root)).collect(),
                    base_dir.join(&context.output),
                )
            })
            .collect()
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.compiler.watch_interval_ms.max(50))
    }
}

/// Directory relative paths in the config file are resolved against.
pub fn base_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// A view directory found under [`DEFAULT_VIEWS_DIR`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredViewRoot {
    pub name: String,
    pub path: PathBuf,
    /// Directories prefixed with `_` are shared by every context.
    pub shared: bool,
}

/// Discover view directories under `<base>/resources/views`, sorted by name.
pub fn discover_view_roots(base: &Path) -> Result<Vec<DiscoveredViewRoot>> {
    let views_dir = base.join(DEFAULT_VIEWS_DIR);
    if !views_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut roots = Vec::new();
    for entry in fs::read_dir(&views_dir)
        .with_context(|| format!("Failed to read directory: {}", views_dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        roots.push(DiscoveredViewRoot {
            shared: name.starts_with('_'),
            path: PathBuf::from(DEFAULT_VIEWS_DIR).join(&name),
            name,
        });
    }
    roots.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(roots)
}

/// Starter configuration: one context per non-shared view root, each also
/// compiling every shared root. Falls back to a single `web` context.
pub fn starter_config(project_name: &str, roots: &[DiscoveredViewRoot]) -> OneviewConfig {
    let shared: Vec<PathBuf> = roots
        .iter()
        .filter(|root| root.shared)
        .map(|root| root.path.clone())
        .collect();

    let mut contexts: BTreeMap<String, ContextConfig> = roots
        .iter()
        .filter(|root| !root.shared)
        .map(|root| {
            let mut views = vec![root.path.clone()];
            views.extend(shared.iter().cloned());
            (
                root.name.clone(),
                ContextConfig {
                    views,
                    output: PathBuf::from(DEFAULT_OUTPUT_DIR).join(&root.name),
                },
            )
        })
        .collect();

    if contexts.is_empty() {
        let mut views = vec![PathBuf::from(DEFAULT_VIEWS_DIR).join("web")];
        views.extend(shared);
        contexts.insert(
            "web".to_string(),
            ContextConfig {
                views,
                output: PathBuf::from(DEFAULT_OUTPUT_DIR).join("web"),
            },
        );
    }

    OneviewConfig {
        project: ProjectConfig {
            name: project_name.to_string(),
        },
        compiler: CompilerConfig::default(),
        contexts,
    }
}
