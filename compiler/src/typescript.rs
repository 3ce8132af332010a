use crate::compiler::CompiledTemplate;
use crate::directives::StoreEffect;
#[cfg(feature = "pipeline")]
use crate::pipeline::registry::ViewRegistry;
use serde_json::{json, Value};

/// Output structure for a compiled view module
#[derive(Debug, Clone)]
pub struct TypeScriptOutput {
    pub header: String,
    pub interfaces: String,
    pub view_definition: String,
}

impl TypeScriptOutput {
    pub fn full_file(&self) -> String {
        let parts: Vec<&str> = [
            self.header.as_str(),
            self.interfaces.as_str(),
            self.view_definition.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();
        format!("{}\n", parts.join("\n\n"))
    }
}

/// Configuration for TypeScript generation
#[derive(Debug, Clone)]
pub struct TypeScriptConfig {
    pub minify: bool,
    pub default_export_name: String,
}

impl Default for TypeScriptConfig {
    fn default() -> Self {
        Self {
            minify: false,
            default_export_name: "view".to_string(),
        }
    }
}

impl TypeScriptConfig {
    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }
}

/// Renders one compiled template as a self-contained TypeScript module
pub struct ModuleCompiler<'a> {
    view_name: String,
    template: &'a CompiledTemplate,
    config: TypeScriptConfig,
}

impl<'a> ModuleCompiler<'a> {
    pub fn new(view_name: impl Into<String>, template: &'a CompiledTemplate) -> Self {
        Self {
            view_name: view_name.into(),
            template,
            config: TypeScriptConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TypeScriptConfig) -> Self {
        self.config = config;
        self
    }

    pub fn compile(&self) -> TypeScriptOutput {
        TypeScriptOutput {
            header: self.generate_header(),
            interfaces: self.generate_interfaces(),
            view_definition: self.generate_view_definition(),
        }
    }

    fn generate_header(&self) -> String {
        if self.config.minify {
            return String::new();
        }
        format!(
            "/**\n * Compiled view: {}\n * Source: {}\n * DO NOT EDIT MANUALLY\n */",
            self.view_name, self.template.source_name
        )
    }

    fn generate_interfaces(&self) -> String {
        let interfaces = [
            "export interface OutputDef {\n  readonly index: number;\n  readonly dependencies: readonly string[];\n}",
            "export interface RenderThunkDef {\n  readonly dependencies: readonly string[];\n  readonly render: string;\n}",
            "export interface AttributeDef {\n  readonly index: number;\n  readonly dependencies: readonly string[];\n  readonly attrs: Readonly<Record<string, RenderThunkDef>>;\n}",
        ];
        interfaces.join(self.separator())
    }

    fn generate_view_definition(&self) -> String {
        let template = self.template;
        let default_name = &self.config.default_export_name;

        let lines = [
            format!("export const viewName = {};", js_string(&self.view_name)),
            format!(
                "export const dependencies: readonly string[] = {};",
                self.literal(&json!(template.dependencies))
            ),
            format!(
                "export const outputs: readonly OutputDef[] = {};",
                self.literal(&self.outputs_value())
            ),
            format!(
                "export const attributes: readonly AttributeDef[] = {};",
                self.literal(&self.attributes_value())
            ),
            format!(
                "export const template: string = {};",
                js_string(&template.template)
            ),
            format!(
                "const {default_name} = {{ viewName, dependencies, outputs, attributes, template }};\nexport default {default_name};"
            ),
        ];
        lines.join(self.separator())
    }

    fn outputs_value(&self) -> Value {
        let outputs: Vec<Value> = self
            .template
            .outputs()
            .enumerate()
            .map(|(index, directive)| {
                json!({
                    "index": index,
                    "dependencies": directive.dependencies(),
                })
            })
            .collect();
        Value::Array(outputs)
    }

    fn attributes_value(&self) -> Value {
        let attributes: Vec<Value> = self
            .template
            .attributes()
            .flat_map(|directive| directive.effects())
            .filter_map(|effect| match effect {
                StoreEffect::RegisterAttribute { config } => Some(config),
                _ => None,
            })
            .enumerate()
            .map(|(index, config)| {
                let attrs: serde_json::Map<String, Value> = config
                    .attrs
                    .iter()
                    .map(|thunk| {
                        (
                            thunk.key.clone(),
                            json!({
                                "dependencies": thunk.dependencies,
                                "render": thunk.render,
                            }),
                        )
                    })
                    .collect();
                json!({
                    "index": index,
                    "dependencies": config.dependencies,
                    "attrs": attrs,
                })
            })
            .collect();
        Value::Array(attributes)
    }

    fn literal(&self, value: &Value) -> String {
        if self.config.minify {
            value.to_string()
        } else {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
    }

    fn separator(&self) -> &'static str {
        if self.config.minify {
            "\n"
        } else {
            "\n\n"
        }
    }
}

/// Renders the per-context lookup module mapping view names to lazy loaders
#[cfg(feature = "pipeline")]
pub struct RegistryGenerator<'a> {
    context: &'a str,
    registry: &'a ViewRegistry,
}

#[cfg(feature = "pipeline")]
impl<'a> RegistryGenerator<'a> {
    pub fn new(context: &'a str, registry: &'a ViewRegistry) -> Self {
        Self { context, registry }
    }

    pub fn generate(&self) -> String {
        let mut sections = vec![
            format!(
                "/**\n * View registry for context: {}\n * DO NOT EDIT MANUALLY\n */",
                self.context
            ),
            "export type ViewLoader = () => Promise<any>;".to_string(),
            "export interface ViewRegistry {\n  readonly [name: string]: ViewLoader;\n}".to_string(),
        ];

        let groups = self.ordered_groups();
        for (variable, entries) in &groups {
            let body: String = entries
                .iter()
                .map(|(name, import_path)| {
                    format!(
                        "  {}: () => import({}),\n",
                        js_string(name),
                        js_string(&format!("./{import_path}"))
                    )
                })
                .collect();
            sections.push(format!(
                "export const {variable}: ViewRegistry = {{\n{body}}};"
            ));
        }

        let spreads: String = groups
            .iter()
            .map(|(variable, _)| format!("  ...{variable},\n"))
            .collect();
        sections.push(format!(
            "export const viewRegistry: ViewRegistry = {{\n{spreads}}};"
        ));

        sections.push(
            "export async function loadView(name: string): Promise<any> {\n  \
             const loader = viewRegistry[name];\n  \
             if (!loader) {\n    \
             throw new Error(`View not found: ${name}`);\n  \
             }\n  \
             const module = await loader();\n  \
             return module.default;\n}"
                .to_string(),
        );
        sections.push(
            "export function hasView(name: string): boolean {\n  \
             return Object.prototype.hasOwnProperty.call(viewRegistry, name);\n}"
                .to_string(),
        );
        sections.push(
            "export function getViewNames(): string[] {\n  \
             return Object.keys(viewRegistry);\n}"
                .to_string(),
        );

        format!("{}\n", sections.join("\n\n"))
    }

    /// Context group first (as `mainViews`), then shared groups by name.
    fn ordered_groups(&self) -> Vec<(String, Vec<(&'a str, &'a str)>)> {
        let mut groups: Vec<(String, Vec<(&str, &str)>)> = Vec::new();
        let mut shared = Vec::new();

        for (tag, entries) in self.registry.groups() {
            let entries: Vec<(&str, &str)> = entries
                .iter()
                .map(|(name, path)| (name.as_str(), path.as_str()))
                .collect();
            if tag == self.context {
                groups.push(("mainViews".to_string(), entries));
            } else {
                shared.push((group_variable(tag), entries));
            }
        }

        groups.extend(shared);
        groups
    }
}

/// `_system` -> `systemViews`, `_shared-ui` -> `sharedUiViews`
#[cfg(feature = "pipeline")]
fn group_variable(tag: &str) -> String {
    let bare = tag.trim_start_matches('_');
    let camel = to_camel_case(bare);
    if camel.is_empty() {
        "sharedViews".to_string()
    } else {
        format!("{camel}Views")
    }
}

/// Convert snake_case to PascalCase
#[cfg(feature = "pipeline")]
fn to_pascal_case(s: &str) -> String {
    s.split(['_', '-', '.'])
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect()
}

/// Convert snake_case to camelCase
#[cfg(feature = "pipeline")]
fn to_camel_case(s: &str) -> String {
    let pascal = to_pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
    }
}

fn js_string(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

/// Write a module to disk, creating parent directories as needed
pub fn write_typescript_to_file(
    output: &TypeScriptOutput,
    path: &std::path::Path,
) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, output.full_file())
}
