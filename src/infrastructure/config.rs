use crate::application::metric_catalogue::Translation;
use crate::domain::metric::MetricInfo;
use crate::domain::recipe::LineType;
use crate::domain::unit::RenderKind;
use anyhow::Context;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

const BUILTIN_CATALOGUE: &str = include_str!("../../config/catalogue.toml");
const BUILTIN_TEMPLATES: &str = include_str!("../../config/graph_templates.toml");

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub listen: String,
    pub catalogue_path: Option<String>,
    pub templates_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogueConfig {
    #[serde(default)]
    pub free_form_checks: Vec<String>,
    #[serde(default)]
    pub units: BTreeMap<String, UnitConfig>,
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricInfo>,
    #[serde(default)]
    pub translations: TranslationsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UnitConfig {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub symbol: String,
    pub render: RenderKind,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TranslationsConfig {
    #[serde(default)]
    pub global: HashMap<String, Vec<Translation>>,
    #[serde(default)]
    pub checks: HashMap<String, HashMap<String, Vec<Translation>>>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TemplatesConfig {
    #[serde(default)]
    pub templates: Vec<TemplateConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TemplateConfig {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub metrics: Vec<MetricDefinitionConfig>,
    #[serde(default)]
    pub scalars: Vec<ScalarConfig>,
    #[serde(default)]
    pub conflicting_metrics: Vec<String>,
    #[serde(default)]
    pub optional_metrics: Vec<String>,
    #[serde(default)]
    pub distinct_colors: Vec<String>,
    pub consolidation_function: Option<String>,
    pub range: Option<RangeConfig>,
    #[serde(default)]
    pub omit_zero_metrics: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricDefinitionConfig {
    pub expression: String,
    pub line_type: LineType,
    pub title: Option<String>,
    pub opacity: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScalarConfig {
    pub expression: String,
    pub title: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RangeConfig {
    pub min: String,
    pub max: String,
}

/// Server settings from `config/server.*`, overridden by `PERFGRAPH_*` variables.
pub fn load_server_config() -> anyhow::Result<ServerConfig> {
    let settings = config::Config::builder()
        .set_default("listen", "0.0.0.0:8080")?
        .add_source(config::File::with_name("config/server").required(false))
        .add_source(config::Environment::with_prefix("PERFGRAPH"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Catalogue from a TOML file, or the built-in one.
pub fn load_catalogue_config(path: Option<&str>) -> anyhow::Result<CatalogueConfig> {
    match path {
        Some(path) => parse_file(Path::new(path)),
        None => CatalogueConfig::builtin(),
    }
}

/// Graph templates from a TOML file, or the built-in ones.
pub fn load_templates_config(path: Option<&str>) -> anyhow::Result<TemplatesConfig> {
    match path {
        Some(path) => parse_file(Path::new(path)),
        None => TemplatesConfig::builtin(),
    }
}

fn parse_file<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

impl CatalogueConfig {
    pub fn builtin() -> anyhow::Result<Self> {
        toml::from_str(BUILTIN_CATALOGUE).context("Failed to parse built-in catalogue")
    }
}

impl TemplatesConfig {
    pub fn builtin() -> anyhow::Result<Self> {
        toml::from_str(BUILTIN_TEMPLATES).context("Failed to parse built-in graph templates")
    }
}
