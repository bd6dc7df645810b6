// Static catalogue - In-memory MetricCatalogue built from configuration
use crate::application::metric_catalogue::{MetricCatalogue, Translation};
use crate::domain::metric::MetricInfo;
use crate::domain::unit::UnitInfo;
use crate::infrastructure::config::CatalogueConfig;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct StaticCatalogue {
    units: HashMap<String, UnitInfo>,
    metrics: HashMap<String, MetricInfo>,
    global_translations: HashMap<String, Vec<Translation>>,
    check_translations: HashMap<String, HashMap<String, Vec<Translation>>>,
    free_form_checks: HashSet<String>,
}

impl StaticCatalogue {
    /// Build the lookup tables. Metrics referring to unknown units are rejected.
    pub fn from_config(config: CatalogueConfig) -> anyhow::Result<Self> {
        let units: HashMap<String, UnitInfo> = config
            .units
            .into_iter()
            .map(|(id, unit)| {
                let info = UnitInfo {
                    id: id.clone(),
                    title: unit.title,
                    symbol: unit.symbol,
                    render: unit.render,
                };
                (id, info)
            })
            .collect();

        for (name, info) in &config.metrics {
            if !units.contains_key(&info.unit) {
                anyhow::bail!("Metric {} uses unknown unit {}", name, info.unit);
            }
        }

        tracing::debug!(
            "Loaded catalogue with {} metrics, {} units, {} check translation tables",
            config.metrics.len(),
            units.len(),
            config.translations.checks.len()
        );

        Ok(Self {
            units,
            metrics: config.metrics.into_iter().collect(),
            global_translations: config.translations.global,
            check_translations: config.translations.checks,
            free_form_checks: config.free_form_checks.into_iter().collect(),
        })
    }

    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_config(CatalogueConfig::builtin()?)
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Self::from_config(toml::from_str(text)?)
    }
}

impl MetricCatalogue for StaticCatalogue {
    fn metric_info(&self, name: &str) -> Option<&MetricInfo> {
        self.metrics.get(name)
    }

    fn unit_info(&self, unit_id: &str) -> Option<&UnitInfo> {
        self.units.get(unit_id)
    }

    fn check_translations(&self, check_command: &str, key: &str) -> Option<&[Translation]> {
        self.check_translations
            .get(check_command)
            .and_then(|table| table.get(key))
            .map(Vec::as_slice)
    }

    fn global_translations(&self, key: &str) -> Option<&[Translation]> {
        self.global_translations.get(key).map(Vec::as_slice)
    }

    fn is_free_form(&self, check_command: &str) -> bool {
        self.free_form_checks.contains(check_command)
    }
}
