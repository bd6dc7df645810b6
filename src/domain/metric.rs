// Translated metric domain model
use super::color::Color;
use super::unit::UnitInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Display metadata of a canonical metric, as kept in the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricInfo {
    pub title: String,
    pub unit: String,
    pub color: Color,
}

/// Threshold values that travelled with the sample, already scaled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Scalars {
    pub warn: Option<f64>,
    pub crit: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Where a translated metric's values live in round-robin storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OriginalMetric {
    pub name: String,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslatedMetric {
    pub name: String,
    pub title: String,
    pub value: f64,
    pub scale: f64,
    pub unit: UnitInfo,
    pub color: Color,
    pub scalars: Scalars,
    pub originals: Vec<OriginalMetric>,
}

impl TranslatedMetric {
    pub fn rendered_value(&self) -> String {
        self.unit.render(self.value)
    }
}

/// Canonical metric name → translated metric, ordered by name.
pub type TranslatedMetrics = BTreeMap<String, TranslatedMetric>;

/// Round-robin storage cannot hold some characters in data-source names.
pub fn rrd_name(raw_name: &str) -> String {
    raw_name
        .chars()
        .map(|c| match c {
            '/' | ' ' | ':' | '\\' => '_',
            c => c,
        })
        .collect()
}
