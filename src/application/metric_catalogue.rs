// Catalogue trait for metric display metadata and translation tables
use crate::domain::metric::MetricInfo;
use crate::domain::unit::UnitInfo;
use serde::Deserialize;

/// Maps a raw performance-data name onto a canonical metric.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Translation {
    pub name: String,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

/// Key of the per-check rule that applies to names matching no other rule.
pub const CATCH_ALL: &str = "*";

/// Read-only lookup service. Implementations are immutable snapshots that can
/// be shared across concurrent requests.
pub trait MetricCatalogue: Send + Sync {
    /// Metadata by canonical name. Family entries use a `%d` placeholder.
    fn metric_info(&self, name: &str) -> Option<&MetricInfo>;

    fn unit_info(&self, unit_id: &str) -> Option<&UnitInfo>;

    /// Translations declared for one check command. An empty slice drops the sample.
    fn check_translations(&self, check_command: &str, key: &str) -> Option<&[Translation]>;

    /// Translations that apply to every check command.
    fn global_translations(&self, key: &str) -> Option<&[Translation]>;

    /// Whether the check emits arbitrary user-defined metric names.
    fn is_free_form(&self, check_command: &str) -> bool;
}
