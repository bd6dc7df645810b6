// Graph recipe domain model, the fully resolved chart description
use super::color::Color;
use super::expression::ConsolidationFunction;
use super::operation::{MetricOperation, SourceIdentity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Line,
    Area,
    Stack,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphMetric {
    pub title: String,
    pub line_type: LineType,
    pub operation: MetricOperation,
    pub unit: String,
    pub color: Color,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizontalRule {
    pub value: f64,
    pub rendered_value: String,
    pub color: Color,
    pub title: String,
}

/// Open bounds leave the axis to autoscale on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct VerticalRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSpecification {
    pub source: SourceIdentity,
    pub graph_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphRecipe {
    pub title: String,
    pub unit: String,
    pub explicit_vertical_range: Option<VerticalRange>,
    pub horizontal_rules: Vec<HorizontalRule>,
    pub omit_zero_metrics: bool,
    pub consolidation_function: ConsolidationFunction,
    pub metrics: Vec<GraphMetric>,
    pub specification: GraphSpecification,
}
