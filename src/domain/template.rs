// Graph template domain model
use super::error::GraphingError;
use super::expression::{ConsolidationFunction, Expression};
use super::recipe::LineType;

#[derive(Debug, Clone, PartialEq)]
pub struct MetricDefinition {
    pub expression: Expression,
    pub line_type: LineType,
    pub title: Option<String>,
    pub opacity: Option<f64>,
}

impl MetricDefinition {
    pub fn new(expression: Expression, line_type: LineType) -> Self {
        Self {
            expression,
            line_type,
            title: None,
            opacity: None,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarDefinition {
    pub expression: Expression,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRange {
    pub min: Expression,
    pub max: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphTemplate {
    pub id: String,
    pub title: String,
    pub metrics: Vec<MetricDefinition>,
    pub scalars: Vec<ScalarDefinition>,
    /// The template does not apply when all of these are present.
    pub conflicting_metrics: Vec<String>,
    pub optional_metrics: Vec<String>,
    /// Metrics whose resolved colors must be pairwise distinct.
    pub distinct_colors: Vec<String>,
    pub consolidation_function: Option<ConsolidationFunction>,
    pub range: Option<TemplateRange>,
    pub omit_zero_metrics: bool,
}

impl GraphTemplate {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            metrics: Vec::new(),
            scalars: Vec::new(),
            conflicting_metrics: Vec::new(),
            optional_metrics: Vec::new(),
            distinct_colors: Vec::new(),
            consolidation_function: None,
            range: None,
            omit_zero_metrics: false,
        }
    }

    /// Reject definitions that cannot be compiled meaningfully.
    pub fn validate(&self) -> Result<(), GraphingError> {
        if let Some(name) = self
            .optional_metrics
            .iter()
            .find(|name| self.conflicting_metrics.contains(name))
        {
            return Err(GraphingError::ConfigIntegrity(format!(
                "graph template '{}' declares '{}' both optional and conflicting",
                self.id, name
            )));
        }
        Ok(())
    }

    /// Metrics referenced by the plotted series that must be present.
    pub fn required_metrics(&self) -> Vec<&str> {
        let mut required: Vec<&str> = Vec::new();
        for definition in &self.metrics {
            for name in definition.expression.metric_names() {
                if !self.optional_metrics.iter().any(|o| o == name) && !required.contains(&name) {
                    required.push(name);
                }
            }
        }
        required
    }

    pub fn is_optional(&self, metric: &str) -> bool {
        self.optional_metrics.iter().any(|name| name == metric)
    }
}
