// Graph template compiler - Template and translated metrics to a graph recipe
use crate::application::evaluator::Evaluator;
use crate::application::metric_catalogue::MetricCatalogue;
use crate::domain::color::Color;
use crate::domain::error::GraphingError;
use crate::domain::expression::{ConsolidationFunction, Expression};
use crate::domain::metric::TranslatedMetrics;
use crate::domain::operation::SourceIdentity;
use crate::domain::recipe::{
    GraphMetric, GraphRecipe, GraphSpecification, HorizontalRule, VerticalRange,
};
use crate::domain::template::GraphTemplate;

pub const DEFAULT_CONSOLIDATION: ConsolidationFunction = ConsolidationFunction::Max;

/// Compile one template. `Ok(None)` means the template does not apply to
/// these metrics: its conflicting metrics are all present, a required
/// metric is missing, or nothing is left to plot.
pub fn compile_template(
    template: &GraphTemplate,
    translated: &TranslatedMetrics,
    catalogue: &dyn MetricCatalogue,
    source: &SourceIdentity,
) -> Result<Option<GraphRecipe>, GraphingError> {
    template.validate()?;

    if !template.conflicting_metrics.is_empty()
        && template
            .conflicting_metrics
            .iter()
            .all(|name| translated.contains_key(name))
    {
        tracing::debug!("Graph template {} skipped: conflicting metrics present", template.id);
        return Ok(None);
    }

    if let Some(missing) = template
        .required_metrics()
        .into_iter()
        .find(|name| !translated.contains_key(*name))
    {
        tracing::debug!("Graph template {} skipped: metric {} missing", template.id, missing);
        return Ok(None);
    }

    let evaluator = Evaluator::new(translated, catalogue);
    let consolidation = template.consolidation_function.unwrap_or(DEFAULT_CONSOLIDATION);

    let mut metrics = Vec::new();
    let mut distinct: Vec<(&str, Color)> = Vec::new();
    for definition in &template.metrics {
        let Some(unit_color) =
            evaluator.metric_unit_color(&definition.expression, &template.optional_metrics)?
        else {
            continue;
        };

        let operation =
            match evaluator.compile_operation(&definition.expression, source, Some(consolidation)) {
                Ok(operation) => operation,
                Err(e) if e.is_missing_data() => {
                    tracing::debug!("Graph template {}: skipping {}: {}", template.id, definition.expression, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

        if let Some(name) = primary_metric(&definition.expression)
            .filter(|name| template.distinct_colors.iter().any(|d| d == name))
        {
            if let Some((other, _)) = distinct.iter().find(|(_, color)| *color == unit_color.color) {
                return Err(GraphingError::ConfigIntegrity(format!(
                    "graph template '{}': metrics '{}' and '{}' share color {}",
                    template.id, other, name, unit_color.color
                )));
            }
            distinct.push((name, unit_color.color.clone()));
        }

        metrics.push(GraphMetric {
            title: definition
                .title
                .clone()
                .unwrap_or_else(|| evaluator.title(&definition.expression)),
            line_type: definition.line_type,
            operation,
            unit: unit_color.unit,
            color: unit_color.color,
            opacity: definition.opacity,
        });
    }

    let Some(first) = metrics.first() else {
        tracing::debug!("Graph template {} skipped: no metric left to plot", template.id);
        return Ok(None);
    };

    let unit = first.unit.clone();
    if let Some(other) = metrics.iter().find(|metric| metric.unit != unit) {
        tracing::debug!(
            "Graph template {}: {} uses unit {}, axis keeps {}",
            template.id,
            other.title,
            other.unit,
            unit
        );
    }

    let title = if template.title.is_empty() {
        first.title.clone()
    } else {
        template.title.clone()
    };

    let mut horizontal_rules = Vec::new();
    for scalar in &template.scalars {
        match evaluator.evaluate(&scalar.expression) {
            Ok(evaluated) => horizontal_rules.push(HorizontalRule {
                value: evaluated.value,
                rendered_value: evaluated.unit.render(evaluated.value),
                color: evaluated.color,
                title: scalar.title.clone(),
            }),
            Err(e) if e.is_missing_data() || matches!(e, GraphingError::Arithmetic(_)) => {
                tracing::debug!("Graph template {}: no {} line: {}", template.id, scalar.title, e);
            }
            Err(e) => return Err(e),
        }
    }

    let explicit_vertical_range = template.range.as_ref().map(|range| VerticalRange {
        min: range_bound(&evaluator, &range.min),
        max: range_bound(&evaluator, &range.max),
    });

    Ok(Some(GraphRecipe {
        title,
        unit,
        explicit_vertical_range,
        horizontal_rules,
        omit_zero_metrics: template.omit_zero_metrics,
        consolidation_function: consolidation,
        metrics,
        specification: GraphSpecification {
            source: source.clone(),
            graph_id: template.id.clone(),
        },
    }))
}

/// The metric a definition is named after, for color bookkeeping.
fn primary_metric(expression: &Expression) -> Option<&str> {
    expression.metric_names().into_iter().next()
}

/// A bound that cannot be evaluated leaves that side of the axis open.
fn range_bound(evaluator: &Evaluator<'_>, expression: &Expression) -> Option<f64> {
    match evaluator.evaluate(expression) {
        Ok(evaluated) => Some(evaluated.value),
        Err(e) => {
            tracing::debug!("Open range bound {}: {}", expression, e);
            None
        }
    }
}
