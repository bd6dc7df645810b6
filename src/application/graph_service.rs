// Graph service - Use case for compiling all graphs of one check's performance data
use crate::application::metric_catalogue::MetricCatalogue;
use crate::application::parser::parse_expression;
use crate::application::template_compiler::compile_template;
use crate::application::translator::translate_metrics;
use crate::domain::error::GraphingError;
use crate::domain::expression::{Expression, ScalarKind};
use crate::domain::metric::TranslatedMetrics;
use crate::domain::operation::SourceIdentity;
use crate::domain::perf_data::parse_perf_data;
use crate::domain::recipe::{GraphRecipe, LineType};
use crate::domain::template::{GraphTemplate, MetricDefinition, ScalarDefinition, TemplateRange};
use crate::infrastructure::config::{TemplateConfig, TemplatesConfig};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct GraphService {
    catalogue: Arc<dyn MetricCatalogue>,
    templates_config: TemplatesConfig,
}

impl GraphService {
    pub fn new(catalogue: Arc<dyn MetricCatalogue>, templates_config: TemplatesConfig) -> Self {
        Self {
            catalogue,
            templates_config,
        }
    }

    pub fn translate(&self, perf_data: &str, check_command: &str) -> Result<TranslatedMetrics, GraphingError> {
        let (samples, check_command) = parse_perf_data(perf_data, check_command);
        translate_metrics(&samples, &check_command, self.catalogue.as_ref())
    }

    /// Recipes of every applicable template, then one graph per metric no
    /// applicable template plots.
    pub fn graph_recipes(
        &self,
        perf_data: &str,
        check_command: &str,
        source: &SourceIdentity,
    ) -> Result<Vec<GraphRecipe>, GraphingError> {
        let translated = self.translate(perf_data, check_command)?;
        let mut recipes = Vec::new();
        let mut plotted: HashSet<String> = HashSet::new();

        for template_config in &self.templates_config.templates {
            let template = build_template(template_config, &translated)?;
            if let Some(recipe) = compile_template(&template, &translated, self.catalogue.as_ref(), source)? {
                plotted.extend(
                    template
                        .metrics
                        .iter()
                        .flat_map(|definition| definition.expression.metric_names())
                        .map(str::to_string),
                );
                recipes.push(recipe);
            }
        }

        for name in translated.keys().filter(|name| !plotted.contains(*name)) {
            let template = implicit_template(name);
            if let Some(recipe) = compile_template(&template, &translated, self.catalogue.as_ref(), source)? {
                recipes.push(recipe);
            }
        }

        tracing::debug!(
            "Compiled {} graphs for {} ({} metrics)",
            recipes.len(),
            source.service_description,
            translated.len()
        );

        Ok(recipes)
    }
}

/// Parse a configured template's expressions against this request's metrics.
pub fn build_template(
    config: &TemplateConfig,
    translated: &TranslatedMetrics,
) -> Result<GraphTemplate, GraphingError> {
    let metrics = config
        .metrics
        .iter()
        .map(|metric| -> Result<MetricDefinition, GraphingError> {
            Ok(MetricDefinition {
                expression: parse_expression(&metric.expression, translated)?,
                line_type: metric.line_type,
                title: metric.title.clone(),
                opacity: metric.opacity,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let scalars = config
        .scalars
        .iter()
        .map(|scalar| -> Result<ScalarDefinition, GraphingError> {
            Ok(ScalarDefinition {
                expression: parse_expression(&scalar.expression, translated)?,
                title: scalar.title.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let range = match &config.range {
        Some(range) => Some(TemplateRange {
            min: parse_expression(&range.min, translated)?,
            max: parse_expression(&range.max, translated)?,
        }),
        None => None,
    };

    let consolidation_function = match &config.consolidation_function {
        Some(name) => Some(name.parse()?),
        None => None,
    };

    Ok(GraphTemplate {
        id: config.id.clone(),
        title: config.title.clone(),
        metrics,
        scalars,
        conflicting_metrics: config.conflicting_metrics.clone(),
        optional_metrics: config.optional_metrics.clone(),
        distinct_colors: config.distinct_colors.clone(),
        consolidation_function,
        range,
        omit_zero_metrics: config.omit_zero_metrics,
    })
}

/// Single-metric graph for a metric that no template covers.
fn implicit_template(metric: &str) -> GraphTemplate {
    let mut template = GraphTemplate::new(format!("METRIC_{}", metric), "");
    template.metrics = vec![MetricDefinition::new(Expression::metric(metric), LineType::Area)];
    template.scalars = [ScalarKind::Warning, ScalarKind::Critical]
        .into_iter()
        .map(|kind| ScalarDefinition {
            expression: Expression::scalar(kind, metric),
            title: kind.title().to_string(),
        })
        .collect();
    template.range = Some(TemplateRange {
        min: Expression::Constant(0.0),
        max: Expression::scalar(ScalarKind::Maximum, metric),
    });
    template
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::expression::ConsolidationFunction;
    use crate::domain::operation::MetricOperation;
    use crate::infrastructure::static_catalogue::StaticCatalogue;

    fn service() -> GraphService {
        GraphService::new(
            Arc::new(StaticCatalogue::builtin().unwrap()),
            TemplatesConfig::builtin().unwrap(),
        )
    }

    fn ids(recipes: &[GraphRecipe]) -> Vec<&str> {
        recipes
            .iter()
            .map(|recipe| recipe.specification.graph_id.as_str())
            .collect()
    }

    #[test]
    fn test_df_graphs() {
        let source = SourceIdentity::new("site", "host", "Filesystem /");
        let recipes = service()
            .graph_recipes(
                "/=163651.992188;;;; fs_size=477500.03125;;;; growth=-1280.489081;;;;",
                "check_mk-df",
                &source,
            )
            .unwrap();

        assert_eq!(ids(&recipes), vec!["fs_used", "fs_growth"]);

        let fs_used = &recipes[0];
        assert_eq!(fs_used.title, "Size and used space");
        let titles: Vec<&str> = fs_used.metrics.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Used space", "Free space", "Total size"]);
        assert_eq!(fs_used.metrics[1].color.as_str(), "#e3fff9");

        let growth = &recipes[1];
        assert_eq!(growth.metrics.len(), 2);
        assert_eq!(growth.metrics[1].title, "Shrinkage");
    }

    #[test]
    fn test_variant_selected_by_conflicting_metric() {
        let recipes = service()
            .graph_recipes(
                "/=1;;;; fs_size=4;;;; fs_free=3;;;;",
                "check_mk-df",
                &SourceIdentity::default(),
            )
            .unwrap();

        assert_eq!(ids(&recipes), vec!["fs_used_2"]);
    }

    #[test]
    fn test_implicit_graphs_for_uncovered_metrics() {
        let recipes = service()
            .graph_recipes(
                "test=5;5;10;0;20 load1=0.5;;;0;8 load15=0.3",
                "check_mk-local",
                &SourceIdentity::default(),
            )
            .unwrap();

        assert_eq!(ids(&recipes), vec!["cpu_load", "METRIC_test"]);

        let test = &recipes[1];
        assert_eq!(test.title, "Test");
        assert_eq!(test.metrics[0].color.as_str(), "#cc00ff");
        assert_eq!(test.horizontal_rules.len(), 2);
        assert_eq!(test.horizontal_rules[0].value, 5.0);
        assert_eq!(test.horizontal_rules[1].value, 10.0);
        assert_eq!(
            test.explicit_vertical_range.map(|range| (range.min, range.max)),
            Some((Some(0.0), Some(20.0)))
        );
    }

    #[test]
    fn test_configured_consolidation_and_merge() {
        let recipes = service()
            .graph_recipes("memused=1024 memtotal=4096", "check_mk-mem.used", &SourceIdentity::default())
            .unwrap();

        assert_eq!(ids(&recipes), vec!["ram_used"]);
        let ram = &recipes[0];
        assert_eq!(ram.consolidation_function, ConsolidationFunction::Average);
        assert_eq!(ram.metrics[0].opacity, Some(0.6));
        match &ram.metrics[0].operation {
            MetricOperation::Operator { operator_name, operands } => {
                assert_eq!(operator_name, "MERGE");
                assert_eq!(operands.len(), 2);
            }
            other => panic!("unexpected operation {:?}", other),
        }
        assert_eq!(
            ram.explicit_vertical_range.and_then(|range| range.max),
            Some(4096.0 * 1048576.0)
        );
    }

    #[test]
    fn test_invalid_template_expression_is_reported() {
        let mut templates = TemplatesConfig::builtin().unwrap();
        templates.templates[0].metrics[0].expression = "fs_used,+".to_string();
        let service = GraphService::new(Arc::new(StaticCatalogue::builtin().unwrap()), templates);

        assert!(matches!(
            service.graph_recipes("/=1;;;; fs_size=2;;;;", "check_mk-df", &SourceIdentity::default()),
            Err(GraphingError::Parse(_))
        ));
    }

    #[test]
    fn test_invalid_consolidation_function_name() {
        let mut templates = TemplatesConfig::builtin().unwrap();
        templates.templates[0].consolidation_function = Some("median".to_string());
        let translated = TranslatedMetrics::new();

        assert!(matches!(
            build_template(&templates.templates[0], &translated),
            Err(GraphingError::Arithmetic(_))
        ));
    }

    #[test]
    fn test_concurrent_requests_share_catalogue() {
        let service = service();
        std::thread::scope(|scope| {
            let handles: Vec<_> = ["check_mk-df", "check_mk-cpu.loads", "check_ping"]
                .into_iter()
                .map(|check_command| {
                    let service = service.clone();
                    scope.spawn(move || {
                        service
                            .graph_recipes(
                                "/=1;;;; fs_size=2;;;; load1=1 load15=2 rta=3;4;5",
                                check_command,
                                &SourceIdentity::default(),
                            )
                            .map(|recipes| recipes.len())
                    })
                })
                .collect();
            for handle in handles {
                assert!(handle.join().unwrap().unwrap() > 0);
            }
        });
    }
}
