// Expression evaluator and recipe compiler
use crate::application::metric_catalogue::MetricCatalogue;
use crate::domain::color::{Color, CONSTANT_COLOR, CRITICAL_COLOR, SCALAR_COLOR, WARNING_COLOR};
use crate::domain::error::GraphingError;
use crate::domain::expression::{
    BinaryOperator, ConsolidationFunction, Expression, ListOperator, ScalarKind,
};
use crate::domain::metric::{TranslatedMetric, TranslatedMetrics};
use crate::domain::operation::{MetricOperation, SourceIdentity};
use crate::domain::unit::{UnitInfo, COUNT_UNIT};

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedValue {
    pub value: f64,
    pub unit: UnitInfo,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricUnitColor {
    pub unit: String,
    pub color: Color,
}

/// Walks expression trees for one request's translated metrics.
///
/// Value mode (`evaluate`) resolves metrics to their current numbers. Recipe
/// mode (`compile_operation`) resolves them to round-robin sources and keeps
/// the arithmetic as an operation tree for the data-retrieval stage.
pub struct Evaluator<'a> {
    translated: &'a TranslatedMetrics,
    catalogue: &'a dyn MetricCatalogue,
}

impl<'a> Evaluator<'a> {
    pub fn new(translated: &'a TranslatedMetrics, catalogue: &'a dyn MetricCatalogue) -> Self {
        Self {
            translated,
            catalogue,
        }
    }

    pub fn evaluate(&self, expression: &Expression) -> Result<EvaluatedValue, GraphingError> {
        let value = self.value(expression)?;
        let (unit, color) = self.unit_color(expression)?;
        Ok(EvaluatedValue { value, unit, color })
    }

    /// Unit and color of a plotted expression, or `None` when it depends on
    /// an absent optional metric.
    pub fn metric_unit_color(
        &self,
        expression: &Expression,
        optional_metrics: &[String],
    ) -> Result<Option<MetricUnitColor>, GraphingError> {
        match self.unit_color(expression) {
            Ok((unit, color)) => Ok(Some(MetricUnitColor {
                unit: unit.id,
                color,
            })),
            Err(GraphingError::Resolution { metric, .. }) if optional_metrics.contains(&metric) => {
                tracing::debug!("Skipping expression {}: optional metric {} is absent", expression, metric);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Compile to a fetch-operation tree. Explicit per-metric consolidation
    /// wins over `enforced`.
    pub fn compile_operation(
        &self,
        expression: &Expression,
        source: &SourceIdentity,
        enforced: Option<ConsolidationFunction>,
    ) -> Result<MetricOperation, GraphingError> {
        match expression {
            Expression::Constant(value) => Ok(MetricOperation::Constant { value: *value }),
            Expression::Metric {
                name,
                consolidation,
            } => {
                let metric = self.metric(name)?;
                let consolidation = consolidation.or(enforced);
                let mut sources: Vec<MetricOperation> = metric
                    .originals
                    .iter()
                    .map(|original| {
                        MetricOperation::rrd_source(source, &original.name, consolidation, original.scale)
                    })
                    .collect();
                if sources.len() == 1 {
                    Ok(sources.remove(0))
                } else {
                    Ok(MetricOperation::operator(ListOperator::Merge.token(), sources))
                }
            }
            Expression::Scalar { .. } => Ok(MetricOperation::Constant {
                value: self.value(expression)?,
            }),
            Expression::Binary {
                operator,
                left,
                right,
            } => Ok(MetricOperation::operator(
                operator.token(),
                vec![
                    self.compile_operation(left, source, enforced)?,
                    self.compile_operation(right, source, enforced)?,
                ],
            )),
            Expression::List {
                operator: ListOperator::Merge,
                operands,
            } => {
                let mut compiled = first_resolvable(operands, |operand| {
                    self.compile_operation(operand, source, enforced)
                })?;
                if compiled.len() == 1 {
                    Ok(compiled.remove(0))
                } else {
                    Ok(MetricOperation::operator(ListOperator::Merge.token(), compiled))
                }
            }
            Expression::List { operator, operands } => Ok(MetricOperation::operator(
                operator.token(),
                operands
                    .iter()
                    .map(|operand| self.compile_operation(operand, source, enforced))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            Expression::Percentile {
                expression,
                percent,
            } => Ok(MetricOperation::operator(
                "PERCENTILE",
                vec![
                    self.compile_operation(expression, source, enforced)?,
                    MetricOperation::Constant { value: *percent },
                ],
            )),
            Expression::Annotated { expression, .. } => {
                self.compile_operation(expression, source, enforced)
            }
        }
    }

    /// Human title: the scalar's name, else the first present metric's title.
    pub fn title(&self, expression: &Expression) -> String {
        match expression {
            Expression::Scalar { kind, .. } => kind.title().to_string(),
            Expression::Annotated { expression, .. } => self.title(expression),
            _ => expression
                .metric_names()
                .into_iter()
                .find_map(|name| self.translated.get(name))
                .map(|metric| metric.title.clone())
                .unwrap_or_else(|| expression.to_string()),
        }
    }

    fn metric(&self, name: &str) -> Result<&'a TranslatedMetric, GraphingError> {
        self.translated
            .get(name)
            .ok_or_else(|| GraphingError::Resolution {
                metric: name.to_string(),
                available: self
                    .translated
                    .keys()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    fn value(&self, expression: &Expression) -> Result<f64, GraphingError> {
        match expression {
            Expression::Constant(value) => Ok(*value),
            Expression::Metric { name, .. } => Ok(self.metric(name)?.value),
            Expression::Scalar { kind, metric } => {
                let translated = self.metric(metric)?;
                let scalars = &translated.scalars;
                let value = match kind {
                    ScalarKind::Warning => scalars.warn,
                    ScalarKind::Critical => scalars.crit,
                    ScalarKind::Minimum => scalars.min,
                    ScalarKind::Maximum => scalars.max,
                };
                value.ok_or_else(|| GraphingError::MissingScalar {
                    metric: metric.clone(),
                    scalar: kind.suffix(),
                })
            }
            Expression::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.value(left)?;
                let right = self.value(right)?;
                let result = match operator {
                    BinaryOperator::Add => left + right,
                    BinaryOperator::Subtract => left - right,
                    BinaryOperator::Multiply => left * right,
                    BinaryOperator::Divide if right == 0.0 => {
                        return Err(GraphingError::Arithmetic(format!(
                            "division by zero in '{}'",
                            expression
                        )));
                    }
                    BinaryOperator::Divide => left / right,
                };
                if result.is_finite() {
                    Ok(result)
                } else {
                    Err(GraphingError::Arithmetic(format!(
                        "result of '{}' is not finite",
                        expression
                    )))
                }
            }
            Expression::List {
                operator: ListOperator::Merge,
                operands,
            } => Ok(first_resolvable(operands, |operand| self.value(operand))?[0]),
            Expression::List { operator, operands } => {
                let values = operands
                    .iter()
                    .map(|operand| self.value(operand))
                    .collect::<Result<Vec<_>, _>>()?;
                if values.is_empty() {
                    return Err(no_operands(*operator));
                }
                Ok(match operator {
                    ListOperator::Sum => values.iter().sum(),
                    ListOperator::Minimum => values.iter().copied().fold(f64::INFINITY, f64::min),
                    ListOperator::Maximum => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    ListOperator::Average => values.iter().sum::<f64>() / values.len() as f64,
                    ListOperator::Merge => values[0],
                })
            }
            Expression::Percentile { expression, .. } => self.value(expression),
            Expression::Annotated { expression, .. } => self.value(expression),
        }
    }

    fn unit_color(&self, expression: &Expression) -> Result<(UnitInfo, Color), GraphingError> {
        match expression {
            Expression::Constant(_) => Ok((UnitInfo::count(), Color::fixed(CONSTANT_COLOR))),
            Expression::Metric { name, .. } => {
                let metric = self.metric(name)?;
                Ok((metric.unit.clone(), metric.color.clone()))
            }
            Expression::Scalar { kind, metric } => {
                let metric = self.metric(metric)?;
                let color = match kind {
                    ScalarKind::Warning => WARNING_COLOR,
                    ScalarKind::Critical => CRITICAL_COLOR,
                    ScalarKind::Minimum | ScalarKind::Maximum => SCALAR_COLOR,
                };
                Ok((metric.unit.clone(), Color::fixed(color)))
            }
            Expression::Binary {
                operator,
                left,
                right,
            } => {
                let (left_unit, left_color) = self.unit_color(left)?;
                let (right_unit, right_color) = self.unit_color(right)?;
                let color = if is_constant(left) && !is_constant(right) {
                    right_color
                } else {
                    left_color
                };
                Ok((combine_units(*operator, left_unit, right_unit), color))
            }
            Expression::List {
                operator: ListOperator::Merge,
                operands,
            } => Ok(first_resolvable(operands, |operand| self.unit_color(operand))?.remove(0)),
            Expression::List { operator, operands } => operands
                .iter()
                .map(|operand| self.unit_color(operand))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .next()
                .ok_or_else(|| no_operands(*operator)),
            Expression::Percentile { expression, .. } => self.unit_color(expression),
            Expression::Annotated {
                expression,
                unit,
                color,
            } => {
                let (inner_unit, inner_color) = self.unit_color(expression)?;
                let unit = match unit {
                    Some(unit_id) => self.catalogue.unit_info(unit_id).cloned().ok_or_else(|| {
                        GraphingError::ConfigIntegrity(format!(
                            "expression '{}' uses unknown unit '{}'",
                            expression, unit_id
                        ))
                    })?,
                    None => inner_unit,
                };
                Ok((unit, color.clone().unwrap_or(inner_color)))
            }
        }
    }
}

/// Resolve operands in order, skipping those that fail for missing data.
/// Fails with the last such error when none resolves.
fn first_resolvable<T>(
    operands: &[Expression],
    mut resolve: impl FnMut(&Expression) -> Result<T, GraphingError>,
) -> Result<Vec<T>, GraphingError> {
    let mut resolved = Vec::new();
    let mut last_error = None;
    for operand in operands {
        match resolve(operand) {
            Ok(value) => resolved.push(value),
            Err(e) if e.is_missing_data() => last_error = Some(e),
            Err(e) => return Err(e),
        }
    }
    match (resolved.is_empty(), last_error) {
        (true, Some(e)) => Err(e),
        (true, None) => Err(no_operands(ListOperator::Merge)),
        (false, _) => Ok(resolved),
    }
}

fn no_operands(operator: ListOperator) -> GraphingError {
    GraphingError::Arithmetic(format!("{} without operands", operator.token()))
}

/// `count` is neutral: the other side's unit wins wherever one side is dimensionless.
fn combine_units(operator: BinaryOperator, left: UnitInfo, right: UnitInfo) -> UnitInfo {
    match operator {
        _ if right.id == COUNT_UNIT => left,
        BinaryOperator::Add | BinaryOperator::Subtract | BinaryOperator::Multiply
            if left.id == COUNT_UNIT =>
        {
            right
        }
        BinaryOperator::Add | BinaryOperator::Subtract => left,
        _ => UnitInfo::count(),
    }
}

fn is_constant(expression: &Expression) -> bool {
    expression.metric_names().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::parser::parse_expression;
    use crate::application::translator::translate_metrics;
    use crate::domain::perf_data::parse_perf_data;
    use crate::infrastructure::static_catalogue::StaticCatalogue;

    const DF_PERF_DATA: &str = "/=163651.992188;;;; fs_size=477500.03125;;;; growth=-1280.489081;;;;";

    fn translated(line: &str, check_command: &str, catalogue: &StaticCatalogue) -> TranslatedMetrics {
        let (samples, check_command) = parse_perf_data(line, check_command);
        translate_metrics(&samples, &check_command, catalogue).unwrap()
    }

    fn source() -> SourceIdentity {
        SourceIdentity::default()
    }

    #[test]
    fn test_rpn_stack_difference() {
        let catalogue = StaticCatalogue::builtin().unwrap();
        let translated = translated(DF_PERF_DATA, "check_mk-df", &catalogue);
        let evaluator = Evaluator::new(&translated, &catalogue);

        let expression = parse_expression("fs_size,fs_used,-", &translated).unwrap();
        assert_eq!(
            evaluator.compile_operation(&expression, &source(), None).unwrap(),
            MetricOperation::operator(
                "-",
                vec![
                    MetricOperation::rrd_source(&source(), "fs_size", None, 1048576.0),
                    MetricOperation::rrd_source(&source(), "_", None, 1048576.0),
                ],
            )
        );
    }

    #[test]
    fn test_rpn_stack_consolidation_override() {
        let catalogue = StaticCatalogue::builtin().unwrap();
        let translated = translated(DF_PERF_DATA, "check_mk-df", &catalogue);
        let evaluator = Evaluator::new(&translated, &catalogue);

        let expression = parse_expression("fs_growth.min,0,MIN,-1,*", &translated).unwrap();
        assert_eq!(
            evaluator
                .compile_operation(&expression, &source(), Some(ConsolidationFunction::Max))
                .unwrap(),
            MetricOperation::operator(
                "*",
                vec![
                    MetricOperation::operator(
                        "MIN",
                        vec![
                            MetricOperation::rrd_source(
                                &source(),
                                "growth",
                                Some(ConsolidationFunction::Min),
                                12.136296296296296,
                            ),
                            MetricOperation::Constant { value: 0.0 },
                        ],
                    ),
                    MetricOperation::Constant { value: -1.0 },
                ],
            )
        );
    }

    #[test]
    fn test_value_mode_applies_scale() {
        let catalogue = StaticCatalogue::builtin().unwrap();
        let translated = translated(DF_PERF_DATA, "check_mk-df", &catalogue);
        let evaluator = Evaluator::new(&translated, &catalogue);

        let used = evaluator.evaluate(&Expression::metric("fs_used")).unwrap();
        assert_eq!(used.value, 163651.992188 * 1048576.0);
        assert_eq!(used.unit.id, "IECNotation_B_AutoPrecision_2");
        assert_eq!(used.color.as_str(), "#1e90ff");

        let free = evaluator
            .evaluate(&parse_expression("fs_size,fs_used,-", &translated).unwrap())
            .unwrap();
        assert_eq!(free.value, (477500.03125 - 163651.992188) * 1048576.0);
        assert_eq!(free.unit.id, "IECNotation_B_AutoPrecision_2");
    }

    #[test]
    fn test_division_by_zero() {
        let catalogue = StaticCatalogue::builtin().unwrap();
        let translated = translated("x=4", "check_mk-local", &catalogue);
        let evaluator = Evaluator::new(&translated, &catalogue);

        let expression = parse_expression("x,0,/", &translated).unwrap();
        assert!(matches!(
            evaluator.evaluate(&expression),
            Err(GraphingError::Arithmetic(_))
        ));

        let expression = parse_expression("x,2,/", &translated).unwrap();
        assert_eq!(evaluator.evaluate(&expression).unwrap().value, 2.0);
    }

    #[test]
    fn test_list_operators() {
        let catalogue = StaticCatalogue::builtin().unwrap();
        let translated = translated(
            "load1=0.38;40;80;0;8 load5=0.62;40;80;0;8 load15=0.68;40;80;0;8",
            "check_mk-cpu.loads",
            &catalogue,
        );
        let evaluator = Evaluator::new(&translated, &catalogue);
        let value = |text: &str| {
            evaluator
                .evaluate(&parse_expression(text, &translated).unwrap())
                .unwrap()
                .value
        };

        assert_eq!(value("load1,load5,MIN"), 0.38);
        assert_eq!(value("load1,load5,load15,MAX:3"), 0.68);
        assert_eq!(value("load1,load5,load15,SUM:3"), 0.38 + 0.62 + 0.68);
        assert_eq!(value("load1,load15,AVERAGE"), (0.38 + 0.68) / 2.0);
        assert_eq!(value("load1:crit"), 80.0);
        assert_eq!(value("load5.max,90,PERCENTILE"), 0.62);
    }

    #[test]
    fn test_merge_falls_back_to_present_metric() {
        let catalogue = StaticCatalogue::builtin().unwrap();
        let translated = translated("load5=0.62", "check_mk-cpu.loads", &catalogue);
        let evaluator = Evaluator::new(&translated, &catalogue);

        let expression = parse_expression("load1,load5,MERGE", &translated).unwrap();
        let evaluated = evaluator.evaluate(&expression).unwrap();
        assert_eq!(evaluated.value, 0.62);
        assert_eq!(evaluated.color, translated["load5"].color);
        assert_eq!(
            evaluator.compile_operation(&expression, &source(), None).unwrap(),
            MetricOperation::rrd_source(&source(), "load5", None, 1.0)
        );

        let expression = parse_expression("load1,load15,MERGE", &translated).unwrap();
        assert!(matches!(
            evaluator.evaluate(&expression),
            Err(GraphingError::Resolution { .. })
        ));
    }

    #[test]
    fn test_missing_metric_and_scalar() {
        let catalogue = StaticCatalogue::builtin().unwrap();
        let translated = translated(DF_PERF_DATA, "check_mk-df", &catalogue);
        let evaluator = Evaluator::new(&translated, &catalogue);

        match evaluator.evaluate(&Expression::metric("level")) {
            Err(GraphingError::Resolution { metric, available }) => {
                assert_eq!(metric, "level");
                assert_eq!(available, "fs_growth, fs_size, fs_used");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            evaluator.evaluate(&Expression::scalar(ScalarKind::Warning, "fs_used")),
            Err(GraphingError::MissingScalar { .. })
        ));
    }

    #[test]
    fn test_metric_unit_color() {
        let catalogue = StaticCatalogue::builtin().unwrap();
        let optional = vec!["test".to_string()];

        let loads = translated(
            "load1=0.38;40;80;0;8 load5=0.62;40;80;0;8 load15=0.68;40;80;0;8",
            "check_mk-cpu.loads",
            &catalogue,
        );
        let evaluator = Evaluator::new(&loads, &catalogue);
        assert_eq!(
            evaluator
                .metric_unit_color(&parse_expression("load15", &loads).unwrap(), &optional)
                .unwrap(),
            Some(MetricUnitColor {
                unit: loads["load15"].unit.id.clone(),
                color: Color::fixed("#1e1ec8"),
            })
        );

        let local = translated("test=5;5;10;0;20", "check_mk-local", &catalogue);
        let evaluator = Evaluator::new(&local, &catalogue);
        assert_eq!(
            evaluator
                .metric_unit_color(&parse_expression("test", &local).unwrap(), &optional)
                .unwrap(),
            Some(MetricUnitColor {
                unit: "count".to_string(),
                color: Color::fixed("#cc00ff"),
            })
        );
    }

    #[test]
    fn test_metric_unit_color_skip() {
        let catalogue = StaticCatalogue::builtin().unwrap();
        let empty = translated("", "check_mk-local", &catalogue);
        let evaluator = Evaluator::new(&empty, &catalogue);

        let expression = parse_expression("test", &empty).unwrap();
        assert_eq!(
            evaluator
                .metric_unit_color(&expression, &["test".to_string()])
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_metric_unit_color_exception() {
        let catalogue = StaticCatalogue::builtin().unwrap();
        let local = translated("test=5;5;10;0;20", "check_mk-local", &catalogue);
        let evaluator = Evaluator::new(&local, &catalogue);

        let expression = parse_expression("level,altitude,+", &local).unwrap();
        assert!(matches!(
            evaluator.metric_unit_color(&expression, &["test".to_string()]),
            Err(GraphingError::Resolution { .. })
        ));
    }

    #[test]
    fn test_annotations_override_unit_and_color() {
        let catalogue = StaticCatalogue::builtin().unwrap();
        let translated = translated(DF_PERF_DATA, "check_mk-df", &catalogue);
        let evaluator = Evaluator::new(&translated, &catalogue);

        let expression =
            parse_expression("fs_used,fs_size,/,100,*@percentage#e3fff9", &translated).unwrap();
        let evaluated = evaluator.evaluate(&expression).unwrap();
        assert_eq!(evaluated.unit.id, "percentage");
        assert_eq!(evaluated.color.as_str(), "#e3fff9");
        assert!((evaluated.value - 163651.992188 / 477500.03125 * 100.0).abs() < 1e-9);

        let expression = parse_expression("fs_used@no_such_unit", &translated).unwrap();
        assert!(matches!(
            evaluator.evaluate(&expression),
            Err(GraphingError::ConfigIntegrity(_))
        ));
    }

    #[test]
    fn test_units_of_products_and_fractions() {
        let catalogue = StaticCatalogue::builtin().unwrap();
        let translated = translated(DF_PERF_DATA, "check_mk-df", &catalogue);
        let evaluator = Evaluator::new(&translated, &catalogue);
        let unit = |text: &str| {
            evaluator
                .evaluate(&parse_expression(text, &translated).unwrap())
                .unwrap()
                .unit
                .id
        };

        assert_eq!(unit("fs_used,2,*"), "IECNotation_B_AutoPrecision_2");
        assert_eq!(unit("2,fs_used,*"), "IECNotation_B_AutoPrecision_2");
        assert_eq!(unit("fs_used,fs_size,/"), "count");
        assert_eq!(unit("fs_used,2,/"), "IECNotation_B_AutoPrecision_2");
    }

    #[test]
    fn test_leading_constant_is_neutral() {
        let catalogue = StaticCatalogue::builtin().unwrap();
        let translated = translated(DF_PERF_DATA, "check_mk-df", &catalogue);
        let evaluator = Evaluator::new(&translated, &catalogue);
        let evaluate = |text: &str| {
            evaluator
                .evaluate(&parse_expression(text, &translated).unwrap())
                .unwrap()
        };

        let negated = evaluate("0,fs_used,-");
        assert_eq!(negated.value, -163651.992188 * 1048576.0);
        assert_eq!(negated.unit.id, "IECNotation_B_AutoPrecision_2");
        assert_eq!(negated.color.as_str(), "#1e90ff");

        let doubled = evaluate("2,fs_used,*");
        assert_eq!(doubled.unit.id, "IECNotation_B_AutoPrecision_2");
        assert_eq!(doubled.color.as_str(), "#1e90ff");

        let shifted = evaluate("1,fs_used,+");
        assert_eq!(shifted.unit.id, "IECNotation_B_AutoPrecision_2");
        assert_eq!(shifted.color.as_str(), "#1e90ff");

        let constant = evaluate("1,2,+");
        assert_eq!(constant.unit.id, "count");
        assert_eq!(constant.color.as_str(), "#7f7f7f");
    }

    #[test]
    fn test_title() {
        let catalogue = StaticCatalogue::builtin().unwrap();
        let translated = translated(DF_PERF_DATA, "check_mk-df", &catalogue);
        let evaluator = Evaluator::new(&translated, &catalogue);

        assert_eq!(evaluator.title(&Expression::metric("fs_size")), "Total size");
        assert_eq!(
            evaluator.title(&Expression::scalar(ScalarKind::Critical, "fs_used")),
            "Critical"
        );
        assert_eq!(evaluator.title(&Expression::Constant(5.0)), "5");
    }
}
