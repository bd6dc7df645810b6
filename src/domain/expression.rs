// Metric expression tree, resolved against current values
use super::color::Color;
use super::error::GraphingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsolidationFunction {
    Max,
    Min,
    Average,
}

impl ConsolidationFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsolidationFunction::Max => "max",
            ConsolidationFunction::Min => "min",
            ConsolidationFunction::Average => "average",
        }
    }
}

impl FromStr for ConsolidationFunction {
    type Err = GraphingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(ConsolidationFunction::Max),
            "min" => Ok(ConsolidationFunction::Min),
            "average" => Ok(ConsolidationFunction::Average),
            other => Err(GraphingError::Arithmetic(format!(
                "invalid consolidation function '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ConsolidationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOperator {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "+" => Some(BinaryOperator::Add),
            "-" => Some(BinaryOperator::Subtract),
            "*" => Some(BinaryOperator::Multiply),
            "/" => Some(BinaryOperator::Divide),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOperator {
    Sum,
    Minimum,
    Maximum,
    Average,
    /// First operand that resolves; used for fallback chains over optional metrics.
    Merge,
}

impl ListOperator {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "SUM" => Some(ListOperator::Sum),
            "MIN" => Some(ListOperator::Minimum),
            "MAX" => Some(ListOperator::Maximum),
            "AVERAGE" => Some(ListOperator::Average),
            "MERGE" => Some(ListOperator::Merge),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            ListOperator::Sum => "SUM",
            ListOperator::Minimum => "MIN",
            ListOperator::Maximum => "MAX",
            ListOperator::Average => "AVERAGE",
            ListOperator::Merge => "MERGE",
        }
    }
}

/// Threshold fields carried by a translated metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Warning,
    Critical,
    Minimum,
    Maximum,
}

impl ScalarKind {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "warn" => Some(ScalarKind::Warning),
            "crit" => Some(ScalarKind::Critical),
            "min" => Some(ScalarKind::Minimum),
            "max" => Some(ScalarKind::Maximum),
            _ => None,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            ScalarKind::Warning => "warn",
            ScalarKind::Critical => "crit",
            ScalarKind::Minimum => "min",
            ScalarKind::Maximum => "max",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ScalarKind::Warning => "Warning",
            ScalarKind::Critical => "Critical",
            ScalarKind::Minimum => "Minimum",
            ScalarKind::Maximum => "Maximum",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(f64),
    Metric {
        name: String,
        consolidation: Option<ConsolidationFunction>,
    },
    /// `WarningOf`, `CriticalOf`, `MinimumOf`, `MaximumOf` of a metric.
    Scalar {
        kind: ScalarKind,
        metric: String,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    List {
        operator: ListOperator,
        operands: Vec<Expression>,
    },
    Percentile {
        expression: Box<Expression>,
        percent: f64,
    },
    /// Explicit unit and/or color attached to a whole expression.
    Annotated {
        expression: Box<Expression>,
        unit: Option<String>,
        color: Option<Color>,
    },
}

impl Expression {
    pub fn metric(name: impl Into<String>) -> Self {
        Expression::Metric {
            name: name.into(),
            consolidation: None,
        }
    }

    pub fn scalar(kind: ScalarKind, metric: impl Into<String>) -> Self {
        Expression::Scalar {
            kind,
            metric: metric.into(),
        }
    }

    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn with_color(self, color: Color) -> Self {
        match self {
            Expression::Annotated {
                expression, unit, ..
            } => Expression::Annotated {
                expression,
                unit,
                color: Some(color),
            },
            other => Expression::Annotated {
                expression: Box::new(other),
                unit: None,
                color: Some(color),
            },
        }
    }

    /// Every metric name the expression references, in order of appearance.
    pub fn metric_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_metric_names(&mut names);
        names
    }

    fn collect_metric_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expression::Constant(_) => {}
            Expression::Metric { name, .. } => names.push(name),
            Expression::Scalar { metric, .. } => names.push(metric),
            Expression::Binary { left, right, .. } => {
                left.collect_metric_names(names);
                right.collect_metric_names(names);
            }
            Expression::List { operands, .. } => {
                for operand in operands {
                    operand.collect_metric_names(names);
                }
            }
            Expression::Percentile { expression, .. }
            | Expression::Annotated { expression, .. } => expression.collect_metric_names(names),
        }
    }
}

/// Canonical RPN text; parsing it yields the same tree.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(value) => write!(f, "{}", value),
            Expression::Metric {
                name,
                consolidation: None,
            } => f.write_str(name),
            Expression::Metric {
                name,
                consolidation: Some(cf),
            } => write!(f, "{}.{}", name, cf),
            Expression::Scalar { kind, metric } => write!(f, "{}:{}", metric, kind.suffix()),
            Expression::Binary {
                operator,
                left,
                right,
            } => write!(f, "{},{},{}", left, right, operator.token()),
            Expression::List { operator, operands } => {
                for operand in operands {
                    write!(f, "{},", operand)?;
                }
                if operands.len() == 2 {
                    f.write_str(operator.token())
                } else {
                    write!(f, "{}:{}", operator.token(), operands.len())
                }
            }
            Expression::Percentile {
                expression,
                percent,
            } => write!(f, "{},{},PERCENTILE", expression, percent),
            Expression::Annotated {
                expression,
                unit,
                color,
            } => {
                write!(f, "{}", expression)?;
                if let Some(unit) = unit {
                    write!(f, "@{}", unit)?;
                }
                if let Some(color) = color {
                    write!(f, "{}", color)?;
                }
                Ok(())
            }
        }
    }
}
