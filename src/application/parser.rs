// Expression parser - RPN text to expression tree
use crate::domain::color::Color;
use crate::domain::error::ParseError;
use crate::domain::expression::{
    BinaryOperator, ConsolidationFunction, Expression, ListOperator, ScalarKind,
};
use crate::domain::metric::TranslatedMetrics;

const PERCENTILE: &str = "PERCENTILE";

/// Parse `tokens[,tokens...][@unit][#rrggbb]`.
pub fn parse_expression(text: &str, translated: &TranslatedMetrics) -> Result<Expression, ParseError> {
    let (text, color) = match text.rsplit_once('#') {
        Some((rest, color)) => (rest, Some(Color::parse(&format!("#{}", color))?)),
        None => (text, None),
    };
    let (text, unit) = match text.rsplit_once('@') {
        Some((rest, unit)) if !unit.trim().is_empty() => (rest, Some(unit.trim().to_string())),
        Some((_, unit)) => return Err(ParseError::InvalidToken(format!("@{}", unit))),
        None => (text, None),
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }
    let expression = parse_tokens(text.split(','), translated)?;

    if unit.is_none() && color.is_none() {
        return Ok(expression);
    }
    Ok(Expression::Annotated {
        expression: Box::new(expression),
        unit,
        color,
    })
}

/// Stack-machine parse of an already tokenized expression.
pub fn parse_tokens<'a>(
    tokens: impl IntoIterator<Item = &'a str>,
    translated: &TranslatedMetrics,
) -> Result<Expression, ParseError> {
    let mut stack: Vec<Expression> = Vec::new();
    let mut consumed = Vec::new();

    for token in tokens {
        let token = token.trim();
        consumed.push(token);

        if translated.contains_key(token) {
            stack.push(Expression::metric(token));
            continue;
        }

        if let Some(value) = parse_constant(token) {
            stack.push(Expression::Constant(value));
            continue;
        }

        if let Some(operator) = BinaryOperator::from_token(token) {
            let mut operands = pop(&mut stack, token, 2)?;
            let right = operands.pop();
            let left = operands.pop();
            if let (Some(left), Some(right)) = (left, right) {
                stack.push(Expression::binary(operator, left, right));
            }
            continue;
        }

        if token == PERCENTILE {
            let mut operands = pop(&mut stack, token, 2)?;
            match (operands.pop(), operands.pop()) {
                (Some(Expression::Constant(percent)), Some(expression))
                    if (0.0..=100.0).contains(&percent) =>
                {
                    stack.push(Expression::Percentile {
                        expression: Box::new(expression),
                        percent,
                    });
                }
                _ => return Err(ParseError::InvalidToken(token.to_string())),
            }
            continue;
        }

        if let Some((operator, arity)) = list_operator(token)? {
            let operands = pop(&mut stack, token, arity)?;
            stack.push(Expression::List { operator, operands });
            continue;
        }

        stack.push(parse_metric(token)?);
    }

    match stack.len() {
        0 => Err(ParseError::Empty),
        1 => Ok(stack.remove(0)),
        count => Err(ParseError::LeftoverOperands {
            expression: consumed.join(","),
            count,
        }),
    }
}

fn parse_constant(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Pop `count` operands, returned in push order.
fn pop(stack: &mut Vec<Expression>, operator: &str, count: usize) -> Result<Vec<Expression>, ParseError> {
    if stack.len() < count {
        return Err(ParseError::StackUnderflow {
            operator: operator.to_string(),
            needed: count,
            available: stack.len(),
        });
    }
    Ok(stack.split_off(stack.len() - count))
}

/// `MIN` pops two operands, `MIN:4` pops four.
fn list_operator(token: &str) -> Result<Option<(ListOperator, usize)>, ParseError> {
    let (name, arity) = match token.split_once(':') {
        Some((name, arity)) => (name, Some(arity)),
        None => (token, None),
    };
    let Some(operator) = ListOperator::from_token(name) else {
        return Ok(None);
    };
    match arity {
        None => Ok(Some((operator, 2))),
        Some(arity) => match arity.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Some((operator, n))),
            _ => Err(ParseError::InvalidSuffix {
                token: token.to_string(),
                suffix: arity.to_string(),
            }),
        },
    }
}

fn is_reserved_operator(token: &str) -> bool {
    let all_caps = token.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && token
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_' || c == ':');
    let symbolic = !token.is_empty() && !token.chars().any(|c| c.is_ascii_alphanumeric() || c == '_');
    all_caps || symbolic
}

fn is_metric_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `name`, `name.max` (consolidation override) or `name:warn` (threshold scalar).
fn parse_metric(token: &str) -> Result<Expression, ParseError> {
    if is_reserved_operator(token) {
        return Err(ParseError::UnknownOperator(token.to_string()));
    }

    if let Some((name, suffix)) = token.split_once(':') {
        check_name(token, name)?;
        let kind = ScalarKind::from_suffix(suffix).ok_or_else(|| invalid_suffix(token, suffix))?;
        return Ok(Expression::scalar(kind, name));
    }

    if let Some((name, suffix)) = token.rsplit_once('.') {
        check_name(token, name)?;
        let consolidation = suffix
            .parse::<ConsolidationFunction>()
            .map_err(|_| invalid_suffix(token, suffix))?;
        return Ok(Expression::Metric {
            name: name.to_string(),
            consolidation: Some(consolidation),
        });
    }

    check_name(token, token)?;
    Ok(Expression::metric(token))
}

fn check_name(token: &str, name: &str) -> Result<(), ParseError> {
    if is_metric_name(name) {
        Ok(())
    } else {
        Err(ParseError::InvalidToken(token.to_string()))
    }
}

fn invalid_suffix(token: &str, suffix: &str) -> ParseError {
    ParseError::InvalidSuffix {
        token: token.to_string(),
        suffix: suffix.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::translator::translate_metrics;
    use crate::domain::perf_data::RawSample;
    use crate::infrastructure::static_catalogue::StaticCatalogue;

    fn parse(text: &str) -> Result<Expression, ParseError> {
        parse_expression(text, &TranslatedMetrics::new())
    }

    #[test]
    fn test_binary_operator() {
        assert_eq!(
            parse("a,b,+").unwrap(),
            Expression::binary(BinaryOperator::Add, Expression::metric("a"), Expression::metric("b"))
        );
    }

    #[test]
    fn test_nested_with_consolidation_override() {
        let expression = parse("fs_growth.min,0,MIN,-1,*").unwrap();
        assert_eq!(
            expression,
            Expression::binary(
                BinaryOperator::Multiply,
                Expression::List {
                    operator: ListOperator::Minimum,
                    operands: vec![
                        Expression::Metric {
                            name: "fs_growth".to_string(),
                            consolidation: Some(ConsolidationFunction::Min),
                        },
                        Expression::Constant(0.0),
                    ],
                },
                Expression::Constant(-1.0),
            )
        );
    }

    #[test]
    fn test_parse_is_left_inverse_of_display() {
        for text in [
            "fs_size,fs_used,-",
            "fs_growth.min,0,MIN,-1,*",
            "a,b,c,MERGE:3",
            "fs_used:warn",
            "load1,load5,load15,AVERAGE:3,2,/",
            "rta.average,95,PERCENTILE",
            "fs_used,fs_size,/,100,*@percentage#1e90ff",
        ] {
            assert_eq!(parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_scalar_suffixes() {
        assert_eq!(
            parse("fs_used:crit").unwrap(),
            Expression::scalar(ScalarKind::Critical, "fs_used")
        );
        assert_eq!(
            parse("fs_used:median"),
            Err(ParseError::InvalidSuffix {
                token: "fs_used:median".to_string(),
                suffix: "median".to_string(),
            })
        );
        assert!(matches!(parse("fs_used.median"), Err(ParseError::InvalidSuffix { .. })));
    }

    #[test]
    fn test_annotations() {
        let expression = parse("fs_size,fs_used,-#e3fff9").unwrap();
        match expression {
            Expression::Annotated { unit, color, .. } => {
                assert_eq!(unit, None);
                assert_eq!(color.map(String::from), Some("#e3fff9".to_string()));
            }
            other => panic!("expected annotation, got {:?}", other),
        }
        assert_eq!(parse("a#12"), Err(ParseError::InvalidColor("#12".to_string())));
    }

    #[test]
    fn test_translated_names_win_over_numbers() {
        let catalogue = StaticCatalogue::builtin().unwrap();
        let mut translated =
            translate_metrics(&[RawSample::new("test", 1.0)], "check_mk-local", &catalogue).unwrap();
        let metric = translated["test"].clone();
        translated.insert("1".to_string(), metric);

        assert_eq!(parse_expression("1", &translated).unwrap(), Expression::metric("1"));
        assert_eq!(parse("1").unwrap(), Expression::Constant(1.0));
    }

    #[test]
    fn test_empty_expression() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(parse_tokens(Vec::<&str>::new(), &TranslatedMetrics::new()), Err(ParseError::Empty));
    }

    #[test]
    fn test_stack_underflow() {
        assert_eq!(
            parse("a,+"),
            Err(ParseError::StackUnderflow {
                operator: "+".to_string(),
                needed: 2,
                available: 1,
            })
        );
        assert!(matches!(parse("a,b,MERGE:3"), Err(ParseError::StackUnderflow { needed: 3, .. })));
    }

    #[test]
    fn test_leftover_operands() {
        assert_eq!(
            parse("a,b,c,+"),
            Err(ParseError::LeftoverOperands {
                expression: "a,b,c,+".to_string(),
                count: 2,
            })
        );
    }

    #[test]
    fn test_unknown_operator_and_invalid_tokens() {
        assert_eq!(parse("a,b,POW"), Err(ParseError::UnknownOperator("POW".to_string())));
        assert_eq!(parse("a,b,^"), Err(ParseError::UnknownOperator("^".to_string())));
        assert_eq!(parse("a,,+"), Err(ParseError::InvalidToken(String::new())));
        assert!(matches!(parse("a,b,MIN:0"), Err(ParseError::InvalidSuffix { .. })));
        assert_eq!(parse("a,b,PERCENTILE"), Err(ParseError::InvalidToken("PERCENTILE".to_string())));
    }
}
