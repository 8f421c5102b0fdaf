//! Condition evaluation for `if`, `multi_if`, `loop_while` and `retry`

use super::session::Session;
use crate::error::{BotflowError, ErrorCode, Result};
use crate::resolver::{self, calc};
use crate::script::{Condition, MatchMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
}

impl Operator {
    fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().to_ascii_lowercase().replace('_', " ");
        let operator = match normalized.as_str() {
            "equal to" | "equals" | "=" | "==" => Operator::Equal,
            "not equal to" | "!=" | "<>" => Operator::NotEqual,
            "greater than" | ">" => Operator::Greater,
            "greater than or equal to" | ">=" => Operator::GreaterOrEqual,
            "less than" | "<" => Operator::Less,
            "less than or equal to" | "<=" => Operator::LessOrEqual,
            "contains" => Operator::Contains,
            "does not contain" => Operator::NotContains,
            "starts with" => Operator::StartsWith,
            "ends with" => Operator::EndsWith,
            _ => return None,
        };
        Some(operator)
    }

    fn is_ordering(self) -> bool {
        matches!(
            self,
            Operator::Greater | Operator::GreaterOrEqual | Operator::Less | Operator::LessOrEqual
        )
    }
}

fn number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn compare(left: &str, operator: Operator, right: &str) -> Result<bool> {
    let numbers = number(left).zip(number(right));
    if operator.is_ordering() && numbers.is_none() {
        return Err(BotflowError::domain_with_code(
            ErrorCode::DOMAIN_CONDITION,
            format!("Cannot compare '{}' and '{}' as numbers", left, right),
            None,
        ));
    }
    let outcome = match (operator, numbers) {
        (Operator::Equal, Some((a, b))) => a == b,
        (Operator::NotEqual, Some((a, b))) => a != b,
        (Operator::Equal, None) => left == right,
        (Operator::NotEqual, None) => left != right,
        (Operator::Greater, Some((a, b))) => a > b,
        (Operator::GreaterOrEqual, Some((a, b))) => a >= b,
        (Operator::Less, Some((a, b))) => a < b,
        (Operator::LessOrEqual, Some((a, b))) => a <= b,
        (Operator::Contains, _) => left.contains(right),
        (Operator::NotContains, _) => !left.contains(right),
        (Operator::StartsWith, _) => left.starts_with(right),
        (Operator::EndsWith, _) => left.ends_with(right),
        _ => false,
    };
    Ok(outcome)
}

pub fn evaluate(condition: &Condition, session: &mut Session) -> Result<bool> {
    match condition {
        Condition::Value {
            left,
            operator,
            right,
        } => {
            let op = Operator::parse(operator).ok_or_else(|| {
                BotflowError::domain_with_code(
                    ErrorCode::DOMAIN_CONDITION,
                    format!("Unknown comparison operator '{}'", operator),
                    None,
                )
            })?;
            let left = session.resolve(left)?;
            let right = session.resolve(right)?;
            compare(&left, op, &right)
        }
        Condition::HasValue { variable } => match resolver::lookup(variable, session) {
            Some(found) => Ok(!found.display_value()?.is_empty()),
            None => Ok(false),
        },
        Condition::IsNumeric { value } => Ok(number(&session.resolve(value)?).is_some()),
        Condition::Expression { expression } => {
            let resolved = session.resolve(expression)?;
            let value = calc::evaluate(&resolved).map_err(|e| {
                BotflowError::format_with_code(
                    ErrorCode::FORMAT_INVALID_EXPRESSION,
                    format!("Cannot evaluate '{}': {}", resolved, e),
                )
            })?;
            Ok(value.is_truthy())
        }
    }
}

/// Combine several conditions; `any` short-circuits on the first true one
pub fn evaluate_all(conditions: &[Condition], mode: MatchMode, session: &mut Session) -> Result<bool> {
    for condition in conditions {
        let holds = evaluate(condition, session)?;
        match mode {
            MatchMode::All if !holds => return Ok(false),
            MatchMode::Any if holds => return Ok(true),
            _ => {}
        }
    }
    Ok(matches!(mode, MatchMode::All))
}
