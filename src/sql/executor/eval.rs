//! Expression evaluation with SQL three-valued logic.
//!
//! Comparisons propagate null; AND short-circuits false over null, OR
//! short-circuits true over null, NOT of null is null. `IS [NOT] NULL`
//! always yields a boolean.

use std::cmp::Ordering;

use regex::RegexBuilder;

use crate::error::{RelicError, RelicResult};
use crate::sql::ast::{BinaryOp, Expr, UnaryOp};
use crate::sql::executor::{ExecutionContext, JoinRow};
use crate::value::{Value, compare_values};

/// Evaluates an expression against a working row.
pub(crate) fn eval_expr(
    expr: &Expr,
    row: &JoinRow,
    ctx: &ExecutionContext<'_>,
) -> RelicResult<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Column(col) => ctx.resolve(col, row),
        Expr::Binary { left, op, right } => {
            let left = eval_expr(left, row, ctx)?;
            let right = eval_expr(right, row, ctx)?;
            apply_binary(*op, left, right)
        }
        Expr::Unary { op, operand } => {
            let operand = eval_expr(operand, row, ctx)?;
            Ok(apply_unary(*op, operand))
        }
        Expr::Star { .. } => Err(RelicError::Semantic(
            "'*' is only valid in a select list".to_string(),
        )),
    }
}

/// Evaluates an expression with nothing in scope — INSERT values and
/// constant SELECTs.
pub(crate) fn eval_const(expr: &Expr) -> RelicResult<Value> {
    eval_expr(expr, &JoinRow::default(), &ExecutionContext::new())
}

/// Boolean filter semantics: a missing condition matches, and a null
/// result is treated as false.
pub(crate) fn eval_predicate(
    condition: Option<&Expr>,
    row: &JoinRow,
    ctx: &ExecutionContext<'_>,
) -> RelicResult<bool> {
    match condition {
        None => Ok(true),
        Some(expr) => Ok(eval_expr(expr, row, ctx)?.as_truthy().unwrap_or(false)),
    }
}

fn apply_binary(op: BinaryOp, left: Value, right: Value) -> RelicResult<Value> {
    match op {
        BinaryOp::And => {
            let result = match (left.as_truthy(), right.as_truthy()) {
                (Some(false), _) | (_, Some(false)) => Value::Boolean(false),
                (None, _) | (_, None) => Value::Null,
                (Some(a), Some(b)) => Value::Boolean(a && b),
            };
            Ok(result)
        }
        BinaryOp::Or => {
            let result = match (left.as_truthy(), right.as_truthy()) {
                (Some(true), _) | (_, Some(true)) => Value::Boolean(true),
                (None, _) | (_, None) => Value::Null,
                (Some(a), Some(b)) => Value::Boolean(a || b),
            };
            Ok(result)
        }
        BinaryOp::Like => {
            if left.is_null() || right.is_null() {
                return Ok(Value::Null);
            }
            let Value::Text(pattern) = &right else {
                return Err(RelicError::TypeMismatch {
                    expected: "TEXT".to_string(),
                    actual: right.type_name().to_string(),
                    column: None,
                });
            };
            Ok(Value::Boolean(like_match(&left.to_string(), pattern)?))
        }
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            if left.is_null() || right.is_null() {
                return Ok(Value::Null);
            }
            let ord = compare_values(&left, &right);
            let result = match op {
                BinaryOp::Eq => ord == Ordering::Equal,
                BinaryOp::Ne => ord != Ordering::Equal,
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::Le => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                BinaryOp::Ge => ord != Ordering::Less,
                _ => unreachable!("handled above"),
            };
            Ok(Value::Boolean(result))
        }
    }
}

fn apply_unary(op: UnaryOp, operand: Value) -> Value {
    match op {
        UnaryOp::Not => match operand.as_truthy() {
            None => Value::Null,
            Some(b) => Value::Boolean(!b),
        },
        UnaryOp::IsNull => Value::Boolean(operand.is_null()),
        UnaryOp::IsNotNull => Value::Boolean(!operand.is_null()),
    }
}

/// Case-insensitive LIKE. `%` matches any run, `_` a single character;
/// every other character matches itself, so regex metacharacters in the
/// pattern are escaped before translation.
fn like_match(text: &str, pattern: &str) -> RelicResult<bool> {
    let mut translated = String::with_capacity(pattern.len() + 2);
    translated.push('^');
    let mut buf = [0u8; 4];
    for ch in pattern.chars() {
        match ch {
            '%' => translated.push_str(".*"),
            '_' => translated.push('.'),
            ch => translated.push_str(&regex::escape(ch.encode_utf8(&mut buf))),
        }
    }
    translated.push('$');

    let matcher = RegexBuilder::new(&translated)
        .case_insensitive(true)
        .build()
        .map_err(|e| RelicError::Semantic(format!("invalid LIKE pattern: {e}")))?;
    Ok(matcher.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(value: Value) -> Expr {
        Expr::Literal(value)
    }

    fn binary(left: Value, op: BinaryOp, right: Value) -> Value {
        apply_binary(op, left, right).unwrap()
    }

    const T: Value = Value::Boolean(true);
    const F: Value = Value::Boolean(false);
    const N: Value = Value::Null;

    #[test]
    fn and_truth_table() {
        assert_eq!(binary(T, BinaryOp::And, T), T);
        assert_eq!(binary(T, BinaryOp::And, F), F);
        assert_eq!(binary(F, BinaryOp::And, N), F);
        assert_eq!(binary(N, BinaryOp::And, F), F);
        assert_eq!(binary(T, BinaryOp::And, N), N);
        assert_eq!(binary(N, BinaryOp::And, N), N);
    }

    #[test]
    fn or_truth_table() {
        assert_eq!(binary(F, BinaryOp::Or, F), F);
        assert_eq!(binary(T, BinaryOp::Or, N), T);
        assert_eq!(binary(N, BinaryOp::Or, T), T);
        assert_eq!(binary(F, BinaryOp::Or, N), N);
        assert_eq!(binary(N, BinaryOp::Or, N), N);
    }

    #[test]
    fn not_propagates_null() {
        assert_eq!(apply_unary(UnaryOp::Not, T), F);
        assert_eq!(apply_unary(UnaryOp::Not, F), T);
        assert_eq!(apply_unary(UnaryOp::Not, N), N);
    }

    #[test]
    fn comparisons_propagate_null() {
        assert_eq!(binary(N, BinaryOp::Eq, N), N);
        assert_eq!(binary(Value::Integer(1), BinaryOp::Eq, N), N);
        assert_eq!(binary(N, BinaryOp::Lt, Value::Integer(1)), N);
    }

    #[test]
    fn comparison_operators() {
        let one = Value::Integer(1);
        let two = Value::Integer(2);
        assert_eq!(binary(one.clone(), BinaryOp::Lt, two.clone()), T);
        assert_eq!(binary(one.clone(), BinaryOp::Le, one.clone()), T);
        assert_eq!(binary(two.clone(), BinaryOp::Gt, one.clone()), T);
        assert_eq!(binary(one.clone(), BinaryOp::Ge, two.clone()), F);
        assert_eq!(binary(one.clone(), BinaryOp::Ne, two.clone()), T);
        assert_eq!(binary(one.clone(), BinaryOp::Eq, one.clone()), T);
    }

    #[test]
    fn is_null_yields_boolean_even_for_null() {
        assert_eq!(apply_unary(UnaryOp::IsNull, N), T);
        assert_eq!(apply_unary(UnaryOp::IsNull, Value::Integer(0)), F);
        assert_eq!(apply_unary(UnaryOp::IsNotNull, N), F);
        assert_eq!(apply_unary(UnaryOp::IsNotNull, Value::Text("x".into())), T);
    }

    #[test]
    fn like_is_case_insensitive() {
        assert!(like_match("ABCxyz", "abc%").unwrap());
        assert!(like_match("abc", "ABC").unwrap());
        assert!(!like_match("xabc", "abc%").unwrap());
    }

    #[test]
    fn like_wildcards() {
        assert!(like_match("abc", "%").unwrap());
        assert!(like_match("abc", "_bc").unwrap());
        assert!(!like_match("abbc", "_bc").unwrap());
        assert!(like_match("a1b2c3", "a%c_").unwrap());
    }

    #[test]
    fn like_is_anchored_at_both_ends() {
        assert!(!like_match("abcd", "abc").unwrap());
        assert!(!like_match("zabc", "abc").unwrap());
    }

    #[test]
    fn like_escapes_regex_metacharacters() {
        assert!(like_match("abc.def", "abc.def").unwrap());
        assert!(!like_match("abcxdef", "abc.def").unwrap());
        assert!(like_match("a+b", "a+b").unwrap());
        assert!(like_match("(1)", "(_)").unwrap());
    }

    #[test]
    fn like_null_operands_yield_null() {
        assert_eq!(binary(N, BinaryOp::Like, Value::Text("%".into())), N);
        assert_eq!(binary(Value::Text("x".into()), BinaryOp::Like, N), N);
    }

    #[test]
    fn like_rejects_non_text_pattern() {
        assert!(apply_binary(BinaryOp::Like, Value::Text("x".into()), Value::Integer(1)).is_err());
    }

    #[test]
    fn const_eval_literals_only() {
        assert_eq!(eval_const(&lit(Value::Integer(5))).unwrap(), Value::Integer(5));
        let unknown = Expr::Column(crate::sql::ast::ColumnRef {
            table: None,
            column: "ghost".to_string(),
        });
        assert!(matches!(
            eval_const(&unknown),
            Err(RelicError::ColumnNotFound { .. })
        ));
    }
}
