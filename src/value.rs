//! Value domains and the coercion/comparison policy.
//!
//! Every cell in the engine holds a [`Value`]: null, a 64-bit integer, a
//! 64-bit float, text, or a boolean. Booleans and integers are distinct
//! domains — a boolean is never accepted where an integer is required and
//! vice versa.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{RelicError, RelicResult};

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
}

impl Value {
    /// Returns true for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The domain name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
            Value::Boolean(_) => "BOOLEAN",
        }
    }

    /// Truthiness for predicate contexts. Null has no truth value.
    pub fn as_truthy(&self) -> Option<bool> {
        match self {
            Value::Null => None,
            Value::Integer(i) => Some(*i != 0),
            Value::Real(f) => Some(*f != 0.0),
            Value::Text(s) => Some(!s.is_empty()),
            Value::Boolean(b) => Some(*b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Boolean(true) => write!(f, "TRUE"),
            Value::Boolean(false) => write!(f, "FALSE"),
        }
    }
}

// Values are used as index keys and unique-set members. Floats hash by bit
// pattern; coercion guarantees a column never mixes domains.
impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => state.write_u8(0),
            Value::Integer(i) => {
                state.write_u8(1);
                i.hash(state);
            }
            Value::Real(r) => {
                state.write_u8(2);
                r.to_bits().hash(state);
            }
            Value::Text(s) => {
                state.write_u8(3);
                s.hash(state);
            }
            Value::Boolean(b) => {
                state.write_u8(4);
                b.hash(state);
            }
        }
    }
}

/// The declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Text,
    Real,
    Boolean,
}

impl DataType {
    /// Parses a type keyword, case-insensitively. Each type accepts the
    /// aliases common across SQL dialects.
    pub fn from_keyword(keyword: &str) -> Option<DataType> {
        match keyword.to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" => Some(DataType::Integer),
            "TEXT" | "VARCHAR" | "STRING" => Some(DataType::Text),
            "REAL" | "FLOAT" | "DOUBLE" => Some(DataType::Real),
            "BOOLEAN" | "BOOL" => Some(DataType::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Integer => "INTEGER",
            DataType::Text => "TEXT",
            DataType::Real => "REAL",
            DataType::Boolean => "BOOLEAN",
        };
        write!(f, "{name}")
    }
}

fn mismatch(data_type: DataType, value: &Value, column: Option<&str>) -> RelicError {
    RelicError::TypeMismatch {
        expected: data_type.to_string(),
        actual: value.type_name().to_string(),
        column: column.map(str::to_string),
    }
}

/// Validates a value against a column type, coercing where the dialect
/// allows it.
///
/// Null passes through unchanged. INTEGER accepts fraction-free reals and
/// parseable text but rejects booleans; REAL promotes integers and parses
/// text; TEXT stringifies anything; BOOLEAN accepts integers (zero is
/// false) and the usual textual spellings.
pub fn validate_and_coerce(
    value: Value,
    data_type: DataType,
    column: Option<&str>,
) -> RelicResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match data_type {
        DataType::Integer => match value {
            Value::Integer(_) => Ok(value),
            Value::Real(f) if f.fract() == 0.0 => Ok(Value::Integer(f as i64)),
            Value::Text(ref s) => match s.trim().parse::<i64>() {
                Ok(i) => Ok(Value::Integer(i)),
                Err(_) => Err(mismatch(data_type, &value, column)),
            },
            _ => Err(mismatch(data_type, &value, column)),
        },
        DataType::Real => match value {
            Value::Integer(i) => Ok(Value::Real(i as f64)),
            Value::Real(_) => Ok(value),
            Value::Text(ref s) => match s.trim().parse::<f64>() {
                Ok(f) => Ok(Value::Real(f)),
                Err(_) => Err(mismatch(data_type, &value, column)),
            },
            _ => Err(mismatch(data_type, &value, column)),
        },
        DataType::Text => match value {
            Value::Text(_) => Ok(value),
            other => Ok(Value::Text(other.to_string())),
        },
        DataType::Boolean => match value {
            Value::Boolean(_) => Ok(value),
            Value::Integer(i) => Ok(Value::Boolean(i != 0)),
            Value::Text(ref s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Boolean(true)),
                "false" | "0" | "no" | "off" => Ok(Value::Boolean(false)),
                _ => Err(mismatch(data_type, &value, column)),
            },
            _ => Err(mismatch(data_type, &value, column)),
        },
    }
}

/// Total ordering over values, used for index keys and ORDER BY.
///
/// Null equals null and sorts below any non-null value. Integers and reals
/// compare numerically; the remaining cross-domain pairs fall back to a
/// fixed domain rank so sorting never panics.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Real(x), Value::Real(y)) => x.total_cmp(y),
        (Value::Integer(x), Value::Real(y)) => (*x as f64).total_cmp(y),
        (Value::Real(x), Value::Integer(y)) => x.total_cmp(&(*y as f64)),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        _ => domain_rank(a).cmp(&domain_rank(b)),
    }
}

fn domain_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Boolean(_) => 1,
        Value::Integer(_) | Value::Real(_) => 2,
        Value::Text(_) => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_passes_through_any_type() {
        for dt in [
            DataType::Integer,
            DataType::Text,
            DataType::Real,
            DataType::Boolean,
        ] {
            assert_eq!(validate_and_coerce(Value::Null, dt, None).unwrap(), Value::Null);
        }
    }

    #[test]
    fn integer_accepts_integral_real_and_text() {
        assert_eq!(
            validate_and_coerce(Value::Integer(7), DataType::Integer, None).unwrap(),
            Value::Integer(7)
        );
        assert_eq!(
            validate_and_coerce(Value::Real(4.0), DataType::Integer, None).unwrap(),
            Value::Integer(4)
        );
        assert_eq!(
            validate_and_coerce(Value::Text("-12".into()), DataType::Integer, None).unwrap(),
            Value::Integer(-12)
        );
    }

    #[test]
    fn integer_rejects_fractional_real_and_boolean() {
        assert!(validate_and_coerce(Value::Real(4.5), DataType::Integer, None).is_err());
        assert!(validate_and_coerce(Value::Boolean(true), DataType::Integer, None).is_err());
        assert!(validate_and_coerce(Value::Text("abc".into()), DataType::Integer, None).is_err());
    }

    #[test]
    fn real_promotes_integer_and_parses_text() {
        assert_eq!(
            validate_and_coerce(Value::Integer(3), DataType::Real, None).unwrap(),
            Value::Real(3.0)
        );
        assert_eq!(
            validate_and_coerce(Value::Text("2.5".into()), DataType::Real, None).unwrap(),
            Value::Real(2.5)
        );
        assert!(validate_and_coerce(Value::Boolean(false), DataType::Real, None).is_err());
    }

    #[test]
    fn text_stringifies_everything() {
        assert_eq!(
            validate_and_coerce(Value::Integer(42), DataType::Text, None).unwrap(),
            Value::Text("42".into())
        );
        assert_eq!(
            validate_and_coerce(Value::Boolean(true), DataType::Text, None).unwrap(),
            Value::Text("TRUE".into())
        );
    }

    #[test]
    fn boolean_accepts_integers_and_spellings() {
        assert_eq!(
            validate_and_coerce(Value::Integer(0), DataType::Boolean, None).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            validate_and_coerce(Value::Integer(5), DataType::Boolean, None).unwrap(),
            Value::Boolean(true)
        );
        for s in ["true", "1", "YES", "On"] {
            assert_eq!(
                validate_and_coerce(Value::Text(s.into()), DataType::Boolean, None).unwrap(),
                Value::Boolean(true)
            );
        }
        for s in ["false", "0", "no", "OFF"] {
            assert_eq!(
                validate_and_coerce(Value::Text(s.into()), DataType::Boolean, None).unwrap(),
                Value::Boolean(false)
            );
        }
        assert!(validate_and_coerce(Value::Text("maybe".into()), DataType::Boolean, None).is_err());
        assert!(validate_and_coerce(Value::Real(1.0), DataType::Boolean, None).is_err());
    }

    #[test]
    fn mismatch_error_carries_column_name() {
        let err = validate_and_coerce(Value::Boolean(true), DataType::Integer, Some("id"))
            .unwrap_err();
        assert_eq!(
            err,
            RelicError::TypeMismatch {
                expected: "INTEGER".to_string(),
                actual: "BOOLEAN".to_string(),
                column: Some("id".to_string()),
            }
        );
    }

    #[test]
    fn data_type_spellings() {
        assert_eq!(DataType::from_keyword("int"), Some(DataType::Integer));
        assert_eq!(DataType::from_keyword("Varchar"), Some(DataType::Text));
        assert_eq!(DataType::from_keyword("STRING"), Some(DataType::Text));
        assert_eq!(DataType::from_keyword("double"), Some(DataType::Real));
        assert_eq!(DataType::from_keyword("BOOL"), Some(DataType::Boolean));
        assert_eq!(DataType::from_keyword("BLOB"), None);
    }

    #[test]
    fn compare_null_ordering() {
        assert_eq!(compare_values(&Value::Null, &Value::Null), Ordering::Equal);
        assert_eq!(
            compare_values(&Value::Null, &Value::Integer(i64::MIN)),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&Value::Text(String::new()), &Value::Null),
            Ordering::Greater
        );
    }

    #[test]
    fn compare_within_domains() {
        assert_eq!(
            compare_values(&Value::Integer(1), &Value::Integer(2)),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&Value::Text("b".into()), &Value::Text("a".into())),
            Ordering::Greater
        );
        assert_eq!(
            compare_values(&Value::Boolean(false), &Value::Boolean(true)),
            Ordering::Less
        );
    }

    #[test]
    fn compare_mixed_numerics() {
        assert_eq!(
            compare_values(&Value::Integer(2), &Value::Real(2.0)),
            Ordering::Equal
        );
        assert_eq!(
            compare_values(&Value::Real(1.5), &Value::Integer(2)),
            Ordering::Less
        );
    }
}
