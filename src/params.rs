//! Typed query parameters.
//!
//! The job description carries bound arguments as JSON; they are converted
//! once, at workload preparation time, into this closed value enum so the
//! per-iteration dispatch does no JSON work. The same values serve both
//! execution paths: as postgres wire parameters through [`ToSql`], and as
//! COPY text-format fields for bulk-copy payloads.

use crate::error::{BenchError, BenchResult};
use bytes::BytesMut;
use serde_json::Value;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};

/// One bound query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl SqlParam {
    /// Convert one JSON argument value.
    ///
    /// Nested arrays and objects are rejected: the job's `args` is a flat
    /// parameter tuple (bulk-copy row templates are expanded before
    /// conversion and never reach this point as containers).
    pub fn from_json(value: &Value) -> BenchResult<Self> {
        match value {
            Value::Null => Ok(SqlParam::Null),
            Value::Bool(b) => Ok(SqlParam::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(SqlParam::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(SqlParam::Float(f))
                } else {
                    Err(BenchError::Config(format!(
                        "unrepresentable numeric argument: {n}"
                    )))
                }
            }
            Value::String(s) => Ok(SqlParam::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => Err(BenchError::Config(
                "query arguments must be scalars".to_string(),
            )),
        }
    }

    /// Convert a flat JSON argument tuple.
    pub fn tuple_from_json(values: &[Value]) -> BenchResult<Vec<Self>> {
        values.iter().map(Self::from_json).collect()
    }

    /// Render this value as one COPY text-format field.
    ///
    /// Tab-separated text format: `\N` for null, backslash escapes for the
    /// delimiter and line-control characters.
    pub fn copy_field(&self) -> String {
        match self {
            SqlParam::Int(v) => v.to_string(),
            SqlParam::Float(v) => v.to_string(),
            SqlParam::Bool(true) => "t".to_string(),
            SqlParam::Bool(false) => "f".to_string(),
            SqlParam::Null => "\\N".to_string(),
            SqlParam::Text(s) => {
                let mut out = String::with_capacity(s.len());
                for ch in s.chars() {
                    match ch {
                        '\\' => out.push_str("\\\\"),
                        '\t' => out.push_str("\\t"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        _ => out.push(ch),
                    }
                }
                out
            }
        }
    }
}

impl ToSql for SqlParam {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            // Integers arrive from JSON as i64; narrow to the column's
            // declared width so `$n` binds against int2/int4 columns work.
            SqlParam::Int(v) => {
                if *ty == Type::INT2 {
                    i16::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*v as f64).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlParam::Float(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlParam::Text(s) => s.as_str().to_sql(ty, out),
            SqlParam::Bool(b) => b.to_sql(ty, out),
            SqlParam::Null => Ok(IsNull::Yes),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // Width coercion happens at bind time; a genuine mismatch surfaces
        // as a server-side error on the first measured iteration.
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_scalars() {
        assert_eq!(SqlParam::from_json(&json!(42)).unwrap(), SqlParam::Int(42));
        assert_eq!(
            SqlParam::from_json(&json!(2.5)).unwrap(),
            SqlParam::Float(2.5)
        );
        assert_eq!(
            SqlParam::from_json(&json!("abc")).unwrap(),
            SqlParam::Text("abc".to_string())
        );
        assert_eq!(
            SqlParam::from_json(&json!(true)).unwrap(),
            SqlParam::Bool(true)
        );
        assert_eq!(
            SqlParam::from_json(&Value::Null).unwrap(),
            SqlParam::Null
        );
    }

    #[test]
    fn rejects_containers() {
        assert!(SqlParam::from_json(&json!([1, 2])).is_err());
        assert!(SqlParam::from_json(&json!({"a": 1})).is_err());
    }

    #[test]
    fn tuple_conversion_preserves_order() {
        let tuple = SqlParam::tuple_from_json(&[json!(1), json!("x")]).unwrap();
        assert_eq!(
            tuple,
            vec![SqlParam::Int(1), SqlParam::Text("x".to_string())]
        );
    }

    #[test]
    fn copy_fields_are_escaped() {
        assert_eq!(SqlParam::Int(7).copy_field(), "7");
        assert_eq!(SqlParam::Null.copy_field(), "\\N");
        assert_eq!(SqlParam::Bool(true).copy_field(), "t");
        assert_eq!(
            SqlParam::Text("a\tb\nc\\d".to_string()).copy_field(),
            "a\\tb\\nc\\\\d"
        );
    }
}
