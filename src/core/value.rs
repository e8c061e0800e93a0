use std::fmt;

use serde::{Deserialize, Serialize};

/// A column value as seen by the persistence layer.
///
/// Everything that reaches the database passes through this enum, either as
/// a bound statement parameter or, for [`Value::Verbatim`], as raw SQL
/// inlined into the statement text. Verbatim values are how callers reach
/// SQL functions (`NOW()`, `CURDATE()`) or force a column back to `NULL`;
/// they are never parameter-bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Verbatim(String),
}

impl Value {
    /// The `NOW()` SQL function, inlined verbatim.
    pub fn now() -> Self {
        Self::Verbatim("NOW()".into())
    }

    /// The `CURDATE()` SQL function, inlined verbatim.
    pub fn curdate() -> Self {
        Self::Verbatim("CURDATE()".into())
    }

    /// A literal SQL `NULL`, inlined verbatim.
    ///
    /// This is the explicit reset marker: a plain [`Value::Null`] passed to
    /// `RecordMapper::populate` will not overwrite a column that already has
    /// a value, while `sql_null()` always will.
    pub fn sql_null() -> Self {
        Self::Verbatim("NULL".into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True for values the populate step treats as "nothing to say": NULL
    /// and the empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn is_verbatim(&self) -> bool {
        matches!(self, Self::Verbatim(_))
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value the way it would appear interpolated into SQL, used
    /// for query-error diagnostics only.
    pub fn render(&self) -> String {
        match self {
            Self::Null => "NULL".into(),
            Self::Boolean(b) => if *b { "1" } else { "0" }.into(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "\\'")),
            Self::Verbatim(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => write!(f, "{}", fl),
            Self::Text(s) => write!(f, "{}", s),
            Self::Verbatim(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl From<&Value> for mysql::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => mysql::Value::NULL,
            Value::Boolean(b) => mysql::Value::Int(i64::from(*b)),
            Value::Integer(i) => mysql::Value::Int(*i),
            Value::Float(f) => mysql::Value::Double(*f),
            Value::Text(s) => mysql::Value::Bytes(s.clone().into_bytes()),
            // Verbatim values are inlined into the SQL text before binding;
            // reaching here means a statement builder missed one. Bind the
            // raw text so the failure surfaces in the database, not here.
            Value::Verbatim(s) => mysql::Value::Bytes(s.clone().into_bytes()),
        }
    }
}

impl From<mysql::Value> for Value {
    fn from(value: mysql::Value) -> Self {
        match value {
            mysql::Value::NULL => Value::Null,
            mysql::Value::Int(i) => Value::Integer(i),
            mysql::Value::UInt(u) => Value::Integer(u as i64),
            mysql::Value::Float(f) => Value::Float(f64::from(f)),
            mysql::Value::Double(d) => Value::Float(d),
            mysql::Value::Bytes(bytes) => Value::Text(String::from_utf8_lossy(&bytes).into_owned()),
            mysql::Value::Date(y, mo, d, h, mi, s, _us) => {
                if h == 0 && mi == 0 && s == 0 {
                    Value::Text(format!("{:04}-{:02}-{:02}", y, mo, d))
                } else {
                    Value::Text(format!(
                        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                        y, mo, d, h, mi, s
                    ))
                }
            }
            mysql::Value::Time(neg, days, h, m, s, _us) => {
                let sign = if neg { "-" } else { "" };
                Value::Text(format!("{}{:02}:{:02}:{:02}", sign, u32::from(h) + days * 24, m, s))
            }
        }
    }
}
