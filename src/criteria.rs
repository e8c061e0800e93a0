//! Search criteria for find and delete operations.
//!
//! A [`Criteria`] is an ordered set of field conditions combined with a
//! single conjunction (`AND` by default, `OR` for the whole set). Each
//! condition is an operator comparison, an `IN` list or a `BETWEEN` range.
//!
//! Criteria also deserialize from a wire format where each field maps to
//! either a bare scalar (equality), `{"operation": ">", "value": v}`,
//! `{"in": [..]}` or `{"between": [lo, hi]}`:
//!
//! ```
//! use rowmap::criteria::Criteria;
//!
//! let criteria: Criteria = serde_json::from_str(
//!     r#"{"emailAddress": "a@b.c", "age": {"operation": ">=", "value": 21}}"#,
//! ).unwrap();
//! assert_eq!(criteria.len(), 2);
//! ```

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::core::{Result, StoreError, Value};

/// Comparison operator for a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Like,
}

impl Operator {
    pub fn sql(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
            Self::Like => "LIKE",
        }
    }

    /// Parse the wire-format operation token. Unknown tokens are rejected
    /// rather than passed through to the database.
    pub fn parse(token: &str) -> Result<Self> {
        match token.trim() {
            "=" | "==" => Ok(Self::Equals),
            "!=" | "<>" => Ok(Self::NotEquals),
            "<" => Ok(Self::LessThan),
            "<=" => Ok(Self::LessOrEqual),
            ">" => Ok(Self::GreaterThan),
            ">=" => Ok(Self::GreaterOrEqual),
            token if token.eq_ignore_ascii_case("like") => Ok(Self::Like),
            other => Err(StoreError::Model(format!(
                "unknown criteria operation: {other:?}"
            ))),
        }
    }
}

/// One condition on one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Compare { operator: Operator, value: Value },
    In(Vec<Value>),
    Between(Value, Value),
}

impl Term {
    pub fn equals(value: impl Into<Value>) -> Self {
        Self::Compare {
            operator: Operator::Equals,
            value: value.into(),
        }
    }
}

/// How the whole condition set combines. The flag applies to every term at
/// once; there is no per-term grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    fn joiner(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// An ordered field-condition set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Criteria {
    terms: Vec<(String, Term)>,
    conjunction: Conjunction,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch the whole set from `AND` to `OR`.
    pub fn any_of(mut self) -> Self {
        self.conjunction = Conjunction::Or;
        self
    }

    pub fn equals(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.term(field, Term::equals(value))
    }

    pub fn compare(
        self,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        self.term(
            field,
            Term::Compare {
                operator,
                value: value.into(),
            },
        )
    }

    pub fn within<I, V>(self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.term(field, Term::In(values.into_iter().map(Into::into).collect()))
    }

    pub fn between(
        self,
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        self.term(field, Term::Between(low.into(), high.into()))
    }

    pub fn term(mut self, field: impl Into<String>, term: Term) -> Self {
        self.terms.push((field.into(), term));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn conjunction(&self) -> Conjunction {
        self.conjunction
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.terms.iter().map(|(f, t)| (f.as_str(), t))
    }

    pub fn get(&self, field: &str) -> Option<&Term> {
        self.terms.iter().find(|(f, _)| f == field).map(|(_, t)| t)
    }

    /// Render the condition set over already-resolved column names.
    ///
    /// Field names are used as column names verbatim; callers that map model
    /// fields to columns must do so before rendering. With `table`, every
    /// column is prefixed as `` `table`.`col` `` for joined selects. Empty
    /// criteria render as an empty string with no bound values.
    pub fn render(&self, table: Option<&str>) -> (String, Vec<Value>) {
        let mut fragments = Vec::with_capacity(self.terms.len());
        let mut params = Vec::new();

        for (field, term) in &self.terms {
            let column = match table {
                Some(table) => format!("`{table}`.`{field}`"),
                None => format!("`{field}`"),
            };

            match term {
                Term::Compare { operator, value } => {
                    fragments.push(format!("{column} {} ?", operator.sql()));
                    params.push(value.clone());
                }
                Term::In(values) => {
                    let marks = vec!["?"; values.len()].join(", ");
                    fragments.push(format!("{column} IN ({marks})"));
                    params.extend(values.iter().cloned());
                }
                Term::Between(low, high) => {
                    fragments.push(format!("{column} BETWEEN ? AND ?"));
                    params.push(low.clone());
                    params.push(high.clone());
                }
            }
        }

        (fragments.join(self.conjunction.joiner()), params)
    }
}

impl<'de> Deserialize<'de> for Criteria {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum TermSpec {
            Compare { operation: String, value: Value },
            In { r#in: Vec<Value> },
            Between { between: (Value, Value) },
            Scalar(Value),
        }

        struct CriteriaVisitor;

        impl<'de> Visitor<'de> for CriteriaVisitor {
            type Value = Criteria;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field conditions")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<Criteria, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut criteria = Criteria::new();
                while let Some((field, spec)) = access.next_entry::<String, TermSpec>()? {
                    let term = match spec {
                        TermSpec::Compare { operation, value } => Term::Compare {
                            operator: Operator::parse(&operation).map_err(de::Error::custom)?,
                            value,
                        },
                        TermSpec::In { r#in } => Term::In(r#in),
                        TermSpec::Between { between } => Term::Between(between.0, between.1),
                        TermSpec::Scalar(value) => Term::equals(value),
                    };
                    criteria = criteria.term(field, term);
                }
                Ok(criteria)
            }
        }

        deserializer.deserialize_map(CriteriaVisitor)
    }
}
