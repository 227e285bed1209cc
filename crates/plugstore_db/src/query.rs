//! The `ORDER BY` query grammar and the in-memory sort behind it.
//!
//! Supported forms (keywords are case-insensitive):
//!
//! ```text
//! ""                      entries in enumeration order
//! ORDER BY <field>        ascending
//! ORDER BY <field> ASC
//! ORDER BY <field> DESC
//! ```
//!
//! Ordering semantics:
//! - a missing or `null` field sorts after every present value, in both
//!   directions;
//! - if every present value of the column parses as a base-10 integer the
//!   column sorts numerically, otherwise every value compares bytewise;
//! - any other JSON value kind is rejected with
//!   [`DbError::UnsupportedSortValue`].

use crate::error::{DbError, DbResult};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

const ORDER_BY: &str = "ORDER BY";

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

/// The ordering requested by a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Top-level JSON field to order by.
    pub field: String,
    /// Sort direction.
    pub direction: Direction,
}

/// A parsed query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    order_by: Option<OrderBy>,
}

impl Query {
    /// A query without ordering.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// A query ordering by `field`.
    #[must_use]
    pub fn order_by(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            order_by: Some(OrderBy {
                field: field.into(),
                direction,
            }),
        }
    }

    /// Parses a query string.
    ///
    /// Text without an `ORDER BY` clause means no ordering. When the
    /// keyword appears more than once, the last clause wins.
    pub fn parse(query: &str) -> DbResult<Self> {
        let upper = query.to_ascii_uppercase();
        let Some(idx) = upper.rfind(ORDER_BY) else {
            return Ok(Self::all());
        };

        let mut tokens = query[idx + ORDER_BY.len()..].split_whitespace();
        let field = tokens
            .next()
            .ok_or_else(|| DbError::query("ORDER BY requires a field"))?;
        let direction = match tokens.next().map(str::to_ascii_uppercase).as_deref() {
            None | Some("ASC") => Direction::Asc,
            Some("DESC") => Direction::Desc,
            Some(other) => {
                return Err(DbError::query(format!(
                    "unknown sort direction '{other}', expected ASC or DESC"
                )))
            }
        };
        if let Some(extra) = tokens.next() {
            return Err(DbError::query(format!("unexpected input after ORDER BY: '{extra}'")));
        }

        Ok(Self::order_by(field, direction))
    }

    /// Returns the requested ordering, if any.
    #[must_use]
    pub fn ordering(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }
}

impl FromStr for Query {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.order_by {
            None => Ok(()),
            Some(OrderBy { field, direction }) => {
                let dir = match direction {
                    Direction::Asc => "ASC",
                    Direction::Desc => "DESC",
                };
                write!(f, "{ORDER_BY} {field} {dir}")
            }
        }
    }
}

/// Extracts the sortable value of `field` from a decoded JSON object.
///
/// Returns `None` for a missing or `null` field.
pub(crate) fn sort_value(
    object: &serde_json::Map<String, Value>,
    field: &str,
) -> DbResult<Option<String>> {
    let unsupported = |kind: &'static str| DbError::UnsupportedSortValue {
        field: field.to_string(),
        kind,
    };
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Bool(_)) => Err(unsupported("bool")),
        Some(Value::Number(_)) => Err(unsupported("number")),
        Some(Value::Array(_)) => Err(unsupported("array")),
        Some(Value::Object(_)) => Err(unsupported("object")),
    }
}

/// How the values of one column are compared.
///
/// Chosen once per column; mixing numeric and textual comparisons pair by
/// pair is not a total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collation {
    /// Integers by value. Any value that does not parse sorts after the
    /// integers, bytewise.
    Numeric,
    /// Bytewise.
    Text,
}

impl Collation {
    /// Picks [`Collation::Numeric`] if every value parses as an integer.
    pub fn for_values<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        if values.into_iter().all(|v| v.parse::<i64>().is_ok()) {
            Self::Numeric
        } else {
            Self::Text
        }
    }

    /// Compares two sort values.
    ///
    /// Missing values go last regardless of `direction`.
    #[must_use]
    pub fn compare(self, a: Option<&str>, b: Option<&str>, direction: Direction) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => {
                let ord = match self {
                    Self::Text => a.cmp(b),
                    Self::Numeric => match (a.parse::<i64>(), b.parse::<i64>()) {
                        (Ok(x), Ok(y)) => x.cmp(&y),
                        (Ok(_), Err(_)) => Ordering::Less,
                        (Err(_), Ok(_)) => Ordering::Greater,
                        (Err(_), Err(_)) => a.cmp(b),
                    },
                };
                match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            }
        }
    }
}

/// Stable sort of `rows` by their sort value, with nil values last.
pub(crate) fn sort_rows<T>(rows: &mut [(T, Option<String>)], direction: Direction) {
    let collation = Collation::for_values(rows.iter().filter_map(|(_, v)| v.as_deref()));
    rows.sort_by(|(_, a), (_, b)| collation.compare(a.as_deref(), b.as_deref(), direction));
}
