//! Boolean visibility/requiredness conditions.
//!
//! A condition is either a leaf equality test against one form value or a
//! combinator over child conditions. Both historical shapes found in case
//! schemas parse into this one type:
//!
//! ```json
//! { "field": "wellModel", "value": "horizontal" }
//! { "field": "wellModel", "value": "vertical", "not": true }
//! { "operator": "OR", "conditions": [ ... ] }
//! ```
//!
//! Shapes that match neither form are kept as [`Condition::Malformed`] and
//! evaluate as true wherever they sit in the tree.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::FormValues;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Combinator {
        operator: Operator,
        conditions: Vec<Condition>,
    },
    Leaf {
        field: String,
        #[serde(default)]
        value: Value,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        not: bool,
    },
    Malformed(Value),
}

impl Condition {
    pub fn leaf(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Leaf {
            field: field.into(),
            value: value.into(),
            not: false,
        }
    }

    pub fn not_equal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Leaf {
            field: field.into(),
            value: value.into(),
            not: true,
        }
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Self::Combinator {
            operator: Operator::And,
            conditions,
        }
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Self::Combinator {
            operator: Operator::Or,
            conditions,
        }
    }

    pub fn negate(condition: Condition) -> Self {
        Self::Combinator {
            operator: Operator::Not,
            conditions: vec![condition],
        }
    }

    /// Evaluate against the current values.
    ///
    /// A malformed node is true in its own position and combines with its
    /// siblings like any other child.
    pub fn test(&self, values: &FormValues) -> bool {
        match self {
            Self::Leaf { field, value, not } => {
                let equal = values
                    .get(field)
                    .is_some_and(|actual| values_equal(actual, value));
                equal != *not
            }
            Self::Combinator {
                operator,
                conditions,
            } => match operator {
                Operator::And => conditions.iter().all(|c| c.test(values)),
                Operator::Or => conditions.iter().any(|c| c.test(values)),
                // Only the first child is negated; NOT without children stays open.
                Operator::Not => conditions.first().is_none_or(|c| !c.test(values)),
            },
            Self::Malformed(_) => true,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }

    /// Names of every field referenced by a leaf in this tree.
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Leaf { field, .. } => out.push(field),
            Self::Combinator { conditions, .. } => {
                for child in conditions {
                    child.collect_fields(out);
                }
            }
            Self::Malformed(_) => {}
        }
    }
}

/// Gate used by `showIf` and `requiredIf`: absent means true.
pub fn evaluate(condition: Option<&Condition>, values: &FormValues) -> bool {
    condition.is_none_or(|c| c.test(values))
}

/// Gate used by option `hideIf`: absent never hides, and neither does a
/// malformed root. Malformed nodes below a combinator fold as true.
pub fn evaluate_hide(condition: Option<&Condition>, values: &FormValues) -> bool {
    condition.is_some_and(|c| !c.is_malformed() && c.test(values))
}

/// Strict equality between form values.
///
/// Values of different JSON types never compare equal. Numbers compare by
/// numeric value so `1` and `1.0` are the same number.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}
