//! # Value predicates for events.
//!
//! A [`Predicate`] is plain data (field + comparison) evaluated against the
//! latest record of a datastream. It never captures task state, so an event
//! outliving the task that created it cannot observe dangling data.
//!
//! ## Rules
//! - Leaf predicates are `false` on an unset stream or a missing field.
//! - `Not` inverts its operand, so `!Predicate::is_true("enabled")` holds on an
//!   unset stream.
//! - Numeric comparisons accept any JSON number; other types compare `false`.

use std::fmt;
use std::ops;

use serde_json::Value;

use crate::datastreams::Record;

/// Condition over a datastream record.
#[derive(Clone)]
pub enum Predicate {
    /// `record[field] == true`.
    IsTrue(String),
    /// `record[field] == false`.
    IsFalse(String),
    /// `record[field] == value`.
    Equals(String, Value),
    /// `record[field]` exists and differs from `value`.
    NotEquals(String, Value),
    /// `record[field]` is a number greater than the bound.
    GreaterThan(String, f64),
    /// `record[field]` is a number lower than the bound.
    LessThan(String, f64),
    /// `record[field]` exists.
    Present(String),
    /// Every operand holds (empty = true on a set stream).
    All(Vec<Predicate>),
    /// At least one operand holds.
    Any(Vec<Predicate>),
    /// The operand does not hold.
    Not(Box<Predicate>),
    /// Named function reference over the whole record.
    Named {
        /// Name used in logs.
        name: &'static str,
        /// The test itself.
        f: fn(&Record) -> bool,
    },
}

impl Predicate {
    /// `record[field] == true`.
    pub fn is_true(field: impl Into<String>) -> Self {
        Predicate::IsTrue(field.into())
    }

    /// `record[field] == false`.
    pub fn is_false(field: impl Into<String>) -> Self {
        Predicate::IsFalse(field.into())
    }

    /// `record[field] == value`.
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Equals(field.into(), value.into())
    }

    /// Named function reference.
    pub fn named(name: &'static str, f: fn(&Record) -> bool) -> Self {
        Predicate::Named { name, f }
    }

    /// Conjunction of `self` and `other`.
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::All(mut ops) => {
                ops.push(other);
                Predicate::All(ops)
            }
            p => Predicate::All(vec![p, other]),
        }
    }

    /// Disjunction of `self` and `other`.
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Any(mut ops) => {
                ops.push(other);
                Predicate::Any(ops)
            }
            p => Predicate::Any(vec![p, other]),
        }
    }

    /// Evaluates against the latest value (`None` = unset stream).
    pub fn evaluate(&self, record: Option<&Record>) -> bool {
        match self {
            Predicate::Not(inner) => !inner.evaluate(record),
            Predicate::All(ops) => record.is_some() && ops.iter().all(|p| p.evaluate(record)),
            Predicate::Any(ops) => ops.iter().any(|p| p.evaluate(record)),
            leaf => record.is_some_and(|r| leaf.evaluate_leaf(r)),
        }
    }

    fn evaluate_leaf(&self, r: &Record) -> bool {
        match self {
            Predicate::IsTrue(field) => r.get(field) == Some(&Value::Bool(true)),
            Predicate::IsFalse(field) => r.get(field) == Some(&Value::Bool(false)),
            Predicate::Equals(field, v) => r.get(field) == Some(v),
            Predicate::NotEquals(field, v) => r.get(field).is_some_and(|x| x != v),
            Predicate::GreaterThan(field, bound) => number(r, field).is_some_and(|x| x > *bound),
            Predicate::LessThan(field, bound) => number(r, field).is_some_and(|x| x < *bound),
            Predicate::Present(field) => r.contains_key(field),
            Predicate::Named { f, .. } => f(r),
            Predicate::Not(_) | Predicate::All(_) | Predicate::Any(_) => {
                self.evaluate(Some(r))
            }
        }
    }
}

fn number(r: &Record, field: &str) -> Option<f64> {
    r.get(field).and_then(Value::as_f64)
}

impl ops::Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        match self {
            Predicate::Not(inner) => *inner,
            p => Predicate::Not(Box::new(p)),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::IsTrue(field) => write!(f, "{field} == true"),
            Predicate::IsFalse(field) => write!(f, "{field} == false"),
            Predicate::Equals(field, v) => write!(f, "{field} == {v}"),
            Predicate::NotEquals(field, v) => write!(f, "{field} != {v}"),
            Predicate::GreaterThan(field, b) => write!(f, "{field} > {b}"),
            Predicate::LessThan(field, b) => write!(f, "{field} < {b}"),
            Predicate::Present(field) => write!(f, "has({field})"),
            Predicate::All(ops) => f.debug_tuple("all").field(ops).finish(),
            Predicate::Any(ops) => f.debug_tuple("any").field(ops).finish(),
            Predicate::Not(inner) => write!(f, "not({inner:?})"),
            Predicate::Named { name, .. } => write!(f, "{name}()"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        match v {
            Value::Object(map) => map,
            _ => unreachable!("test records are objects"),
        }
    }

    #[test]
    fn test_leaves_are_false_when_unset() {
        assert!(!Predicate::is_true("enabled").evaluate(None));
        assert!(!Predicate::is_false("enabled").evaluate(None));
        assert!((!Predicate::is_true("enabled")).evaluate(None));
    }

    #[test]
    fn test_missing_field_is_false() {
        let r = record(json!({"mode": "teleop"}));
        assert!(!Predicate::is_true("enabled").evaluate(Some(&r)));
        assert!(!Predicate::NotEquals("enabled".into(), json!(true)).evaluate(Some(&r)));
        assert!(Predicate::equals("mode", "teleop").evaluate(Some(&r)));
    }

    #[test]
    fn test_combinators() {
        let r = record(json!({"enabled": true, "mode": "teleop", "elevator_pos": 0.4}));
        let teleop = Predicate::is_true("enabled").and(Predicate::equals("mode", "teleop"));
        assert!(teleop.evaluate(Some(&r)));

        let high = Predicate::GreaterThan("elevator_pos".into(), 0.5)
            .or(Predicate::LessThan("elevator_pos".into(), 0.1));
        assert!(!high.evaluate(Some(&r)));
        assert!(!(!teleop).evaluate(Some(&r)));
    }

    #[test]
    fn test_named_function() {
        fn claw_open(r: &Record) -> bool {
            r.get("claw_open").and_then(Value::as_bool).unwrap_or(false)
        }
        let p = Predicate::named("claw_open", claw_open);
        assert_eq!(format!("{p:?}"), "claw_open()");
        assert!(p.evaluate(Some(&record(json!({"claw_open": true})))));
        assert!(!p.evaluate(None));
    }

    #[test]
    fn test_double_negation_collapses() {
        let p = !!Predicate::is_true("enabled");
        assert!(matches!(p, Predicate::IsTrue(_)));
    }
}
