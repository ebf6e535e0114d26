//! Value predicates shared by schema validators and view filters.

use serde::{Deserialize, Serialize};

use crate::value::PropertyValue;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Exists,
    IsEqual(PropertyValue),
    IsMoreThan(PropertyValue),
    IsLessThan(PropertyValue),
    IsIn(Vec<PropertyValue>),
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Evaluate against a possibly absent value.
    ///
    /// Ordering comparisons only hold between values of the same kind.
    pub fn test(&self, value: Option<&PropertyValue>) -> bool {
        match self {
            Predicate::Exists => value.is_some(),
            Predicate::IsEqual(expected) => value == Some(expected),
            Predicate::IsMoreThan(bound) => {
                value.is_some_and(|v| v.kind() == bound.kind() && v > bound)
            }
            Predicate::IsLessThan(bound) => {
                value.is_some_and(|v| v.kind() == bound.kind() && v < bound)
            }
            Predicate::IsIn(allowed) => value.is_some_and(|v| allowed.contains(v)),
            Predicate::Not(inner) => !inner.test(value),
            Predicate::And(all) => all.iter().all(|p| p.test(value)),
            Predicate::Or(any) => any.iter().any(|p| p.test(value)),
        }
    }
}
