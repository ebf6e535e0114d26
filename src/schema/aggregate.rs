use serde::{Deserialize, Serialize};

use crate::{
    errors::GraphError,
    value::{PropertyValue, ValueKind},
};

/// Binary aggregation over property values.
///
/// Every variant is associative and commutative, so backends and federated merges may combine
/// elements in any order and grouping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    Sum,
    Min,
    Max,
    And,
    Or,
}

impl AggregateFunction {
    pub fn supports(self, kind: ValueKind) -> bool {
        match self {
            AggregateFunction::Sum => matches!(kind, ValueKind::Integer | ValueKind::Long),
            AggregateFunction::Min | AggregateFunction::Max => true,
            AggregateFunction::And | AggregateFunction::Or => kind == ValueKind::Boolean,
        }
    }

    pub fn apply(
        self,
        left: &PropertyValue,
        right: &PropertyValue,
    ) -> Result<PropertyValue, GraphError> {
        if left.kind() != right.kind() {
            return Err(GraphError::operation(format!(
                "cannot aggregate {} with {}",
                left.kind(),
                right.kind()
            )));
        }
        let combined = match (self, left, right) {
            (AggregateFunction::Sum, PropertyValue::Integer(a), PropertyValue::Integer(b)) => a
                .checked_add(*b)
                .map(PropertyValue::Integer)
                .ok_or_else(|| GraphError::operation("integer sum overflowed"))?,
            (AggregateFunction::Sum, PropertyValue::Long(a), PropertyValue::Long(b)) => a
                .checked_add(*b)
                .map(PropertyValue::Long)
                .ok_or_else(|| GraphError::operation("long sum overflowed"))?,
            (AggregateFunction::Min, a, b) => a.min(b).clone(),
            (AggregateFunction::Max, a, b) => a.max(b).clone(),
            (AggregateFunction::And, PropertyValue::Boolean(a), PropertyValue::Boolean(b)) => {
                PropertyValue::Boolean(*a && *b)
            }
            (AggregateFunction::Or, PropertyValue::Boolean(a), PropertyValue::Boolean(b)) => {
                PropertyValue::Boolean(*a || *b)
            }
            (function, value, _) => {
                return Err(GraphError::operation(format!(
                    "{function:?} does not apply to {} values",
                    value.kind()
                )));
            }
        };
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_is_commutative_and_checked() {
        let a = PropertyValue::Integer(3);
        let b = PropertyValue::Integer(4);
        let sum = AggregateFunction::Sum;
        assert_eq!(sum.apply(&a, &b).expect("sum"), sum.apply(&b, &a).expect("sum"));
        let overflow = sum.apply(&PropertyValue::Integer(i32::MAX), &PropertyValue::Integer(1));
        assert!(overflow.is_err());
    }

    #[test]
    fn mixed_kinds_are_rejected() {
        let err = AggregateFunction::Max
            .apply(&PropertyValue::Integer(1), &PropertyValue::Long(1))
            .expect_err("mixed kinds");
        assert!(err.is_operation());
    }
}
