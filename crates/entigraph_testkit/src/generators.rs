//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random values, predicates and
//! relationship edit scripts that stay within a fixture schema.

use entigraph_core::{CompareOp, ObjectId, Predicate, Value};
use proptest::prelude::*;

/// Strategy for generating object IDs.
pub fn object_id_strategy() -> impl Strategy<Value = ObjectId> {
    prop::array::uniform16(any::<u8>()).prop_map(ObjectId::from_bytes)
}

/// Strategy for generating short person names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{1,9}").expect("Invalid regex")
}

/// Strategy for generating ages.
pub fn age_strategy() -> impl Strategy<Value = i64> {
    0i64..120
}

/// Strategy for generating `(name, age)` rows.
pub fn people_strategy(max: usize) -> impl Strategy<Value = Vec<(String, i64)>> {
    prop::collection::vec((name_strategy(), age_strategy()), 0..max)
}

/// Strategy for generating any non-null scalar value.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::Text),
        (0i64..4_102_444_800_000).prop_map(Value::Timestamp),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
    ]
}

/// Strategy for generating comparison operators.
pub fn compare_op_strategy() -> impl Strategy<Value = CompareOp> {
    prop_oneof![
        Just(CompareOp::Eq),
        Just(CompareOp::Ne),
        Just(CompareOp::Lt),
        Just(CompareOp::Le),
        Just(CompareOp::Gt),
        Just(CompareOp::Ge),
    ]
}

/// Strategy for generating predicates over `Person { name, age }`.
pub fn person_predicate_strategy() -> impl Strategy<Value = Predicate> {
    let leaf = prop_oneof![
        (compare_op_strategy(), age_strategy())
            .prop_map(|(op, age)| Predicate::compare("age", op, age)),
        name_strategy().prop_map(|name| Predicate::eq("name", name)),
        any::<bool>().prop_map(Predicate::Constant),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.and(b)),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| a.or(b)),
            inner.prop_map(Predicate::negate),
        ]
    })
}

/// One edit to an employee's relationships, by index into a fixed pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationEdit {
    /// Point `employee.department` at a department.
    Assign {
        /// Employee index.
        employee: usize,
        /// Department index.
        department: usize,
    },
    /// Clear `employee.department`.
    Clear {
        /// Employee index.
        employee: usize,
    },
    /// Add an employee through `department.employees`.
    Add {
        /// Department index.
        department: usize,
        /// Employee index.
        employee: usize,
    },
    /// Remove an employee through `department.employees`.
    Remove {
        /// Department index.
        department: usize,
        /// Employee index.
        employee: usize,
    },
}

/// Strategy for generating relationship edit scripts.
pub fn relation_edits_strategy(
    employees: usize,
    departments: usize,
    max_len: usize,
) -> impl Strategy<Value = Vec<RelationEdit>> {
    let edit = prop_oneof![
        (0..employees, 0..departments)
            .prop_map(|(employee, department)| RelationEdit::Assign { employee, department }),
        (0..employees).prop_map(|employee| RelationEdit::Clear { employee }),
        (0..departments, 0..employees)
            .prop_map(|(department, employee)| RelationEdit::Add { department, employee }),
        (0..departments, 0..employees)
            .prop_map(|(department, employee)| RelationEdit::Remove { department, employee }),
    ];
    prop::collection::vec(edit, 0..max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn names_are_capitalized(name in name_strategy()) {
            prop_assert!(name.chars().next().is_some_and(|c| c.is_ascii_uppercase()));
            prop_assert!(name.len() >= 2);
        }

        #[test]
        fn values_are_never_null(value in value_strategy()) {
            prop_assert!(!value.is_null());
        }

        #[test]
        fn predicates_reparse(predicate in person_predicate_strategy()) {
            let reparsed = Predicate::parse(&predicate.to_string(), &[]).unwrap();
            prop_assert_eq!(reparsed.to_string(), predicate.to_string());
        }

        #[test]
        fn edits_stay_in_range(edits in relation_edits_strategy(4, 2, 20)) {
            for edit in edits {
                match edit {
                    RelationEdit::Assign { employee, department }
                    | RelationEdit::Add { department, employee }
                    | RelationEdit::Remove { department, employee } => {
                        prop_assert!(employee < 4 && department < 2);
                    }
                    RelationEdit::Clear { employee } => prop_assert!(employee < 4),
                }
            }
        }
    }
}
