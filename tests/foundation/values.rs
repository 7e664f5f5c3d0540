//! Integration tests for Value types
//!
//! Tests Value variants, truthiness, ordering, and numeric comparison.

use std::cmp::Ordering;
use std::collections::HashSet;

use seine_foundation::{Type, Value};

// =============================================================================
// Construction and Accessors
// =============================================================================

#[test]
fn only_nil_and_false_are_falsy() {
    assert!(!Value::Nil.is_truthy());
    assert!(!Value::Bool(false).is_truthy());
    assert!(Value::Bool(true).is_truthy());
    assert!(Value::Int(0).is_truthy());
    assert!(Value::from("").is_truthy());
}

#[test]
fn accessors_match_variants() {
    assert_eq!(Value::from(42i64).as_int(), Some(42));
    assert_eq!(Value::from(1.5).as_float(), Some(1.5));
    assert_eq!(Value::from(1.5).as_int(), None);
    assert_eq!(Value::from("hi").as_str(), Some("hi"));
    assert_eq!(Value::symbol("ok").as_str(), Some("ok"));
    assert_eq!(Value::from(true).as_bool(), Some(true));
}

#[test]
fn optional_values_become_nil() {
    assert_eq!(Value::from(None::<i64>), Value::Nil);
    assert_eq!(Value::from(Some(3i64)), Value::Int(3));
}

#[test]
fn vectors_convert_elementwise() {
    let v = Value::from(vec![1i64, 2, 3]);
    let items: Vec<_> = v.as_vec().unwrap().iter().cloned().collect();
    assert_eq!(items, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
}

// =============================================================================
// Equality and Ordering
// =============================================================================

#[test]
fn strings_and_symbols_differ() {
    assert_ne!(Value::from("a"), Value::symbol("a"));
}

#[test]
fn ints_and_floats_are_distinct_values() {
    assert_ne!(Value::Int(1), Value::Float(1.0));
    assert_eq!(
        Value::Int(1).numeric_cmp(&Value::Float(1.0)),
        Some(Ordering::Equal)
    );
}

#[test]
fn numeric_cmp_rejects_non_numbers() {
    assert_eq!(Value::Int(1).numeric_cmp(&Value::from("1")), None);
}

#[test]
fn ordering_is_total_across_variants() {
    let mut values = vec![
        Value::from("b"),
        Value::Int(3),
        Value::Nil,
        Value::Bool(true),
        Value::from("a"),
    ];
    values.sort();
    assert_eq!(
        values,
        vec![
            Value::Nil,
            Value::Bool(true),
            Value::Int(3),
            Value::from("a"),
            Value::from("b"),
        ]
    );
}

#[test]
fn equal_values_hash_together() {
    let set: HashSet<Value> = [Value::Int(1), Value::Int(1), Value::from("x")]
        .into_iter()
        .collect();
    assert_eq!(set.len(), 2);
}

// =============================================================================
// Types
// =============================================================================

#[test]
fn value_types() {
    assert_eq!(Value::Int(1).value_type(), Type::Int);
    assert_eq!(Value::from("s").value_type(), Type::String);
    assert_eq!(Value::Nil.value_type(), Type::Nil);
}

#[test]
fn float_admits_ints() {
    assert!(Type::Float.admits(&Value::Int(2)));
    assert!(!Type::Int.admits(&Value::Float(2.0)));
}

#[test]
fn option_admits_nil() {
    let ty = Type::option(Type::String);
    assert!(ty.admits(&Value::Nil));
    assert!(ty.admits(&Value::from("x")));
    assert!(!ty.admits(&Value::Int(1)));
}

#[test]
fn collection_types_check_elements() {
    let ty = Type::vec(Type::Int);
    assert!(ty.admits(&Value::from(vec![1i64, 2])));
    assert!(!ty.admits(&Value::from(vec!["a"])));
}

// =============================================================================
// Display
// =============================================================================

#[test]
fn display_and_debug() {
    assert_eq!(Value::from("hi").to_string(), "hi");
    assert_eq!(format!("{:?}", Value::from("hi")), "\"hi\"");
    assert_eq!(Value::from(vec![1i64, 2]).to_string(), "[1 2]");
    assert_eq!(Value::Nil.to_string(), "nil");
}
