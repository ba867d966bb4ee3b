//! Value Tests
//!
//! Tests verify:
//! - Checked constructors for sequences and sets
//! - Conversions into scalars and values
//! - Shape reporting

use chestkv::{ElemTag, Scalar, Shape, ShapeError, Value};

// =============================================================================
// Constructors
// =============================================================================

#[test]
fn test_sequence_constructor_accepts_uniform_items() {
    let value = Value::sequence(ElemTag::Str, vec!["a".into(), "b".into()]).unwrap();
    assert_eq!(value.shape(), Shape::Sequence);
    assert_eq!(value.elem_tag(), Some(ElemTag::Str));
    assert_eq!(
        value.as_sequence().unwrap(),
        &[Scalar::Str("a".into()), Scalar::Str("b".into())]
    );
}

#[test]
fn test_sequence_constructor_rejects_mixed_items() {
    let err = Value::sequence(ElemTag::Int, vec![Scalar::Int(1), Scalar::Float(2.0)]).unwrap_err();
    assert_eq!(
        err,
        ShapeError::ElementType {
            expected: ElemTag::Int,
            found: ElemTag::Float
        }
    );
}

#[test]
fn test_set_constructor_deduplicates() {
    let value = Value::set(ElemTag::Int, vec![Scalar::Int(1), Scalar::Int(1), Scalar::Int(2)]).unwrap();
    assert_eq!(value.as_set().unwrap().len(), 2);
}

#[test]
fn test_empty_collections_keep_their_tag() {
    let seq = Value::sequence(ElemTag::Bytes, Vec::new()).unwrap();
    assert_eq!(seq.elem_tag(), Some(ElemTag::Bytes));
    assert!(seq.as_sequence().unwrap().is_empty());

    let set = Value::set(ElemTag::Bool, Vec::new()).unwrap();
    assert_eq!(set.elem_tag(), Some(ElemTag::Bool));
}

// =============================================================================
// Conversions
// =============================================================================

#[test]
fn test_primitive_conversions() {
    assert_eq!(Value::from(7), Value::Scalar(Scalar::Int(7)));
    assert_eq!(Value::from(7i64), Value::Scalar(Scalar::Int(7)));
    assert_eq!(Value::from(true), Value::Scalar(Scalar::Bool(true)));
    assert_eq!(Value::from("s"), Value::Scalar(Scalar::Str("s".into())));
    assert_eq!(Value::from(vec![1u8, 2]), Value::Scalar(Scalar::Bytes(vec![1, 2])));
    assert_eq!(Value::from(1.5), Value::Scalar(Scalar::Float(1.5)));
}

#[test]
fn test_scalar_value_has_no_elem_tag() {
    let value = Value::from("foo");
    assert_eq!(value.shape(), Shape::Scalar);
    assert_eq!(value.elem_tag(), None);
    assert!(value.as_sequence().is_none());
    assert!(value.as_set().is_none());
}

#[test]
fn test_shape_error_messages() {
    let err = ShapeError::Shape {
        expected: Shape::Set,
        found: Shape::Sequence,
    };
    assert_eq!(err.to_string(), "expected a set value, found a sequence");

    let err = ShapeError::ElementType {
        expected: ElemTag::Int,
        found: ElemTag::Str,
    };
    assert_eq!(err.to_string(), "expected int elements, found string");
}
