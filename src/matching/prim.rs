use crate::ir::Primitive;
use crate::node::{Node, Scalar};
use crate::value::TypedValue;

/// Range of integers an `int` field may hold.
pub const INT_RANGE: std::ops::RangeInclusive<i64> = (i32::MIN as i64)..=(i32::MAX as i64);

/// Largest finite magnitude a `float` field may hold.
pub const FLOAT_MAX: f64 = f32::MAX as f64;

fn float_in_range(x: f64) -> bool {
    // inf/nan are representable in both widths
    !x.is_finite() || x.abs() <= FLOAT_MAX
}

/// Node-side rule. Integers are accepted for `float`/`double` because text
/// formats write `2.0` as `2`; nothing is accepted across string/number.
pub fn fits(kind: Primitive, node: &Node) -> bool {
    match (kind, node) {
        (Primitive::Null, Node::Null) => true,
        (Primitive::Boolean, Node::Scalar(Scalar::Bool(_))) => true,
        (Primitive::Int, Node::Scalar(Scalar::Int(i))) => INT_RANGE.contains(i),
        (Primitive::Long, Node::Scalar(Scalar::Int(_))) => true,
        (Primitive::Float, Node::Scalar(Scalar::Int(i))) => float_in_range(*i as f64),
        (Primitive::Float, Node::Scalar(Scalar::Float(x))) => float_in_range(x.0),
        (Primitive::Double, Node::Scalar(Scalar::Int(_) | Scalar::Float(_))) => true,
        (Primitive::String, Node::Scalar(Scalar::Str(_))) => true,
        _ => false,
    }
}

/// Converts a node already known to fit `kind`.
pub fn decode(kind: Primitive, node: &Node) -> Option<TypedValue> {
    if !fits(kind, node) {
        return None;
    }
    Some(match (kind, node) {
        (_, Node::Null) => TypedValue::Null,
        (_, Node::Scalar(Scalar::Bool(b))) => TypedValue::Bool(*b),
        (Primitive::Float | Primitive::Double, Node::Scalar(Scalar::Int(i))) => TypedValue::Float(*i as f64),
        (_, Node::Scalar(Scalar::Int(i))) => TypedValue::Int(*i),
        (_, Node::Scalar(Scalar::Float(x))) => TypedValue::Float(x.0),
        (_, Node::Scalar(Scalar::Str(s))) => TypedValue::String(s.clone()),
        (_, Node::Sequence(_) | Node::Mapping(_)) => return None,
    })
}

/// Value-side rule, the mirror of `fits` for already typed values.
pub fn conforms(kind: Primitive, value: &TypedValue) -> bool {
    match (kind, value) {
        (Primitive::Null, TypedValue::Null) => true,
        (Primitive::Boolean, TypedValue::Bool(_)) => true,
        (Primitive::Int, TypedValue::Int(i)) => INT_RANGE.contains(i),
        (Primitive::Long, TypedValue::Int(_)) => true,
        (Primitive::Float, TypedValue::Float(x)) => float_in_range(*x),
        (Primitive::Double, TypedValue::Float(_)) => true,
        (Primitive::String, TypedValue::String(_)) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_is_32_bit() {
        assert!(fits(Primitive::Int, &Node::from(i32::MAX as i64)));
        assert!(!fits(Primitive::Int, &Node::from(i32::MAX as i64 + 1)));
        assert!(fits(Primitive::Long, &Node::from(i32::MAX as i64 + 1)));
    }

    #[test]
    fn float_widths() {
        assert!(fits(Primitive::Float, &Node::from(3.5)));
        assert!(!fits(Primitive::Float, &Node::from(1e300)));
        assert!(fits(Primitive::Double, &Node::from(1e300)));
    }

    #[test]
    fn doubles_decode_integers_as_floats() {
        assert_eq!(decode(Primitive::Double, &Node::from(2i64)), Some(TypedValue::Float(2.0)));
        assert_eq!(decode(Primitive::Long, &Node::from(2i64)), Some(TypedValue::Int(2)));
        assert_eq!(decode(Primitive::String, &Node::from(2i64)), None);
    }
}
