//! Typed, in-memory documents.
//!
//! Values are plain owned trees. A union-typed field holds a `UnionValue`
//! recording which alternative it inhabits; `RecordValue::get` looks through
//! that wrapper so callers rarely need to care.

use indexmap::IndexMap;

use crate::node::{Mapping, Node};

#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    Bool(bool),
    Int(i64),                // `int` and `long`
    Float(f64),              // `float` and `double`
    String(String),
    Enum(EnumValue),
    Record(RecordValue),
    Array(Vec<TypedValue>),
    Union(UnionValue),
    Any(Node),               // kept verbatim
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub enum_name: String,
    pub symbol: String,
}

/// Which alternative of a union a value inhabits, by position in the
/// (normalized) alternative list.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionValue {
    pub index: usize,
    pub value: Box<TypedValue>,
}

impl UnionValue {
    pub fn new(index: usize, value: TypedValue) -> Self {
        Self { index, value: Box::new(value) }
    }
}

impl TypedValue {
    pub fn symbol(enum_name: impl Into<String>, symbol: impl Into<String>) -> Self {
        TypedValue::Enum(EnumValue { enum_name: enum_name.into(), symbol: symbol.into() })
    }

    /// The payload beneath any union wrappers.
    pub fn unwrap_union(&self) -> &TypedValue {
        let mut v = self;
        while let TypedValue::Union(u) = v {
            v = &u.value;
        }
        v
    }

    pub fn union_index(&self) -> Option<usize> {
        match self {
            TypedValue::Union(u) => Some(u.index),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.unwrap_union(), TypedValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.unwrap_union() {
            TypedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.unwrap_union() {
            TypedValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self.unwrap_union() {
            TypedValue::Float(x) => Some(*x),
            TypedValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.unwrap_union() {
            TypedValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self.unwrap_union() {
            TypedValue::Enum(e) => Some(&e.symbol),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordValue> {
        match self.unwrap_union() {
            TypedValue::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[TypedValue]> {
        match self.unwrap_union() {
            TypedValue::Array(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<RecordValue> {
        match self {
            TypedValue::Record(r) => Some(r),
            TypedValue::Union(u) => u.value.into_record(),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ( $( $ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$ty> for TypedValue {
                fn from(v: $ty) -> Self {
                    TypedValue::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    f32 => Float,
    f64 => Float,
    String => String,
    &str => String,
    EnumValue => Enum,
    RecordValue => Record,
    Vec<TypedValue> => Array,
    UnionValue => Union,
}

// ------------------------------- Records ---------------------------------- //

#[derive(Debug, Clone, PartialEq)]
pub struct RecordValue {
    type_name: String,
    fields: IndexMap<String, TypedValue>,
    extensions: Mapping,  // namespaced keys, kept verbatim
}

impl RecordValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), fields: IndexMap::new(), extensions: Mapping::new() }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Field value as stored, union wrapper included.
    pub fn raw(&self, name: &str) -> Option<&TypedValue> {
        self.fields.get(name)
    }

    /// Field value with unions looked through; an unset field and a field set
    /// to the null alternative both read as `None`.
    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.fields
            .get(name)
            .map(TypedValue::unwrap_union)
            .filter(|v| !matches!(v, TypedValue::Null))
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Stores a value without checking it against the schema; see
    /// `RecordBuilder` for the checked path.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<TypedValue>) -> Option<TypedValue> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn unset(&mut self, name: &str) -> Option<TypedValue> {
        self.fields.shift_remove(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn extensions(&self) -> &Mapping {
        &self.extensions
    }

    pub fn extension(&self, key: &str) -> Option<&Node> {
        self.extensions.get(key)
    }

    pub(crate) fn set_extension(&mut self, key: impl Into<String>, node: Node) {
        self.extensions.insert(key.into(), node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_looks_through_unions() {
        let mut r = RecordValue::new("Sample");
        r.set("species", UnionValue::new(1, TypedValue::symbol("Species", "mus_musculus")));
        r.set("label", UnionValue::new(0, TypedValue::Null));

        assert_eq!(r.get("species").and_then(TypedValue::as_symbol), Some("mus_musculus"));
        assert_eq!(r.raw("species").and_then(TypedValue::union_index), Some(1));
        assert!(r.is_set("label"));
        assert_eq!(r.get("label"), None);
        assert_eq!(r.get("missing"), None);
    }

    #[test]
    fn unset_keeps_order_of_the_rest() {
        let mut r = RecordValue::new("R");
        r.set("a", 1);
        r.set("b", 2);
        r.set("c", 3);
        r.unset("b");
        assert_eq!(r.fields().map(|(k, _)| k).collect::<Vec<_>>(), ["a", "c"]);
    }

    #[test]
    fn numeric_accessors() {
        assert_eq!(TypedValue::from(3).as_f64(), Some(3.0));
        assert_eq!(TypedValue::from(3.5).as_i64(), None);
        assert_eq!(TypedValue::from("x").as_str(), Some("x"));
    }
}
