//! Programmatic construction of typed values.
//!
//! `RecordBuilder` checks every field as it is set. Values keep their own
//! type: a symbol of one enum never becomes a symbol of another, and a
//! record is never retyped as a record of a different name. The only
//! adjustments are the ones a typed value cannot express by itself: it is
//! wrapped in the first union alternative it conforms to, and an integer
//! widens to a float where the field is `float` or `double`.

use crate::decode::Decoder;
use crate::encode;
use crate::error::{DecodeError, Path, Segment, ValueError};
use crate::ir::{Field, Primitive, RecordDef, Ty, CLASS};
use crate::matching::{mismatch, obj, prim};
use crate::node::Node;
use crate::norm_ir::normalize;
use crate::schema::Schema;
use crate::value::{RecordValue, TypedValue, UnionValue};

/// Whether an already typed value fits `ty`, including the union alternative
/// it claims to inhabit.
pub fn conforms(schema: &Schema, ty: &Ty, value: &TypedValue) -> bool {
    match (ty, value) {
        (Ty::Primitive(p), v) => prim::conforms(*p, v),
        (Ty::Any, TypedValue::Any(node)) => !node.is_null(),
        (Ty::Enum(name), TypedValue::Enum(e)) => {
            e.enum_name == *name && schema.enumeration(name).is_some_and(|def| def.has_symbol(&e.symbol))
        }
        (Ty::Record(name), TypedValue::Record(r)) => {
            r.type_name() == name && schema.record(name).is_some_and(|def| record_conforms(schema, def, r))
        }
        (Ty::Array(item), TypedValue::Array(xs)) => xs.iter().all(|x| conforms(schema, item, x)),
        (Ty::Union(alts), TypedValue::Union(u)) => {
            alts.get(u.index).is_some_and(|alt| conforms(schema, alt, &u.value))
        }
        (Ty::Optional(_), v) => conforms(schema, &normalize(ty), v),
        _ => false,
    }
}

fn record_conforms(schema: &Schema, def: &RecordDef, record: &RecordValue) -> bool {
    let declared = def.fields.iter().all(|f| match record.raw(&f.name) {
        Some(v) => conforms(schema, &f.ty, v) && (f.name != CLASS || names_class(def, v)),
        None => !f.required,
    });
    declared && record.fields().all(|(name, _)| def.field(name).is_some())
}

fn names_class(def: &RecordDef, value: &TypedValue) -> bool {
    encode::encode(value).as_str() == Some(def.name.as_str())
}

/// `value` in the form `ty` stores it, or `None` if it does not fit.
fn fit(schema: &Schema, ty: &Ty, value: &TypedValue) -> Option<TypedValue> {
    if conforms(schema, ty, value) {
        return Some(value.clone());
    }
    match (ty, value) {
        (Ty::Primitive(p @ (Primitive::Float | Primitive::Double)), TypedValue::Int(i)) => {
            let widened = TypedValue::Float(*i as f64);
            prim::conforms(*p, &widened).then_some(widened)
        }
        (Ty::Array(item), TypedValue::Array(xs)) => {
            xs.iter().map(|x| fit(schema, item, x)).collect::<Option<Vec<_>>>().map(TypedValue::Array)
        }
        // an already wrapped value claims its alternative; it is not re-picked
        (Ty::Union(_), TypedValue::Union(_)) => None,
        (Ty::Union(alts), v) => alts
            .iter()
            .enumerate()
            .find_map(|(index, alt)| fit(schema, alt, v).map(|v| TypedValue::Union(UnionValue::new(index, v)))),
        (Ty::Optional(_), v) => fit(schema, &normalize(ty), v),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct RecordBuilder<'s> {
    schema: &'s Schema,
    def: &'s RecordDef,
    record: RecordValue,
}

impl<'s> RecordBuilder<'s> {
    /// Starts an empty record; a declared `class` field is filled in with
    /// the record's name.
    pub fn new(schema: &'s Schema, name: &str) -> Result<Self, ValueError> {
        let def = schema.record(name).ok_or_else(|| ValueError::UndefinedRecord(name.to_string()))?;
        let mut record = RecordValue::new(def.name.clone());
        if let Some(field) = def.class_field() {
            let mut path = Path::root();
            let class = path
                .with(Segment::Field(field.name.clone()), |path| {
                    Decoder::new(schema).decode_at(&field.ty, &Node::from(def.name.as_str()), path, 1)
                })
                .map_err(|source| nonconforming(def, field, source))?;
            record.set(field.name.clone(), class);
        }
        Ok(Self { schema, def, record })
    }

    pub fn set(mut self, name: &str, value: impl Into<TypedValue>) -> Result<Self, ValueError> {
        let field = self.def.field(name).ok_or_else(|| ValueError::NoSuchField {
            record: self.def.name.clone(),
            field: name.to_string(),
        })?;
        let value = value.into();
        let path = Path::root().field(&field.name);
        let typed = match fit(self.schema, &field.ty, &value) {
            Some(typed) if field.name == CLASS && !names_class(self.def, &typed) => {
                return Err(nonconforming(self.def, field, DecodeError::ClassMismatch {
                    record: self.def.name.clone(),
                    actual: encode::encode(&typed).as_str().map(str::to_string),
                    path,
                }));
            }
            Some(typed) => typed,
            None => return Err(nonconforming(self.def, field, self.explain(field, &value, path))),
        };
        self.record.set(field.name.clone(), typed);
        Ok(self)
    }

    pub fn unset(mut self, name: &str) -> Self {
        self.record.unset(name);
        self
    }

    /// Attaches a namespaced `prefix:name` field, kept verbatim.
    pub fn extension(mut self, key: &str, node: impl Into<Node>) -> Result<Self, ValueError> {
        if !obj::is_extension_key(key) {
            return Err(ValueError::NotAnExtension(key.to_string()));
        }
        self.record.set_extension(key, node.into());
        Ok(self)
    }

    pub fn build(self) -> Result<RecordValue, ValueError> {
        if let Some(f) = self.def.fields.iter().find(|f| f.required && !self.record.is_set(&f.name)) {
            return Err(ValueError::MissingField { record: self.def.name.clone(), field: f.name.clone() });
        }
        Ok(self.record)
    }

    /// Why `value` does not fit `field`: what a document holding its encoded
    /// form would fail with, or a plain mismatch when such a document would
    /// decode (as a different type).
    fn explain(&self, field: &Field, value: &TypedValue, mut path: Path) -> DecodeError {
        let node = self.schema.encoder().encode(value);
        let decoder = Decoder::new(self.schema);
        let depth = path.segments().len();
        match decoder.decode_at(&field.ty, &node, &mut path, depth) {
            Err(err) => err,
            Ok(_) => mismatch(&field.ty, &node, &path),
        }
    }
}

fn nonconforming(def: &RecordDef, field: &Field, source: DecodeError) -> ValueError {
    ValueError::Nonconforming { record: def.name.clone(), field: field.name.clone(), source }
}

// ------------------------------- Tests ------------------------------------ //
