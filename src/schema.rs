//! Validated registry of named record and enum types.
//!
//! A `Schema` is built once, checked eagerly, and never mutated afterwards;
//! share it by reference (it is `Send + Sync`) across any number of decodes.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::error::SchemaError;
use crate::ir::{EnumDef, Primitive, RecordDef, Ty, ANY};
use crate::norm_ir::normalize;
use crate::options::DecodeOptions;
use crate::value::TypedValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamedType {
    Record(RecordDef),
    Enum(EnumDef),
}

impl NamedType {
    pub fn name(&self) -> &str {
        match self {
            NamedType::Record(r) => &r.name,
            NamedType::Enum(e) => &e.name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    types: IndexMap<String, NamedType>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&NamedType> {
        self.types.get(name)
    }

    pub fn record(&self, name: &str) -> Option<&RecordDef> {
        match self.types.get(name) {
            Some(NamedType::Record(r)) => Some(r),
            _ => None,
        }
    }

    pub fn enumeration(&self, name: &str) -> Option<&EnumDef> {
        match self.types.get(name) {
            Some(NamedType::Enum(e)) => Some(e),
            _ => None,
        }
    }

    /// Declared type names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Type reference for a declared name, or `None` if undeclared.
    pub fn ty(&self, name: &str) -> Option<Ty> {
        self.types.get(name).map(|t| match t {
            NamedType::Record(r) => Ty::Record(r.name.clone()),
            NamedType::Enum(e) => Ty::Enum(e.name.clone()),
        })
    }

    pub fn decoder(&self) -> Decoder<'_> {
        Decoder::new(self)
    }

    pub fn decoder_with(&self, options: DecodeOptions) -> Decoder<'_> {
        Decoder::with_options(self, options)
    }

    pub fn encoder(&self) -> Encoder<'_> {
        Encoder::new(self)
    }

    /// Whether a typed value fits `ty`; see `builder::conforms`.
    pub fn conforms(&self, ty: &Ty, value: &TypedValue) -> bool {
        crate::builder::conforms(self, ty, value)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDER
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    types: Vec<NamedType>,
}

impl SchemaBuilder {
    pub fn record(mut self, def: RecordDef) -> Self {
        self.types.push(NamedType::Record(def));
        self
    }

    pub fn enumeration(mut self, def: EnumDef) -> Self {
        self.types.push(NamedType::Enum(def));
        self
    }

    pub fn push(&mut self, t: NamedType) {
        self.types.push(t);
    }

    /// Validates every declaration and normalizes field types.
    ///
    /// Rejects duplicate type names, names that shadow built-ins, duplicate
    /// fields and symbols, empty enums, empty unions and references to types
    /// that are not declared (or declared as the other kind).
    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut types: IndexMap<String, NamedType> = IndexMap::with_capacity(self.types.len());
        for t in self.types {
            let name = t.name().to_string();
            if name == ANY || Primitive::from_name(&name).is_some() {
                return Err(SchemaError::ReservedName(name));
            }
            if types.contains_key(&name) {
                return Err(SchemaError::DuplicateType(name));
            }
            types.insert(name, t);
        }

        for t in types.values() {
            match t {
                NamedType::Enum(e) => check_enum(e)?,
                NamedType::Record(r) => {
                    let mut seen = HashSet::new();
                    for f in &r.fields {
                        if !seen.insert(f.name.as_str()) {
                            return Err(SchemaError::DuplicateField {
                                record: r.name.clone(),
                                field: f.name.clone(),
                            });
                        }
                        let context = format!("{}.{}", r.name, f.name);
                        check_refs(&types, &f.ty, &context)?;
                    }
                }
            }
        }

        for t in types.values_mut() {
            if let NamedType::Record(r) = t {
                for f in &mut r.fields {
                    f.ty = normalize(&f.ty);
                }
            }
        }

        debug!(types = types.len(), "schema built");
        Ok(Schema { types })
    }
}

fn check_enum(e: &EnumDef) -> Result<(), SchemaError> {
    if e.symbols.is_empty() {
        return Err(SchemaError::EmptyEnum(e.name.clone()));
    }
    let mut seen = HashSet::new();
    for s in &e.symbols {
        if !seen.insert(s.as_str()) {
            return Err(SchemaError::DuplicateSymbol {
                enum_name: e.name.clone(),
                symbol: s.clone(),
            });
        }
    }
    Ok(())
}

fn check_refs(types: &IndexMap<String, NamedType>, ty: &Ty, context: &str) -> Result<(), SchemaError> {
    match ty {
        Ty::Primitive(_) | Ty::Any => Ok(()),
        Ty::Record(name) => match types.get(name) {
            Some(NamedType::Record(_)) => Ok(()),
            _ => Err(SchemaError::UndefinedType {
                name: name.clone(),
                expected: "record",
                context: context.to_string(),
            }),
        },
        Ty::Enum(name) => match types.get(name) {
            Some(NamedType::Enum(_)) => Ok(()),
            _ => Err(SchemaError::UndefinedType {
                name: name.clone(),
                expected: "enum",
                context: context.to_string(),
            }),
        },
        Ty::Array(item) | Ty::Optional(item) => check_refs(types, item, context),
        Ty::Union(alts) if alts.is_empty() => Err(SchemaError::EmptyUnion { context: context.to_string() }),
        Ty::Union(alts) => alts.iter().try_for_each(|a| check_refs(types, a, context)),
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Field;

    fn species() -> EnumDef {
        EnumDef::new("Species", ["homo_sapiens", "mus_musculus"])
    }

    #[test]
    fn builds_and_normalizes_field_types() {
        let schema = Schema::builder()
            .enumeration(species())
            .record(RecordDef::new("Sample", vec![
                Field::new("id", Ty::string()),
                Field::new("species", Ty::optional(Ty::enumeration("Species"))),
                Field::new("children", Ty::optional(Ty::array(Ty::record("Sample")))),
            ]))
            .build()
            .unwrap();

        let sample = schema.record("Sample").unwrap();
        assert_eq!(
            sample.field("species").unwrap().ty,
            Ty::union([Ty::null(), Ty::enumeration("Species")])
        );
        assert!(!sample.field("children").unwrap().required);
        assert_eq!(schema.names().collect::<Vec<_>>(), ["Species", "Sample"]);
        assert_eq!(schema.ty("Species"), Some(Ty::enumeration("Species")));
    }

    #[test]
    fn rejects_duplicate_field_names() {
        let err = Schema::builder()
            .record(RecordDef::new("R", vec![
                Field::new("a", Ty::string()),
                Field::new("a", Ty::int()),
            ]))
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateField { record: "R".into(), field: "a".into() });
    }

    #[test]
    fn rejects_empty_union_and_dangling_refs() {
        let err = Schema::builder()
            .record(RecordDef::new("R", vec![Field::new("a", Ty::Union(vec![]))]))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::EmptyUnion { .. }));

        let err = Schema::builder()
            .record(RecordDef::new("R", vec![Field::new("a", Ty::array(Ty::record("Missing")))]))
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "R.a: `Missing` is not a declared record");
    }

    #[test]
    fn rejects_kind_confusion() {
        let err = Schema::builder()
            .enumeration(species())
            .record(RecordDef::new("R", vec![Field::new("a", Ty::record("Species"))]))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UndefinedType { expected: "record", .. }));
    }

    #[test]
    fn rejects_bad_enums_and_names() {
        let dup = Schema::builder()
            .enumeration(EnumDef::new("E", ["x", "x"]))
            .build()
            .unwrap_err();
        assert!(matches!(dup, SchemaError::DuplicateSymbol { .. }));

        let empty = Schema::builder()
            .enumeration(EnumDef::new("E", Vec::<String>::new()))
            .build()
            .unwrap_err();
        assert_eq!(empty, SchemaError::EmptyEnum("E".into()));

        let twice = Schema::builder().enumeration(species()).enumeration(species()).build().unwrap_err();
        assert_eq!(twice, SchemaError::DuplicateType("Species".into()));

        let reserved = Schema::builder().record(RecordDef::new("string", vec![])).build().unwrap_err();
        assert_eq!(reserved, SchemaError::ReservedName("string".into()));
    }

    #[test]
    fn schema_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schema>();
    }
}
