//! Node → typed value.
//!
//! Decoding is fail-fast: the first problem aborts the call and comes back
//! with the document path where it was found. Union-typed positions go
//! through the resolver; everything else is a direct structural walk.

use std::borrow::Cow;

use tracing::debug;

use crate::dsl;
use crate::error::{DecodeError, Path, Segment};
use crate::ir::{RecordDef, Ty};
use crate::matching::obj::{self, KeyClass};
use crate::matching::{mismatch, prim, undefined, Matcher};
use crate::node::{Node, Scalar};
use crate::norm_ir::{is_normal, normalize};
use crate::options::DecodeOptions;
use crate::resolve::{resolve_at, Memo};
use crate::schema::Schema;
use crate::value::{EnumValue, RecordValue, TypedValue, UnionValue};

#[derive(Debug, Clone)]
pub struct Decoder<'s> {
    schema: &'s Schema,
    options: DecodeOptions,
}

impl<'s> Decoder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self::with_options(schema, DecodeOptions::default())
    }

    pub fn with_options(schema: &'s Schema, options: DecodeOptions) -> Self {
        Self { schema, options }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    pub fn matcher(&self) -> Matcher<'_> {
        Matcher::new(self.schema, &self.options)
    }

    pub fn decode(&self, ty: &Ty, node: &Node) -> Result<TypedValue, DecodeError> {
        debug!(%ty, kind = %node.kind(), "decode");
        let mut path = Path::root();
        if is_normal(ty) {
            self.decode_at(ty, node, &mut path, 0)
        } else {
            self.decode_at(&normalize(ty), node, &mut path, 0)
        }
    }

    /// Decodes a document whose root is the named record.
    pub fn decode_record(&self, name: &str, node: &Node) -> Result<RecordValue, DecodeError> {
        let def = self.schema.record(name).ok_or_else(|| undefined(name, &Path::root()))?;
        debug!(record = name, "decode");
        let memo = Memo::default();
        self.record_in(&self.matcher().with_memo(&memo), def, node, &mut Path::root(), 0)
    }

    pub(crate) fn decode_at(
        &self,
        ty: &Ty,
        node: &Node,
        path: &mut Path,
        depth: usize,
    ) -> Result<TypedValue, DecodeError> {
        let memo = Memo::default();
        self.decode_in(&self.matcher().with_memo(&memo), ty, node, path, depth)
    }

    fn decode_in(
        &self,
        matcher: &Matcher<'_>,
        ty: &Ty,
        node: &Node,
        path: &mut Path,
        depth: usize,
    ) -> Result<TypedValue, DecodeError> {
        if depth > self.options.max_depth {
            return Err(DecodeError::DepthExceeded { limit: self.options.max_depth, path: path.clone() });
        }
        match ty {
            Ty::Primitive(p) => prim::decode(*p, node).ok_or_else(|| mismatch(ty, node, path)),
            Ty::Any => {
                if node.is_null() {
                    Err(mismatch(ty, node, path))
                } else {
                    Ok(TypedValue::Any(node.clone()))
                }
            }
            Ty::Enum(name) => {
                let def = self.schema.enumeration(name).ok_or_else(|| undefined(name, path))?;
                match node {
                    Node::Scalar(Scalar::Str(s)) if def.has_symbol(s) => Ok(TypedValue::Enum(EnumValue {
                        enum_name: def.name.clone(),
                        symbol: s.clone(),
                    })),
                    Node::Scalar(Scalar::Str(s)) => Err(DecodeError::InvalidSymbol {
                        enum_name: def.name.clone(),
                        actual: s.clone(),
                        path: path.clone(),
                    }),
                    other => Err(mismatch(ty, other, path)),
                }
            }
            Ty::Record(name) => {
                let def = self.schema.record(name).ok_or_else(|| undefined(name, path))?;
                self.record_in(matcher, def, node, path, depth).map(TypedValue::Record)
            }
            Ty::Array(item) => {
                let Node::Sequence(xs) = node else {
                    return Err(mismatch(ty, node, path));
                };
                let mut out = Vec::with_capacity(xs.len());
                for (i, x) in xs.iter().enumerate() {
                    let value = path.with(Segment::Index(i), |path| self.decode_in(matcher, item, x, path, depth + 1))?;
                    out.push(value);
                }
                Ok(TypedValue::Array(out))
            }
            Ty::Union(alts) => {
                let index = resolve_at(matcher, alts, node, path, depth)?;
                let value = self.decode_in(matcher, &alts[index], node, path, depth)?;
                Ok(TypedValue::Union(UnionValue::new(index, value)))
            }
            // the normalized type is a temporary, so it gets its own memo
            Ty::Optional(_) => self.decode_at(&normalize(ty), node, path, depth),
        }
    }

    fn record_in(
        &self,
        matcher: &Matcher<'_>,
        def: &RecordDef,
        node: &Node,
        path: &mut Path,
        depth: usize,
    ) -> Result<RecordValue, DecodeError> {
        let Node::Mapping(map) = node else {
            return Err(DecodeError::TypeMismatch {
                expected: def.name.clone(),
                actual: node.kind(),
                path: path.clone(),
            });
        };
        obj::check_shape(def, map, path, &self.options)?;

        let mut record = RecordValue::new(def.name.clone());
        for field in &def.fields {
            let Some(value) = map.get(&field.name) else {
                continue;
            };
            let decoded = path.with(Segment::Field(field.name.clone()), |path| -> Result<TypedValue, DecodeError> {
                match dsl::prepare(field, value, path)? {
                    Cow::Borrowed(value) => self.decode_in(matcher, &field.ty, value, path, depth + 1),
                    Cow::Owned(value) => self.decode_at(&field.ty, &value, path, depth + 1),
                }
            })?;
            record.set(field.name.clone(), decoded);
        }

        for (key, value) in map {
            if obj::classify_key(def, key, &self.options) == KeyClass::Extension {
                record.set_extension(key.clone(), value.clone());
            }
        }
        Ok(record)
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{EnumDef, Field};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::builder()
            .enumeration(EnumDef::new("Species", ["homo_sapiens", "mus_musculus"]))
            .record(RecordDef::new("Organism", vec![
                Field::new("name", Ty::string()),
                Field::new("type", Ty::union([Ty::enumeration("Species"), Ty::null()])),
            ]))
            .record(RecordDef::new("Study", vec![
                Field::new("id", Ty::string()),
                Field::new("organisms", Ty::array(Ty::record("Organism"))),
                Field::new("notes", Ty::optional(Ty::string())),
            ]))
            .build()
            .unwrap()
    }

    fn node(v: serde_json::Value) -> Node {
        Node::from(v)
    }

    #[test]
    fn missing_required_field_cites_its_path() {
        let s = Schema::builder()
            .record(RecordDef::new("Item", vec![Field::new("id", Ty::string()).required(true)]))
            .build()
            .unwrap();
        let err = s.decoder().decode(&Ty::record("Item"), &node(json!({}))).unwrap_err();
        let DecodeError::MissingField { record, field, path } = err else {
            panic!("expected MissingField, got {err:?}");
        };
        assert_eq!((record.as_str(), field.as_str()), ("Item", "id"));
        assert_eq!(path, ["id"].into_iter().collect::<Path>());
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        let s = schema();
        let err = s.decoder().decode(&Ty::enumeration("Species"), &node(json!("canis_lupus"))).unwrap_err();
        assert_eq!(err, DecodeError::InvalidSymbol {
            enum_name: "Species".into(),
            actual: "canis_lupus".into(),
            path: Path::root(),
        });
    }

    #[test]
    fn union_field_inside_array_elements() {
        let s = schema();
        let doc = node(json!({
            "id": "st1",
            "organisms": [
                {"name": "species", "type": "mus_musculus"},
                {"name": "unknown", "type": null},
            ],
        }));
        let study = s.decoder().decode_record("Study", &doc).unwrap();
        let organisms = study.get("organisms").and_then(TypedValue::as_array).unwrap();

        let first = organisms[0].as_record().unwrap();
        assert_eq!(first.raw("type").and_then(TypedValue::union_index), Some(0));
        assert_eq!(first.get("type").and_then(TypedValue::as_symbol), Some("mus_musculus"));

        let second = organisms[1].as_record().unwrap();
        assert_eq!(second.raw("type").and_then(TypedValue::union_index), Some(1));
        assert_eq!(second.get("type"), None);
    }

    #[test]
    fn absent_optional_stays_unset_but_null_is_a_value() {
        let s = schema();
        let unset = s.decoder().decode_record("Study", &node(json!({"id": "a", "organisms": []}))).unwrap();
        assert!(!unset.is_set("notes"));

        let null = s.decoder()
            .decode_record("Study", &node(json!({"id": "a", "organisms": [], "notes": null})))
            .unwrap();
        assert!(null.is_set("notes"));
        assert_eq!(null.raw("notes").and_then(TypedValue::union_index), Some(0));

        // a null for a field that cannot hold one is a type error, not an absence
        let err = s.decoder()
            .decode_record("Study", &node(json!({"id": null, "organisms": []})))
            .unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { .. }));
        assert_eq!(err.path().to_string(), "id");
    }

    #[test]
    fn optional_and_null_union_decode_identically() {
        let s = schema();
        let a = s.decoder().decode(&Ty::optional(Ty::long()), &node(json!(5))).unwrap();
        let b = s.decoder().decode(&Ty::union([Ty::null(), Ty::long()]), &node(json!(5))).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.union_index(), Some(1));
    }

    #[test]
    fn scalar_where_record_expected() {
        let s = schema();
        let err = s.decoder().decode_record("Study", &node(json!("st1"))).unwrap_err();
        assert_eq!(err.to_string(), ".: expected Study, found string");
    }

    #[test]
    fn error_paths_go_through_arrays() {
        let s = schema();
        let doc = node(json!({"id": "a", "organisms": [{"name": "ok"}, {"name": 3}]}));
        let err = s.decoder().decode_record("Study", &doc).unwrap_err();
        assert_eq!(err.path().to_string(), "organisms[1].name");
    }

    #[test]
    fn extensions_are_kept_and_unknowns_rejected() {
        let s = schema();
        let doc = node(json!({"id": "a", "organisms": [], "edam:format": "http://edamontology.org/format_1930"}));
        let study = s.decoder().decode_record("Study", &doc).unwrap();
        assert_eq!(study.extension("edam:format").and_then(Node::as_str), Some("http://edamontology.org/format_1930"));

        let doc = node(json!({"id": "a", "organisms": [], "colour": "red"}));
        let err = s.decoder().decode_record("Study", &doc).unwrap_err();
        assert_eq!(err.path().to_string(), "colour");

        let lenient = s.decoder_with(DecodeOptions::permissive());
        let study = lenient.decode_record("Study", &doc).unwrap();
        assert!(study.extensions().is_empty());
        assert!(!study.is_set("colour"));
    }

    #[test]
    fn depth_limit_stops_runaway_nesting() {
        let s = Schema::builder()
            .record(RecordDef::new("Tree", vec![
                Field::new("children", Ty::optional(Ty::array(Ty::record("Tree")))),
            ]))
            .build()
            .unwrap();
        let mut doc = json!({});
        for _ in 0..40 {
            doc = json!({"children": [doc]});
        }
        let shallow = s.decoder_with(DecodeOptions::default().with_max_depth(16));
        let err = shallow.decode_record("Tree", &node(doc.clone())).unwrap_err();
        assert!(matches!(err, DecodeError::DepthExceeded { limit: 16, .. }));

        assert!(s.decoder().decode_record("Tree", &node(doc)).is_ok());
    }

    #[test]
    fn undeclared_root_type() {
        let s = schema();
        let err = s.decoder().decode_record("Nope", &node(json!({}))).unwrap_err();
        assert!(matches!(err, DecodeError::UndefinedType { .. }));
    }
}
