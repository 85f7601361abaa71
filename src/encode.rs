//! Typed value → node.
//!
//! Encoding cannot fail: a value produced by the decoder (or the record
//! builder) already fits the schema. Unions encode as their payload with no
//! tag, so the chosen alternative is recovered on the way back in by the
//! resolver.

use ordered_float::OrderedFloat;

use crate::ir::CLASS;
use crate::node::{Mapping, Node, Scalar};
use crate::schema::Schema;
use crate::value::{RecordValue, TypedValue};

#[derive(Debug, Clone, Copy)]
pub struct Encoder<'s> {
    schema: &'s Schema,
}

impl<'s> Encoder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    pub fn encode(&self, value: &TypedValue) -> Node {
        match value {
            TypedValue::Record(r) => self.encode_record(r),
            TypedValue::Array(xs) => Node::Sequence(xs.iter().map(|x| self.encode(x)).collect()),
            TypedValue::Union(u) => self.encode(&u.value),
            other => encode_leaf(other),
        }
    }

    /// Set fields in declaration order, then any the schema does not know
    /// about in insertion order, then extensions. A declared `class` is
    /// always written, as the record's own name.
    pub fn encode_record(&self, record: &RecordValue) -> Node {
        let mut out = Mapping::with_capacity(record.len() + record.extensions().len() + 1);
        if let Some(def) = self.schema.record(record.type_name()) {
            for field in &def.fields {
                if field.name == CLASS {
                    out.insert(field.name.clone(), Node::from(def.name.as_str()));
                } else if let Some(v) = record.raw(&field.name) {
                    out.insert(field.name.clone(), self.encode(v));
                }
            }
        }
        for (name, v) in record.fields() {
            if !out.contains_key(name) {
                out.insert(name.to_string(), self.encode(v));
            }
        }
        for (key, node) in record.extensions() {
            out.entry(key.clone()).or_insert_with(|| node.clone());
        }
        Node::Mapping(out)
    }
}

/// Schema-free encoding: record fields come out in insertion order.
pub fn encode(value: &TypedValue) -> Node {
    match value {
        TypedValue::Record(r) => {
            let mut out: Mapping = r.fields().map(|(k, v)| (k.to_string(), encode(v))).collect();
            for (key, node) in r.extensions() {
                out.entry(key.clone()).or_insert_with(|| node.clone());
            }
            Node::Mapping(out)
        }
        TypedValue::Array(xs) => Node::Sequence(xs.iter().map(encode).collect()),
        TypedValue::Union(u) => encode(&u.value),
        other => encode_leaf(other),
    }
}

fn encode_leaf(value: &TypedValue) -> Node {
    match value {
        TypedValue::Null => Node::Null,
        TypedValue::Bool(b) => Node::Scalar(Scalar::Bool(*b)),
        TypedValue::Int(i) => Node::Scalar(Scalar::Int(*i)),
        TypedValue::Float(x) => Node::Scalar(Scalar::Float(OrderedFloat(*x))),
        TypedValue::String(s) => Node::Scalar(Scalar::Str(s.clone())),
        TypedValue::Enum(e) => Node::Scalar(Scalar::Str(e.symbol.clone())),
        TypedValue::Any(node) => node.clone(),
        TypedValue::Record(_) | TypedValue::Array(_) | TypedValue::Union(_) => encode(value),
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{EnumDef, Field, RecordDef, Ty};
    use crate::value::UnionValue;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::builder()
            .enumeration(EnumDef::new("Species", ["homo_sapiens", "mus_musculus"]))
            .record(RecordDef::new("Sample", vec![
                Field::new("id", Ty::string()),
                Field::new("species", Ty::optional(Ty::enumeration("Species"))),
                Field::new("depth", Ty::optional(Ty::double())),
            ]))
            .build()
            .unwrap()
    }

    #[test]
    fn unset_optional_is_omitted() {
        let s = schema();
        let mut r = RecordValue::new("Sample");
        r.set("id", "s1");
        let node = s.encoder().encode(&TypedValue::Record(r));
        assert_eq!(serde_json::Value::from(node), json!({"id": "s1"}));
    }

    #[test]
    fn fields_follow_declaration_order() {
        let s = schema();
        let mut r = RecordValue::new("Sample");
        r.set("depth", UnionValue::new(1, TypedValue::Float(12.5)));
        r.set("species", UnionValue::new(1, TypedValue::symbol("Species", "mus_musculus")));
        r.set("id", "s1");
        let node = s.encoder().encode_record(&r);
        let keys: Vec<&str> = node.as_mapping().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "species", "depth"]);

        // without a schema the record's own order is kept
        let keys: Vec<String> = encode(&TypedValue::Record(r)).as_mapping().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["depth", "species", "id"]);
    }

    #[test]
    fn unions_encode_untagged_and_null_is_explicit() {
        let s = schema();
        let mut r = RecordValue::new("Sample");
        r.set("id", "s1");
        r.set("species", UnionValue::new(0, TypedValue::Null));
        let node = s.encoder().encode(&TypedValue::Record(r));
        assert_eq!(serde_json::Value::from(node), json!({"id": "s1", "species": null}));
    }

    #[test]
    fn decode_encode_round_trip() {
        let s = schema();
        let doc = Node::from(json!({
            "id": "s1",
            "species": "homo_sapiens",
            "depth": 30.5,
            "sra:accession": "SRR000001",
        }));
        let value = s.decoder().decode(&Ty::record("Sample"), &doc).unwrap();
        let back = s.encoder().encode(&value);
        assert_eq!(back, doc);
        assert_eq!(s.decoder().decode(&Ty::record("Sample"), &back).unwrap(), value);
    }

    #[test]
    fn class_is_written_back_as_the_record_name() {
        let s = Schema::builder()
            .record(RecordDef::new("File", vec![
                Field::new("class", Ty::string()),
                Field::new("location", Ty::string()),
            ]))
            .build()
            .unwrap();
        let mut r = RecordValue::new("File");
        r.set("location", "a.txt");
        assert_eq!(serde_json::Value::from(s.encoder().encode_record(&r)), json!({"class": "File", "location": "a.txt"}));

        let doc = Node::from(json!({"class": "File", "location": "b.txt"}));
        let value = s.decoder().decode(&Ty::record("File"), &doc).unwrap();
        assert_eq!(s.encoder().encode(&value), doc);
    }

    #[test]
    fn any_is_passed_through() {
        let payload = Node::from(json!({"nested": [1, "two", null]}));
        assert_eq!(encode(&TypedValue::Any(payload.clone())), payload);
    }
}
