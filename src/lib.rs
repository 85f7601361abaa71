//! Schema-driven typed documents.
//!
//! A [`Schema`] is a registry of record and enum types. Documents arrive as
//! generic [`Node`] trees (mappings, sequences, scalars, null) and are decoded
//! into [`TypedValue`]s; union-typed positions carry no tag, so the resolver
//! picks the first declared alternative the node matches. Encoding goes the
//! other way and drops the tags again.
//!
//! ```
//! use salad_doc::{EnumDef, Field, Node, RecordDef, Schema, Ty};
//! use serde_json::json;
//!
//! let schema = Schema::builder()
//!     .enumeration(EnumDef::new("Species", ["homo_sapiens", "mus_musculus"]))
//!     .record(RecordDef::new("Sample", vec![
//!         Field::new("id", Ty::string()),
//!         Field::new("species", Ty::union([Ty::enumeration("Species"), Ty::string()])),
//!     ]))
//!     .build()?;
//!
//! let doc = Node::from(json!({"id": "s1", "species": "mus_musculus"}));
//! let sample = schema.decoder().decode_record("Sample", &doc)?;
//! assert_eq!(sample.get("species").and_then(|v| v.as_symbol()), Some("mus_musculus"));
//! assert_eq!(schema.encoder().encode_record(&sample), doc);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod decl;
pub mod decode;
pub mod dsl;
pub mod encode;
pub mod error;
pub mod ir;
pub mod lower;
pub mod matching;
pub mod node;
pub mod norm_ir;
pub mod options;
pub mod path_de;
pub mod resolve;
pub mod schema;
pub mod value;

pub use builder::RecordBuilder;
pub use decode::Decoder;
pub use encode::Encoder;
pub use error::{DecodeError, LoadError, Path, Segment, SchemaError, ValueError};
pub use ir::{EnumDef, Field, IdMap, Primitive, RecordDef, Ty};
pub use lower::{load_schema_str, load_schema_value};
pub use matching::Matcher;
pub use node::{Mapping, Node, NodeKind, Scalar};
pub use options::{DecodeOptions, UnknownFields};
pub use resolve::resolve;
pub use schema::{NamedType, Schema, SchemaBuilder};
pub use value::{EnumValue, RecordValue, TypedValue, UnionValue};

/// Decodes `node` as `ty` with default options.
pub fn decode(schema: &Schema, ty: &Ty, node: &Node) -> Result<TypedValue, DecodeError> {
    schema.decoder().decode(ty, node)
}

/// Encodes `value`, ordering record fields as `schema` declares them.
pub fn encode(schema: &Schema, value: &TypedValue) -> Node {
    schema.encoder().encode(value)
}

/// Whether `node` can be decoded as `ty` with default options.
pub fn matches(schema: &Schema, ty: &Ty, node: &Node) -> bool {
    let options = DecodeOptions::default();
    Matcher::new(schema, &options).matches(ty, node)
}
