//! Declaration document → validated `Schema`.
//!
//! Two passes: the first records the kind (record or enum) of every declared
//! name, inline ones included, so that a bare name in a type expression can be
//! lowered to the right reference; the second lowers fields and hoists inline
//! named types into the registry.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::decl::{ComplexDecl, EnumDecl, FieldDecl, NamedDecl, PredicateDecl, RecordDecl, SchemaDoc, TypeExprDecl};
use crate::dsl::parse_type_dsl;
use crate::error::LoadError;
use crate::ir::{EnumDef, Field, Primitive, RecordDef, Ty, ANY};
use crate::path_de;
use crate::schema::{NamedType, Schema, SchemaBuilder};

/// Vocabulary prefixes that name the same built-in types.
const BUILTIN_PREFIXES: [&str; 2] = ["xsd:", "sld:"];

pub fn load_schema_str(src: &str) -> Result<Schema, LoadError> {
    let value: Value = path_de::from_str_with_path(src)?;
    load_schema_value(value)
}

/// Declarations are read one by one so a parse error names the element it
/// came from.
pub fn load_schema_value(value: Value) -> Result<Schema, LoadError> {
    let (prefix, items) = match value {
        Value::Array(items) => (String::new(), items),
        Value::Object(mut map) => match ["types", "$graph"].into_iter().find_map(|k| map.remove(k).map(|v| (k, v))) {
            Some((key, Value::Array(items))) => (key.to_string(), items),
            _ => {
                return Err(LoadError::Parse {
                    path: ".".into(),
                    message: "expected a list of declarations under `types`".into(),
                });
            }
        },
        _ => {
            return Err(LoadError::Parse { path: ".".into(), message: "expected a list of declarations".into() });
        }
    };

    let decls = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            path_de::from_value_with_path::<NamedDecl>(item).map_err(|err| match err {
                LoadError::Parse { path, message } => {
                    let inner = if path == "." { String::new() } else { format!(".{path}") };
                    LoadError::Parse { path: format!("{prefix}[{i}]{inner}"), message }
                }
                other => other,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    lower_decls(decls)
}

pub fn lower_schema(doc: SchemaDoc) -> Result<Schema, LoadError> {
    lower_decls(doc.into_types())
}

pub fn lower_decls(decls: Vec<NamedDecl>) -> Result<Schema, LoadError> {
    let mut kinds = HashMap::new();
    for d in &decls {
        match d {
            NamedDecl::Record(r) => collect_record(r, &mut kinds),
            NamedDecl::Enum(e) => {
                kinds.insert(e.name.clone(), Kind::Enum);
            }
        }
    }

    let mut lowering = Lowering { kinds, builder: Schema::builder() };
    for d in &decls {
        match d {
            NamedDecl::Record(r) => lowering.record(r)?,
            NamedDecl::Enum(e) => lowering.enumeration(e),
        }
    }
    let schema = lowering.builder.build()?;
    debug!(types = schema.len(), "schema declarations lowered");
    Ok(schema)
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Record,
    Enum,
}

fn collect_record(r: &RecordDecl, kinds: &mut HashMap<String, Kind>) {
    kinds.insert(r.name.clone(), Kind::Record);
    for f in &r.fields {
        collect_expr(&f.ty, kinds);
    }
}

fn collect_expr(expr: &TypeExprDecl, kinds: &mut HashMap<String, Kind>) {
    match expr {
        TypeExprDecl::Name(_) => {}
        TypeExprDecl::Union(alts) => alts.iter().for_each(|a| collect_expr(a, kinds)),
        TypeExprDecl::Complex(c) => match c.as_ref() {
            ComplexDecl::Record(r) => collect_record(r, kinds),
            ComplexDecl::Enum(e) => {
                kinds.insert(e.name.clone(), Kind::Enum);
            }
            ComplexDecl::Array { items } => collect_expr(items, kinds),
        },
    }
}

fn strip_builtin_prefix(name: &str) -> &str {
    BUILTIN_PREFIXES.iter().find_map(|p| name.strip_prefix(p)).unwrap_or(name)
}

struct Lowering {
    kinds: HashMap<String, Kind>,
    builder: SchemaBuilder,
}

impl Lowering {
    fn record(&mut self, r: &RecordDecl) -> Result<(), LoadError> {
        let fields = r
            .fields
            .iter()
            .map(|f| self.field(&r.name, f))
            .collect::<Result<Vec<_>, _>>()?;
        self.builder.push(NamedType::Record(RecordDef::new(r.name.clone(), fields)));
        Ok(())
    }

    fn enumeration(&mut self, e: &EnumDecl) {
        self.builder.push(NamedType::Enum(EnumDef::new(e.name.clone(), e.symbols.iter().cloned())));
    }

    fn field(&mut self, record: &str, f: &FieldDecl) -> Result<Field, LoadError> {
        let context = format!("{record}.{}", f.name);
        let ty = self.expr(&f.ty, &context)?;
        let required = f.required.unwrap_or(!ty.accepts_null());
        let mut field = Field::new(f.name.clone(), ty).required(required);
        if let Some(hints) = f.jsonld_predicate.as_ref().and_then(PredicateDecl::hints) {
            if let Some(subject) = &hints.map_subject {
                field = field.with_id_map(subject.clone(), hints.map_predicate.as_deref());
            }
            if hints.type_dsl {
                field = field.with_type_dsl();
            }
        }
        Ok(field)
    }

    fn expr(&mut self, expr: &TypeExprDecl, context: &str) -> Result<Ty, LoadError> {
        match expr {
            TypeExprDecl::Name(s) => self.name(s, context),
            TypeExprDecl::Union(alts) => {
                let alts = alts.iter().map(|a| self.expr(a, context)).collect::<Result<Vec<_>, _>>()?;
                Ok(Ty::Union(alts))
            }
            TypeExprDecl::Complex(c) => match c.as_ref() {
                ComplexDecl::Record(r) => {
                    self.record(r)?;
                    Ok(Ty::record(r.name.clone()))
                }
                ComplexDecl::Enum(e) => {
                    self.enumeration(e);
                    Ok(Ty::enumeration(e.name.clone()))
                }
                ComplexDecl::Array { items } => Ok(Ty::array(self.expr(items, context)?)),
            },
        }
    }

    /// A type name, possibly with `[]` and `?` suffixes.
    fn name(&self, s: &str, context: &str) -> Result<Ty, LoadError> {
        let dsl = parse_type_dsl(s.trim()).ok_or_else(|| LoadError::BadTypeExpr {
            expr: s.to_string(),
            context: context.to_string(),
        })?;
        let mut ty = self.resolve(strip_builtin_prefix(dsl.base));
        for _ in 0..dsl.arrays {
            ty = Ty::array(ty);
        }
        if dsl.optional {
            ty = Ty::optional(ty);
        }
        Ok(ty)
    }

    /// Undeclared names fall through as record references and are reported
    /// by the schema builder with the field they appear in.
    fn resolve(&self, name: &str) -> Ty {
        if name == ANY {
            return Ty::Any;
        }
        if let Some(p) = Primitive::from_name(name) {
            return Ty::Primitive(p);
        }
        match self.kinds.get(name) {
            Some(Kind::Enum) => Ty::enumeration(name),
            Some(Kind::Record) | None => Ty::record(name),
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use serde_json::json;

    fn tool_schema() -> Value {
        json!({"types": [
            {"type": "record", "name": "File", "fields": [
                {"name": "class", "type": "string"},
                {"name": "path", "type": "xsd:string"},
                {"name": "size", "type": "long?"},
            ]},
            {"type": "record", "name": "InputParameter", "fields": [
                {"name": "id", "type": "string"},
                {"name": "type", "type": ["null", "sld:Any", "File", {
                    "type": "enum", "name": "CWLType", "symbols": ["string", "int", "File"],
                }], "jsonldPredicate": {"_id": "sld:type", "typeDSL": true}},
                {"name": "secondaryFiles", "type": "File[]?"},
            ]},
            {"type": "record", "name": "Tool", "fields": [
                {"name": "inputs", "type": {"type": "array", "items": "InputParameter"},
                 "jsonldPredicate": {"mapSubject": "id", "mapPredicate": "type"}},
                {"name": "label", "type": "string", "required": false},
            ]},
        ]})
    }

    #[test]
    fn lowers_names_suffixes_and_hints() {
        let s = load_schema_value(tool_schema()).unwrap();
        assert_eq!(s.names().collect::<Vec<_>>(), ["File", "CWLType", "InputParameter", "Tool"]);

        let file = s.record("File").unwrap();
        assert_eq!(file.field("path").unwrap().ty, Ty::string());
        assert_eq!(file.field("size").unwrap().ty, Ty::union([Ty::null(), Ty::long()]));
        assert!(!file.field("size").unwrap().required);

        let param = s.record("InputParameter").unwrap();
        let ty = &param.field("type").unwrap();
        assert!(ty.type_dsl);
        assert_eq!(ty.ty, Ty::union([Ty::null(), Ty::Any, Ty::record("File"), Ty::enumeration("CWLType")]));
        assert_eq!(
            param.field("secondaryFiles").unwrap().ty,
            Ty::union([Ty::null(), Ty::array(Ty::record("File"))])
        );

        let tool = s.record("Tool").unwrap();
        let inputs = tool.field("inputs").unwrap();
        assert!(inputs.required);
        let id_map = inputs.id_map.as_ref().unwrap();
        assert_eq!((id_map.subject.as_str(), id_map.predicate.as_deref()), ("id", Some("type")));
        assert!(!tool.field("label").unwrap().required);
    }

    #[test]
    fn bare_list_and_text_input() {
        let src = r#"[{"type": "enum", "name": "Format", "symbols": ["fastq", "bam"]}]"#;
        let s = load_schema_str(src).unwrap();
        assert_eq!(s.enumeration("Format").unwrap().symbols, ["fastq", "bam"]);
    }

    #[test]
    fn malformed_suffix_is_reported_with_its_field() {
        let doc = json!([{"type": "record", "name": "R", "fields": [{"name": "x", "type": "int?[]"}]}]);
        let err = load_schema_value(doc).unwrap_err();
        assert_eq!(err, LoadError::BadTypeExpr { expr: "int?[]".into(), context: "R.x".into() });
    }

    #[test]
    fn undeclared_reference_is_a_schema_error() {
        let doc = json!([{"type": "record", "name": "R", "fields": [{"name": "x", "type": "Missing"}]}]);
        let err = load_schema_value(doc).unwrap_err();
        assert!(matches!(err, LoadError::Schema(SchemaError::UndefinedType { ref name, .. }) if name == "Missing"));
    }

    #[test]
    fn parse_errors_point_at_the_declaration() {
        let doc = json!({"types": [
            {"type": "enum", "name": "Ok", "symbols": ["a"]},
            {"type": "enum", "name": "Broken", "symbols": "a"},
        ]});
        let LoadError::Parse { path, .. } = load_schema_value(doc).unwrap_err() else {
            panic!("expected a parse error");
        };
        assert!(path.starts_with("types[1]"), "{path}");
    }
}
