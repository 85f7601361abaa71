//! Serde model of a JSON schema declaration document.
//!
//! These types only describe the input shape; `lower` turns them into a
//! validated `Schema`.

use serde::Deserialize;

/// Either `{"types": [...]}` or a bare list of declarations.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SchemaDoc {
    Wrapped {
        #[serde(alias = "$graph")]
        types: Vec<NamedDecl>,
    },
    Bare(Vec<NamedDecl>),
}

impl SchemaDoc {
    pub fn into_types(self) -> Vec<NamedDecl> {
        match self {
            SchemaDoc::Wrapped { types } | SchemaDoc::Bare(types) => types,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NamedDecl {
    Record(RecordDecl),
    Enum(EnumDecl),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordDecl {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    /// Documentation, ignored.
    #[serde(default)]
    pub doc: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    pub symbols: Vec<String>,
    #[serde(default)]
    pub doc: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExprDecl,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(rename = "jsonldPredicate", default)]
    pub jsonld_predicate: Option<PredicateDecl>,
    #[serde(default)]
    pub doc: Option<serde_json::Value>,
}

/// A bare IRI, or an object carrying document hints.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PredicateDecl {
    Iri(String),
    Hints(PredicateHints),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredicateHints {
    #[serde(default)]
    pub map_subject: Option<String>,
    #[serde(default)]
    pub map_predicate: Option<String>,
    #[serde(rename = "typeDSL", default)]
    pub type_dsl: bool,
}

impl PredicateDecl {
    pub fn hints(&self) -> Option<&PredicateHints> {
        match self {
            PredicateDecl::Iri(_) => None,
            PredicateDecl::Hints(h) => Some(h),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TypeExprDecl {
    Name(String),
    Union(Vec<TypeExprDecl>),
    Complex(Box<ComplexDecl>),
}

/// Inline type. Named inline records and enums are hoisted into the registry.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ComplexDecl {
    Record(RecordDecl),
    Enum(EnumDecl),
    Array { items: TypeExprDecl },
}
