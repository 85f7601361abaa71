// Strongly-typed schema IR. No document nodes here.
//
// Records and enums are referenced by name and resolved through `Schema`, so a
// definition may mention itself (value trees still terminate).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Null,
    Boolean,
    Int,     // 32-bit signed
    Long,    // 64-bit signed
    Float,   // 32-bit IEEE 754
    Double,  // 64-bit IEEE 754
    String,
}

impl Primitive {
    pub const ALL: [Primitive; 7] = [
        Primitive::Null,
        Primitive::Boolean,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
        Primitive::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Null => "null",
            Primitive::Boolean => "boolean",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::String => "string",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name of the catch-all type accepting any non-null node.
pub const ANY: &str = "Any";

/// Field that names the record type inside the document.
pub const CLASS: &str = "class";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    Primitive(Primitive),
    Any,                     // any non-null value, kept verbatim
    Record(String),          // by name, see `Schema::record`
    Enum(String),            // by name, see `Schema::enumeration`
    Array(Box<Ty>),
    Union(Vec<Ty>),          // order is resolution priority
    Optional(Box<Ty>),       // sugar for Union[null, T]; normalized away
}

impl Ty {
    pub fn null() -> Self {
        Ty::Primitive(Primitive::Null)
    }

    pub fn boolean() -> Self {
        Ty::Primitive(Primitive::Boolean)
    }

    pub fn int() -> Self {
        Ty::Primitive(Primitive::Int)
    }

    pub fn long() -> Self {
        Ty::Primitive(Primitive::Long)
    }

    pub fn float() -> Self {
        Ty::Primitive(Primitive::Float)
    }

    pub fn double() -> Self {
        Ty::Primitive(Primitive::Double)
    }

    pub fn string() -> Self {
        Ty::Primitive(Primitive::String)
    }

    pub fn record(name: impl Into<String>) -> Self {
        Ty::Record(name.into())
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Ty::Enum(name.into())
    }

    pub fn array(item: Ty) -> Self {
        Ty::Array(Box::new(item))
    }

    pub fn optional(inner: Ty) -> Self {
        Ty::Optional(Box::new(inner))
    }

    pub fn union<I: IntoIterator<Item = Ty>>(alternatives: I) -> Self {
        Ty::Union(alternatives.into_iter().collect())
    }

    /// True when a `null` node can inhabit this type.
    pub fn accepts_null(&self) -> bool {
        match self {
            Ty::Primitive(Primitive::Null) | Ty::Optional(_) => true,
            Ty::Union(alts) => alts.iter().any(Ty::accepts_null),
            _ => false,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Primitive(p) => write!(f, "{p}"),
            Ty::Any => f.write_str(ANY),
            Ty::Record(name) | Ty::Enum(name) => f.write_str(name),
            Ty::Array(item) => write!(f, "array<{item}>"),
            Ty::Optional(inner) => write!(f, "optional<{inner}>"),
            Ty::Union(alts) => {
                for (i, alt) in alts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{alt}")?;
                }
                Ok(())
            }
        }
    }
}

/// Rewrites a mapping keyed by identifier into a list of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMap {
    pub subject: String,              // key is stored under this field
    pub predicate: Option<String>,    // non-mapping values are stored under this field
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: Ty,
    pub required: bool,      // absence is an error; a null value is a type question
    pub id_map: Option<IdMap>,
    pub type_dsl: bool,      // expand `T[]?` shorthand in the document before matching
}

impl Field {
    /// Required unless the type admits `null`.
    pub fn new(name: impl Into<String>, ty: Ty) -> Self {
        let required = !ty.accepts_null();
        Self { name: name.into(), ty, required, id_map: None, type_dsl: false }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_id_map(mut self, subject: impl Into<String>, predicate: Option<&str>) -> Self {
        self.id_map = Some(IdMap {
            subject: subject.into(),
            predicate: predicate.map(str::to_string),
        });
        self
    }

    pub fn with_type_dsl(mut self) -> Self {
        self.type_dsl = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDef {
    pub name: String,
    pub fields: Vec<Field>,  // declaration order; also the encoding order
}

impl RecordDef {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self { name: name.into(), fields }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// A record declaring a `class` field is only inhabited by mappings whose
    /// `class` is the record's own name.
    pub fn class_field(&self) -> Option<&Field> {
        self.field(CLASS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: String,
    pub symbols: Vec<String>,
}

impl EnumDef {
    pub fn new<I, S>(name: impl Into<String>, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { name: name.into(), symbols: symbols.into_iter().map(Into::into).collect() }
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_and_null_unions_are_not_required() {
        assert!(!Field::new("a", Ty::optional(Ty::string())).required);
        assert!(!Field::new("b", Ty::union([Ty::null(), Ty::string()])).required);
        assert!(Field::new("c", Ty::array(Ty::optional(Ty::string()))).required);
    }

    #[test]
    fn display_reads_like_a_type_expression() {
        let ty = Ty::union([Ty::null(), Ty::array(Ty::record("Step")), Ty::Any]);
        assert_eq!(ty.to_string(), "null | array<Step> | Any");
    }
}
