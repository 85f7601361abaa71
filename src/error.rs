//! Error taxonomy. Decode errors always carry the document path where they
//! happened; schema errors are raised once, while the registry is built.

use std::fmt;
use std::sync::Arc;

use crate::node::{Node, NodeKind};

// ------------------------------- Paths ------------------------------------ //

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Index(usize),
}

/// Location inside a document: field names and sequence indices from the root.
///
/// Displays dotted, `steps[0].run`; the root itself displays as `.`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy of this path extended by one field name.
    pub fn field(&self, name: &str) -> Path {
        let mut p = self.clone();
        p.0.push(Segment::Field(name.to_string()));
        p
    }

    /// Runs `f` with `segment` appended, popping it afterwards whatever `f` returns.
    pub(crate) fn with<T>(&mut self, segment: Segment, f: impl FnOnce(&mut Path) -> T) -> T {
        self.0.push(segment);
        let out = f(self);
        self.0.pop();
        out
    }
}

impl<S: Into<String>> FromIterator<S> for Path {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Path(iter.into_iter().map(|s| Segment::Field(s.into())).collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(".");
        }
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                Segment::Field(name) if i == 0 => f.write_str(name)?,
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Index(ix) => write!(f, "[{ix}]")?,
            }
        }
        Ok(())
    }
}

// ------------------------------ Decoding ---------------------------------- //

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("{path}: missing required field `{field}` of `{record}`")]
    MissingField { record: String, field: String, path: Path },

    #[error("{path}: `{field}` is not a field of `{record}`")]
    UnknownField { record: String, field: String, path: Path },

    #[error("{path}: expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: NodeKind, path: Path },

    #[error("{path}: `{actual}` is not a symbol of enum `{enum_name}`")]
    InvalidSymbol { enum_name: String, actual: String, path: Path },

    #[error("{path}: {} does not match any of {}", .node.kind(), .tried.join(" | "))]
    UnionMismatch {
        path: Path,
        node: Box<Node>,
        tried: Vec<String>,
        causes: Vec<Arc<DecodeError>>,  // one per alternative, same order as `tried`
    },

    #[error("{path}: not a `{record}` document, class is {}", describe_class(.actual))]
    ClassMismatch { record: String, actual: Option<String>, path: Path },

    #[error("{path}: nesting exceeds the limit of {limit} levels")]
    DepthExceeded { limit: usize, path: Path },

    #[error("{path}: `{name}` is not declared in the schema")]
    UndefinedType { name: String, path: Path },

    #[error("{path}: {reason}")]
    InvalidIdMap { reason: String, path: Path },
}

impl DecodeError {
    pub fn path(&self) -> &Path {
        match self {
            DecodeError::MissingField { path, .. }
            | DecodeError::UnknownField { path, .. }
            | DecodeError::TypeMismatch { path, .. }
            | DecodeError::InvalidSymbol { path, .. }
            | DecodeError::UnionMismatch { path, .. }
            | DecodeError::ClassMismatch { path, .. }
            | DecodeError::DepthExceeded { path, .. }
            | DecodeError::UndefinedType { path, .. }
            | DecodeError::InvalidIdMap { path, .. } => path,
        }
    }

    /// Follows union mismatches down to the cause that got furthest into the
    /// document, which is usually the one worth reporting.
    pub fn innermost(&self) -> &DecodeError {
        match self {
            DecodeError::UnionMismatch { causes, .. } => causes
                .iter()
                .max_by_key(|c| c.path().segments().len())
                .map(|c| c.innermost())
                .unwrap_or(self),
            other => other,
        }
    }
}

fn describe_class(actual: &Option<String>) -> String {
    match actual {
        Some(class) => format!("`{class}`"),
        None => "missing".to_string(),
    }
}

// ------------------------------- Schema ----------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("type `{0}` is declared more than once")]
    DuplicateType(String),

    #[error("`{0}` is a built-in type name")]
    ReservedName(String),

    #[error("record `{record}` declares field `{field}` more than once")]
    DuplicateField { record: String, field: String },

    #[error("enum `{enum_name}` declares symbol `{symbol}` more than once")]
    DuplicateSymbol { enum_name: String, symbol: String },

    #[error("enum `{0}` has no symbols")]
    EmptyEnum(String),

    #[error("{context}: union has no alternatives")]
    EmptyUnion { context: String },

    #[error("{context}: `{name}` is not a declared {expected}")]
    UndefinedType { name: String, expected: &'static str, context: String },
}

// ---------------------------- Declarations -------------------------------- //

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("at JSON path {path} → {message}")]
    Parse { path: String, message: String },

    #[error("{context}: malformed type expression `{expr}`")]
    BadTypeExpr { expr: String, context: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

// ------------------------------ Builders ---------------------------------- //

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("record type `{0}` is not declared in the schema")]
    UndefinedRecord(String),

    #[error("`{record}` has no field `{field}`")]
    NoSuchField { record: String, field: String },

    #[error("value for `{record}.{field}` does not fit the declared type")]
    Nonconforming { record: String, field: String, source: DecodeError },

    #[error("`{record}` is missing required field `{field}`")]
    MissingField { record: String, field: String },

    #[error("`{0}` is not a namespaced extension key")]
    NotAnExtension(String),
}
