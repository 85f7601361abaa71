//! Field-level document shorthands, expanded before a field is matched or
//! decoded.
//!
//! Identifier maps let a list of records be written as a mapping keyed by
//! one of their fields:
//!
//! ```text
//! inputs:                      inputs:
//!   reads: File         ==>      - {id: reads, type: File}
//!   ref: {type: string}          - {id: ref, type: string}
//! ```
//!
//! The type DSL lets a type be written as `T`, `T?`, `T[]`, `T[]?`, `T[][]`.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{DecodeError, Path};
use crate::ir::{Field, IdMap};
use crate::node::{Mapping, Node, Scalar};

static TYPE_DSL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<base>[^\[\]?]+)(?P<arrays>(?:\[\])*)(?P<optional>\?)?$")
        .expect("type DSL pattern is valid")
});

/// Parsed `T[]?` shorthand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDsl<'a> {
    pub base: &'a str,
    pub arrays: usize,
    pub optional: bool,
}

/// `None` when `s` is not a well-formed type expression.
pub fn parse_type_dsl(s: &str) -> Option<TypeDsl<'_>> {
    let caps = TYPE_DSL.captures(s)?;
    let base = caps.name("base")?.as_str();
    let arrays = caps.name("arrays").map_or(0, |m| m.as_str().len() / 2);
    let optional = caps.name("optional").is_some();
    Some(TypeDsl { base, arrays, optional })
}

/// Expands one shorthand string into its long form; plain names come back as
/// the same string node.
pub fn expand_type_string(s: &str) -> Node {
    let Some(dsl) = parse_type_dsl(s) else {
        return Node::from(s);
    };
    let mut node = Node::from(dsl.base);
    for _ in 0..dsl.arrays {
        node = Node::mapping([("type", Node::from("array")), ("items", node)]);
    }
    if dsl.optional {
        Node::Sequence(vec![Node::from("null"), node])
    } else {
        node
    }
}

/// Expands a type-valued node: a string, or a sequence whose string entries
/// are expanded and spliced in without repeats.
pub fn expand_type_node(node: &Node) -> Node {
    match node {
        Node::Scalar(Scalar::Str(s)) => expand_type_string(s),
        Node::Sequence(items) => {
            let mut out: Vec<Node> = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Node::Scalar(Scalar::Str(s)) => match expand_type_string(s) {
                        Node::Sequence(parts) => {
                            for p in parts {
                                push_unique(&mut out, p);
                            }
                        }
                        other => push_unique(&mut out, other),
                    },
                    other => out.push(other.clone()),
                }
            }
            Node::Sequence(out)
        }
        other => other.clone(),
    }
}

fn push_unique(out: &mut Vec<Node>, n: Node) {
    if !out.contains(&n) {
        out.push(n);
    }
}

/// Turns `{key: value, ..}` into a sequence of records, keys sorted.
///
/// Mapping values gain `subject: key`; any other value `v` becomes
/// `{subject: key, predicate: v}`, which needs a predicate.
pub fn expand_id_map(map: &Mapping, id_map: &IdMap, path: &Path) -> Result<Node, DecodeError> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    let mut out = Vec::with_capacity(keys.len());
    for key in keys {
        let entry = match &map[key.as_str()] {
            Node::Mapping(m) => {
                let mut m = m.clone();
                m.insert(id_map.subject.clone(), Node::from(key.as_str()));
                m
            }
            other => {
                let Some(predicate) = &id_map.predicate else {
                    return Err(DecodeError::InvalidIdMap {
                        reason: format!("entry `{key}` is a {} and there is no predicate to hold it", other.kind()),
                        path: path.field(key),
                    });
                };
                let mut m = Mapping::with_capacity(2);
                m.insert(predicate.clone(), other.clone());
                m.insert(id_map.subject.clone(), Node::from(key.as_str()));
                m
            }
        };
        out.push(Node::Mapping(entry));
    }
    Ok(Node::Sequence(out))
}

/// Applies the field's shorthands to its node. Borrows when nothing applies.
pub(crate) fn prepare<'a>(field: &Field, node: &'a Node, path: &Path) -> Result<Cow<'a, Node>, DecodeError> {
    let mut out = Cow::Borrowed(node);
    if let (Some(id_map), Node::Mapping(m)) = (&field.id_map, node) {
        out = Cow::Owned(expand_id_map(m, id_map, path)?);
    }
    if field.type_dsl && matches!(out.as_ref(), Node::Scalar(Scalar::Str(_)) | Node::Sequence(_)) {
        let expanded = expand_type_node(&out);
        out = Cow::Owned(expanded);
    }
    Ok(out)
}
