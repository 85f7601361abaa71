//! Value model predicate: does a node fit a type?
//!
//! `Matcher::check` walks the node against the type and reports the first
//! reason it does not fit; `matches` is the boolean view. Both are pure and
//! deterministic, which is what lets the union resolver try alternatives in
//! order without side effects.
//!
//! Matching is deep. A record matches only if its present fields match their
//! own types, so once the resolver picks an alternative, decoding it cannot
//! fail for shape reasons. The cheap checks on a mapping (class, required
//! keys, unknown keys) run before any field is descended into, and union
//! outcomes are memoized for the duration of one call, so sibling
//! alternatives never re-explore the same subtree.
pub mod prim;
pub mod obj;

use std::borrow::Cow;

use tracing::trace;

use crate::dsl;
use crate::error::{DecodeError, Path, Segment};
use crate::ir::Ty;
use crate::node::{Node, Scalar};
use crate::norm_ir::normalize;
use crate::options::DecodeOptions;
use crate::resolve::{resolve_at, Memo};
use crate::schema::Schema;

#[derive(Debug, Clone, Copy)]
pub struct Matcher<'s> {
    schema: &'s Schema,
    options: &'s DecodeOptions,
    memo: Option<&'s Memo>,
}

impl<'s> Matcher<'s> {
    pub fn new(schema: &'s Schema, options: &'s DecodeOptions) -> Self {
        Self { schema, options, memo: None }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn options(&self) -> &'s DecodeOptions {
        self.options
    }

    pub(crate) fn memo(&self) -> Option<&'s Memo> {
        self.memo
    }

    pub(crate) fn with_memo<'m>(&self, memo: &'m Memo) -> Matcher<'m>
    where
        's: 'm,
    {
        Matcher { schema: self.schema, options: self.options, memo: Some(memo) }
    }

    pub fn matches(&self, ty: &Ty, node: &Node) -> bool {
        self.check(ty, node, &mut Path::root(), 0).is_ok()
    }

    /// First reason `node` does not fit `ty`, reported at `path`.
    pub fn check(&self, ty: &Ty, node: &Node, path: &mut Path, depth: usize) -> Result<(), DecodeError> {
        match self.memo {
            Some(_) => self.walk(ty, node, path, depth),
            None => self.scoped(ty, node, path, depth),
        }
    }

    /// Walks with a fresh memo; `node` and `ty` may be temporaries that die
    /// with this call, so nothing cached about them may outlive it.
    fn scoped(&self, ty: &Ty, node: &Node, path: &mut Path, depth: usize) -> Result<(), DecodeError> {
        let memo = Memo::default();
        self.with_memo(&memo).walk(ty, node, path, depth)
    }

    fn walk(&self, ty: &Ty, node: &Node, path: &mut Path, depth: usize) -> Result<(), DecodeError> {
        if depth > self.options.max_depth {
            return Err(DecodeError::DepthExceeded { limit: self.options.max_depth, path: path.clone() });
        }
        match ty {
            Ty::Primitive(p) => {
                if prim::fits(*p, node) {
                    Ok(())
                } else {
                    Err(mismatch(ty, node, path))
                }
            }
            Ty::Any => {
                if node.is_null() {
                    Err(mismatch(ty, node, path))
                } else {
                    Ok(())
                }
            }
            Ty::Enum(name) => {
                let def = self.schema.enumeration(name).ok_or_else(|| undefined(name, path))?;
                match node {
                    Node::Scalar(Scalar::Str(s)) if def.has_symbol(s) => Ok(()),
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
                let Node::Mapping(map) = node else {
                    return Err(mismatch(ty, node, path));
                };
                obj::check_shape(def, map, path, self.options)?;
                for field in &def.fields {
                    let Some(value) = map.get(&field.name) else {
                        continue;
                    };
                    path.with(Segment::Field(field.name.clone()), |path| -> Result<(), DecodeError> {
                        match dsl::prepare(field, value, path)? {
                            Cow::Borrowed(value) => self.walk(&field.ty, value, path, depth + 1),
                            Cow::Owned(value) => self.scoped(&field.ty, &value, path, depth + 1),
                        }
                    })?;
                }
                Ok(())
            }
            Ty::Array(item) => {
                let Node::Sequence(xs) = node else {
                    return Err(mismatch(ty, node, path));
                };
                xs.iter().enumerate().try_for_each(|(i, x)| {
                    path.with(Segment::Index(i), |path| self.walk(item, x, path, depth + 1))
                })
            }
            Ty::Union(alts) => resolve_at(self, alts, node, path, depth).map(|_| ()),
            Ty::Optional(_) => {
                trace!(%ty, "normalizing optional on the fly");
                self.scoped(&normalize(ty), node, path, depth)
            }
        }
    }
}

pub(crate) fn mismatch(ty: &Ty, node: &Node, path: &Path) -> DecodeError {
    DecodeError::TypeMismatch { expected: ty.to_string(), actual: node.kind(), path: path.clone() }
}

pub(crate) fn undefined(name: &str, path: &Path) -> DecodeError {
    DecodeError::UndefinedType { name: name.to_string(), path: path.clone() }
}

// ------------------------------- Tests ------------------------------------ //
