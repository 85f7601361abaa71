//! Union resolution: which alternative does a node belong to?
//!
//! The serialized form carries no tag, so the choice is made from shape and
//! content alone. Alternatives are tried in declared order and the first one
//! that matches wins. The same node against the same union always resolves
//! the same way.
//!
//! Within one decode or match call, each (node, union) pair is resolved once;
//! later visits reuse the outcome. Nothing is remembered between calls.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::error::{DecodeError, Path};
use crate::ir::Ty;
use crate::matching::Matcher;
use crate::node::Node;
use crate::options::DecodeOptions;
use crate::schema::Schema;

/// Union outcomes for one call, keyed by the addresses of the node and of
/// the alternatives. Only valid while both are borrowed, which is why a memo
/// never outlives the call that created it.
#[derive(Debug, Default)]
pub(crate) struct Memo(RefCell<HashMap<(usize, usize, usize), Result<usize, DecodeError>>>);

impl Memo {
    fn key(node: &Node, alternatives: &[Ty]) -> (usize, usize, usize) {
        (node as *const Node as usize, alternatives.as_ptr() as usize, alternatives.len())
    }

    fn get(&self, node: &Node, alternatives: &[Ty]) -> Option<Result<usize, DecodeError>> {
        self.0.borrow().get(&Self::key(node, alternatives)).cloned()
    }

    fn insert(&self, node: &Node, alternatives: &[Ty], outcome: &Result<usize, DecodeError>) {
        self.0.borrow_mut().insert(Self::key(node, alternatives), outcome.clone());
    }
}

/// Index of the first alternative `node` matches.
pub fn resolve(
    schema: &Schema,
    alternatives: &[Ty],
    node: &Node,
    options: &DecodeOptions,
) -> Result<usize, DecodeError> {
    let memo = Memo::default();
    let matcher = Matcher::new(schema, options).with_memo(&memo);
    resolve_at(&matcher, alternatives, node, &mut Path::root(), 0)
}

pub(crate) fn resolve_at(
    matcher: &Matcher<'_>,
    alternatives: &[Ty],
    node: &Node,
    path: &mut Path,
    depth: usize,
) -> Result<usize, DecodeError> {
    let Some(memo) = matcher.memo() else {
        let memo = Memo::default();
        return resolve_at(&matcher.with_memo(&memo), alternatives, node, path, depth);
    };
    if let Some(outcome) = memo.get(node, alternatives) {
        return outcome;
    }
    let outcome = first_match(matcher, alternatives, node, path, depth);
    memo.insert(node, alternatives, &outcome);
    outcome
}

fn first_match(
    matcher: &Matcher<'_>,
    alternatives: &[Ty],
    node: &Node,
    path: &mut Path,
    depth: usize,
) -> Result<usize, DecodeError> {
    let mut causes = Vec::with_capacity(alternatives.len());
    for (index, alt) in alternatives.iter().enumerate() {
        match matcher.check(alt, node, path, depth) {
            Ok(()) => {
                trace!(%path, %alt, index, "union resolved");
                return Ok(index);
            }
            // running out of depth says nothing about the shape
            Err(err @ DecodeError::DepthExceeded { .. }) => return Err(err),
            Err(err) => causes.push(Arc::new(err)),
        }
    }
    Err(DecodeError::UnionMismatch {
        path: path.clone(),
        node: Box::new(node.clone()),
        tried: alternatives.iter().map(Ty::to_string).collect(),
        causes,
    })
}

// ------------------------------- Tests ------------------------------------ //
