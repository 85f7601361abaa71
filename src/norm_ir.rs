// src/norm_ir.rs
//! Canonical form for type expressions.
//!
//! Every field type goes through here once, when the schema is built, so the
//! matcher and decoder only ever see one spelling of each shape:
//! - `Optional(T)` becomes `Union[null, T]`
//! - nested unions are flattened in place, keeping declaration order
//! - repeated alternatives are dropped (first occurrence wins)
//! - a single-alternative union is just that alternative

use crate::ir::Ty;

pub fn normalize(ty: &Ty) -> Ty {
    match ty {
        Ty::Optional(inner) => union_of(vec![Ty::null(), normalize(inner)]),
        Ty::Union(alts) => union_of(alts.iter().map(normalize).collect()),
        Ty::Array(item) => Ty::Array(Box::new(normalize(item))),
        Ty::Primitive(_) | Ty::Any | Ty::Record(_) | Ty::Enum(_) => ty.clone(),
    }
}

/// True when `normalize(ty) == *ty`, without building the copy.
pub fn is_normal(ty: &Ty) -> bool {
    match ty {
        Ty::Optional(_) => false,
        Ty::Array(item) => is_normal(item),
        Ty::Union(alts) => {
            alts.len() > 1
                && alts.iter().all(|a| !matches!(a, Ty::Union(_)) && is_normal(a))
                && alts.iter().enumerate().all(|(i, a)| !alts[..i].contains(a))
        }
        Ty::Primitive(_) | Ty::Any | Ty::Record(_) | Ty::Enum(_) => true,
    }
}

// Arms are already normalized, so any nested union is one level deep.
fn union_of(arms: Vec<Ty>) -> Ty {
    let mut flat: Vec<Ty> = Vec::with_capacity(arms.len());
    for arm in arms {
        match arm {
            Ty::Union(inner) => {
                for t in inner {
                    push_unique(&mut flat, t);
                }
            }
            other => push_unique(&mut flat, other),
        }
    }
    match flat.len() {
        1 => flat.remove(0),
        _ => Ty::Union(flat),
    }
}

fn push_unique(out: &mut Vec<Ty>, t: Ty) {
    if !out.contains(&t) {
        out.push(t);
    }
}
