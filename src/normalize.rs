//! Type predicates and the recursive type rewriter.
//!
//! `normalize` rewrites a type so that boxed-primitive leaves become their
//! primitives, preserving all other structure and sharing unchanged subtrees
//! by identity. The rewriter runs in two modes realized as a pair of
//! mutually recursive entry points: *top* positions unbox a boxed-primitive
//! leaf outright, while *reference* positions (resizable-array elements,
//! generic type arguments, union constituents) keep the leaf boxed, because
//! those containers hold references.
//!
//! Only type parameters can make the type graph cyclic (through their
//! constraints), so cycle protection keys on the parameter id alone: a stack
//! of ids currently in flight, short-circuiting on re-entry.

use std::ptr;

use smallvec::SmallVec;

use crate::checker::Checker;
use crate::types::ParamId;
use crate::types::ty::{Ty, TyKind};
use crate::types::PrimKind;

/// Is `t` a boxed primitive wrapper type, and of which kind?
#[must_use] pub fn is_boxed_primitive(t: Ty<'_>) -> Option<PrimKind> { t.boxed_prim() }

/// A composite type at least one of whose structural children is
/// recursively unboxed.
#[must_use] pub fn is_recursively_unboxed_ref(t: Ty<'_>) -> bool {
  match t {
    TyKind::Tuple(es) => es.iter().any(|&e| is_recursively_unboxed(e)),
    TyKind::Array(e) | TyKind::ResizableArray(e) =>
      e.is_primitive() || is_recursively_unboxed_ref(e),
    TyKind::Union(es) => es.iter().any(|&e| is_recursively_unboxed(e)),
    TyKind::Object(o) => o.args.iter().any(|&a| is_recursively_unboxed(a)),
    _ => false,
  }
}

/// A primitive, or a composite transitively built from primitives.
#[must_use] pub fn is_recursively_unboxed(t: Ty<'_>) -> bool {
  t.is_primitive() || is_recursively_unboxed_ref(t)
}

/// Does `t`, as it stands, still mention a boxed primitive anywhere? The
/// same shape as [`is_recursively_unboxed`] with the leaf predicate flipped
/// to *boxed* primitive.
#[must_use] pub fn is_unboxing_applicable(t: Ty<'_>) -> bool {
  if t.boxed_prim().is_some() { return true }
  match t {
    TyKind::Tuple(es) | TyKind::Union(es) => es.iter().any(|&e| is_unboxing_applicable(e)),
    TyKind::Array(e) | TyKind::ResizableArray(e) => is_unboxing_applicable(e),
    TyKind::Object(o) => o.args.iter().any(|&a| is_unboxing_applicable(a)),
    _ => false,
  }
}

/// Rewrite `t` with boxed-primitive leaves replaced by primitives. Returns
/// `t` itself (same reference) when nothing changed.
#[must_use] pub fn normalize<'a>(ck: &Checker<'a>, t: Ty<'a>) -> Ty<'a> {
  Normalizer::new(ck).top(t)
}

#[must_use] pub fn normalize_opt<'a>(ck: &Checker<'a>, t: Option<Ty<'a>>) -> Option<Ty<'a>> {
  t.map(|t| normalize(ck, t))
}

/// The rewriter state: the checker (for the union canonicalizer and argument
/// substitution) and the stack of type-parameter ids in flight.
pub struct Normalizer<'c, 'a> {
  ck: &'c Checker<'a>,
  seen: SmallVec<[ParamId; 8]>,
}

impl<'c, 'a> Normalizer<'c, 'a> {
  #[must_use] pub fn new(ck: &'c Checker<'a>) -> Self {
    Normalizer { ck, seen: SmallVec::new() }
  }

  /// Rewrite a type in top position: a boxed-primitive leaf becomes its
  /// primitive.
  pub fn top(&mut self, t: Ty<'a>) -> Ty<'a> {
    if let Some(k) = t.boxed_prim() { return self.ck.prim(k) }
    self.structure(t)
  }

  /// Rewrite a type in reference position: a boxed-primitive leaf stays
  /// boxed, but composites below it are still rewritten.
  pub fn reference(&mut self, t: Ty<'a>) -> Ty<'a> {
    self.structure(t)
  }

  fn structure(&mut self, t: Ty<'a>) -> Ty<'a> {
    match t {
      &TyKind::Param(p) => {
        if self.seen.contains(&p.id) { return t }
        self.seen.push(p.id);
        if let Some(c) = p.constraint.get() {
          let c2 = self.top(c);
          if !ptr::eq(c, c2) { p.constraint.set(Some(c2)) }
        }
        self.seen.pop();
        t
      }
      &TyKind::Tuple(es) => {
        let (elems, changed) = self.rewrite_list(es, Self::top);
        if !changed { return t }
        self.ck.arenas.ty(TyKind::Tuple(self.ck.arenas.ty_list(elems)))
      }
      &TyKind::Array(e) => {
        let e2 = self.top(e);
        if ptr::eq(e, e2) { t } else { self.ck.create_array_type(e2) }
      }
      &TyKind::ResizableArray(e) => {
        let e2 = self.reference(e);
        if ptr::eq(e, e2) { t } else { self.ck.create_resizable_array_type(e2) }
      }
      &TyKind::Union(es) => {
        let (elems, changed) = self.rewrite_list(es, Self::reference);
        if !changed { return t }
        self.ck.create_union_type(&elems)
      }
      TyKind::Object(o) => {
        let (args, changed) = self.rewrite_list(o.args, Self::reference);
        if !changed { return t }
        self.ck.substitute_arguments(o, self.ck.arenas.ty_list(args))
      }
      _ => t,
    }
  }

  fn rewrite_list(
    &mut self,
    es: &'a [Ty<'a>],
    mut f: impl FnMut(&mut Self, Ty<'a>) -> Ty<'a>,
  ) -> (SmallVec<[Ty<'a>; 4]>, bool) {
    let mut changed = false;
    let mut out = SmallVec::with_capacity(es.len());
    for &e in es {
      let e2 = f(self, e);
      changed |= !ptr::eq(e, e2);
      out.push(e2);
    }
    (out, changed)
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;
  use std::ptr;

  use crate::{Arenas, PassCtx, intern};
  use crate::types::{ParamId, PrimKind};
  use crate::types::ty::{TyKind, TypeParam};
  use super::*;

  #[test]
  fn boxed_leaf_unboxes_at_top() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let ck = &ctx.checker;
    let boxed = ck.wrapper_ty(PrimKind::Int);
    assert!(ptr::eq(normalize(ck, boxed), ck.prim(PrimKind::Int)));
  }

  #[test]
  fn fixed_array_elements_unbox_but_resizable_do_not() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let ck = &ctx.checker;
    let boxed = ck.wrapper_ty(PrimKind::Int);

    let fixed = ck.create_array_type(boxed);
    let TyKind::Array(e) = normalize(ck, fixed) else { panic!("expected array") };
    assert!(ptr::eq(*e, ck.prim(PrimKind::Int)));

    let resizable = ck.create_resizable_array_type(boxed);
    assert!(ptr::eq(normalize(ck, resizable), resizable), "resizable arrays hold references");
  }

  #[test]
  fn unchanged_types_share_identity() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let ck = &ctx.checker;
    let tuple = arenas.ty(TyKind::Tuple(arenas.ty_list([
      ck.prim(PrimKind::Int), ck.string(),
    ])));
    assert!(ptr::eq(normalize(ck, tuple), tuple));
  }

  #[test]
  fn normalize_is_idempotent_by_identity() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let ck = &ctx.checker;
    let t = arenas.ty(TyKind::Tuple(arenas.ty_list([
      ck.wrapper_ty(PrimKind::Short),
      ck.create_array_type(ck.wrapper_ty(PrimKind::Double)),
    ])));
    let once = normalize(ck, t);
    assert!(!ptr::eq(once, t));
    assert!(ptr::eq(normalize(ck, once), once));
  }

  #[test]
  fn union_constituents_stay_boxed() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let ck = &ctx.checker;
    let u = ck.create_union_type(&[ck.wrapper_ty(PrimKind::Int), ck.null()]);
    assert!(ptr::eq(normalize(ck, u), u));
  }

  #[test]
  fn recursive_type_parameter_terminates() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let ck = &ctx.checker;
    let p = &*arenas.bump.alloc(TypeParam {
      id: ParamId(0),
      name: intern("T"),
      constraint: Cell::new(None),
    });
    let pt = arenas.ty(TyKind::Param(p));
    // T's constraint mentions T itself: `T extends Int | T`.
    let constraint = ck.create_union_type(&[ck.wrapper_ty(PrimKind::Int), pt]);
    p.constraint.set(Some(constraint));
    let out = normalize(ck, pt);
    assert!(ptr::eq(out, pt), "parameter must come back structurally identical");
    // The constraint was rewritten in place, exactly once, with the
    // self-reference preserved.
    let TyKind::Union(parts) = p.constraint.get().expect("constraint kept") else {
      panic!("constraint should stay a union")
    };
    assert!(parts.iter().any(|&t| ptr::eq(t, pt)));
  }

  #[test]
  fn applicability_and_unboxedness_predicates() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let ck = &ctx.checker;
    let int = ck.prim(PrimKind::Int);
    let boxed = ck.wrapper_ty(PrimKind::Int);

    assert!(is_unboxing_applicable(boxed));
    assert!(!is_unboxing_applicable(int));
    assert!(is_unboxing_applicable(ck.create_resizable_array_type(boxed)));
    assert!(!is_unboxing_applicable(ck.string()));

    assert!(is_recursively_unboxed(int));
    assert!(is_recursively_unboxed(ck.create_array_type(int)));
    assert!(!is_recursively_unboxed(boxed));
    assert!(!is_recursively_unboxed(ck.string()));
  }
}
