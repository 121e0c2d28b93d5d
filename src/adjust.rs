//! The central decision table: `adjust_type(slot, expected)` rewrites the
//! expression in `slot` so its type matches `expected`, choosing among
//! no-op, box, unbox, primitive conversion, or a combination.
//!
//! Case 1 (primitive against a reference type) picks the boxing target by
//! walking the numeric widening chain from the actual kind and testing each
//! step's boxed form against the expected type; the non-numeric fallbacks
//! (`char -> String`, `byte -> char`, and the bitwise-complement escapes
//! `float -> int` / `double -> long`) come after. Exhausting the candidates
//! means the program was ill-typed, which is a compiler bug here.

use arrayvec::ArrayVec;

use crate::{PassCtx, synth};
use crate::types::{NUMERIC_CHAIN, PrimKind};
use crate::types::ast::{NodeKind, Slot};
use crate::types::ty::Ty;

/// Rewrite the expression in `slot` to have type `expected`.
pub fn adjust_type<'a>(ctx: &PassCtx<'a>, slot: &Slot<'a>, expected: Ty<'a>) {
  let ck = &ctx.checker;
  let expected = ck.get_apparent_type(expected);
  let actual = ck.recheck(slot.get());

  match (ck.ets_type(actual), ck.ets_type(expected)) {
    // Case 1: primitive into the reference world.
    (Some(ak), None) if expected.is_reference() => {
      match select_boxing_target(ctx, ak, expected) {
        BoxTarget::Prim(tk) => {
          if tk != ak { convert_primitive(ctx, slot, ak, tk) }
          slot.set(synth::insert_boxing(ctx, slot.get(), tk));
        }
        BoxTarget::Str => slot.set(synth::create_to_string_call(ctx, slot.get())),
      }
    }
    // Case 2: boxed (or a type parameter constrained to boxed) into a
    // primitive.
    (None, Some(ek)) => {
      if let Some(bk) = ck.get_apparent_type(actual).boxed_prim() {
        slot.set(synth::insert_unboxing(ctx, slot.get()));
        if bk != ek { convert_primitive(ctx, slot, bk, ek) }
      }
    }
    // Case 4: primitive kinds disagree.
    (Some(ak), Some(ek)) => {
      if ak != ek { convert_primitive(ctx, slot, ak, ek) }
    }
    (Some(_), None) => {}
    // Case 3: boxed against an incompatible reference type; unbox and try
    // again from the primitive side.
    (None, None) => {
      if actual.boxed_prim().is_some()
        && expected.is_reference()
        && !ck.is_supertype_of(expected, actual)
      {
        slot.set(synth::insert_unboxing(ctx, slot.get()));
        adjust_type(ctx, slot, expected);
      }
    }
  }
}

enum BoxTarget {
  Prim(PrimKind),
  /// The `char -> String` fallback; realized as `Char.toString(e)`.
  Str,
}

fn select_boxing_target<'a>(ctx: &PassCtx<'a>, ak: PrimKind, expected: Ty<'a>) -> BoxTarget {
  let ck = &ctx.checker;
  let mut candidates = ArrayVec::<PrimKind, 6>::new();
  match ak.numeric_rank() {
    Some(r) => candidates.extend(NUMERIC_CHAIN[r..].iter().copied()),
    None => candidates.push(ak),
  }
  for k in candidates {
    if ck.is_supertype_of(expected, ck.wrapper_ty(k)) { return BoxTarget::Prim(k) }
  }
  match ak {
    PrimKind::Char if ck.is_supertype_of(expected, ck.string()) => BoxTarget::Str,
    PrimKind::Byte if ck.is_supertype_of(expected, ck.wrapper_ty(PrimKind::Char)) =>
      BoxTarget::Prim(PrimKind::Char),
    PrimKind::Float if ck.is_supertype_of(expected, ck.wrapper_ty(PrimKind::Int)) =>
      BoxTarget::Prim(PrimKind::Int),
    PrimKind::Double if ck.is_supertype_of(expected, ck.wrapper_ty(PrimKind::Long)) =>
      BoxTarget::Prim(PrimKind::Long),
    _ => panic!("no boxing target for {} against {expected}", ak.name()),
  }
}

/// Convert the expression in `slot` from one primitive kind to another:
/// literals are re-coerced in place, everything else goes through the
/// conversion intrinsic.
pub(crate) fn convert_primitive<'a>(ctx: &PassCtx<'a>, slot: &Slot<'a>, from: PrimKind, to: PrimKind) {
  let e = slot.get();
  if matches!(e.kind, NodeKind::Number(_) | NodeKind::Char(_)) {
    slot.set(synth::perform_literal_conversion(ctx, e, to));
  } else {
    slot.set(synth::create_to_intrinsic_call(ctx, to, from, e));
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;
  use std::ptr;

  use num::BigInt;

  use crate::{Arenas, PassCtx, intern};
  use crate::types::{PrimKind, Span};
  use crate::types::ast::{Ident, NodeKind, NodeRef, NumValue, Slot};
  use super::*;

  fn use_of<'a>(ctx: &PassCtx<'a>, k: PrimKind, boxed: bool) -> Slot<'a> {
    let ck = &ctx.checker;
    let ty = if boxed { ck.wrapper_ty(k) } else { ck.prim(k) };
    let var = ctx.arenas.var(intern("v"), Some(ty));
    Cell::new(ctx.arenas.node(
      NodeKind::Ident(Ident { name: var.name, var: Cell::new(Some(var)) }), Some(ty), Span::NONE))
  }

  fn assert_intrinsic(node: NodeRef<'_>, method: &str) {
    let NodeKind::Call(c) = &node.kind else { panic!("expected a conversion call") };
    let NodeKind::Member(m) = &c.callee.get().kind else { panic!("expected a member callee") };
    let crate::types::ast::MemberProp::Ident(p) = &m.prop else { panic!("expected a property") };
    let NodeKind::Ident(id) = &p.kind else { unreachable!() };
    assert_eq!(id.name.as_str(), method);
  }

  #[test]
  fn primitive_to_exact_wrapper_boxes_without_conversion() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let slot = use_of(&ctx, PrimKind::Int, false);
    adjust_type(&ctx, &slot, ctx.checker.wrapper_ty(PrimKind::Int));
    let out = slot.get();
    assert!(matches!(out.kind, NodeKind::New(_)));
    assert!(ptr::eq(out.ty.get().expect("typed"), ctx.checker.wrapper_ty(PrimKind::Int)));
  }

  #[test]
  fn primitive_widens_along_the_chain_before_boxing() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    // A byte against `Double` must widen to double first, then box.
    let slot = use_of(&ctx, PrimKind::Byte, false);
    adjust_type(&ctx, &slot, ctx.checker.wrapper_ty(PrimKind::Double));
    let NodeKind::New(new) = &slot.get().kind else { panic!("expected boxing") };
    assert_intrinsic(new.args[0].get(), "toDouble");
  }

  #[test]
  fn boxed_to_primitive_unboxes_then_converts() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let slot = use_of(&ctx, PrimKind::Int, true);
    adjust_type(&ctx, &slot, ctx.checker.prim(PrimKind::Long));
    assert_intrinsic(slot.get(), "toLong");
    assert!(ptr::eq(slot.get().ty.get().expect("typed"), ctx.checker.prim(PrimKind::Long)));
  }

  #[test]
  fn mismatched_boxed_reference_reboxes_at_the_wider_kind() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    // Boxed Int against expected Long wrapper: unbox, widen, box again.
    let slot = use_of(&ctx, PrimKind::Int, true);
    adjust_type(&ctx, &slot, ctx.checker.wrapper_ty(PrimKind::Long));
    let out = slot.get();
    assert!(ptr::eq(out.ty.get().expect("typed"), ctx.checker.wrapper_ty(PrimKind::Long)));
    let NodeKind::New(new) = &out.kind else { panic!("expected boxing") };
    assert_intrinsic(new.args[0].get(), "toLong");
  }

  #[test]
  fn literal_conversion_is_preferred_over_intrinsics() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let lit = ctx.arenas.node(
      NodeKind::Number(NumValue::Int(BigInt::from(7))),
      Some(ctx.checker.prim(PrimKind::Int)), Span::NONE);
    let slot = Cell::new(lit);
    adjust_type(&ctx, &slot, ctx.checker.prim(PrimKind::Double));
    let NodeKind::Number(NumValue::Float(f)) = &slot.get().kind else {
      panic!("expected a re-coerced literal")
    };
    assert_eq!(*f, 7.0);
  }

  #[test]
  fn char_falls_back_to_string() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let slot = use_of(&ctx, PrimKind::Char, false);
    adjust_type(&ctx, &slot, ctx.checker.string());
    assert_intrinsic(slot.get(), "toString");
    assert!(ptr::eq(slot.get().ty.get().expect("typed"), ctx.checker.string()));
  }

  #[test]
  fn matching_types_are_left_alone() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let slot = use_of(&ctx, PrimKind::Int, false);
    let before = slot.get();
    adjust_type(&ctx, &slot, ctx.checker.prim(PrimKind::Int));
    assert!(ptr::eq(slot.get(), before));
  }
}
