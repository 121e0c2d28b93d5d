//! The conversion synthesizer: builds fully typed, parent-linked, name-bound
//! AST fragments for unboxing (`x.unboxed()`), boxing (`new Int(x)`),
//! primitive-to-primitive conversion (`Int.toDouble(x)`), and literal
//! re-coercion. Each builder takes its source range from the expression it
//! wraps, normalizes the target declaration before consuming its signature,
//! and runs the binder over the synthesized subtree.
//!
//! The two peepholes live here as well: an unbox applied directly on top of
//! a box (and vice versa) cancels instead of materializing.

use std::cell::Cell;

use if_chain::if_chain;
use num::{BigInt, Integer, One, ToPrimitive};

use crate::{PassCtx, binder, declare, intern, sym};
use crate::checker::Checker;
use crate::types::PrimKind;
use crate::types::ast::{
  CallExpr, Ident, MemberExpr, MemberProp, NewExpr, NodeKind, NodeRef, NumValue,
};
use crate::types::ty::{MemberKind, ObjectDef};
use crate::Symbol;

/// `new Boxed(x)` whose sole argument already has the unboxed primitive
/// type; returns `x`.
fn box_new_argument<'a>(ck: &Checker<'a>, expr: NodeRef<'a>, k: PrimKind) -> Option<NodeRef<'a>> {
  if_chain! {
    if let NodeKind::New(new) = &expr.kind;
    if new.class.get().boxed_prim() == Some(k);
    if let [arg] = new.args;
    let arg = arg.get();
    if let Some(at) = arg.ty.get();
    if ck.is_identical_to(at, ck.prim(k));
    then { Some(arg) } else { None }
  }
}

/// `x.unboxed()` whose receiver has exactly the boxed type for `k`; returns
/// the receiver.
fn unboxed_call_receiver<'a>(ck: &Checker<'a>, expr: NodeRef<'a>, k: PrimKind) -> Option<NodeRef<'a>> {
  if_chain! {
    if let NodeKind::Call(call) = &expr.kind;
    if let NodeKind::Member(m) = &call.callee.get().kind;
    if let MemberProp::Ident(p) = &m.prop;
    if let NodeKind::Ident(id) = &p.kind;
    if id.name == sym::unboxed();
    let recv = m.obj.get();
    if let Some(rt) = recv.ty.get();
    if ck.is_identical_to(rt, ck.wrapper_ty(k));
    then { Some(recv) } else { None }
  }
}

/// Rewrite `expr : Boxed(P)` to an expression of type `P`.
pub fn insert_unboxing<'a>(ctx: &PassCtx<'a>, expr: NodeRef<'a>) -> NodeRef<'a> {
  let ck = &ctx.checker;
  let src = ck.get_apparent_type(ck.recheck(expr));
  let k = src.boxed_prim()
    .unwrap_or_else(|| panic!("insert_unboxing on a non-boxed operand: {src}"));
  if let Some(arg) = box_new_argument(ck, expr, k) {
    arg.parent.set(expr.parent.get());
    return arg;
  }
  let wrapper = ck.wrapper(k);
  let m = wrapper.find(MemberKind::Method, sym::unboxed()).expect("wrapper without unboxed()");
  let decl = m.decls[0];
  declare::handle_declaration(ctx, decl);
  let NodeKind::Function(mf) = &decl.kind else { panic!("unboxed() is not a function") };
  let sig = mf.sig;
  let a = ctx.arenas;
  let span = expr.span.get();
  let parent = expr.parent.get();
  let prop = a.node(
    NodeKind::Ident(Ident { name: m.name, var: Cell::new(Some(m.var)) }), None, span);
  let callee = a.node(
    NodeKind::Member(MemberExpr { obj: Cell::new(expr), prop: MemberProp::Ident(prop) }),
    None, span);
  let call = a.node(
    NodeKind::Call(CallExpr { callee: Cell::new(callee), args: &[], sig: Cell::new(Some(sig)) }),
    Some(sig.ret.get()), span);
  call.parent.set(parent);
  binder::bind_lowered_node(call);
  call
}

/// Rewrite `expr : Primitive(k)` to `new Boxed(expr) : Boxed(k)`.
pub fn insert_boxing<'a>(ctx: &PassCtx<'a>, expr: NodeRef<'a>, k: PrimKind) -> NodeRef<'a> {
  let ck = &ctx.checker;
  if let Some(recv) = unboxed_call_receiver(ck, expr, k) {
    recv.parent.set(expr.parent.get());
    return recv;
  }
  let wrapper = ck.wrapper(k);
  for c in wrapper.ctors() { declare::handle_declaration(ctx, c) }
  let ctor = wrapper.ctors()
    .find(|&c| {
      let NodeKind::Function(f) = &c.kind else { return false };
      matches!(f.sig.params, [p] if ck.is_identical_to(p.ty.get(), ck.prim(k)))
    })
    .unwrap_or_else(|| panic!("no unary constructor on `{}` taking {}", wrapper.name, k.name()));
  let NodeKind::Function(f) = &ctor.kind else { unreachable!() };
  let a = ctx.arenas;
  let span = expr.span.get();
  let parent = expr.parent.get();
  let new = a.node(NodeKind::New(NewExpr {
    class: Cell::new(ck.wrapper_ty(k)),
    args: a.slots([expr]),
    sig: Cell::new(Some(f.sig)),
  }), Some(ck.wrapper_ty(k)), span);
  new.parent.set(parent);
  binder::bind_lowered_node(new);
  new
}

fn build_static_call<'a>(
  ctx: &PassCtx<'a>,
  wrapper: &'a ObjectDef<'a>,
  name: Symbol,
  expr: NodeRef<'a>,
) -> NodeRef<'a> {
  let m = wrapper.find(MemberKind::Static, name)
    .unwrap_or_else(|| panic!("no static `{}` on `{}`", name, wrapper.name));
  let decl = m.decls[0];
  declare::handle_declaration(ctx, decl);
  let NodeKind::Function(mf) = &decl.kind else { panic!("static member is not a function") };
  let sig = mf.sig;
  let a = ctx.arenas;
  let span = expr.span.get();
  let parent = expr.parent.get();
  let class_var = wrapper.class_var.get().expect("wrapper class unbound");
  let obj = a.node(
    NodeKind::Ident(Ident { name: wrapper.name, var: Cell::new(Some(class_var)) }),
    class_var.ty.get(), span);
  let prop = a.node(
    NodeKind::Ident(Ident { name: m.name, var: Cell::new(Some(m.var)) }), None, span);
  let callee = a.node(
    NodeKind::Member(MemberExpr { obj: Cell::new(obj), prop: MemberProp::Ident(prop) }),
    None, span);
  let call = a.node(NodeKind::Call(CallExpr {
    callee: Cell::new(callee),
    args: a.slots([expr]),
    sig: Cell::new(Some(sig)),
  }), Some(sig.ret.get()), span);
  call.parent.set(parent);
  binder::bind_lowered_node(call);
  call
}

/// Synthesize `Boxed(from).to<Boxed(to)>(expr)`, the primitive-to-primitive
/// conversion intrinsic.
pub fn create_to_intrinsic_call<'a>(
  ctx: &PassCtx<'a>,
  to: PrimKind,
  from: PrimKind,
  expr: NodeRef<'a>,
) -> NodeRef<'a> {
  assert_ne!(to, from, "conversion between identical kinds");
  let name = intern(&format!("to{}", to.wrapper_name()));
  build_static_call(ctx, ctx.checker.wrapper(from), name, expr)
}

/// Synthesize `Char.toString(expr)`, the `char -> String` widening fallback.
pub fn create_to_string_call<'a>(ctx: &PassCtx<'a>, expr: NodeRef<'a>) -> NodeRef<'a> {
  build_static_call(ctx, ctx.checker.wrapper(PrimKind::Char), sym::to_string(), expr)
}

/// Re-coerce a numeric or char literal to the expected primitive kind and
/// emit a fresh literal carrying it. Integer narrowing truncates in two's
/// complement; float narrowing rounds to nearest even; float-to-integer
/// truncates toward zero (NaN becomes zero).
pub fn perform_literal_conversion<'a>(
  ctx: &PassCtx<'a>,
  lit: NodeRef<'a>,
  expected: PrimKind,
) -> NodeRef<'a> {
  let value = match &lit.kind {
    NodeKind::Number(v) => v.clone(),
    &NodeKind::Char(c) => NumValue::Int(BigInt::from(c)),
    k => panic!("literal conversion on a non-literal: {k:?}"),
  };
  let kind = match expected {
    PrimKind::Bool => panic!("no numeric conversion to boolean"),
    PrimKind::Char => NodeKind::Char(
      wrap_int(&to_int(&value), PrimKind::Char).to_u16().expect("char wrap fits")),
    PrimKind::Byte | PrimKind::Short | PrimKind::Int | PrimKind::Long =>
      NodeKind::Number(NumValue::Int(wrap_int(&to_int(&value), expected))),
    PrimKind::Float => NodeKind::Number(NumValue::Float(f64::from(to_f64(&value) as f32))),
    PrimKind::Double => NodeKind::Number(NumValue::Float(to_f64(&value))),
  };
  let out = ctx.arenas.node(kind, Some(ctx.checker.prim(expected)), lit.span.get());
  out.parent.set(lit.parent.get());
  out
}

fn to_int(v: &NumValue) -> BigInt {
  match v {
    NumValue::Int(b) => b.clone(),
    NumValue::Float(f) => BigInt::from(*f as i64),
  }
}

fn to_f64(v: &NumValue) -> f64 {
  match v {
    NumValue::Int(b) => b.to_f64().expect("int-to-float conversion is total"),
    NumValue::Float(f) => *f,
  }
}

/// Two's-complement truncation to the target integer width; `char` is an
/// unsigned 16-bit wrap.
fn wrap_int(v: &BigInt, k: PrimKind) -> BigInt {
  let bits = k.int_bits().expect("integer kind");
  let m = BigInt::one() << bits;
  let r = v.mod_floor(&m);
  if k != PrimKind::Char && r >= BigInt::one() << (bits - 1) { r - m } else { r }
}

/// Peephole over a *source-level* `recv.unboxed()` call: when `recv` is
/// `new Boxed(x)` with `x` already of the primitive type, the pair cancels
/// to `x`.
pub fn unbox_of_box<'a>(ck: &Checker<'a>, node: NodeRef<'a>) -> Option<NodeRef<'a>> {
  if_chain! {
    if let NodeKind::Call(call) = &node.kind;
    if let NodeKind::Member(m) = &call.callee.get().kind;
    if let MemberProp::Ident(p) = &m.prop;
    if let NodeKind::Ident(id) = &p.kind;
    if id.name == sym::unboxed();
    let recv = m.obj.get();
    if let Some(k) = ck.recheck(recv).boxed_prim();
    if let Some(arg) = box_new_argument(ck, recv, k);
    then {
      arg.parent.set(node.parent.get());
      Some(arg)
    } else { None }
  }
}

/// Peephole over a *source-level* `new Boxed(e)`: when `e` is `x.unboxed()`
/// with `x` of exactly the boxed type, the pair cancels to `x`.
pub fn box_of_unbox<'a>(ck: &Checker<'a>, node: NodeRef<'a>) -> Option<NodeRef<'a>> {
  if_chain! {
    if let NodeKind::New(new) = &node.kind;
    if let Some(k) = new.class.get().boxed_prim();
    if let [arg] = new.args;
    if let Some(recv) = unboxed_call_receiver(ck, arg.get(), k);
    then {
      recv.parent.set(node.parent.get());
      Some(recv)
    } else { None }
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;
  use std::ptr;

  use num::BigInt;

  use crate::{Arenas, PassCtx, intern};
  use crate::types::{PrimKind, Span};
  use crate::types::ast::{Ident, NodeKind, NumValue};
  use super::*;

  fn int_var_use<'a>(ctx: &PassCtx<'a>, name: &str, k: PrimKind, boxed: bool) -> crate::types::ast::NodeRef<'a> {
    let ck = &ctx.checker;
    let ty = if boxed { ck.wrapper_ty(k) } else { ck.prim(k) };
    let var = ctx.arenas.var(intern(name), Some(ty));
    ctx.arenas.node(
      NodeKind::Ident(Ident { name: var.name, var: Cell::new(Some(var)) }), Some(ty), Span::NONE)
  }

  #[test]
  fn unbox_then_box_restores_the_expression() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let e = int_var_use(&ctx, "x", PrimKind::Int, true);
    let unboxed = insert_unboxing(&ctx, e);
    assert!(ptr::eq(
      unboxed.ty.get().expect("typed"), ctx.checker.prim(PrimKind::Int)));
    let back = insert_boxing(&ctx, unboxed, PrimKind::Int);
    assert!(ptr::eq(back, e), "box of unbox must cancel");
  }

  #[test]
  fn box_then_unbox_restores_the_expression() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let e = int_var_use(&ctx, "x", PrimKind::Double, false);
    let boxed = insert_boxing(&ctx, e, PrimKind::Double);
    assert!(ptr::eq(
      boxed.ty.get().expect("typed"), ctx.checker.wrapper_ty(PrimKind::Double)));
    let back = insert_unboxing(&ctx, boxed);
    assert!(ptr::eq(back, e), "unbox of box must cancel");
  }

  #[test]
  fn intrinsic_call_is_bound_to_a_normalized_signature() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let ck = &ctx.checker;
    let e = int_var_use(&ctx, "n", PrimKind::Int, false);
    let call = create_to_intrinsic_call(&ctx, PrimKind::Double, PrimKind::Int, e);
    assert!(ptr::eq(call.ty.get().expect("typed"), ck.prim(PrimKind::Double)));
    let NodeKind::Call(c) = &call.kind else { panic!("expected a call") };
    let sig = c.sig.get().expect("signature attached");
    assert!(ptr::eq(sig.params[0].ty.get(), ck.prim(PrimKind::Int)));
    assert!(ptr::eq(sig.ret.get(), ck.prim(PrimKind::Double)));
    assert!(ptr::eq(e.parent.get().expect("parented"), call));
  }

  fn converted<'a>(ctx: &PassCtx<'a>, v: NumValue, to: PrimKind) -> NumValue {
    let lit = ctx.arenas.node(NodeKind::Number(v), None, Span::NONE);
    match &perform_literal_conversion(ctx, lit, to).kind {
      NodeKind::Number(out) => out.clone(),
      &NodeKind::Char(c) => NumValue::Int(BigInt::from(c)),
      k => panic!("unexpected literal: {k:?}"),
    }
  }

  #[test]
  fn literal_conversion_matches_direct_casts() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let int = |v: i64| NumValue::Int(BigInt::from(v));

    for &v in &[0i64, 1, -1, 127, 128, 255, 300, -300, 65535, 65536, i64::from(i32::MAX) + 1] {
      let cases: [(PrimKind, i64); 4] = [
        (PrimKind::Byte, i64::from(v as i8)),
        (PrimKind::Short, i64::from(v as i16)),
        (PrimKind::Int, i64::from(v as i32)),
        (PrimKind::Long, v),
      ];
      for (k, want) in cases {
        let NumValue::Int(got) = converted(&ctx, int(v), k) else { panic!("int expected") };
        assert_eq!(got, BigInt::from(want), "{v} as {}", k.name());
      }
      let NumValue::Int(got) = converted(&ctx, int(v), PrimKind::Char) else { panic!() };
      assert_eq!(got, BigInt::from(i64::from(v as u16)), "{v} as char");
    }

    for &f in &[0.0f64, 1.5, -2.75, 1e9, -1e18, f64::NAN] {
      let NumValue::Int(got) = converted(&ctx, NumValue::Float(f), PrimKind::Long) else {
        panic!("int expected")
      };
      assert_eq!(got, BigInt::from(f as i64), "{f} as long");
      let NumValue::Float(got) = converted(&ctx, NumValue::Float(f), PrimKind::Float) else {
        panic!("float expected")
      };
      if f.is_nan() {
        assert!(got.is_nan());
      } else {
        assert_eq!(got, f64::from(f as f32), "{f} as float");
      }
    }

    // Int to float goes through round-to-nearest-even.
    let big = (1i64 << 53) + 1;
    let NumValue::Float(got) = converted(&ctx, int(big), PrimKind::Double) else { panic!() };
    assert_eq!(got, big as f64);
  }
}
