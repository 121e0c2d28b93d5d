//! The declaration normalizer: makes the *type surface* of a declaration
//! unboxed. Idempotent per declaration node, memoized through the pass
//! context's `handled` set so the pass stays linear in declarations. Called
//! eagerly by the driver's postorder sweep and lazily by the synthesizer and
//! the call/member handlers before they consume a signature.

use if_chain::if_chain;

use crate::{PassCtx, binder, sym};
use crate::normalize::{is_unboxing_applicable, normalize};
use crate::types::PrimKind;
use crate::types::ast::{NodeFlags, NodeKind, NodeRef, ScriptFunction, SigParam};
use crate::types::ty::TyKind;

/// Normalize the type surface of a function, class property, or variable
/// declarator. Repeated calls on the same node are no-ops.
pub fn handle_declaration<'a>(ctx: &PassCtx<'a>, node: NodeRef<'a>) {
  handle(ctx, node, false);
}

/// Like [`handle_declaration`], but unboxes class properties even inside
/// dynamic-interop programs. Used by the driver's annotation sweep.
pub fn handle_declaration_force<'a>(ctx: &PassCtx<'a>, node: NodeRef<'a>) {
  handle(ctx, node, true);
}

fn handle<'a>(ctx: &PassCtx<'a>, node: NodeRef<'a>, force_unbox: bool) {
  match &node.kind {
    NodeKind::Function(sf) => {
      if !ctx.mark_handled(node) { return }
      normalize_function(ctx, node, sf);
    }
    NodeKind::ClassProperty(cp) => {
      // Dynamic-interop programs keep their boxed property surface. Not
      // memoized on this path, so a later forced sweep still rewrites it.
      if node.flags.get().contains(NodeFlags::DYNAMIC) && !force_unbox { return }
      if !ctx.mark_handled(node) { return }
      let Some(t) = node.ty.get() else { return };
      if is_unboxing_applicable(t) {
        let t2 = normalize(&ctx.checker, t);
        node.ty.set(Some(t2));
        cp.ident.ty.set(Some(t2));
        cp.var.ty.set(Some(t2));
      }
    }
    NodeKind::Declarator(d) => {
      if !ctx.mark_handled(node) { return }
      let Some(t) = node.ty.get().or(d.var.ty.get()) else { return };
      if is_unboxing_applicable(t) {
        let t2 = normalize(&ctx.checker, t);
        node.ty.set(Some(t2));
        d.ident.ty.set(Some(t2));
        d.var.ty.set(Some(t2));
      }
    }
    k => panic!("handle_declaration: not a declaration: {k:?}"),
  }
}

fn normalize_function<'a>(ctx: &PassCtx<'a>, node: NodeRef<'a>, sf: &ScriptFunction<'a>) {
  let mut changed = false;
  for (&p_node, sp) in sf.params.iter().zip(sf.sig.params) {
    changed |= normalize_param(ctx, p_node, sp);
  }
  if let (Some(rn), Some(rp)) = (sf.rest, sf.sig.rest) {
    changed |= normalize_param(ctx, rn, rp);
  }
  if !keeps_boxed_return(sf) {
    let ret = sf.sig.ret.get();
    if is_unboxing_applicable(ret) {
      sf.sig.ret.set(normalize(&ctx.checker, ret));
      changed = true;
    }
  }
  if changed { binder::build_function_name(node) }
}

fn normalize_param<'a>(ctx: &PassCtx<'a>, p_node: NodeRef<'a>, sp: &SigParam<'a>) -> bool {
  let t = sp.ty.get();
  if !is_unboxing_applicable(t) { return false }
  let t2 = normalize(&ctx.checker, t);
  sp.ty.set(t2);
  p_node.ty.set(Some(t2));
  let NodeKind::Param(pd) = &p_node.kind else {
    panic!("parameter node expected, got {:?}", p_node.kind)
  };
  pd.ident.ty.set(Some(t2));
  pd.var.ty.set(Some(t2));
  true
}

/// The `valueOf` method of a boxed wrapper keeps its boxed return type:
/// codegen relies on it. Only its parameter surface is unboxed. A user class
/// can never satisfy this test, since the enclosing class must be one of the
/// canonical wrapper definitions.
fn keeps_boxed_return(sf: &ScriptFunction<'_>) -> bool {
  if_chain! {
    if sf.base_name == sym::value_of();
    if let Some(class) = sf.class.get();
    if class.boxed.is_some();
    if let [p] = sf.sig.params;
    if !matches!(p.ty.get(), TyKind::Enum(_));
    then { true } else { false }
  }
}

/// Retype a `for-of` iteration variable from its (already normalized)
/// right-hand side: the element type over arrays, `char` over strings,
/// untouched over unions.
pub fn handle_for_of<'a>(ctx: &PassCtx<'a>, node: NodeRef<'a>) {
  let NodeKind::ForOf(fo) = &node.kind else {
    panic!("handle_for_of: not a for-of: {:?}", node.kind)
  };
  let elem = match ctx.checker.recheck(fo.right.get()) {
    &TyKind::Array(e) | &TyKind::ResizableArray(e) => e,
    TyKind::String => ctx.checker.prim(PrimKind::Char),
    _ => return,
  };
  let NodeKind::VarDecl(ds) = &fo.decl.kind else {
    panic!("for-of declaration must be a variable declaration")
  };
  assert_eq!(ds.len(), 1, "for-of declares exactly one variable");
  let d = ds[0];
  let NodeKind::Declarator(dec) = &d.kind else {
    panic!("for-of declarator expected")
  };
  d.ty.set(Some(elem));
  dec.ident.ty.set(Some(elem));
  dec.var.ty.set(Some(elem));
}

#[cfg(test)]
mod tests {
  use crate::{Arenas, PassCtx, intern};
  use crate::types::{PrimKind, Span};
  use crate::types::ast::{Declarator, FnFlags, Ident, NodeKind};
  use std::cell::Cell;
  use std::ptr;
  use super::*;

  #[test]
  fn function_surface_unboxes_and_name_is_rebuilt() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let ck = &ctx.checker;
    let boxed = ck.wrapper_ty(PrimKind::Int);
    let f = arenas.function(
      intern("plus"), &[(intern("x"), boxed)], None, boxed, None,
      FnFlags::default(), None);
    handle_declaration(&ctx, f);
    let NodeKind::Function(sf) = &f.kind else { unreachable!() };
    assert!(ptr::eq(sf.sig.params[0].ty.get(), ck.prim(PrimKind::Int)));
    assert!(ptr::eq(sf.sig.ret.get(), ck.prim(PrimKind::Int)));
    assert_eq!(sf.name.get().as_str(), "plus:int=int");
    let p = sf.params[0];
    assert!(ptr::eq(p.ty.get().expect("param typed"), ck.prim(PrimKind::Int)));
  }

  #[test]
  fn value_of_keeps_boxed_return() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let ck = &ctx.checker;
    let m = ck.wrapper(PrimKind::Int)
      .find(crate::types::ty::MemberKind::Method, crate::sym::value_of())
      .expect("valueOf installed");
    let d = m.decls[0];
    handle_declaration(&ctx, d);
    let NodeKind::Function(sf) = &d.kind else { unreachable!() };
    assert!(ptr::eq(sf.sig.params[0].ty.get(), ck.prim(PrimKind::Int)));
    assert!(ptr::eq(sf.sig.ret.get(), ck.wrapper_ty(PrimKind::Int)), "boxed return survives");
  }

  #[test]
  fn repeated_handling_is_a_no_op() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let ck = &ctx.checker;
    let boxed = ck.wrapper_ty(PrimKind::Short);
    let var = arenas.var(intern("s"), Some(boxed));
    let ident = arenas.node(
      NodeKind::Ident(Ident { name: var.name, var: Cell::new(Some(var)) }),
      Some(boxed), Span::NONE);
    let d = arenas.node(
      NodeKind::Declarator(Declarator { ident, var, init: None }), Some(boxed), Span::NONE);
    var.decl.set(Some(d));
    handle_declaration(&ctx, d);
    let after_once = d.ty.get().expect("typed");
    handle_declaration(&ctx, d);
    assert!(ptr::eq(after_once, d.ty.get().expect("typed")));
    assert!(ptr::eq(after_once, ck.prim(PrimKind::Short)));
    assert!(ptr::eq(var.ty.get().expect("typed"), ck.prim(PrimKind::Short)));
  }
}
