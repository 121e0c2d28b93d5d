//! Shared fixtures for the test modules: small builders that assemble
//! programs through the same arena and factory API the pass itself uses.

use std::cell::Cell;

use num::BigInt;

use crate::{PassCtx, Symbol, binder, intern};
use crate::types::{PrimKind, Span};
use crate::types::ast::{
  CallExpr, Declarator, Ident, MemberExpr, MemberProp, NodeKind, NodeRef, NumValue, Program,
  Variable,
};
use crate::types::ty::{MemberKind, Ty};

pub fn int_lit<'a>(ctx: &PassCtx<'a>, v: i64, ty: Option<Ty<'a>>) -> NodeRef<'a> {
  ctx.arenas.node(NodeKind::Number(NumValue::Int(BigInt::from(v))), ty, Span::NONE)
}

/// A bound identifier use, typed like its variable.
pub fn use_var<'a>(ctx: &PassCtx<'a>, var: &'a Variable<'a>) -> NodeRef<'a> {
  ctx.arenas.node(
    NodeKind::Ident(Ident { name: var.name, var: Cell::new(Some(var)) }),
    var.ty.get(), Span::NONE)
}

/// `let name[: ty] [= init];` — returns the statement, the binding variable,
/// and the declarator node.
pub fn let_decl<'a>(
  ctx: &PassCtx<'a>,
  name: &str,
  ty: Option<Ty<'a>>,
  init: Option<NodeRef<'a>>,
) -> (NodeRef<'a>, &'a Variable<'a>, NodeRef<'a>) {
  let a = ctx.arenas;
  let var = a.var(intern(name), ty);
  let ident = a.node(
    NodeKind::Ident(Ident { name: var.name, var: Cell::new(Some(var)) }), ty, Span::NONE);
  let dec = a.node(
    NodeKind::Declarator(Declarator { ident, var, init: init.map(Cell::new) }), ty, Span::NONE);
  var.decl.set(Some(dec));
  let decl = a.node(NodeKind::VarDecl(a.node_list([dec])), None, Span::NONE);
  (decl, var, dec)
}

/// Wrap statements into a bound program with no external sources.
pub fn program<'a>(ctx: &PassCtx<'a>, stmts: Vec<NodeRef<'a>>) -> &'a Program<'a> {
  let a = ctx.arenas;
  let root = a.node(NodeKind::Block(a.node_list(stmts)), None, Span::NONE);
  binder::bind_lowered_node(root);
  a.program(root, &[], false)
}

/// `recv.name()` bound to the wrapper method of kind `k`; the signature is
/// left for the visitor to resolve.
pub fn method_call<'a>(
  ctx: &PassCtx<'a>,
  recv: NodeRef<'a>,
  k: PrimKind,
  name: Symbol,
) -> NodeRef<'a> {
  let a = ctx.arenas;
  let m = ctx.checker.wrapper(k).find(MemberKind::Method, name).expect("method installed");
  let prop = a.node(
    NodeKind::Ident(Ident { name, var: Cell::new(Some(m.var)) }), None, Span::NONE);
  let callee = a.node(
    NodeKind::Member(MemberExpr { obj: Cell::new(recv), prop: MemberProp::Ident(prop) }),
    None, Span::NONE);
  a.node(
    NodeKind::Call(CallExpr { callee: Cell::new(callee), args: &[], sig: Cell::new(None) }),
    None, Span::NONE)
}
