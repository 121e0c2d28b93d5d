//! The top-level orchestrator. Per program the pass runs in a fixed order:
//! wrapper pre-seed, preorder type-slot normalization, postorder declaration
//! normalization (with the `for-of` retyping), the postorder visitor, the
//! external annotation sweep, and finally span refinement and cache
//! cleanup. The three orderings that differ from plain postorder are load
//! bearing: declarations must be normalized before uses are visited, type
//! slots collapse before anything walks below them, and the synthesizer
//! normalizes callees lazily when it touches them first.

use crate::{PassCtx, declare};
use crate::normalize::normalize;
use crate::types::PrimKind;
use crate::types::ast::{NodeKind, NodeRef, Program, each_child, refine_source_ranges};
use crate::visit::Visitor;
use crate::adjust::adjust_type;

/// Run the unboxing lowering over `program` and the annotation surface of
/// its external programs.
pub fn run<'a>(ctx: &PassCtx<'a>, program: &'a Program<'a>) {
  preseed_wrappers(ctx);
  normalize_type_slots(ctx, program.ast);
  declaration_sweep(ctx, program.ast);
  Visitor::new(ctx).visit_stmt(program.ast);
  for &ext in program.external {
    annotation_sweep(ctx, ext);
  }
  refine_source_ranges(program.ast);
  ctx.checker.clear_apparent_cache();
}

/// Normalize every builtin wrapper declaration up front, so synthesized
/// box/unbox/conversion calls always bind to already-normalized signatures.
fn preseed_wrappers(ctx: &PassCtx<'_>) {
  PrimKind::scan(|k| {
    let def = ctx.checker.wrapper(k);
    for m in def.members.get() {
      for &d in m.decls {
        if matches!(d.kind, NodeKind::Function(_)) {
          declare::handle_declaration(ctx, d);
        }
      }
    }
  });
}

/// Preorder: rewrite the computed-type slot of every node and of every
/// bound variable. Annotation-usage subtrees are left for the annotation
/// pass, and opaque type nodes (cast targets, i.e. reference parts) keep
/// their written type.
fn normalize_type_slots<'a>(ctx: &PassCtx<'a>, node: NodeRef<'a>) {
  if matches!(node.kind, NodeKind::AnnotationUsage(_)) { return }
  if let Some(t) = node.ty.get() {
    node.ty.set(Some(normalize(&ctx.checker, t)));
  }
  if let NodeKind::Ident(id) = &node.kind {
    if let Some(var) = id.var.get() {
      if let Some(t) = var.ty.get() {
        var.ty.set(Some(normalize(&ctx.checker, t)));
      }
    }
  }
  each_child(node, &mut |c| normalize_type_slots(ctx, c));
}

/// Postorder: normalize every declaration's type surface, and retype
/// `for-of` iteration variables from their (now normalized) right-hand
/// sides.
fn declaration_sweep<'a>(ctx: &PassCtx<'a>, node: NodeRef<'a>) {
  if matches!(node.kind, NodeKind::AnnotationUsage(_)) { return }
  each_child(node, &mut |c| declaration_sweep(ctx, c));
  match &node.kind {
    NodeKind::ClassProperty(_) | NodeKind::Function(_) | NodeKind::Declarator(_) =>
      declare::handle_declaration(ctx, node),
    NodeKind::ForOf(_) => declare::handle_for_of(ctx, node),
    _ => {}
  }
}

/// Force-normalize the annotation surface of an external program (even a
/// dynamic-interop one) and re-visit the property initializers.
fn annotation_sweep<'a>(ctx: &PassCtx<'a>, program: &'a Program<'a>) {
  sweep_node(ctx, program.ast);
  for &sub in program.external {
    annotation_sweep(ctx, sub);
  }
}

fn sweep_node<'a>(ctx: &PassCtx<'a>, node: NodeRef<'a>) {
  match &node.kind {
    NodeKind::ClassDecl(c) if c.def.flags.contains(crate::types::ty::ClassFlags::ANNOTATION) => {
      for &m in c.members { force_prop(ctx, m) }
    }
    NodeKind::AnnotationUsage(a) => {
      for &p in a.props { force_prop(ctx, p) }
    }
    _ => {}
  }
  each_child(node, &mut |c| sweep_node(ctx, c));
}

fn force_prop<'a>(ctx: &PassCtx<'a>, prop: NodeRef<'a>) {
  declare::handle_declaration_force(ctx, prop);
  if let NodeKind::ClassProperty(cp) = &prop.kind {
    if let Some(v) = &cp.value {
      Visitor::new(ctx).visit_expr(v);
      if let Some(t) = prop.ty.get() { adjust_type(ctx, v, t) }
    }
  }
}
