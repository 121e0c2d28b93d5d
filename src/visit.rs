//! The postorder AST visitor: one handler per node kind that can bridge the
//! boxed/primitive boundary. Every handler runs after its children, so child
//! types are final when a parent makes its decision. Expression positions
//! are visited through their slots so handlers can splice replacements;
//! statements are visited by reference.

use std::ptr;

use if_chain::if_chain;
use itertools::{EitherOrBoth, Itertools};
use num::ToPrimitive;

use crate::{PassCtx, declare, sym, synth};
use crate::adjust::{adjust_type, convert_primitive};
use crate::normalize::{is_recursively_unboxed, normalize};
use crate::types::PrimKind;
use crate::types::ast::{
  BinaryExpr, BinOp, CallExpr, FnFlags, MemberExpr, MemberProp, NodeFlags, NodeKind, NodeRef,
  NumValue, ScriptFunction, Signature, Slot, UnOp,
};
use crate::types::ty::{MemberKind, Ty, TyKind};

pub struct Visitor<'c, 'a> {
  ctx: &'c PassCtx<'a>,
  /// The return type of the enclosing function, for `return` adjustment.
  ret_ty: Option<Ty<'a>>,
}

impl<'c, 'a> Visitor<'c, 'a> {
  #[must_use] pub fn new(ctx: &'c PassCtx<'a>) -> Self {
    Visitor { ctx, ret_ty: None }
  }

  pub fn visit_stmt(&mut self, node: NodeRef<'a>) {
    let ctx = self.ctx;
    match &node.kind {
      NodeKind::Block(stmts) => for &s in *stmts { self.visit_stmt(s) },
      NodeKind::ClassDecl(c) => for &m in c.members { self.visit_stmt(m) },
      NodeKind::ClassProperty(cp) => {
        if let Some(v) = &cp.value {
          self.visit_expr(v);
          if let Some(t) = node.ty.get() { adjust_type(ctx, v, t) }
        }
      }
      NodeKind::Function(sf) => {
        for &p in sf.params {
          if let NodeKind::Param(pd) = &p.kind {
            if let Some(init) = &pd.init {
              self.visit_expr(init);
              if let Some(t) = p.ty.get() { adjust_type(ctx, init, t) }
            }
          }
        }
        if let Some(body) = sf.body {
          let old = std::mem::replace(&mut self.ret_ty, Some(sf.sig.ret.get()));
          self.visit_stmt(body);
          self.ret_ty = old;
        }
      }
      NodeKind::VarDecl(ds) => for &d in *ds { self.visit_declarator(d) },
      NodeKind::ExprStmt(e) => self.visit_expr(e),
      NodeKind::Return(r) => {
        if let Some(e) = r {
          self.visit_expr(e);
          if let Some(ret) = self.ret_ty { adjust_type(ctx, e, ret) }
        }
      }
      NodeKind::If(i) => {
        self.visit_expr(&i.test);
        self.unbox_if_boxed(&i.test);
        self.visit_stmt(i.then);
        if let Some(e) = i.els { self.visit_stmt(e) }
      }
      NodeKind::While(w) | NodeKind::DoWhile(w) => {
        self.visit_expr(&w.test);
        self.unbox_if_boxed(&w.test);
        self.visit_stmt(w.body);
      }
      NodeKind::Switch(sw) => {
        self.visit_expr(&sw.disc);
        for c in sw.cases {
          if let Some(t) = &c.test { self.visit_expr(t) }
        }
        let disc_ty = ctx.checker.recheck(sw.disc.get());
        let prim = ctx.checker.maybe_unbox_type(disc_ty);
        // A primitive (or boxed-primitive) discriminant switches in the
        // unboxed world; a string switch is left alone.
        if prim.is_primitive() {
          adjust_type(ctx, &sw.disc, prim);
          for c in sw.cases {
            if let Some(t) = &c.test { adjust_type(ctx, t, prim) }
          }
        }
        for c in sw.cases {
          for &b in c.body { self.visit_stmt(b) }
        }
      }
      NodeKind::ForOf(fo) => {
        self.visit_expr(&fo.right);
        self.visit_stmt(fo.body);
      }
      NodeKind::Break | NodeKind::Continue => {}
      // Annotation usages belong to the annotation sweep.
      NodeKind::AnnotationUsage(_) => {}
      k => panic!("visit_stmt: not a statement: {k:?}"),
    }
  }

  fn visit_declarator(&mut self, d: NodeRef<'a>) {
    let NodeKind::Declarator(dec) = &d.kind else {
      panic!("visit_declarator: not a declarator: {:?}", d.kind)
    };
    let Some(init) = &dec.init else { return };
    self.visit_expr(init);
    match dec.var.ty.get() {
      Some(t) => adjust_type(self.ctx, init, t),
      // No annotation: the declaration takes the initializer's final type.
      None => {
        let t = self.ctx.checker.recheck(init.get());
        dec.var.ty.set(Some(t));
        dec.ident.ty.set(Some(t));
        d.ty.set(Some(t));
      }
    }
  }

  pub fn visit_expr(&mut self, slot: &Slot<'a>) {
    let ctx = self.ctx;
    let ck = &ctx.checker;
    let node = slot.get();
    match &node.kind {
      NodeKind::Ident(id) => {
        let Some(var) = id.var.get() else { return };
        if let Some(decl) = var.decl.get() {
          if matches!(decl.kind, NodeKind::ClassDecl(_)) { return }
        }
        if let Some(v) = var.ty.get() {
          if v.is_primitive() {
            node.ty.set(Some(v));
            return;
          }
        }
        if let Some(t) = node.ty.get() {
          if t.is_primitive() {
            // A primitive use of a reference-typed variable (a generic
            // instantiation); annotate the use at the boxed type.
            node.ty.set(Some(ck.maybe_box_type(t)));
          } else {
            node.ty.set(Some(normalize(ck, t)));
          }
        }
      }
      NodeKind::Number(_) | NodeKind::Bool(_) | NodeKind::Char(_) => {
        node.ty.set(Some(ck.maybe_unbox_type(ck.recheck(node))));
      }
      NodeKind::Str(_) | NodeKind::Null | NodeKind::Undefined | NodeKind::TypeNode(_) => {}
      NodeKind::Call(call) => {
        self.visit_expr(&call.callee);
        for a in call.args { self.visit_expr(a) }
        self.handle_call(node, call);
        if let Some(r) = synth::unbox_of_box(ck, node) { slot.set(r) }
      }
      NodeKind::New(new) => {
        for a in new.args { self.visit_expr(a) }
        let sig = new.sig.get().expect("constructor call without a signature");
        if let Some(owner) = sig.owner.get() { declare::handle_declaration(ctx, owner) }
        self.adjust_arguments(new.args, sig);
        node.ty.set(Some(new.class.get()));
        if let Some(r) = synth::box_of_unbox(ck, node) { slot.set(r) }
      }
      NodeKind::NewArray(na) => {
        for d in na.dims { self.visit_expr(d) }
        if let Some(t) = node.ty.get() {
          let t = normalize(ck, t);
          node.ty.set(Some(t));
          na.sig.set(Some(ck.create_builtin_array_signature(t, na.dims.len())));
        }
        let int = ck.prim(PrimKind::Int);
        for d in na.dims { adjust_type(ctx, d, int) }
      }
      NodeKind::ArrayLit(es) => {
        for e in *es { self.visit_expr(e) }
        if let Some(t) = node.ty.get() {
          let t = normalize(ck, t);
          node.ty.set(Some(t));
          match t {
            &TyKind::Tuple(comps) => {
              for (e, &c) in es.iter().zip(comps) { adjust_type(ctx, e, c) }
            }
            &TyKind::Array(el) | &TyKind::ResizableArray(el) => {
              for e in *es { adjust_type(ctx, e, el) }
            }
            _ => {}
          }
        }
      }
      NodeKind::Binary(b) => {
        self.visit_expr(&b.lhs);
        self.visit_expr(&b.rhs);
        self.handle_binary(node, b);
      }
      NodeKind::Unary(u) => {
        self.visit_expr(&u.arg);
        if u.op == UnOp::BitNot {
          // The annotated type picks the integer width of the complement.
          if let Some(t) = node.ty.get() {
            if t.is_primitive() { adjust_type(ctx, &u.arg, t) }
          }
        }
        self.unbox_if_boxed(&u.arg);
        node.ty.set(Some(match u.op {
          UnOp::Not => ck.prim(PrimKind::Bool),
          UnOp::Minus | UnOp::Plus | UnOp::BitNot => ck.recheck(u.arg.get()),
        }));
      }
      NodeKind::Member(m) => {
        self.visit_expr(&m.obj);
        match &m.prop {
          MemberProp::Index(i) => {
            self.visit_expr(i);
            self.element_access(node, m, i);
          }
          MemberProp::Ident(p) => self.property_access(node, m, p),
        }
      }
      NodeKind::As(a) => {
        self.visit_expr(&a.expr);
        self.handle_as(node, a);
      }
      NodeKind::Conditional(c) => {
        self.visit_expr(&c.test);
        self.unbox_if_boxed(&c.test);
        self.visit_expr(&c.cons);
        self.visit_expr(&c.alt);
        // A reference result boxes both branches into it; a primitive
        // result unboxes them.
        if let Some(t) = node.ty.get() {
          adjust_type(ctx, &c.cons, t);
          adjust_type(ctx, &c.alt, t);
        }
      }
      NodeKind::Assign(a) => {
        self.visit_expr(&a.target);
        self.visit_expr(&a.value);
        let tt = ck.recheck(a.target.get());
        adjust_type(ctx, &a.value, tt);
        node.ty.set(Some(tt));
      }
      NodeKind::Seq(es) => {
        for e in *es { self.visit_expr(e) }
        if let Some(last) = es.last() { node.ty.set(Some(ck.recheck(last.get()))) }
      }
      NodeKind::BlockExpr(be) => {
        for &s in be.stmts { self.visit_stmt(s) }
        self.visit_expr(&be.last);
        node.ty.set(Some(ck.recheck(be.last.get())));
      }
      NodeKind::NonNull(e) => {
        self.visit_expr(e);
        let inner = e.get();
        let it = ck.recheck(inner);
        if it.is_primitive() {
          // Primitives cannot be nullish; splice the operand in place.
          inner.parent.set(node.parent.get());
          slot.set(inner);
        } else {
          node.ty.set(Some(ck.get_non_nullish_type(it)));
        }
      }
      NodeKind::Spread(e) => self.visit_expr(e),
      k => panic!("visit_expr: not an expression: {k:?}"),
    }
  }

  fn unbox_if_boxed(&mut self, slot: &Slot<'a>) {
    let e = slot.get();
    if self.ctx.checker.recheck(e).boxed_prim().is_some() {
      slot.set(synth::insert_unboxing(self.ctx, e));
    }
  }

  /// The primitive kind an operand contributes to an operator, looking
  /// through boxing and boxed-constrained type parameters.
  fn prim_or_boxed(&self, e: NodeRef<'a>) -> Option<PrimKind> {
    let ck = &self.ctx.checker;
    let t = ck.recheck(e);
    t.prim().or_else(|| ck.get_apparent_type(t).boxed_prim())
  }

  fn handle_call(&mut self, node: NodeRef<'a>, call: &'a CallExpr<'a>) {
    let ctx = self.ctx;
    let ck = &ctx.checker;
    let callee = call.callee.get();
    if let Some(decl) = resolve_callee(callee) {
      let NodeKind::Function(sf) = &decl.kind else { unreachable!() };
      if sf.flags.get().contains(FnFlags::NATIVE) {
        // Foreign calls stay in the boxed world: box every argument.
        for a in call.args {
          if let Some(k) = ck.recheck(a.get()).prim() {
            a.set(synth::insert_boxing(ctx, a.get(), k));
          }
        }
        return;
      }
      declare::handle_declaration(ctx, decl);
      call.sig.set(Some(sf.sig));
    }
    let Some(sig) = call.sig.get() else { return };
    self.adjust_arguments(call.args, sig);
    node.ty.set(Some(sig.ret.get()));
    if sig.this_return {
      if let NodeKind::Member(m) = &callee.kind {
        node.ty.set(m.obj.get().ty.get());
      }
    }
  }

  fn adjust_arguments(&mut self, args: &'a [Slot<'a>], sig: &'a Signature<'a>) {
    let ctx = self.ctx;
    for pair in args.iter().zip_longest(sig.params) {
      match pair {
        EitherOrBoth::Both(arg, p) => adjust_type(ctx, arg, p.ty.get()),
        EitherOrBoth::Left(arg) => {
          let Some(rest) = sig.rest else { break };
          // NOTE: spread arguments into a rest parameter keep their boxed
          // elements; adjusting them would change observable output.
          if matches!(arg.get().kind, NodeKind::Spread(_)) { continue }
          let elem = match rest.ty.get() {
            &TyKind::Array(e) | &TyKind::ResizableArray(e) => e,
            t => panic!("rest parameter is not an array: {t}"),
          };
          adjust_type(ctx, arg, elem);
        }
        EitherOrBoth::Right(_) => {}
      }
    }
  }

  fn handle_binary(&mut self, node: NodeRef<'a>, b: &'a BinaryExpr<'a>) {
    let ctx = self.ctx;
    let ck = &ctx.checker;
    match b.op {
      op if op.is_arith() || op.is_cmp() => {
        let (Some(lk), Some(rk)) =
          (self.prim_or_boxed(b.lhs.get()), self.prim_or_boxed(b.rhs.get()))
        else {
          // String concatenation and other reference operands are not this
          // pass's business.
          return;
        };
        self.unbox_if_boxed(&b.lhs);
        self.unbox_if_boxed(&b.rhs);
        let common = binary_promotion(lk, rk);
        if lk != common { convert_primitive(ctx, &b.lhs, lk, common) }
        if rk != common { convert_primitive(ctx, &b.rhs, rk, common) }
        b.op_ty.set(Some(ck.prim(common)));
        node.ty.set(Some(ck.prim(if op.is_cmp() { PrimKind::Bool } else { common })));
      }
      op if op.is_eq() => {
        match (self.prim_or_boxed(b.lhs.get()), self.prim_or_boxed(b.rhs.get())) {
          (Some(lk), Some(rk)) => {
            self.unbox_if_boxed(&b.lhs);
            self.unbox_if_boxed(&b.rhs);
            let common = binary_promotion(lk, rk);
            if lk != common { convert_primitive(ctx, &b.lhs, lk, common) }
            if rk != common { convert_primitive(ctx, &b.rhs, rk, common) }
            b.op_ty.set(Some(ck.prim(common)));
          }
          // Reference equality: any primitive side goes into a box.
          _ => {
            for s in [&b.lhs, &b.rhs] {
              if let Some(k) = ck.recheck(s.get()).prim() {
                s.set(synth::insert_boxing(ctx, s.get(), k));
              }
            }
          }
        }
        node.ty.set(Some(ck.prim(PrimKind::Bool)));
      }
      BinOp::Nullish => {
        let t = node.ty.get().expect("untyped nullish expression");
        let boxed = ck.maybe_box_type(ck.get_non_nullish_type(t));
        let lhs_expected = ck.create_union_type(&[boxed, ck.null(), ck.undefined()]);
        adjust_type(ctx, &b.lhs, lhs_expected);
        adjust_type(ctx, &b.rhs, boxed);
        node.ty.set(Some(boxed));
      }
      BinOp::LogicalAnd | BinOp::LogicalOr => {
        let lt = ck.recheck(b.lhs.get());
        let rt = ck.recheck(b.rhs.get());
        if ck.is_identical_to(lt, rt) {
          node.ty.set(Some(lt));
          return;
        }
        // Numeric literals are polymorphic: prefer the other operand's
        // boxed type over a union with the literal's.
        let chosen = if matches!(b.lhs.get().kind, NodeKind::Number(_)) {
          ck.maybe_box_type(rt)
        } else if matches!(b.rhs.get().kind, NodeKind::Number(_)) {
          ck.maybe_box_type(lt)
        } else {
          ck.create_union_type(&[ck.maybe_box_type(lt), ck.maybe_box_type(rt)])
        };
        node.ty.set(Some(normalize(ck, chosen)));
      }
      BinOp::InstanceOf => {
        if let Some(k) = ck.recheck(b.lhs.get()).prim() {
          b.lhs.set(synth::insert_boxing(ctx, b.lhs.get(), k));
        }
        node.ty.set(Some(ck.prim(PrimKind::Bool)));
      }
      op => panic!("unclassified binary operator: {op:?}"),
    }
  }

  fn handle_as(&mut self, node: NodeRef<'a>, a: &'a crate::types::ast::AsExpr<'a>) {
    let ctx = self.ctx;
    let ck = &ctx.checker;
    let NodeKind::TypeNode(tcell) = &a.target.kind else {
      panic!("as-target must be a type node")
    };
    let target = tcell.get();
    let src = ck.recheck(a.expr.get());
    // A union target converts through its unboxable constituent: the cast
    // lands on the boxed member of the union, widening the source into it.
    if let TyKind::Union(parts) = target {
      if let Some(tk) = parts.iter().find_map(|p| p.boxed_prim()) {
        match (src.prim(), src.boxed_prim()) {
          (Some(s), _) => {
            if s != tk { convert_primitive(ctx, &a.expr, s, tk) }
            a.expr.set(synth::insert_boxing(ctx, a.expr.get(), tk));
          }
          (None, Some(s)) => {
            debug_assert!(ck.is_legal_boxed_conversion(target, src),
              "illegal boxed conversion from {src} to {target}");
            if s != tk {
              a.expr.set(synth::insert_unboxing(ctx, a.expr.get()));
              convert_primitive(ctx, &a.expr, s, tk);
              a.expr.set(synth::insert_boxing(ctx, a.expr.get(), tk));
            }
          }
          _ => {}
        }
      }
      node.ty.set(Some(target));
      return;
    }
    match (src.prim(), src.boxed_prim(), target.prim(), target.boxed_prim()) {
      (Some(s), _, Some(t), _) => {
        if s != t { convert_primitive(ctx, &a.expr, s, t) }
      }
      (Some(s), _, None, Some(t)) => {
        if s != t { convert_primitive(ctx, &a.expr, s, t) }
        a.expr.set(synth::insert_boxing(ctx, a.expr.get(), t));
      }
      (None, Some(s), Some(t), _) => {
        a.expr.set(synth::insert_unboxing(ctx, a.expr.get()));
        if s != t { convert_primitive(ctx, &a.expr, s, t) }
      }
      (None, Some(s), None, Some(t)) => {
        debug_assert!(ck.is_legal_boxed_conversion(target, src),
          "illegal boxed conversion from {src} to {target}");
        a.expr.set(synth::insert_unboxing(ctx, a.expr.get()));
        if s != t { convert_primitive(ctx, &a.expr, s, t) }
        a.expr.set(synth::insert_boxing(ctx, a.expr.get(), t));
      }
      _ => {}
    }
    node.ty.set(Some(target));
  }

  fn property_access(&mut self, node: NodeRef<'a>, m: &'a MemberExpr<'a>, prop: NodeRef<'a>) {
    let ctx = self.ctx;
    let ck = &ctx.checker;
    // Instance access on a primitive receiver boxes it: `(5).toString()`.
    if let Some(k) = ck.recheck(m.obj.get()).prim() {
      m.obj.set(synth::insert_boxing(ctx, m.obj.get(), k));
    }
    let NodeKind::Ident(id) = &prop.kind else {
      panic!("property access must name an identifier")
    };
    if id.name == sym::length() {
      if let TyKind::Array(_) = ck.recheck(m.obj.get()) {
        let int = ck.prim(PrimKind::Int);
        prop.ty.set(Some(int));
        node.ty.set(Some(int));
        return;
      }
    }
    let Some(var) = id.var.get() else { return };
    let Some(decl) = var.decl.get() else { return };
    match &decl.kind {
      NodeKind::ClassProperty(_) => {
        declare::handle_declaration(ctx, decl);
        // Keep the use in sync with the declaration: a normalized surface
        // propagates, and a dynamic-interop property restores its boxed
        // surface over the preorder rewrite.
        let resolved = decl.ty.get().expect("untyped class property");
        prop.ty.set(Some(resolved));
        var.ty.set(Some(resolved));
        node.ty.set(Some(resolved));
      }
      NodeKind::Function(sf)
        if sf.flags.get().intersects(FnFlags::GETTER | FnFlags::SETTER) =>
      {
        if let Some(t) = self.accessor_type(node, sf, decl) {
          if is_recursively_unboxed(t) {
            prop.ty.set(Some(t));
            node.ty.set(Some(t));
          }
        }
      }
      NodeKind::Function(_) => declare::handle_declaration(ctx, decl),
      _ => {}
    }
  }

  /// Pick the getter's return type or the setter's parameter type for an
  /// accessor property, depending on which side of an assignment the member
  /// appears on.
  fn accessor_type(
    &mut self,
    node: NodeRef<'a>,
    sf: &'a ScriptFunction<'a>,
    decl: NodeRef<'a>,
  ) -> Option<Ty<'a>> {
    let want = if is_assign_target(node) { FnFlags::SETTER } else { FnFlags::GETTER };
    let chosen = if sf.flags.get().contains(want) {
      decl
    } else {
      let class = sf.class.get()?;
      let member = class.find(MemberKind::Method, sf.base_name)?;
      member.decls.iter().copied().find(|&d| {
        let NodeKind::Function(f) = &d.kind else { return false };
        f.flags.get().contains(want)
      })?
    };
    declare::handle_declaration(self.ctx, chosen);
    let NodeKind::Function(f) = &chosen.kind else { unreachable!() };
    Some(if want == FnFlags::SETTER {
      f.sig.params.first()?.ty.get()
    } else {
      f.sig.ret.get()
    })
  }

  fn element_access(&mut self, node: NodeRef<'a>, m: &'a MemberExpr<'a>, idx: &'a Slot<'a>) {
    let ctx = self.ctx;
    let ck = &ctx.checker;
    if ck.recheck(idx.get()).boxed_prim().is_some() {
      idx.set(synth::insert_unboxing(ctx, idx.get()));
    }
    match ck.recheck(m.obj.get()) {
      &TyKind::Tuple(es) => {
        let i = const_index(idx.get()).expect("tuple index must be a compile-time constant");
        node.ty.set(Some(*es.get(i).expect("tuple index out of bounds")));
      }
      &TyKind::Array(e) | &TyKind::ResizableArray(e) => node.ty.set(Some(e)),
      _ => {}
    }
  }
}

fn resolve_callee<'a>(callee: NodeRef<'a>) -> Option<NodeRef<'a>> {
  let var = match &callee.kind {
    NodeKind::Ident(id) => id.var.get(),
    NodeKind::Member(m) => match &m.prop {
      MemberProp::Ident(p) => {
        let NodeKind::Ident(id) = &p.kind else { return None };
        id.var.get()
      }
      MemberProp::Index(_) => None,
    },
    _ => None,
  }?;
  let decl = var.decl.get()?;
  matches!(decl.kind, NodeKind::Function(_)).then_some(decl)
}

fn is_assign_target(node: NodeRef<'_>) -> bool {
  if_chain! {
    if let Some(parent) = node.parent.get();
    if let NodeKind::Assign(a) = &parent.kind;
    then { ptr::eq(a.target.get(), node) } else { false }
  }
}

/// Java-style binary numeric promotion: `double` and `float` dominate, then
/// `long`, everything narrower meets at `int`. Two booleans stay boolean.
fn binary_promotion(a: PrimKind, b: PrimKind) -> PrimKind {
  use PrimKind::{Bool, Double, Float, Int, Long};
  if a == Bool || b == Bool {
    assert!(a == b, "boolean operand mixed into a numeric operation");
    return Bool;
  }
  if a == Double || b == Double { return Double }
  if a == Float || b == Float { return Float }
  if a == Long || b == Long { return Long }
  Int
}

/// The compile-time constant probe for tuple indexing: a plain integer
/// literal, an `as` cast over one, or one hop through a local `const`
/// binding.
fn const_index(expr: NodeRef<'_>) -> Option<usize> {
  const_index_at(expr, 0)
}

fn const_index_at(expr: NodeRef<'_>, depth: u32) -> Option<usize> {
  match &expr.kind {
    NodeKind::Number(NumValue::Int(b)) => b.to_usize(),
    NodeKind::As(a) => const_index_at(a.expr.get(), depth),
    NodeKind::Ident(id) if depth == 0 => {
      if_chain! {
        if let Some(var) = id.var.get();
        if let Some(decl) = var.decl.get();
        if decl.flags.get().contains(NodeFlags::CONST);
        if let NodeKind::Declarator(d) = &decl.kind;
        if let Some(init) = &d.init;
        then { const_index_at(init.get(), 1) } else { None }
      }
    }
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::binary_promotion;
  use crate::types::PrimKind::{Bool, Byte, Char, Double, Float, Int, Long, Short};

  #[test]
  fn promotion_meets_at_int_and_climbs() {
    assert_eq!(binary_promotion(Byte, Short), Int);
    assert_eq!(binary_promotion(Char, Byte), Int);
    assert_eq!(binary_promotion(Int, Int), Int);
    assert_eq!(binary_promotion(Int, Long), Long);
    assert_eq!(binary_promotion(Long, Float), Float);
    assert_eq!(binary_promotion(Float, Double), Double);
    assert_eq!(binary_promotion(Bool, Bool), Bool);
  }
}
