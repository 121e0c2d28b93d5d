//! The AST operated on by the pass: a tree of arena nodes with parent
//! back-references and a mutable computed-type slot per node.
//!
//! The pass mutates existing nodes and splices in new ones; it never deletes,
//! only replaces. Replaceable expression children are therefore held in
//! [`Slot`] cells owned by the parent: the visitor walks slots, so any
//! handler can swap the child for a synthesized conversion without
//! reconstructing the parent. Statement positions are plain references, since
//! statements are never replaced.

use std::cell::Cell;
use std::fmt;

use bitflags::bitflags;
use num::BigInt;

use crate::{Arenas, Symbol};
use super::{NodeId, Span};
use super::ty::{ObjectDef, Ty};

/// A reference to an arena-allocated AST node.
pub type NodeRef<'a> = &'a AstNode<'a>;

/// A replaceable child link. Handlers write a replacement node into the slot;
/// the old node stays in the arena but drops out of the tree.
pub type Slot<'a> = Cell<NodeRef<'a>>;

bitflags! {
  /// Flags carried on individual nodes.
  #[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
  pub struct NodeFlags: u8 {
    /// The node belongs to a dynamic-interop program; its class properties
    /// keep their boxed type surface unless force-unboxed.
    const DYNAMIC = 1;
    /// A `const` declarator, eligible for the constant-index probe.
    const CONST = 1 << 1;
  }
}

bitflags! {
  /// Flags on a script function.
  #[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
  pub struct FnFlags: u8 {
    const METHOD = 1;
    const STATIC = 1 << 1;
    const CTOR = 1 << 2;
    const GETTER = 1 << 3;
    const SETTER = 1 << 4;
    /// A native/foreign function; its arguments stay in the boxed world.
    const NATIVE = 1 << 5;
  }
}

/// One AST node. `kind` is immutable; everything the pass rewrites lives in
/// cells: the computed type, the parent link, the span, and the flags.
pub struct AstNode<'a> {
  pub id: NodeId,
  pub kind: NodeKind<'a>,
  pub ty: Cell<Option<Ty<'a>>>,
  pub parent: Cell<Option<NodeRef<'a>>>,
  pub span: Cell<Span>,
  pub flags: Cell<NodeFlags>,
}

impl fmt::Debug for AstNode<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    // Parents are deliberately not printed, or this would never terminate.
    f.debug_struct("AstNode")
      .field("id", &self.id)
      .field("ty", &self.ty.get().map(|t| t.to_string()))
      .field("kind", &self.kind)
      .finish()
  }
}

/// The node kinds the pass dispatches over.
#[derive(Debug)]
pub enum NodeKind<'a> {
  // Declarations and structure.
  ClassDecl(ClassDecl<'a>),
  ClassProperty(ClassProperty<'a>),
  Function(ScriptFunction<'a>),
  Param(ParamDecl<'a>),
  VarDecl(&'a [NodeRef<'a>]),
  Declarator(Declarator<'a>),
  AnnotationUsage(AnnotationUsage<'a>),
  // Statements.
  Block(&'a [NodeRef<'a>]),
  ExprStmt(Slot<'a>),
  Return(Option<Slot<'a>>),
  If(IfStmt<'a>),
  While(WhileStmt<'a>),
  DoWhile(WhileStmt<'a>),
  Switch(SwitchStmt<'a>),
  ForOf(ForOf<'a>),
  Break,
  Continue,
  // Expressions.
  Ident(Ident<'a>),
  Number(NumValue),
  Bool(bool),
  Char(u16),
  Str(Symbol),
  Null,
  Undefined,
  /// An opaque type annotation (the target of an `as` expression). Opaque:
  /// it has no children, only the wrapped type.
  TypeNode(Cell<Ty<'a>>),
  Call(CallExpr<'a>),
  New(NewExpr<'a>),
  NewArray(NewArray<'a>),
  ArrayLit(&'a [Slot<'a>]),
  Binary(BinaryExpr<'a>),
  Unary(UnaryExpr<'a>),
  Member(MemberExpr<'a>),
  As(AsExpr<'a>),
  Conditional(Conditional<'a>),
  Assign(AssignExpr<'a>),
  Seq(&'a [Slot<'a>]),
  BlockExpr(BlockExpr<'a>),
  NonNull(Slot<'a>),
  Spread(Slot<'a>),
}

#[derive(Debug)]
pub struct ClassDecl<'a> {
  pub def: &'a ObjectDef<'a>,
  pub members: &'a [NodeRef<'a>],
}

#[derive(Debug)]
pub struct ClassProperty<'a> {
  pub ident: NodeRef<'a>,
  pub var: &'a Variable<'a>,
  pub value: Option<Slot<'a>>,
}

#[derive(Debug)]
pub struct ScriptFunction<'a> {
  /// The mangled name; rebuilt by the binder whenever the signature changes.
  pub name: Cell<Symbol>,
  pub base_name: Symbol,
  pub params: &'a [NodeRef<'a>],
  pub rest: Option<NodeRef<'a>>,
  pub body: Option<NodeRef<'a>>,
  pub sig: &'a Signature<'a>,
  pub flags: Cell<FnFlags>,
  /// The enclosing class for methods and constructors.
  pub class: Cell<Option<&'a ObjectDef<'a>>>,
}

#[derive(Debug)]
pub struct ParamDecl<'a> {
  pub ident: NodeRef<'a>,
  pub var: &'a Variable<'a>,
  pub init: Option<Slot<'a>>,
}

#[derive(Debug)]
pub struct Declarator<'a> {
  pub ident: NodeRef<'a>,
  pub var: &'a Variable<'a>,
  pub init: Option<Slot<'a>>,
}

/// An annotation applied to a declaration. Its properties are `ClassProperty`
/// nodes carrying the annotation's field values.
#[derive(Debug)]
pub struct AnnotationUsage<'a> {
  pub name: Symbol,
  pub props: &'a [NodeRef<'a>],
}

#[derive(Debug)]
pub struct IfStmt<'a> {
  pub test: Slot<'a>,
  pub then: NodeRef<'a>,
  pub els: Option<NodeRef<'a>>,
}

#[derive(Debug)]
pub struct WhileStmt<'a> {
  pub test: Slot<'a>,
  pub body: NodeRef<'a>,
}

#[derive(Debug)]
pub struct SwitchStmt<'a> {
  pub disc: Slot<'a>,
  pub cases: &'a [SwitchCase<'a>],
}

/// `test` is `None` for the `default` case.
#[derive(Debug)]
pub struct SwitchCase<'a> {
  pub test: Option<Slot<'a>>,
  pub body: &'a [NodeRef<'a>],
}

/// `for (const v of right) body`. `decl` is a `VarDecl` with exactly one
/// declarator and no initializer; its variable is retyped from the right-hand
/// side during the declaration sweep.
#[derive(Debug)]
pub struct ForOf<'a> {
  pub decl: NodeRef<'a>,
  pub right: Slot<'a>,
  pub body: NodeRef<'a>,
}

#[derive(Debug)]
pub struct Ident<'a> {
  pub name: Symbol,
  pub var: Cell<Option<&'a Variable<'a>>>,
}

/// The payload of a numeric literal. Integer values are exact; the literal's
/// primitive kind lives in the node's type slot.
#[derive(Clone, Debug)]
pub enum NumValue {
  Int(BigInt),
  Float(f64),
}

#[derive(Debug)]
pub struct CallExpr<'a> {
  pub callee: Slot<'a>,
  pub args: &'a [Slot<'a>],
  pub sig: Cell<Option<&'a Signature<'a>>>,
}

#[derive(Debug)]
pub struct NewExpr<'a> {
  /// The instantiated class type (always an `Object`).
  pub class: Cell<Ty<'a>>,
  pub args: &'a [Slot<'a>],
  pub sig: Cell<Option<&'a Signature<'a>>>,
}

/// `new Array(n)` and its multi-dimensional form; one slot per dimension.
#[derive(Debug)]
pub struct NewArray<'a> {
  pub dims: &'a [Slot<'a>],
  pub sig: Cell<Option<&'a Signature<'a>>>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BinOp {
  Add, Sub, Mul, Div, Rem,
  BitAnd, BitOr, BitXor, Shl, Shr,
  Lt, Le, Gt, Ge,
  StrictEq, StrictNe, Eq, Ne,
  Nullish, LogicalAnd, LogicalOr,
  InstanceOf,
}

impl BinOp {
  /// Arithmetic, bitwise, and shift operators: operands are unboxed and
  /// brought to a common numeric type which is also the result type.
  #[must_use] pub fn is_arith(self) -> bool {
    matches!(self, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem
      | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr)
  }

  /// Ordering comparisons: operands as for arithmetic, result `boolean`.
  #[must_use] pub fn is_cmp(self) -> bool {
    matches!(self, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
  }

  #[must_use] pub fn is_eq(self) -> bool {
    matches!(self, BinOp::StrictEq | BinOp::StrictNe | BinOp::Eq | BinOp::Ne)
  }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum UnOp {
  Minus,
  Plus,
  Not,
  BitNot,
}

#[derive(Debug)]
pub struct BinaryExpr<'a> {
  pub op: BinOp,
  pub lhs: Slot<'a>,
  pub rhs: Slot<'a>,
  /// The type the operation is evaluated at, once the operands are unboxed
  /// and promoted. Distinct from the node type for comparisons.
  pub op_ty: Cell<Option<Ty<'a>>>,
}

#[derive(Debug)]
pub struct UnaryExpr<'a> {
  pub op: UnOp,
  pub arg: Slot<'a>,
}

#[derive(Debug)]
pub enum MemberProp<'a> {
  /// `obj.name` property or method access; the identifier resolves to the
  /// member's binding variable.
  Ident(NodeRef<'a>),
  /// `obj[index]` element access.
  Index(Slot<'a>),
}

#[derive(Debug)]
pub struct MemberExpr<'a> {
  pub obj: Slot<'a>,
  pub prop: MemberProp<'a>,
}

#[derive(Debug)]
pub struct AsExpr<'a> {
  pub expr: Slot<'a>,
  /// A `TypeNode` carrying the cast target.
  pub target: NodeRef<'a>,
}

#[derive(Debug)]
pub struct Conditional<'a> {
  pub test: Slot<'a>,
  pub cons: Slot<'a>,
  pub alt: Slot<'a>,
}

#[derive(Debug)]
pub struct AssignExpr<'a> {
  pub target: Slot<'a>,
  pub value: Slot<'a>,
}

/// A block expression: statements followed by a trailing result expression.
#[derive(Debug)]
pub struct BlockExpr<'a> {
  pub stmts: &'a [NodeRef<'a>],
  pub last: Slot<'a>,
}

/// A binding variable. Identifiers resolve to variables; the pass keeps the
/// variable's type, its declaring node's type and every use's type in sync.
pub struct Variable<'a> {
  pub name: Symbol,
  pub ty: Cell<Option<Ty<'a>>>,
  pub decl: Cell<Option<NodeRef<'a>>>,
}

impl fmt::Debug for Variable<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Variable").field("name", &self.name).finish_non_exhaustive()
  }
}

/// A call signature. Parameter and return types are cells because the
/// declaration normalizer rewrites them in place.
pub struct Signature<'a> {
  pub params: &'a [SigParam<'a>],
  pub rest: Option<&'a SigParam<'a>>,
  pub ret: Cell<Ty<'a>>,
  /// A fluent-style signature: the call result takes the receiver's type.
  pub this_return: bool,
  pub owner: Cell<Option<NodeRef<'a>>>,
}

impl fmt::Debug for Signature<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Signature")
      .field("params", &self.params)
      .field("ret", &self.ret.get().to_string())
      .finish_non_exhaustive()
  }
}

#[derive(Debug)]
pub struct SigParam<'a> {
  pub name: Symbol,
  pub ty: Cell<Ty<'a>>,
}

/// One compilation unit. External programs are visited by the driver's
/// annotation sweep only.
pub struct Program<'a> {
  pub ast: NodeRef<'a>,
  pub external: &'a [&'a Program<'a>],
  pub dynamic: bool,
}

impl<'a> Arenas<'a> {
  /// Allocate a node, assigning the next dense id.
  pub fn node(&'a self, kind: NodeKind<'a>, ty: Option<Ty<'a>>, span: Span) -> NodeRef<'a> {
    self.nodes.alloc(AstNode {
      id: self.next_node_id(),
      kind,
      ty: Cell::new(ty),
      parent: Cell::new(None),
      span: Cell::new(span),
      flags: Cell::new(NodeFlags::default()),
    })
  }

  pub fn var(&'a self, name: Symbol, ty: Option<Ty<'a>>) -> &'a Variable<'a> {
    self.vars.alloc(Variable { name, ty: Cell::new(ty), decl: Cell::new(None) })
  }

  pub fn ty(&'a self, kind: super::ty::TyKind<'a>) -> Ty<'a> {
    self.bump.alloc(kind)
  }

  pub fn ty_list(&'a self, tys: impl IntoIterator<Item = Ty<'a>>) -> &'a [Ty<'a>] {
    let mut v = bumpalo::collections::Vec::new_in(&self.bump);
    v.extend(tys);
    v.into_bump_slice()
  }

  pub fn slots(&'a self, nodes: impl IntoIterator<Item = NodeRef<'a>>) -> &'a [Slot<'a>] {
    let mut v = bumpalo::collections::Vec::new_in(&self.bump);
    v.extend(nodes.into_iter().map(Cell::new));
    v.into_bump_slice()
  }

  pub fn node_list(&'a self, nodes: impl IntoIterator<Item = NodeRef<'a>>) -> &'a [NodeRef<'a>] {
    let mut v = bumpalo::collections::Vec::new_in(&self.bump);
    v.extend(nodes);
    v.into_bump_slice()
  }

  pub fn sig(
    &'a self,
    params: &[(Symbol, Ty<'a>)],
    rest: Option<(Symbol, Ty<'a>)>,
    ret: Ty<'a>,
    this_return: bool,
  ) -> &'a Signature<'a> {
    let mut v = bumpalo::collections::Vec::new_in(&self.bump);
    v.extend(params.iter().map(|&(name, ty)| SigParam { name, ty: Cell::new(ty) }));
    let params = v.into_bump_slice();
    let rest = rest.map(|(name, ty)| &*self.bump.alloc(SigParam { name, ty: Cell::new(ty) }));
    self.sigs.alloc(Signature {
      params,
      rest,
      ret: Cell::new(ret),
      this_return,
      owner: Cell::new(None),
    })
  }

  /// Build a fully wired script function: parameter nodes with bound
  /// identifiers and variables, the matching signature, and the function
  /// node itself. The initial mangled name is the base name; the binder
  /// rebuilds it when the declaration normalizer changes the signature.
  pub fn function(
    &'a self,
    base_name: Symbol,
    params: &[(Symbol, Ty<'a>)],
    rest: Option<(Symbol, Ty<'a>)>,
    ret: Ty<'a>,
    body: Option<NodeRef<'a>>,
    flags: FnFlags,
    class: Option<&'a ObjectDef<'a>>,
  ) -> NodeRef<'a> {
    let mk_param = |&(name, ty): &(Symbol, Ty<'a>)| {
      let var = self.var(name, Some(ty));
      let ident = self.node(
        NodeKind::Ident(Ident { name, var: Cell::new(Some(var)) }), Some(ty), Span::NONE);
      let p = self.node(
        NodeKind::Param(ParamDecl { ident, var, init: None }), Some(ty), Span::NONE);
      var.decl.set(Some(p));
      p
    };
    let param_nodes = self.node_list(params.iter().map(mk_param));
    let rest_node = rest.as_ref().map(mk_param);
    let sig = self.sig(params, rest, ret, false);
    let f = self.node(NodeKind::Function(ScriptFunction {
      name: Cell::new(base_name),
      base_name,
      params: param_nodes,
      rest: rest_node,
      body,
      sig,
      flags: Cell::new(flags),
      class: Cell::new(class),
    }), None, Span::NONE);
    sig.owner.set(Some(f));
    f
  }

  pub fn program(
    &'a self,
    ast: NodeRef<'a>,
    external: &'a [&'a Program<'a>],
    dynamic: bool,
  ) -> &'a Program<'a> {
    self.bump.alloc(Program { ast, external, dynamic })
  }
}

/// Call `f` on every direct child node of `node`, in source order.
pub fn each_child<'a>(node: NodeRef<'a>, f: &mut dyn FnMut(NodeRef<'a>)) {
  let each_slot = |slots: &[Slot<'a>], f: &mut dyn FnMut(NodeRef<'a>)| {
    for s in slots { f(s.get()) }
  };
  match &node.kind {
    NodeKind::ClassDecl(c) => for &m in c.members { f(m) },
    NodeKind::ClassProperty(p) => {
      f(p.ident);
      if let Some(v) = &p.value { f(v.get()) }
    }
    NodeKind::Function(sf) => {
      for &p in sf.params { f(p) }
      if let Some(r) = sf.rest { f(r) }
      if let Some(b) = sf.body { f(b) }
    }
    NodeKind::Param(p) => {
      f(p.ident);
      if let Some(i) = &p.init { f(i.get()) }
    }
    NodeKind::VarDecl(ds) => for &d in *ds { f(d) },
    NodeKind::Declarator(d) => {
      f(d.ident);
      if let Some(i) = &d.init { f(i.get()) }
    }
    NodeKind::AnnotationUsage(a) => for &p in a.props { f(p) },
    NodeKind::Block(stmts) => for &s in *stmts { f(s) },
    NodeKind::ExprStmt(e) => f(e.get()),
    NodeKind::Return(r) => if let Some(e) = r { f(e.get()) },
    NodeKind::If(i) => {
      f(i.test.get());
      f(i.then);
      if let Some(e) = i.els { f(e) }
    }
    NodeKind::While(w) | NodeKind::DoWhile(w) => {
      f(w.test.get());
      f(w.body);
    }
    NodeKind::Switch(s) => {
      f(s.disc.get());
      for c in s.cases {
        if let Some(t) = &c.test { f(t.get()) }
        for &b in c.body { f(b) }
      }
    }
    NodeKind::ForOf(fo) => {
      f(fo.decl);
      f(fo.right.get());
      f(fo.body);
    }
    NodeKind::Break | NodeKind::Continue | NodeKind::Ident(_) | NodeKind::Number(_)
    | NodeKind::Bool(_) | NodeKind::Char(_) | NodeKind::Str(_) | NodeKind::Null
    | NodeKind::Undefined | NodeKind::TypeNode(_) => {}
    NodeKind::Call(c) => {
      f(c.callee.get());
      each_slot(c.args, f);
    }
    NodeKind::New(n) => each_slot(n.args, f),
    NodeKind::NewArray(n) => each_slot(n.dims, f),
    NodeKind::ArrayLit(es) => each_slot(es, f),
    NodeKind::Binary(b) => {
      f(b.lhs.get());
      f(b.rhs.get());
    }
    NodeKind::Unary(u) => f(u.arg.get()),
    NodeKind::Member(m) => {
      f(m.obj.get());
      match &m.prop {
        MemberProp::Ident(p) => f(p),
        MemberProp::Index(i) => f(i.get()),
      }
    }
    NodeKind::As(a) => {
      f(a.expr.get());
      f(a.target);
    }
    NodeKind::Conditional(c) => {
      f(c.test.get());
      f(c.cons.get());
      f(c.alt.get());
    }
    NodeKind::Assign(a) => {
      f(a.target.get());
      f(a.value.get());
    }
    NodeKind::Seq(es) => each_slot(es, f),
    NodeKind::BlockExpr(b) => {
      for &s in b.stmts { f(s) }
      f(b.last.get());
    }
    NodeKind::NonNull(e) | NodeKind::Spread(e) => f(e.get()),
  }
}

/// Overwrite the span of `node` and its whole subtree.
pub fn set_source_ranges_recursively<'a>(node: NodeRef<'a>, span: Span) {
  node.span.set(span);
  each_child(node, &mut |child| set_source_ranges_recursively(child, span));
}

/// The smallest span covering `node` and everything below it.
#[must_use] pub fn subtree_span(node: NodeRef<'_>) -> Span {
  let mut span = node.span.get();
  each_child(node, &mut |child| span = span.join(subtree_span(child)));
  span
}

/// Widen every top-level statement's span to cover its subtree.
pub fn refine_source_ranges(root: NodeRef<'_>) {
  if let NodeKind::Block(stmts) = &root.kind {
    for &s in *stmts { s.span.set(subtree_span(s)) }
  }
}
