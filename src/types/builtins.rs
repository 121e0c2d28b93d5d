//! Construction of the builtin wrapper world: the canonical primitive types,
//! the boxed wrapper classes with their constructors, `unboxed()`, `valueOf`
//! and `to*` conversion statics, and the root `Object` type.
//!
//! The declarations are built the way earlier compiler phases hand them to
//! the pass: uniformly boxed. The driver's pre-seed step then normalizes
//! them, after which constructors take primitives and `unboxed()` returns
//! the primitive.

use std::cell::Cell;

use crate::{Arenas, Symbol, intern, sym};
use super::{PrimKind, Span, NUMERIC_CHAIN};
use super::ast::{ClassDecl, FnFlags, NodeKind, NodeRef, Variable};
use super::ty::{ClassFlags, Member, MemberKind, ObjectDef, ObjectType, Ty, TyKind};

/// The canonical global types handed out by the checker.
pub struct Globals<'a> {
  prims: [Ty<'a>; 8],
  wrappers: [&'a ObjectDef<'a>; 8],
  wrapper_tys: [Ty<'a>; 8],
  pub string: Ty<'a>,
  pub null: Ty<'a>,
  pub undefined: Ty<'a>,
  pub any: Ty<'a>,
  pub never: Ty<'a>,
  /// The root reference type; a supertype of everything in the reference
  /// world.
  pub object: Ty<'a>,
  pub object_def: &'a ObjectDef<'a>,
}

impl<'a> Globals<'a> {
  #[must_use] pub fn prim(&self, k: PrimKind) -> Ty<'a> { self.prims[k as usize] }
  #[must_use] pub fn wrapper(&self, k: PrimKind) -> &'a ObjectDef<'a> { self.wrappers[k as usize] }
  #[must_use] pub fn wrapper_ty(&self, k: PrimKind) -> Ty<'a> { self.wrapper_tys[k as usize] }
}

const ALL_KINDS: [PrimKind; 8] = [
  PrimKind::Bool, PrimKind::Char, PrimKind::Byte, PrimKind::Short,
  PrimKind::Int, PrimKind::Long, PrimKind::Float, PrimKind::Double,
];

/// Build the global type table. Called once per pass context.
pub fn install<'a>(arenas: &'a Arenas<'a>) -> Globals<'a> {
  let def = |name: Symbol, boxed| -> &'a ObjectDef<'a> {
    arenas.bump.alloc(ObjectDef {
      name,
      boxed,
      params: &[],
      flags: ClassFlags::default(),
      members: Cell::new(&[]),
      class_var: Cell::new(None),
      decl: Cell::new(None),
    })
  };

  let object_def = def(intern("Object"), None);
  let object = arenas.ty(TyKind::Object(ObjectType { def: object_def, args: &[] }));

  let prims = ALL_KINDS.map(|k| arenas.ty(TyKind::Primitive(k)));
  let wrappers = ALL_KINDS.map(|k| def(intern(k.wrapper_name()), Some(k)));
  let wrapper_tys = wrappers
    .map(|d| arenas.ty(TyKind::Object(ObjectType { def: d, args: &[] })));

  let globals = Globals {
    prims,
    wrappers,
    wrapper_tys,
    string: arenas.ty(TyKind::String),
    null: arenas.ty(TyKind::Null),
    undefined: arenas.ty(TyKind::Undefined),
    any: arenas.ty(TyKind::Any),
    never: arenas.ty(TyKind::Never),
    object,
    object_def,
  };

  bind_class(arenas, object_def, object);
  for k in ALL_KINDS {
    install_wrapper(arenas, &globals, k);
  }
  globals
}

/// Give `def` a `ClassDecl` node and the variable bare class-name
/// identifiers resolve to.
fn bind_class<'a>(arenas: &'a Arenas<'a>, def: &'a ObjectDef<'a>, class_ty: Ty<'a>) {
  let decl = arenas.node(
    NodeKind::ClassDecl(ClassDecl { def, members: &[] }), Some(class_ty), Span::NONE);
  def.decl.set(Some(decl));
  let var = arenas.var(def.name, Some(class_ty));
  var.decl.set(Some(decl));
  def.class_var.set(Some(var));
}

fn install_wrapper<'a>(arenas: &'a Arenas<'a>, globals: &Globals<'a>, k: PrimKind) {
  let def = globals.wrapper(k);
  let boxed = globals.wrapper_ty(k);
  let value = intern("value");

  let method = |name: Symbol, params: &[(Symbol, Ty<'a>)], ret: Ty<'a>, flags: FnFlags| {
    arenas.function(name, params, None, ret, None, flags, Some(def))
  };
  let member = |kind, name, decls: &[NodeRef<'a>]| {
    let var: &'a Variable<'a> = arenas.var(name, None);
    var.decl.set(Some(decls[0]));
    Member { kind, name, var, decls: arenas.node_list(decls.iter().copied()) }
  };

  let mut members = bumpalo::collections::Vec::new_in(&arenas.bump);
  members.push(member(MemberKind::Ctor, sym::ctor(),
    &[method(sym::ctor(), &[(value, boxed)], boxed, FnFlags::METHOD | FnFlags::CTOR)]));
  members.push(member(MemberKind::Method, sym::unboxed(),
    &[method(sym::unboxed(), &[], boxed, FnFlags::METHOD)]));
  members.push(member(MemberKind::Method, sym::value_of(),
    &[method(sym::value_of(), &[(value, boxed)], boxed, FnFlags::METHOD)]));

  // Conversion statics exist on the numeric and char wrappers only.
  if k != PrimKind::Bool {
    let mut targets: Vec<PrimKind> = NUMERIC_CHAIN.to_vec();
    targets.push(PrimKind::Char);
    for to in targets {
      if to == k { continue }
      let name = intern(&format!("to{}", to.wrapper_name()));
      members.push(member(MemberKind::Static, name,
        &[method(name, &[(value, boxed)], globals.wrapper_ty(to),
          FnFlags::METHOD | FnFlags::STATIC)]));
    }
  }
  if k == PrimKind::Char {
    members.push(member(MemberKind::Static, sym::to_string(),
      &[method(sym::to_string(), &[(value, boxed)], globals.string,
        FnFlags::METHOD | FnFlags::STATIC)]));
  }

  def.members.set(members.into_bump_slice());
  bind_class(arenas, def, boxed);
}
