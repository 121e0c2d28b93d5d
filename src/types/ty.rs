//! The type graph. Type nodes are immutable by convention, allocated in the
//! compilation bump arena, and shared by reference identity: the rewriter
//! returns the *same* reference when nothing inside a type changed, which is
//! what makes its idempotence and sharing invariants checkable with
//! `ptr::eq`. The single exception is a type parameter's constraint, which is
//! rewritten in place through a [`Cell`] so that recursive constraints tie
//! back into the same parameter node.

use std::cell::Cell;
use std::fmt;

use bitflags::bitflags;

use crate::Symbol;
use super::{ParamId, PrimKind};
use super::ast::{NodeRef, Variable};

/// A reference to an interned type.
pub type Ty<'a> = &'a TyKind<'a>;

/// The variants of the type graph relevant to the pass.
#[derive(Debug)]
pub enum TyKind<'a> {
  /// A value type with no object identity: `bool`, `char`, the integer and
  /// floating kinds.
  Primitive(PrimKind),
  /// A class or interface instantiation, including the boxed primitive
  /// wrappers (marked on [`ObjectDef::boxed`]).
  Object(ObjectType<'a>),
  /// A fixed-length array `E[]`. Holds its elements by value, so its element
  /// type may be a primitive.
  Array(Ty<'a>),
  /// A growable `Array<E>`. Holds references, so its element type is never
  /// unboxed.
  ResizableArray(Ty<'a>),
  /// An ordered tuple of element types.
  Tuple(&'a [Ty<'a>]),
  /// A union of constituent types. Order is preserved but irrelevant to the
  /// semantics; the checker's canonicalizer owns the normal form.
  Union(&'a [Ty<'a>]),
  /// A reference to a type parameter.
  Param(&'a TypeParam<'a>),
  /// An enumeration type.
  Enum(&'a EnumDef<'a>),
  String,
  Null,
  Undefined,
  Any,
  Never,
}

impl<'a> TyKind<'a> {
  #[must_use] pub fn prim(&self) -> Option<PrimKind> {
    if let TyKind::Primitive(k) = *self { Some(k) } else { None }
  }

  #[must_use] pub fn as_object(&self) -> Option<&ObjectType<'a>> {
    if let TyKind::Object(o) = self { Some(o) } else { None }
  }

  /// The wrapped primitive kind, if this is a boxed primitive wrapper type.
  #[must_use] pub fn boxed_prim(&self) -> Option<PrimKind> {
    self.as_object().and_then(|o| o.def.boxed)
  }

  #[must_use] pub fn is_primitive(&self) -> bool {
    matches!(self, TyKind::Primitive(_))
  }

  /// Everything that lives in the reference world: objects, strings, arrays,
  /// tuples, unions, enums, type parameters, the nullish leaves and `Any`.
  #[must_use] pub fn is_reference(&self) -> bool {
    !matches!(self, TyKind::Primitive(_) | TyKind::Never)
  }

  #[must_use] pub fn is_nullish(&self) -> bool {
    matches!(self, TyKind::Null | TyKind::Undefined)
  }
}

/// An instantiation of an [`ObjectDef`] at concrete type arguments. The
/// member tables live on the def and are shared between instantiations.
#[derive(Debug)]
pub struct ObjectType<'a> {
  pub def: &'a ObjectDef<'a>,
  pub args: &'a [Ty<'a>],
}

bitflags! {
  /// Classification flags on a class definition.
  #[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
  pub struct ClassFlags: u8 {
    const INTERFACE = 1;
    /// An annotation declaration; its properties are force-unboxed by the
    /// driver's external sweep even in dynamic-interop programs.
    const ANNOTATION = 1 << 1;
  }
}

/// What role a member plays on its class.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MemberKind {
  Ctor,
  Method,
  Static,
  Property,
}

/// One entry in a class member table. `decls` holds every overload for
/// constructors and methods, and the single `ClassProperty` node for
/// properties. `var` is the binding variable member-access identifiers
/// resolve to.
pub struct Member<'a> {
  pub kind: MemberKind,
  pub name: Symbol,
  pub var: &'a Variable<'a>,
  pub decls: &'a [NodeRef<'a>],
}

/// A class (or interface, or annotation) definition: the generic "base" that
/// [`ObjectType`]s instantiate. Member tables are installed after
/// construction through the cell, since methods refer back to their class.
pub struct ObjectDef<'a> {
  pub name: Symbol,
  /// `Some(k)` marks this def as the boxed wrapper of primitive kind `k`.
  pub boxed: Option<PrimKind>,
  pub params: &'a [&'a TypeParam<'a>],
  pub flags: ClassFlags,
  pub members: Cell<&'a [Member<'a>]>,
  /// The variable a bare class-name identifier resolves to (static access).
  pub class_var: Cell<Option<&'a Variable<'a>>>,
  /// The `ClassDecl` node, when one exists in the program.
  pub decl: Cell<Option<NodeRef<'a>>>,
}

impl<'a> ObjectDef<'a> {
  #[must_use] pub fn find(&self, kind: MemberKind, name: Symbol) -> Option<&'a Member<'a>> {
    self.members.get().iter().find(|m| m.kind == kind && m.name == name)
  }

  /// Every constructor overload.
  pub fn ctors(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
    self.members.get().iter()
      .filter(|m| m.kind == MemberKind::Ctor)
      .flat_map(|m| m.decls.iter().copied())
  }
}

impl fmt::Debug for ObjectDef<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ObjectDef").field("name", &self.name).finish_non_exhaustive()
  }
}

/// A type parameter. The constraint cell is the one place the rewriter
/// mutates the type graph in place; recursive constraints are cut off by the
/// rewriter's in-flight id stack keyed on [`ParamId`].
pub struct TypeParam<'a> {
  pub id: ParamId,
  pub name: Symbol,
  pub constraint: Cell<Option<Ty<'a>>>,
}

impl fmt::Debug for TypeParam<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TypeParam")
      .field("id", &self.id)
      .field("name", &self.name)
      .finish_non_exhaustive()
  }
}

#[derive(Debug)]
pub struct EnumDef<'a> {
  pub name: Symbol,
  /// Int-backed enums convert through `int` at the boxed boundary.
  pub int_backed: bool,
  pub decl: Cell<Option<NodeRef<'a>>>,
}

impl fmt::Display for TyKind<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TyKind::Primitive(k) => f.write_str(k.name()),
      TyKind::Object(o) => {
        f.write_str(o.def.name.as_str())?;
        if !o.args.is_empty() {
          f.write_str("<")?;
          for (i, a) in o.args.iter().enumerate() {
            if i != 0 { f.write_str(",")? }
            a.fmt(f)?;
          }
          f.write_str(">")?;
        }
        Ok(())
      }
      TyKind::Array(e) => write!(f, "{e}[]"),
      TyKind::ResizableArray(e) => write!(f, "Array<{e}>"),
      TyKind::Tuple(es) => {
        f.write_str("[")?;
        for (i, e) in es.iter().enumerate() {
          if i != 0 { f.write_str(",")? }
          e.fmt(f)?;
        }
        f.write_str("]")
      }
      TyKind::Union(es) => {
        for (i, e) in es.iter().enumerate() {
          if i != 0 { f.write_str("|")? }
          e.fmt(f)?;
        }
        Ok(())
      }
      TyKind::Param(p) => f.write_str(p.name.as_str()),
      TyKind::Enum(e) => f.write_str(e.name.as_str()),
      TyKind::String => f.write_str("String"),
      TyKind::Null => f.write_str("null"),
      TyKind::Undefined => f.write_str("undefined"),
      TyKind::Any => f.write_str("Any"),
      TyKind::Never => f.write_str("never"),
    }
  }
}
