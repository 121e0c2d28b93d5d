//! The type-checker facade the pass consults as an oracle: global types,
//! pointwise box/unbox of leaf types, the type relations, type constructors
//! (including the union canonicalizer), the apparent-type cache, and the
//! `recheck` entry point that yields an expression's current type.
//!
//! The pass assumes its input is well typed, so none of these operations can
//! fail recoverably; structural surprises are compiler bugs and panic.

use std::cell::RefCell;
use std::ptr;

use hashbrown::HashMap;
use itertools::Itertools;

use crate::{Arenas, intern};
use crate::types::PrimKind;
use crate::types::ast::{NodeKind, NodeRef, NumValue, Signature};
use crate::types::builtins::{self, Globals};
use crate::types::ty::{ObjectDef, ObjectType, Ty, TyKind};

pub struct Checker<'a> {
  pub arenas: &'a Arenas<'a>,
  pub globals: Globals<'a>,
  /// Apparent types resolved so far, keyed by type node address. Cleared by
  /// the driver when the pass finishes.
  apparent: RefCell<HashMap<usize, Ty<'a>>>,
}

impl<'a> Checker<'a> {
  #[must_use] pub fn new(arenas: &'a Arenas<'a>) -> Self {
    Checker {
      arenas,
      globals: builtins::install(arenas),
      apparent: RefCell::new(HashMap::new()),
    }
  }

  #[must_use] pub fn prim(&self, k: PrimKind) -> Ty<'a> { self.globals.prim(k) }
  #[must_use] pub fn wrapper(&self, k: PrimKind) -> &'a ObjectDef<'a> { self.globals.wrapper(k) }
  #[must_use] pub fn wrapper_ty(&self, k: PrimKind) -> Ty<'a> { self.globals.wrapper_ty(k) }
  #[must_use] pub fn string(&self) -> Ty<'a> { self.globals.string }
  #[must_use] pub fn null(&self) -> Ty<'a> { self.globals.null }
  #[must_use] pub fn undefined(&self) -> Ty<'a> { self.globals.undefined }
  #[must_use] pub fn any(&self) -> Ty<'a> { self.globals.any }
  #[must_use] pub fn never(&self) -> Ty<'a> { self.globals.never }

  /// Box a primitive leaf type; identity on everything else.
  #[must_use] pub fn maybe_box_type(&self, t: Ty<'a>) -> Ty<'a> {
    match t.prim() {
      Some(k) => self.wrapper_ty(k),
      None => t,
    }
  }

  /// Unbox a boxed-primitive leaf type; identity on everything else.
  #[must_use] pub fn maybe_unbox_type(&self, t: Ty<'a>) -> Ty<'a> {
    match t.boxed_prim() {
      Some(k) => self.prim(k),
      None => t,
    }
  }

  /// The primitive kind tag used by the widening switch, or `None` when `t`
  /// is not a primitive.
  #[must_use] pub fn ets_type(&self, t: Ty<'a>) -> Option<PrimKind> { t.prim() }

  /// Structural type identity. Reference equality is a fast path, not the
  /// definition: distinct arena nodes spelling the same type are identical.
  #[must_use] pub fn is_identical_to(&self, a: Ty<'a>, b: Ty<'a>) -> bool {
    if ptr::eq(a, b) { return true }
    match (a, b) {
      (TyKind::Primitive(x), TyKind::Primitive(y)) => x == y,
      (TyKind::Object(x), TyKind::Object(y)) =>
        ptr::eq(x.def, y.def)
          && x.args.len() == y.args.len()
          && x.args.iter().zip_eq(y.args).all(|(&p, &q)| self.is_identical_to(p, q)),
      (&TyKind::Array(x), &TyKind::Array(y))
      | (&TyKind::ResizableArray(x), &TyKind::ResizableArray(y)) => self.is_identical_to(x, y),
      (TyKind::Tuple(x), TyKind::Tuple(y)) =>
        x.len() == y.len() && x.iter().zip_eq(y.iter()).all(|(&p, &q)| self.is_identical_to(p, q)),
      (TyKind::Union(x), TyKind::Union(y)) =>
        x.iter().all(|&p| y.iter().any(|&q| self.is_identical_to(p, q)))
          && y.iter().all(|&q| x.iter().any(|&p| self.is_identical_to(p, q))),
      (TyKind::Param(x), TyKind::Param(y)) => x.id == y.id,
      (TyKind::Enum(x), TyKind::Enum(y)) => ptr::eq(*x, *y),
      (TyKind::String, TyKind::String)
      | (TyKind::Null, TyKind::Null)
      | (TyKind::Undefined, TyKind::Undefined)
      | (TyKind::Any, TyKind::Any)
      | (TyKind::Never, TyKind::Never) => true,
      _ => false,
    }
  }

  /// Is `sup` a supertype of (or identical to) `sub`?
  #[must_use] pub fn is_supertype_of(&self, sup: Ty<'a>, sub: Ty<'a>) -> bool {
    if self.is_identical_to(sup, sub) { return true }
    if matches!(sub, TyKind::Never) { return true }
    match sup {
      TyKind::Any => true,
      // The root reference type covers the whole reference world.
      TyKind::Object(o) if ptr::eq(o.def, self.globals.object_def) => sub.is_reference(),
      TyKind::Union(parts) => match sub {
        TyKind::Union(sparts) => sparts.iter().all(|&s| self.is_supertype_of(sup, s)),
        _ => parts.iter().any(|&p| self.is_supertype_of(p, sub)),
      },
      _ => false,
    }
  }

  #[must_use] pub fn create_array_type(&self, elem: Ty<'a>) -> Ty<'a> {
    self.arenas.ty(TyKind::Array(elem))
  }

  #[must_use] pub fn create_resizable_array_type(&self, elem: Ty<'a>) -> Ty<'a> {
    self.arenas.ty(TyKind::ResizableArray(elem))
  }

  /// The union canonicalizer: flattens nested unions, drops `never`, dedupes
  /// identical constituents, and collapses degenerate results. An empty
  /// union is `never`; a union swallowed by `Any` is `Any`.
  #[must_use] pub fn create_union_type(&self, parts: &[Ty<'a>]) -> Ty<'a> {
    let mut flat: Vec<Ty<'a>> = Vec::with_capacity(parts.len());
    self.flatten_union(parts, &mut flat);
    if flat.iter().any(|t| matches!(t, TyKind::Any)) { return self.any() }
    match flat.len() {
      0 => self.never(),
      1 => flat[0],
      _ => self.arenas.ty(TyKind::Union(self.arenas.ty_list(flat))),
    }
  }

  fn flatten_union(&self, parts: &[Ty<'a>], out: &mut Vec<Ty<'a>>) {
    for &p in parts {
      match p {
        TyKind::Union(inner) => self.flatten_union(inner, out),
        TyKind::Never => {}
        _ => {
          if !out.iter().any(|&q| self.is_identical_to(p, q)) { out.push(p) }
        }
      }
    }
  }

  /// Reinstantiate `obj`'s definition at new type arguments. Member tables
  /// are shared with the definition.
  #[must_use] pub fn substitute_arguments(&self, obj: &ObjectType<'a>, args: &'a [Ty<'a>]) -> Ty<'a> {
    self.arenas.ty(TyKind::Object(ObjectType { def: obj.def, args }))
  }

  /// The apparent type: a type parameter stands for its constraint's
  /// apparent type (or `Any` when unconstrained); everything else is itself.
  #[must_use] pub fn get_apparent_type(&self, t: Ty<'a>) -> Ty<'a> {
    let TyKind::Param(p) = t else { return t };
    let key = ptr::from_ref(t) as usize;
    if let Some(&cached) = self.apparent.borrow().get(&key) { return cached }
    let apparent = match p.constraint.get() {
      Some(c) => self.get_apparent_type(c),
      None => self.any(),
    };
    self.apparent.borrow_mut().insert(key, apparent);
    apparent
  }

  pub fn clear_apparent_cache(&self) { self.apparent.borrow_mut().clear() }

  /// Strip `null` and `undefined` from a union; the nullish leaves
  /// themselves become `never`.
  #[must_use] pub fn get_non_nullish_type(&self, t: Ty<'a>) -> Ty<'a> {
    match t {
      TyKind::Union(parts) => {
        let rest: Vec<Ty<'a>> = parts.iter().copied().filter(|p| !p.is_nullish()).collect();
        self.create_union_type(&rest)
      }
      TyKind::Null | TyKind::Undefined => self.never(),
      _ => t,
    }
  }

  /// The constructor signature for `new Array(d1, ..., dn)` and the
  /// multi-dimensional array-new form.
  #[must_use] pub fn create_builtin_array_signature(
    &self, array_ty: Ty<'a>, rank: usize,
  ) -> &'a Signature<'a> {
    let int = self.prim(PrimKind::Int);
    let params: Vec<_> = (0..rank).map(|i| (intern(&format!("d{i}")), int)).collect();
    self.arenas.sig(&params, None, array_ty, false)
  }

  /// The current type of an expression node. The visitor keeps computed
  /// types up to date, so this is usually a cache read; untyped literals and
  /// uses fall back to their natural type.
  #[must_use] pub fn recheck(&self, node: NodeRef<'a>) -> Ty<'a> {
    if let Some(t) = node.ty.get() { return t }
    match &node.kind {
      NodeKind::Number(NumValue::Int(_)) => self.prim(PrimKind::Int),
      NodeKind::Number(NumValue::Float(_)) => self.prim(PrimKind::Double),
      NodeKind::Bool(_) => self.prim(PrimKind::Bool),
      NodeKind::Char(_) => self.prim(PrimKind::Char),
      NodeKind::Str(_) => self.string(),
      NodeKind::Null => self.null(),
      NodeKind::Undefined => self.undefined(),
      NodeKind::Ident(id) => {
        let var = id.var.get().expect("recheck: unbound identifier");
        var.ty.get().expect("recheck: untyped variable")
      }
      NodeKind::Call(c) => c.sig.get().expect("recheck: unresolved call").ret.get(),
      NodeKind::New(n) => n.class.get(),
      k => panic!("recheck: untyped node: {k:?}"),
    }
  }

  /// Is a conversion between these (possibly boxed) types legal? Used as a
  /// sanity guard by the `as`-expression handler.
  #[must_use] pub fn is_legal_boxed_conversion(&self, target: Ty<'a>, source: Ty<'a>) -> bool {
    // A boxed source may convert into a union that carries an unboxable
    // constituent for it.
    if let (TyKind::Union(parts), TyKind::Object(_)) = (target, source) {
      let src_unboxed = self.maybe_unbox_type(source);
      let Some(sk) = src_unboxed.prim() else { return false };
      let Some(boxed_target) = parts.iter().find(|p| p.boxed_prim().is_some()) else {
        return false;
      };
      let tk = boxed_target.boxed_prim().expect("just matched");
      return prim_assignable(sk, tk) || self.is_supertype_of(target, source);
    }

    // Otherwise both sides must be object-like (int-backed enums count as
    // objects here), and at least one must be a boxed primitive.
    if !matches!(target, TyKind::Object(_)) { return false }
    if !matches!(source, TyKind::Object(_) | TyKind::Enum(_)) { return false }
    if target.boxed_prim().is_none() && source.boxed_prim().is_none() { return false }

    let target_unboxed = self.maybe_unbox_type(target);
    // Int-backed enums convert through `int`.
    let source_unboxed = if matches!(source, TyKind::Enum(e) if e.int_backed) {
      self.prim(PrimKind::Int)
    } else {
      self.maybe_unbox_type(source)
    };
    match (source_unboxed.prim(), target_unboxed.prim()) {
      (Some(s), Some(t)) => prim_assignable(s, t),
      _ => false,
    }
  }
}

/// Primitive assignability: identity, or a widening between numeric kinds
/// (`char` widens into the numeric chain).
fn prim_assignable(from: PrimKind, to: PrimKind) -> bool {
  if from == to { return true }
  let from_rank = match from {
    PrimKind::Char => PrimKind::Int.numeric_rank(),
    k => k.numeric_rank(),
  };
  match (from_rank, to.numeric_rank()) {
    (Some(f), Some(t)) => f <= t,
    _ => false,
  }
}

#[cfg(test)]
mod tests {
  use crate::{Arenas, PassCtx};
  use crate::types::PrimKind;

  #[test]
  fn boxed_conversion_into_a_union_uses_its_unboxable_constituent() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let ck = &ctx.checker;
    let boxed_int = ck.wrapper_ty(PrimKind::Int);

    let same = ck.create_union_type(&[boxed_int, ck.null()]);
    assert!(ck.is_legal_boxed_conversion(same, boxed_int));
    // A wider constituent still admits the narrower source.
    let wide = ck.create_union_type(&[ck.wrapper_ty(PrimKind::Long), ck.null()]);
    assert!(ck.is_legal_boxed_conversion(wide, boxed_int));
    // No unboxable constituent at all, or only a narrower one, refuses.
    let strings = ck.create_union_type(&[ck.string(), ck.null()]);
    assert!(!ck.is_legal_boxed_conversion(strings, boxed_int));
    let narrow = ck.create_union_type(&[ck.wrapper_ty(PrimKind::Byte), ck.null()]);
    assert!(!ck.is_legal_boxed_conversion(narrow, boxed_int));
  }

  #[test]
  fn object_conversions_require_a_boxed_side_and_widen_only() {
    let arenas = Arenas::default();
    let ctx = PassCtx::new(&arenas);
    let ck = &ctx.checker;
    let boxed_int = ck.wrapper_ty(PrimKind::Int);
    let boxed_long = ck.wrapper_ty(PrimKind::Long);

    assert!(ck.is_legal_boxed_conversion(boxed_long, boxed_int));
    assert!(!ck.is_legal_boxed_conversion(boxed_int, boxed_long), "no silent narrowing");
    assert!(!ck.is_legal_boxed_conversion(ck.globals.object, ck.globals.object),
      "neither side boxed");
    assert!(!ck.is_legal_boxed_conversion(ck.string(), boxed_int), "target must be an object");
  }
}
