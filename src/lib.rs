//! The unboxing lowering pass.
//!
//! Earlier phases of the compiler produce a typed AST in which, for
//! uniformity, many expressions and declarations carry boxed primitive types
//! (`Int`, `Double`, ...) even where the underlying primitive (`int`,
//! `double`, ...) could and should be used. This crate rewrites the program so
//! that boxed primitive types are replaced by their primitives wherever
//! possible, and box/unbox/conversion calls are spliced in at the boundaries
//! where the primitive and reference worlds meet.
//!
//! The pass is organized as a stack of small components, leaves first:
//! * [`normalize`]: type predicates and the recursive type rewriter;
//! * [`declare`]: the memoized declaration normalizer;
//! * [`synth`]: the conversion synthesizer, which builds the
//!   `x.unboxed()` / `new Int(x)` / `Int.toDouble(x)` call trees;
//! * [`adjust`]: the `adjust_type` decision table gluing the two;
//! * [`visit`]: the postorder AST visitor covering every node kind that can
//!   bridge the boxed/primitive boundary;
//! * [`driver`]: the top-level orchestrator.
//!
//! All inputs are assumed well typed; any inconsistency found mid-pass is a
//! compiler bug and panics. The pass emits no diagnostics and has no
//! recoverable failure modes.

use std::cell::{Cell, RefCell};
use std::sync::{LazyLock, Mutex};

use bit_set::BitSet;
use bumpalo::Bump;
use typed_arena::Arena;

pub mod types;
pub mod checker;
pub mod binder;
pub mod normalize;
pub mod declare;
pub mod synth;
pub mod adjust;
pub mod visit;
pub mod driver;
#[cfg(test)] mod testutil;

use types::NodeId;
use types::ast::{AstNode, NodeRef, Signature, Variable};
use checker::Checker;

/// An interned string. Symbols are cheap to copy and compare and are used for
/// every name in the AST: variables, methods, classes, properties.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Symbol(u32);

#[derive(Default)]
struct Interner {
  names: Vec<&'static str>,
  map: hashbrown::HashMap<&'static str, Symbol>,
}

static INTERNER: LazyLock<Mutex<Interner>> = LazyLock::new(Default::default);

/// Intern a string, returning the canonical [`Symbol`] for it.
pub fn intern(s: &str) -> Symbol {
  let mut i = INTERNER.lock().expect("interner poisoned");
  if let Some(&sym) = i.map.get(s) { return sym }
  let s: &'static str = Box::leak(s.to_owned().into_boxed_str());
  let sym = Symbol(u32::try_from(i.names.len()).expect("interner overflow"));
  i.names.push(s);
  i.map.insert(s, sym);
  sym
}

impl Symbol {
  /// The string this symbol was interned from.
  #[must_use] pub fn as_str(self) -> &'static str {
    INTERNER.lock().expect("interner poisoned").names[self.0 as usize]
  }
}

impl std::fmt::Debug for Symbol {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    self.as_str().fmt(f)
  }
}
impl std::fmt::Display for Symbol {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    self.as_str().fmt(f)
  }
}

/// Well-known names used by the synthesizer and the special cases.
pub mod sym {
  use super::{Symbol, intern};
  /// The instance method every boxed wrapper provides to read the primitive back.
  pub fn unboxed() -> Symbol { intern("unboxed") }
  /// The wrapper method whose boxed return type survives normalization.
  pub fn value_of() -> Symbol { intern("valueOf") }
  /// `array.length` has type `int` on fixed arrays.
  pub fn length() -> Symbol { intern("length") }
  /// The `char -> String` widening fallback target.
  pub fn to_string() -> Symbol { intern("toString") }
  /// Constructor member name.
  pub fn ctor() -> Symbol { intern("constructor") }
}

/// The allocation arenas owning every AST node, variable, signature and type
/// for one compilation. Nodes are handed out as `&'a` references and shared
/// by identity; nothing is freed while the pass runs.
pub struct Arenas<'a> {
  nodes: Arena<AstNode<'a>>,
  vars: Arena<Variable<'a>>,
  sigs: Arena<Signature<'a>>,
  /// Types and all interior slices (tuple elements, argument lists, member
  /// tables) live here. Type nodes are immutable by convention and compared
  /// by reference identity where the pass wants sharing.
  pub bump: Bump,
  next_node: Cell<u32>,
}

impl Default for Arenas<'_> {
  fn default() -> Self {
    Arenas {
      nodes: Arena::new(),
      vars: Arena::new(),
      sigs: Arena::new(),
      bump: Bump::new(),
      next_node: Cell::new(0),
    }
  }
}

impl<'a> Arenas<'a> {
  pub(crate) fn next_node_id(&self) -> NodeId {
    let id = self.next_node.get();
    self.next_node.set(id.checked_add(1).expect("node id overflow"));
    NodeId(id)
  }

  /// The number of nodes allocated so far; an upper bound for dense
  /// [`NodeId`]-keyed sets.
  #[must_use] pub fn node_count(&self) -> usize { self.next_node.get() as usize }
}

/// The explicit pass context threaded through every helper: the arenas, the
/// type checker oracle, and the `handled` memo of declaration nodes already
/// processed by the declaration normalizer. There is no global state.
pub struct PassCtx<'a> {
  pub arenas: &'a Arenas<'a>,
  pub checker: Checker<'a>,
  /// Declarations already normalized, keyed by dense node id.
  pub handled: RefCell<BitSet>,
}

impl<'a> PassCtx<'a> {
  #[must_use] pub fn new(arenas: &'a Arenas<'a>) -> Self {
    PassCtx {
      arenas,
      checker: Checker::new(arenas),
      handled: RefCell::new(BitSet::new()),
    }
  }

  /// Mark `node` handled. Returns `false` if it already was.
  pub(crate) fn mark_handled(&self, node: NodeRef<'a>) -> bool {
    self.handled.borrow_mut().insert(node.id.into_usize())
  }
}
