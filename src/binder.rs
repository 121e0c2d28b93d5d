//! The name-binder facade: rebuilding a function's mangled name after its
//! signature changed, and binding freshly synthesized subtrees into the
//! tree (parent back-links plus a resolution sanity check).

use crate::intern;
use crate::types::ast::{NodeKind, NodeRef, each_child};

/// Recompute the mangled symbol of a function from its base name and current
/// signature. Called by the declaration normalizer whenever it rewrites a
/// parameter or return type.
pub fn build_function_name(f: NodeRef<'_>) {
  let NodeKind::Function(sf) = &f.kind else {
    panic!("build_function_name: not a function: {:?}", f.kind)
  };
  let mut s = String::from(sf.base_name.as_str());
  s.push(':');
  for (i, p) in sf.sig.params.iter().enumerate() {
    if i != 0 { s.push(';') }
    s.push_str(&p.ty.get().to_string());
  }
  if let Some(rest) = sf.sig.rest {
    if !sf.sig.params.is_empty() { s.push(';') }
    s.push_str("...");
    s.push_str(&rest.ty.get().to_string());
  }
  s.push('=');
  s.push_str(&sf.sig.ret.get().to_string());
  sf.name.set(intern(&s));
}

/// Bind a freshly synthesized (or freshly spliced) subtree: fix every parent
/// back-link below `node` and assert that every identifier in it resolved.
/// Re-binding an already-bound subtree is harmless.
pub fn bind_lowered_node(node: NodeRef<'_>) {
  each_child(node, &mut |child| {
    child.parent.set(Some(node));
    bind_lowered_node(child);
  });
  if let NodeKind::Ident(id) = &node.kind {
    assert!(id.var.get().is_some(), "binder: unresolved identifier `{}`", id.name);
  }
}
