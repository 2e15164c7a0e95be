//! Computes the [`Patch`]es that turn one [`Node`] tree into another.
//!
//! Patches are emitted in pre-order of the *old* tree, which is what [`resolve_targets`](`crate::index::resolve_targets`) relies on.

use crate::{
	event::{taggers_eq, thin_ptr_eq},
	facts::{diff_facts, Facts},
	host::Host,
	keyed::diff_keyed_children,
	node::{Element, Node, Vnode},
	patch::{Patch, PatchKind},
};
use std::rc::Rc;
use tracing::{field, info, instrument, trace, trace_span};

/// Diffs `old` against `new`.
///
/// Subtrees that are the same [`Node`] in both trees are skipped without being visited.
/// Unrelated trees don't fail, they just redraw.
#[must_use]
#[instrument(skip(old, new))]
pub fn diff<H: Host>(old: &Node<H>, new: &Node<H>) -> Vec<Patch<H>> {
	let mut patches = Vec::new();
	diff_help(old, new, &mut patches, 0);
	info!("Diffed into {} top-level patch(es).", patches.len());
	patches
}

pub(crate) fn diff_help<H: Host>(old: &Node<H>, new: &Node<H>, patches: &mut Vec<Patch<H>>, index: usize) {
	if Node::ptr_eq(old, new) {
		return;
	}

	let span = trace_span!("Diffing node", index = field::Empty);
	if cfg!(feature = "log-paths") {
		span.record("index", &index);
	}
	let _enter = span.enter();

	match (&**old, &**new) {
		(Vnode::Keyed(old_keyed), Vnode::Element(_)) => diff_help(&Node::dekey(old_keyed), new, patches, index),
		(Vnode::Element(_), Vnode::Keyed(new_keyed)) => diff_help(old, &Node::dekey(new_keyed), patches, index),

		(Vnode::Thunk(old_thunk), Vnode::Thunk(new_thunk)) => {
			let old_child = old_thunk.force();
			if old_thunk.same_args(new_thunk) && new_thunk.adopt(old_child) {
				return trace!("Thunk arguments unchanged.");
			}

			let mut sub_patches = Vec::new();
			diff_help(old_child, new_thunk.force(), &mut sub_patches, 0);
			if !sub_patches.is_empty() {
				patches.push(Patch::new(index, PatchKind::Thunk(sub_patches)));
			}
		}

		(Vnode::Tagger(old_tagger), Vnode::Tagger(new_tagger)) => {
			let (old_taggers, old_child) = old_tagger.collapse();
			let (new_taggers, new_child) = new_tagger.collapse();
			if old_taggers.len() != new_taggers.len() {
				trace!(old = old_taggers.len(), new = new_taggers.len(), "Tagger chain length changed.");
				return redraw(new, patches, index);
			}
			if !taggers_eq(&old_taggers, &new_taggers) {
				patches.push(Patch::new(index, PatchKind::Tagger(new_taggers)));
			}
			diff_help(old_child, new_child, patches, index + 1);
		}

		(Vnode::Text(old_text), Vnode::Text(new_text)) => {
			if old_text != new_text {
				if cfg!(feature = "dangerous-logging") {
					trace!(old = old_text.as_str(), new = new_text.as_str(), "Text changed.");
				}
				patches.push(Patch::new(index, PatchKind::Text(new_text.clone())));
			}
		}

		(Vnode::Element(old_element), Vnode::Element(new_element)) => {
			if old_element.tag != new_element.tag || old_element.namespace != new_element.namespace {
				return redraw(new, patches, index);
			}
			push_facts_diff(&old_element.facts, &new_element.facts, patches, index);
			diff_children(old_element, new_element, patches, index);
		}

		(Vnode::Keyed(old_keyed), Vnode::Keyed(new_keyed)) => {
			if old_keyed.tag != new_keyed.tag || old_keyed.namespace != new_keyed.namespace {
				return redraw(new, patches, index);
			}
			push_facts_diff(&old_keyed.facts, &new_keyed.facts, patches, index);
			diff_keyed_children(old_keyed, new_keyed, patches, index);
		}

		(Vnode::Custom(old_custom), Vnode::Custom(new_custom)) => {
			if !thin_ptr_eq(Rc::as_ptr(&old_custom.widget), Rc::as_ptr(&new_custom.widget)) {
				trace!("Widget changed.");
				return redraw(new, patches, index);
			}
			push_facts_diff(&old_custom.facts, &new_custom.facts, patches, index);
			if let Some(patch) = new_custom.widget.diff(&*old_custom.model, &*new_custom.model) {
				patches.push(Patch::new(index, PatchKind::Custom(patch)));
			}
		}

		_ => redraw(new, patches, index),
	}
}

fn redraw<H: Host>(new: &Node<H>, patches: &mut Vec<Patch<H>>, index: usize) {
	trace!("Redrawing subtree.");
	patches.push(Patch::new(index, PatchKind::Redraw(new.clone())));
}

fn push_facts_diff<H: Host>(old: &Rc<Facts>, new: &Rc<Facts>, patches: &mut Vec<Patch<H>>, index: usize) {
	if Rc::ptr_eq(old, new) {
		return;
	}
	if let Some(diff) = diff_facts(old, new) {
		patches.push(Patch::new(index, PatchKind::Facts(diff)));
	}
}

/// Positional children. Length differences are settled at the end of the list first.
fn diff_children<H: Host>(old: &Element<H>, new: &Element<H>, patches: &mut Vec<Patch<H>>, mut index: usize) {
	let (old_len, new_len) = (old.children.len(), new.children.len());
	if old_len > new_len {
		patches.push(Patch::new(
			index,
			PatchKind::RemoveLast {
				len: new_len,
				count: old_len - new_len,
			},
		));
	} else if old_len < new_len {
		patches.push(Patch::new(
			index,
			PatchKind::Append {
				len: old_len,
				children: new.children[old_len..].to_vec(),
			},
		));
	}

	for (old_child, new_child) in old.children.iter().zip(&new.children) {
		index += 1;
		diff_help(old_child, new_child, patches, index);
		index += old_child.descendants();
	}
}
