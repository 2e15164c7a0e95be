//! Applies resolved [`Patch`]es to the live tree.

use crate::{
	event::EventNode,
	facts::apply_facts,
	host::Host,
	node::Node,
	patch::{Entry, EntryId, EntryState, Insert, Patch, PatchKind, Placement, Reorder},
	render::render,
};
use core::mem;
use tracing::{error, instrument, trace, trace_span};

/// Applies `patches` in order and returns the (possibly replaced) root.
///
/// # Panics
///
/// Iff the patch list is malformed, that is if a patch wasn't resolved by [`resolve_targets`](`crate::index::resolve_targets`)
/// or doesn't make sense where it appears.
#[instrument(skip(host, patches))]
pub fn apply<H: Host>(host: &H, root: &H::Node, patches: Vec<Patch<H>>) -> H::Node {
	apply_help(host, root.clone(), patches, None)
}

fn apply_help<H: Host>(host: &H, mut root: H::Node, patches: Vec<Patch<H>>, mut entries: Option<&mut Vec<Entry<H>>>) -> H::Node {
	for patch in patches {
		let Patch {
			index,
			kind,
			target,
			event_node,
		} = patch;
		let (target, event_node) = match (target, event_node) {
			(Some(target), Some(event_node)) => (target, event_node),
			_ => panic!("xylem-dom bug: Patch at index {} was never resolved to a live node.", index),
		};

		let span = trace_span!("Applying patch", index);
		let _enter = span.enter();

		let replacement = apply_patch(host, &target, index, kind, &event_node, entries.as_deref_mut());
		if target == root {
			root = replacement;
		}
	}
	root
}

fn apply_patch<H: Host>(host: &H, target: &H::Node, index: usize, kind: PatchKind<H>, event_node: &EventNode, entries: Option<&mut Vec<Entry<H>>>) -> H::Node {
	match kind {
		PatchKind::Redraw(node) => redraw(host, target, &node, event_node),
		PatchKind::Thunk(sub_patches) => apply_help(host, target.clone(), sub_patches, None),
		PatchKind::Tagger(taggers) => {
			// Resolved to the chain's own event node, which isn't always the one stashed on `target`.
			event_node.retag(taggers);
			target.clone()
		}
		PatchKind::Text(text) => {
			host.set_text_content(target, &text);
			target.clone()
		}
		PatchKind::Facts(diff) => {
			apply_facts(host, target, event_node, &diff);
			target.clone()
		}
		PatchKind::RemoveLast { len, count } => {
			trace!(len, count, "Removing trailing children.");
			for _ in 0..count {
				match host.child_node(target, len) {
					Some(child) => {
						host.remove_child(target, &child);
						host.release(&child);
					}
					None => {
						error!("Expected a child at position {} of {:?}, but found none. Was the tree modified externally?", len, target);
						break;
					}
				}
			}
			target.clone()
		}
		PatchKind::Append { len, children } => {
			trace!(from = len, count = children.len(), "Appending children.");
			let fragment = host.create_fragment();
			for child in &children {
				host.append_child(&fragment, &render(host, child, event_node));
			}
			host.append_child(target, &fragment);
			target.clone()
		}
		PatchKind::Reorder(reorder) => apply_reorder(host, target, reorder, event_node),
		PatchKind::Remove(id) => match entries {
			Some(entries) => apply_remove(host, target, id, entries),
			None => panic!("xylem-dom bug: Unknown patch kind at index {}: A keyed removal outside of a keyed reorder.", index),
		},
		PatchKind::Custom(patch) => {
			let replacement = patch(host, target);
			if replacement != *target {
				if let (None, Some(stashed)) = (host.stashed_event_node(&replacement), host.stashed_event_node(target)) {
					host.stash_event_node(&replacement, stashed);
				}
				if let Some(parent) = host.parent_node(target) {
					host.replace_child(&parent, &replacement, target);
				}
				host.release(target);
			}
			replacement
		}
	}
}

fn redraw<H: Host>(host: &H, target: &H::Node, node: &Node<H>, event_node: &EventNode) -> H::Node {
	let replacement = render(host, node, event_node);
	// `target` sat below tagger chains that a lazy node hides from this patch. Those now end at `event_node`.
	if host.stashed_event_node(&replacement).is_none() && host.stashed_event_node(target).is_some() {
		host.stash_event_node(&replacement, event_node.clone());
	}
	if let Some(parent) = host.parent_node(target) {
		host.replace_child(&parent, &replacement, target);
	}
	host.release(target);
	replacement
}

/// Moved children are taken out first, then everything else is patched, then insertions happen front to back.
fn apply_reorder<H: Host>(host: &H, target: &H::Node, reorder: Reorder<H>, event_node: &EventNode) -> H::Node {
	let Reorder {
		patches,
		inserts,
		end_inserts,
		mut entries,
	} = reorder;
	let span = trace_span!("Reordering keyed children", patches = patches.len(), inserts = inserts.len(), end_inserts = end_inserts.len());
	let _enter = span.enter();

	let fragment = if end_inserts.is_empty() {
		None
	} else {
		let fragment = host.create_fragment();
		for id in end_inserts {
			host.append_child(&fragment, &materialize(host, &entries, id, event_node));
		}
		Some(fragment)
	};

	let target = apply_help(host, target.clone(), patches, Some(&mut entries));

	for Insert { index, entry } in inserts {
		let live = materialize(host, &entries, entry, event_node);
		host.insert_before(&target, &live, host.child_node(&target, index).as_ref());
	}

	if let Some(fragment) = fragment {
		host.append_child(&target, &fragment);
	}
	target
}

fn get_entry<H: Host>(entries: &[Entry<H>], id: EntryId) -> &Entry<H> {
	entries
		.get(id.0)
		.unwrap_or_else(|| panic!("xylem-dom bug: Keyed entry {:?} doesn't exist.", id))
}

/// The live node for an insertion: The moved one, or a fresh rendering.
fn materialize<H: Host>(host: &H, entries: &[Entry<H>], id: EntryId, event_node: &EventNode) -> H::Node {
	let entry = get_entry(entries, id);
	match entry.state {
		EntryState::PendingInsert => render(host, &entry.node, event_node),
		EntryState::Reconciled => entry
			.live
			.clone()
			.unwrap_or_else(|| panic!("xylem-dom bug: Moved keyed entry {:?} has no live node.", id)),
		EntryState::PendingRemove => panic!("xylem-dom bug: Tried to insert keyed entry {:?}, which is only being removed.", id),
	}
}

fn apply_remove<H: Host>(host: &H, target: &H::Node, id: EntryId, entries: &mut [Entry<H>]) -> H::Node {
	let entry = entries
		.get_mut(id.0)
		.unwrap_or_else(|| panic!("xylem-dom bug: Keyed entry {:?} doesn't exist.", id));
	match entry.state {
		EntryState::PendingRemove => {
			trace!(?id, "Removing keyed child.");
			detach(host, target);
			host.release(target);
			target.clone()
		}
		EntryState::Reconciled => {
			trace!(?id, placement = ?entry.placement, "Moving keyed child.");
			// End insertions were already moved into a fragment.
			if let Some(Placement::At(_)) = entry.placement {
				detach(host, target);
			}
			let live = apply_help(host, target.clone(), mem::take(&mut entry.sub_patches), None);
			entry.live = Some(live.clone());
			live
		}
		EntryState::PendingInsert => panic!("xylem-dom bug: Tried to remove keyed entry {:?}, which is only being inserted.", id),
	}
}

fn detach<H: Host>(host: &H, node: &H::Node) {
	match host.parent_node(node) {
		Some(parent) => host.remove_child(&parent, node),
		None => error!("Expected {:?} to have a parent, but it has none. Was the tree modified externally?", node),
	}
}
