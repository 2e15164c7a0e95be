//! Resolves patch indices to live nodes.
//!
//! This walks the live tree and the old [`Node`] tree together, but only descends into subtrees whose
//! index range contains a pending patch. Descendant counts make that range known without looking inside.

use crate::{
	event::EventNode,
	host::Host,
	node::{Node, Vnode},
	patch::{Entry, Patch, PatchKind, Reorder},
};
use tracing::{error, instrument, trace_span};

/// Fills in the live target and event node of each of `patches`, which must come straight from
/// [`diff`](`crate::diff::diff`) with `old` as the old tree.
///
/// `root` must be the live node `old` was rendered (or patched) to, and `event_node` the one it was rendered under.
#[instrument(skip(host, old, patches, event_node))]
pub fn resolve_targets<H: Host>(host: &H, root: &H::Node, old: &Node<H>, patches: &mut [Patch<H>], event_node: &EventNode) {
	if patches.is_empty() {
		return;
	}
	let resolved = resolve_help(host, root, old, patches, 0, 0, old.descendants(), event_node, None);
	if resolved < patches.len() {
		error!(
			"xylem-dom bug: Only {} of {} patches could be resolved. The live tree doesn't match the old tree.",
			resolved,
			patches.len()
		);
	}
}

/// Resolves the patches from `i` on that fall into `low..=high`, which is the index range of `vnode`.
///
/// Returns the index of the first patch that wasn't resolved.
#[allow(clippy::too_many_arguments)]
fn resolve_help<H: Host>(
	host: &H,
	live: &H::Node,
	vnode: &Node<H>,
	patches: &mut [Patch<H>],
	mut i: usize,
	low: usize,
	high: usize,
	event_node: &EventNode,
	mut entries: Option<&mut Vec<Entry<H>>>,
) -> usize {
	let mut index = match patches.get(i) {
		Some(patch) => patch.index,
		None => return i,
	};

	let own_event_node = match &**vnode {
		Vnode::Tagger(_) => Some(tagger_event_node(host, live, vnode, event_node)),
		_ => None,
	};

	while index == low {
		let patch = &mut patches[i];
		patch.target = Some(live.clone());
		patch.event_node = Some(match (&patch.kind, &own_event_node) {
			(PatchKind::Tagger(_), Some(own)) => own.clone(),
			_ => event_node.clone(),
		});

		match &mut patch.kind {
			PatchKind::Thunk(sub_patches) => match &**vnode {
				Vnode::Thunk(thunk) => resolve_targets(host, live, thunk.force(), sub_patches, event_node),
				_ => error!("xylem-dom bug: Thunk patch at index {} doesn't target a thunk.", index),
			},
			PatchKind::Reorder(Reorder {
				patches: sub_patches,
				entries: own_entries,
				..
			}) => {
				if !sub_patches.is_empty() {
					resolve_help(host, live, vnode, sub_patches, 0, low, high, event_node, Some(own_entries));
				}
			}
			PatchKind::Remove(id) => match entries.as_deref_mut().and_then(|entries| entries.get_mut(id.0)) {
				Some(entry) => {
					entry.live = Some(live.clone());
					if !entry.sub_patches.is_empty() {
						resolve_help(host, live, vnode, &mut entry.sub_patches, 0, low, high, event_node, None);
					}
				}
				None => error!("xylem-dom bug: Keyed removal at index {} has no matching entry.", index),
			},
			_ => (),
		}

		i += 1;
		match patches.get(i) {
			Some(patch) if patch.index <= high => index = patch.index,
			_ => return i,
		}
	}

	match &**vnode {
		Vnode::Tagger(tagger) => {
			let (_, child) = tagger.collapse();
			let own = own_event_node.as_ref().unwrap_or(event_node);
			resolve_help(host, live, child, patches, i, low + 1, high, own, entries)
		}
		Vnode::Element(element) => resolve_children(host, live, element.children.iter(), patches, i, low, high, event_node, entries),
		Vnode::Keyed(keyed) => resolve_children(
			host,
			live,
			keyed.children.iter().map(|(_, child)| child),
			patches,
			i,
			low,
			high,
			event_node,
			entries,
		),
		Vnode::Text(_) | Vnode::Thunk(_) | Vnode::Custom(_) => i,
	}
}

/// How many tagger chains render straight to the same live node as `vnode`, counting its own.
fn chains_at<H: Host>(vnode: &Node<H>) -> usize {
	match &**vnode {
		Vnode::Thunk(thunk) => chains_at(thunk.force()),
		Vnode::Tagger(tagger) => 1 + chains_at(tagger.collapse().1),
		_ => 0,
	}
}

/// The event node the tagger chain `vnode` rendered to `live`.
///
/// Only the innermost chain's event node is stashed on `live`. Outer ones are found among its ancestors.
fn tagger_event_node<H: Host>(host: &H, live: &H::Node, vnode: &Node<H>, event_node: &EventNode) -> EventNode {
	let own = host
		.stashed_event_node(live)
		.and_then(|stashed| stashed.ancestor(chains_at(vnode).saturating_sub(1)));
	own.unwrap_or_else(|| {
		error!(
			"xylem-dom bug: No event node stashed for the tagger chain rendered to {:?}. Its listeners won't be tagged.",
			live
		);
		EventNode::tagged(Vec::new(), event_node.clone())
	})
}

#[allow(clippy::too_many_arguments)]
fn resolve_children<'a, H: Host>(
	host: &H,
	live: &H::Node,
	children: impl Iterator<Item = &'a Node<H>>,
	patches: &mut [Patch<H>],
	mut i: usize,
	mut low: usize,
	high: usize,
	event_node: &EventNode,
	mut entries: Option<&mut Vec<Entry<H>>>,
) -> usize {
	let mut index = match patches.get(i) {
		Some(patch) => patch.index,
		None => return i,
	};

	for (j, child) in children.enumerate() {
		low += 1;
		let next_low = low + child.descendants();
		if low <= index && index <= next_low {
			let span = trace_span!("Resolving child", j);
			let _enter = span.enter();

			let live_child = match host.child_node(live, j) {
				Some(live_child) => live_child,
				None => {
					error!("Expected a live child at position {} of {:?}, but found none. Was the tree modified externally?", j, live);
					return i;
				}
			};
			i = resolve_help(host, &live_child, child, patches, i, low, next_low, event_node, entries.as_deref_mut());
			match patches.get(i) {
				Some(patch) if patch.index <= high => index = patch.index,
				_ => return i,
			}
		}
		low = next_low;
	}
	i
}
