//! Diffing of keyed children.
//!
//! Both lists are walked in step, looking at most one child ahead on either side.
//! That catches single insertions, removals and swaps cheaply; anything more tangled falls through to the tail,
//! where keys that show up on both sides are still matched up through the scratch map and moved instead of recreated.

use crate::{
	diff::diff_help,
	host::Host,
	node::{Key, KeyedElement, Node},
	patch::{Entry, EntryId, EntryState, Insert, Patch, PatchKind, Placement, Reorder},
};
use hashbrown::HashMap;
use tracing::{level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};

/// Appended to a key that was already used on the same side. Not a valid key on its own by convention.
const DUPLICATE_SUFFIX: &str = "\u{1f}duplicate";

pub(crate) fn diff_keyed_children<H: Host>(old: &KeyedElement<H>, new: &KeyedElement<H>, patches: &mut Vec<Patch<H>>, root_index: usize) {
	let span = trace_span!("Diffing keyed children", old = old.children.len(), new = new.children.len());
	let _enter = span.enter();

	let old_children = &old.children;
	let new_children = &new.children;
	let mut diff = KeyedDiff::new();

	let (mut x, mut y) = (0, 0);
	let mut index = root_index;

	while x < old_children.len() && y < new_children.len() {
		let (x_key, x_node) = &old_children[x];
		let (y_key, y_node) = &new_children[y];

		if x_key == y_key {
			index += 1;
			diff_help(x_node, y_node, &mut diff.patches, index);
			index += x_node.descendants();
			x += 1;
			y += 1;
			continue;
		}

		let x_next = old_children.get(x + 1);
		let y_next = new_children.get(y + 1);
		// `y` is where `x` would be next.
		let old_match = x_next.map_or(false, |(x_next_key, _)| y_key == x_next_key);
		// `x` is where `y` would be next.
		let new_match = y_next.map_or(false, |(y_next_key, _)| x_key == y_next_key);

		match (x_next, y_next) {
			(Some((_, x_next_node)), Some((_, y_next_node))) if old_match && new_match => {
				trace!("Swap.");
				index += 1;
				diff.remove(x_key, x_node, index);
				index += x_node.descendants();

				index += 1;
				diff_help(x_next_node, y_node, &mut diff.patches, index);
				index += x_next_node.descendants();

				diff.insert(x_key, y_next_node, Placement::At(y + 1));
				x += 2;
				y += 2;
			}
			(_, Some((_, y_next_node))) if new_match => {
				trace!("Insertion.");
				index += 1;
				diff.insert(y_key, y_node, Placement::At(y));
				diff_help(x_node, y_next_node, &mut diff.patches, index);
				index += x_node.descendants();
				x += 1;
				y += 2;
			}
			(Some((_, x_next_node)), _) if old_match => {
				trace!("Removal.");
				index += 1;
				diff.remove(x_key, x_node, index);
				index += x_node.descendants();

				index += 1;
				diff_help(x_next_node, y_node, &mut diff.patches, index);
				index += x_next_node.descendants();
				x += 2;
				y += 1;
			}
			(Some((x_next_key, x_next_node)), Some((y_next_key, y_next_node))) if x_next_key == y_next_key => {
				trace!("Replacement.");
				index += 1;
				diff.remove(x_key, x_node, index);
				diff.insert(y_key, y_node, Placement::At(y));
				index += x_node.descendants();

				index += 1;
				diff_help(x_next_node, y_next_node, &mut diff.patches, index);
				index += x_next_node.descendants();
				x += 2;
				y += 2;
			}
			_ => break,
		}
	}

	for (key, node) in &old_children[x..] {
		index += 1;
		diff.remove(key, node, index);
		index += node.descendants();
	}

	for (key, node) in &new_children[y..] {
		diff.insert(key, node, Placement::End);
	}

	let reorder = diff.finish();
	if !reorder.is_empty() {
		patches.push(Patch::new(root_index, PatchKind::Reorder(reorder)));
	}
}

/// Bookkeeping of one keyed diff. The key map doesn't outlive it.
struct KeyedDiff<H: Host> {
	patches: Vec<Patch<H>>,
	inserts: Vec<Insert>,
	end_inserts: Vec<EntryId>,
	entries: Vec<Entry<H>>,
	keys: HashMap<Key, EntryId>,
}
impl<H: Host> KeyedDiff<H> {
	fn new() -> Self {
		Self {
			patches: Vec::new(),
			inserts: Vec::new(),
			end_inserts: Vec::new(),
			entries: Vec::new(),
			keys: HashMap::new(),
		}
	}

	fn finish(self) -> Reorder<H> {
		Reorder {
			patches: self.patches,
			inserts: self.inserts,
			end_inserts: self.end_inserts,
			entries: self.entries,
		}
	}

	fn lookup(&self, key: &Key) -> Option<(EntryId, EntryState, Option<usize>)> {
		self.keys.get(key).map(|&id| {
			let entry = &self.entries[id.0];
			(id, entry.state, entry.old_index)
		})
	}

	fn push_entry(&mut self, key: Key, entry: Entry<H>) -> EntryId {
		let id = EntryId(self.entries.len());
		self.entries.push(entry);
		self.keys.insert(key, id);
		id
	}

	fn place(&mut self, id: EntryId, placement: Placement) {
		match placement {
			Placement::At(index) => self.inserts.push(Insert { index, entry: id }),
			Placement::End => self.end_inserts.push(id),
		}
	}

	/// `node` appears in the new list without a positional match in the old one.
	fn insert(&mut self, key: &Key, node: &Node<H>, placement: Placement) {
		match self.lookup(key) {
			None => {
				let id = self.push_entry(
					key.clone(),
					Entry {
						state: EntryState::PendingInsert,
						node: node.clone(),
						old_index: None,
						placement: Some(placement),
						sub_patches: Vec::new(),
						live: None,
					},
				);
				self.place(id, placement);
			}
			Some((id, EntryState::PendingRemove, Some(old_index))) => {
				trace!(key = &**key, "Moving keyed child.");
				let mut sub_patches = Vec::new();
				diff_help(&self.entries[id.0].node, node, &mut sub_patches, old_index);

				let entry = &mut self.entries[id.0];
				entry.state = EntryState::Reconciled;
				entry.placement = Some(placement);
				entry.sub_patches = sub_patches;
				self.place(id, placement);
			}
			Some(_) => {
				warn_duplicate(key);
				self.insert(&mangle(key), node, placement);
			}
		}
	}

	/// `node` at `index` of the old tree has no positional match in the new list.
	fn remove(&mut self, key: &Key, node: &Node<H>, index: usize) {
		match self.lookup(key) {
			None => {
				let id = self.push_entry(
					key.clone(),
					Entry {
						state: EntryState::PendingRemove,
						node: node.clone(),
						old_index: Some(index),
						placement: None,
						sub_patches: Vec::new(),
						live: None,
					},
				);
				self.patches.push(Patch::new(index, PatchKind::Remove(id)));
			}
			Some((id, EntryState::PendingInsert, _)) => {
				trace!(key = &**key, "Moving keyed child.");
				let mut sub_patches = Vec::new();
				diff_help(node, &self.entries[id.0].node, &mut sub_patches, index);

				let entry = &mut self.entries[id.0];
				entry.state = EntryState::Reconciled;
				entry.old_index = Some(index);
				entry.sub_patches = sub_patches;
				self.patches.push(Patch::new(index, PatchKind::Remove(id)));
			}
			Some(_) => {
				warn_duplicate(key);
				self.remove(&mangle(key), node, index);
			}
		}
	}
}

fn mangle(key: &Key) -> Key {
	format!("{}{}", key, DUPLICATE_SUFFIX).into()
}

fn warn_duplicate(key: &Key) {
	if STATIC_MAX_LEVEL >= Level::WARN {
		warn!(
			"Duplicate key {:?} among keyed children.\n\
			Children with this key are matched up by order of appearance and may be recreated or reused unexpectedly.",
			key
		);
	}
}
