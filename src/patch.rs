//! Index-addressed edit instructions, as produced by [`diff`](`crate::diff::diff`).

use crate::{
	event::{EventNode, Taggers},
	facts::FactsDiff,
	host::Host,
	node::Node,
};
use core::fmt::{self, Debug, Formatter};

/// A widget's own patch. Receives the live node and returns its (possibly new) replacement.
pub type CustomPatch<H> = Box<dyn FnOnce(&H, &<H as Host>::Node) -> <H as Host>::Node>;

/// A single edit, addressed by the pre-order index of its target in the *old* tree.
///
/// The live target and the event node are filled in by [`resolve_targets`](`crate::index::resolve_targets`).
pub struct Patch<H: Host> {
	pub index: usize,
	pub kind: PatchKind<H>,
	pub(crate) target: Option<H::Node>,
	pub(crate) event_node: Option<EventNode>,
}
impl<H: Host> Patch<H> {
	#[must_use]
	pub fn new(index: usize, kind: PatchKind<H>) -> Self {
		Self {
			index,
			kind,
			target: None,
			event_node: None,
		}
	}

	/// The live node this patch applies to, once resolved.
	#[must_use]
	pub fn target(&self) -> Option<&H::Node> {
		self.target.as_ref()
	}

	#[must_use]
	pub fn event_node(&self) -> Option<&EventNode> {
		self.event_node.as_ref()
	}
}

pub enum PatchKind<H: Host> {
	/// Replace the whole subtree with a fresh rendering.
	Redraw(Node<H>),
	/// Patches for a thunk's subtree, indexed from 0 at the thunk's child.
	Thunk(Vec<Patch<H>>),
	/// The collapsed taggers changed, but not necessarily what's below them.
	Tagger(Taggers),
	Text(String),
	Facts(FactsDiff),
	/// Remove `count` children, starting at child `len`.
	RemoveLast { len: usize, count: usize },
	/// Append `children` after the first `len` children.
	Append { len: usize, children: Vec<Node<H>> },
	Reorder(Reorder<H>),
	/// Remove or move a keyed child. Only valid within a [`Reorder`].
	Remove(EntryId),
	Custom(CustomPatch<H>),
}

/// All changes to the children of a keyed element.
pub struct Reorder<H: Host> {
	/// Ordinary patches of children, including [`PatchKind::Remove`].
	pub patches: Vec<Patch<H>>,
	/// In ascending order of `index`.
	pub inserts: Vec<Insert>,
	/// Appended after all other children.
	pub end_inserts: Vec<EntryId>,
	pub entries: Vec<Entry<H>>,
}
impl<H: Host> Reorder<H> {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.patches.is_empty() && self.inserts.is_empty() && self.end_inserts.is_empty()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insert {
	/// The child index in the new list.
	pub index: usize,
	pub entry: EntryId,
}

/// An index into [`Reorder::entries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
	/// The key only appeared in the new list so far. Rendered fresh unless a removal turns up.
	PendingInsert,
	/// The key only appeared in the old list so far. Removed from the host unless an insertion turns up.
	PendingRemove,
	/// The key appeared in both lists out of order. Its live node is moved and patched.
	Reconciled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
	At(usize),
	End,
}

/// The bookkeeping for one key of a keyed diff.
pub struct Entry<H: Host> {
	pub state: EntryState,
	/// The node the key was first seen with: The new one for insertions, the old one for removals.
	pub node: Node<H>,
	/// Where the old node was, once a removal was recorded.
	pub old_index: Option<usize>,
	pub placement: Option<Placement>,
	/// Patches turning the old node into the new one, for [`EntryState::Reconciled`] entries.
	pub sub_patches: Vec<Patch<H>>,
	pub(crate) live: Option<H::Node>,
}
impl<H: Host> Entry<H> {
	#[must_use]
	pub fn live(&self) -> Option<&H::Node> {
		self.live.as_ref()
	}
}

impl<H: Host> Debug for Patch<H> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Patch")
			.field("index", &self.index)
			.field("kind", &self.kind)
			.field("target", &self.target)
			.finish()
	}
}
impl<H: Host> Debug for PatchKind<H> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Redraw(node) => f.debug_tuple("Redraw").field(node).finish(),
			Self::Thunk(patches) => f.debug_tuple("Thunk").field(patches).finish(),
			Self::Tagger(taggers) => f.debug_tuple("Tagger").field(&taggers.len()).finish(),
			Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Self::Facts(diff) => f.debug_tuple("Facts").field(diff).finish(),
			Self::RemoveLast { len, count } => f.debug_struct("RemoveLast").field("len", len).field("count", count).finish(),
			Self::Append { len, children } => f.debug_struct("Append").field("len", len).field("children", children).finish(),
			Self::Reorder(reorder) => f.debug_tuple("Reorder").field(reorder).finish(),
			Self::Remove(entry) => f.debug_tuple("Remove").field(entry).finish(),
			Self::Custom(_) => f.write_str("Custom"),
		}
	}
}
impl<H: Host> Debug for Reorder<H> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Reorder")
			.field("patches", &self.patches)
			.field("inserts", &self.inserts)
			.field("end_inserts", &self.end_inserts)
			.field("entries", &self.entries)
			.finish()
	}
}
impl<H: Host> Debug for Entry<H> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Entry")
			.field("state", &self.state)
			.field("old_index", &self.old_index)
			.field("placement", &self.placement)
			.field("sub_patches", &self.sub_patches)
			.finish()
	}
}
