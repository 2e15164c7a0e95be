use crate::{
	apply::apply,
	diff::diff,
	event::{EventNode, Message},
	host::Host,
	index::resolve_targets,
	load::load_node,
	node::Node,
	render::render,
};
use core::fmt::{self, Debug, Formatter};
use tracing::{info, instrument, trace_span};

/// Keeps a live tree in sync with a sequence of [`Node`] trees.
///
/// # Correct Use
///
/// Each [`update`](`Reconciler::update`) diffs against the tree of the previous one,
/// so the live tree must not be changed structurally from outside in the meantime.
/// Event handlers may call [`update`](`Reconciler::update`) only indirectly, through a message queue or similar,
/// as the [`Reconciler`] is borrowed mutably while it runs.
pub struct Reconciler<H: Host> {
	host: H,
	root: H::Node,
	tree: Node<H>,
	event_node: EventNode,
}
impl<H: Host> Reconciler<H> {
	/// Renders `tree` and appends it to `parent`.
	///
	/// Messages from event handlers in `tree` arrive at `dispatch`.
	#[instrument(skip(host, tree, dispatch))]
	pub fn mount(host: H, parent: &H::Node, tree: Node<H>, dispatch: impl Fn(Message) + 'static) -> Self {
		let event_node = EventNode::root(dispatch);
		let root = render(&host, &tree, &event_node);
		host.append_child(parent, &root);
		Self {
			host,
			root,
			tree,
			event_node,
		}
	}

	/// Takes over `existing` content, for example server-rendered markup.
	///
	/// The first [`update`](`Reconciler::update`) patches it towards the given tree and attaches event listeners.
	#[instrument(skip(host, dispatch))]
	pub fn hydrate(host: H, existing: H::Node, dispatch: impl Fn(Message) + 'static) -> Self {
		let tree = load_node(&host, &existing);
		Self {
			host,
			root: existing,
			tree,
			event_node: EventNode::root(dispatch),
		}
	}

	/// Patches the live tree to match `tree`.
	#[instrument(skip(self, tree))]
	pub fn update(&mut self, tree: Node<H>) {
		let mut patches = diff(&self.tree, &tree);
		info!("Applying {} top-level patch(es).", patches.len());
		if !patches.is_empty() {
			{
				let span = trace_span!("Resolving targets");
				let _enter = span.enter();
				resolve_targets(&self.host, &self.root, &self.tree, &mut patches, &self.event_node);
			}
			self.root = apply(&self.host, &self.root, patches);
		}
		self.tree = tree;
	}

	/// The current live root. Changes when the root is redrawn.
	#[must_use]
	pub fn root(&self) -> &H::Node {
		&self.root
	}

	/// The tree the live root currently reflects.
	#[must_use]
	pub fn tree(&self) -> &Node<H> {
		&self.tree
	}

	#[must_use]
	pub fn host(&self) -> &H {
		&self.host
	}
}
impl<H: Host> Debug for Reconciler<H> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Reconciler")
			.field("root", &self.root)
			.field("tree", &self.tree)
			.finish_non_exhaustive()
	}
}
