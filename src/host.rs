//! The render-target surface the reconciler depends on.
//!
//! Everything the engine does to live nodes goes through [`Host`].
//! [`DomHost`](`crate::web::DomHost`) implements it over [`web_sys`], [`MemoryDom`](`crate::memory::MemoryDom`) in memory.

use crate::{
	event::{EventNode, Listener},
	facts::Value,
};
use core::fmt::Debug;
use std::rc::Rc;

/// A mutable render target, modelled after the DOM.
///
/// All methods take `&self`: Hosts are expected to use interior mutability, just like the browser's document does.
///
/// Methods that can fail on a real host (for example because a node was moved by third-party code) should log and carry on.
/// The reconciler never inspects the outcome of a mutation.
pub trait Host: 'static {
	/// A handle to a live node. Equality must be identity.
	type Node: Clone + PartialEq + Debug + 'static;

	fn create_element(&self, tag: &str, namespace: Option<&str>) -> Self::Node;
	fn create_text_node(&self, text: &str) -> Self::Node;
	/// Creates a detached container whose children move into the parent when it is appended or inserted.
	fn create_fragment(&self) -> Self::Node;

	fn append_child(&self, parent: &Self::Node, child: &Self::Node);
	/// Inserts `child` before `reference`, or appends it if `reference` is [`None`].
	fn insert_before(&self, parent: &Self::Node, child: &Self::Node, reference: Option<&Self::Node>);
	fn replace_child(&self, parent: &Self::Node, new_child: &Self::Node, old_child: &Self::Node);
	fn remove_child(&self, parent: &Self::Node, child: &Self::Node);

	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node>;
	fn child_node(&self, parent: &Self::Node, index: usize) -> Option<Self::Node>;
	fn child_count(&self, parent: &Self::Node) -> usize;

	fn set_text_content(&self, node: &Self::Node, text: &str);

	fn set_property(&self, node: &Self::Node, name: &str, value: &Value);
	/// Reads a property back. Only used for `value` and `checked`, which user interaction can change behind the reconciler's back.
	fn property(&self, node: &Self::Node, name: &str) -> Option<Value>;

	fn set_attribute(&self, node: &Self::Node, name: &str, value: &str);
	fn remove_attribute(&self, node: &Self::Node, name: &str);
	fn set_attribute_ns(&self, node: &Self::Node, namespace: &str, name: &str, value: &str);
	fn remove_attribute_ns(&self, node: &Self::Node, namespace: &str, name: &str);

	/// Sets an inline style. An empty `value` clears it.
	fn set_style(&self, node: &Self::Node, name: &str, value: &str);

	/// Registers `listener` as the only listener for `name` on `node`.
	fn add_event_listener(&self, node: &Self::Node, name: &str, listener: Rc<Listener>, passive: bool);
	fn event_listener(&self, node: &Self::Node, name: &str) -> Option<Rc<Listener>>;
	fn remove_event_listener(&self, node: &Self::Node, name: &str);

	/// Remembers the event node of the innermost tagger chain `node` was rendered under.
	fn stash_event_node(&self, node: &Self::Node, event_node: EventNode);
	fn stashed_event_node(&self, node: &Self::Node) -> Option<EventNode>;

	/// Called once the reconciler dropped `node` and its subtree for good, after detaching it.
	///
	/// Hosts should let go of the listeners and event nodes kept for the subtree. Its structure must stay as it is.
	fn release(&self, node: &Self::Node);

	/// A read-only view of `node`, used to load existing content.
	fn inspect(&self, node: &Self::Node) -> Inspection;
}

/// What [`Host::inspect`] sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inspection {
	Text(String),
	Element {
		tag: String,
		/// [`None`] for plain HTML elements.
		namespace: Option<String>,
		attributes: Vec<(String, String)>,
	},
	/// Comments, processing instructions and the like.
	Other,
}
