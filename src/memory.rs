//! An in-memory [`Host`], for headless rendering and for tests.
//!
//! [`MemoryNode`]s behave like a small subset of the DOM: Inserting a node moves it out of its previous parent,
//! and inserting a fragment moves the fragment's children instead.

use crate::{
	event::{EventNode, Listener, Propagation},
	facts::Value,
	host::{Host, Inspection},
};
use core::{
	any::Any,
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter, Write},
};
use std::{
	collections::BTreeMap,
	rc::{Rc, Weak},
};
use tracing::{error, trace, trace_span};

/// The in-memory host. Counts the elements and text nodes it creates.
#[derive(Debug, Default)]
pub struct MemoryDom {
	created: Cell<usize>,
}

/// A live in-memory node. Compares by identity.
#[derive(Clone)]
pub struct MemoryNode(Rc<RefCell<Data>>);

struct Data {
	kind: Kind,
	parent: Weak<RefCell<Data>>,
	children: Vec<MemoryNode>,
	listeners: BTreeMap<String, (Rc<Listener>, bool)>,
	event_node: Option<EventNode>,
}

enum Kind {
	Element(ElementData),
	Text(String),
	Fragment,
}

#[derive(Default)]
struct ElementData {
	tag: String,
	namespace: Option<String>,
	attributes: BTreeMap<String, String>,
	namespaced: BTreeMap<(String, String), String>,
	properties: BTreeMap<String, Value>,
	styles: BTreeMap<String, String>,
}

impl MemoryNode {
	fn new(kind: Kind) -> Self {
		Self(Rc::new(RefCell::new(Data {
			kind,
			parent: Weak::new(),
			children: Vec::new(),
			listeners: BTreeMap::new(),
			event_node: None,
		})))
	}

	fn is_fragment(&self) -> bool {
		matches!(self.0.borrow().kind, Kind::Fragment)
	}

	fn parent(&self) -> Option<Self> {
		self.0.borrow().parent.upgrade().map(Self)
	}

	fn position_in(&self, parent: &Self) -> Option<usize> {
		parent.0.borrow().children.iter().position(|child| child == self)
	}

	fn detach(&self) {
		if let Some(parent) = self.parent() {
			if let Some(position) = self.position_in(&parent) {
				parent.0.borrow_mut().children.remove(position);
			}
			self.0.borrow_mut().parent = Weak::new();
		}
	}

	fn element<T>(&self, f: impl FnOnce(&ElementData) -> T) -> Option<T> {
		match &self.0.borrow().kind {
			Kind::Element(element) => Some(f(element)),
			Kind::Text(_) | Kind::Fragment => None,
		}
	}

	fn element_mut(&self, f: impl FnOnce(&mut ElementData)) {
		match &mut self.0.borrow_mut().kind {
			Kind::Element(element) => f(element),
			Kind::Text(_) | Kind::Fragment => error!("Expected an element, found {:?}.", self),
		}
	}

	/// The tag name, for elements.
	#[must_use]
	pub fn tag(&self) -> Option<String> {
		self.element(|element| element.tag.clone())
	}

	/// The content, for text nodes.
	#[must_use]
	pub fn text(&self) -> Option<String> {
		match &self.0.borrow().kind {
			Kind::Text(text) => Some(text.clone()),
			Kind::Element(_) | Kind::Fragment => None,
		}
	}

	#[must_use]
	pub fn children(&self) -> Vec<MemoryNode> {
		self.0.borrow().children.clone()
	}

	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<String> {
		self.element(|element| element.attributes.get(name).cloned()).flatten()
	}

	#[must_use]
	pub fn attribute_ns(&self, namespace: &str, name: &str) -> Option<String> {
		self.element(|element| element.namespaced.get(&(namespace.to_owned(), name.to_owned())).cloned())
			.flatten()
	}

	#[must_use]
	pub fn style(&self, name: &str) -> Option<String> {
		self.element(|element| element.styles.get(name).cloned()).flatten()
	}

	/// Names of the registered event listeners, in order.
	#[must_use]
	pub fn listener_names(&self) -> Vec<String> {
		self.0.borrow().listeners.keys().cloned().collect()
	}

	#[must_use]
	pub fn is_passive(&self, name: &str) -> Option<bool> {
		self.0.borrow().listeners.get(name).map(|&(_, passive)| passive)
	}
}
impl PartialEq for MemoryNode {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}
impl Eq for MemoryNode {}
impl Debug for MemoryNode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let address = Rc::as_ptr(&self.0);
		match self.0.try_borrow().as_deref().map(|data| &data.kind) {
			Ok(Kind::Element(element)) => write!(f, "MemoryNode(<{}> @ {:p})", element.tag, address),
			Ok(Kind::Text(_)) => write!(f, "MemoryNode(#text @ {:p})", address),
			Ok(Kind::Fragment) => write!(f, "MemoryNode(#fragment @ {:p})", address),
			Err(_) => write!(f, "MemoryNode(@ {:p})", address),
		}
	}
}

impl MemoryDom {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// How many elements and text nodes were created so far. Fragments aren't counted.
	#[must_use]
	pub fn created(&self) -> usize {
		self.created.get()
	}

	fn count(&self, node: MemoryNode) -> MemoryNode {
		self.created.set(self.created.get() + 1);
		node
	}

	/// Fires `name` at `target` and bubbles it up to the root, or until a listener stops it.
	///
	/// The returned [`Propagation`] says whether the event was stopped and whether any listener prevented its default action.
	pub fn dispatch_event(&self, target: &MemoryNode, name: &str, event: &dyn Any) -> Propagation {
		let span = trace_span!("Dispatching event", name, ?target);
		let _enter = span.enter();

		let mut outcome = Propagation::default();
		let mut current = Some(target.clone());
		while let Some(node) = current {
			// Cloned out so that handlers may mutate the tree.
			let listener = node.0.borrow().listeners.get(name).map(|(listener, _)| Rc::clone(listener));
			if let Some(listener) = listener {
				let propagation = listener.handle(event);
				outcome.prevent_default |= propagation.prevent_default;
				if propagation.stop_propagation {
					trace!("Propagation stopped.");
					outcome.stop_propagation = true;
					break;
				}
			}
			current = node.parent();
		}
		outcome
	}

	/// Serialises `node` as HTML, with a few extensions so that all observable state shows up:
	///
	/// - Attributes, namespaced attributes (as `{namespace}name`) and properties (as `.name`) appear in name order.
	/// - Styles are merged into one `style` attribute.
	/// - Event listeners appear as value-less `@name` attributes.
	#[must_use]
	pub fn to_html(&self, node: &MemoryNode) -> String {
		let mut html = String::new();
		write_html(&mut html, node);
		html
	}
}

fn escape(text: &str) -> String {
	text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn write_html(html: &mut String, node: &MemoryNode) {
	let data = node.0.borrow();
	let element = match &data.kind {
		Kind::Text(text) => return html.push_str(&escape(text)),
		Kind::Fragment => {
			for child in &data.children {
				write_html(html, child);
			}
			return;
		}
		Kind::Element(element) => element,
	};

	// Writing into a `String` can't fail.
	let _ = write!(html, "<{}", element.tag);
	if let Some(namespace) = &element.namespace {
		let _ = write!(html, " xmlns=\"{}\"", escape(namespace));
	}
	for (name, value) in &element.attributes {
		let _ = write!(html, " {}=\"{}\"", name, escape(value));
	}
	for ((namespace, name), value) in &element.namespaced {
		let _ = write!(html, " {{{}}}{}=\"{}\"", namespace, name, escape(value));
	}
	if !element.styles.is_empty() {
		let styles: Vec<String> = element.styles.iter().map(|(name, value)| format!("{}: {};", name, value)).collect();
		let _ = write!(html, " style=\"{}\"", escape(&styles.join(" ")));
	}
	for (name, value) in &element.properties {
		let _ = write!(html, " .{}=\"{}\"", name, escape(&value.to_string()));
	}
	for name in data.listeners.keys() {
		let _ = write!(html, " @{}", name);
	}
	html.push('>');
	for child in &data.children {
		write_html(html, child);
	}
	let _ = write!(html, "</{}>", element.tag);
}

impl Host for MemoryDom {
	type Node = MemoryNode;

	fn create_element(&self, tag: &str, namespace: Option<&str>) -> Self::Node {
		self.count(MemoryNode::new(Kind::Element(ElementData {
			tag: tag.to_owned(),
			namespace: namespace.map(ToOwned::to_owned),
			..ElementData::default()
		})))
	}

	fn create_text_node(&self, text: &str) -> Self::Node {
		self.count(MemoryNode::new(Kind::Text(text.to_owned())))
	}

	fn create_fragment(&self) -> Self::Node {
		MemoryNode::new(Kind::Fragment)
	}

	fn append_child(&self, parent: &Self::Node, child: &Self::Node) {
		self.insert_before(parent, child, None)
	}

	fn insert_before(&self, parent: &Self::Node, child: &Self::Node, reference: Option<&Self::Node>) {
		if child == parent || reference == Some(child) {
			return error!("Tried to insert {:?} into or before itself.", child);
		}

		if child.is_fragment() {
			for grandchild in child.children() {
				self.insert_before(parent, &grandchild, reference);
			}
			return;
		}

		child.detach();
		let position = match reference {
			None => None,
			Some(reference) => match reference.position_in(parent) {
				Some(position) => Some(position),
				None => {
					error!("{:?} is not a child of {:?}. Appending instead.", reference, parent);
					None
				}
			},
		};
		{
			let mut parent_data = parent.0.borrow_mut();
			match position {
				Some(position) => parent_data.children.insert(position, child.clone()),
				None => parent_data.children.push(child.clone()),
			}
		}
		child.0.borrow_mut().parent = Rc::downgrade(&parent.0);
	}

	fn replace_child(&self, parent: &Self::Node, new_child: &Self::Node, old_child: &Self::Node) {
		if new_child == old_child {
			return;
		}
		if old_child.position_in(parent).is_none() {
			return error!("{:?} is not a child of {:?}.", old_child, parent);
		}
		self.insert_before(parent, new_child, Some(old_child));
		self.remove_child(parent, old_child);
	}

	fn remove_child(&self, parent: &Self::Node, child: &Self::Node) {
		match child.position_in(parent) {
			Some(position) => {
				parent.0.borrow_mut().children.remove(position);
				child.0.borrow_mut().parent = Weak::new();
			}
			None => error!("{:?} is not a child of {:?}.", child, parent),
		}
	}

	fn parent_node(&self, node: &Self::Node) -> Option<Self::Node> {
		node.parent()
	}

	fn child_node(&self, parent: &Self::Node, index: usize) -> Option<Self::Node> {
		parent.0.borrow().children.get(index).cloned()
	}

	fn child_count(&self, parent: &Self::Node) -> usize {
		parent.0.borrow().children.len()
	}

	fn set_text_content(&self, node: &Self::Node, text: &str) {
		if let Kind::Text(content) = &mut node.0.borrow_mut().kind {
			return *content = text.to_owned();
		}
		for child in node.children() {
			self.remove_child(node, &child);
		}
		if !text.is_empty() {
			self.append_child(node, &self.create_text_node(text));
		}
	}

	fn set_property(&self, node: &Self::Node, name: &str, value: &Value) {
		node.element_mut(|element| match value {
			Value::Null => {
				element.properties.remove(name);
			}
			Value::String(string) if string.is_empty() => {
				element.properties.remove(name);
			}
			value => {
				element.properties.insert(name.to_owned(), value.clone());
			}
		})
	}

	fn property(&self, node: &Self::Node, name: &str) -> Option<Value> {
		node.element(|element| element.properties.get(name).cloned()).flatten()
	}

	fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) {
		node.element_mut(|element| {
			element.attributes.insert(name.to_owned(), value.to_owned());
		})
	}

	fn remove_attribute(&self, node: &Self::Node, name: &str) {
		node.element_mut(|element| {
			element.attributes.remove(name);
		})
	}

	fn set_attribute_ns(&self, node: &Self::Node, namespace: &str, name: &str, value: &str) {
		node.element_mut(|element| {
			element.namespaced.insert((namespace.to_owned(), name.to_owned()), value.to_owned());
		})
	}

	fn remove_attribute_ns(&self, node: &Self::Node, namespace: &str, name: &str) {
		node.element_mut(|element| {
			element.namespaced.remove(&(namespace.to_owned(), name.to_owned()));
		})
	}

	fn set_style(&self, node: &Self::Node, name: &str, value: &str) {
		node.element_mut(|element| {
			if value.is_empty() {
				element.styles.remove(name);
			} else {
				element.styles.insert(name.to_owned(), value.to_owned());
			}
		})
	}

	fn add_event_listener(&self, node: &Self::Node, name: &str, listener: Rc<Listener>, passive: bool) {
		node.0.borrow_mut().listeners.insert(name.to_owned(), (listener, passive));
	}

	fn event_listener(&self, node: &Self::Node, name: &str) -> Option<Rc<Listener>> {
		node.0.borrow().listeners.get(name).map(|(listener, _)| Rc::clone(listener))
	}

	fn remove_event_listener(&self, node: &Self::Node, name: &str) {
		node.0.borrow_mut().listeners.remove(name);
	}

	fn stash_event_node(&self, node: &Self::Node, event_node: EventNode) {
		node.0.borrow_mut().event_node = Some(event_node);
	}

	fn stashed_event_node(&self, node: &Self::Node) -> Option<EventNode> {
		node.0.borrow().event_node.clone()
	}

	fn release(&self, node: &Self::Node) {
		trace!(?node, "Releasing.");
		let children = {
			let mut data = node.0.borrow_mut();
			data.listeners.clear();
			data.event_node = None;
			data.children.clone()
		};
		for child in &children {
			self.release(child);
		}
	}

	fn inspect(&self, node: &Self::Node) -> Inspection {
		match &node.0.borrow().kind {
			Kind::Text(text) => Inspection::Text(text.clone()),
			Kind::Element(element) => Inspection::Element {
				tag: element.tag.clone(),
				namespace: element.namespace.clone(),
				attributes: element.attributes.iter().map(|(name, value)| (name.clone(), value.clone())).collect(),
			},
			Kind::Fragment => Inspection::Other,
		}
	}
}
