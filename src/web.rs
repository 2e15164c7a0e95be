//! The browser [`Host`], over [`web_sys`].
//!
//! Failing DOM calls are logged and skipped. Only node creation throws into JavaScript, since there's nothing to continue with.

use crate::{
	closure_map::{Binding, ClosureMap},
	event::{EventNode, Listener},
	facts::Value,
	host::{Host, Inspection},
};
use core::cell::RefCell;
use js_sys::Reflect;
use std::rc::Rc;
use tracing::{error, instrument, trace};
use wasm_bindgen::{closure::Closure, JsCast, JsValue, UnwrapThrowExt};
use web_sys::{AddEventListenerOptions, CssStyleDeclaration, Document, Element, Node};

const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Renders into a [`Document`].
///
/// Listener closures live until their node is removed for good, or until the [`DomHost`] is dropped.
/// Events fired at nodes of a dropped host throw into JavaScript.
pub struct DomHost {
	document: Document,
	closures: RefCell<ClosureMap>,
}
impl DomHost {
	#[must_use]
	pub fn new(document: Document) -> Self {
		Self {
			document,
			closures: RefCell::default(),
		}
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}

	fn element<'a>(node: &'a Node, operation: &str) -> Option<&'a Element> {
		let element = node.dyn_ref::<Element>();
		if element.is_none() {
			error!("Expected an element to {}, found {:?}.", operation, node);
		}
		element
	}
}

fn log_failure(operation: &str, result: Result<impl Sized, JsValue>) {
	if let Err(error) = result {
		error!("Failed to {}: {:?}", operation, error);
	}
}

fn to_js(value: &Value) -> JsValue {
	match value {
		Value::Null => JsValue::NULL,
		Value::Bool(value) => JsValue::from_bool(*value),
		Value::Number(value) => JsValue::from_f64(*value),
		Value::String(value) => JsValue::from_str(value),
	}
}

fn from_js(value: &JsValue) -> Option<Value> {
	if value.is_null() {
		Some(Value::Null)
	} else if let Some(value) = value.as_bool() {
		Some(Value::Bool(value))
	} else if let Some(value) = value.as_f64() {
		Some(Value::Number(value))
	} else {
		value.as_string().map(Value::from)
	}
}

impl Host for DomHost {
	type Node = Node;

	fn create_element(&self, tag: &str, namespace: Option<&str>) -> Node {
		let element = match namespace {
			None => self.document.create_element(tag),
			Some(namespace) => self.document.create_element_ns(Some(namespace), tag),
		};
		element
			.map_err(|error| error!("Failed to create element {:?}: {:?}", tag, error))
			.expect_throw("xylem-dom: Element creation failed.")
			.into()
	}

	fn create_text_node(&self, text: &str) -> Node {
		self.document.create_text_node(text).into()
	}

	fn create_fragment(&self) -> Node {
		self.document.create_document_fragment().into()
	}

	fn append_child(&self, parent: &Node, child: &Node) {
		log_failure("append child", parent.append_child(child));
	}

	fn insert_before(&self, parent: &Node, child: &Node, reference: Option<&Node>) {
		log_failure("insert child", parent.insert_before(child, reference));
	}

	fn replace_child(&self, parent: &Node, new_child: &Node, old_child: &Node) {
		log_failure("replace child", parent.replace_child(new_child, old_child));
	}

	fn remove_child(&self, parent: &Node, child: &Node) {
		log_failure("remove child", parent.remove_child(child));
	}

	fn parent_node(&self, node: &Node) -> Option<Node> {
		node.parent_node()
	}

	fn child_node(&self, parent: &Node, index: usize) -> Option<Node> {
		u32::try_from(index).ok().and_then(|index| parent.child_nodes().item(index))
	}

	fn child_count(&self, parent: &Node) -> usize {
		parent.child_nodes().length() as usize
	}

	fn set_text_content(&self, node: &Node, text: &str) {
		node.set_text_content(Some(text));
	}

	fn set_property(&self, node: &Node, name: &str, value: &Value) {
		log_failure("set property", Reflect::set(node, &JsValue::from_str(name), &to_js(value)));
	}

	fn property(&self, node: &Node, name: &str) -> Option<Value> {
		Reflect::get(node, &JsValue::from_str(name)).ok().as_ref().and_then(from_js)
	}

	fn set_attribute(&self, node: &Node, name: &str, value: &str) {
		if let Some(element) = Self::element(node, "set an attribute") {
			log_failure("set attribute", element.set_attribute(name, value));
		}
	}

	fn remove_attribute(&self, node: &Node, name: &str) {
		if let Some(element) = Self::element(node, "remove an attribute") {
			log_failure("remove attribute", element.remove_attribute(name));
		}
	}

	fn set_attribute_ns(&self, node: &Node, namespace: &str, name: &str, value: &str) {
		if let Some(element) = Self::element(node, "set a namespaced attribute") {
			log_failure("set namespaced attribute", element.set_attribute_ns(Some(namespace), name, value));
		}
	}

	fn remove_attribute_ns(&self, node: &Node, namespace: &str, name: &str) {
		if let Some(element) = Self::element(node, "remove a namespaced attribute") {
			log_failure("remove namespaced attribute", element.remove_attribute_ns(Some(namespace), name));
		}
	}

	fn set_style(&self, node: &Node, name: &str, value: &str) {
		// HTML and SVG elements both have `style`, but share no web-sys type that does.
		let style = Reflect::get(node, &JsValue::from_str("style"))
			.ok()
			.and_then(|style| style.dyn_into::<CssStyleDeclaration>().ok());
		match style {
			Some(style) => log_failure("set style", style.set_property(name, value)),
			None => error!("{:?} has no style declaration.", node),
		}
	}

	#[instrument(skip(self, listener))]
	fn add_event_listener(&self, node: &Node, name: &str, listener: Rc<Listener>, passive: bool) {
		let closure = {
			let listener = Rc::clone(&listener);
			Closure::wrap(Box::new(move |event: web_sys::Event| {
				let propagation = listener.handle(&event);
				if propagation.stop_propagation {
					event.stop_propagation();
				}
				if propagation.prevent_default {
					event.prevent_default();
				}
			}) as Box<dyn Fn(web_sys::Event)>)
		};

		let mut options = AddEventListenerOptions::new();
		#[allow(deprecated)]
		options.passive(passive);
		log_failure(
			"add event listener",
			node.add_event_listener_with_callback_and_add_event_listener_options(name, closure.as_ref().unchecked_ref(), &options),
		);

		let replaced = self.closures.borrow_mut().insert_binding(node, name, Binding { listener, closure });
		if let Some(replaced) = replaced {
			trace!("Unregistering replaced listener.");
			log_failure(
				"remove event listener",
				node.remove_event_listener_with_callback(name, replaced.closure.as_ref().unchecked_ref()),
			);
		}
	}

	fn event_listener(&self, node: &Node, name: &str) -> Option<Rc<Listener>> {
		self.closures.borrow().listener(node, name)
	}

	#[instrument(skip(self))]
	fn remove_event_listener(&self, node: &Node, name: &str) {
		let removed = self.closures.borrow_mut().remove_binding(node, name);
		match removed {
			Some(binding) => log_failure(
				"remove event listener",
				node.remove_event_listener_with_callback(name, binding.closure.as_ref().unchecked_ref()),
			),
			None => error!("No listener for {:?} registered on {:?}.", name, node),
		}
	}

	fn stash_event_node(&self, node: &Node, event_node: EventNode) {
		self.closures.borrow_mut().stash(node, event_node);
	}

	fn stashed_event_node(&self, node: &Node) -> Option<EventNode> {
		self.closures.borrow().stashed(node)
	}

	fn release(&self, node: &Node) {
		let released = self.closures.borrow_mut().release(node);
		if let Some(record) = released {
			for (name, binding) in record.listeners {
				log_failure(
					"remove event listener",
					node.remove_event_listener_with_callback(&name, binding.closure.as_ref().unchecked_ref()),
				);
			}
		}

		let children = node.child_nodes();
		for i in 0..children.length() {
			if let Some(child) = children.item(i) {
				self.release(&child);
			}
		}
	}

	fn inspect(&self, node: &Node) -> Inspection {
		match node.node_type() {
			Node::TEXT_NODE => Inspection::Text(node.text_content().unwrap_or_default()),
			Node::ELEMENT_NODE => {
				let element: &Element = node.unchecked_ref();
				let attributes = element.attributes();
				Inspection::Element {
					tag: element.tag_name(),
					namespace: element.namespace_uri().filter(|namespace| namespace != XHTML_NAMESPACE),
					attributes: (0..attributes.length())
						.filter_map(|i| attributes.item(i))
						.map(|attribute| (attribute.local_name(), attribute.value()))
						.collect(),
				}
			}
			_ => Inspection::Other,
		}
	}
}
