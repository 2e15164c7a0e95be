//! Per-[`DomHost`](`crate::web::DomHost`) storage of listener closures and stashed event nodes.
//!
//! DOM nodes can't hold Rust values, so each node that needs some gets a numeric id stamped on it as a JavaScript property.

use crate::event::{EventNode, Listener};
use hashbrown::HashMap;
use js_sys::Reflect;
use std::rc::Rc;
use tracing::{error, trace};
use wasm_bindgen::{closure::Closure, JsValue};

const ID_PROPERTY: &str = "__xylemDomId";

/// A registered listener and the JavaScript closure that forwards to it.
pub(crate) struct Binding {
	pub(crate) listener: Rc<Listener>,
	pub(crate) closure: Closure<dyn Fn(web_sys::Event)>,
}

/// Everything kept for one DOM node.
#[derive(Default)]
pub(crate) struct Record {
	pub(crate) listeners: HashMap<String, Binding>,
	pub(crate) event_node: Option<EventNode>,
}

#[derive(Default)]
pub(crate) struct ClosureMap {
	next_id: u32,
	records: HashMap<u32, Record>,
}
impl ClosureMap {
	fn id_of(node: &web_sys::Node) -> Option<u32> {
		Reflect::get(node, &JsValue::from_str(ID_PROPERTY))
			.ok()
			.and_then(|id| id.as_f64())
			.map(|id| id as u32)
	}

	fn record_mut(&mut self, node: &web_sys::Node) -> Option<&mut Record> {
		if let Some(id) = Self::id_of(node) {
			return Some(self.records.entry(id).or_default());
		}

		let id = self.next_id;
		if let Err(error) = Reflect::set(node, &JsValue::from_str(ID_PROPERTY), &JsValue::from_f64(f64::from(id))) {
			error!("Failed to stamp {:?} with an id: {:?}", node, error);
			return None;
		}
		trace!(id, "Stamped node.");
		self.next_id += 1;
		Some(self.records.entry(id).or_default())
	}

	fn record(&self, node: &web_sys::Node) -> Option<&Record> {
		Self::id_of(node).and_then(|id| self.records.get(&id))
	}

	/// Returns the binding previously registered for `name`, which the caller must unregister from the DOM.
	pub(crate) fn insert_binding(&mut self, node: &web_sys::Node, name: &str, binding: Binding) -> Option<Binding> {
		self.record_mut(node)?.listeners.insert(name.to_owned(), binding)
	}

	pub(crate) fn listener(&self, node: &web_sys::Node, name: &str) -> Option<Rc<Listener>> {
		self.record(node)?.listeners.get(name).map(|binding| Rc::clone(&binding.listener))
	}

	pub(crate) fn remove_binding(&mut self, node: &web_sys::Node, name: &str) -> Option<Binding> {
		let id = Self::id_of(node)?;
		self.records.get_mut(&id)?.listeners.remove(name)
	}

	pub(crate) fn stash(&mut self, node: &web_sys::Node, event_node: EventNode) {
		if let Some(record) = self.record_mut(node) {
			record.event_node = Some(event_node);
		}
	}

	pub(crate) fn stashed(&self, node: &web_sys::Node) -> Option<EventNode> {
		self.record(node)?.event_node.clone()
	}

	/// Takes `node`'s record out. The id stays stamped on it, so the node gets a fresh record if it's used again.
	pub(crate) fn release(&mut self, node: &web_sys::Node) -> Option<Record> {
		let id = Self::id_of(node)?;
		let record = self.records.remove(&id);
		if record.is_some() {
			trace!(id, "Released record.");
		}
		record
	}
}
