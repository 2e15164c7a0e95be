//! Virtualises existing live content, so that a [`Reconciler`](`crate::Reconciler`) can take it over through an ordinary diff.

use crate::{
	facts::Facts,
	host::{Host, Inspection},
	node::Node,
};
use tracing::{instrument, trace};

/// Loads `live` and everything below it.
///
/// HTML tag names are lower-cased. Nodes other than text and elements (like comments) load as empty text.
/// Event listeners can't be read back, so they are reattached by the first update.
#[instrument(skip(host))]
pub fn load_node<H: Host>(host: &H, live: &H::Node) -> Node<H> {
	match host.inspect(live) {
		Inspection::Text(text) => Node::text(text),
		Inspection::Element { tag, namespace, attributes } => {
			let tag = match namespace {
				None => tag.to_ascii_lowercase(),
				Some(_) => tag,
			};
			Node::element_in(namespace, tag, load_attributes(attributes), load_child_nodes(host, live))
		}
		Inspection::Other => {
			trace!("Loading unrecognised node as empty text.");
			Node::text("")
		}
	}
}

pub fn load_child_nodes<H: Host>(host: &H, parent: &H::Node) -> Vec<Node<H>> {
	(0..host.child_count(parent))
		.filter_map(|i| host.child_node(parent, i))
		.map(|child| load_node(host, &child))
		.collect()
}

/// Attributes are taken over as they are, without sanitisation.
#[must_use]
pub fn load_attributes(attributes: Vec<(String, String)>) -> Facts {
	let mut facts = Facts::new();
	for (name, value) in attributes {
		facts.insert_loaded_attribute(name, value);
	}
	facts
}
