//! First paint: Turns a [`Node`] into live host nodes without diffing anything.

use crate::{
	event::EventNode,
	facts::{apply_facts, Facts},
	host::Host,
	node::{Node, Vnode},
};
use tracing::trace_span;

/// Renders `node` and everything below it.
///
/// Listeners dispatch through `event_node`, or through the tagger chains they are rendered under.
/// The returned node isn't attached anywhere yet.
pub fn render<H: Host>(host: &H, node: &Node<H>, event_node: &EventNode) -> H::Node {
	match &**node {
		Vnode::Text(text) => {
			let span = if cfg!(feature = "dangerous-logging") {
				trace_span!("Rendering text", text = text.as_str())
			} else {
				trace_span!("Rendering text")
			};
			let _enter = span.enter();
			host.create_text_node(text)
		}
		Vnode::Thunk(thunk) => render(host, thunk.force(), event_node),
		Vnode::Tagger(tagger) => {
			let (taggers, child) = tagger.collapse();
			let span = trace_span!("Rendering tagger chain", taggers = taggers.len());
			let _enter = span.enter();

			let tagged = EventNode::tagged(taggers, event_node.clone());
			let live = render(host, child, &tagged);
			// Inner chains below a lazy node render to the same live node and were stashed first.
			if host.stashed_event_node(&live).is_none() {
				host.stash_event_node(&live, tagged);
			}
			live
		}
		Vnode::Custom(custom) => {
			let span = trace_span!("Rendering custom node");
			let _enter = span.enter();

			let live = custom.widget.render(host, &*custom.model);
			apply_facts(host, &live, event_node, &custom.facts.additions());
			live
		}
		Vnode::Element(element) => render_element(
			host,
			&element.tag,
			element.namespace.as_deref(),
			&element.facts,
			element.children.iter(),
			event_node,
		),
		Vnode::Keyed(keyed) => render_element(
			host,
			&keyed.tag,
			keyed.namespace.as_deref(),
			&keyed.facts,
			keyed.children.iter().map(|(_, child)| child),
			event_node,
		),
	}
}

fn render_element<'a, H: Host>(
	host: &H,
	tag: &str,
	namespace: Option<&str>,
	facts: &Facts,
	children: impl Iterator<Item = &'a Node<H>>,
	event_node: &EventNode,
) -> H::Node {
	let span = trace_span!("Rendering element", tag, namespace = ?namespace);
	let _enter = span.enter();

	let live = host.create_element(tag, namespace);
	if !facts.is_empty() {
		apply_facts(host, &live, event_node, &facts.additions());
	}
	for child in children {
		let child = render(host, child, event_node);
		host.append_child(&live, &child);
	}
	live
}
