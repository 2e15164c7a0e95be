//! Facts: everything about an element that isn't its tag or its children.
//!
//! Facts are kept per category because each category is diffed and applied differently.
//! Styles are merged key by key, attributes and properties go through different host calls,
//! and event handlers are swapped in place on existing listeners where possible.

use crate::{
	event::{EventNode, Handler, Listener},
	host::Host,
	sanitize::{no_inner_html_or_form_action, no_javascript_or_html_uri, no_on_or_form_action},
};
use core::fmt::{self, Display, Formatter};
use std::{collections::BTreeMap, rc::Rc};
use tracing::{trace, trace_span};

/// A DOM property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Null,
	Bool(bool),
	Number(f64),
	String(Rc<str>),
}
impl Value {
	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(string) => Some(string),
			_ => None,
		}
	}

	/// What a property is reset to once it disappears from an element's facts.
	fn cleared(&self) -> Self {
		match self {
			Self::String(_) => Self::String("".into()),
			_ => Self::Null,
		}
	}
}
impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}
impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Self::Number(value)
	}
}
impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Self::String(value.into())
	}
}
impl From<String> for Value {
	fn from(value: String) -> Self {
		Self::String(value.into())
	}
}
impl Display for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::Null => f.write_str("null"),
			Self::Bool(value) => Display::fmt(value, f),
			Self::Number(value) => Display::fmt(value, f),
			Self::String(value) => f.write_str(value),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespacedValue {
	pub namespace: String,
	pub value: String,
}

/// A namespaced attribute change. `value` is [`None`] for removals, which still need the namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespacedChange {
	pub namespace: String,
	pub value: Option<String>,
}

/// A single fact, as produced by view code.
///
/// The constructors sanitise names and values, see [`Fact::attribute`] and [`Fact::property`].
#[derive(Debug, Clone)]
pub enum Fact {
	Event(String, Handler),
	Style(String, String),
	Property(String, Value),
	Attribute(String, String),
	AttributeNs { namespace: String, name: String, value: String },
}
impl Fact {
	pub fn on(name: impl Into<String>, handler: Handler) -> Self {
		Self::Event(name.into(), handler)
	}

	pub fn style(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self::Style(name.into(), value.into())
	}

	/// `innerHTML` and `formAction` are renamed to inert `data-` names, and string values holding `javascript:` or `data:text/html` URLs are blanked.
	pub fn property(name: impl Into<String>, value: impl Into<Value>) -> Self {
		let value = match value.into() {
			Value::String(string) => Value::from(no_javascript_or_html_uri(string.to_string())),
			other => other,
		};
		Self::Property(no_inner_html_or_form_action(name.into()), value)
	}

	/// `on*` and `formAction` are renamed to inert `data-` names, and `javascript:` or `data:text/html` URLs are blanked.
	pub fn attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self::Attribute(no_on_or_form_action(name.into()), no_javascript_or_html_uri(value.into()))
	}

	pub fn attribute_ns(namespace: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
		Self::AttributeNs {
			namespace: namespace.into(),
			name: no_on_or_form_action(name.into()),
			value: no_javascript_or_html_uri(value.into()),
		}
	}
}

/// The organised facts of an element or custom node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facts {
	pub(crate) events: BTreeMap<String, Handler>,
	pub(crate) styles: BTreeMap<String, String>,
	pub(crate) properties: BTreeMap<String, Value>,
	pub(crate) attributes: BTreeMap<String, String>,
	pub(crate) namespaced: BTreeMap<String, NamespacedValue>,
}
impl Facts {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.events.is_empty() && self.styles.is_empty() && self.properties.is_empty() && self.attributes.is_empty() && self.namespaced.is_empty()
	}

	/// Adds `fact`, replacing an earlier one of the same category and name.
	///
	/// The `className` property and the `class` attribute accumulate instead.
	pub fn push(&mut self, fact: Fact) {
		match fact {
			Fact::Event(name, handler) => {
				self.events.insert(name, handler);
			}
			Fact::Style(name, value) => {
				self.styles.insert(name, value);
			}
			Fact::Property(name, Value::String(class)) if name == "className" => match self.properties.get_mut(&name) {
				Some(Value::String(classes)) if !classes.is_empty() => *classes = format!("{} {}", classes, class).into(),
				_ => {
					self.properties.insert(name, Value::String(class));
				}
			},
			Fact::Property(name, value) => {
				self.properties.insert(name, value);
			}
			Fact::Attribute(name, class) if name == "class" => match self.attributes.get_mut(&name) {
				Some(classes) if !classes.is_empty() => {
					classes.push(' ');
					classes.push_str(&class);
				}
				_ => {
					self.attributes.insert(name, class);
				}
			},
			Fact::Attribute(name, value) => {
				self.attributes.insert(name, value);
			}
			Fact::AttributeNs { namespace, name, value } => {
				self.namespaced.insert(name, NamespacedValue { namespace, value });
			}
		}
	}

	#[must_use]
	pub fn on(mut self, name: impl Into<String>, handler: Handler) -> Self {
		self.push(Fact::on(name, handler));
		self
	}

	#[must_use]
	pub fn style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.push(Fact::style(name, value));
		self
	}

	#[must_use]
	pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.push(Fact::property(name, value));
		self
	}

	#[must_use]
	pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.push(Fact::attribute(name, value));
		self
	}

	#[must_use]
	pub fn attribute_ns(mut self, namespace: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.push(Fact::attribute_ns(namespace, name, value));
		self
	}

	/// Inserts an attribute exactly as found on a live node.
	pub(crate) fn insert_loaded_attribute(&mut self, name: String, value: String) {
		self.attributes.insert(name, value);
	}

	#[must_use]
	pub fn attribute_value(&self, name: &str) -> Option<&str> {
		self.attributes.get(name).map(String::as_str)
	}

	#[must_use]
	pub fn property_value(&self, name: &str) -> Option<&Value> {
		self.properties.get(name)
	}

	/// All facts as additions, for first paint.
	pub(crate) fn additions(&self) -> FactsDiff {
		diff_facts(&Facts::default(), self).unwrap_or_default()
	}
}
impl FromIterator<Fact> for Facts {
	fn from_iter<T: IntoIterator<Item = Fact>>(iter: T) -> Self {
		let mut facts = Self::new();
		for fact in iter {
			facts.push(fact);
		}
		facts
	}
}

/// The changes between two [`Facts`], per category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactsDiff {
	/// [`None`] removes the listener.
	pub events: Vec<(String, Option<Handler>)>,
	/// An empty value clears the style.
	pub styles: Vec<(String, String)>,
	/// Removed properties are reset to `""` or `null`.
	pub properties: Vec<(String, Value)>,
	/// [`None`] removes the attribute.
	pub attributes: Vec<(String, Option<String>)>,
	pub namespaced: Vec<(String, NamespacedChange)>,
}
impl FactsDiff {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.events.len() + self.styles.len() + self.properties.len() + self.attributes.len() + self.namespaced.len()
	}
}

fn diff_category<V, C>(
	old: &BTreeMap<String, V>,
	new: &BTreeMap<String, V>,
	changes: &mut Vec<(String, C)>,
	unchanged: impl Fn(&str, &V, &V) -> bool,
	cleared: impl Fn(&V) -> C,
	set: impl Fn(&V) -> C,
) {
	for (name, old_value) in old {
		match new.get(name) {
			None => changes.push((name.clone(), cleared(old_value))),
			Some(new_value) if unchanged(name, old_value, new_value) => (),
			Some(new_value) => changes.push((name.clone(), set(new_value))),
		}
	}
	for (name, new_value) in new {
		if !old.contains_key(name) {
			changes.push((name.clone(), set(new_value)));
		}
	}
}

/// Diffs two fact sets. Returns [`None`] if nothing changed in any category.
///
/// `value` and `checked` properties are always reapplied, since user input changes them on the live node.
#[must_use]
pub fn diff_facts(old: &Facts, new: &Facts) -> Option<FactsDiff> {
	let mut diff = FactsDiff::default();
	diff_category(&old.events, &new.events, &mut diff.events, |_, a, b| a == b, |_| None, |handler| Some(handler.clone()));
	diff_category(&old.styles, &new.styles, &mut diff.styles, |_, a, b| a == b, |_| String::new(), Clone::clone);
	diff_category(
		&old.properties,
		&new.properties,
		&mut diff.properties,
		|name, a, b| a == b && name != "value" && name != "checked",
		Value::cleared,
		Clone::clone,
	);
	diff_category(&old.attributes, &new.attributes, &mut diff.attributes, |_, a, b| a == b, |_| None, |value| Some(value.clone()));
	diff_category(
		&old.namespaced,
		&new.namespaced,
		&mut diff.namespaced,
		|_, a, b| a == b,
		|old| NamespacedChange {
			namespace: old.namespace.clone(),
			value: None,
		},
		|new| NamespacedChange {
			namespace: new.namespace.clone(),
			value: Some(new.value.clone()),
		},
	);

	if diff.is_empty() {
		None
	} else {
		Some(diff)
	}
}

/// Applies `diff` to `node`. New listeners dispatch through `event_node`.
pub(crate) fn apply_facts<H: Host>(host: &H, node: &H::Node, event_node: &EventNode, diff: &FactsDiff) {
	let span = trace_span!("Applying facts", changes = diff.len());
	let _enter = span.enter();

	for (name, value) in &diff.attributes {
		match value {
			Some(value) => host.set_attribute(node, name, value),
			None => host.remove_attribute(node, name),
		}
	}

	for (name, value) in &diff.properties {
		if (name == "value" || name == "checked") && host.property(node, name).as_ref() == Some(value) {
			continue;
		}
		host.set_property(node, name, value);
	}

	for (name, NamespacedChange { namespace, value }) in &diff.namespaced {
		match value {
			Some(value) => host.set_attribute_ns(node, namespace, name, value),
			None => host.remove_attribute_ns(node, namespace, name),
		}
	}

	for (name, value) in &diff.styles {
		host.set_style(node, name, value);
	}

	for (name, handler) in &diff.events {
		apply_event(host, node, event_node, name, handler.as_ref());
	}
}

fn apply_event<H: Host>(host: &H, node: &H::Node, event_node: &EventNode, name: &str, handler: Option<&Handler>) {
	let existing = host.event_listener(node, name);
	let handler = match (handler, existing) {
		(None, Some(_)) => {
			trace!(name, "Removing event listener.");
			return host.remove_event_listener(node, name);
		}
		(None, None) => return,
		(Some(handler), Some(existing)) if existing.handler().same_kind(handler) => {
			trace!(name, "Swapping handler of existing event listener.");
			return existing.replace_handler(handler.clone());
		}
		(Some(handler), Some(_)) => {
			trace!(name, "Handler kind changed. Replacing event listener.");
			host.remove_event_listener(node, name);
			handler
		}
		(Some(handler), None) => handler,
	};
	trace!(name, "Adding event listener.");
	host.add_event_listener(node, name, Rc::new(Listener::new(handler.clone(), event_node.clone())), handler.is_passive());
}
