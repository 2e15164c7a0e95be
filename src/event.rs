//! Event handlers, tagger chains and message dispatch.

use core::{
	any::Any,
	cell::RefCell,
	fmt::{self, Debug, Formatter},
};
use std::rc::Rc;
use tracing::{error, trace, trace_span};

/// An application message travelling outwards from an event handler.
pub type Message = Box<dyn Any>;

/// A message transformation applied by a tagger node.
pub type Tag = Rc<dyn Fn(Message) -> Message>;

/// The collapsed functions of a tagger chain, outermost first.
pub type Taggers = Vec<Tag>;

pub(crate) fn tag_eq(a: &Tag, b: &Tag) -> bool {
	thin_ptr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

pub(crate) fn taggers_eq(a: &[Tag], b: &[Tag]) -> bool {
	a.len() == b.len() && a.iter().zip(b).all(|(a, b)| tag_eq(a, b))
}

/// Pointer identity without comparing vtables, which aren't guaranteed to be unique.
pub(crate) fn thin_ptr_eq<T: ?Sized>(a: *const T, b: *const T) -> bool {
	a.cast::<()>() == b.cast::<()>()
}

/// What a [`Handler::Custom`] decided.
pub struct CustomEvent {
	pub message: Message,
	pub stop_propagation: bool,
	pub prevent_default: bool,
}

/// Turns a host event into a message, or into nothing to ignore it.
///
/// Handlers are compared by variant and by pointer, so keep them in a stable [`Rc`] when a subtree is recreated often.
#[derive(Clone)]
pub enum Handler {
	Normal(Rc<dyn Fn(&dyn Any) -> Option<Message>>),
	MayStopPropagation(Rc<dyn Fn(&dyn Any) -> Option<(Message, bool)>>),
	MayPreventDefault(Rc<dyn Fn(&dyn Any) -> Option<(Message, bool)>>),
	Custom(Rc<dyn Fn(&dyn Any) -> Option<CustomEvent>>),
}
impl Handler {
	pub fn normal(f: impl Fn(&dyn Any) -> Option<Message> + 'static) -> Self {
		Self::Normal(Rc::new(f))
	}

	/// A [`Handler::Normal`] that always sends a clone of `message`.
	pub fn emit<M: Clone + 'static>(message: M) -> Self {
		Self::normal(move |_| Some(Box::new(message.clone()) as Message))
	}

	pub fn may_stop_propagation(f: impl Fn(&dyn Any) -> Option<(Message, bool)> + 'static) -> Self {
		Self::MayStopPropagation(Rc::new(f))
	}

	pub fn may_prevent_default(f: impl Fn(&dyn Any) -> Option<(Message, bool)> + 'static) -> Self {
		Self::MayPreventDefault(Rc::new(f))
	}

	pub fn custom(f: impl Fn(&dyn Any) -> Option<CustomEvent> + 'static) -> Self {
		Self::Custom(Rc::new(f))
	}

	pub(crate) fn same_kind(&self, other: &Self) -> bool {
		core::mem::discriminant(self) == core::mem::discriminant(other)
	}

	/// Whether the listener can be registered as passive, i.e. never prevents the default action.
	#[must_use]
	pub fn is_passive(&self) -> bool {
		matches!(self, Self::Normal(_) | Self::MayStopPropagation(_))
	}

	fn run(&self, event: &dyn Any) -> Option<CustomEvent> {
		match self {
			Self::Normal(f) => f(event).map(|message| CustomEvent {
				message,
				stop_propagation: false,
				prevent_default: false,
			}),
			Self::MayStopPropagation(f) => f(event).map(|(message, stop_propagation)| CustomEvent {
				message,
				stop_propagation,
				prevent_default: false,
			}),
			Self::MayPreventDefault(f) => f(event).map(|(message, prevent_default)| CustomEvent {
				message,
				stop_propagation: false,
				prevent_default,
			}),
			Self::Custom(f) => f(event),
		}
	}
}
impl PartialEq for Handler {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Normal(a), Self::Normal(b)) => thin_ptr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
			(Self::MayStopPropagation(a), Self::MayStopPropagation(b)) | (Self::MayPreventDefault(a), Self::MayPreventDefault(b)) => {
				thin_ptr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
			}
			(Self::Custom(a), Self::Custom(b)) => thin_ptr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
			_ => false,
		}
	}
}
impl Debug for Handler {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Normal(_) => "Handler::Normal",
			Self::MayStopPropagation(_) => "Handler::MayStopPropagation",
			Self::MayPreventDefault(_) => "Handler::MayPreventDefault",
			Self::Custom(_) => "Handler::Custom",
		})
	}
}

/// Whether the host should stop the event or prevent its default action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Propagation {
	pub stop_propagation: bool,
	pub prevent_default: bool,
}

enum Scope {
	Root(Rc<dyn Fn(Message)>),
	Tagged { taggers: RefCell<Taggers>, parent: EventNode },
}

/// One link of the chain from a live node back up to the application's dispatch callback.
///
/// Tagged event nodes are stashed on the live node their tagger chain rendered to, and are retagged in place.
/// Where several chains render to the same live node (through lazy nodes), only the innermost one is stashed.
/// The outer ones are its ancestors.
#[derive(Clone)]
pub struct EventNode(Rc<Scope>);
impl EventNode {
	/// The outermost event node, which hands finished messages to the application.
	pub fn root(dispatch: impl Fn(Message) + 'static) -> Self {
		Self(Rc::new(Scope::Root(Rc::new(dispatch))))
	}

	#[must_use]
	pub fn tagged(taggers: Taggers, parent: EventNode) -> Self {
		Self(Rc::new(Scope::Tagged {
			taggers: RefCell::new(taggers),
			parent,
		}))
	}

	/// Replaces this event node's taggers. Listeners below it pick the change up on their next event.
	pub fn retag(&self, new_taggers: Taggers) {
		match &*self.0 {
			Scope::Tagged { taggers, .. } => *taggers.borrow_mut() = new_taggers,
			Scope::Root(_) => error!("xylem-dom bug: Tried to retag the root event node. Ignoring."),
		}
	}

	#[must_use]
	pub fn ptr_eq(a: &Self, b: &Self) -> bool {
		Rc::ptr_eq(&a.0, &b.0)
	}

	/// The event node `generations` links further out, or [`None`] past the root.
	pub(crate) fn ancestor(&self, generations: usize) -> Option<EventNode> {
		let mut current = self.clone();
		for _ in 0..generations {
			let parent = match &*current.0 {
				Scope::Tagged { parent, .. } => parent.clone(),
				Scope::Root(_) => return None,
			};
			current = parent;
		}
		Some(current)
	}

	/// Sends `message` through every tagger between this event node and the root, then to the application.
	pub fn dispatch(&self, mut message: Message) {
		let mut current = self.clone();
		loop {
			let parent = match &*current.0 {
				Scope::Root(dispatch) => {
					let dispatch = Rc::clone(dispatch);
					trace!("Dispatching message to the application.");
					return dispatch(message);
				}
				Scope::Tagged { taggers, parent } => {
					// Cloned so that re-entrant updates can retag while a tagger runs.
					let taggers = taggers.borrow().clone();
					for tag in taggers.iter().rev() {
						message = tag(message);
					}
					parent.clone()
				}
			};
			current = parent;
		}
	}
}
impl Debug for EventNode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match &*self.0 {
			Scope::Root(_) => f.write_str("EventNode::Root"),
			Scope::Tagged { taggers, parent } => f
				.debug_struct("EventNode::Tagged")
				.field("taggers.len()", &taggers.borrow().len())
				.field("parent", parent)
				.finish(),
		}
	}
}

/// The per-node, per-event-name callback a host invokes.
///
/// Its handler is swapped in place when a facts diff only changes the handler function.
pub struct Listener {
	handler: RefCell<Handler>,
	event_node: EventNode,
}
impl Listener {
	#[must_use]
	pub fn new(handler: Handler, event_node: EventNode) -> Self {
		Self {
			handler: RefCell::new(handler),
			event_node,
		}
	}

	#[must_use]
	pub fn handler(&self) -> Handler {
		self.handler.borrow().clone()
	}

	pub(crate) fn replace_handler(&self, handler: Handler) {
		*self.handler.borrow_mut() = handler;
	}

	/// Runs the handler on `event` and dispatches the resulting message, if any.
	///
	/// The host is responsible for acting on the returned [`Propagation`].
	pub fn handle(&self, event: &dyn Any) -> Propagation {
		let span = trace_span!("Handling event", handler = ?self.handler.borrow());
		let _enter = span.enter();

		let handler = self.handler();
		let outcome = match handler.run(event) {
			Some(outcome) => outcome,
			None => {
				trace!("Handler ignored the event.");
				return Propagation::default();
			}
		};

		let propagation = Propagation {
			stop_propagation: outcome.stop_propagation,
			prevent_default: outcome.prevent_default,
		};
		self.event_node.dispatch(outcome.message);
		propagation
	}
}
impl Debug for Listener {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Listener")
			.field("handler", &*self.handler.borrow())
			.field("event_node", &self.event_node)
			.finish()
	}
}
