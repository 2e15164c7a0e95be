//! The immutable virtual node tree.
//!
//! [`Node`]s are cheap to clone and compared by identity where it matters:
//! A subtree that is the same [`Node`] as before is skipped by the differ without being looked at.

use crate::{
	event::{Message, Tag, Taggers},
	facts::Facts,
	host::Host,
	patch::CustomPatch,
	sanitize::no_script,
};
use core::{
	any::Any,
	cell::OnceCell,
	fmt::{self, Debug, Formatter},
	ops::Deref,
};
use std::rc::Rc;

/// The identity key of a child in a keyed list.
pub type Key = Rc<str>;

/// A host-rendered widget. The reconciler delegates painting and diffing of its model to it.
///
/// Two custom nodes with different widget [`Rc`]s are never diffed against each other.
pub trait Widget<H: Host> {
	fn render(&self, host: &H, model: &dyn Any) -> H::Node;

	/// Returns [`None`] if the live node is up to date for `new`.
	///
	/// A patch may return a different live node, which then replaces the old one.
	/// The old node is [released](`Host::release`) along with whatever is still below it.
	fn diff(&self, old: &dyn Any, new: &dyn Any) -> Option<CustomPatch<H>>;
}

/// A virtual node. See [`Vnode`] for the variants.
pub struct Node<H: Host>(Rc<Vnode<H>>);

pub enum Vnode<H: Host> {
	Text(String),
	Element(Element<H>),
	Keyed(KeyedElement<H>),
	Tagger(Tagger<H>),
	Thunk(Thunk<H>),
	Custom(Custom<H>),
}

pub struct Element<H: Host> {
	pub tag: String,
	pub namespace: Option<String>,
	pub facts: Rc<Facts>,
	pub children: Vec<Node<H>>,
	descendants: usize,
}

pub struct KeyedElement<H: Host> {
	pub tag: String,
	pub namespace: Option<String>,
	pub facts: Rc<Facts>,
	pub children: Vec<(Key, Node<H>)>,
	descendants: usize,
}

/// Maps messages from `child` through `tag` on their way to the application.
pub struct Tagger<H: Host> {
	pub tag: Tag,
	pub child: Node<H>,
	descendants: usize,
}

/// A lazily built subtree, reused as long as its arguments are pointer-identical.
pub struct Thunk<H: Host> {
	pub args: Vec<Rc<dyn Any>>,
	build: Rc<dyn Fn() -> Node<H>>,
	cached: OnceCell<Node<H>>,
}

pub struct Custom<H: Host> {
	pub facts: Rc<Facts>,
	pub model: Rc<dyn Any>,
	pub widget: Rc<dyn Widget<H>>,
}

impl<H: Host> Node<H> {
	pub fn text(text: impl Into<String>) -> Self {
		Vnode::Text(text.into()).into()
	}

	/// Creates an HTML element. A `script` tag is turned into `p`.
	pub fn element(tag: impl Into<String>, facts: Facts, children: Vec<Node<H>>) -> Self {
		Self::element_in(None, tag.into(), facts, children)
	}

	pub fn element_ns(namespace: impl Into<String>, tag: impl Into<String>, facts: Facts, children: Vec<Node<H>>) -> Self {
		Self::element_in(Some(namespace.into()), tag.into(), facts, children)
	}

	pub(crate) fn element_in(namespace: Option<String>, tag: String, facts: Facts, children: Vec<Node<H>>) -> Self {
		let descendants = children.len() + children.iter().map(Node::descendants).sum::<usize>();
		Vnode::Element(Element {
			tag: no_script(tag),
			namespace,
			facts: Rc::new(facts),
			children,
			descendants,
		})
		.into()
	}

	/// Creates an HTML element whose children are matched up by `key` rather than by position.
	pub fn keyed(tag: impl Into<String>, facts: Facts, children: Vec<(Key, Node<H>)>) -> Self {
		Self::keyed_in(None, tag.into(), facts, children)
	}

	pub fn keyed_ns(namespace: impl Into<String>, tag: impl Into<String>, facts: Facts, children: Vec<(Key, Node<H>)>) -> Self {
		Self::keyed_in(Some(namespace.into()), tag.into(), facts, children)
	}

	fn keyed_in(namespace: Option<String>, tag: String, facts: Facts, children: Vec<(Key, Node<H>)>) -> Self {
		let descendants = children.len() + children.iter().map(|(_, child)| child.descendants()).sum::<usize>();
		Vnode::Keyed(KeyedElement {
			tag: no_script(tag),
			namespace,
			facts: Rc::new(facts),
			children,
			descendants,
		})
		.into()
	}

	/// Wraps `child` so that its messages pass through `tag`.
	pub fn map(tag: impl Fn(Message) -> Message + 'static, child: Node<H>) -> Self {
		Self::map_rc(Rc::new(tag), child)
	}

	/// Like [`Node::map`], but with a shared [`Tag`], which lets unchanged taggers be recognised.
	#[must_use]
	pub fn map_rc(tag: Tag, child: Node<H>) -> Self {
		let descendants = 1 + child.descendants();
		Vnode::Tagger(Tagger { tag, child, descendants }).into()
	}

	/// A typed [`Node::map`]. Messages that aren't an `A` pass through unchanged.
	pub fn map_with<A: 'static, B: 'static>(f: impl Fn(A) -> B + 'static, child: Node<H>) -> Self {
		Self::map(
			move |message: Message| match message.downcast::<A>() {
				Ok(a) => Box::new(f(*a)) as Message,
				Err(message) => message,
			},
			child,
		)
	}

	/// A subtree that is only built (and diffed) again once one of `args` is replaced.
	pub fn lazy(args: Vec<Rc<dyn Any>>, build: impl Fn() -> Node<H> + 'static) -> Self {
		Vnode::Thunk(Thunk {
			args,
			build: Rc::new(build),
			cached: OnceCell::new(),
		})
		.into()
	}

	pub fn custom(facts: Facts, model: Rc<dyn Any>, widget: Rc<dyn Widget<H>>) -> Self {
		Vnode::Custom(Custom {
			facts: Rc::new(facts),
			model,
			widget,
		})
		.into()
	}

	#[must_use]
	pub fn ptr_eq(a: &Self, b: &Self) -> bool {
		Rc::ptr_eq(&a.0, &b.0)
	}

	/// The number of nodes below this one, as counted by patch indices.
	///
	/// Thunks and custom nodes count as leaves: Their insides are indexed separately.
	#[must_use]
	pub fn descendants(&self) -> usize {
		match &*self.0 {
			Vnode::Text(_) | Vnode::Thunk(_) | Vnode::Custom(_) => 0,
			Vnode::Element(element) => element.descendants,
			Vnode::Keyed(keyed) => keyed.descendants,
			Vnode::Tagger(tagger) => tagger.descendants,
		}
	}

	/// The same element without keys. Keyed children are matched up positionally afterwards.
	pub(crate) fn dekey(keyed: &KeyedElement<H>) -> Self {
		Vnode::Element(Element {
			tag: keyed.tag.clone(),
			namespace: keyed.namespace.clone(),
			facts: Rc::clone(&keyed.facts),
			children: keyed.children.iter().map(|(_, child)| child.clone()).collect(),
			descendants: keyed.descendants,
		})
		.into()
	}
}
impl<H: Host> Clone for Node<H> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}
impl<H: Host> Deref for Node<H> {
	type Target = Vnode<H>;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl<H: Host> From<Vnode<H>> for Node<H> {
	fn from(vnode: Vnode<H>) -> Self {
		Self(Rc::new(vnode))
	}
}

impl<H: Host> Tagger<H> {
	/// Collapses this tagger and any directly nested ones.
	///
	/// Returns the taggers outermost first, and the first node that isn't a tagger.
	#[must_use]
	pub fn collapse(&self) -> (Taggers, &Node<H>) {
		let mut taggers = vec![Rc::clone(&self.tag)];
		let mut child = &self.child;
		while let Vnode::Tagger(nested) = &**child {
			taggers.push(Rc::clone(&nested.tag));
			child = &nested.child;
		}
		(taggers, child)
	}
}

impl<H: Host> Thunk<H> {
	/// Builds the subtree if that hasn't happened yet.
	pub fn force(&self) -> &Node<H> {
		self.cached.get_or_init(|| (self.build)())
	}

	#[must_use]
	pub fn is_forced(&self) -> bool {
		self.cached.get().is_some()
	}

	/// Adopts an older thunk's subtree. Returns `false` if this thunk was already forced to something else.
	pub(crate) fn adopt(&self, child: &Node<H>) -> bool {
		match self.cached.get() {
			Some(cached) => Node::ptr_eq(cached, child),
			None => self.cached.set(child.clone()).is_ok(),
		}
	}

	pub(crate) fn same_args(&self, other: &Self) -> bool {
		self.args.len() == other.args.len()
			&& self.args.iter().zip(&other.args).all(|(a, b)| crate::event::thin_ptr_eq(Rc::as_ptr(a), Rc::as_ptr(b)))
	}
}

impl<H: Host> Debug for Node<H> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match &*self.0 {
			Vnode::Text(text) => f.debug_tuple("Text").field(text).finish(),
			Vnode::Element(element) => f
				.debug_struct("Element")
				.field("tag", &element.tag)
				.field("namespace", &element.namespace)
				.field("facts", &element.facts)
				.field("children", &element.children)
				.finish(),
			Vnode::Keyed(keyed) => f
				.debug_struct("Keyed")
				.field("tag", &keyed.tag)
				.field("namespace", &keyed.namespace)
				.field("facts", &keyed.facts)
				.field("children", &keyed.children)
				.finish(),
			Vnode::Tagger(tagger) => f.debug_tuple("Tagger").field(&tagger.child).finish(),
			Vnode::Thunk(thunk) => f
				.debug_struct("Thunk")
				.field("args.len()", &thunk.args.len())
				.field("cached", &thunk.cached.get())
				.finish(),
			Vnode::Custom(custom) => f.debug_struct("Custom").field("facts", &custom.facts).finish_non_exhaustive(),
		}
	}
}
