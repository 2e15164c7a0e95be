use core::{
	any::Any,
	cell::{Cell, RefCell},
};
use std::rc::Rc;
use xylem_dom::{
	apply,
	event::{Message, Tag},
	memory::{MemoryDom, MemoryNode},
	patch::{CustomPatch, EntryId, Patch, PatchKind},
	render, resolve_targets, EventNode, Facts, Handler, Host, Key, Node, Reconciler, Widget,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inner {
	Clicked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outer {
	A(Inner),
	B(Inner),
}

type Received = Rc<RefCell<Vec<Outer>>>;

fn mount(tree: Node<MemoryDom>) -> (MemoryNode, Reconciler<MemoryDom>, Received) {
	let host = MemoryDom::new();
	let body = host.create_element("body", None);
	let received = Received::default();
	let reconciler = Reconciler::mount(host, &body, tree, {
		let received = Rc::clone(&received);
		move |message: Message| received.borrow_mut().push(*message.downcast::<Outer>().unwrap())
	});
	(body, reconciler, received)
}

fn button(handler: Handler) -> Node<MemoryDom> {
	Node::element("button", Facts::new().on("click", handler), vec![])
}

#[test]
fn taggers_wrap_messages() {
	let (_body, reconciler, received) = mount(Node::map_with(Outer::A, button(Handler::emit(Inner::Clicked))));

	reconciler.host().dispatch_event(reconciler.root(), "click", &());
	assert_eq!(*received.borrow(), [Outer::A(Inner::Clicked)]);
}

#[test]
fn changed_taggers_retag_in_place() {
	let (_body, mut reconciler, received) = mount(Node::map_with(Outer::A, button(Handler::emit(Inner::Clicked))));
	let root = reconciler.root().clone();
	let listener = reconciler.host().event_listener(&root, "click").unwrap();
	let created = reconciler.host().created();

	reconciler.update(Node::map_with(Outer::B, button(Handler::emit(Inner::Clicked))));

	assert_eq!(reconciler.root(), &root);
	assert!(Rc::ptr_eq(&reconciler.host().event_listener(&root, "click").unwrap(), &listener));
	assert_eq!(reconciler.host().created(), created);

	reconciler.host().dispatch_event(&root, "click", &());
	assert_eq!(*received.borrow(), [Outer::B(Inner::Clicked)]);
}

#[test]
fn removed_handlers_stop_listening() {
	let (_body, mut reconciler, received) = mount(Node::map_with(Outer::A, button(Handler::emit(Inner::Clicked))));
	reconciler.update(Node::map_with(Outer::A, Node::element("button", Facts::new(), vec![])));

	assert!(reconciler.root().listener_names().is_empty());
	reconciler.host().dispatch_event(reconciler.root(), "click", &());
	assert!(received.borrow().is_empty());
}

#[test]
fn passive_unless_preventing_default() {
	let (_body, reconciler, _) = mount(Node::element(
		"div",
		Facts::new()
			.on("click", Handler::emit(Inner::Clicked))
			.on("scroll", Handler::may_stop_propagation(|_| None))
			.on("submit", Handler::may_prevent_default(|_| None)),
		vec![],
	));

	let root = reconciler.root();
	assert_eq!(root.listener_names(), ["click", "scroll", "submit"]);
	assert_eq!(root.is_passive("click"), Some(true));
	assert_eq!(root.is_passive("scroll"), Some(true));
	assert_eq!(root.is_passive("submit"), Some(false));
	assert_eq!(root.is_passive("keydown"), None);
}

#[test]
fn handler_kind_changes_replace_the_listener() {
	let (_body, mut reconciler, _) = mount(button(Handler::emit(Inner::Clicked)));
	let root = reconciler.root().clone();
	let listener = reconciler.host().event_listener(&root, "click").unwrap();

	reconciler.update(button(Handler::may_prevent_default(|_| None)));

	assert!(!Rc::ptr_eq(&reconciler.host().event_listener(&root, "click").unwrap(), &listener));
	assert_eq!(root.is_passive("click"), Some(false));
}

fn nested(inner: Handler) -> Node<MemoryDom> {
	Node::map_with(
		Outer::A,
		Node::element("div", Facts::new().on("click", Handler::emit(Inner::Clicked)), vec![button(inner)]),
	)
}

#[test]
fn events_bubble() {
	let (_body, reconciler, received) = mount(nested(Handler::may_stop_propagation(|_| {
		Some((Box::new(Inner::Clicked) as Message, false))
	})));
	let inner = reconciler.root().children().remove(0);

	let propagation = reconciler.host().dispatch_event(&inner, "click", &());
	assert!(!propagation.stop_propagation);
	assert_eq!(*received.borrow(), [Outer::A(Inner::Clicked), Outer::A(Inner::Clicked)]);
}

#[test]
fn stopped_events_dont_bubble() {
	let (_body, reconciler, received) = mount(nested(Handler::may_stop_propagation(|_| {
		Some((Box::new(Inner::Clicked) as Message, true))
	})));
	let inner = reconciler.root().children().remove(0);

	let propagation = reconciler.host().dispatch_event(&inner, "click", &());
	assert!(propagation.stop_propagation);
	assert_eq!(received.borrow().len(), 1);
}

#[test]
fn ignored_events_still_bubble() {
	let (_body, reconciler, received) = mount(nested(Handler::normal(|_| None)));
	let inner = reconciler.root().children().remove(0);

	reconciler.host().dispatch_event(&inner, "click", &());
	assert_eq!(received.borrow().len(), 1);
}

#[test]
fn prevent_default_is_reported() {
	let (_body, reconciler, received) = mount(button(Handler::may_prevent_default(|event| {
		let prevent = *event.downcast_ref::<bool>()?;
		Some((Box::new(Outer::B(Inner::Clicked)) as Message, prevent))
	})));

	assert!(reconciler.host().dispatch_event(reconciler.root(), "click", &true).prevent_default);
	assert!(!reconciler.host().dispatch_event(reconciler.root(), "click", &false).prevent_default);
	assert!(!reconciler.host().dispatch_event(reconciler.root(), "click", &"not a bool").prevent_default);
	assert_eq!(received.borrow().len(), 2);
}

#[test]
fn lazy_subtrees_are_built_once_per_argument() {
	let builds = Rc::new(Cell::new(0));
	let lazy = |arg: &Rc<dyn Any>| {
		let builds = Rc::clone(&builds);
		let arg = Rc::clone(arg);
		Node::lazy(vec![Rc::clone(&arg)], move || {
			builds.set(builds.get() + 1);
			Node::text(format!("{}", arg.downcast_ref::<u32>().unwrap()))
		})
	};

	let first: Rc<dyn Any> = Rc::new(1_u32);
	let (_body, mut reconciler, _) = mount(lazy(&first));
	assert_eq!(builds.get(), 1);

	reconciler.update(lazy(&first));
	assert_eq!(builds.get(), 1);

	let second: Rc<dyn Any> = Rc::new(2_u32);
	reconciler.update(lazy(&second));
	assert_eq!(builds.get(), 2);
	assert_eq!(reconciler.root().text().as_deref(), Some("2"));
}

type Log = Rc<RefCell<Vec<String>>>;

fn mount_logged(tree: Node<MemoryDom>) -> (Reconciler<MemoryDom>, Log) {
	let host = MemoryDom::new();
	let body = host.create_element("body", None);
	let log = Log::default();
	let reconciler = Reconciler::mount(host, &body, tree, {
		let log = Rc::clone(&log);
		move |message: Message| log.borrow_mut().push(*message.downcast::<String>().unwrap())
	});
	(reconciler, log)
}

fn wrap(name: &'static str) -> Tag {
	Rc::new(move |message: Message| {
		let inner = message.downcast::<String>().map_or_else(|_| "?".to_owned(), |inner| *inner);
		Box::new(format!("{}({})", name, inner)) as Message
	})
}

/// `outer` around a lazy node whose content is a button, optionally under `inner`.
fn lazily_tagged(outer: &Tag, arg: &Rc<dyn Any>, inner: Option<&Tag>, event: &'static str) -> Node<MemoryDom> {
	let inner = inner.cloned();
	Node::map_rc(
		Rc::clone(outer),
		Node::lazy(vec![Rc::clone(arg)], move || {
			let button = Node::element("button", Facts::new().on(event, Handler::emit("1".to_owned())), vec![]);
			match &inner {
				Some(inner) => Node::map_rc(Rc::clone(inner), button),
				None => button,
			}
		}),
	)
}

#[test]
fn taggers_inside_lazy_nodes_retag_their_own_chain() {
	let (f, g, g2) = (wrap("f"), wrap("g"), wrap("g2"));
	let (first, second): (Rc<dyn Any>, Rc<dyn Any>) = (Rc::new(1_u32), Rc::new(2_u32));

	let (mut reconciler, log) = mount_logged(lazily_tagged(&f, &first, Some(&g), "click"));
	let button = reconciler.root().clone();
	reconciler.host().dispatch_event(&button, "click", &());

	reconciler.update(lazily_tagged(&f, &second, Some(&g2), "click"));
	assert_eq!(reconciler.root(), &button);
	reconciler.host().dispatch_event(&button, "click", &());

	assert_eq!(*log.borrow(), ["f(g(1))", "f(g2(1))"]);
}

#[test]
fn listeners_added_inside_lazy_nodes_keep_every_tagger() {
	let (f, g) = (wrap("f"), wrap("g"));
	let (first, second): (Rc<dyn Any>, Rc<dyn Any>) = (Rc::new(1_u32), Rc::new(2_u32));

	let (mut reconciler, log) = mount_logged(lazily_tagged(&f, &first, Some(&g), "click"));
	reconciler.update(lazily_tagged(&f, &second, Some(&g), "input"));
	assert_eq!(reconciler.root().listener_names(), ["input"]);

	reconciler.host().dispatch_event(reconciler.root(), "input", &());
	assert_eq!(*log.borrow(), ["f(g(1))"]);
}

#[test]
fn outer_taggers_survive_inner_redraws() {
	let (f, f2, g) = (wrap("f"), wrap("f2"), wrap("g"));
	let (first, second): (Rc<dyn Any>, Rc<dyn Any>) = (Rc::new(1_u32), Rc::new(2_u32));

	let (mut reconciler, log) = mount_logged(lazily_tagged(&f, &first, Some(&g), "click"));
	let old = reconciler.root().clone();

	// The inner tagger goes away, so the button is redrawn.
	reconciler.update(lazily_tagged(&f, &second, None, "click"));
	assert_ne!(reconciler.root(), &old);
	reconciler.host().dispatch_event(reconciler.root(), "click", &());

	reconciler.update(lazily_tagged(&f2, &second, None, "click"));
	reconciler.host().dispatch_event(reconciler.root(), "click", &());

	reconciler.update(lazily_tagged(&f2, &first, Some(&g), "click"));
	reconciler.host().dispatch_event(reconciler.root(), "click", &());

	assert_eq!(*log.borrow(), ["f(1)", "f2(1)", "f2(g(1))"]);
}

fn clickable(id: &'static str) -> Node<MemoryDom> {
	Node::element(
		"button",
		Facts::new().attribute("id", id).on("click", Handler::emit(Outer::A(Inner::Clicked))),
		vec![Node::map_with(Outer::B, Node::element("span", Facts::new().on("click", Handler::emit(Inner::Clicked)), vec![]))],
	)
}

#[test]
fn removed_trailing_children_are_released() {
	let (_body, mut reconciler, received) = mount(Node::element("div", Facts::new(), vec![clickable("a"), clickable("b")]));
	let removed = reconciler.root().children().remove(1);
	let span = removed.children().remove(0);
	assert!(reconciler.host().stashed_event_node(&span).is_some());

	reconciler.update(Node::element("div", Facts::new(), vec![clickable("a")]));

	assert!(removed.listener_names().is_empty());
	assert!(span.listener_names().is_empty());
	assert!(reconciler.host().stashed_event_node(&span).is_none());
	assert_eq!(removed.children(), [span.clone()], "Released nodes keep their structure.");
	reconciler.host().dispatch_event(&span, "click", &());
	assert!(received.borrow().is_empty());
}

#[test]
fn removed_keyed_children_are_released() {
	let list = |ids: &[&'static str]| Node::keyed("div", Facts::new(), ids.iter().map(|&id| (Key::from(id), clickable(id))).collect());
	let (_body, mut reconciler, _) = mount(list(&["a", "b", "c"]));
	let removed = reconciler.root().children().remove(1);

	reconciler.update(list(&["a", "c"]));

	assert_eq!(removed.attribute("id").as_deref(), Some("b"));
	assert!(removed.listener_names().is_empty());
	assert!(removed.children()[0].listener_names().is_empty());
	for kept in reconciler.root().children() {
		assert_eq!(kept.listener_names(), ["click"]);
	}
}

#[test]
fn redrawn_nodes_are_released() {
	let (_body, mut reconciler, received) = mount(Node::element("div", Facts::new(), vec![clickable("a")]));
	let old = reconciler.root().children().remove(0);

	reconciler.update(Node::element("div", Facts::new(), vec![Node::text("a")]));

	assert!(old.listener_names().is_empty());
	assert!(old.children()[0].listener_names().is_empty());
	reconciler.host().dispatch_event(&old, "click", &());
	assert!(received.borrow().is_empty());
}

#[test]
fn equal_facts_produce_no_patches() {
	let tree = || Node::<MemoryDom>::element("div", Facts::new().attribute("id", "a").style("color", "red"), vec![Node::text("x")]);
	assert!(xylem_dom::diff(&tree(), &tree()).is_empty());
}

#[test]
fn classes_accumulate() {
	let (_body, mut reconciler, _) = mount(Node::element("div", Facts::new().attribute("class", "a").attribute("class", "b"), vec![]));
	assert_eq!(reconciler.root().attribute("class").as_deref(), Some("a b"));

	reconciler.update(Node::element("div", Facts::new().attribute("class", "c"), vec![]));
	assert_eq!(reconciler.root().attribute("class").as_deref(), Some("c"));
}

#[test]
fn unsafe_facts_are_neutralised() {
	let (_body, reconciler, _) = mount(Node::element(
		"script",
		Facts::new().attribute("onclick", "alert(1)").attribute("href", "javascript:alert(1)"),
		vec![],
	));
	let root = reconciler.root();
	assert_eq!(root.tag().as_deref(), Some("p"));
	assert_eq!(root.attribute("onclick"), None);
	assert_eq!(root.attribute("href").as_deref(), Some(""));
}

struct Counter;
impl Widget<MemoryDom> for Counter {
	fn render(&self, host: &MemoryDom, model: &dyn Any) -> MemoryNode {
		let live = host.create_element("output", None);
		host.set_text_content(&live, &model.downcast_ref::<u32>().unwrap().to_string());
		live
	}

	fn diff(&self, old: &dyn Any, new: &dyn Any) -> Option<CustomPatch<MemoryDom>> {
		let new = *new.downcast_ref::<u32>().unwrap();
		(*old.downcast_ref::<u32>().unwrap() != new).then(|| {
			Box::new(move |host: &MemoryDom, live: &MemoryNode| {
				host.set_text_content(live, &new.to_string());
				live.clone()
			}) as CustomPatch<MemoryDom>
		})
	}
}

#[test]
fn widgets_patch_themselves() {
	let widget: Rc<dyn Widget<MemoryDom>> = Rc::new(Counter);
	let counter = |count: u32| Node::element("div", Facts::new(), vec![Node::custom(Facts::new().attribute("id", "counter"), Rc::new(count), Rc::clone(&widget))]);

	let (_body, mut reconciler, _) = mount(counter(1));
	let live = reconciler.root().children().remove(0);
	assert_eq!(reconciler.host().to_html(&live), "<output id=\"counter\">1</output>");

	reconciler.update(counter(2));
	assert_eq!(reconciler.root().children(), [live.clone()]);
	assert_eq!(reconciler.host().to_html(&live), "<output id=\"counter\">2</output>");

	reconciler.update(counter(2));
	assert_eq!(reconciler.host().to_html(&live), "<output id=\"counter\">2</output>");
}

#[test]
fn other_widgets_redraw() {
	let (_body, mut reconciler, _) = mount(Node::element("div", Facts::new(), vec![Node::custom(Facts::new(), Rc::new(1_u32), Rc::new(Counter) as Rc<dyn Widget<MemoryDom>>)]));
	let live = reconciler.root().children().remove(0);

	reconciler.update(Node::element("div", Facts::new(), vec![Node::custom(Facts::new(), Rc::new(1_u32), Rc::new(Counter) as Rc<dyn Widget<MemoryDom>>)]));

	let redrawn = reconciler.root().children().remove(0);
	assert_ne!(redrawn, live);
	assert_eq!(reconciler.host().to_html(&redrawn), "<output>1</output>");
}

#[test]
fn root_redraws_replace_the_root() {
	let (body, mut reconciler, _) = mount(Node::element("div", Facts::new(), vec![]));
	let old = reconciler.root().clone();

	reconciler.update(Node::text("replaced"));

	assert_ne!(reconciler.root(), &old);
	assert_eq!(body.children(), [reconciler.root().clone()]);
	assert_eq!(reconciler.host().to_html(&body), "<body>replaced</body>");
}

#[test]
fn hydration_keeps_existing_nodes() {
	let host = MemoryDom::new();
	let existing = host.create_element("DIV", None);
	host.set_attribute(&existing, "id", "old");
	host.append_child(&existing, &host.create_text_node("old"));
	let text = existing.children().remove(0);
	let created = host.created();

	let mut reconciler = Reconciler::hydrate(host, existing.clone(), |_| ());
	reconciler.update(Node::element(
		"div",
		Facts::new().attribute("id", "new").on("click", Handler::emit(())),
		vec![Node::text("new")],
	));

	assert_eq!(reconciler.root(), &existing);
	assert_eq!(existing.attribute("id").as_deref(), Some("new"));
	assert_eq!(existing.children(), [text.clone()]);
	assert_eq!(text.text().as_deref(), Some("new"));
	assert_eq!(existing.listener_names(), ["click"]);
	assert_eq!(reconciler.host().created(), created);
}

#[test]
#[should_panic(expected = "Unknown patch kind")]
fn keyed_removals_outside_reorders_are_fatal() {
	let host = MemoryDom::new();
	let event_node = EventNode::root(|_| ());
	let old = Node::text("a");
	let root = render(&host, &old, &event_node);

	let mut patches = vec![Patch::new(0, PatchKind::Remove(EntryId(0)))];
	resolve_targets(&host, &root, &old, &mut patches, &event_node);
	apply(&host, &root, patches);
}

#[test]
#[should_panic(expected = "never resolved")]
fn unresolved_patches_are_fatal() {
	let host = MemoryDom::new();
	let event_node = EventNode::root(|_| ());
	let old = Node::text("a");
	let root = render(&host, &old, &event_node);

	let mut patches = vec![Patch::new(5, PatchKind::Text("b".to_owned()))];
	resolve_targets(&host, &root, &old, &mut patches, &event_node);
	apply(&host, &root, patches);
}
