use std::sync::{
	atomic::{AtomicUsize, Ordering},
	Arc,
};
use tracing::{span, Subscriber};
use tracing_subscriber::{
	layer::{Context, SubscriberExt},
	registry::LookupSpan,
	Layer, Registry,
};
use xylem_dom::{diff, memory::MemoryDom, Facts, Handler, Node};

/// Counts how often the differ looks at a node.
struct DiffSpanCounter(Arc<AtomicUsize>);
impl<S: Subscriber + for<'a> LookupSpan<'a>> Layer<S> for DiffSpanCounter {
	fn on_new_span(&self, attributes: &span::Attributes<'_>, _: &span::Id, _: Context<'_, S>) {
		if attributes.metadata().name() == "Diffing node" {
			self.0.fetch_add(1, Ordering::SeqCst);
		}
	}
}

fn count_visits(f: impl FnOnce()) -> usize {
	let count = Arc::new(AtomicUsize::new(0));
	let subscriber = Registry::default().with(DiffSpanCounter(Arc::clone(&count)));
	tracing::subscriber::with_default(subscriber, f);
	count.load(Ordering::SeqCst)
}

fn deep(depth: usize) -> Node<MemoryDom> {
	(0..depth).fold(Node::text("leaf"), |child, i| {
		Node::element(
			"div",
			Facts::new().attribute("data-depth", i.to_string()).on("click", Handler::emit(i)),
			vec![Node::text("before"), Node::map(|message| message, child), Node::text("after")],
		)
	})
}

#[test]
fn identical_trees_are_not_visited() {
	let tree = deep(50);
	let visits = count_visits(|| assert!(diff(&tree, &tree).is_empty()));
	assert_eq!(visits, 0);
}

#[test]
fn shared_subtrees_are_not_visited() {
	let shared = deep(20);
	let old = Node::element("main", Facts::new(), vec![shared.clone(), Node::text("a")]);
	let new = Node::element("main", Facts::new(), vec![shared, Node::text("b")]);
	let visits = count_visits(|| assert_eq!(diff(&old, &new).len(), 1));
	// `main` and the text node.
	assert_eq!(visits, 2);
}

#[test]
fn rebuilt_trees_are_visited() {
	let visits = count_visits(|| drop(diff(&deep(3), &deep(3))));
	assert!(visits > 0);
}
