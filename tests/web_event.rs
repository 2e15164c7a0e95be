#![cfg(target_arch = "wasm32")]

use std::{cell::RefCell, rc::Rc};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlBodyElement, HtmlElement};
use xylem_dom::{web::DomHost, Facts, Handler, Node, Reconciler};

wasm_bindgen_test_configure!(run_in_browser);

static mut LOG_INITIALIZED: bool = false;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Message {
	Clicked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outer {
	Button(Message),
}

fn init_log() {
	unsafe {
		if !LOG_INITIALIZED {
			tracing_wasm::set_as_global_default();
			LOG_INITIALIZED = true;
		}
	}
}

#[wasm_bindgen_test]
fn click() {
	init_log();

	let document = window().unwrap().document().unwrap();
	let body = document.body().unwrap().dyn_into::<HtmlBodyElement>().unwrap();

	let received = Rc::new(RefCell::new(Vec::new()));

	let button = || {
		Node::map_with(
			Outer::Button,
			Node::element(
				"BUTTON",
				Facts::new().attribute("id", "test-button").on("click", Handler::emit(Message::Clicked)),
				vec![],
			),
		)
	};

	let mut reconciler = Reconciler::mount(DomHost::new(document.clone()), &body.into(), button(), {
		let received = Rc::clone(&received);
		move |message| received.borrow_mut().push(*message.downcast::<Outer>().unwrap())
	});
	assert!(received.borrow().is_empty());

	let element: HtmlElement = document.get_element_by_id("test-button").unwrap().dyn_into().unwrap();
	element.click();
	assert_eq!(*received.borrow(), [Outer::Button(Message::Clicked)]);

	// New handler and tagger closures, same live listener.
	reconciler.update(button());
	element.click();
	assert_eq!(received.borrow().len(), 2);

	reconciler.update(Node::map_with(
		Outer::Button,
		Node::element("BUTTON", Facts::new().attribute("id", "test-button"), vec![]),
	));
	element.click();
	assert_eq!(received.borrow().len(), 2);

	element.remove();
}

#[wasm_bindgen_test]
fn removed_buttons_stop_listening() {
	init_log();

	let document = window().unwrap().document().unwrap();
	let body = document.body().unwrap().dyn_into::<HtmlBodyElement>().unwrap();

	let received = Rc::new(RefCell::new(Vec::new()));

	let container = |buttons: usize| {
		Node::element(
			"DIV",
			Facts::new().attribute("id", "removal-container"),
			(0..buttons)
				.map(|i| {
					Node::element(
						"BUTTON",
						Facts::new().attribute("id", format!("removal-button-{}", i)).on("click", Handler::emit(Message::Clicked)),
						vec![],
					)
				})
				.collect(),
		)
	};

	let mut reconciler = Reconciler::mount(DomHost::new(document.clone()), &body.into(), container(2), {
		let received = Rc::clone(&received);
		move |message| received.borrow_mut().push(*message.downcast::<Message>().unwrap())
	});

	let removed: HtmlElement = document.get_element_by_id("removal-button-1").unwrap().dyn_into().unwrap();
	removed.click();
	assert_eq!(received.borrow().len(), 1);

	reconciler.update(container(1));
	assert!(document.get_element_by_id("removal-button-1").is_none());

	// Detached elements still dispatch clicks.
	removed.click();
	assert_eq!(received.borrow().len(), 1);

	let kept: HtmlElement = document.get_element_by_id("removal-button-0").unwrap().dyn_into().unwrap();
	kept.click();
	assert_eq!(received.borrow().len(), 2);

	document.get_element_by_id("removal-container").unwrap().remove();
}
