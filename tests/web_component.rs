#![cfg(target_arch = "wasm32")]

use cambium_dom::{BindingKind, Component, Options, Outcome, RenderError, Rendered, Runtime, Store};
use serde_json::json;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

use web_fixture_::{container, options, registry};

fn new_runtime(options: Options) -> Runtime {
	Runtime::with_registry(options, Some(registry()))
}

#[wasm_bindgen_test]
fn renders_are_debounced() {
	let runtime = new_runtime(options());
	let container = container();
	let component = Component::new(&runtime, &container, BindingKind::Diff, || "<p>hi</p>");

	component.render();
	component.render();
	assert!(component.is_render_pending());
	assert_eq!(container.inner_html(), "");

	component.render_now().unwrap();
	assert_eq!(container.inner_html(), "<p>hi</p>");

	component.start();
	assert!(component.is_render_pending());
	component.stop();
	assert!(!component.is_render_pending());
}

#[wasm_bindgen_test]
fn store_changes_request_renders() {
	let runtime = new_runtime(options());
	let container = container();
	let todos = Store::new("todos", json!(["Buy milk", "Bake cake"]));

	let component = Component::new(&runtime, &container, BindingKind::Diff, {
		let todos = todos.clone();
		move || {
			let items: String = todos.get().as_array().unwrap().iter().map(|item| format!("<li>{}</li>", item.as_str().unwrap())).collect();
			format!("<ul>{}</ul>", items)
		}
	});
	component.listen(&todos);
	component.render_now().unwrap();
	assert!(!component.is_render_pending());

	todos.set("/-", json!("Go apple picking")).unwrap();
	assert!(!component.is_render_pending(), "not started yet");

	component.start();
	component.render_now().unwrap();
	assert_eq!(container.query_selector_all("li").unwrap().length(), 3);

	todos.set("/0", json!("Buy oat milk")).unwrap();
	assert!(component.is_render_pending());

	component.stop();
	assert_eq!(todos.subscriber_count(), 0);
}

#[wasm_bindgen_test]
fn attached_components_render_after_their_parent() {
	let runtime = new_runtime(options());
	let (parent_container, child_container) = (container(), container());
	let parent = Component::new(&runtime, &parent_container, BindingKind::Diff, || "<p>parent</p>");
	let child = Component::new(&runtime, &child_container, BindingKind::Diff, || "<p>child</p>");

	assert!(parent.attach(&child));
	assert!(!parent.attach(&child));
	parent.render_now().unwrap();
	assert_eq!(child_container.inner_html(), "<p>child</p>");

	child_container.set_inner_html("");
	assert!(parent.detach(&child));
	parent.render_now().unwrap();
	assert_eq!(child_container.inner_html(), "");
}

#[wasm_bindgen_test]
fn cycles_are_reported_and_skipped() {
	let runtime = new_runtime(options());
	let (a_container, b_container) = (container(), container());
	let a = Component::new(&runtime, &a_container, BindingKind::Diff, || "<p>a</p>");
	let b = Component::new(&runtime, &b_container, BindingKind::Diff, || "<p>b</p>");
	a.attach(&b);
	b.attach(&a);

	assert_eq!(a.render_now(), Err(RenderError::Cycle { component: a.id(), attached: b.id() }));
	assert_eq!(a_container.inner_html(), "<p>a</p>");
	assert_eq!(b_container.inner_html(), "");

	let production = new_runtime(Options { debug: false, ..options() });
	let c = Component::new(&production, &a_container, BindingKind::Diff, || "<p>c</p>");
	let d = Component::new(&production, &b_container, BindingKind::Diff, || "<p>d</p>");
	c.attach(&d);
	d.attach(&c);
	assert!(matches!(c.render_now(), Ok(Outcome::Committed(_))));
	assert_eq!(b_container.inner_html(), "");
}

#[wasm_bindgen_test]
fn template_output() {
	let runtime = new_runtime(options());
	let container = container();

	let component = Component::without_template(&runtime, &container, BindingKind::Diff);
	assert_eq!(component.render_now(), Err(RenderError::MissingTemplate));

	component.set_template(|| 42);
	component.render_now().unwrap();
	assert_eq!(container.inner_html(), "42");

	component.set_template(|| Rendered::Nothing);
	assert_eq!(component.render_now(), Ok(Outcome::Skipped));
	assert_eq!(container.inner_html(), "42");

	component.clear_template();
	let production = Component::without_template(&new_runtime(Options { debug: false, ..options() }), &container, BindingKind::Diff);
	assert_eq!(production.render_now(), Ok(Outcome::Skipped));
}
