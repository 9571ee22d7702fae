#![cfg(target_arch = "wasm32")]

use cambium_dom::render;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{Element, HtmlInputElement};

wasm_bindgen_test_configure!(run_in_browser);

use web_fixture_::{container, options};

fn input(container: &Element) -> HtmlInputElement {
	container.query_selector("input").unwrap().unwrap().dyn_into().unwrap()
}

#[wasm_bindgen_test]
fn typed_values_survive() {
	let container = container();
	render(&container, r#"<input value="a">"#, &options(), None).unwrap();
	let field = input(&container);
	assert_eq!(field.value(), "a");

	field.set_value("typed");
	render(&container, r#"<input value="b">"#, &options(), None).unwrap();
	assert!(input(&container).is_same_node(Some(&field)));
	assert_eq!(field.value(), "typed");
}

#[wasm_bindgen_test]
fn toggled_checkboxes_survive() {
	let container = container();
	render(&container, r#"<input type="checkbox">"#, &options(), None).unwrap();
	let field = input(&container);

	field.set_checked(true);
	render(&container, r#"<input type="checkbox">"#, &options(), None).unwrap();
	assert!(field.checked());

	field.set_checked(false);
	render(&container, r#"<input type="checkbox" checked>"#, &options(), None).unwrap();
	assert!(!field.checked());
}

#[wasm_bindgen_test]
fn live_overrides_are_written_every_time() {
	let container = container();
	render(&container, r##"<input type="checkbox" #checked="true"><input #value="reset">"##, &options(), None).unwrap();
	let inputs = container.query_selector_all("input").unwrap();
	let checkbox: HtmlInputElement = inputs.item(0).unwrap().dyn_into().unwrap();
	let text: HtmlInputElement = inputs.item(1).unwrap().dyn_into().unwrap();
	assert!(checkbox.checked());
	assert_eq!(text.value(), "reset");
	assert!(!text.has_attribute("#value"));

	checkbox.set_checked(false);
	text.set_value("typed");
	render(&container, r##"<input type="checkbox" #checked="true"><input #value="reset">"##, &options(), None).unwrap();
	assert!(checkbox.checked());
	assert_eq!(text.value(), "reset");

	render(&container, r##"<input type="checkbox" #checked="false"><input #value="reset">"##, &options(), None).unwrap();
	assert!(!checkbox.checked());
}

#[wasm_bindgen_test]
fn defaults_only_apply_on_creation() {
	let container = container();
	render(&container, r#"<input @value="initial">"#, &options(), None).unwrap();
	let field = input(&container);
	assert_eq!(field.value(), "initial");
	assert!(!field.has_attribute("@value"));

	field.set_value("typed");
	render(&container, r#"<input @value="changed">"#, &options(), None).unwrap();
	assert_eq!(field.value(), "typed");
}

#[wasm_bindgen_test]
fn falsy_booleans_are_dropped_on_creation() {
	let container = container();
	render(&container, r#"<select><option value="1" selected="false">1</option><option value="2" selected="0">2</option></select>"#, &options(), None).unwrap();
	assert!(container.query_selector("[selected]").unwrap().is_none());
}
