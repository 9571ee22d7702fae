#![cfg(target_arch = "wasm32")]

use cambium_dom::{render, DiffReport, Differ, Outcome};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{Element, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

use web_fixture_::{children, container, count_mutations, document, options};

fn committed(outcome: Outcome) -> DiffReport {
	match outcome {
		Outcome::Committed(report) => report,
		other => panic!("Expected a committed render, got {:?}", other),
	}
}

#[wasm_bindgen_test]
fn second_render_is_a_no_op() {
	let container = container();
	let markup = r#"<section class="a b" style="color: red; margin: 1px" data-x="1">
		<h1 id="title">Hi</h1>
		<p>Some <b>bold</b> text</p>
		<input value="x" checked>
		<ul><li key="1">One</li><li key="2">Two</li></ul>
		<!-- note -->
	</section>"#;

	let first = committed(render(&container, markup, &options(), None).unwrap());
	assert!(!first.is_empty());

	let mut second = None;
	let mutations = count_mutations(&container, || second = Some(render(&container, markup, &options(), None).unwrap()));
	assert_eq!(mutations, 0);
	assert_eq!(second, Some(Outcome::Committed(DiffReport::default())));
}

#[wasm_bindgen_test]
fn moved_nodes_keep_their_identity() {
	let container = container();
	render(&container, r#"<div id="keep">kept</div><p>intro</p>"#, &options(), None).unwrap();
	let keep = container.query_selector("#keep").unwrap().unwrap();

	let report = committed(render(&container, r#"<p>intro</p><div id="keep">kept</div>"#, &options(), None).unwrap());
	assert_eq!(report.moved, 1);
	assert_eq!(report.inserted, 0);
	assert_eq!(report.removed, 0);

	assert_eq!(container.query_selector_all("#keep").unwrap().length(), 1);
	assert!(container.query_selector("#keep").unwrap().unwrap().is_same_node(Some(&keep)));
	assert_eq!(container.first_element_child().unwrap().tag_name(), "P");
}

#[wasm_bindgen_test]
fn keyed_nodes_are_found_beyond_the_lookahead() {
	let container = container();
	let options = cambium_dom::Options {
		lookahead_limit: 0,
		..options()
	};
	render(&container, r#"<p>a</p><p>b</p><p>c</p><div key="far">far</div>"#, &options, None).unwrap();
	let far = container.query_selector("[key=far]").unwrap().unwrap();

	let report = committed(render(&container, r#"<div key="far">far</div><p>a</p><p>b</p><p>c</p>"#, &options, None).unwrap());
	assert_eq!(report.moved, 1);
	assert_eq!(report.inserted, 0);
	assert!(container.first_element_child().unwrap().is_same_node(Some(&far)));
}

#[wasm_bindgen_test]
fn attributes_round_trip() {
	let container = container();
	render(&container, r#"<p class="a b" data-x="1" title="t">x</p>"#, &options(), None).unwrap();
	let p = container.first_element_child().unwrap();

	render(&container, r#"<p class="a" data-x="2">x</p>"#, &options(), None).unwrap();
	assert!(container.first_element_child().unwrap().is_same_node(Some(&p)));
	assert_eq!(p.class_list().length(), 1);
	assert!(p.class_list().contains("a"));
	assert_eq!(p.get_attribute("data-x").as_deref(), Some("2"));
	assert_eq!(p.attributes().length(), 2);
}

#[wasm_bindgen_test]
fn styles_are_diffed_per_property() {
	let container = container();
	render(&container, r#"<p style="color: red; margin: 1px">x</p>"#, &options(), None).unwrap();
	let p = container.first_element_child().unwrap().dyn_into::<HtmlElement>().unwrap();

	render(&container, r#"<p style="color: blue; margin: 1px">x</p>"#, &options(), None).unwrap();
	assert_eq!(p.style().get_property_value("color").unwrap(), "blue");
	assert_eq!(p.style().get_property_value("margin").unwrap(), "1px");
}

#[wasm_bindgen_test]
fn outside_classes_and_styles_are_reverted() {
	let container = container();
	let markup = r#"<p class="a" style="color: red">x</p>"#;
	render(&container, markup, &options(), None).unwrap();
	let p = container.first_element_child().unwrap().dyn_into::<HtmlElement>().unwrap();
	p.class_list().add_1("outside").unwrap();
	p.style().set_property("padding-top", "2px").unwrap();

	let report = committed(render(&container, markup, &options(), None).unwrap());
	assert_eq!(report, DiffReport { attributes: 2, ..DiffReport::default() });
	assert_eq!(p.class_name(), "a");
	assert_eq!(p.style().get_property_value("color").unwrap(), "red");
	assert_eq!(p.style().get_property_value("padding-top").unwrap(), "");
}

#[wasm_bindgen_test]
fn text_is_patched_in_place() {
	let container = container();
	render(&container, "<p>Hello</p>", &options(), None).unwrap();
	let text = container.first_element_child().unwrap().first_child().unwrap();

	let report = committed(render(&container, "<p>World</p>", &options(), None).unwrap());
	assert_eq!(report, DiffReport { text: 1, ..DiffReport::default() });
	assert!(container.first_element_child().unwrap().first_child().unwrap().is_same_node(Some(&text)));
	assert_eq!(container.text_content().unwrap(), "World");
}

#[wasm_bindgen_test]
fn different_kinds_are_replaced() {
	let container = container();
	render(&container, "<p>x</p>", &options(), None).unwrap();

	let report = committed(render(&container, "<h2>x</h2>", &options(), None).unwrap());
	assert_eq!(report.inserted, 1);
	assert_eq!(report.removed, 1);
	assert_eq!(container.inner_html(), "<h2>x</h2>");
}

#[wasm_bindgen_test]
fn collapse_and_expand() {
	let container = container();
	render(&container, "<div><p>a</p></div>", &options(), None).unwrap();
	let div = container.first_element_child().unwrap();

	render(&container, "<div></div>", &options(), None).unwrap();
	assert!(!div.has_child_nodes());

	let report = committed(render(&container, "<div><p>b</p><p>c</p></div>", &options(), None).unwrap());
	assert_eq!(report.inserted, 2);
	assert!(container.first_element_child().unwrap().is_same_node(Some(&div)));
	assert_eq!(div.inner_html(), "<p>b</p><p>c</p>");
}

#[wasm_bindgen_test]
fn shrinking_lists_are_trimmed() {
	let container = container();
	render(&container, "<ul><li>1</li><li>2</li><li>3</li><li>4</li><li>5</li></ul>", &options(), None).unwrap();
	let ul = container.first_element_child().unwrap();

	let report = committed(render(&container, "<ul><li>1</li><li>2</li></ul>", &options(), None).unwrap());
	assert_eq!(report.removed, 3);
	assert_eq!(children(&ul).len(), 2);
}

#[wasm_bindgen_test]
fn custom_element_content_is_left_alone() {
	let container = container();
	render(&container, "<my-widget><span>light</span></my-widget>", &options(), None).unwrap();
	let widget = container.first_element_child().unwrap();
	widget.set_inner_html("<b>own</b>");

	render(&container, r#"<my-widget title="t"><span>light</span></my-widget>"#, &options(), None).unwrap();
	assert_eq!(widget.inner_html(), "<b>own</b>");
	assert_eq!(widget.get_attribute("title").as_deref(), Some("t"));
}

#[wasm_bindgen_test]
fn ignored_elements_are_only_positioned() {
	let container = container();
	render(&container, r#"<div cambium-ignore class="a">x</div>"#, &options(), None).unwrap();
	let div: Element = container.first_element_child().unwrap();
	div.set_class_name("b");
	div.set_inner_html("<i>third party</i>");

	render(&container, r#"<p>before</p><div cambium-ignore class="a">x</div>"#, &options(), None).unwrap();
	assert!(container.last_element_child().unwrap().is_same_node(Some(&div)));
	assert_eq!(div.class_name(), "b");
	assert_eq!(div.inner_html(), "<i>third party</i>");
}

#[wasm_bindgen_test]
fn todo_list_end_to_end() {
	let container = container();
	let todos = vec!["Buy milk", "Bake cake"];
	let markup = |todos: &[&str]| format!("<ul>{}</ul>", todos.iter().map(|todo| format!("<li>{}</li>", todo)).collect::<String>());

	render(&container, &markup(&todos), &options(), None).unwrap();
	let ul = container.first_element_child().unwrap();
	let before = children(&ul);
	assert_eq!(before.len(), 2);
	assert_eq!(before[0].text_content().unwrap(), "Buy milk");
	assert_eq!(before[1].text_content().unwrap(), "Bake cake");

	let mut todos = todos;
	todos.push("Go apple picking");
	let report = committed(render(&container, &markup(&todos), &options(), None).unwrap());
	assert_eq!(report, DiffReport { inserted: 1, ..DiffReport::default() });

	let after = children(&ul);
	assert_eq!(after.len(), 3);
	assert!(after[0].is_same_node(Some(&before[0])));
	assert!(after[1].is_same_node(Some(&before[1])));
	assert_eq!(after[2].text_content().unwrap(), "Go apple picking");
}

#[wasm_bindgen_test]
fn rejected_insertions_stop_the_pass() {
	let document = document();
	let template = document.create_element("div").unwrap();
	template.set_inner_html("<p>a</p><p>b</p><p>c</p>");
	let text = document.create_text_node("can't have children");

	let options = options();
	let report = Differ::new(&document, &options, None).reconcile(&template, &text);
	assert_eq!(report, DiffReport::default());
	assert!(!text.has_child_nodes());
	assert_eq!(template.child_element_count(), 3);
}
