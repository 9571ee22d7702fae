//! Snapshots of live DOM state as owned Rust values.
//!
//! [***childNodes***](https://developer.mozilla.org/en-US/docs/Web/API/Node/childNodes) and
//! [***attributes***](https://developer.mozilla.org/en-US/docs/Web/API/Element/attributes) are live collections.
//! Everything that mutates while iterating copies them out first through the functions here.

use crate::{
	identity::{non_empty, Identity},
	options::Markers,
};
use wasm_bindgen::JsCast;
use web_sys::{Attr, Element, NamedNodeMap, Node, NodeList};

#[must_use]
pub fn child_nodes(node: &Node) -> Vec<Node> {
	load_node_list(&node.child_nodes())
}

#[must_use]
pub fn load_node_list(node_list: &NodeList) -> Vec<Node> {
	(0..node_list.length()).filter_map(|i| node_list.item(i)).collect()
}

/// `(name, value)` pairs in document order.
#[must_use]
pub fn attributes(element: &Element) -> Vec<(String, String)> {
	load_attributes(&element.attributes())
}

#[must_use]
pub fn load_attributes(attributes: &NamedNodeMap) -> Vec<(String, String)> {
	(0..attributes.length()).filter_map(|i| attributes.item(i)).map(|attribute| load_attribute(&attribute)).collect()
}

#[must_use]
pub fn load_attribute(attribute: &Attr) -> (String, String) {
	(attribute.name(), attribute.value())
}

#[must_use]
pub fn identity(node: &Node, markers: &Markers) -> Identity {
	match node.dyn_ref::<Element>() {
		Some(element) => Identity {
			node_type: node.node_type(),
			name: element.tag_name(),
			id: non_empty(element.get_attribute("id")),
			src: non_empty(element.get_attribute("src")),
			key: non_empty(element.get_attribute(&markers.key_attribute)),
		},
		None => Identity::plain(node.node_type(), node.node_name()),
	}
}

/// The text a leaf node holds, or [`None`] if the node has children of its own.
#[must_use]
pub fn leaf_content(node: &Node) -> Option<String> {
	if node.has_child_nodes() {
		None
	} else {
		Some(node.text_content().unwrap_or_default())
	}
}

#[must_use]
pub fn is_ignored(node: &Node, markers: &Markers) -> bool {
	node.dyn_ref::<Element>().map_or(false, |element| element.has_attribute(&markers.ignore_attribute))
}
