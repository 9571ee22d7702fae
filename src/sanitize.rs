//! Best-effort markup cleaning.
//!
//! This is a denylist, not a policy engine: `<script>` elements, inline event handlers and script-bearing URLs are
//! removed, everything else passes. Disallowed content is dropped silently.

use crate::{
	attributes::classify,
	load,
	options::Markers,
	parse::{self, Template},
};
use tracing::{debug, instrument, trace};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Node};

/// Attributes whose value is navigated to or fetched.
const URI_ATTRIBUTES: &[&str] = &["src", "href", "xlink:href", "action", "formaction"];

/// Schemes that run script when navigated to or embedded.
const DANGEROUS_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:text/html"];

#[must_use]
pub fn is_event_handler_name(name: &str) -> bool {
	name.len() > 2 && name.starts_with("on")
}

/// Whether setting `name="value"` on a live element could execute script.
///
/// `name` must already be stripped of any marker prefix.
#[must_use]
pub fn is_dangerous(name: &str, value: &str) -> bool {
	let name = name.to_ascii_lowercase();
	if is_event_handler_name(&name) {
		return true;
	}

	if URI_ATTRIBUTES.contains(&name.as_str()) {
		// Browsers ignore embedded whitespace and control characters in schemes.
		let value: String = value.chars().filter(|c| !c.is_whitespace() && !c.is_control()).collect::<String>().to_ascii_lowercase();
		return DANGEROUS_SCHEMES.iter().any(|scheme| value.contains(scheme));
	}

	false
}

/// Parses and cleans `markup` in one go, so the result can be diffed without re-parsing.
///
/// `allow` may exempt otherwise dangerous attributes. It receives the unprefixed name and the value and is used to keep
/// `on*` attributes that name a registered handler.
#[instrument(skip(document, markup, allow))]
pub fn clean(document: &Document, markup: &str, markers: &Markers, allow: &dyn Fn(&str, &str) -> bool) -> Result<Template, JsValue> {
	let template = parse::parse(document, markup)?;
	clean_node(template.container.as_ref(), markers, allow);
	Ok(template)
}

/// Like [`clean`], but serializes the result back to markup.
pub fn clean_to_string(document: &Document, markup: &str, markers: &Markers) -> Result<String, JsValue> {
	Ok(clean(document, markup, markers, &|_, _| false)?.container.inner_html())
}

/// Removes `<script>` elements and dangerous attributes from `root`'s subtree.
///
/// If `root` is an element, its own attributes are cleaned too.
#[instrument(skip(root, allow))]
pub fn clean_node(root: &Node, markers: &Markers, allow: &dyn Fn(&str, &str) -> bool) {
	let elements = match root.dyn_ref::<Element>() {
		Some(element) => {
			let mut elements = vec![element.clone()];
			if let Ok(descendants) = element.query_selector_all("*") {
				elements.extend(load::load_node_list(&descendants).into_iter().filter_map(|node| node.dyn_into::<Element>().ok()));
			}
			elements
		}
		None => load::child_nodes(root).into_iter().filter_map(|node| node.dyn_into::<Element>().ok()).collect(),
	};

	let mut removed_scripts = 0_usize;
	let mut removed_attributes = 0_usize;
	for element in elements {
		if element.tag_name().eq_ignore_ascii_case("script") {
			element.remove();
			removed_scripts += 1;
			continue;
		}

		for (name, value) in load::attributes(&element) {
			let plain = classify(&name, markers).plain();
			if is_dangerous(plain, &value) && !allow(plain, &value) {
				trace!("Removing attribute {:?}", name);
				if element.remove_attribute(&name).is_ok() {
					removed_attributes += 1;
				}
			}
		}
	}

	if removed_scripts + removed_attributes > 0 {
		debug!("Sanitizer removed {} script element(s) and {} attribute(s).", removed_scripts, removed_attributes);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn handlers_are_dangerous() {
		assert!(is_dangerous("onclick", "alert(1)"));
		assert!(is_dangerous("ONLOAD", "x"));
		assert!(!is_dangerous("on", "x"));
		assert!(!is_dangerous("title", "onclick"));
	}

	#[test]
	fn script_urls_are_dangerous() {
		assert!(is_dangerous("href", "javascript:alert(1)"));
		assert!(is_dangerous("href", " JaVa\tScRiPt:alert(1)"));
		assert!(is_dangerous("src", "data:text/html;base64,PHNjcmlwdD4="));
		assert!(is_dangerous("xlink:href", "javascript:void(0)"));
	}

	#[test]
	fn ordinary_urls_pass() {
		assert!(!is_dangerous("href", "https://example.com/?q=javascript"));
		assert!(!is_dangerous("src", "data:image/png;base64,AAAA"));
		assert!(!is_dangerous("title", "javascript:alert(1)"));
	}
}
