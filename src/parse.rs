//! Turning markup into a detached template tree.

use tracing::{instrument, trace, warn};
use wasm_bindgen::JsValue;
use web_sys::{Document, DomParser, Element, HtmlElement, SupportedType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
	/// Parsed by a full document parser; the result can be diffed node by node.
	Structural,
	/// Parsed by assigning `innerHTML` on a scratch element, so the live tree should be replaced wholesale.
	Degraded,
}

/// A detached tree whose `container`'s children are the rendered top-level nodes.
#[derive(Debug, Clone)]
pub struct Template {
	pub container: Element,
	pub mode: ParseMode,
}

/// Parses `markup` as a body fragment.
///
/// Elements the HTML parser would hoist into `<head>` (`<style>`, `<meta>`, `<link>`, …) are moved back to the front of
/// the body in their original order, so that the template lists them where the author wrote them.
///
/// Falls back to [`ParseMode::Degraded`] if no document parser is available, using `document` to create the scratch
/// element. Only fails if that isn't possible either.
#[instrument(skip(document, markup))]
pub fn parse(document: &Document, markup: &str) -> Result<Template, JsValue> {
	match parse_structural(markup) {
		Ok(container) => Ok(Template {
			container: container.into(),
			mode: ParseMode::Structural,
		}),
		Err(error) => {
			warn!("Falling back to innerHTML parsing: {:?}", error);
			let container = document.create_element("div")?;
			container.set_inner_html(markup);
			Ok(Template { container, mode: ParseMode::Degraded })
		}
	}
}

fn parse_structural(markup: &str) -> Result<HtmlElement, JsValue> {
	let parsed = DomParser::new()?.parse_from_string(markup, SupportedType::TextHtml)?;
	let body = parsed.body().ok_or_else(|| JsValue::from_str("parsed document has no body"))?;

	if let Some(head) = parsed.head() {
		let first = body.first_child();
		let mut hoisted = 0_usize;
		while let Some(child) = head.first_child() {
			body.insert_before(&child, first.as_ref())?;
			hoisted += 1;
		}
		if hoisted > 0 {
			trace!("Moved {} node(s) out of the implied <head>.", hoisted);
		}
	}

	Ok(body)
}
