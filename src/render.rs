//! The render entry point, with lifecycle events around each commit.

use crate::{
	diff::{DiffReport, Differ},
	error::{report, Outcome, RenderError},
	events::{parse_handler_attribute, EventRegistry},
	load,
	options::Options,
	parse::{self, ParseMode, Template},
	sanitize,
};
use tracing::{error, info, instrument, trace};
use wasm_bindgen::JsValue;
use web_sys::{CustomEvent, CustomEventInit, Document, Element, Node};

/// Where to render.
#[derive(Debug, Clone)]
pub enum Target {
	Element(Element),
	/// A CSS selector, resolved against the window's document on each render.
	Selector(String),
}

impl From<Element> for Target {
	fn from(element: Element) -> Self {
		Self::Element(element)
	}
}

impl From<&Element> for Target {
	fn from(element: &Element) -> Self {
		Self::Element(element.clone())
	}
}

impl From<String> for Target {
	fn from(selector: String) -> Self {
		Self::Selector(selector)
	}
}

impl From<&str> for Target {
	fn from(selector: &str) -> Self {
		Self::Selector(selector.to_owned())
	}
}

impl Target {
	fn resolve(&self) -> Result<(Document, Element), RenderError> {
		match self {
			Target::Element(element) => {
				let document = element.owner_document().ok_or(RenderError::MissingDocument)?;
				Ok((document, element.clone()))
			}
			Target::Selector(selector) => {
				let document = web_sys::window().and_then(|window| window.document()).ok_or(RenderError::MissingDocument)?;
				let element = document.query_selector(selector)?.ok_or_else(|| RenderError::MissingTarget { selector: selector.clone() })?;
				Ok((document, element))
			}
		}
	}
}

/// How rendered content is committed to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
	/// Content is text and replaces the target's children.
	Text,
	/// Sanitized markup replaces the target's children.
	Html,
	/// Markup replaces the target's children as is.
	HtmlUnsafe,
	/// Sanitized markup is diffed into the target.
	Diff,
	/// Markup is diffed into the target as is.
	DiffUnsafe,
}

impl BindingKind {
	#[must_use]
	pub fn sanitizes(self) -> bool {
		matches!(self, BindingKind::Html | BindingKind::Diff)
	}

	/// Renders `content` into `target` with this kind's strategy.
	///
	/// Dispatches the before-render event first (bailing with [`Outcome::Cancelled`] if it was cancelled) and the render
	/// event after committing. Failures are returned or logged according to [`Options::debug`].
	///
	/// # Errors
	///
	/// Iff `options.debug` is set and the target or document can't be found, or the host reports an error.
	#[instrument(skip(target, content, options, registry))]
	pub fn render(self, target: impl Into<Target>, content: &str, options: &Options, registry: Option<&EventRegistry>) -> Result<Outcome, RenderError> {
		self.try_render(&target.into(), content, options, registry).or_else(|error| report(error, options.debug))
	}

	fn try_render(self, target: &Target, content: &str, options: &Options, registry: Option<&EventRegistry>) -> Result<Outcome, RenderError> {
		let (document, element) = target.resolve()?;

		if !dispatch(&element, &options.before_render_event(), true)? {
			info!("Render cancelled by a before-render listener.");
			return Ok(Outcome::Cancelled);
		}

		let adjusted;
		let options = if options.sanitize == self.sanitizes() {
			options
		} else {
			adjusted = Options {
				sanitize: self.sanitizes(),
				..options.clone()
			};
			&adjusted
		};

		let report = self.commit(&document, &element, content, options, registry)?;
		dispatch(&element, &options.render_event(), false)?;
		Ok(Outcome::Committed(report))
	}

	fn commit(self, document: &Document, element: &Element, content: &str, options: &Options, registry: Option<&EventRegistry>) -> Result<DiffReport, RenderError> {
		Ok(match self {
			BindingKind::Text => replace_with_text(element, content, registry),
			BindingKind::Html => replace(document, &clean(document, content, options, registry)?.container, element, options, registry),
			BindingKind::HtmlUnsafe => replace(document, &parse::parse(document, content)?.container, element, options, registry),
			BindingKind::Diff => diff(document, &clean(document, content, options, registry)?, element, options, registry),
			BindingKind::DiffUnsafe => diff(document, &parse::parse(document, content)?, element, options, registry),
		})
	}
}

/// Renders `markup` into `target`, diffing against what's already there.
///
/// Sanitizes unless `options.sanitize` is off. `on*` attributes naming a handler in `registry` are bound through it.
///
/// # Errors
///
/// Iff `options.debug` is set and the target or document can't be found, or the host reports an error.
pub fn render(target: impl Into<Target>, markup: &str, options: &Options, registry: Option<&EventRegistry>) -> Result<Outcome, RenderError> {
	let kind = if options.sanitize { BindingKind::Diff } else { BindingKind::DiffUnsafe };
	kind.render(target, markup, options, registry)
}

/// Sanitizes while keeping `on*` attributes that name a registered handler.
fn clean(document: &Document, markup: &str, options: &Options, registry: Option<&EventRegistry>) -> Result<Template, JsValue> {
	sanitize::clean(document, markup, &options.markers, &|name, value| {
		registry.map_or(false, |registry| parse_handler_attribute(name, value).map_or(false, |(_, handler)| registry.has_handler(handler)))
	})
}

fn diff(document: &Document, template: &Template, element: &Element, options: &Options, registry: Option<&EventRegistry>) -> DiffReport {
	match template.mode {
		ParseMode::Structural => Differ::new(document, options, registry).reconcile(&template.container, element),
		ParseMode::Degraded => {
			trace!("Degraded parse; replacing instead of diffing.");
			replace(document, &template.container, element, options, registry)
		}
	}
}

/// Replaces `element`'s children with clones of `template_parent`'s.
fn replace(document: &Document, template_parent: &Node, element: &Element, options: &Options, registry: Option<&EventRegistry>) -> DiffReport {
	let mut report = DiffReport {
		removed: clear(element, registry),
		..DiffReport::default()
	};

	let fragment = document.create_document_fragment();
	for child in load::child_nodes(template_parent) {
		match document.import_node_with_deep(&child, true) {
			Ok(clone) => {
				crate::attributes::materialize(&clone, options, registry);
				match fragment.append_child(&clone) {
					Ok(_) => report.inserted += 1,
					Err(error) => error!("Could not append node: {:?}", error),
				}
			}
			Err(error) => error!("Could not clone template node: {:?}", error),
		}
	}

	if let Err(error) = element.append_child(&fragment) {
		error!("Could not append rendered nodes: {:?}", error);
	}
	report
}

fn replace_with_text(element: &Element, text: &str, registry: Option<&EventRegistry>) -> DiffReport {
	let is_same_text = {
		let children = load::child_nodes(element);
		match children.as_slice() {
			[] => text.is_empty(),
			[only] => only.node_type() == Node::TEXT_NODE && only.text_content().as_deref() == Some(text),
			_ => false,
		}
	};
	if is_same_text {
		return DiffReport::default();
	}

	let removed = clear(element, registry);
	element.set_text_content(Some(text));
	DiffReport {
		removed,
		text: 1,
		..DiffReport::default()
	}
}

/// Removes all of `element`'s children, unbinding them first. Returns how many there were.
fn clear(element: &Element, registry: Option<&EventRegistry>) -> usize {
	let children = load::child_nodes(element);
	if let Some(registry) = registry {
		registry.unbind_all(&children);
	}
	element.set_text_content(None);
	children.len()
}

/// Dispatches a bubbling lifecycle event with `element` as target and detail.
///
/// Returns `false` iff `cancelable` and a listener called `preventDefault()`.
fn dispatch(element: &Element, event_type: &str, cancelable: bool) -> Result<bool, JsValue> {
	let init = CustomEventInit::new();
	init.set_bubbles(true);
	init.set_cancelable(cancelable);
	init.set_detail(element);
	let event = CustomEvent::new_with_event_init_dict(event_type, &init)?;
	element.dispatch_event(&event)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn selectors_convert() {
		assert!(matches!(Target::from("#app"), Target::Selector(selector) if selector == "#app"));
		assert!(matches!(Target::from("main".to_owned()), Target::Selector(selector) if selector == "main"));
	}

	#[test]
	fn sanitizing_kinds() {
		assert!(BindingKind::Html.sanitizes());
		assert!(BindingKind::Diff.sanitizes());
		assert!(!BindingKind::HtmlUnsafe.sanitizes());
		assert!(!BindingKind::DiffUnsafe.sanitizes());
		assert!(!BindingKind::Text.sanitizes());
	}
}
