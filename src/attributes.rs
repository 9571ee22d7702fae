//! Attribute reconciliation.
//!
//! Deciding what to change ([`plan`]) is kept apart from touching the DOM ([`reconcile`], [`materialize`]).
//!
//! Form state is special: `value`, `checked` and `selected` on `<input>`, `<textarea>` and `<option>` reflect what the
//! user did, so plain template attributes of those names are ignored on such fields in *both* directions. They are
//! neither set nor removed. The live prefix (`#value`) opts back in and writes the property on every render.

use crate::{
	events::{parse_handler_attribute, EventRegistry},
	load,
	options::{Markers, Options},
	sanitize::{is_dangerous, is_event_handler_name},
};
use hashbrown::HashSet;
use js_sys::Reflect;
use tracing::{error, instrument, trace, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlElement, Node};

/// Strings a template may produce for a boolean attribute that should count as "off".
pub const FALSY_TOKENS: &[&str] = &["false", "null", "undefined", "0", "-0", "NaN", "0n", "-0n"];

const FORM_FIELDS: &[&str] = &["input", "textarea", "option"];
const LIVE_PROPERTIES: &[&str] = &["value", "checked", "selected"];
const BOOLEAN_PROPERTIES: &[&str] = &["checked", "selected"];

/// An attribute name with its marker prefix, if any, resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeName<'a> {
	Plain(&'a str),
	/// Only applied when the element is created.
	DefaultOnly(&'a str),
	/// Applied to the live property as well, on every render.
	Live(&'a str),
}

impl<'a> AttributeName<'a> {
	/// The name without marker.
	#[must_use]
	pub fn plain(self) -> &'a str {
		match self {
			AttributeName::Plain(name) | AttributeName::DefaultOnly(name) | AttributeName::Live(name) => name,
		}
	}
}

#[must_use]
pub fn classify<'a>(name: &'a str, markers: &Markers) -> AttributeName<'a> {
	let mut chars = name.chars();
	match chars.next() {
		Some(c) if c == markers.default_prefix && !chars.as_str().is_empty() => AttributeName::DefaultOnly(chars.as_str()),
		Some(c) if c == markers.live_prefix && !chars.as_str().is_empty() => AttributeName::Live(chars.as_str()),
		_ => AttributeName::Plain(name),
	}
}

#[must_use]
pub fn is_falsy_token(value: &str) -> bool {
	FALSY_TOKENS.contains(&value)
}

#[must_use]
pub fn is_form_field(tag_name: &str) -> bool {
	FORM_FIELDS.iter().any(|field| field.eq_ignore_ascii_case(tag_name))
}

fn is_live_property(name: &str) -> bool {
	LIVE_PROPERTIES.contains(&name)
}

fn is_boolean_property(name: &str) -> bool {
	BOOLEAN_PROPERTIES.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
	/// Set the attribute, and with `live` also the matching property.
	Set { name: String, value: String, live: bool },
	/// A boolean attribute with a falsy value: remove it, and with `live` also clear the property.
	Unset { name: String, live: bool },
}

/// What [`reconcile`] is going to do to one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributePlan {
	pub to_change: Vec<Change>,
	pub to_remove: Vec<String>,
	/// `on*` attributes, which are bound as events rather than set.
	pub handlers: Vec<(String, String)>,
}

impl AttributePlan {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.to_change.is_empty() && self.to_remove.is_empty() && self.handlers.is_empty()
	}
}

/// Compares template and existing attributes.
///
/// Changes to plain attributes are only listed if the existing value differs. Live changes are always listed, since
/// the property they target can't be seen from the attribute list.
#[must_use]
pub fn plan(template: &[(String, String)], existing: &[(String, String)], form_field: bool, markers: &Markers) -> AttributePlan {
	let existing_value = |name: &str| existing.iter().find(|(existing_name, _)| existing_name == name).map(|(_, value)| value.as_str());

	let mut plan = AttributePlan::default();
	let mut covered = HashSet::new();
	for (raw, value) in template {
		let name = classify(raw, markers);
		let plain = name.plain();
		covered.insert(plain);

		if is_event_handler_name(plain) {
			plan.handlers.push((plain.to_owned(), value.clone()));
			continue;
		}

		let live = match name {
			AttributeName::DefaultOnly(_) => continue,
			AttributeName::Plain(_) if form_field && is_live_property(plain) => continue,
			AttributeName::Plain(_) => false,
			AttributeName::Live(_) => true,
		};

		if is_boolean_property(plain) && is_falsy_token(value) {
			if live || existing_value(plain).is_some() {
				plan.to_change.push(Change::Unset { name: plain.to_owned(), live })
			}
		} else if live || existing_value(plain) != Some(value.as_str()) {
			plan.to_change.push(Change::Set {
				name: plain.to_owned(),
				value: value.clone(),
				live,
			})
		}
	}

	plan.to_remove = existing
		.iter()
		.map(|(name, _)| name)
		.filter(|name| !covered.contains(name.as_str()))
		.filter(|name| !(form_field && is_live_property(name)))
		.cloned()
		.collect();

	plan
}

/// Brings `existing`'s attributes in line with `template`'s. Returns the number of DOM mutations made.
///
/// `class` is diffed per token and `style` per CSS property, so unchanged tokens and properties aren't touched.
/// Tokens and properties the template doesn't list are still removed.
#[instrument(skip(template, existing, options, registry))]
pub fn reconcile(template: &Element, existing: &Element, options: &Options, registry: Option<&EventRegistry>) -> usize {
	let form_field = is_form_field(&existing.tag_name());
	let plan = plan(&load::attributes(template), &load::attributes(existing), form_field, &options.markers);

	let mut mutations = 0;
	for change in &plan.to_change {
		mutations += match change {
			Change::Set { name, value, live } => {
				if options.sanitize && is_dangerous(name, value) {
					trace!("Not setting dangerous attribute {:?}.", name);
					continue;
				}
				let set = match name.as_str() {
					"class" => reconcile_class(existing, value),
					"style" => reconcile_style(template, existing, value),
					_ => set_attribute(existing, name, value),
				};
				set + if *live { set_property(existing, name, value) } else { 0 }
			}
			Change::Unset { name, live } => remove_attribute(existing, name) + if *live { set_property(existing, name, "false") } else { 0 },
		};
	}

	for name in &plan.to_remove {
		mutations += remove_attribute(existing, name);
	}

	mutations + reconcile_handlers(existing, &plan.handlers, options, registry)
}

fn reconcile_handlers(existing: &Element, handlers: &[(String, String)], options: &Options, registry: Option<&EventRegistry>) -> usize {
	let mut mutations = 0;
	let mut bound_types = Vec::new();
	for (name, value) in handlers {
		let parsed = parse_handler_attribute(name, value);
		match (parsed, registry) {
			(Some((event_type, handler)), Some(registry)) if registry.has_handler(handler) => {
				let before = registry.bindings_for(existing);
				if !before.iter().any(|(bound_type, bound_handler)| bound_type == event_type && bound_handler == handler) {
					mutations += 1;
				}
				registry.bind(existing, event_type, handler);
				bound_types.push(event_type.to_owned());
			}
			_ if !options.sanitize => mutations += set_attribute(existing, name, value),
			_ => trace!("Dropping unregistered handler attribute {:?}.", name),
		}
	}

	if let Some(registry) = registry {
		for (event_type, _) in registry.bindings_for(existing) {
			if !bound_types.contains(&event_type) && registry.unbind(existing, &event_type) {
				mutations += 1;
			}
		}
	}
	mutations
}

/// Applies creation defaults to a freshly cloned subtree, before it's inserted.
///
/// Marker prefixes are resolved into plain attributes, falsy boolean attributes are dropped, `on*` attributes become
/// registry bindings and, when sanitizing, anything dangerous is removed.
#[instrument(skip(root, options, registry))]
pub fn materialize(root: &Node, options: &Options, registry: Option<&EventRegistry>) {
	let element = match root.dyn_ref::<Element>() {
		Some(element) => element,
		None => return,
	};

	let mut elements = vec![element.clone()];
	match element.query_selector_all("*") {
		Ok(descendants) => elements.extend(load::load_node_list(&descendants).into_iter().filter_map(|node| node.dyn_into::<Element>().ok())),
		Err(error) => warn!("Could not list descendants for creation defaults: {:?}", error),
	}

	for element in &elements {
		materialize_element(element, options, registry);
	}
}

fn materialize_element(element: &Element, options: &Options, registry: Option<&EventRegistry>) {
	for (raw, value) in load::attributes(element) {
		let name = classify(&raw, &options.markers);
		let plain = name.plain();
		let prefixed = raw != plain;

		if is_event_handler_name(plain) {
			match (parse_handler_attribute(plain, &value), registry) {
				(Some((event_type, handler)), Some(registry)) if registry.bind(element, event_type, handler) => {
					remove_attribute(element, &raw);
				}
				_ if options.sanitize => {
					remove_attribute(element, &raw);
				}
				_ if prefixed => {
					remove_attribute(element, &raw);
					set_attribute(element, plain, &value);
				}
				_ => (),
			}
			continue;
		}

		if prefixed {
			remove_attribute(element, &raw);
		}

		if options.sanitize && is_dangerous(plain, &value) {
			remove_attribute(element, plain);
			continue;
		}

		if is_boolean_property(plain) && is_falsy_token(&value) {
			remove_attribute(element, plain);
			continue;
		}

		if prefixed {
			set_attribute(element, plain, &value);
			if plain == "value" {
				// `<textarea>` and `<select>` don't take their initial value from an attribute.
				set_property(element, plain, &value);
			}
		}
	}
}

fn set_attribute(element: &Element, name: &str, value: &str) -> usize {
	if element.get_attribute(name).as_deref() == Some(value) {
		return 0;
	}
	match element.set_attribute(name, value) {
		Ok(()) => 1,
		Err(error) => {
			error!("Could not set attribute {:?}: {:?}", name, error);
			0
		}
	}
}

fn remove_attribute(element: &Element, name: &str) -> usize {
	if !element.has_attribute(name) {
		return 0;
	}
	match element.remove_attribute(name) {
		Ok(()) => 1,
		Err(error) => {
			warn!("Could not remove attribute {:?}: {:?}", name, error);
			0
		}
	}
}

/// Writes a live form property (`value`, `checked`, `selected`) if it differs from `value`.
fn set_property(element: &Element, name: &str, value: &str) -> usize {
	let target: &JsValue = element.as_ref();
	let key = JsValue::from_str(name);
	let current = Reflect::get(target, &key).unwrap_or(JsValue::UNDEFINED);

	let next = if is_boolean_property(name) {
		JsValue::from_bool(!is_falsy_token(value))
	} else {
		JsValue::from_str(value)
	};
	if current == next {
		return 0;
	}

	match Reflect::set(target, &key, &next) {
		Ok(true) => 1,
		Ok(false) => {
			warn!("Property {:?} could not be written.", name);
			0
		}
		Err(error) => {
			error!("Could not write property {:?}: {:?}", name, error);
			0
		}
	}
}

fn reconcile_class(existing: &Element, value: &str) -> usize {
	if !existing.has_attribute("class") {
		return set_attribute(existing, "class", value);
	}

	let class_list = existing.class_list();
	let wanted: Vec<&str> = value.split_ascii_whitespace().collect();
	let current: Vec<String> = (0..class_list.length()).filter_map(|i| class_list.item(i)).collect();

	let mut mutations = 0;
	for token in current.iter().filter(|token| !wanted.contains(&token.as_str())) {
		match class_list.remove_1(token) {
			Ok(()) => mutations += 1,
			Err(error) => warn!("Could not remove class: {:?}", error),
		}
	}
	for token in wanted.iter().copied().filter(|token| !current.iter().any(|current| current == token)) {
		match class_list.add_1(token) {
			Ok(()) => mutations += 1,
			Err(error) => warn!("Could not add class: {:?}", error),
		}
	}
	mutations
}

fn reconcile_style(template: &Element, existing: &Element, value: &str) -> usize {
	let (template_style, existing_style) = match (template.dyn_ref::<HtmlElement>(), existing.dyn_ref::<HtmlElement>()) {
		(Some(template), Some(existing)) if existing.has_attribute("style") => (template.style(), existing.style()),
		_ => return set_attribute(existing, "style", value),
	};

	let mut mutations = 0;
	let existing_properties: Vec<String> = (0..existing_style.length()).map(|i| existing_style.item(i)).collect();
	for property in &existing_properties {
		if template_style.get_property_value(property).map_or(true, |value| value.is_empty()) {
			match existing_style.remove_property(property) {
				Ok(_) => mutations += 1,
				Err(error) => warn!("Could not remove style property {:?}: {:?}", property, error),
			}
		}
	}

	for i in 0..template_style.length() {
		let property = template_style.item(i);
		let wanted = template_style.get_property_value(&property).unwrap_or_default();
		let priority = template_style.get_property_priority(&property);
		let current = existing_style.get_property_value(&property).unwrap_or_default();
		if current != wanted || existing_style.get_property_priority(&property) != priority {
			match existing_style.set_property_with_priority(&property, &wanted, &priority) {
				Ok(()) => mutations += 1,
				Err(error) => warn!("Could not set style property {:?}: {:?}", property, error),
			}
		}
	}
	mutations
}
