//! Named event handlers, bound through one delegated document listener per event type.
//!
//! Markup refers to handlers by name (`onclick="save"`), and the registry resolves that name against handlers the
//! application registered up front. Nothing in the markup is ever evaluated.

use crate::rc_hash_map::{CountSaturatedError, RcHashMap};
use core::fmt::{self, Debug, Formatter};
use hashbrown::HashMap;
use std::{
	cell::RefCell,
	rc::{Rc, Weak},
};
use tracing::{error, info, instrument, trace, trace_span, warn};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{Document, Element, Event, Node};

pub type Handler = Rc<dyn Fn(&Event)>;

/// An element's subscription to an event type.
#[derive(Debug, Clone)]
pub struct Binding {
	pub element: Element,
	pub event_type: String,
	pub handler: String,
}

/// A shared handle to one event binding registry.
///
/// Clones refer to the same registry. The delegated document listeners are removed when the last handle is dropped.
#[derive(Clone)]
pub struct EventRegistry {
	inner: Rc<RefCell<Inner>>,
}

struct Inner {
	document: Document,
	handlers: HashMap<String, Handler>,
	bindings: Vec<Binding>,
	listeners: RcHashMap<String, u32, Closure<dyn Fn(Event)>>,
}

impl Debug for EventRegistry {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self.inner.try_borrow() {
			Ok(inner) => f
				.debug_struct("EventRegistry")
				.field("handlers", &inner.handlers.keys().collect::<Vec<_>>())
				.field("bindings", &inner.bindings.len())
				.field("listeners", &inner.listeners.len())
				.finish(),
			Err(_) => f.debug_struct("EventRegistry").finish_non_exhaustive(),
		}
	}
}

/// Splits an inline handler attribute into its event type and handler name.
///
/// `onclick="save"` and `onclick="save()"` both name the handler `save` for `click` events.
/// Returns [`None`] if `name` isn't an `on*` attribute or `value` isn't a plain name.
#[must_use]
pub fn parse_handler_attribute<'a>(name: &'a str, value: &'a str) -> Option<(&'a str, &'a str)> {
	if !crate::sanitize::is_event_handler_name(name) {
		return None;
	}
	let event_type = &name[2..];

	let handler = value.trim();
	let handler = handler.strip_suffix(';').unwrap_or(handler).trim_end();
	let handler = match handler.find('(') {
		Some(open) if handler.ends_with(')') => {
			let arguments = &handler[open + 1..handler.len() - 1];
			if arguments.contains(|c| matches!(c, '(' | ')' | ';')) {
				return None;
			}
			handler[..open].trim_end()
		}
		Some(_) => return None,
		None => handler,
	};

	if handler.is_empty() || !handler.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | '-')) {
		return None;
	}
	Some((event_type, handler))
}

impl EventRegistry {
	#[must_use]
	pub fn new(document: Document) -> Self {
		Self {
			inner: Rc::new(RefCell::new(Inner {
				document,
				handlers: HashMap::new(),
				bindings: Vec::new(),
				listeners: RcHashMap::new(),
			})),
		}
	}

	/// A registry for the current window's document, if there is one.
	#[must_use]
	pub fn for_window() -> Option<Self> {
		web_sys::window().and_then(|window| window.document()).map(Self::new)
	}

	/// Makes `handler` available to markup as `name`, replacing any handler of the same name.
	///
	/// Existing bindings to `name` resolve to the new handler from now on.
	pub fn register(&self, name: impl Into<String>, handler: impl 'static + Fn(&Event)) {
		let name = name.into();
		trace!("Registering handler {:?}", name);
		self.inner.borrow_mut().handlers.insert(name, Rc::new(handler));
	}

	/// Removes a handler. Bindings that refer to it stay in place but do nothing until it's registered again.
	pub fn unregister(&self, name: &str) -> bool {
		self.inner.borrow_mut().handlers.remove(name).is_some()
	}

	#[must_use]
	pub fn has_handler(&self, name: &str) -> bool {
		self.inner.borrow().handlers.contains_key(name)
	}

	/// Binds `element`'s `event_type` events to the handler registered as `handler`.
	///
	/// An element has at most one binding per event type; binding again replaces the handler name.
	/// Returns `false` without binding anything if no such handler is registered.
	#[instrument(skip(self, element))]
	pub fn bind(&self, element: &Element, event_type: &str, handler: &str) -> bool {
		let mut inner = self.inner.borrow_mut();
		if !inner.handlers.contains_key(handler) {
			trace!("No handler registered as {:?}.", handler);
			return false;
		}

		if let Some(binding) = inner.bindings.iter_mut().find(|binding| binding.event_type == event_type && binding.element.is_same_node(Some(element))) {
			if binding.handler != handler {
				trace!("Rebinding from {:?}.", binding.handler);
				binding.handler = handler.to_owned();
			}
			return true;
		}

		inner.bindings.push(Binding {
			element: element.clone(),
			event_type: event_type.to_owned(),
			handler: handler.to_owned(),
		});

		let weak = Rc::downgrade(&self.inner);
		let Inner { document, listeners, .. } = &mut *inner;
		let mut created = false;
		match listeners.increment_or_insert_with(event_type.to_owned(), |event_type| {
			created = true;
			delegated_listener(weak, event_type.clone())
		}) {
			Ok(listener) => {
				if created {
					trace!("Adding delegated document listener.");
					if let Err(error) = document.add_event_listener_with_callback_and_bool(event_type, listener.as_ref().unchecked_ref(), true) {
						error!("Failed to add delegated listener for {:?}: {:?}", event_type, error);
					}
				}
			}
			Err(CountSaturatedError) => error!("Too many bindings for event type {:?}.", event_type),
		}
		true
	}

	/// Removes `element`'s binding for `event_type`, if any.
	#[instrument(skip(self, element))]
	pub fn unbind(&self, element: &Element, event_type: &str) -> bool {
		let removed = {
			let mut inner = self.inner.borrow_mut();
			let before = inner.bindings.len();
			let mut removed = Vec::new();
			inner.bindings.retain(|binding| {
				if binding.event_type == event_type && binding.element.is_same_node(Some(element)) {
					removed.push(binding.event_type.clone());
					false
				} else {
					true
				}
			});
			debug_assert!(before - inner.bindings.len() <= 1);
			removed
		};
		let any = !removed.is_empty();
		self.release(removed);
		any
	}

	/// Removes all bindings of `nodes` and their descendants.
	///
	/// Call this before discarding nodes, so that handlers can't be reached through them anymore.
	#[instrument(skip(self, nodes), fields(nodes = nodes.len()))]
	pub fn unbind_all(&self, nodes: &[Node]) -> usize {
		if nodes.is_empty() {
			return 0;
		}

		let removed = {
			let mut inner = self.inner.borrow_mut();
			let mut removed = Vec::new();
			inner.bindings.retain(|binding| {
				let element: &Node = &binding.element;
				if nodes.iter().any(|node| node.contains(Some(element))) {
					removed.push(binding.event_type.clone());
					false
				} else {
					true
				}
			});
			removed
		};
		let count = removed.len();
		if count > 0 {
			self.release(removed);
		}
		count
	}

	/// Drops one listener reference per removed binding and tears down listeners that aren't needed anymore.
	fn release(&self, event_types: Vec<String>) {
		if event_types.is_empty() {
			return;
		}

		let mut inner = self.inner.borrow_mut();
		let Inner { document, listeners, bindings, .. } = &mut *inner;
		for event_type in &event_types {
			match listeners.weak_decrement(event_type.as_str()) {
				Ok(Some(_)) => (),
				Ok(None) => error!("cambium-dom bug: Released a binding for {:?} without a listener.", event_type),
				Err(CountSaturatedError) => error!("cambium-dom bug: Released more {:?} bindings than were made.", event_type),
			}
		}

		let mut freed = 0_usize;
		for (event_type, listener) in listeners.drain_weak() {
			if let Err(error) = document.remove_event_listener_with_callback_and_bool(&event_type, listener.as_ref().unchecked_ref(), true) {
				warn!("Failed to remove delegated listener for {:?}: {:?}", event_type, error);
			}
			freed += 1;
		}
		trace!("Freed {} delegated listener(s).", freed);
		info!("Delegated listener count: {}, bindings: {}", listeners.len(), bindings.len());
	}

	/// `(event type, handler name)` pairs bound on `element` itself.
	#[must_use]
	pub fn bindings_for(&self, element: &Element) -> Vec<(String, String)> {
		self.inner
			.borrow()
			.bindings
			.iter()
			.filter(|binding| binding.element.is_same_node(Some(element)))
			.map(|binding| (binding.event_type.clone(), binding.handler.clone()))
			.collect()
	}

	#[must_use]
	pub fn binding_count(&self) -> usize {
		self.inner.borrow().bindings.len()
	}

	/// The number of delegated document listeners, which is at most one per bound event type.
	#[must_use]
	pub fn listener_count(&self) -> usize {
		self.inner.borrow().listeners.len()
	}
}

fn delegated_listener(registry: Weak<RefCell<Inner>>, event_type: String) -> Closure<dyn Fn(Event)> {
	Closure::wrap(Box::new(move |event: Event| {
		let span = trace_span!("Delegated event", event_type = event_type.as_str());
		let _enter = span.enter();

		let inner = match registry.upgrade() {
			Some(inner) => inner,
			None => return,
		};
		let target = match event.target().and_then(|target| target.dyn_into::<Node>().ok()) {
			Some(target) => target,
			None => return,
		};

		// Handlers may bind, unbind or render, so they run only after the registry is released again.
		let handlers: Vec<Handler> = {
			let inner = match inner.try_borrow() {
				Ok(inner) => inner,
				Err(_) => return error!("Event dispatched while the registry was being modified; ignoring it."),
			};

			let mut handlers = Vec::new();
			let mut current = Some(target);
			while let Some(node) = current {
				for binding in inner.bindings.iter().filter(|binding| binding.event_type == event_type) {
					let element: &Node = &binding.element;
					if element.is_same_node(Some(&node)) {
						match inner.handlers.get(&binding.handler) {
							Some(handler) => handlers.push(Rc::clone(handler)),
							None => trace!("Handler {:?} isn't registered (anymore).", binding.handler),
						}
					}
				}
				current = node.parent_node();
			}
			handlers
		};

		for handler in handlers {
			handler(&event);
		}
	}) as Box<dyn Fn(Event)>)
}

impl Drop for Inner {
	fn drop(&mut self) {
		for (event_type, listener) in self.listeners.drain_all() {
			if let Err(error) = self.document.remove_event_listener_with_callback_and_bool(&event_type, listener.as_ref().unchecked_ref(), true) {
				warn!("Failed to remove delegated listener for {:?}: {:?}", event_type, error);
			}
		}
	}
}
