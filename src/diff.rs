//! The diff engine: patching a live tree's children in place so they match a template's.
//!
//! There is no retained virtual tree. The "old" state is whatever the live DOM currently holds, so outside changes are
//! picked up (and, where the template disagrees, undone) on the next pass.

use crate::{attributes, events::EventRegistry, identity::Identity, load, options::Options};
use hashbrown::HashMap;
use tracing::{error, info, instrument, trace, trace_span, warn};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Node};

/// What one [`Differ::reconcile`] pass changed.
///
/// A pass over an already up-to-date tree reports nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffReport {
	/// Nodes cloned from the template, counting each inserted subtree once.
	pub inserted: usize,
	/// Existing nodes moved to an earlier position for reuse.
	pub moved: usize,
	/// Existing nodes removed, counting each removed subtree once.
	pub removed: usize,
	/// Attribute, property, class token, style property and event binding changes.
	pub attributes: usize,
	/// Text content overwrites.
	pub text: usize,
}

impl DiffReport {
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.mutations() == 0
	}

	#[must_use]
	pub fn mutations(&self) -> usize {
		self.inserted + self.moved + self.removed + self.attributes + self.text
	}
}

/// Reconciles live children against template children.
///
/// # Correct Use
///
/// The template tree is only read, but nodes may be cloned out of it. Don't pass the same node as template and target.
#[derive(Debug)]
pub struct Differ<'a> {
	document: &'a Document,
	options: &'a Options,
	registry: Option<&'a EventRegistry>,
	report: DiffReport,
}

impl<'a> Differ<'a> {
	/// Without a `registry`, `on*` attributes are never bound and discarded nodes aren't unbound.
	#[must_use]
	pub fn new(document: &'a Document, options: &'a Options, registry: Option<&'a EventRegistry>) -> Self {
		Self {
			document,
			options,
			registry,
			report: DiffReport::default(),
		}
	}

	/// Makes `existing_parent`'s children match `template_parent`'s.
	///
	/// Neither parent itself is changed, and `template_parent`'s subtree is left intact.
	#[instrument(skip(self, template_parent, existing_parent))]
	pub fn reconcile(&mut self, template_parent: &Node, existing_parent: &Node) -> DiffReport {
		self.report = DiffReport::default();
		self.reconcile_children(template_parent, existing_parent, self.options.depth_limit);
		info!("Diff report: {:?}", self.report);
		self.report
	}

	fn reconcile_children(&mut self, template_parent: &Node, existing_parent: &Node, depth_limit: usize) {
		if depth_limit == 0 {
			return error!("Depth limit reached; leaving the remaining subtree as is.");
		}

		let options = self.options;
		let markers = &options.markers;
		let template_children = load::child_nodes(template_parent);
		let mut existing = Siblings::new(load::child_nodes(existing_parent).into_iter().map(|node| (load::identity(&node, markers), node)).collect());

		for (i, template) in template_children.iter().enumerate() {
			let wanted = load::identity(template, markers);
			let span = trace_span!("Diffing child", i, name = wanted.name.as_str());
			let _enter = span.enter();

			let current = match existing.get(i) {
				None => {
					let clone = match self.create(template) {
						Some(clone) => clone,
						None => return,
					};
					if let Err(error) = existing_parent.append_child(&clone) {
						self.discard(&clone);
						return error!("Could not append node, leaving the remaining children as is: {:?}", error);
					}
					existing.push(wanted, clone);
					self.report.inserted += 1;
					continue;
				}
				Some((identity, node)) if !identity.is_different(&wanted) => node.clone(),
				Some((_, reference)) => {
					let reference = reference.clone();
					match existing.find_ahead(&wanted, i, options.lookahead_limit) {
						Some(j) => {
							trace!("Reusing node from position {}.", j);
							let node = existing.node(j).clone();
							if let Err(error) = existing_parent.insert_before(&node, Some(&reference)) {
								return error!("Could not move node, leaving the remaining children as is: {:?}", error);
							}
							existing.move_to(j, i);
							self.report.moved += 1;
							node
						}
						None => {
							let clone = match self.create(template) {
								Some(clone) => clone,
								None => return,
							};
							if let Err(error) = existing_parent.insert_before(&clone, Some(&reference)) {
								self.discard(&clone);
								return error!("Could not insert node, leaving the remaining children as is: {:?}", error);
							}
							existing.insert(i, wanted, clone);
							self.report.inserted += 1;
							continue;
						}
					}
				}
			};

			self.patch(template, &current, &wanted, depth_limit);
		}

		let extra = existing.split_off(template_children.len());
		if !extra.is_empty() {
			trace!("Trimming {} trailing node(s).", extra.len());
			if let Some(registry) = self.registry {
				registry.unbind_all(&extra);
			}
			for node in extra.iter().rev() {
				match existing_parent.remove_child(node) {
					Ok(_) => self.report.removed += 1,
					Err(error) => warn!("Could not remove node: {:?}", error),
				}
			}
		}
	}

	/// Brings a correctly positioned node in line with its template.
	fn patch(&mut self, template: &Node, existing: &Node, identity: &Identity, depth_limit: usize) {
		if load::is_ignored(template, &self.options.markers) {
			return trace!("Ignored.");
		}

		if let (Some(template), Some(existing)) = (template.dyn_ref::<Element>(), existing.dyn_ref::<Element>()) {
			self.report.attributes += attributes::reconcile(template, existing, self.options, self.registry);
		}

		if identity.is_custom_element() {
			return trace!("Custom element; not diffing its content.");
		}

		if let Some(content) = load::leaf_content(template).filter(|content| !content.is_empty()) {
			if existing.text_content().as_deref() != Some(content.as_str()) {
				if cfg!(feature = "dangerous-logging") {
					trace!("Setting text to {:?}.", content);
				} else {
					trace!("Setting text.");
				}
				if existing.has_child_nodes() {
					self.release(existing);
				}
				existing.set_text_content(Some(&content));
				self.report.text += 1;
			}
			return;
		}

		match (template.has_child_nodes(), existing.has_child_nodes()) {
			(false, true) => {
				trace!("Collapsing.");
				self.report.removed += self.release(existing);
				existing.set_text_content(None);
			}
			(true, false) => {
				trace!("Expanding.");
				let fragment = self.document.create_document_fragment();
				self.reconcile_children(template, &fragment, depth_limit - 1);
				if let Err(error) = existing.append_child(&fragment) {
					error!("Could not append expanded children: {:?}", error);
				}
			}
			(true, true) => self.reconcile_children(template, existing, depth_limit - 1),
			(false, false) => (),
		}
	}

	/// Unbinds the children of `parent` ahead of their removal. Returns how many there are.
	fn release(&self, parent: &Node) -> usize {
		let children = load::child_nodes(parent);
		if let Some(registry) = self.registry {
			registry.unbind_all(&children);
		}
		children.len()
	}

	/// Unbinds a clone that couldn't be inserted.
	fn discard(&self, clone: &Node) {
		if let Some(registry) = self.registry {
			registry.unbind_all(&[clone.clone()]);
		}
	}

	/// Clones `template` deeply for insertion, applying creation defaults.
	fn create(&self, template: &Node) -> Option<Node> {
		match self.document.import_node_with_deep(template, true) {
			Ok(clone) => {
				attributes::materialize(&clone, self.options, self.registry);
				Some(clone)
			}
			Err(error) => {
				error!("Could not clone template node, leaving the remaining children as is: {:?}", error);
				None
			}
		}
	}
}

/// An owned mirror of a live child list, kept in step with every insertion, move and removal.
///
/// Keyed lookup uses a map from key (or `id`) to a slot serial that's only built once a keyed template node needs it.
/// Serials stay valid while slots shift position.
struct Siblings<T> {
	slots: Vec<Slot<T>>,
	keys: Option<HashMap<String, u32>>,
	next_serial: u32,
}

struct Slot<T> {
	serial: u32,
	identity: Identity,
	node: T,
}

impl<T> Siblings<T> {
	fn new(items: Vec<(Identity, T)>) -> Self {
		let mut siblings = Self {
			slots: Vec::with_capacity(items.len()),
			keys: None,
			next_serial: 0,
		};
		for (identity, node) in items {
			let slot = siblings.slot(identity, node);
			siblings.slots.push(slot);
		}
		siblings
	}

	fn slot(&mut self, identity: Identity, node: T) -> Slot<T> {
		let serial = self.next_serial;
		self.next_serial += 1;
		Slot { serial, identity, node }
	}

	fn get(&self, i: usize) -> Option<(&Identity, &T)> {
		self.slots.get(i).map(|slot| (&slot.identity, &slot.node))
	}

	fn node(&self, i: usize) -> &T {
		&self.slots[i].node
	}

	/// The position of a node after `i` that `wanted` can reuse.
	///
	/// Keyed nodes are looked up directly. The map only remembers the first sibling per key, so when that one is
	/// already behind `i` (duplicate keys or `id`s), the search falls back to scanning at most `limit` following
	/// siblings, as it does for unkeyed nodes.
	fn find_ahead(&mut self, wanted: &Identity, i: usize, limit: usize) -> Option<usize> {
		if let Some(key) = wanted.lookup_key() {
			let serial = self.keys().get(key).copied();
			let keyed = serial
				.and_then(|serial| self.slots.iter().position(|slot| slot.serial == serial))
				.filter(|&j| j > i && !self.slots[j].identity.is_different(wanted));
			if keyed.is_some() {
				return keyed;
			}
		}
		self.slots.iter().enumerate().skip(i + 1).take(limit).find(|(_, slot)| !slot.identity.is_different(wanted)).map(|(j, _)| j)
	}

	fn keys(&mut self) -> &HashMap<String, u32> {
		let slots = &self.slots;
		self.keys.get_or_insert_with(|| {
			let mut keys = HashMap::new();
			for slot in slots {
				if let Some(key) = slot.identity.lookup_key() {
					keys.entry(key.to_owned()).or_insert(slot.serial);
				}
			}
			keys
		})
	}

	fn push(&mut self, identity: Identity, node: T) {
		self.insert(self.slots.len(), identity, node);
	}

	fn insert(&mut self, i: usize, identity: Identity, node: T) {
		debug_assert!(i <= self.slots.len());
		let slot = self.slot(identity, node);
		if let (Some(keys), Some(key)) = (&mut self.keys, slot.identity.lookup_key()) {
			keys.entry(key.to_owned()).or_insert(slot.serial);
		}
		self.slots.insert(i, slot);
	}

	/// Moves the slot at `from` back to `to`.
	fn move_to(&mut self, from: usize, to: usize) {
		debug_assert!(to < from);
		let slot = self.slots.remove(from);
		self.slots.insert(to, slot);
	}

	fn split_off(&mut self, len: usize) -> Vec<T> {
		if len >= self.slots.len() {
			return Vec::new();
		}
		let removed = self.slots.split_off(len);
		if let Some(keys) = &mut self.keys {
			keys.retain(|_, serial| !removed.iter().any(|slot| slot.serial == *serial));
		}
		removed.into_iter().map(|slot| slot.node).collect()
	}

	#[cfg(test)]
	fn nodes(&self) -> Vec<&T> {
		self.slots.iter().map(|slot| &slot.node).collect()
	}
}
