//! Observable application state.
//!
//! A [`Store`] wraps a [`serde_json::Value`]. Every mutation through it notifies all subscribers synchronously, before
//! the mutating call returns.

use crate::error::StoreError;
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use serde_json::{Map, Value};
use std::rc::{Rc, Weak};
use tracing::{instrument, trace};

/// Delivered to subscribers after each mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification<'a> {
	/// The store's name.
	pub store: &'a str,
	/// The JSON pointer that was written to, or `""` for the whole value.
	pub path: &'a str,
}

type Subscriber = Rc<dyn Fn(&Notification<'_>)>;

/// A shared handle to named, observable state. Clones refer to the same state.
#[derive(Clone)]
pub struct Store {
	inner: Rc<Inner>,
}

struct Inner {
	name: String,
	value: RefCell<Value>,
	subscribers: RefCell<Vec<(u64, Subscriber)>>,
	next_id: Cell<u64>,
}

impl Debug for Store {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Store")
			.field("name", &self.inner.name)
			.field("subscribers", &self.inner.subscribers.try_borrow().map(|subscribers| subscribers.len()).ok())
			.finish_non_exhaustive()
	}
}

impl Store {
	#[must_use]
	pub fn new(name: impl Into<String>, value: Value) -> Self {
		Self {
			inner: Rc::new(Inner {
				name: name.into(),
				value: RefCell::new(value),
				subscribers: RefCell::new(Vec::new()),
				next_id: Cell::new(0),
			}),
		}
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.inner.name
	}

	/// A copy of the current value.
	#[must_use]
	pub fn get(&self) -> Value {
		self.inner.value.borrow().clone()
	}

	/// A copy of the value at `path` (a JSON pointer), if there is one.
	#[must_use]
	pub fn get_path(&self, path: &str) -> Option<Value> {
		self.inner.value.borrow().pointer(path).cloned()
	}

	/// Reads the current value without copying it.
	///
	/// # Panics
	///
	/// If `f` mutates this store.
	pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
		f(&self.inner.value.borrow())
	}

	/// Writes `value` at `path` and notifies subscribers.
	///
	/// `path` is a JSON pointer. `""` replaces the whole value. Missing object keys along the way are created as empty
	/// objects, and a final `-` appends to an array.
	///
	/// # Errors
	///
	/// If `path` isn't a JSON pointer, indexes an array out of bounds or runs through a scalar.
	/// Nothing is changed and nobody is notified in that case.
	#[instrument(skip(self, value), fields(store = self.inner.name.as_str()))]
	pub fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
		write(&mut self.inner.value.borrow_mut(), path, value)?;
		self.notify(path);
		Ok(())
	}

	/// Mutates the whole value in place and notifies subscribers.
	pub fn update(&self, f: impl FnOnce(&mut Value)) {
		f(&mut self.inner.value.borrow_mut());
		self.notify("");
	}

	/// Calls `subscriber` after each mutation until the returned [`Subscription`] is dropped.
	#[must_use = "dropping the subscription unsubscribes immediately"]
	pub fn subscribe(&self, subscriber: impl 'static + Fn(&Notification<'_>)) -> Subscription {
		let id = self.inner.next_id.get();
		self.inner.next_id.set(id + 1);
		self.inner.subscribers.borrow_mut().push((id, Rc::new(subscriber)));
		Subscription { store: Rc::downgrade(&self.inner), id }
	}

	#[must_use]
	pub fn subscriber_count(&self) -> usize {
		self.inner.subscribers.borrow().len()
	}

	fn notify(&self, path: &str) {
		// Subscribers may subscribe, unsubscribe or mutate again.
		let subscribers: Vec<Subscriber> = self.inner.subscribers.borrow().iter().map(|(_, subscriber)| Rc::clone(subscriber)).collect();
		trace!("Notifying {} subscriber(s).", subscribers.len());
		let notification = Notification { store: &self.inner.name, path };
		for subscriber in subscribers {
			subscriber(&notification);
		}
	}
}

/// Keeps a [`Store`] subscription alive.
#[derive(Debug)]
pub struct Subscription {
	store: Weak<Inner>,
	id: u64,
}

impl Subscription {
	pub fn unsubscribe(self) {
		drop(self);
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(store) = self.store.upgrade() {
			store.subscribers.borrow_mut().retain(|(id, _)| *id != self.id);
		}
	}
}

fn write(root: &mut Value, path: &str, value: Value) -> Result<(), StoreError> {
	if path.is_empty() {
		*root = value;
		return Ok(());
	}

	let invalid = || StoreError::InvalidPath { path: path.to_owned() };
	let not_a_container = || StoreError::NotAContainer { path: path.to_owned() };

	let tokens: Vec<String> = path.strip_prefix('/').ok_or_else(invalid)?.split('/').map(unescape).collect();
	let (last, parents) = tokens.split_last().ok_or_else(invalid)?;

	// Validate before creating anything, so that a failed write leaves no partial objects behind.
	let mut probe: Option<&Value> = Some(&*root);
	for token in parents {
		probe = match probe {
			Some(Value::Object(map)) => map.get(token),
			Some(Value::Array(array)) => Some(array.get(parse_index(token).ok_or_else(invalid)?).ok_or_else(invalid)?),
			Some(_) => return Err(not_a_container()),
			None => None,
		};
	}
	match probe {
		Some(Value::Object(_)) | None => (),
		Some(Value::Array(array)) => {
			if last != "-" && parse_index(last).map_or(true, |index| index > array.len()) {
				return Err(invalid());
			}
		}
		Some(_) => return Err(not_a_container()),
	}

	let mut current = root;
	for token in parents {
		current = match current {
			Value::Object(map) => map.entry(token.clone()).or_insert_with(|| Value::Object(Map::new())),
			Value::Array(array) => array.get_mut(parse_index(token).ok_or_else(invalid)?).ok_or_else(invalid)?,
			_ => return Err(not_a_container()),
		};
	}

	match current {
		Value::Object(map) => {
			map.insert(last.clone(), value);
		}
		Value::Array(array) => match parse_index(last) {
			Some(index) if index < array.len() => array[index] = value,
			_ => array.push(value),
		},
		_ => return Err(not_a_container()),
	}
	Ok(())
}

fn unescape(token: &str) -> String {
	token.replace("~1", "/").replace("~0", "~")
}

/// Array indices as JSON pointers spell them: no sign, no leading zeros.
fn parse_index(token: &str) -> Option<usize> {
	if token.is_empty() || (token.len() > 1 && token.starts_with('0')) || !token.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	token.parse().ok()
}
