//! Which components render along with which.

use hashbrown::{HashMap, HashSet};
use tracing::warn;

/// A directed graph from components to the components attached to them.
///
/// Edges that close a cycle are accepted, but [`AttachmentGraph::would_cycle`] reports them so that rendering can stop
/// there.
#[derive(Debug, Default, Clone)]
pub struct AttachmentGraph {
	edges: HashMap<u64, Vec<u64>>,
}

impl AttachmentGraph {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Attaches `child` to `parent`. Returns `false` if it already was.
	pub fn attach(&mut self, parent: u64, child: u64) -> bool {
		if self.would_cycle(parent, child) {
			warn!("Attaching component {} to {} closes a cycle; rendering will skip it.", child, parent);
		}
		let children = self.edges.entry(parent).or_default();
		if children.contains(&child) {
			false
		} else {
			children.push(child);
			true
		}
	}

	/// Returns `false` if `child` wasn't attached to `parent`.
	pub fn detach(&mut self, parent: u64, child: u64) -> bool {
		match self.edges.get_mut(&parent) {
			Some(children) => {
				let before = children.len();
				children.retain(|&attached| attached != child);
				let detached = children.len() != before;
				if children.is_empty() {
					self.edges.remove(&parent);
				}
				detached
			}
			None => false,
		}
	}

	/// Removes `node` and every edge touching it.
	pub fn remove(&mut self, node: u64) {
		self.edges.remove(&node);
		self.edges.retain(|_, children| {
			children.retain(|&child| child != node);
			!children.is_empty()
		});
	}

	/// Components attached directly to `parent`, in attachment order.
	#[must_use]
	pub fn children(&self, parent: u64) -> &[u64] {
		self.edges.get(&parent).map_or(&[][..], Vec::as_slice)
	}

	/// Whether `to` is reachable from `from` through one or more edges.
	#[must_use]
	pub fn reaches(&self, from: u64, to: u64) -> bool {
		let mut visited = HashSet::new();
		let mut stack = self.children(from).to_vec();
		while let Some(node) = stack.pop() {
			if node == to {
				return true;
			}
			if visited.insert(node) {
				stack.extend_from_slice(self.children(node));
			}
		}
		false
	}

	/// Whether rendering `child` as part of `parent` would eventually render `parent` again.
	#[must_use]
	pub fn would_cycle(&self, parent: u64, child: u64) -> bool {
		parent == child || self.reaches(child, parent)
	}
}
