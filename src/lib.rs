#![doc(html_root_url = "https://docs.rs/cambium-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Renders HTML strings into the live DOM by diffing them against what's already there.
//!
//! See the README for an overview and [`render()`] for the main entry point.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod attach;
pub mod attributes;
pub mod component;
pub mod diff;
pub mod error;
pub mod events;
pub mod identity;
pub mod load;
pub mod options;
pub mod parse;
mod rc_hash_map;
pub mod render;
pub mod sanitize;
pub mod schedule;
pub mod store;

pub use component::{Component, Rendered, Runtime};
pub use diff::{DiffReport, Differ};
pub use error::{Outcome, RenderError, StoreError};
pub use events::EventRegistry;
pub use options::{Markers, Options};
pub use render::{render, BindingKind, Target};
pub use store::{Store, Subscription};
