//! Render configuration and markup conventions.

/// Markup-level conventions recognised by the reconciler.
///
/// All of these are matched on attribute names as the parser reports them, i.e. lowercased for HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
	/// Attributes starting with this character only apply when their element is first created.
	///
	/// `@value="x"` pre-fills a field once and then leaves it to the user.
	pub default_prefix: char,
	/// Attributes starting with this character overwrite live form state on every render.
	///
	/// `#checked="false"` unchecks a checkbox even after the user toggled it.
	pub live_prefix: char,
	/// Elements carrying this attribute are positioned but otherwise left untouched.
	pub ignore_attribute: String,
	/// Explicit sibling identity, compared alongside `id` and `src`.
	pub key_attribute: String,
}

impl Default for Markers {
	fn default() -> Self {
		Self {
			default_prefix: '@',
			live_prefix: '#',
			ignore_attribute: "cambium-ignore".to_owned(),
			key_attribute: "key".to_owned(),
		}
	}
}

/// Options for [`render`](`crate::render::render`) and [`Runtime`](`crate::component::Runtime`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
	/// Strip `<script>` elements and dangerous attributes before anything reaches the live document.
	///
	/// Turning this off is only sound for markup that is fully trusted.
	pub sanitize: bool,
	/// Return errors instead of logging them with [`tracing::warn!`].
	pub debug: bool,
	/// How many following siblings an unkeyed node may be searched for before it's recreated instead.
	pub lookahead_limit: usize,
	/// Maximum element nesting one diff pass descends into.
	pub depth_limit: usize,
	pub markers: Markers,
	/// Lifecycle events are dispatched as `"{event_namespace}:before-render"` and `"{event_namespace}:render"`.
	pub event_namespace: String,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			sanitize: true,
			debug: cfg!(debug_assertions),
			lookahead_limit: 64,
			depth_limit: 512,
			markers: Markers::default(),
			event_namespace: "cambium".to_owned(),
		}
	}
}

impl Options {
	/// The same options, but without sanitization.
	#[must_use]
	pub fn unsafe_markup(&self) -> Self {
		Self { sanitize: false, ..self.clone() }
	}

	#[must_use]
	pub fn before_render_event(&self) -> String {
		format!("{}:before-render", self.event_namespace)
	}

	#[must_use]
	pub fn render_event(&self) -> String {
		format!("{}:render", self.event_namespace)
	}
}
