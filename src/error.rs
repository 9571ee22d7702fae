use tracing::warn;
use wasm_bindgen::JsValue;

/// Reasons a render was not carried out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
	#[error("no document available (not running in a browser window?)")]
	MissingDocument,

	#[error("render target not found: {selector:?}")]
	MissingTarget { selector: String },

	#[error("no template producer was supplied")]
	MissingTemplate,

	#[error("component {component} is attached (transitively) back to itself through component {attached}; skipping its render")]
	Cycle { component: u64, attached: u64 },

	#[error("JavaScript error: {0}")]
	Js(String),
}

impl From<JsValue> for RenderError {
	fn from(value: JsValue) -> Self {
		Self::Js(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
	}
}

/// Failures of [`Store::set`](`crate::store::Store::set`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
	#[error("invalid state path {path:?} (expected a JSON pointer like \"/todos/0\")")]
	InvalidPath { path: String },

	#[error("state path {path:?} runs through a value that is neither an object nor an array")]
	NotAContainer { path: String },
}

/// The outcome of a render call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	/// The live tree now reflects the markup.
	Committed(crate::diff::DiffReport),
	/// A before-render listener called `preventDefault()`.
	Cancelled,
	/// Nothing was rendered, either deliberately or because an error was reported in production mode.
	Skipped,
}

/// Applies the debug/production reporting policy to `error`.
///
/// In debug mode the error is handed back to the caller, otherwise it's logged and the render counts as skipped.
pub(crate) fn report(error: RenderError, debug: bool) -> Result<Outcome, RenderError> {
	if debug {
		Err(error)
	} else {
		warn!("Render skipped: {}", error);
		Ok(Outcome::Skipped)
	}
}
