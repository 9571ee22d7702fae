//! Components: a render target and a template, re-rendered whenever the stores they listen to change.

use crate::{
	attach::AttachmentGraph,
	error::{report, Outcome, RenderError},
	events::EventRegistry,
	options::Options,
	render::{BindingKind, Target},
	schedule::FrameScheduler,
	store::{Store, Subscription},
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::{error, instrument, trace};

/// What a template produced.
///
/// Only markup and numbers are rendered. [`Rendered::Nothing`] skips the render without it being an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
	Markup(String),
	Number(f64),
	Nothing,
}

impl Rendered {
	/// The markup to render, if any. Numbers are formatted the way JavaScript would.
	#[must_use]
	pub fn into_markup(self) -> Option<String> {
		match self {
			Rendered::Markup(markup) => Some(markup),
			Rendered::Number(number) => Some(format_number(number)),
			Rendered::Nothing => None,
		}
	}
}

impl From<String> for Rendered {
	fn from(markup: String) -> Self {
		Self::Markup(markup)
	}
}

impl From<&str> for Rendered {
	fn from(markup: &str) -> Self {
		Self::Markup(markup.to_owned())
	}
}

impl From<f64> for Rendered {
	fn from(number: f64) -> Self {
		Self::Number(number)
	}
}

impl From<i32> for Rendered {
	fn from(number: i32) -> Self {
		Self::Number(number.into())
	}
}

impl From<u32> for Rendered {
	fn from(number: u32) -> Self {
		Self::Number(number.into())
	}
}

impl From<usize> for Rendered {
	#[allow(clippy::cast_precision_loss)]
	fn from(number: usize) -> Self {
		Self::Number(number as f64)
	}
}

impl From<()> for Rendered {
	fn from((): ()) -> Self {
		Self::Nothing
	}
}

impl<T: Into<Rendered>> From<Option<T>> for Rendered {
	fn from(rendered: Option<T>) -> Self {
		rendered.map_or(Self::Nothing, Into::into)
	}
}

#[allow(clippy::float_cmp)]
fn format_number(number: f64) -> String {
	if number.is_nan() {
		"NaN".to_owned()
	} else if number.is_infinite() {
		(if number > 0.0 { "Infinity" } else { "-Infinity" }).to_owned()
	} else if number == 0.0 {
		"0".to_owned()
	} else if number.abs() >= 1e21 || number.abs() < 1e-6 {
		let scientific = format!("{:e}", number);
		match scientific.split_once('e') {
			Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{}e+{}", mantissa, exponent),
			_ => scientific,
		}
	} else {
		number.to_string()
	}
}

/// Everything components share: options, the event registry and the attachment graph.
///
/// Clones refer to the same runtime.
#[derive(Clone)]
pub struct Runtime {
	inner: Rc<RuntimeInner>,
}

struct RuntimeInner {
	options: Options,
	registry: Option<EventRegistry>,
	graph: RefCell<AttachmentGraph>,
	components: RefCell<HashMap<u64, Weak<ComponentInner>>>,
	next_id: Cell<u64>,
}

impl Debug for Runtime {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Runtime")
			.field("options", &self.inner.options)
			.field("registry", &self.inner.registry)
			.field("components", &self.inner.components.try_borrow().map(|components| components.len()).ok())
			.finish()
	}
}

impl Runtime {
	/// A runtime with an event registry for the current window's document, if there is one.
	#[must_use]
	pub fn new(options: Options) -> Self {
		Self::with_registry(options, EventRegistry::for_window())
	}

	#[must_use]
	pub fn with_registry(options: Options, registry: Option<EventRegistry>) -> Self {
		Self {
			inner: Rc::new(RuntimeInner {
				options,
				registry,
				graph: RefCell::new(AttachmentGraph::new()),
				components: RefCell::new(HashMap::new()),
				next_id: Cell::new(0),
			}),
		}
	}

	#[must_use]
	pub fn options(&self) -> &Options {
		&self.inner.options
	}

	#[must_use]
	pub fn registry(&self) -> Option<&EventRegistry> {
		self.inner.registry.as_ref()
	}

	/// A one-off render with this runtime's options and registry.
	///
	/// # Errors
	///
	/// See [`render`](`crate::render::render`).
	pub fn render(&self, target: impl Into<Target>, markup: &str) -> Result<Outcome, RenderError> {
		crate::render::render(target, markup, self.options(), self.registry())
	}

	fn component(&self, id: u64) -> Option<Component> {
		let inner = self.inner.components.borrow().get(&id)?.upgrade()?;
		Some(Component { inner })
	}
}

type Template = Rc<dyn Fn() -> Rendered>;

/// A shared handle to a component. Clones refer to the same component.
///
/// The component is torn down (unsubscribed, its pending render cancelled and its attachments removed) when the last
/// handle is dropped.
#[derive(Clone)]
pub struct Component {
	inner: Rc<ComponentInner>,
}

struct ComponentInner {
	id: u64,
	runtime: Runtime,
	target: Target,
	kind: BindingKind,
	template: RefCell<Option<Template>>,
	stores: RefCell<Vec<Store>>,
	subscriptions: RefCell<Vec<Subscription>>,
	started: Cell<bool>,
	scheduler: Option<FrameScheduler>,
}

impl Debug for Component {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Component")
			.field("id", &self.inner.id)
			.field("target", &self.inner.target)
			.field("kind", &self.inner.kind)
			.field("started", &self.inner.started.get())
			.finish_non_exhaustive()
	}
}

impl Component {
	#[must_use]
	pub fn new<R: 'static + Into<Rendered>>(runtime: &Runtime, target: impl Into<Target>, kind: BindingKind, template: impl 'static + Fn() -> R) -> Self {
		let component = Self::without_template(runtime, target, kind);
		component.set_template(template);
		component
	}

	/// A component that can't render until it's given a template through [`Component::set_template`].
	#[must_use]
	pub fn without_template(runtime: &Runtime, target: impl Into<Target>, kind: BindingKind) -> Self {
		let id = runtime.inner.next_id.get();
		runtime.inner.next_id.set(id + 1);

		let inner = Rc::new(ComponentInner {
			id,
			runtime: runtime.clone(),
			target: target.into(),
			kind,
			template: RefCell::new(None),
			stores: RefCell::new(Vec::new()),
			subscriptions: RefCell::new(Vec::new()),
			started: Cell::new(false),
			scheduler: FrameScheduler::for_window(),
		});
		runtime.inner.components.borrow_mut().insert(id, Rc::downgrade(&inner));
		Self { inner }
	}

	/// Unique within its [`Runtime`].
	#[must_use]
	pub fn id(&self) -> u64 {
		self.inner.id
	}

	pub fn set_template<R: 'static + Into<Rendered>>(&self, template: impl 'static + Fn() -> R) {
		let template: Template = Rc::new(move || template().into());
		*self.inner.template.borrow_mut() = Some(template);
	}

	pub fn clear_template(&self) {
		*self.inner.template.borrow_mut() = None;
	}

	/// Re-renders on changes to `store` while started.
	pub fn listen(&self, store: &Store) {
		self.inner.stores.borrow_mut().push(store.clone());
		if self.inner.started.get() {
			let subscription = self.subscribe(store);
			self.inner.subscriptions.borrow_mut().push(subscription);
		}
	}

	/// Subscribes to all stores this component listens to and requests a render.
	pub fn start(&self) {
		if self.inner.started.replace(true) {
			return;
		}
		let subscriptions: Vec<Subscription> = self.inner.stores.borrow().iter().map(|store| self.subscribe(store)).collect();
		trace!("Component {} started with {} subscription(s).", self.inner.id, subscriptions.len());
		self.inner.subscriptions.borrow_mut().extend(subscriptions);
		self.render();
	}

	/// Unsubscribes and cancels any pending render.
	pub fn stop(&self) {
		if !self.inner.started.replace(false) {
			return;
		}
		let subscriptions = self.inner.subscriptions.replace(Vec::new());
		drop(subscriptions);
		if let Some(scheduler) = &self.inner.scheduler {
			scheduler.cancel();
		}
		trace!("Component {} stopped.", self.inner.id);
	}

	#[must_use]
	pub fn is_started(&self) -> bool {
		self.inner.started.get()
	}

	fn subscribe(&self, store: &Store) -> Subscription {
		let component = Rc::downgrade(&self.inner);
		store.subscribe(move |_| {
			if let Some(inner) = component.upgrade() {
				Component { inner }.render();
			}
		})
	}

	/// Renders on the next animation frame, replacing a render that's already pending.
	///
	/// Without a window to schedule on, renders right away.
	pub fn render(&self) {
		let component = Rc::downgrade(&self.inner);
		let job = move || {
			if let Some(inner) = component.upgrade() {
				if let Err(error) = (Component { inner }).render_now() {
					error!("Scheduled render failed: {}", error);
				}
			}
		};
		match &self.inner.scheduler {
			Some(scheduler) => scheduler.request(job),
			None => job(),
		}
	}

	#[must_use]
	pub fn is_render_pending(&self) -> bool {
		self.inner.scheduler.as_ref().map_or(false, FrameScheduler::is_pending)
	}

	/// Renders right away, then renders the components attached to this one.
	///
	/// # Errors
	///
	/// Iff the runtime's [`Options::debug`] is set and there's no template, rendering fails or an attached component
	/// leads back to this one.
	#[instrument(skip(self), fields(component = self.inner.id))]
	pub fn render_now(&self) -> Result<Outcome, RenderError> {
		let runtime = &self.inner.runtime;
		let options = runtime.options();

		let template = self.inner.template.borrow().clone();
		let template = match template {
			Some(template) => template,
			None => return report(RenderError::MissingTemplate, options.debug),
		};
		let markup = match template().into_markup() {
			Some(markup) => markup,
			None => {
				trace!("Template produced nothing to render.");
				return Ok(Outcome::Skipped);
			}
		};

		let outcome = self.inner.kind.render(self.inner.target.clone(), &markup, options, runtime.registry())?;
		if let Outcome::Committed(_) = outcome {
			self.render_attached()?;
		}
		Ok(outcome)
	}

	fn render_attached(&self) -> Result<(), RenderError> {
		let runtime = &self.inner.runtime;
		let id = self.inner.id;
		let children = runtime.inner.graph.borrow().children(id).to_vec();
		for child in children {
			if runtime.inner.graph.borrow().would_cycle(id, child) {
				report(RenderError::Cycle { component: id, attached: child }, runtime.options().debug)?;
				continue;
			}
			match runtime.component(child) {
				Some(child) => {
					child.render_now()?;
				}
				None => trace!("Attached component {} is gone.", child),
			}
		}
		Ok(())
	}

	/// Renders `child` after each render of this component. Returns `false` if it already was attached.
	pub fn attach(&self, child: &Component) -> bool {
		self.inner.runtime.inner.graph.borrow_mut().attach(self.inner.id, child.inner.id)
	}

	pub fn detach(&self, child: &Component) -> bool {
		self.inner.runtime.inner.graph.borrow_mut().detach(self.inner.id, child.inner.id)
	}
}

impl Drop for ComponentInner {
	fn drop(&mut self) {
		let runtime = &self.runtime.inner;
		runtime.components.borrow_mut().remove(&self.id);
		runtime.graph.borrow_mut().remove(self.id);
	}
}
