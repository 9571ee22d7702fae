//! Debouncing work onto the next animation frame.

use core::fmt::{self, Debug, Formatter};
use std::{cell::RefCell, rc::Rc};
use tracing::{error, trace};
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::Window;

/// Runs at most one job per animation frame: the one requested last.
///
/// Requesting while a job is pending cancels the pending frame and replaces the job. Dropping the scheduler cancels
/// whatever is pending.
pub struct FrameScheduler {
	window: Window,
	pending: Rc<RefCell<Pending>>,
	callback: Closure<dyn FnMut()>,
}

#[derive(Default)]
struct Pending {
	frame: Option<i32>,
	job: Option<Box<dyn FnOnce()>>,
}

impl Debug for FrameScheduler {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("FrameScheduler").field("pending", &self.is_pending()).finish()
	}
}

impl FrameScheduler {
	#[must_use]
	pub fn new(window: Window) -> Self {
		let pending = Rc::new(RefCell::new(Pending::default()));
		let callback = {
			let pending = Rc::clone(&pending);
			Closure::wrap(Box::new(move || {
				// The job may request the next frame, so it runs only after the borrow is released.
				let job = {
					let mut pending = pending.borrow_mut();
					pending.frame = None;
					pending.job.take()
				};
				if let Some(job) = job {
					trace!("Running scheduled job.");
					job();
				}
			}) as Box<dyn FnMut()>)
		};
		Self { window, pending, callback }
	}

	#[must_use]
	pub fn for_window() -> Option<Self> {
		web_sys::window().map(Self::new)
	}

	/// Schedules `job` for the next animation frame, replacing any job that's still pending.
	///
	/// If no frame can be requested, `job` runs right away.
	pub fn request(&self, job: impl 'static + FnOnce()) {
		self.cancel();
		match self.window.request_animation_frame(self.callback.as_ref().unchecked_ref()) {
			Ok(frame) => {
				let mut pending = self.pending.borrow_mut();
				pending.frame = Some(frame);
				pending.job = Some(Box::new(job));
			}
			Err(error) => {
				error!("Could not request an animation frame; running the job immediately: {:?}", error);
				job();
			}
		}
	}

	/// Cancels the pending job, if any. Returns whether there was one.
	pub fn cancel(&self) -> bool {
		let (frame, job) = {
			let mut pending = self.pending.borrow_mut();
			(pending.frame.take(), pending.job.take())
		};
		if let Some(frame) = frame {
			trace!("Cancelling animation frame {}.", frame);
			if let Err(error) = self.window.cancel_animation_frame(frame) {
				error!("Could not cancel animation frame: {:?}", error);
			}
		}
		job.is_some()
	}

	#[must_use]
	pub fn is_pending(&self) -> bool {
		self.pending.try_borrow().map_or(true, |pending| pending.job.is_some())
	}
}

impl Drop for FrameScheduler {
	fn drop(&mut self) {
		self.cancel();
	}
}
