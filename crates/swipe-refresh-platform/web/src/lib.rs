//! Web platform adapter for swipe-refresh
//!
//! Binds a [`SwipeRefreshController`] to DOM elements: touch listeners on the
//! scroll container, inline styles on the indicator and a
//! `requestAnimationFrame` loop pumping the runtime.

mod action;
mod bindings;
mod dataset;
mod dom;
mod scheduler;

use std::rc::Rc;

use swipe_refresh_core::{
    Collaborators, RefreshAction, Runtime, SettingsError, SwipeRefreshController,
    SwipeRefreshSettings,
};
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

pub use action::js_refresh_action;
pub use bindings::SwipeRefreshHandle;
pub use dataset::{apply_attributes, dataset_key, settings_from_dataset, DATASET_ATTRIBUTES};
pub use dom::{DocumentEnvironment, DocumentScroll, DomIndicator, DomTouchTarget};
pub use scheduler::AnimationFrameScheduler;

/// An enabled controller together with the runtime that drives it.
pub struct WebSwipeRefresh {
    // Dropped first so its teardown still reaches a live runtime.
    controller: SwipeRefreshController,
    runtime: Runtime,
}

impl WebSwipeRefresh {
    pub fn controller(&self) -> &SwipeRefreshController {
        &self.controller
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }
}

fn settings_error(err: SettingsError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Wires swipe-to-refresh onto `scroll_element` and enables it.
///
/// `data-*` attributes on `scroll_element` override `settings`.
pub fn attach(
    scroll_element: HtmlElement,
    indicator: HtmlElement,
    action: RefreshAction,
    settings: SwipeRefreshSettings,
) -> Result<WebSwipeRefresh, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or("no global window exists")?;
    let document = window
        .document()
        .ok_or("should have a document on window")?;

    let settings = settings_from_dataset(&scroll_element, settings).map_err(settings_error)?;

    let scheduler = AnimationFrameScheduler::new(window);
    let runtime = Runtime::new(scheduler.clone());
    scheduler.bind(runtime.handle());

    let mut collaborators = Collaborators::new()
        .with_target(Rc::new(DomTouchTarget::new(scroll_element)))
        .with_sink(Rc::new(DomIndicator::new(indicator)))
        .with_scroll(Rc::new(DocumentScroll::new(document.clone())));
    if let Some(body) = document.body() {
        collaborators = collaborators.with_environment(Rc::new(DocumentEnvironment::new(body)));
    }

    let controller =
        SwipeRefreshController::new(runtime.handle(), collaborators, action, settings)
            .map_err(settings_error)?;
    controller.set_enabled(true).map_err(settings_error)?;
    log::debug!("swipe refresh attached");

    Ok(WebSwipeRefresh {
        controller,
        runtime,
    })
}
