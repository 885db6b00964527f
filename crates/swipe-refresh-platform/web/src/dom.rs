//! DOM-backed collaborators.

use std::cell::{Cell, RefCell};

use swipe_refresh_core::{
    EnvironmentOverride, IndicatorFrame, ListenerId, ListenerOptions, ScrollPosition, TouchEvent,
    TouchEventKind, TouchHandler, TouchPoint, TouchTarget, VisualSink,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{AddEventListenerOptions, Document, HtmlElement};

type DomTouchClosure = Closure<dyn FnMut(web_sys::TouchEvent)>;

struct DomListener {
    id: ListenerId,
    kind: TouchEventKind,
    closure: DomTouchClosure,
}

/// Touch events of one element.
///
/// Each JS closure is kept until `remove_listener`, which detaches the same
/// function object that was attached.
pub struct DomTouchTarget {
    element: HtmlElement,
    next_id: Cell<u64>,
    listeners: RefCell<Vec<DomListener>>,
}

impl DomTouchTarget {
    pub fn new(element: HtmlElement) -> Self {
        Self {
            element,
            next_id: Cell::new(1),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn element(&self) -> &HtmlElement {
        &self.element
    }
}

fn touch_points(event: &web_sys::TouchEvent) -> Vec<TouchPoint> {
    let touches = event.touches();
    (0..touches.length())
        .filter_map(|index| touches.get(index))
        .map(|touch| {
            TouchPoint::new(
                touch.identifier(),
                touch.client_x() as f32,
                touch.client_y() as f32,
            )
        })
        .collect()
}

impl TouchTarget for DomTouchTarget {
    fn add_listener(
        &self,
        kind: TouchEventKind,
        options: ListenerOptions,
        handler: TouchHandler,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let closure = Closure::wrap(Box::new(move |event: web_sys::TouchEvent| {
            handler(&TouchEvent::new(kind, touch_points(&event)));
        }) as Box<dyn FnMut(_)>);

        let dom_options = AddEventListenerOptions::new();
        dom_options.set_passive(options.passive);
        if let Err(err) = self
            .element
            .add_event_listener_with_callback_and_add_event_listener_options(
                kind.event_type(),
                closure.as_ref().unchecked_ref(),
                &dom_options,
            )
        {
            log::warn!("failed to add {} listener: {:?}", kind.event_type(), err);
        }

        self.listeners
            .borrow_mut()
            .push(DomListener { id, kind, closure });
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        let removed = {
            let mut listeners = self.listeners.borrow_mut();
            listeners
                .iter()
                .position(|listener| listener.id == id)
                .map(|index| listeners.remove(index))
        };
        let Some(listener) = removed else {
            return;
        };
        if let Err(err) = self.element.remove_event_listener_with_callback(
            listener.kind.event_type(),
            listener.closure.as_ref().unchecked_ref(),
        ) {
            log::warn!(
                "failed to remove {} listener: {:?}",
                listener.kind.event_type(),
                err
            );
        }
    }
}

impl Drop for DomTouchTarget {
    fn drop(&mut self) {
        // Detach before the closures are freed.
        for listener in self.listeners.get_mut().drain(..) {
            let _ = self.element.remove_event_listener_with_callback(
                listener.kind.event_type(),
                listener.closure.as_ref().unchecked_ref(),
            );
        }
    }
}

/// The progress indicator element; writes inline `transform` and `opacity`.
pub struct DomIndicator {
    element: HtmlElement,
}

impl DomIndicator {
    pub fn new(element: HtmlElement) -> Self {
        Self { element }
    }
}

impl VisualSink for DomIndicator {
    fn render(&self, frame: IndicatorFrame) {
        let style = self.element.style();
        let result = style
            .set_property("transform", &frame.transform_css())
            .and_then(|_| style.set_property("opacity", &frame.opacity_css()));
        if let Err(err) = result {
            log::warn!("failed to style indicator: {:?}", err);
        }
    }
}

/// Page-wide overrides on `document.body`.
pub struct DocumentEnvironment {
    body: HtmlElement,
}

impl DocumentEnvironment {
    pub fn new(body: HtmlElement) -> Self {
        Self { body }
    }

    fn set(&self, name: &str, value: &str) {
        if let Err(err) = self.body.style().set_property(name, value) {
            log::warn!("failed to set {name} on body: {:?}", err);
        }
    }
}

impl EnvironmentOverride for DocumentEnvironment {
    fn disable_overscroll(&self) {
        self.set("overscroll-behavior-y", "none");
    }

    fn restore_overscroll(&self) {
        self.set("overscroll-behavior-y", "auto");
    }

    fn set_custom_property(&self, name: &str, value: &str) {
        self.set(name, value);
    }

    fn remove_custom_property(&self, name: &str) {
        if let Err(err) = self.body.style().remove_property(name) {
            log::warn!("failed to remove {name} from body: {:?}", err);
        }
    }
}

/// Reads `document.scrollingElement.scrollTop`.
pub struct DocumentScroll {
    document: Document,
}

impl DocumentScroll {
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

impl ScrollPosition for DocumentScroll {
    fn scroll_top(&self) -> Option<f32> {
        self.document
            .scrolling_element()
            .map(|element| element.scroll_top() as f32)
    }
}
