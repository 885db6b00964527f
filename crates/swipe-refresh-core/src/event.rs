//! Touch input contract between the coordinator and its scroll container.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TouchEventKind {
    Start,
    Move,
    End,
    Cancel,
}

impl TouchEventKind {
    pub const ALL: [TouchEventKind; 4] = [
        TouchEventKind::Start,
        TouchEventKind::Move,
        TouchEventKind::End,
        TouchEventKind::Cancel,
    ];

    /// DOM event type name.
    pub fn event_type(self) -> &'static str {
        match self {
            TouchEventKind::Start => "touchstart",
            TouchEventKind::Move => "touchmove",
            TouchEventKind::End => "touchend",
            TouchEventKind::Cancel => "touchcancel",
        }
    }

    /// Listener options the coordinator registers this kind with.
    ///
    /// Only touch-move may need to interfere with native scrolling.
    pub fn listener_options(self) -> ListenerOptions {
        match self {
            TouchEventKind::Move => ListenerOptions { passive: false },
            _ => ListenerOptions { passive: true },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchPoint {
    pub identifier: i32,
    pub client_x: f32,
    pub client_y: f32,
}

impl TouchPoint {
    pub fn new(identifier: i32, client_x: f32, client_y: f32) -> Self {
        Self {
            identifier,
            client_x,
            client_y,
        }
    }

    pub fn at_y(client_y: f32) -> Self {
        Self::new(0, 0.0, client_y)
    }
}

/// One touch event with the touch points that are currently active.
///
/// On `End` and `Cancel` the released finger is no longer listed, so the
/// list is commonly empty.
#[derive(Clone, Debug, PartialEq)]
pub struct TouchEvent {
    pub kind: TouchEventKind,
    pub touches: SmallVec<[TouchPoint; 2]>,
}

impl TouchEvent {
    pub fn new(kind: TouchEventKind, touches: impl IntoIterator<Item = TouchPoint>) -> Self {
        Self {
            kind,
            touches: touches.into_iter().collect(),
        }
    }

    pub fn start(y: f32) -> Self {
        Self::new(TouchEventKind::Start, [TouchPoint::at_y(y)])
    }

    pub fn moved(y: f32) -> Self {
        Self::new(TouchEventKind::Move, [TouchPoint::at_y(y)])
    }

    pub fn end() -> Self {
        Self::new(TouchEventKind::End, [])
    }

    pub fn cancel() -> Self {
        Self::new(TouchEventKind::Cancel, [])
    }

    pub fn primary(&self) -> Option<&TouchPoint> {
        self.touches.first()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListenerOptions {
    /// A passive listener promises never to cancel the native scroll.
    pub passive: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

pub type TouchHandler = Rc<dyn Fn(&TouchEvent)>;

/// An element that delivers touch events.
///
/// The handler passed to `add_listener` is the exact value later detached by
/// `remove_listener`; implementations must keep it (or whatever wraps it)
/// until then.
pub trait TouchTarget {
    fn add_listener(
        &self,
        kind: TouchEventKind,
        options: ListenerOptions,
        handler: TouchHandler,
    ) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}
