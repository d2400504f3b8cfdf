use crate::dom::ElementId;

/// Host events delivered to widgets.
///
/// These represent user input and browser notifications. Viewport changes
/// (`Scroll`, `Resize`) carry no payload; widgets read the new geometry from
/// the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Pointer
    /// Click on an element (bubbles)
    Click(ElementId),
    /// Touch start on an element (bubbles)
    TouchStart(ElementId),
    /// Pointer entered an element (does not bubble)
    PointerEnter(ElementId),
    /// Pointer left an element (does not bubble)
    PointerLeave(ElementId),

    // Media and forms
    /// Image finished loading (does not bubble)
    Load(ElementId),
    /// Form control value changed (bubbles)
    Input(ElementId),
    /// Form submitted (bubbles)
    Submit(ElementId),

    // Window
    /// Key pressed, by `KeyboardEvent.key` name
    KeyDown(String),
    /// Viewport scrolled
    Scroll,
    /// Viewport resized
    Resize,
}

/// Discriminant of [`Event`], used to subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    TouchStart,
    PointerEnter,
    PointerLeave,
    Load,
    Input,
    Submit,
    KeyDown,
    Scroll,
    Resize,
}

impl EventKind {
    /// Whether the event propagates to ancestors of its target (and on to
    /// window listeners).
    pub const fn bubbles(self) -> bool {
        matches!(self, Self::Click | Self::TouchStart | Self::Input | Self::Submit)
    }
}

impl Event {
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Click(_) => EventKind::Click,
            Self::TouchStart(_) => EventKind::TouchStart,
            Self::PointerEnter(_) => EventKind::PointerEnter,
            Self::PointerLeave(_) => EventKind::PointerLeave,
            Self::Load(_) => EventKind::Load,
            Self::Input(_) => EventKind::Input,
            Self::Submit(_) => EventKind::Submit,
            Self::KeyDown(_) => EventKind::KeyDown,
            Self::Scroll => EventKind::Scroll,
            Self::Resize => EventKind::Resize,
        }
    }

    /// Element the event was fired at; `None` for window events.
    pub const fn target(&self) -> Option<ElementId> {
        match self {
            Self::Click(el)
            | Self::TouchStart(el)
            | Self::PointerEnter(el)
            | Self::PointerLeave(el)
            | Self::Load(el)
            | Self::Input(el)
            | Self::Submit(el) => Some(*el),
            Self::KeyDown(_) | Self::Scroll | Self::Resize => None,
        }
    }
}

/// Where a listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenTarget {
    Window,
    Element(ElementId),
}

impl From<ElementId> for ListenTarget {
    fn from(el: ElementId) -> Self {
        Self::Element(el)
    }
}
