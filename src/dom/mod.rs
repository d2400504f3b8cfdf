//! Host document abstraction.
//!
//! Widgets never talk to a browser directly. Everything they need from the
//! page (tree queries, attributes, classes, inline style, geometry, focus,
//! image decoding, navigation) goes through the [`Dom`] trait. The crate
//! ships [`MemoryDom`], an in-memory host whose layout is given explicitly as
//! element rectangles.

mod memory;
mod selector;

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use memory::{ElementBuilder, MemoryDom, NodeSpec, PageSpec};
pub use selector::{Selector, SelectorError};

/// Opaque handle to an element owned by a [`Dom`] host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    /// Position of the element in the host's arena.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// Axis-aligned rectangle in document coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Grow the rectangle by `margin` on every side (negative shrinks).
    pub fn expand(&self, margin: f64) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            self.width + margin * 2.0,
            self.height + margin * 2.0,
        )
    }

    /// Overlapping region, if the rectangles touch or overlap.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < left || bottom < top {
            return None;
        }
        Some(Self::new(left, top, right - left, bottom - top))
    }
}

/// The visible window onto the document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub scroll_y: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scroll_y: 0.0,
        }
    }

    /// The viewport as a rectangle in document coordinates.
    pub const fn rect(&self) -> Rect {
        Rect::new(0.0, self.scroll_y, self.width, self.height)
    }
}

/// Failures reported by host APIs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("{0} is not attached to the document")]
    Detached(ElementId),
    #[error("{0} could not be decoded")]
    DecodeFailed(ElementId),
}

/// Everything the runtime needs from a host document.
///
/// Methods taking `&self` are reads; the scheduler hands read callbacks a
/// shared borrow so they cannot mutate the page. Methods that touch an
/// element which no longer exists are no-ops (or return `None`/`false`).
pub trait Dom: Any {
    /// The `<html>` element, where page-wide custom properties live.
    fn document_element(&self) -> ElementId;

    /// Whether the element is still attached to the document.
    fn exists(&self, el: ElementId) -> bool;

    fn parent(&self, el: ElementId) -> Option<ElementId>;

    fn children(&self, el: ElementId) -> Vec<ElementId>;

    /// Lowercase tag name.
    fn tag_name(&self, el: ElementId) -> Option<&str>;

    fn attribute(&self, el: ElementId, name: &str) -> Option<&str>;

    fn set_attribute(&mut self, el: ElementId, name: &str, value: &str);

    fn remove_attribute(&mut self, el: ElementId, name: &str);

    fn has_class(&self, el: ElementId, class: &str) -> bool;

    fn add_class(&mut self, el: ElementId, class: &str);

    fn remove_class(&mut self, el: ElementId, class: &str);

    fn style_property(&self, el: ElementId, name: &str) -> Option<&str>;

    fn set_style_property(&mut self, el: ElementId, name: &str, value: &str);

    /// Layout box of the element. This is the call that forces layout in a
    /// real browser, so it belongs in scheduler read phases.
    fn rect(&self, el: ElementId) -> Rect;

    fn viewport(&self) -> Viewport;

    /// Host-side: the user scrolled or the window was resized.
    fn set_viewport(&mut self, viewport: Viewport);

    /// Detach the element (and its subtree) from the document.
    fn remove(&mut self, el: ElementId);

    /// Whether an image has finished loading.
    fn is_complete(&self, el: ElementId) -> bool;

    /// Decode an image off the paint path.
    ///
    /// # Errors
    /// Returns [`DomError`] when the element is gone or the data is undecodable.
    fn decode(&mut self, el: ElementId) -> Result<(), DomError>;

    /// Current value of a form control.
    fn value(&self, el: ElementId) -> Option<&str>;

    fn set_value(&mut self, el: ElementId, value: &str);

    fn focus(&mut self, el: ElementId);

    fn focused(&self) -> Option<ElementId>;

    /// Leave the page for `url`.
    fn navigate(&mut self, url: &str);

    fn has_attribute(&self, el: ElementId, name: &str) -> bool {
        self.attribute(el, name).is_some()
    }

    fn toggle_class(&mut self, el: ElementId, class: &str, on: bool) {
        if on {
            self.add_class(el, class);
        } else {
            self.remove_class(el, class);
        }
    }

    fn offset_height(&self, el: ElementId) -> f64 {
        self.rect(el).height
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        let mut current = Some(node);
        while let Some(el) = current {
            if el == ancestor {
                return true;
            }
            current = self.parent(el);
        }
        false
    }

    /// Descendants of `scope` matching `selector`, in document order.
    fn query_all(&self, scope: ElementId, selector: &Selector) -> Vec<ElementId> {
        let mut found = Vec::new();
        let mut stack: Vec<ElementId> = self.children(scope).into_iter().rev().collect();
        while let Some(el) = stack.pop() {
            if selector.matches(self, el) {
                found.push(el);
            }
            stack.extend(self.children(el).into_iter().rev());
        }
        found
    }

    fn query(&self, scope: ElementId, selector: &Selector) -> Option<ElementId> {
        self.query_all(scope, selector).into_iter().next()
    }

    /// Nearest inclusive ancestor of `el` matching `selector`.
    fn closest(&self, el: ElementId, selector: &Selector) -> Option<ElementId> {
        let mut current = Some(el);
        while let Some(node) = current {
            if selector.matches(self, node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection_of_overlapping_rects() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 50.0, 100.0, 100.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(50.0, 50.0, 50.0, 50.0)));
    }

    #[test]
    fn test_intersection_of_disjoint_rects_is_none() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 0.0, 10.0, 10.0);
        assert_eq!(a.intersection(&b), None);
    }

    #[test]
    fn test_touching_rects_intersect_with_zero_area() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(0.0, 10.0, 10.0, 10.0);
        let hit = a.intersection(&b).unwrap();
        assert_eq!(hit.area(), 0.0);
    }

    #[test]
    fn test_expand_grows_every_side() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0).expand(5.0);
        assert_eq!(r, Rect::new(5.0, 5.0, 30.0, 30.0));
    }

    #[test]
    fn test_viewport_rect_follows_scroll() {
        let mut vp = Viewport::new(800.0, 600.0);
        vp.scroll_y = 250.0;
        assert_eq!(vp.rect(), Rect::new(0.0, 250.0, 800.0, 600.0));
    }
}
