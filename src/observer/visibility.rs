//! Viewport intersection tracking.

use crate::dom::{Dom, ElementId, Rect};

use super::ObserverState;

/// Default margin around the root, in pixels.
pub const DEFAULT_ROOT_MARGIN: f64 = 100.0;
/// Default visible fraction that counts as "intersecting".
pub const DEFAULT_THRESHOLD: f64 = 0.01;

/// Options for a [`VisibilityObserver`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityOptions {
    /// Element whose box is the root; `None` means the viewport.
    pub root: Option<ElementId>,
    /// Margin added around the root on every side.
    pub root_margin: f64,
    /// Fraction of the target that must be inside the root.
    pub threshold: f64,
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self {
            root: None,
            root_margin: DEFAULT_ROOT_MARGIN,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl VisibilityOptions {
    pub const fn with_root_margin(mut self, margin: f64) -> Self {
        self.root_margin = margin;
        self
    }

    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

/// One visibility change for one target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: ElementId,
    pub is_intersecting: bool,
    /// Fraction of the target inside the root, `0.0..=1.0`.
    pub ratio: f64,
}

#[derive(Debug, Default)]
struct Watcher {
    /// Targets with the last state reported for them (`None` = not yet).
    targets: Vec<(ElementId, Option<bool>)>,
}

/// Watches elements for entering and leaving the viewport.
#[derive(Debug, Default)]
pub struct VisibilityObserver {
    options: VisibilityOptions,
    state: ObserverState,
    watcher: Option<Watcher>,
}

impl VisibilityObserver {
    pub fn new(options: VisibilityOptions) -> Self {
        Self {
            options,
            state: ObserverState::Uninitialized,
            watcher: None,
        }
    }

    pub const fn state(&self) -> ObserverState {
        self.state
    }

    pub const fn options(&self) -> &VisibilityOptions {
        &self.options
    }

    /// Start watching `el`. Creates the watcher on first use, including after
    /// [`destroy`](Self::destroy).
    pub fn observe(&mut self, el: ElementId) {
        let watcher = self.watcher.get_or_insert_with(|| {
            tracing::trace!("visibility watcher created");
            Watcher::default()
        });
        self.state = ObserverState::Active;
        if !watcher.targets.iter().any(|(t, _)| *t == el) {
            watcher.targets.push((el, None));
        }
    }

    /// Stop watching one element; the watcher stays alive.
    pub fn unobserve(&mut self, el: ElementId) {
        if let Some(watcher) = self.watcher.as_mut() {
            watcher.targets.retain(|(t, _)| *t != el);
        }
    }

    /// Disconnect and release the watcher.
    pub fn destroy(&mut self) {
        if self.watcher.take().is_some() {
            tracing::trace!("visibility watcher destroyed");
        }
        self.state = ObserverState::Destroyed;
    }

    pub fn is_observing(&self, el: ElementId) -> bool {
        self.watcher
            .as_ref()
            .is_some_and(|w| w.targets.iter().any(|(t, _)| *t == el))
    }

    pub fn observed_count(&self) -> usize {
        self.watcher.as_ref().map_or(0, |w| w.targets.len())
    }

    /// Collect visibility changes since the last poll.
    ///
    /// The first poll after `observe` reports the target's current state;
    /// later polls only report transitions. Targets that left the document
    /// are dropped silently.
    pub fn take_entries(&mut self, dom: &dyn Dom) -> Vec<IntersectionEntry> {
        let Some(watcher) = self.watcher.as_mut() else {
            return Vec::new();
        };
        let Some(root) = root_rect(dom, &self.options) else {
            return Vec::new();
        };

        watcher.targets.retain(|(t, _)| dom.exists(*t));
        let mut entries = Vec::new();
        for (target, last) in &mut watcher.targets {
            let ratio = intersection_ratio(&dom.rect(*target), &root);
            let is_intersecting = passes_threshold(ratio, self.options.threshold);
            if *last != Some(is_intersecting) {
                *last = Some(is_intersecting);
                entries.push(IntersectionEntry {
                    target: *target,
                    is_intersecting,
                    ratio,
                });
            }
        }
        entries
    }
}

/// Whether `el` is inside the viewport (grown by `margin`) right now.
pub fn is_in_viewport(dom: &dyn Dom, el: ElementId, margin: f64) -> bool {
    let root = dom.viewport().rect().expand(margin);
    intersection_ratio(&dom.rect(el), &root) > 0.0
}

fn root_rect(dom: &dyn Dom, options: &VisibilityOptions) -> Option<Rect> {
    let rect = match options.root {
        Some(root) if dom.exists(root) => dom.rect(root),
        Some(_) => return None,
        None => dom.viewport().rect(),
    };
    Some(rect.expand(options.root_margin))
}

fn intersection_ratio(target: &Rect, root: &Rect) -> f64 {
    let Some(hit) = target.intersection(root) else {
        return 0.0;
    };
    let area = target.area();
    if area <= 0.0 {
        // Zero-sized targets count as fully visible when their box touches the root.
        return 1.0;
    }
    (hit.area() / area).clamp(0.0, 1.0)
}

fn passes_threshold(ratio: f64, threshold: f64) -> bool {
    if threshold <= 0.0 {
        ratio > 0.0
    } else {
        ratio >= threshold
    }
}
