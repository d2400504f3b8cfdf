//! Debounced resize notifications with optional width-only filtering.
//!
//! Mobile browsers resize the viewport vertically whenever the toolbar
//! slides in or out. Layout that only depends on width should not be
//! recomputed for those, so `width_only` swallows notifications whose width
//! matches the last accepted one.

use super::ObserverState;

/// Default debounce before a resize is forwarded.
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Width and height in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug)]
pub struct ResizeObserver {
    width_only: bool,
    debounce_ms: u64,
    last_accepted: Option<Size>,
    pending: Option<(Size, u64)>,
    state: ObserverState,
}

impl ResizeObserver {
    pub const fn new(width_only: bool, debounce_ms: u64) -> Self {
        Self {
            width_only,
            debounce_ms,
            last_accepted: None,
            pending: None,
            state: ObserverState::Uninitialized,
        }
    }

    /// Record the size the target had when observation started, so the
    /// first real change is measured against it.
    pub const fn observe(&mut self, initial: Size) {
        self.last_accepted = Some(initial);
        self.pending = None;
        self.state = ObserverState::Active;
    }

    pub const fn state(&self) -> ObserverState {
        self.state
    }

    /// Feed a size change. Returns whether it was accepted (and the debounce
    /// restarted).
    pub fn notify(&mut self, size: Size, now_ms: u64) -> bool {
        if self.state == ObserverState::Destroyed {
            return false;
        }
        if self.width_only
            && self
                .last_accepted
                .is_some_and(|last| (last.width - size.width).abs() < f64::EPSILON)
        {
            return false;
        }
        self.state = ObserverState::Active;
        self.last_accepted = Some(size);
        self.pending = Some((size, now_ms));
        true
    }

    /// The latest accepted size, once the debounce window has passed.
    pub fn take_ready(&mut self, now_ms: u64) -> Option<Size> {
        let (size, queued_at) = self.pending?;
        if now_ms.saturating_sub(queued_at) >= self.debounce_ms {
            self.pending = None;
            Some(size)
        } else {
            None
        }
    }

    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Disconnect; later notifications are ignored.
    pub const fn destroy(&mut self) {
        self.pending = None;
        self.state = ObserverState::Destroyed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn size(width: f64, height: f64) -> Size {
        Size { width, height }
    }

    #[test]
    fn test_debounce_coalesces_bursts() {
        let mut observer = ResizeObserver::new(false, 150);
        observer.notify(size(800.0, 600.0), 0);
        observer.notify(size(700.0, 600.0), 50);
        observer.notify(size(600.0, 600.0), 100);
        assert_eq!(observer.take_ready(200), None, "last notify restarted the window");
        assert_eq!(observer.take_ready(250), Some(size(600.0, 600.0)));
        assert_eq!(observer.take_ready(400), None);
    }

    #[test]
    fn test_width_only_swallows_height_changes() {
        let mut observer = ResizeObserver::new(true, 150);
        observer.observe(size(390.0, 700.0));
        assert!(!observer.notify(size(390.0, 640.0), 0), "toolbar show/hide");
        assert!(!observer.is_pending());
        assert!(observer.notify(size(844.0, 390.0), 10), "rotation changes width");
        assert!(observer.is_pending());
    }

    #[test]
    fn test_width_and_height_mode_accepts_height_changes() {
        let mut observer = ResizeObserver::new(false, 0);
        observer.observe(size(390.0, 700.0));
        assert!(observer.notify(size(390.0, 640.0), 0));
        assert_eq!(observer.take_ready(0), Some(size(390.0, 640.0)));
    }

    #[test]
    fn test_destroy_drops_pending_and_ignores_later_changes() {
        let mut observer = ResizeObserver::new(false, 150);
        observer.notify(size(800.0, 600.0), 0);
        observer.destroy();
        assert_eq!(observer.take_ready(1000), None);
        assert!(!observer.notify(size(900.0, 600.0), 1000));
        assert_eq!(observer.state(), ObserverState::Destroyed);
    }
}
