//! Lifecycle-managed wrappers around visibility and resize detection.
//!
//! Both observers are polled by their owner once per frame rather than
//! calling back into it, so a widget never re-enters itself from inside an
//! observer notification.

pub mod resize;
pub mod visibility;

pub use resize::{ResizeObserver, Size};
pub use visibility::{IntersectionEntry, VisibilityObserver, VisibilityOptions, is_in_viewport};

/// Lifecycle shared by every observer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObserverState {
    /// Nothing observed yet; no underlying watcher exists.
    #[default]
    Uninitialized,
    /// Watcher created and delivering notifications.
    Active,
    /// Disconnected; notifications are dropped until re-initialised.
    Destroyed,
}
