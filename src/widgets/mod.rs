//! Interactive widget controllers.
//!
//! Each controller is built by an `init` function that queries the document
//! once, attaches its listeners and observers, and returns `None` when its
//! markup is missing. Everything afterwards arrives through the [`Widget`]
//! callbacks.

pub mod carousel;
pub mod focal_point;
pub mod header;
pub mod lazy_media;
pub mod search;
pub mod sticky_bar;

use std::any::Any;

use anyhow::Result;

use crate::runtime::{Context, Event, ListenerId, TimerToken};

pub use carousel::Carousel;
pub use focal_point::FocalPointCropper;
pub use header::Header;
pub use lazy_media::LazyMediaLoader;
pub use search::SearchOverlay;
pub use sticky_bar::StickyBar;

/// A live controller installed in a page.
pub trait Widget: Any {
    /// Component name used for the cleanup registry.
    fn name(&self) -> &'static str;

    /// A listener attached by this widget matched `event`.
    fn on_event(&mut self, ctx: &mut Context<'_>, event: &Event, listener: ListenerId);

    /// A timer set by this widget fired.
    fn on_timer(&mut self, ctx: &mut Context<'_>, token: TimerToken) {
        let _ = (ctx, token);
    }

    /// Called once per animation frame, after scheduled work ran. Observers
    /// are polled here.
    fn on_frame(&mut self, ctx: &mut Context<'_>) {
        let _ = ctx;
    }

    /// Detach everything attached since `init` and release observers.
    ///
    /// # Errors
    /// Implementations may report failures; the cleanup registry logs them
    /// and keeps tearing down other widgets.
    fn teardown(&mut self, ctx: &mut Context<'_>) -> Result<()>;
}
