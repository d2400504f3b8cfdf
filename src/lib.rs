// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. carousel::CarouselState)
    clippy::module_name_repetitions
)]

//! # theme-runtime
//!
//! The client-side component runtime of a website theme, modelled against
//! a host document so it runs (and is tested) without a browser.
//!
//! It provides:
//! - Frame-batched DOM reads and writes that never thrash layout
//! - Visibility- and resize-driven activation through polled observers
//! - A page-wide cleanup registry so nothing leaks across page transitions
//! - Widgets: carousel, lazy media, focal-point cropping, sticky bar,
//!   header dropdowns, search overlay
//!
//! ## Architecture
//!
//! A [`runtime::Page`] owns the host document, a virtual clock, timers,
//! event listeners, the [`scheduler::Scheduler`] and every installed widget:
//! - **Host**: the [`dom::Dom`] trait, implemented by [`dom::MemoryDom`]
//! - **Event**: clicks, scrolls, resizes, loads delivered by the page
//! - **Widget**: controllers reacting to events, timers and frames
//! - **Cleanup**: teardowns registered per component name
//!
//! ## Modules
//!
//! - [`dom`]: Host abstraction, selectors, in-memory document
//! - [`scheduler`]: Read/write batching and idle work
//! - [`observer`]: Visibility and resize observers
//! - [`cleanup`]: Teardown registry
//! - [`runtime`]: Page session and event loop
//! - [`widgets`]: Interactive controllers
//! - [`config`]: Tunables and persisted flags
//! - [`script`]: Replaying interaction scripts
//! - [`fixture`]: Page fixtures as JSON

pub mod cleanup;
pub mod config;
pub mod dom;
pub mod fixture;
pub mod observer;
pub mod runtime;
pub mod scheduler;
pub mod script;
pub mod widgets;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::RuntimeConfig;
    pub use crate::dom::{Dom, ElementId, MemoryDom, Selector};
    pub use crate::runtime::{Environment, Event, Page};
    pub use crate::widgets::Widget;
}
