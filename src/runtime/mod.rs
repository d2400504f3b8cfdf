//! The page session: host, clock, scheduler, timers, listeners, widgets.
//!
//! This module follows an event-loop design:
//! - [`Page`]: owns one [`Runtime`] plus its cleanup registry
//! - [`Event`]: everything the host can tell widgets
//! - [`Context`]: what a widget may touch while handling a callback
//! - [`Page::advance`]: drives the virtual clock, timers, and frames
//!
//! Widgets are taken out of their slot while they run, so a callback can
//! never re-enter the widget that is handling it.

mod context;
mod event;
mod event_loop;

pub use context::{Context, ListenerId, Listeners, TimerId, TimerToken, Timers, WidgetId};
pub use event::{Event, EventKind, ListenTarget};
pub use event_loop::Runtime;

use std::rc::Rc;

use crate::cleanup::{CleanupRegistry, CleanupReport};
use crate::config::RuntimeConfig;
use crate::dom::{Dom, ElementId, Selector, Viewport};
use crate::scheduler::{FrameStats, IdleSupport};
use crate::widgets::carousel::{self, Carousel, EngineFactory, TrackEngineFactory};
use crate::widgets::{FocalPointCropper, Header, LazyMediaLoader, SearchOverlay, StickyBar, Widget};

/// Network quality class reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectiveType {
    Slow2g,
    TwoG,
    ThreeG,
    #[default]
    FourG,
}

/// Connection hints used to tone down eager loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Connection {
    pub save_data: bool,
    pub effective_type: EffectiveType,
}

impl Connection {
    pub const fn is_slow(&self) -> bool {
        self.save_data || matches!(self.effective_type, EffectiveType::Slow2g | EffectiveType::TwoG)
    }
}

/// Facts about the host that are not part of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// Address of the current page.
    pub url: String,
    pub connection: Connection,
    pub idle: IdleSupport,
}

impl Environment {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub const fn with_connection(mut self, connection: Connection) -> Self {
        self.connection = connection;
        self
    }

    pub const fn with_idle(mut self, idle: IdleSupport) -> Self {
        self.idle = idle;
        self
    }
}

/// One page load: the runtime plus the ledger of how to tear it down.
pub struct Page {
    runtime: Runtime,
    registry: CleanupRegistry<Runtime>,
    engines: Rc<dyn EngineFactory>,
}

impl Page {
    /// Create a page over `dom` with stock configuration.
    pub fn new(dom: impl Dom + 'static) -> Self {
        Self {
            runtime: Runtime::new(Box::new(dom), RuntimeConfig::default(), Environment::default()),
            registry: CleanupRegistry::new(),
            engines: Rc::new(TrackEngineFactory),
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime.set_config(config);
        self
    }

    pub fn with_environment(mut self, env: Environment) -> Self {
        self.runtime.set_environment(env);
        self
    }

    /// Use a different slide engine for carousels.
    pub fn with_engine_factory(mut self, engines: Rc<dyn EngineFactory>) -> Self {
        self.engines = engines;
        self
    }

    /// Activate every widget whose markup is present. Returns the installed
    /// widgets in activation order.
    pub fn activate(&mut self) -> Vec<WidgetId> {
        let _span = tracing::debug_span!("activate").entered();
        let mut installed = Vec::new();
        installed.extend(self.install(StickyBar::init));
        installed.extend(self.install(Header::init));
        installed.extend(self.install(SearchOverlay::init));
        installed.extend(self.install(LazyMediaLoader::init));
        installed.extend(self.install(FocalPointCropper::init));

        let document = self.runtime.dom().document_element();
        let roots = self
            .runtime
            .dom()
            .query_all(document, &Selector::class(carousel::ROOT_CLASS));
        for root in roots {
            let engines = Rc::clone(&self.engines);
            installed.extend(self.install(move |ctx| Carousel::init(ctx, root, engines)));
        }
        tracing::debug!(widgets = installed.len(), "page activated");
        installed
    }

    /// Run one controller's init and, if it finds its markup, keep it and
    /// register its teardown.
    pub fn install<F>(&mut self, init: F) -> Option<WidgetId>
    where
        F: FnOnce(&mut Context<'_>) -> Option<Box<dyn Widget>>,
    {
        let id = self.runtime.install(init)?;
        let name = self.runtime.widget_name(id)?;
        self.registry
            .register(name, move |runtime: &mut Runtime| runtime.destroy_widget(id));
        Some(id)
    }

    /// Deliver a host event.
    pub fn dispatch(&mut self, event: Event) {
        self.runtime.dispatch(&event);
    }

    /// Scroll the viewport to `y` and fire `Scroll`.
    pub fn scroll_to(&mut self, y: f64) {
        let mut viewport = self.runtime.dom().viewport();
        viewport.scroll_y = y.max(0.0);
        self.runtime.dom_mut().set_viewport(viewport);
        self.runtime.dispatch(&Event::Scroll);
    }

    /// Resize the viewport and fire `Resize`.
    pub fn resize(&mut self, width: f64, height: f64) {
        let scroll_y = self.runtime.dom().viewport().scroll_y;
        self.runtime.dom_mut().set_viewport(Viewport {
            width,
            height,
            scroll_y,
        });
        self.runtime.dispatch(&Event::Resize);
    }

    pub fn click(&mut self, el: ElementId) {
        self.dispatch(Event::Click(el));
    }

    /// Let `ms` milliseconds pass: due timers fire and frames run.
    pub fn advance(&mut self, ms: u64) {
        self.runtime.advance(ms);
    }

    /// Run one frame immediately without moving the clock.
    pub fn frame(&mut self) -> FrameStats {
        self.runtime.run_frame()
    }

    /// Page-teardown hook: run every registered teardown.
    pub fn teardown(&mut self) -> CleanupReport {
        let _span = tracing::debug_span!("teardown").entered();
        self.registry.cleanup_all(&mut self.runtime)
    }

    /// Run one component's teardown by name or `cleanup<WidgetName>` hook.
    pub fn cleanup(&mut self, name_or_hook: &str) -> Option<CleanupReport> {
        self.registry.cleanup(name_or_hook, &mut self.runtime)
    }

    pub const fn registry(&self) -> &CleanupRegistry<Runtime> {
        &self.registry
    }

    pub const fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn dom(&self) -> &dyn Dom {
        self.runtime.dom()
    }

    pub fn dom_mut(&mut self) -> &mut dyn Dom {
        self.runtime.dom_mut()
    }

    /// The host as its concrete type, e.g. `page.host::<MemoryDom>()`.
    pub fn host<D: Dom>(&self) -> Option<&D> {
        self.runtime.host()
    }

    pub fn host_mut<D: Dom>(&mut self) -> Option<&mut D> {
        self.runtime.host_mut()
    }

    pub const fn now_ms(&self) -> u64 {
        self.runtime.now_ms()
    }

    /// Borrow an installed widget as its concrete type.
    pub fn widget<W: Widget>(&self, id: WidgetId) -> Option<&W> {
        self.runtime.widget(id)
    }
}
