use std::panic::{self, AssertUnwindSafe};

use anyhow::Result;

use crate::config::RuntimeConfig;
use crate::dom::Dom;
use crate::scheduler::{FrameStats, Scheduler};
use crate::widgets::Widget;

use super::Environment;
use super::context::{Context, ListenerId, Listeners, TimerToken, Timers, WidgetId};
use super::event::Event;

/// Everything a page session owns apart from its cleanup registry.
///
/// Teardown callbacks receive `&mut Runtime`, which is how they reach the
/// widget they were registered for without holding on to it.
pub struct Runtime {
    dom: Box<dyn Dom>,
    config: RuntimeConfig,
    env: Environment,
    now_ms: u64,
    next_frame_at: u64,
    scheduler: Scheduler,
    timers: Timers,
    listeners: Listeners,
    widgets: Vec<Option<Box<dyn Widget>>>,
}

impl Runtime {
    pub(super) fn new(dom: Box<dyn Dom>, config: RuntimeConfig, env: Environment) -> Self {
        Self {
            dom,
            next_frame_at: config.frame_ms,
            scheduler: Scheduler::new(env.idle, config.idle_timeout_ms),
            config,
            env,
            now_ms: 0,
            timers: Timers::default(),
            listeners: Listeners::default(),
            widgets: Vec::new(),
        }
    }

    pub(super) fn set_config(&mut self, config: RuntimeConfig) {
        self.next_frame_at = self.now_ms + config.frame_ms;
        self.scheduler = Scheduler::new(self.env.idle, config.idle_timeout_ms);
        self.config = config;
    }

    pub(super) fn set_environment(&mut self, env: Environment) {
        self.scheduler = Scheduler::new(env.idle, self.config.idle_timeout_ms);
        self.env = env;
    }

    pub fn dom(&self) -> &dyn Dom {
        self.dom.as_ref()
    }

    pub fn dom_mut(&mut self) -> &mut dyn Dom {
        self.dom.as_mut()
    }

    /// Borrow the host as its concrete type.
    pub fn host<D: Dom>(&self) -> Option<&D> {
        let any: &dyn std::any::Any = self.dom.as_ref();
        any.downcast_ref::<D>()
    }

    pub fn host_mut<D: Dom>(&mut self) -> Option<&mut D> {
        let any: &mut dyn std::any::Any = self.dom.as_mut();
        any.downcast_mut::<D>()
    }

    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub const fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub const fn timers(&self) -> &Timers {
        &self.timers
    }

    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Number of widgets still installed.
    pub fn widget_count(&self) -> usize {
        self.widgets.iter().filter(|w| w.is_some()).count()
    }

    pub fn widget_name(&self, id: WidgetId) -> Option<&'static str> {
        self.widgets.get(id.0)?.as_ref().map(|w| w.name())
    }

    pub fn widget<W: Widget>(&self, id: WidgetId) -> Option<&W> {
        let widget: &dyn Widget = self.widgets.get(id.0)?.as_deref()?;
        let any: &dyn std::any::Any = widget;
        any.downcast_ref::<W>()
    }

    pub(super) fn install<F>(&mut self, init: F) -> Option<WidgetId>
    where
        F: FnOnce(&mut Context<'_>) -> Option<Box<dyn Widget>>,
    {
        let id = WidgetId(self.widgets.len());
        self.widgets.push(None);
        let mut ctx = self.context(id);
        match init(&mut ctx) {
            Some(widget) => {
                tracing::debug!(widget = widget.name(), slot = id.0, "widget installed");
                self.widgets[id.0] = Some(widget);
                Some(id)
            }
            None => {
                // Anything a half-initialised controller attached goes with it.
                self.release(id);
                self.widgets.pop();
                None
            }
        }
    }

    /// Tear down one widget. Succeeds quietly if it is already gone.
    pub fn destroy_widget(&mut self, id: WidgetId) -> Result<()> {
        let Some(mut widget) = self.widgets.get_mut(id.0).and_then(Option::take) else {
            return Ok(());
        };
        let name = widget.name();
        let result = {
            let mut ctx = self.context(id);
            widget.teardown(&mut ctx)
        };
        let leftovers = self.listeners.count_for(id);
        if leftovers > 0 {
            tracing::warn!(widget = name, leftovers, "teardown left listeners attached");
        }
        self.release(id);
        tracing::debug!(widget = name, slot = id.0, "widget destroyed");
        result
    }

    pub(super) fn dispatch(&mut self, event: &Event) {
        let hits = self.listeners.matching(self.dom.as_ref(), event);
        for (listener, owner) in hits {
            // An earlier handler may have detached this one.
            if !self.listeners.is_attached(listener) {
                continue;
            }
            self.with_widget(owner, |widget, ctx| widget.on_event(ctx, event, listener));
        }
    }

    pub(super) fn advance(&mut self, ms: u64) {
        let target = self.now_ms + ms;
        while self.now_ms < target {
            let step = self.next_frame_at.min(target);
            self.fire_timers(step);
            self.now_ms = step;
            if step == self.next_frame_at {
                self.run_frame();
                self.next_frame_at += self.config.frame_ms.max(1);
            }
        }
    }

    pub(super) fn run_frame(&mut self) -> FrameStats {
        let _span = tracing::trace_span!("frame", now_ms = self.now_ms).entered();
        let stats = self.scheduler.run_frame(self.dom.as_mut(), self.now_ms);
        for slot in 0..self.widgets.len() {
            self.with_widget(WidgetId(slot), |widget, ctx| widget.on_frame(ctx));
        }
        stats
    }

    fn fire_timers(&mut self, limit: u64) {
        while let Some(fired) = self.timers.pop_due(limit) {
            self.now_ms = self.now_ms.max(fired.due_at);
            self.deliver_timer(fired.owner, fired.token);
        }
    }

    fn deliver_timer(&mut self, owner: WidgetId, token: TimerToken) {
        self.with_widget(owner, |widget, ctx| widget.on_timer(ctx, token));
    }

    fn context(&mut self, owner: WidgetId) -> Context<'_> {
        Context {
            dom: self.dom.as_mut(),
            config: &self.config,
            env: &self.env,
            scheduler: &mut self.scheduler,
            timers: &mut self.timers,
            listeners: &mut self.listeners,
            now_ms: self.now_ms,
            owner,
        }
    }

    /// Run `f` with the widget taken out of its slot. A widget that panics
    /// is dropped along with its listeners and timers; the others keep going.
    fn with_widget<F>(&mut self, id: WidgetId, f: F)
    where
        F: FnOnce(&mut dyn Widget, &mut Context<'_>),
    {
        let Some(mut widget) = self.widgets.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        let outcome = {
            let mut ctx = self.context(id);
            panic::catch_unwind(AssertUnwindSafe(|| f(widget.as_mut(), &mut ctx)))
        };
        match outcome {
            Ok(()) => self.widgets[id.0] = Some(widget),
            Err(_) => {
                tracing::warn!(widget = widget.name(), slot = id.0, "widget panicked; removed");
                self.release(id);
            }
        }
    }

    fn release(&mut self, id: WidgetId) {
        self.listeners.detach_owner(id);
        self.timers.clear_owner(id);
    }

    /// Listener ids attached by one widget are opaque to everyone else; this
    /// is only for diagnostics.
    pub fn is_listener_attached(&self, id: ListenerId) -> bool {
        self.listeners.is_attached(id)
    }
}
