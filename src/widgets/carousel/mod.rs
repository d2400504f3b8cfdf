//! Responsive slide carousel.
//!
//! A carousel mounts its slide engine only when it has to scroll: on narrow
//! viewports, or on desktop when there are more slides than fit. Crossing
//! the breakpoint mounts or unmounts it again, releasing everything the
//! mount attached.

mod autoplay;
mod engine;

pub use autoplay::AutoplayState;
pub use engine::{
    Align, Effect, EngineEvent, EngineFactory, EngineOptions, SlideEngine, TrackEngine,
    TrackEngineFactory,
};

use std::rc::Rc;

use anyhow::Result;

use crate::config::RuntimeConfig;
use crate::dom::{Dom, ElementId, Selector};
use crate::observer::{VisibilityObserver, VisibilityOptions};
use crate::runtime::{Context, Event, EventKind, ListenerId, TimerToken};

use super::Widget;
use autoplay::Autoplay;

pub const ROOT_CLASS: &str = "carousel";
pub const VIEWPORT_CLASS: &str = "carousel__viewport";
pub const SLIDE_CLASS: &str = "carousel__slide";
pub const PREV_CLASS: &str = "carousel__prev";
pub const NEXT_CLASS: &str = "carousel__next";
pub const DOT_CLASS: &str = "carousel__dot";
pub const SELECTED_CLASS: &str = "is-selected";
/// Set on the root while the engine is mounted.
pub const MOUNTED_CLASS: &str = "is-mounted";

/// Lifecycle of one carousel's engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CarouselState {
    #[default]
    Uninitialized,
    Mounted,
    Destroyed,
}

/// Per-carousel settings read from the root's data attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarouselSettings {
    /// Autoplay interval; `None` disables autoplay.
    pub timer_ms: Option<u64>,
    pub effect: Effect,
    pub pause_on_hover: bool,
    pub stop_on_interaction: bool,
    pub max_desktop_slides: usize,
    pub always_mount: bool,
}

impl CarouselSettings {
    pub fn from_root(dom: &dyn Dom, root: ElementId, config: &RuntimeConfig) -> Self {
        let timer_ms = dom
            .attribute(root, "data-timer")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|&ms| ms > 0);
        let max_desktop_slides = dom
            .attribute(root, "data-max-slides")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(config.max_desktop_slides);
        Self {
            timer_ms,
            effect: Effect::from_attr(dom.attribute(root, "data-effect")),
            pause_on_hover: flag(dom.attribute(root, "data-pause-on-hover"), true),
            stop_on_interaction: flag(dom.attribute(root, "data-pause"), true),
            max_desktop_slides,
            always_mount: dom
                .attribute(root, "data-mount")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("always")),
        }
    }
}

fn flag(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => default,
        Some(v) => !matches!(v.as_str(), "false" | "0" | "no" | "off"),
    }
}

/// Whether a carousel needs its engine.
///
/// Desktop carousels whose slides all fit stay static unless the page forces
/// a mount.
pub const fn should_mount(
    is_desktop: bool,
    slide_count: usize,
    max_desktop_slides: usize,
    always_mount: bool,
) -> bool {
    always_mount || !(is_desktop && slide_count <= max_desktop_slides)
}

/// Debounced breakpoint query driven by window resizes.
#[derive(Debug)]
struct MediaWatch {
    debounce_ms: u64,
    pending_since: Option<u64>,
    is_desktop: bool,
}

impl MediaWatch {
    const fn queue(&mut self, now_ms: u64) {
        self.pending_since = Some(now_ms);
    }

    fn take_ready(&mut self, now_ms: u64) -> bool {
        match self.pending_since {
            Some(since) if now_ms.saturating_sub(since) >= self.debounce_ms => {
                self.pending_since = None;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Default)]
struct Controls {
    prev: Option<ElementId>,
    next: Option<ElementId>,
    dots: Vec<ElementId>,
}

impl Controls {
    fn find(dom: &dyn Dom, root: ElementId) -> Self {
        Self {
            prev: dom.query(root, &Selector::class(PREV_CLASS)),
            next: dom.query(root, &Selector::class(NEXT_CLASS)),
            dots: dom.query_all(root, &Selector::class(DOT_CLASS)),
        }
    }

    fn contains(&self, dom: &dyn Dom, target: ElementId) -> bool {
        self.prev
            .iter()
            .chain(self.next.iter())
            .chain(self.dots.iter())
            .any(|&control| dom.contains(control, target))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Prev,
    Next,
    Dot(usize),
    Interaction,
    HoverEnter,
    HoverLeave,
}

/// Everything that exists only while mounted.
struct Mounted {
    engine: Box<dyn SlideEngine>,
    listeners: Vec<(ListenerId, Role)>,
    autoplay: Option<Autoplay>,
    visibility: Option<VisibilityObserver>,
}

impl Mounted {
    fn role(&self, listener: ListenerId) -> Option<Role> {
        self.listeners
            .iter()
            .find(|(id, _)| *id == listener)
            .map(|(_, role)| *role)
    }
}

/// Snapshot of engine state written to the controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ControlState {
    can_prev: bool,
    can_next: bool,
    selected: usize,
}

/// One `.carousel` and its responsive engine.
pub struct Carousel {
    root: ElementId,
    viewport: ElementId,
    slides: Vec<ElementId>,
    controls: Controls,
    settings: CarouselSettings,
    engines: Rc<dyn EngineFactory>,
    state: CarouselState,
    media: MediaWatch,
    resize_listener: Option<ListenerId>,
    mounted: Option<Mounted>,
    mount_count: usize,
}

impl Carousel {
    /// Build the controller for `root`. Returns `None` when the track
    /// container is missing.
    pub fn init(
        ctx: &mut Context<'_>,
        root: ElementId,
        engines: Rc<dyn EngineFactory>,
    ) -> Option<Box<dyn Widget>> {
        let Some(viewport) = ctx.dom.query(root, &Selector::class(VIEWPORT_CLASS)) else {
            tracing::debug!(%root, "carousel without viewport skipped");
            return None;
        };
        let slides = ctx.dom.query_all(root, &Selector::class(SLIDE_CLASS));
        let controls = Controls::find(ctx.dom, root);
        let settings = CarouselSettings::from_root(ctx.dom, root, ctx.config);
        let is_desktop = is_desktop(ctx.dom, ctx.config);

        let mut carousel = Self {
            root,
            viewport,
            slides,
            controls,
            settings,
            engines,
            state: CarouselState::Uninitialized,
            media: MediaWatch {
                debounce_ms: ctx.config.media_debounce_ms,
                pending_since: None,
                is_desktop,
            },
            resize_listener: Some(ctx.listen_window(EventKind::Resize)),
            mounted: None,
            mount_count: 0,
        };
        if carousel.wants_mount(is_desktop) {
            carousel.mount(ctx);
        }
        Some(Box::new(carousel))
    }

    pub const fn state(&self) -> CarouselState {
        self.state
    }

    pub const fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    pub const fn settings(&self) -> &CarouselSettings {
        &self.settings
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// How many times the engine has been mounted.
    pub const fn mount_count(&self) -> usize {
        self.mount_count
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.mounted.as_ref().map(|m| m.engine.selected_index())
    }

    /// `None` while unmounted or when the carousel has no autoplay.
    pub fn autoplay_state(&self) -> Option<AutoplayState> {
        self.mounted.as_ref()?.autoplay.as_ref().map(Autoplay::state)
    }

    fn wants_mount(&self, is_desktop: bool) -> bool {
        should_mount(
            is_desktop,
            self.slides.len(),
            self.settings.max_desktop_slides,
            self.settings.always_mount,
        )
    }

    fn mount(&mut self, ctx: &mut Context<'_>) {
        if self.mounted.is_some() {
            return;
        }
        let options = EngineOptions::for_effect(self.settings.effect);
        let engine = self.engines.create(ctx.dom, self.viewport, &self.slides, options);

        let mut listeners = Vec::new();
        if let Some(prev) = self.controls.prev {
            listeners.push((ctx.listen(prev, EventKind::Click), Role::Prev));
        }
        if let Some(next) = self.controls.next {
            listeners.push((ctx.listen(next, EventKind::Click), Role::Next));
        }
        for (index, &dot) in self.controls.dots.iter().enumerate() {
            listeners.push((ctx.listen(dot, EventKind::Click), Role::Dot(index)));
        }

        let mut autoplay = self.settings.timer_ms.map(|ms| {
            Autoplay::new(ms, self.settings.pause_on_hover, self.settings.stop_on_interaction)
        });
        let mut visibility = None;
        if let Some(autoplay) = autoplay.as_mut() {
            let root = self.root;
            listeners.push((ctx.listen(root, EventKind::Click), Role::Interaction));
            listeners.push((ctx.listen(root, EventKind::TouchStart), Role::Interaction));
            listeners.push((ctx.listen(root, EventKind::PointerEnter), Role::HoverEnter));
            listeners.push((ctx.listen(root, EventKind::PointerLeave), Role::HoverLeave));

            let options = VisibilityOptions::default()
                .with_root_margin(0.0)
                .with_threshold(ctx.config.autoplay_visibility_threshold);
            let mut observer = VisibilityObserver::new(options);
            observer.observe(root);
            visibility = Some(observer);
            autoplay.start(ctx);
        }

        let root = self.root;
        ctx.mutate(move |dom| {
            if dom.exists(root) {
                dom.add_class(root, MOUNTED_CLASS);
            }
        });

        self.mounted = Some(Mounted {
            engine,
            listeners,
            autoplay,
            visibility,
        });
        self.state = CarouselState::Mounted;
        self.mount_count += 1;
        tracing::debug!(root = %self.root, slides = self.slides.len(), "carousel mounted");
        self.sync(ctx);
    }

    fn unmount(&mut self, ctx: &mut Context<'_>) {
        let Some(mut mounted) = self.mounted.take() else {
            return;
        };
        if let Some(autoplay) = mounted.autoplay.as_mut() {
            autoplay.pause(ctx);
        }
        if let Some(visibility) = mounted.visibility.as_mut() {
            visibility.destroy();
        }
        for (listener, _) in mounted.listeners.drain(..) {
            ctx.unlisten(listener);
        }
        mounted.engine.destroy(ctx.dom);

        let root = self.root;
        ctx.mutate(move |dom| {
            if dom.exists(root) {
                dom.remove_class(root, MOUNTED_CLASS);
            }
        });
        self.state = CarouselState::Destroyed;
        tracing::debug!(root = %self.root, "carousel unmounted");
    }

    /// Drain engine events and refresh the controls if any arrived.
    fn sync(&mut self, ctx: &mut Context<'_>) {
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };
        let events = mounted.engine.take_events();
        let refresh = events.iter().any(|e| {
            matches!(
                e,
                EngineEvent::Init | EngineEvent::Select | EngineEvent::ReInit | EngineEvent::Settle
            )
        });
        if !refresh {
            return;
        }
        let state = ControlState {
            can_prev: mounted.engine.can_scroll_prev(),
            can_next: mounted.engine.can_scroll_next(),
            selected: mounted.engine.selected_index(),
        };
        let prev = self.controls.prev;
        let next = self.controls.next;
        let dots = self.controls.dots.clone();
        let slides = self.slides.clone();
        let viewport = self.viewport;
        ctx.mutate(move |dom| {
            write_button(dom, prev, state.can_prev);
            write_button(dom, next, state.can_next);
            for (index, &dot) in dots.iter().enumerate() {
                if !dom.exists(dot) {
                    continue;
                }
                let selected = index == state.selected;
                dom.toggle_class(dot, SELECTED_CLASS, selected);
                if selected {
                    dom.set_attribute(dot, "aria-current", "true");
                } else {
                    dom.remove_attribute(dot, "aria-current");
                }
            }
            for (index, &slide) in slides.iter().enumerate() {
                if dom.exists(slide) {
                    dom.toggle_class(slide, SELECTED_CLASS, index == state.selected);
                }
            }
            if dom.exists(viewport) {
                dom.set_style_property(viewport, "--carousel-index", &state.selected.to_string());
            }
        });
    }

    fn handle_control(&mut self, ctx: &mut Context<'_>, role: Role) {
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };
        match role {
            Role::Prev => mounted.engine.scroll_prev(),
            Role::Next => mounted.engine.scroll_next(),
            Role::Dot(index) => mounted.engine.scroll_to(index),
            _ => return,
        }
        self.sync(ctx);
    }

    fn handle_interaction(&mut self, ctx: &mut Context<'_>, target: Option<ElementId>) {
        let on_control = target.is_some_and(|t| self.controls.contains(ctx.dom, t));
        let Some(autoplay) = self.mounted.as_mut().and_then(|m| m.autoplay.as_mut()) else {
            return;
        };
        if on_control {
            autoplay.control_interaction(ctx);
        } else {
            autoplay.outside_interaction(ctx);
        }
    }

    fn advance_autoplay(&mut self, ctx: &mut Context<'_>) {
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };
        if !mounted.autoplay.as_ref().is_some_and(Autoplay::should_advance) {
            return;
        }
        if mounted.engine.can_scroll_next() {
            mounted.engine.scroll_next();
        } else {
            mounted.engine.scroll_to(0);
        }
        self.sync(ctx);
    }

    fn check_breakpoint(&mut self, ctx: &mut Context<'_>) {
        if !self.media.take_ready(ctx.now_ms()) {
            return;
        }
        let is_desktop = is_desktop(ctx.dom, ctx.config);
        if is_desktop == self.media.is_desktop {
            return;
        }
        self.media.is_desktop = is_desktop;
        tracing::debug!(root = %self.root, is_desktop, "carousel crossed breakpoint");
        match (self.wants_mount(is_desktop), self.mounted.is_some()) {
            (true, false) => self.mount(ctx),
            (false, true) => self.unmount(ctx),
            _ => {}
        }
    }
}

fn is_desktop(dom: &dyn Dom, config: &RuntimeConfig) -> bool {
    dom.viewport().width >= config.breakpoint_px
}

fn write_button(dom: &mut dyn Dom, button: Option<ElementId>, enabled: bool) {
    let Some(button) = button.filter(|&b| dom.exists(b)) else {
        return;
    };
    if enabled {
        dom.remove_attribute(button, "disabled");
    } else {
        dom.set_attribute(button, "disabled", "");
    }
}

impl Widget for Carousel {
    fn name(&self) -> &'static str {
        "carousel"
    }

    fn on_event(&mut self, ctx: &mut Context<'_>, event: &Event, listener: ListenerId) {
        if Some(listener) == self.resize_listener {
            self.media.queue(ctx.now_ms());
            return;
        }
        let Some(role) = self.mounted.as_ref().and_then(|m| m.role(listener)) else {
            return;
        };
        match role {
            Role::Prev | Role::Next | Role::Dot(_) => self.handle_control(ctx, role),
            Role::Interaction => self.handle_interaction(ctx, event.target()),
            Role::HoverEnter | Role::HoverLeave => {
                if let Some(autoplay) = self.mounted.as_mut().and_then(|m| m.autoplay.as_mut()) {
                    if role == Role::HoverEnter {
                        autoplay.pointer_enter(ctx);
                    } else {
                        autoplay.pointer_leave(ctx);
                    }
                }
            }
        }
    }

    fn on_timer(&mut self, ctx: &mut Context<'_>, token: TimerToken) {
        if token == autoplay::TICK {
            self.advance_autoplay(ctx);
        }
    }

    fn on_frame(&mut self, ctx: &mut Context<'_>) {
        self.check_breakpoint(ctx);
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };
        if let (Some(visibility), Some(autoplay)) =
            (mounted.visibility.as_mut(), mounted.autoplay.as_mut())
        {
            for entry in visibility.take_entries(ctx.dom) {
                autoplay.visibility_changed(ctx, entry.is_intersecting);
            }
        }
        self.sync(ctx);
    }

    fn teardown(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        self.unmount(ctx);
        if let Some(listener) = self.resize_listener.take() {
            ctx.unlisten(listener);
        }
        self.state = CarouselState::Destroyed;
        Ok(())
    }
}
