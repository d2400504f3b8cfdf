//! Sticky top bar and header height tracking.
//!
//! Bar and header heights are published as `--bar-height` and
//! `--header-height` on the document element so CSS can offset content.
//! The bar hides while the reader scrolls down past a threshold and comes
//! back when they scroll up.

use anyhow::Result;

use crate::dom::{Dom, ElementId, Selector};
use crate::observer::{ResizeObserver, Size};
use crate::runtime::{Context, Event, EventKind, ListenerId};

use super::Widget;

pub const BAR_CLASS: &str = "sticky-bar";
pub const HEADER_CLASS: &str = "site-header";
pub const HIDDEN_CLASS: &str = "sticky-bar--hidden";
pub const BAR_HEIGHT_VAR: &str = "--bar-height";
pub const HEADER_HEIGHT_VAR: &str = "--header-height";

/// Decides bar visibility from successive scroll offsets.
///
/// At or above the top `threshold` the bar is always shown. Further down,
/// movements no larger than `hysteresis` are ignored so small jitters do not
/// flicker the bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollTracker {
    threshold: f64,
    hysteresis: f64,
    last_y: f64,
    hidden: bool,
}

impl ScrollTracker {
    pub const fn new(threshold: f64, hysteresis: f64) -> Self {
        Self {
            threshold,
            hysteresis,
            last_y: 0.0,
            hidden: false,
        }
    }

    /// Start tracking from offset `y` without hiding the bar; a page that
    /// loads scrolled down has not moved yet.
    #[must_use]
    pub const fn with_start(mut self, y: f64) -> Self {
        self.last_y = y;
        self
    }

    pub const fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Feed a new scroll offset; returns whether the bar should be hidden.
    pub fn update(&mut self, y: f64) -> bool {
        if y <= self.threshold {
            self.last_y = y;
            self.hidden = false;
            return false;
        }
        let delta = y - self.last_y;
        if delta.abs() <= self.hysteresis {
            return self.hidden;
        }
        self.hidden = delta > 0.0;
        self.last_y = y;
        self.hidden
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Heights {
    bar: Option<f64>,
    header: Option<f64>,
}

fn px(height: f64) -> String {
    format!("{}px", height.round())
}

/// Tracks `.sticky-bar` and `.site-header`.
#[derive(Debug)]
pub struct StickyBar {
    bar: Option<ElementId>,
    header: Option<ElementId>,
    tracker: ScrollTracker,
    resize: ResizeObserver,
    scroll_listener: Option<ListenerId>,
    resize_listener: Option<ListenerId>,
}

impl StickyBar {
    pub fn init(ctx: &mut Context<'_>) -> Option<Box<dyn Widget>> {
        let document = ctx.dom.document_element();
        let bar = ctx.dom.query(document, &Selector::class(BAR_CLASS));
        let header = ctx.dom.query(document, &Selector::class(HEADER_CLASS));
        if bar.is_none() && header.is_none() {
            return None;
        }

        let viewport = ctx.dom.viewport();
        let mut resize = ResizeObserver::new(true, ctx.config.resize_debounce_ms);
        resize.observe(Size {
            width: viewport.width,
            height: viewport.height,
        });

        let mut widget = Self {
            bar,
            header,
            tracker: ScrollTracker::new(ctx.config.scroll_threshold, ctx.config.scroll_hysteresis)
                .with_start(viewport.scroll_y),
            resize,
            scroll_listener: bar.map(|_| ctx.listen_window(EventKind::Scroll)),
            resize_listener: Some(ctx.listen_window(EventKind::Resize)),
        };
        widget.measure(ctx);
        if bar.is_some() {
            widget.on_scroll(ctx);
        }
        Some(Box::new(widget))
    }

    pub const fn is_hidden(&self) -> bool {
        self.tracker.is_hidden()
    }

    /// Read both heights next frame and publish them the frame after.
    fn measure(&self, ctx: &mut Context<'_>) {
        let bar = self.bar;
        let header = self.header;
        ctx.schedule(
            move |dom| Heights {
                bar: bar.filter(|&b| dom.exists(b)).map(|b| dom.offset_height(b)),
                header: header.filter(|&h| dom.exists(h)).map(|h| dom.offset_height(h)),
            },
            |dom, heights| {
                let root = dom.document_element();
                if let Some(h) = heights.bar {
                    dom.set_style_property(root, BAR_HEIGHT_VAR, &px(h));
                }
                if let Some(h) = heights.header {
                    dom.set_style_property(root, HEADER_HEIGHT_VAR, &px(h));
                }
            },
        );
    }

    fn on_scroll(&mut self, ctx: &mut Context<'_>) {
        let Some(bar) = self.bar else {
            return;
        };
        let was_hidden = self.tracker.is_hidden();
        let hidden = self.tracker.update(ctx.dom.viewport().scroll_y);
        if hidden == was_hidden && ctx.dom.has_class(bar, HIDDEN_CLASS) == hidden {
            return;
        }
        ctx.mutate(move |dom| {
            if dom.exists(bar) {
                dom.toggle_class(bar, HIDDEN_CLASS, hidden);
            }
        });
    }
}

impl Widget for StickyBar {
    fn name(&self) -> &'static str {
        "sticky-bar"
    }

    fn on_event(&mut self, ctx: &mut Context<'_>, event: &Event, _listener: ListenerId) {
        match event {
            Event::Scroll => self.on_scroll(ctx),
            Event::Resize => {
                let viewport = ctx.dom.viewport();
                let size = Size {
                    width: viewport.width,
                    height: viewport.height,
                };
                if !self.resize.notify(size, ctx.now_ms()) {
                    tracing::trace!("height-only resize ignored");
                }
            }
            _ => {}
        }
    }

    fn on_frame(&mut self, ctx: &mut Context<'_>) {
        if self.resize.take_ready(ctx.now_ms()).is_some() {
            self.measure(ctx);
        }
    }

    fn teardown(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        for listener in [self.scroll_listener.take(), self.resize_listener.take()]
            .into_iter()
            .flatten()
        {
            ctx.unlisten(listener);
        }
        self.resize.destroy();
        Ok(())
    }
}
