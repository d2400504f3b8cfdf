//! Deferred image loading.
//!
//! Images carry their real sources in `data-*` attributes. Those already on
//! screen are loaded straight away with high priority; the rest wait for the
//! visibility observer and load with low priority.

use anyhow::Result;

use crate::dom::{Dom, ElementId, Selector};
use crate::observer::{VisibilityObserver, VisibilityOptions, is_in_viewport};
use crate::runtime::{Context, Event, EventKind, ListenerId, TimerId, TimerToken};

use super::Widget;

pub const WRAPPER_CLASS: &str = "lazy-media";
pub const PLACEHOLDER_CLASS: &str = "lazy-media__placeholder";
pub const LOADED_CLASS: &str = "is-loaded";
pub const HIDDEN_CLASS: &str = "is-hidden";

/// Priority for images loaded by scrolling into view, on any connection.
/// Only on-screen images at activation are raised.
const DEFERRED_PRIORITY: FetchPriority = FetchPriority::Low;

/// `data-*` attribute and the attribute it is promoted to.
const PROMOTIONS: [(&str, &str); 3] = [
    ("data-srcset", "srcset"),
    ("data-sizes", "sizes"),
    ("data-src", "src"),
];

/// Where an image is in its loading lifecycle. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum MediaState {
    #[default]
    Hidden,
    Loading,
    Loaded,
}

/// Value written to `fetchpriority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPriority {
    High,
    Auto,
    Low,
}

impl FetchPriority {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Auto => "auto",
            Self::Low => "low",
        }
    }
}

#[derive(Debug)]
struct MediaEntry {
    image: ElementId,
    sources: Vec<ElementId>,
    placeholder: Option<ElementId>,
    state: MediaState,
    load_listener: Option<ListenerId>,
    /// Identifies this entry's placeholder fade timer.
    fade_token: TimerToken,
    fade_timer: Option<TimerId>,
}

impl MediaEntry {
    fn find(dom: &dyn Dom, image: ElementId, fade_token: TimerToken) -> Self {
        let sources = dom
            .parent(image)
            .filter(|&p| dom.tag_name(p) == Some("picture"))
            .map(|picture| {
                dom.children(picture)
                    .into_iter()
                    .filter(|&c| dom.tag_name(c) == Some("source") && dom.has_attribute(c, "data-srcset"))
                    .collect()
            })
            .unwrap_or_default();
        let placeholder = dom
            .closest(image, &Selector::class(WRAPPER_CLASS))
            .and_then(|wrapper| dom.query(wrapper, &Selector::class(PLACEHOLDER_CLASS)));
        Self {
            image,
            sources,
            placeholder,
            state: MediaState::Hidden,
            load_listener: None,
            fade_token,
            fade_timer: None,
        }
    }
}

/// Copy each `data-*` source attribute onto its real counterpart.
fn promote(dom: &mut dyn Dom, el: ElementId) {
    for (from, to) in PROMOTIONS {
        if let Some(value) = dom.attribute(el, from).map(str::to_owned) {
            dom.set_attribute(el, to, &value);
            dom.remove_attribute(el, from);
        }
    }
}

/// Loads `img[data-srcset]` / `img[data-src]` on demand.
pub struct LazyMediaLoader {
    entries: Vec<MediaEntry>,
    observer: VisibilityObserver,
}

impl LazyMediaLoader {
    /// Scan the document once. Returns `None` when it has no lazy images.
    pub fn init(ctx: &mut Context<'_>) -> Option<Box<dyn Widget>> {
        let document = ctx.dom.document_element();
        let selector = Selector::tag_with_attr("img", "data-srcset")
            .or(Selector::tag_with_attr("img", "data-src"));
        let images = ctx.dom.query_all(document, &selector);
        if images.is_empty() {
            return None;
        }

        let options = VisibilityOptions::default()
            .with_root_margin(ctx.config.lazy_root_margin)
            .with_threshold(ctx.config.lazy_threshold);
        let mut loader = Self {
            entries: images
                .iter()
                .zip(0u32..)
                .map(|(&img, n)| MediaEntry::find(ctx.dom, img, TimerToken(n)))
                .collect(),
            observer: VisibilityObserver::new(options),
        };

        let onscreen_priority = if ctx.env.connection.is_slow() {
            FetchPriority::Auto
        } else {
            FetchPriority::High
        };
        for index in 0..loader.entries.len() {
            let image = loader.entries[index].image;
            if is_in_viewport(ctx.dom, image, 0.0) {
                loader.load(ctx, index, onscreen_priority, true);
            } else {
                loader.observer.observe(image);
            }
        }
        tracing::debug!(
            images = loader.entries.len(),
            deferred = loader.observer.observed_count(),
            "lazy media scanned"
        );
        Some(Box::new(loader))
    }

    pub fn state_of(&self, image: ElementId) -> Option<MediaState> {
        self.entries.iter().find(|e| e.image == image).map(|e| e.state)
    }

    /// Images still waiting to scroll into view.
    pub fn observed_count(&self) -> usize {
        self.observer.observed_count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn load(&mut self, ctx: &mut Context<'_>, index: usize, priority: FetchPriority, eager: bool) {
        let entry = &mut self.entries[index];
        if entry.state != MediaState::Hidden {
            return;
        }
        entry.state = MediaState::Loading;
        let image = entry.image;

        for &source in &entry.sources {
            promote(ctx.dom, source);
        }
        promote(ctx.dom, image);
        ctx.dom.set_attribute(image, "fetchpriority", priority.as_str());
        if eager {
            ctx.dom.set_attribute(image, "loading", "eager");
        }

        ctx.request_idle(move |dom, _deadline| {
            if !dom.exists(image) {
                return;
            }
            if let Err(err) = dom.decode(image) {
                tracing::warn!(%err, "image decode failed");
            }
        });

        if ctx.dom.is_complete(image) {
            self.mark_loaded(ctx, index);
        } else {
            self.entries[index].load_listener = Some(ctx.listen(image, EventKind::Load));
        }
    }

    fn mark_loaded(&mut self, ctx: &mut Context<'_>, index: usize) {
        let entry = &mut self.entries[index];
        if entry.state == MediaState::Loaded {
            return;
        }
        entry.state = MediaState::Loaded;
        if let Some(listener) = entry.load_listener.take() {
            ctx.unlisten(listener);
        }
        let image = entry.image;
        let placeholder = entry.placeholder;
        ctx.mutate(move |dom| {
            if dom.exists(image) {
                dom.add_class(image, LOADED_CLASS);
            }
            if let Some(p) = placeholder.filter(|&p| dom.exists(p)) {
                dom.add_class(p, HIDDEN_CLASS);
            }
        });
        if placeholder.is_some() {
            let token = self.entries[index].fade_token;
            self.entries[index].fade_timer = Some(ctx.set_timeout(token, ctx.config.placeholder_fade_ms));
        }
    }
}

impl Widget for LazyMediaLoader {
    fn name(&self) -> &'static str {
        "lazy-media"
    }

    fn on_event(&mut self, ctx: &mut Context<'_>, event: &Event, listener: ListenerId) {
        if !matches!(event, Event::Load(_)) {
            return;
        }
        if let Some(index) = self
            .entries
            .iter()
            .position(|e| e.load_listener == Some(listener))
        {
            self.mark_loaded(ctx, index);
        }
    }

    fn on_timer(&mut self, ctx: &mut Context<'_>, token: TimerToken) {
        let Some(entry) = self.entries.iter_mut().find(|e| e.fade_token == token) else {
            return;
        };
        entry.fade_timer = None;
        if let Some(placeholder) = entry.placeholder.take() {
            ctx.dom.remove(placeholder);
        }
    }

    fn on_frame(&mut self, ctx: &mut Context<'_>) {
        for entry in self.observer.take_entries(ctx.dom) {
            if !entry.is_intersecting {
                continue;
            }
            self.observer.unobserve(entry.target);
            if let Some(index) = self.entries.iter().position(|e| e.image == entry.target) {
                self.load(ctx, index, DEFERRED_PRIORITY, false);
            }
        }
    }

    fn teardown(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        self.observer.destroy();
        for entry in &mut self.entries {
            if let Some(listener) = entry.load_listener.take() {
                ctx.unlisten(listener);
            }
            if let Some(timer) = entry.fade_timer.take() {
                ctx.clear_timer(timer);
            }
        }
        Ok(())
    }
}
