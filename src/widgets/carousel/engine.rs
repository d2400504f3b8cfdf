//! The slide-track engine seam.
//!
//! The carousel controller never positions slides itself. It drives an engine
//! through [`SlideEngine`] and reacts to the events the engine reports. The
//! crate ships [`TrackEngine`]; pages can inject their own through an
//! [`EngineFactory`].

use crate::dom::{Dom, ElementId};

/// Lifecycle notifications from an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine finished setting up.
    Init,
    /// A different slide became selected.
    Select,
    /// Engine rebuilt itself (slides or options changed).
    ReInit,
    /// Scrolling came to rest.
    Settle,
}

/// Visual transition between slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    #[default]
    Slide,
    Fade,
}

impl Effect {
    /// `data-effect` value; anything but `fade` slides.
    pub fn from_attr(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("fade") => Self::Fade,
            _ => Self::Slide,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Slide => "slide",
            Self::Fade => "fade",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Start,
    Center,
    End,
}

/// Options every carousel engine is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub loop_slides: bool,
    pub align: Align,
    pub slides_to_scroll: usize,
    pub effect: Effect,
}

impl EngineOptions {
    /// The carousel's fixed configuration: looping, start-aligned, one
    /// slide per step.
    pub const fn for_effect(effect: Effect) -> Self {
        Self {
            loop_slides: true,
            align: Align::Start,
            slides_to_scroll: 1,
            effect,
        }
    }
}

/// Narrow interface the carousel needs from a slide engine.
pub trait SlideEngine {
    fn slide_count(&self) -> usize;

    fn selected_index(&self) -> usize;

    fn can_scroll_prev(&self) -> bool;

    fn can_scroll_next(&self) -> bool;

    fn scroll_prev(&mut self);

    fn scroll_next(&mut self);

    fn scroll_to(&mut self, index: usize);

    /// Events emitted since the last call, oldest first.
    fn take_events(&mut self) -> Vec<EngineEvent>;

    /// Release everything the engine set up, including its own listeners.
    fn destroy(&mut self, dom: &mut dyn Dom);
}

/// Builds an engine for one mount of one carousel.
pub trait EngineFactory {
    fn create(
        &self,
        dom: &mut dyn Dom,
        container: ElementId,
        slides: &[ElementId],
        options: EngineOptions,
    ) -> Box<dyn SlideEngine>;
}

/// Index-based engine: selection moves in `slides_to_scroll` steps and wraps
/// when looping. Visual placement is left to CSS driven by the classes the
/// carousel writes.
#[derive(Debug)]
pub struct TrackEngine {
    container: ElementId,
    count: usize,
    index: usize,
    options: EngineOptions,
    events: Vec<EngineEvent>,
    destroyed: bool,
}

impl TrackEngine {
    pub fn new(container: ElementId, count: usize, options: EngineOptions) -> Self {
        Self {
            container,
            count,
            index: 0,
            options,
            events: vec![EngineEvent::Init],
            destroyed: false,
        }
    }

    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    const fn step(&self) -> usize {
        if self.options.slides_to_scroll == 0 {
            1
        } else {
            self.options.slides_to_scroll
        }
    }

    fn select(&mut self, index: usize) {
        if self.destroyed || self.count == 0 {
            return;
        }
        let index = index.min(self.count - 1);
        if index != self.index {
            self.index = index;
            self.events.push(EngineEvent::Select);
            self.events.push(EngineEvent::Settle);
        }
    }
}

impl SlideEngine for TrackEngine {
    fn slide_count(&self) -> usize {
        self.count
    }

    fn selected_index(&self) -> usize {
        self.index
    }

    fn can_scroll_prev(&self) -> bool {
        (self.options.loop_slides && self.count > 1) || self.index > 0
    }

    fn can_scroll_next(&self) -> bool {
        (self.options.loop_slides && self.count > 1) || self.index + 1 < self.count
    }

    fn scroll_prev(&mut self) {
        if !self.can_scroll_prev() {
            return;
        }
        let target = match self.index.checked_sub(self.step()) {
            Some(i) => i,
            None if self.options.loop_slides => self.count - 1,
            None => 0,
        };
        self.select(target);
    }

    fn scroll_next(&mut self) {
        if !self.can_scroll_next() {
            return;
        }
        let next = self.index + self.step();
        let target = if next < self.count {
            next
        } else if self.options.loop_slides {
            0
        } else {
            self.count - 1
        };
        self.select(target);
    }

    fn scroll_to(&mut self, index: usize) {
        self.select(index);
    }

    fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    fn destroy(&mut self, dom: &mut dyn Dom) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.events.clear();
        dom.remove_attribute(self.container, "data-engine");
        dom.remove_attribute(self.container, "data-engine-effect");
    }
}

/// Creates [`TrackEngine`]s and tags the container while they live.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackEngineFactory;

impl EngineFactory for TrackEngineFactory {
    fn create(
        &self,
        dom: &mut dyn Dom,
        container: ElementId,
        slides: &[ElementId],
        options: EngineOptions,
    ) -> Box<dyn SlideEngine> {
        dom.set_attribute(container, "data-engine", "track");
        dom.set_attribute(container, "data-engine-effect", options.effect.as_str());
        Box::new(TrackEngine::new(container, slides.len(), options))
    }
}
