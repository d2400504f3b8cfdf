use crate::runtime::{Context, TimerId, TimerToken};

/// Token of the autoplay interval timer.
pub(super) const TICK: TimerToken = TimerToken(1);

/// Observable autoplay flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoplayState {
    /// `false` once the user interacted; never becomes `true` again.
    pub active: bool,
    /// Whether the interval timer is armed.
    pub running: bool,
}

/// Interval-driven slide advance with hover, visibility and interaction
/// rules.
#[derive(Debug)]
pub(super) struct Autoplay {
    interval_ms: u64,
    pause_on_hover: bool,
    stop_on_interaction: bool,
    active: bool,
    timer: Option<TimerId>,
    hovering: bool,
    in_view: bool,
}

impl Autoplay {
    pub(super) const fn new(interval_ms: u64, pause_on_hover: bool, stop_on_interaction: bool) -> Self {
        Self {
            interval_ms,
            pause_on_hover,
            stop_on_interaction,
            active: true,
            timer: None,
            hovering: false,
            in_view: true,
        }
    }

    pub(super) const fn state(&self) -> AutoplayState {
        AutoplayState {
            active: self.active,
            running: self.timer.is_some(),
        }
    }

    pub(super) const fn should_advance(&self) -> bool {
        self.active && self.timer.is_some()
    }

    const fn held_by_hover(&self) -> bool {
        self.hovering && self.pause_on_hover
    }

    /// Arm the interval unless stopped for good or already running.
    pub(super) fn start(&mut self, ctx: &mut Context<'_>) {
        if !self.active || self.timer.is_some() {
            return;
        }
        self.timer = Some(ctx.set_interval(TICK, self.interval_ms));
    }

    pub(super) fn pause(&mut self, ctx: &mut Context<'_>) {
        if let Some(timer) = self.timer.take() {
            ctx.clear_timer(timer);
        }
    }

    pub(super) fn stop(&mut self, ctx: &mut Context<'_>) {
        self.pause(ctx);
        if self.active {
            tracing::debug!("autoplay stopped by interaction");
        }
        self.active = false;
    }

    pub(super) fn pointer_enter(&mut self, ctx: &mut Context<'_>) {
        self.hovering = true;
        if self.pause_on_hover {
            self.pause(ctx);
        }
    }

    pub(super) fn pointer_leave(&mut self, ctx: &mut Context<'_>) {
        self.hovering = false;
        if self.in_view {
            self.start(ctx);
        }
    }

    pub(super) fn visibility_changed(&mut self, ctx: &mut Context<'_>, visible: bool) {
        self.in_view = visible;
        if !visible {
            self.pause(ctx);
        } else if !self.held_by_hover() {
            self.start(ctx);
        }
    }

    /// Prev/next/dot pressed: restart the interval so the next advance is a
    /// full period away. Stays paused while hover holds it or while the
    /// carousel is out of view.
    pub(super) fn control_interaction(&mut self, ctx: &mut Context<'_>) {
        self.pause(ctx);
        if self.in_view && !self.held_by_hover() {
            self.start(ctx);
        }
    }

    /// Click or touch anywhere else in the carousel.
    pub(super) fn outside_interaction(&mut self, ctx: &mut Context<'_>) {
        if self.stop_on_interaction {
            self.stop(ctx);
        }
    }
}
