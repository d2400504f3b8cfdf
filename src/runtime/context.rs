use std::collections::BTreeMap;

use crate::config::RuntimeConfig;
use crate::dom::{Dom, ElementId};
use crate::scheduler::{IdleDeadline, Scheduler};

use super::Environment;
use super::event::{Event, EventKind, ListenTarget};

/// Slot of an installed widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(pub(crate) usize);

/// Handle for clearing a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Widget-chosen label telling it which of its timers fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(pub u32);

/// Handle for detaching a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy)]
struct Timer {
    owner: WidgetId,
    token: TimerToken,
    due_at: u64,
    period: Option<u64>,
}

/// A timer that came due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Fired {
    pub owner: WidgetId,
    pub token: TimerToken,
    pub due_at: u64,
}

/// Pending timeouts and intervals on the virtual clock.
#[derive(Debug, Default)]
pub struct Timers {
    next: u64,
    entries: BTreeMap<TimerId, Timer>,
}

impl Timers {
    fn set(&mut self, owner: WidgetId, token: TimerToken, due_at: u64, period: Option<u64>) -> TimerId {
        self.next += 1;
        let id = TimerId(self.next);
        self.entries.insert(
            id,
            Timer {
                owner,
                token,
                due_at,
                period,
            },
        );
        id
    }

    fn clear(&mut self, id: TimerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub(super) fn clear_owner(&mut self, owner: WidgetId) {
        self.entries.retain(|_, t| t.owner != owner);
    }

    /// Pop the earliest timer due at or before `limit`. Intervals are
    /// re-armed one period later.
    pub(super) fn pop_due(&mut self, limit: u64) -> Option<Fired> {
        let (&id, timer) = self
            .entries
            .iter()
            .filter(|(_, t)| t.due_at <= limit)
            .min_by_key(|(id, t)| (t.due_at, **id))?;
        let fired = Fired {
            owner: timer.owner,
            token: timer.token,
            due_at: timer.due_at,
        };
        match timer.period {
            Some(period) => {
                if let Some(t) = self.entries.get_mut(&id) {
                    t.due_at += period.max(1);
                }
            }
            None => {
                self.entries.remove(&id);
            }
        }
        Some(fired)
    }

    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.entries.contains_key(&id)
    }
}

#[derive(Debug, Clone, Copy)]
struct Listener {
    target: ListenTarget,
    kind: EventKind,
    owner: WidgetId,
}

/// Event subscriptions, with running totals for leak checks.
#[derive(Debug, Default)]
pub struct Listeners {
    next: u64,
    entries: BTreeMap<ListenerId, Listener>,
    attached: u64,
    detached: u64,
}

impl Listeners {
    fn attach(&mut self, target: ListenTarget, kind: EventKind, owner: WidgetId) -> ListenerId {
        self.next += 1;
        let id = ListenerId(self.next);
        self.entries.insert(id, Listener { target, kind, owner });
        self.attached += 1;
        id
    }

    fn detach(&mut self, id: ListenerId) -> bool {
        let removed = self.entries.remove(&id).is_some();
        if removed {
            self.detached += 1;
        }
        removed
    }

    pub(super) fn detach_owner(&mut self, owner: WidgetId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, l| l.owner != owner);
        let removed = before - self.entries.len();
        self.detached += removed as u64;
        removed
    }

    /// Listeners that should receive `event`, in attach order.
    pub(super) fn matching(&self, dom: &dyn Dom, event: &Event) -> Vec<(ListenerId, WidgetId)> {
        let kind = event.kind();
        let target = event.target();
        self.entries
            .iter()
            .filter(|(_, l)| l.kind == kind)
            .filter(|(_, l)| match (l.target, target) {
                (ListenTarget::Window, None) => true,
                (ListenTarget::Window, Some(_)) => kind.bubbles(),
                (ListenTarget::Element(_), None) => false,
                (ListenTarget::Element(el), Some(t)) if kind.bubbles() => dom.contains(el, t),
                (ListenTarget::Element(el), Some(t)) => el == t,
            })
            .map(|(&id, l)| (id, l.owner))
            .collect()
    }

    pub fn is_attached(&self, id: ListenerId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    /// Listeners currently attached by one widget.
    pub fn count_for(&self, owner: WidgetId) -> usize {
        self.entries.values().filter(|l| l.owner == owner).count()
    }

    pub const fn attached_total(&self) -> u64 {
        self.attached
    }

    pub const fn detached_total(&self) -> u64 {
        self.detached
    }
}

/// Services available to a widget while it handles a callback.
pub struct Context<'a> {
    pub dom: &'a mut dyn Dom,
    pub config: &'a RuntimeConfig,
    pub env: &'a Environment,
    pub(super) scheduler: &'a mut Scheduler,
    pub(super) timers: &'a mut Timers,
    pub(super) listeners: &'a mut Listeners,
    pub(super) now_ms: u64,
    pub(super) owner: WidgetId,
}

impl Context<'_> {
    /// Current time on the page's virtual clock.
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// The widget being called.
    pub const fn owner(&self) -> WidgetId {
        self.owner
    }

    pub fn listen(&mut self, target: impl Into<ListenTarget>, kind: EventKind) -> ListenerId {
        self.listeners.attach(target.into(), kind, self.owner)
    }

    pub fn listen_window(&mut self, kind: EventKind) -> ListenerId {
        self.listeners.attach(ListenTarget::Window, kind, self.owner)
    }

    pub fn unlisten(&mut self, id: ListenerId) -> bool {
        self.listeners.detach(id)
    }

    pub fn set_timeout(&mut self, token: TimerToken, delay_ms: u64) -> TimerId {
        self.timers.set(self.owner, token, self.now_ms + delay_ms, None)
    }

    pub fn set_interval(&mut self, token: TimerToken, period_ms: u64) -> TimerId {
        self.timers
            .set(self.owner, token, self.now_ms + period_ms, Some(period_ms))
    }

    pub fn clear_timer(&mut self, id: TimerId) -> bool {
        self.timers.clear(id)
    }

    /// See [`Scheduler::schedule`].
    pub fn schedule<S, R, W>(&mut self, read: R, write: W)
    where
        S: 'static,
        R: FnOnce(&dyn Dom) -> S + 'static,
        W: FnOnce(&mut dyn Dom, S) + 'static,
    {
        self.scheduler.schedule(read, write);
    }

    /// See [`Scheduler::mutate`].
    pub fn mutate<W>(&mut self, write: W)
    where
        W: FnOnce(&mut dyn Dom) + 'static,
    {
        self.scheduler.mutate(write);
    }

    /// See [`Scheduler::request_idle`].
    pub fn request_idle<T>(&mut self, task: T)
    where
        T: FnOnce(&mut dyn Dom, &IdleDeadline) + 'static,
    {
        self.scheduler.request_idle(task, self.now_ms);
    }

    /// Whether `target` is `container` or inside it.
    pub fn is_within(&self, container: ElementId, target: ElementId) -> bool {
        self.dom.contains(container, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;

    #[test]
    fn test_pop_due_orders_by_time_then_creation() {
        let mut timers = Timers::default();
        let w = WidgetId(0);
        timers.set(w, TimerToken(1), 100, None);
        timers.set(w, TimerToken(2), 50, None);
        timers.set(w, TimerToken(3), 50, None);

        let order: Vec<u32> = std::iter::from_fn(|| timers.pop_due(100))
            .map(|f| f.token.0)
            .collect();
        assert_eq!(order, vec![2, 3, 1]);
        assert_eq!(timers.active_count(), 0);
    }

    #[test]
    fn test_interval_rearms_after_firing() {
        let mut timers = Timers::default();
        let id = timers.set(WidgetId(0), TimerToken(7), 100, Some(100));
        assert_eq!(timers.pop_due(100).map(|f| f.due_at), Some(100));
        assert_eq!(timers.pop_due(150), None);
        assert_eq!(timers.pop_due(200).map(|f| f.due_at), Some(200));
        assert!(timers.is_active(id));
        assert!(timers.clear(id));
        assert_eq!(timers.pop_due(1000), None);
    }

    #[test]
    fn test_bubbling_listener_matches_descendant_target() {
        let mut dom = MemoryDom::new(800.0, 600.0);
        let html = dom.document_element();
        let root = dom.append(html, "div").finish();
        let button = dom.append(root, "button").finish();
        let mut listeners = Listeners::default();
        let w = WidgetId(0);
        let on_root = listeners.attach(root.into(), EventKind::Click, w);
        let enter = listeners.attach(root.into(), EventKind::PointerEnter, w);
        let window = listeners.attach(ListenTarget::Window, EventKind::Click, w);

        let hits = listeners.matching(&dom, &Event::Click(button));
        assert_eq!(hits, vec![(on_root, w), (window, w)]);

        assert!(listeners.matching(&dom, &Event::PointerEnter(button)).is_empty());
        assert_eq!(listeners.matching(&dom, &Event::PointerEnter(root)), vec![(enter, w)]);
    }

    #[test]
    fn test_detach_totals_track_attach_totals() {
        let mut listeners = Listeners::default();
        let a = listeners.attach(ListenTarget::Window, EventKind::Scroll, WidgetId(0));
        listeners.attach(ListenTarget::Window, EventKind::Resize, WidgetId(1));
        listeners.attach(ListenTarget::Window, EventKind::Resize, WidgetId(1));
        assert!(listeners.detach(a));
        assert!(!listeners.detach(a), "double detach is a no-op");
        assert_eq!(listeners.detach_owner(WidgetId(1)), 2);
        assert_eq!(listeners.attached_total(), 3);
        assert_eq!(listeners.detached_total(), 3);
        assert_eq!(listeners.active_count(), 0);
    }
}
