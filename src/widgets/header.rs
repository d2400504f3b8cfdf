//! Site header: hover dropdowns and the mobile menu toggle.

use anyhow::Result;

use crate::dom::{Dom, ElementId, Selector};
use crate::runtime::{Context, Event, EventKind, ListenerId, TimerId, TimerToken};

use super::Widget;

pub const ROOT_CLASS: &str = "site-header";
pub const ITEM_CLASS: &str = "site-header__item";
pub const TOGGLE_CLASS: &str = "site-header__toggle";
pub const OPEN_CLASS: &str = "is-open";
pub const MENU_OPEN_CLASS: &str = "is-menu-open";

#[derive(Debug)]
struct Dropdown {
    el: ElementId,
    /// Also the token of this item's close timer.
    token: TimerToken,
    enter: ListenerId,
    leave: ListenerId,
    close_timer: Option<TimerId>,
    open: bool,
}

/// Controller for `.site-header`.
#[derive(Debug)]
pub struct Header {
    root: ElementId,
    toggle: Option<ElementId>,
    toggle_listener: Option<ListenerId>,
    key_listener: Option<ListenerId>,
    items: Vec<Dropdown>,
    menu_open: bool,
}

impl Header {
    /// Returns `None` without a header, or when it has neither dropdown
    /// items nor a menu toggle.
    pub fn init(ctx: &mut Context<'_>) -> Option<Box<dyn Widget>> {
        let document = ctx.dom.document_element();
        let root = ctx.dom.query(document, &Selector::class(ROOT_CLASS))?;
        let toggle = ctx.dom.query(root, &Selector::class(TOGGLE_CLASS));
        let elements = ctx.dom.query_all(root, &Selector::class(ITEM_CLASS));
        if toggle.is_none() && elements.is_empty() {
            return None;
        }

        let items = (0u32..)
            .zip(elements)
            .map(|(token, el)| Dropdown {
                el,
                token: TimerToken(token),
                enter: ctx.listen(el, EventKind::PointerEnter),
                leave: ctx.listen(el, EventKind::PointerLeave),
                close_timer: None,
                open: false,
            })
            .collect();
        let header = Self {
            root,
            toggle,
            toggle_listener: toggle.map(|t| ctx.listen(t, EventKind::Click)),
            key_listener: Some(ctx.listen_window(EventKind::KeyDown)),
            items,
            menu_open: false,
        };
        Some(Box::new(header))
    }

    pub const fn is_menu_open(&self) -> bool {
        self.menu_open
    }

    /// Dropdown items currently open.
    pub fn open_items(&self) -> Vec<ElementId> {
        self.items.iter().filter(|d| d.open).map(|d| d.el).collect()
    }

    fn open_item(&mut self, ctx: &mut Context<'_>, index: usize) {
        let item = &mut self.items[index];
        if let Some(timer) = item.close_timer.take() {
            ctx.clear_timer(timer);
        }
        if item.open {
            return;
        }
        item.open = true;
        let el = item.el;
        ctx.mutate(move |dom| {
            if dom.exists(el) {
                dom.add_class(el, OPEN_CLASS);
            }
        });
    }

    fn close_item(&mut self, ctx: &mut Context<'_>, index: usize) {
        let item = &mut self.items[index];
        if let Some(timer) = item.close_timer.take() {
            ctx.clear_timer(timer);
        }
        if !item.open {
            return;
        }
        item.open = false;
        let el = item.el;
        ctx.mutate(move |dom| {
            if dom.exists(el) {
                dom.remove_class(el, OPEN_CLASS);
            }
        });
    }

    fn set_menu(&mut self, ctx: &mut Context<'_>, open: bool) {
        if self.menu_open == open {
            return;
        }
        self.menu_open = open;
        let root = self.root;
        let toggle = self.toggle;
        ctx.mutate(move |dom| {
            if dom.exists(root) {
                dom.toggle_class(root, MENU_OPEN_CLASS, open);
            }
            if let Some(toggle) = toggle.filter(|&t| dom.exists(t)) {
                dom.set_attribute(toggle, "aria-expanded", if open { "true" } else { "false" });
            }
        });
    }

    fn close_all(&mut self, ctx: &mut Context<'_>) {
        for index in 0..self.items.len() {
            self.close_item(ctx, index);
        }
        self.set_menu(ctx, false);
    }
}

impl Widget for Header {
    fn name(&self) -> &'static str {
        "header"
    }

    fn on_event(&mut self, ctx: &mut Context<'_>, event: &Event, listener: ListenerId) {
        if Some(listener) == self.toggle_listener {
            self.set_menu(ctx, !self.menu_open);
            return;
        }
        if Some(listener) == self.key_listener {
            if matches!(event, Event::KeyDown(key) if key == "Escape") {
                self.close_all(ctx);
            }
            return;
        }
        if let Some(index) = self.items.iter().position(|d| d.enter == listener) {
            self.open_item(ctx, index);
        } else if let Some(index) = self.items.iter().position(|d| d.leave == listener) {
            let delay = ctx.config.hover_leave_delay_ms;
            let item = &mut self.items[index];
            if let Some(timer) = item.close_timer.take() {
                ctx.clear_timer(timer);
            }
            item.close_timer = Some(ctx.set_timeout(item.token, delay));
        }
    }

    fn on_timer(&mut self, ctx: &mut Context<'_>, token: TimerToken) {
        if let Some(index) = self.items.iter().position(|d| d.token == token) {
            // The timer already fired; forget it before closing.
            self.items[index].close_timer = None;
            self.close_item(ctx, index);
        }
    }

    fn teardown(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        for item in &mut self.items {
            ctx.unlisten(item.enter);
            ctx.unlisten(item.leave);
            if let Some(timer) = item.close_timer.take() {
                ctx.clear_timer(timer);
            }
        }
        for listener in [self.toggle_listener.take(), self.key_listener.take()]
            .into_iter()
            .flatten()
        {
            ctx.unlisten(listener);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;
    use crate::runtime::{Page, WidgetId};

    struct Fixture {
        root: ElementId,
        toggle: ElementId,
        items: [ElementId; 2],
    }

    fn setup() -> (Page, Fixture, WidgetId) {
        let mut dom = MemoryDom::new(1280.0, 800.0);
        let body = dom.document_element();
        let root = dom.append(body, "header").class(ROOT_CLASS).finish();
        let toggle = dom.append(root, "button").class(TOGGLE_CLASS).finish();
        let a = dom.append(root, "li").class(ITEM_CLASS).finish();
        let b = dom.append(root, "li").class(ITEM_CLASS).finish();
        let mut page = Page::new(dom);
        let ids = page.activate();
        // The sticky-bar widget picks up the header too.
        let id = ids
            .into_iter()
            .find(|&id| page.widget::<Header>(id).is_some())
            .expect("header installed");
        (
            page,
            Fixture {
                root,
                toggle,
                items: [a, b],
            },
            id,
        )
    }

    #[test]
    fn test_hover_opens_and_leave_closes_after_delay() {
        let (mut page, f, _) = setup();
        page.dispatch(Event::PointerEnter(f.items[0]));
        page.advance(16);
        assert!(page.dom().has_class(f.items[0], OPEN_CLASS));

        page.dispatch(Event::PointerLeave(f.items[0]));
        page.advance(150);
        assert!(page.dom().has_class(f.items[0], OPEN_CLASS));
        page.advance(100);
        assert!(!page.dom().has_class(f.items[0], OPEN_CLASS));
    }

    #[test]
    fn test_reentering_cancels_pending_close() {
        let (mut page, f, id) = setup();
        page.dispatch(Event::PointerEnter(f.items[1]));
        page.dispatch(Event::PointerLeave(f.items[1]));
        page.advance(100);
        page.dispatch(Event::PointerEnter(f.items[1]));
        page.advance(500);
        assert!(page.dom().has_class(f.items[1], OPEN_CLASS));
        assert_eq!(page.widget::<Header>(id).map(Header::open_items), Some(vec![f.items[1]]));
    }

    #[test]
    fn test_toggle_flips_menu_and_aria() {
        let (mut page, f, id) = setup();
        page.click(f.toggle);
        page.advance(16);
        assert!(page.dom().has_class(f.root, MENU_OPEN_CLASS));
        assert_eq!(page.dom().attribute(f.toggle, "aria-expanded"), Some("true"));

        page.click(f.toggle);
        page.advance(16);
        assert!(!page.dom().has_class(f.root, MENU_OPEN_CLASS));
        assert_eq!(page.dom().attribute(f.toggle, "aria-expanded"), Some("false"));
        assert_eq!(page.widget::<Header>(id).map(Header::is_menu_open), Some(false));
    }

    #[test]
    fn test_escape_closes_everything() {
        let (mut page, f, _) = setup();
        page.dispatch(Event::PointerEnter(f.items[0]));
        page.click(f.toggle);
        page.advance(16);

        page.dispatch(Event::KeyDown("Escape".into()));
        page.advance(16);
        assert!(!page.dom().has_class(f.items[0], OPEN_CLASS));
        assert!(!page.dom().has_class(f.root, MENU_OPEN_CLASS));
    }

    #[test]
    fn test_teardown_cancels_close_timers() {
        let (mut page, f, _) = setup();
        page.dispatch(Event::PointerEnter(f.items[0]));
        page.dispatch(Event::PointerLeave(f.items[0]));
        page.teardown();
        assert_eq!(page.runtime().timers().active_count(), 0);
        assert_eq!(page.runtime().listeners().active_count(), 0);
    }
}
