//! Full-screen search overlay.

use anyhow::Result;
use url::Url;

use crate::dom::{Dom, ElementId, Selector};
use crate::runtime::{Context, Event, EventKind, ListenerId, TimerId, TimerToken};

use super::Widget;

pub const ROOT_CLASS: &str = "search-overlay";
pub const OPEN_BUTTON_CLASS: &str = "search-overlay__open";
pub const CLOSE_BUTTON_CLASS: &str = "search-overlay__close";
pub const INPUT_CLASS: &str = "search-overlay__input";
pub const CLEAR_BUTTON_CLASS: &str = "search-overlay__clear";
pub const FORM_CLASS: &str = "search-overlay__form";
pub const OPEN_CLASS: &str = "is-open";
pub const FILLED_CLASS: &str = "is-filled";
/// Set on the document element while the overlay is open.
pub const DOCUMENT_OPEN_CLASS: &str = "search-open";
/// Query parameter carrying the search text.
pub const QUERY_PARAM: &str = "q";

const FOCUS: TimerToken = TimerToken(1);

/// The `q` parameter of `page_url`, if present and parseable.
pub fn query_from_url(page_url: &str) -> Option<String> {
    let url = Url::parse(page_url).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// `action?q=<query>` resolved against the page address.
///
/// # Errors
/// Fails when the page address or the action cannot be parsed.
pub fn search_url(page_url: &str, action: &str, query: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(page_url)?.join(action)?;
    url.query_pairs_mut().clear().append_pair(QUERY_PARAM, query);
    Ok(url)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Open,
    Close,
    Clear,
    Input,
    Submit,
    Key,
}

/// Controller for `.search-overlay`.
#[derive(Debug)]
pub struct SearchOverlay {
    root: ElementId,
    input: ElementId,
    form: Option<ElementId>,
    listeners: Vec<(ListenerId, Action)>,
    focus_timer: Option<TimerId>,
    open: bool,
}

impl SearchOverlay {
    /// Returns `None` without an overlay or without its input.
    pub fn init(ctx: &mut Context<'_>) -> Option<Box<dyn Widget>> {
        let document = ctx.dom.document_element();
        let root = ctx.dom.query(document, &Selector::class(ROOT_CLASS))?;
        let Some(input) = ctx.dom.query(root, &Selector::class(INPUT_CLASS)) else {
            tracing::debug!("search overlay without input skipped");
            return None;
        };
        let form = ctx.dom.query(root, &Selector::class(FORM_CLASS));

        let mut listeners = Vec::new();
        for button in ctx.dom.query_all(document, &Selector::class(OPEN_BUTTON_CLASS)) {
            listeners.push((ctx.listen(button, EventKind::Click), Action::Open));
        }
        for button in ctx.dom.query_all(root, &Selector::class(CLOSE_BUTTON_CLASS)) {
            listeners.push((ctx.listen(button, EventKind::Click), Action::Close));
        }
        if let Some(clear) = ctx.dom.query(root, &Selector::class(CLEAR_BUTTON_CLASS)) {
            listeners.push((ctx.listen(clear, EventKind::Click), Action::Clear));
        }
        listeners.push((ctx.listen(input, EventKind::Input), Action::Input));
        if let Some(form) = form {
            listeners.push((ctx.listen(form, EventKind::Submit), Action::Submit));
        }
        listeners.push((ctx.listen_window(EventKind::KeyDown), Action::Key));

        if let Some(query) = query_from_url(&ctx.env.url).filter(|q| !q.is_empty()) {
            ctx.dom.set_value(input, &query);
        }
        let filled = ctx.dom.value(input).is_some_and(|v| !v.is_empty());
        ctx.dom.toggle_class(root, FILLED_CLASS, filled);

        Some(Box::new(Self {
            root,
            input,
            form,
            listeners,
            focus_timer: None,
            open: false,
        }))
    }

    pub const fn is_open(&self) -> bool {
        self.open
    }

    fn open(&mut self, ctx: &mut Context<'_>) {
        if self.open {
            return;
        }
        self.open = true;
        let root = self.root;
        ctx.mutate(move |dom| {
            if dom.exists(root) {
                dom.add_class(root, OPEN_CLASS);
            }
            let document = dom.document_element();
            dom.add_class(document, DOCUMENT_OPEN_CLASS);
        });
        self.focus_timer = Some(ctx.set_timeout(FOCUS, ctx.config.focus_delay_ms));
    }

    fn close(&mut self, ctx: &mut Context<'_>) {
        if let Some(timer) = self.focus_timer.take() {
            ctx.clear_timer(timer);
        }
        if !self.open {
            return;
        }
        self.open = false;
        let root = self.root;
        ctx.mutate(move |dom| {
            if dom.exists(root) {
                dom.remove_class(root, OPEN_CLASS);
            }
            let document = dom.document_element();
            dom.remove_class(document, DOCUMENT_OPEN_CLASS);
        });
    }

    fn sync_filled(&self, ctx: &mut Context<'_>) {
        let filled = ctx.dom.value(self.input).is_some_and(|v| !v.is_empty());
        let root = self.root;
        ctx.mutate(move |dom| {
            if dom.exists(root) {
                dom.toggle_class(root, FILLED_CLASS, filled);
            }
        });
    }

    fn clear(&self, ctx: &mut Context<'_>) {
        ctx.dom.set_value(self.input, "");
        ctx.dom.focus(self.input);
        self.sync_filled(ctx);
    }

    fn submit(&self, ctx: &mut Context<'_>) {
        let action = self
            .form
            .and_then(|f| ctx.dom.attribute(f, "action"))
            .unwrap_or("")
            .to_owned();
        let query = ctx.dom.value(self.input).unwrap_or("").trim().to_owned();
        match search_url(&ctx.env.url, &action, &query) {
            Ok(url) => ctx.dom.navigate(url.as_str()),
            Err(err) => tracing::warn!(%err, action = %action, "search URL could not be built"),
        }
    }
}

impl Widget for SearchOverlay {
    fn name(&self) -> &'static str {
        "search"
    }

    fn on_event(&mut self, ctx: &mut Context<'_>, event: &Event, listener: ListenerId) {
        let Some(action) = self
            .listeners
            .iter()
            .find(|(id, _)| *id == listener)
            .map(|(_, action)| *action)
        else {
            return;
        };
        match action {
            Action::Open => self.open(ctx),
            Action::Close => self.close(ctx),
            Action::Clear => self.clear(ctx),
            Action::Input => self.sync_filled(ctx),
            Action::Submit => self.submit(ctx),
            Action::Key => {
                if matches!(event, Event::KeyDown(key) if key == "Escape") {
                    self.close(ctx);
                }
            }
        }
    }

    fn on_timer(&mut self, ctx: &mut Context<'_>, token: TimerToken) {
        if token == FOCUS {
            self.focus_timer = None;
            if self.open {
                ctx.dom.focus(self.input);
            }
        }
    }

    fn teardown(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        if let Some(timer) = self.focus_timer.take() {
            ctx.clear_timer(timer);
        }
        for (listener, _) in self.listeners.drain(..) {
            ctx.unlisten(listener);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;
    use crate::runtime::{Environment, Page};

    struct Fixture {
        root: ElementId,
        open: ElementId,
        close: ElementId,
        input: ElementId,
        clear: ElementId,
        form: ElementId,
    }

    fn setup(url: &str, action: &str) -> (Page, Fixture) {
        let mut dom = MemoryDom::new(1280.0, 800.0);
        let body = dom.document_element();
        let open = dom.append(body, "button").class(OPEN_BUTTON_CLASS).finish();
        let root = dom.append(body, "div").class(ROOT_CLASS).finish();
        let close = dom.append(root, "button").class(CLOSE_BUTTON_CLASS).finish();
        let form = dom
            .append(root, "form")
            .class(FORM_CLASS)
            .attr("action", action)
            .finish();
        let input = dom.append(form, "input").class(INPUT_CLASS).finish();
        let clear = dom.append(form, "button").class(CLEAR_BUTTON_CLASS).finish();
        let mut page = Page::new(dom).with_environment(Environment::default().with_url(url));
        page.activate();
        (
            page,
            Fixture {
                root,
                open,
                close,
                input,
                clear,
                form,
            },
        )
    }

    #[test]
    fn test_query_param_prefills_input() {
        let (page, f) = setup("https://shop.example/search?q=tent", "/search");
        assert_eq!(page.dom().value(f.input), Some("tent"));
        assert!(page.dom().has_class(f.root, FILLED_CLASS));
    }

    #[test]
    fn test_no_query_leaves_input_empty() {
        let (page, f) = setup("https://shop.example/", "/search");
        assert_eq!(page.dom().value(f.input), Some(""));
        assert!(!page.dom().has_class(f.root, FILLED_CLASS));
    }

    #[test]
    fn test_open_focuses_input_after_delay() {
        let (mut page, f) = setup("https://shop.example/", "/search");
        page.click(f.open);
        page.advance(16);
        let html = page.dom().document_element();
        assert!(page.dom().has_class(f.root, OPEN_CLASS));
        assert!(page.dom().has_class(html, DOCUMENT_OPEN_CLASS));
        assert_eq!(page.dom().focused(), None);

        page.advance(100);
        assert_eq!(page.dom().focused(), Some(f.input));
    }

    #[test]
    fn test_escape_closes_and_cancels_focus() {
        let (mut page, f) = setup("https://shop.example/", "/search");
        page.click(f.open);
        page.advance(32);
        page.dispatch(Event::KeyDown("Escape".into()));
        page.advance(200);
        let html = page.dom().document_element();
        assert!(!page.dom().has_class(f.root, OPEN_CLASS));
        assert!(!page.dom().has_class(html, DOCUMENT_OPEN_CLASS));
        assert_eq!(page.dom().focused(), None);
    }

    #[test]
    fn test_close_button_closes() {
        let (mut page, f) = setup("https://shop.example/", "/search");
        page.click(f.open);
        page.click(f.close);
        page.advance(200);
        assert!(!page.dom().has_class(f.root, OPEN_CLASS));
    }

    #[test]
    fn test_input_and_clear_toggle_filled() {
        let (mut page, f) = setup("https://shop.example/", "/search");
        page.dom_mut().set_value(f.input, "boots");
        page.dispatch(Event::Input(f.input));
        page.advance(16);
        assert!(page.dom().has_class(f.root, FILLED_CLASS));

        page.click(f.clear);
        page.advance(16);
        assert!(!page.dom().has_class(f.root, FILLED_CLASS));
        assert_eq!(page.dom().value(f.input), Some(""));
        assert_eq!(page.dom().focused(), Some(f.input));
    }

    #[test]
    fn test_submit_navigates_to_action_with_query() {
        let (mut page, f) = setup("https://shop.example/catalog/tents", "/search");
        page.dom_mut().set_value(f.input, "two person tent");
        page.dispatch(Event::Submit(f.form));
        let navigations = page.host::<MemoryDom>().map(|d| d.navigations().to_vec());
        assert_eq!(
            navigations,
            Some(vec!["https://shop.example/search?q=two+person+tent".to_string()])
        );
    }

    #[test]
    fn test_submit_without_page_url_does_not_navigate() {
        let (mut page, f) = setup("", "/search");
        page.dom_mut().set_value(f.input, "tent");
        page.dispatch(Event::Submit(f.form));
        assert_eq!(page.host::<MemoryDom>().map(|d| d.navigations().len()), Some(0));
    }

    #[test]
    fn test_search_url_replaces_existing_query() {
        let url = search_url("https://shop.example/a?page=2", "search?sort=asc", "mat")
            .expect("valid url");
        assert_eq!(url.as_str(), "https://shop.example/search?q=mat");
    }

    #[test]
    fn test_missing_input_means_no_widget() {
        let mut dom = MemoryDom::new(800.0, 600.0);
        let body = dom.document_element();
        dom.append(body, "div").class(ROOT_CLASS).finish();
        let mut page = Page::new(dom);
        assert!(page.activate().is_empty());
    }
}
