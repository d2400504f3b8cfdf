use theme_runtime::dom::{Dom, ElementId, MemoryDom, Selector};
use theme_runtime::fixture::parse_page;
use theme_runtime::runtime::{Environment, Page};
use theme_runtime::script::{parse_script, run_script};

const STOREFRONT: &str = r#"{
    "viewport": { "width": 375, "height": 800 },
    "root": {
        "tag": "html",
        "children": [
            { "tag": "div", "class": "sticky-bar", "rect": [0, 0, 375, 80] },
            { "tag": "header", "class": "site-header", "rect": [0, 80, 375, 64], "children": [
                { "tag": "button", "class": "site-header__toggle" },
                { "tag": "button", "class": "search-overlay__open" }
            ] },
            { "tag": "section", "id": "hero", "class": "carousel", "rect": [0, 144, 375, 400],
              "attrs": { "data-timer": "1000" },
              "children": [
                { "tag": "div", "class": "carousel__viewport", "children": [
                    { "tag": "div", "class": "carousel__slide" },
                    { "tag": "div", "class": "carousel__slide" },
                    { "tag": "div", "class": "carousel__slide" }
                ] },
                { "tag": "button", "class": "carousel__prev" },
                { "tag": "button", "class": "carousel__next" }
            ] },
            { "tag": "div", "class": "lazy-media", "children": [
                { "tag": "img", "id": "below-fold", "rect": [0, 2400, 375, 250],
                  "attrs": { "data-src": "feature.jpg", "data-focal-x": "0.2", "data-focal-y": "-0.4" } },
                { "tag": "div", "class": "lazy-media__placeholder" }
            ] },
            { "tag": "div", "class": "search-overlay", "children": [
                { "tag": "form", "class": "search-overlay__form", "attrs": { "action": "/search" }, "children": [
                    { "tag": "input", "class": "search-overlay__input" }
                ] }
            ] }
        ]
    }
}"#;

fn storefront(url: &str) -> Page {
    let spec = parse_page(STOREFRONT).expect("fixture parses");
    let mut page = Page::new(MemoryDom::from_spec(&spec))
        .with_environment(Environment::default().with_url(url));
    page.activate();
    page
}

fn find(page: &Page, selector: &str) -> ElementId {
    let dom = page.dom();
    dom.query(dom.document_element(), &Selector::parse(selector).unwrap())
        .unwrap_or_else(|| panic!("{selector} not in fixture"))
}

fn run(page: &mut Page, script: &str) {
    let steps = parse_script(script).unwrap();
    run_script(page, &steps).unwrap();
}

#[test]
fn test_every_widget_activates_and_tears_down_cleanly() {
    let mut page = storefront("https://shop.example/");
    assert_eq!(page.runtime().widget_count(), 6);
    run(&mut page, "advance 500\nscroll 1200\nadvance 100");

    let report = page.teardown();
    assert!(report.is_clean());
    assert_eq!(page.runtime().widget_count(), 0);
    assert_eq!(page.runtime().listeners().active_count(), 0);
    assert_eq!(page.runtime().timers().active_count(), 0);
}

#[test]
fn test_sticky_bar_scroll_scenario() {
    let mut page = storefront("https://shop.example/");
    let bar = find(&page, ".sticky-bar");

    run(&mut page, "advance 32\nscroll 0\nadvance 16");
    let html = page.dom().document_element();
    assert_eq!(page.dom().style_property(html, "--bar-height"), Some("80px"));
    assert!(!page.dom().has_class(bar, "sticky-bar--hidden"));

    run(&mut page, "scroll 250\nadvance 16");
    assert!(page.dom().has_class(bar, "sticky-bar--hidden"));

    run(&mut page, "scroll 180\nadvance 16");
    assert!(!page.dom().has_class(bar, "sticky-bar--hidden"));
}

#[test]
fn test_search_prefill_from_query() {
    let page = storefront("https://shop.example/search?q=tent");
    let input = find(&page, ".search-overlay__input");
    let overlay = find(&page, ".search-overlay");
    assert_eq!(page.dom().value(input), Some("tent"));
    assert!(page.dom().has_class(overlay, "is-filled"));
}

#[test]
fn test_search_round_trip_through_script() {
    let mut page = storefront("https://shop.example/");
    run(
        &mut page,
        "click .search-overlay__open\nadvance 120\ninput .search-overlay__input sleeping bag\nsubmit .search-overlay__form",
    );
    let input = find(&page, ".search-overlay__input");
    assert_eq!(page.dom().focused(), Some(input));
    let navigations = page.host::<MemoryDom>().unwrap().navigations();
    assert_eq!(navigations, ["https://shop.example/search?q=sleeping+bag"]);
}

#[test]
fn test_below_fold_image_loads_on_scroll_and_is_cropped() {
    let mut page = storefront("https://shop.example/");
    let image = find(&page, "#below-fold");
    run(&mut page, "advance 32");
    assert_eq!(page.dom().attribute(image, "src"), None);
    assert_eq!(page.dom().style_property(image, "object-position"), Some("60% 30%"));

    run(&mut page, "scroll 1700\nadvance 16");
    assert_eq!(page.dom().attribute(image, "src"), Some("feature.jpg"));
    assert_eq!(page.dom().attribute(image, "fetchpriority"), Some("low"));

    let placeholder = find(&page, ".lazy-media__placeholder");
    run(&mut page, "load #below-fold\nadvance 16");
    assert!(page.dom().has_class(image, "is-loaded"));
    assert!(page.dom().has_class(placeholder, "is-hidden"));
    run(&mut page, "advance 300");
    assert!(!page.dom().exists(placeholder));
}

#[test]
fn test_carousel_breakpoint_cycles_leave_no_listeners_behind() {
    let mut page = storefront("https://shop.example/");
    let hero = find(&page, "#hero");
    run(&mut page, "resize 1280 800\nadvance 300");
    assert!(!page.dom().has_class(hero, "is-mounted"));
    let baseline = page.runtime().listeners().active_count();

    for _ in 0..4 {
        run(&mut page, "resize 375 800\nadvance 300");
        assert!(page.dom().has_class(hero, "is-mounted"));
        run(&mut page, "resize 1280 800\nadvance 300");
        assert_eq!(page.runtime().listeners().active_count(), baseline);
    }
}

#[test]
fn test_outside_touch_stops_carousel_autoplay() {
    let mut page = storefront("https://shop.example/");
    let slides = page
        .dom()
        .query_all(page.dom().document_element(), &Selector::class("carousel__slide"));
    run(&mut page, "advance 1016");
    assert!(page.dom().has_class(slides[1], "is-selected"));

    run(&mut page, "touch .carousel__slide\nenter #hero\nleave #hero\nadvance 5000");
    assert!(page.dom().has_class(slides[1], "is-selected"));
}

#[test]
fn test_cleanup_hook_from_script() {
    let mut page = storefront("https://shop.example/");
    let steps = parse_script("cleanup cleanupCarousel\ncleanup sticky-bar").unwrap();
    let outcome = run_script(&mut page, &steps).unwrap();
    assert_eq!(outcome.cleanups.len(), 2);
    assert!(outcome.failed().is_empty());
    assert_eq!(
        page.registry().names(),
        vec!["header", "search", "lazy-media", "focal-point"]
    );
}
