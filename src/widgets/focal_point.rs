//! Focal-point cropping for `object-fit: cover` images.
//!
//! Authors mark the interesting point of an image with `data-focal-x` and
//! `data-focal-y` in `[-1, 1]` (center is `0 0`). The cropper turns that into
//! an `object-position` so the point stays in frame however the box is
//! cropped.

use std::collections::HashMap;

use anyhow::Result;

use crate::dom::{Dom, ElementId, Selector};
use crate::runtime::{Context, Event, ListenerId};

use super::Widget;

/// Position used when coordinates are missing or malformed.
pub const FALLBACK_POSITION: &str = "50% 50%";
/// Marker set once an element has been converted.
pub const APPLIED_ATTR: &str = "data-focal-applied";

/// Map one coordinate from `[-1, 1]` to a percentage in `[0, 100]`,
/// rounded to two decimals.
pub fn axis_percentage(value: f64) -> f64 {
    let pct = ((value + 1.0) * 50.0).clamp(0.0, 100.0);
    (pct * 100.0).round() / 100.0
}

/// `object-position` value for a focal point, e.g. `(0.5, -1)` → `"75% 0%"`.
pub fn calculate_position(x: f64, y: f64) -> String {
    if !x.is_finite() || !y.is_finite() {
        return FALLBACK_POSITION.to_string();
    }
    format!("{}% {}%", axis_percentage(x), axis_percentage(y))
}

fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Memoised [`calculate_position`], keyed by the exact coordinate pair.
#[derive(Debug, Default)]
pub struct PositionCache {
    entries: HashMap<(u64, u64), String>,
}

impl PositionCache {
    pub fn position(&mut self, x: f64, y: f64) -> &str {
        self.entries
            .entry((x.to_bits(), y.to_bits()))
            .or_insert_with(|| calculate_position(x, y))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Converts every `[data-focal-x][data-focal-y]` element once.
#[derive(Debug)]
pub struct FocalPointCropper {
    cache: PositionCache,
    converted: usize,
}

impl FocalPointCropper {
    pub fn init(ctx: &mut Context<'_>) -> Option<Box<dyn Widget>> {
        let mut cropper = Self {
            cache: PositionCache::default(),
            converted: 0,
        };
        let document = ctx.dom.document_element();
        if cropper.convert(ctx, document) == 0 {
            return None;
        }
        Some(Box::new(cropper))
    }

    /// Queue `object-position` writes for unconverted focal elements under
    /// `scope`. Returns how many were found.
    pub fn convert(&mut self, ctx: &mut Context<'_>, scope: ElementId) -> usize {
        let targets: Vec<(ElementId, String)> = ctx
            .dom
            .query_all(scope, &Selector::attr("data-focal-x"))
            .into_iter()
            .filter(|&el| ctx.dom.has_attribute(el, "data-focal-y") && !ctx.dom.has_attribute(el, APPLIED_ATTR))
            .map(|el| {
                let x = parse_coordinate(ctx.dom.attribute(el, "data-focal-x"));
                let y = parse_coordinate(ctx.dom.attribute(el, "data-focal-y"));
                let position = match (x, y) {
                    (Some(x), Some(y)) => self.cache.position(x, y).to_string(),
                    _ => {
                        tracing::debug!(%el, "malformed focal point; centering");
                        FALLBACK_POSITION.to_string()
                    }
                };
                (el, position)
            })
            .collect();

        let found = targets.len();
        self.converted += found;
        if found > 0 {
            ctx.mutate(move |dom| {
                for (el, position) in targets {
                    if !dom.exists(el) || dom.has_attribute(el, APPLIED_ATTR) {
                        continue;
                    }
                    dom.set_style_property(el, "object-position", &position);
                    dom.set_attribute(el, APPLIED_ATTR, "");
                }
            });
        }
        found
    }

    pub const fn converted(&self) -> usize {
        self.converted
    }

    pub const fn cache(&self) -> &PositionCache {
        &self.cache
    }
}

impl Widget for FocalPointCropper {
    fn name(&self) -> &'static str {
        "focal-point"
    }

    fn on_event(&mut self, _ctx: &mut Context<'_>, _event: &Event, _listener: ListenerId) {}

    fn teardown(&mut self, _ctx: &mut Context<'_>) -> Result<()> {
        self.cache = PositionCache::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;
    use crate::runtime::Page;
    use proptest::prelude::*;

    #[test]
    fn test_known_positions() {
        assert_eq!(calculate_position(0.0, 0.0), "50% 50%");
        assert_eq!(calculate_position(0.5, -1.0), "75% 0%");
        assert_eq!(calculate_position(1.0, 1.0), "100% 100%");
        assert_eq!(calculate_position(-0.333, 0.0), "33.35% 50%");
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(calculate_position(-3.0, 7.5), "0% 100%");
    }

    #[test]
    fn test_non_finite_falls_back_to_center() {
        assert_eq!(calculate_position(f64::NAN, 0.2), FALLBACK_POSITION);
        assert_eq!(calculate_position(0.2, f64::INFINITY), FALLBACK_POSITION);
    }

    #[test]
    fn test_cache_reuses_pairs() {
        let mut cache = PositionCache::default();
        cache.position(0.1, 0.2);
        cache.position(0.1, 0.2);
        cache.position(0.2, 0.1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cropper_writes_object_position_once() {
        let mut dom = MemoryDom::new(800.0, 600.0);
        let body = dom.document_element();
        let good = dom
            .append(body, "img")
            .attr("data-focal-x", "0.5")
            .attr("data-focal-y", "-0.5")
            .finish();
        let bad = dom
            .append(body, "img")
            .attr("data-focal-x", "left")
            .attr("data-focal-y", "0")
            .finish();
        let done = dom
            .append(body, "img")
            .attr("data-focal-x", "1")
            .attr("data-focal-y", "1")
            .attr(APPLIED_ATTR, "")
            .finish();
        let lone = dom.append(body, "img").attr("data-focal-x", "1").finish();
        let mut page = Page::new(dom);
        let id = page.activate()[0];
        assert_eq!(page.widget::<FocalPointCropper>(id).map(FocalPointCropper::converted), Some(2));

        page.advance(16);
        let dom = page.dom();
        assert_eq!(dom.style_property(good, "object-position"), Some("75% 25%"));
        assert!(dom.has_attribute(good, APPLIED_ATTR));
        assert_eq!(dom.style_property(bad, "object-position"), Some(FALLBACK_POSITION));
        assert_eq!(dom.style_property(done, "object-position"), None);
        assert_eq!(dom.style_property(lone, "object-position"), None);
    }

    #[test]
    fn test_no_focal_elements_means_no_widget() {
        let mut page = Page::new(MemoryDom::new(800.0, 600.0));
        assert!(page.activate().is_empty());
    }

    proptest! {
        #[test]
        fn prop_axis_percentage_stays_in_range(v in -1.0e6f64..1.0e6) {
            let pct = axis_percentage(v);
            prop_assert!((0.0..=100.0).contains(&pct));
        }

        #[test]
        fn prop_position_is_deterministic(x in -2.0f64..2.0, y in -2.0f64..2.0) {
            let mut cache = PositionCache::default();
            let cached = cache.position(x, y).to_string();
            prop_assert_eq!(calculate_position(x, y), cached.clone());
            prop_assert_eq!(cache.position(x, y), cached.as_str());
        }

        #[test]
        fn prop_in_range_is_monotonic(a in -1.0f64..=1.0, b in -1.0f64..=1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(axis_percentage(lo) <= axis_percentage(hi));
        }
    }
}
