//! A small CSS selector subset.
//!
//! Supported: `tag`, `*`, `.class`, `#id`, `[attr]`, `[attr=value]` (value
//! optionally quoted), compounds of those (`img.hero[data-src]`), and comma
//! separated lists. Combinators are not supported; scope queries to a
//! container element instead.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use super::{Dom, ElementId};

static COMPOUND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:[A-Za-z][\w-]*|\*)?(?:\.[\w-]+|#[\w-]+|\[[\w-]+(?:=(?:"[^"]*"|'[^']*'|[^\]"']*))?\])*$"#,
    )
    .expect("compound selector regex is valid")
});

static PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?P<tag>[A-Za-z][\w-]*|\*)|\.(?P<class>[\w-]+)|#(?P<id>[\w-]+)|\[(?P<attr>[\w-]+)(?:=(?P<value>"[^"]*"|'[^']*'|[^\]"']*))?\]"#,
    )
    .expect("selector part regex is valid")
});

/// Errors from [`Selector::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unsupported selector `{0}`")]
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Compound {
    fn matches<D: Dom + ?Sized>(&self, dom: &D, el: ElementId) -> bool {
        if let Some(tag) = &self.tag
            && dom.tag_name(el) != Some(tag.as_str())
        {
            return false;
        }
        if let Some(id) = &self.id
            && dom.attribute(el, "id") != Some(id.as_str())
        {
            return false;
        }
        if !self.classes.iter().all(|class| dom.has_class(el, class)) {
            return false;
        }
        self.attrs.iter().all(|(name, value)| match value {
            Some(expected) => dom.attribute(el, name) == Some(expected.as_str()),
            None => dom.has_attribute(el, name),
        })
    }
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Compound>,
}

impl Selector {
    /// Parse a selector string.
    ///
    /// # Errors
    /// Returns [`SelectorError`] for empty input or unsupported syntax
    /// (combinators, pseudo-classes).
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut alternatives = Vec::new();
        for raw in input.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                return Err(SelectorError::Empty);
            }
            if !COMPOUND_RE.is_match(raw) {
                return Err(SelectorError::Unsupported(raw.to_string()));
            }
            alternatives.push(parse_compound(raw));
        }
        Ok(Self { alternatives })
    }

    /// `.name`
    pub fn class(name: &str) -> Self {
        Self::single(Compound {
            classes: vec![name.to_string()],
            ..Compound::default()
        })
    }

    /// `tag`
    pub fn tag(name: &str) -> Self {
        Self::single(Compound {
            tag: Some(name.to_ascii_lowercase()),
            ..Compound::default()
        })
    }

    /// `[name]`
    pub fn attr(name: &str) -> Self {
        Self::single(Compound {
            attrs: vec![(name.to_string(), None)],
            ..Compound::default()
        })
    }

    /// `tag[name]`
    pub fn tag_with_attr(tag: &str, name: &str) -> Self {
        Self::single(Compound {
            tag: Some(tag.to_ascii_lowercase()),
            attrs: vec![(name.to_string(), None)],
            ..Compound::default()
        })
    }

    /// Selector list matching either `self` or `other`.
    pub fn or(mut self, other: Self) -> Self {
        self.alternatives.extend(other.alternatives);
        self
    }

    pub fn matches<D: Dom + ?Sized>(&self, dom: &D, el: ElementId) -> bool {
        dom.exists(el) && self.alternatives.iter().any(|c| c.matches(dom, el))
    }

    fn single(compound: Compound) -> Self {
        Self {
            alternatives: vec![compound],
        }
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_compound(raw: &str) -> Compound {
    let mut compound = Compound::default();
    let mut rest = raw;
    while !rest.is_empty() {
        let Some(caps) = PART_RE.captures(rest) else {
            break;
        };
        if let Some(tag) = caps.name("tag") {
            if tag.as_str() != "*" {
                compound.tag = Some(tag.as_str().to_ascii_lowercase());
            }
        } else if let Some(class) = caps.name("class") {
            compound.classes.push(class.as_str().to_string());
        } else if let Some(id) = caps.name("id") {
            compound.id = Some(id.as_str().to_string());
        } else if let Some(attr) = caps.name("attr") {
            let value = caps.name("value").map(|v| unquote(v.as_str()).to_string());
            compound.attrs.push((attr.as_str().to_string(), value));
        }
        let consumed = caps.get(0).map_or(rest.len(), |m| m.end());
        rest = &rest[consumed..];
    }
    compound
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;

    #[test]
    fn test_parse_compound_selector() {
        let sel = Selector::parse("img.hero.wide#main[data-src]").unwrap();
        let c = &sel.alternatives[0];
        assert_eq!(c.tag.as_deref(), Some("img"));
        assert_eq!(c.classes, vec!["hero", "wide"]);
        assert_eq!(c.id.as_deref(), Some("main"));
        assert_eq!(c.attrs, vec![("data-src".to_string(), None)]);
    }

    #[test]
    fn test_parse_attribute_value_strips_quotes() {
        let sel = Selector::parse(r#"[data-mount="always"]"#).unwrap();
        assert_eq!(
            sel.alternatives[0].attrs,
            vec![("data-mount".to_string(), Some("always".to_string()))]
        );
    }

    #[test]
    fn test_parse_rejects_combinators() {
        assert_eq!(
            Selector::parse(".carousel .dot"),
            Err(SelectorError::Unsupported(".carousel .dot".to_string()))
        );
        assert!(Selector::parse("a:hover").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_list_entries() {
        assert_eq!(Selector::parse(""), Err(SelectorError::Empty));
        assert_eq!(Selector::parse(".a,,.b"), Err(SelectorError::Empty));
    }

    #[test]
    fn test_selector_list_matches_any_alternative() {
        let mut dom = MemoryDom::new(800.0, 600.0);
        let body = dom.document_element();
        let img = dom.append(body, "img").attr("data-src", "a.jpg").finish();
        let div = dom.append(body, "div").class("hero").finish();
        let span = dom.append(body, "span").finish();

        let sel = Selector::parse("img[data-src], .hero").unwrap();
        assert!(sel.matches(&dom, img));
        assert!(sel.matches(&dom, div));
        assert!(!sel.matches(&dom, span));
    }

    #[test]
    fn test_constructor_selectors_match_like_parsed_ones() {
        let mut dom = MemoryDom::new(800.0, 600.0);
        let body = dom.document_element();
        let el = dom.append(body, "IMG").attr("data-srcset", "x").finish();
        assert!(Selector::tag("img").matches(&dom, el));
        assert!(Selector::tag_with_attr("img", "data-srcset").matches(&dom, el));
        assert!(!Selector::attr("data-src").matches(&dom, el));
    }
}
