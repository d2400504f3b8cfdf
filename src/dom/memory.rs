//! In-memory [`Dom`] host.
//!
//! Layout is not computed: every element carries an explicit rectangle in
//! document coordinates. That is enough for intersection tests, height
//! measurements, and deterministic replays of scroll/resize sequences.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Dom, DomError, ElementId, Rect, Viewport};

#[derive(Debug, Clone, Default)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    classes: Vec<String>,
    style: BTreeMap<String, String>,
    rect: Rect,
    parent: Option<usize>,
    children: Vec<usize>,
    attached: bool,
    complete: bool,
    decode_error: bool,
    value: String,
}

/// Serialized element, as read from and written to page fixtures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub style: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub complete: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub decode_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

/// A whole page fixture: the viewport plus the `<html>` tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSpec {
    pub viewport: Viewport,
    pub root: NodeSpec,
}

/// Arena-backed document tree.
#[derive(Debug, Clone)]
pub struct MemoryDom {
    nodes: Vec<Node>,
    viewport: Viewport,
    focused: Option<ElementId>,
    navigations: Vec<String>,
    decodes: usize,
}

impl MemoryDom {
    /// Empty document with an `<html>` element covering the viewport.
    pub fn new(width: f64, height: f64) -> Self {
        let root = Node {
            tag: "html".to_string(),
            rect: Rect::new(0.0, 0.0, width, height),
            attached: true,
            ..Node::default()
        };
        Self {
            nodes: vec![root],
            viewport: Viewport::new(width, height),
            focused: None,
            navigations: Vec::new(),
            decodes: 0,
        }
    }

    /// Build a document from a fixture. The fixture root becomes the
    /// document element regardless of its tag.
    pub fn from_spec(spec: &PageSpec) -> Self {
        let mut dom = Self::new(spec.viewport.width, spec.viewport.height);
        dom.viewport = spec.viewport;
        dom.nodes[0] = node_from_spec(&spec.root, None);
        for child in &spec.root.children {
            dom.insert_spec(0, child);
        }
        dom
    }

    /// Serialize the attached tree back into a fixture.
    pub fn to_spec(&self) -> PageSpec {
        PageSpec {
            viewport: self.viewport,
            root: self.spec_for(0),
        }
    }

    /// Start building a new child of `parent`.
    pub fn append(&mut self, parent: ElementId, tag: &str) -> ElementBuilder<'_> {
        let index = self.nodes.len();
        let attached = self.exists(parent);
        self.nodes.push(Node {
            tag: tag.to_ascii_lowercase(),
            parent: Some(parent.0),
            attached,
            ..Node::default()
        });
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(index);
        }
        ElementBuilder {
            dom: self,
            id: ElementId(index),
        }
    }

    /// Set an element's layout box.
    pub fn set_rect(&mut self, el: ElementId, rect: Rect) {
        if let Some(node) = self.nodes.get_mut(el.0) {
            node.rect = rect;
        }
    }

    /// Mark an image as finished loading.
    pub fn set_complete(&mut self, el: ElementId, complete: bool) {
        if let Some(node) = self.nodes.get_mut(el.0) {
            node.complete = complete;
        }
    }

    /// Class list of an element, in insertion order.
    pub fn classes(&self, el: ElementId) -> &[String] {
        self.nodes.get(el.0).map_or(&[], |n| n.classes.as_slice())
    }

    /// URLs passed to [`Dom::navigate`], oldest first.
    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    /// Number of successful [`Dom::decode`] calls.
    pub const fn decode_count(&self) -> usize {
        self.decodes
    }

    /// Number of elements ever created, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, el: ElementId) -> Option<&Node> {
        self.nodes.get(el.0).filter(|n| n.attached)
    }

    fn node_mut(&mut self, el: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(el.0).filter(|n| n.attached)
    }

    fn insert_spec(&mut self, parent: usize, spec: &NodeSpec) {
        let index = self.nodes.len();
        self.nodes.push(node_from_spec(spec, Some(parent)));
        self.nodes[parent].children.push(index);
        for child in &spec.children {
            self.insert_spec(index, child);
        }
    }

    fn spec_for(&self, index: usize) -> NodeSpec {
        let node = &self.nodes[index];
        let mut attrs = node.attrs.clone();
        let id = attrs.remove("id");
        NodeSpec {
            tag: node.tag.clone(),
            id,
            class: (!node.classes.is_empty()).then(|| node.classes.join(" ")),
            attrs,
            style: node.style.clone(),
            rect: Some([node.rect.x, node.rect.y, node.rect.width, node.rect.height]),
            complete: node.complete,
            decode_error: node.decode_error,
            value: (!node.value.is_empty()).then(|| node.value.clone()),
            children: node
                .children
                .iter()
                .filter(|&&c| self.nodes[c].attached)
                .map(|&c| self.spec_for(c))
                .collect(),
        }
    }

    fn detach_subtree(&mut self, index: usize) {
        let mut stack = vec![index];
        while let Some(i) = stack.pop() {
            let node = &mut self.nodes[i];
            node.attached = false;
            stack.extend(node.children.iter().copied());
        }
    }
}

fn node_from_spec(spec: &NodeSpec, parent: Option<usize>) -> Node {
    let mut attrs = spec.attrs.clone();
    if let Some(id) = &spec.id {
        attrs.insert("id".to_string(), id.clone());
    }
    let rect = spec
        .rect
        .map(|[x, y, w, h]| Rect::new(x, y, w, h))
        .unwrap_or_default();
    Node {
        tag: spec.tag.to_ascii_lowercase(),
        attrs,
        classes: spec
            .class
            .as_deref()
            .map(|c| c.split_whitespace().map(ToOwned::to_owned).collect())
            .unwrap_or_default(),
        style: spec.style.clone(),
        rect,
        parent,
        children: Vec::new(),
        attached: true,
        complete: spec.complete,
        decode_error: spec.decode_error,
        value: spec.value.clone().unwrap_or_default(),
    }
}

impl Dom for MemoryDom {
    fn document_element(&self) -> ElementId {
        ElementId(0)
    }

    fn exists(&self, el: ElementId) -> bool {
        self.node(el).is_some()
    }

    fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.node(el)?.parent.map(ElementId)
    }

    fn children(&self, el: ElementId) -> Vec<ElementId> {
        self.node(el).map_or_else(Vec::new, |n| {
            n.children
                .iter()
                .filter(|&&c| self.nodes[c].attached)
                .map(|&c| ElementId(c))
                .collect()
        })
    }

    fn tag_name(&self, el: ElementId) -> Option<&str> {
        self.node(el).map(|n| n.tag.as_str())
    }

    fn attribute(&self, el: ElementId, name: &str) -> Option<&str> {
        self.node(el)?.attrs.get(name).map(String::as_str)
    }

    fn set_attribute(&mut self, el: ElementId, name: &str, value: &str) {
        if let Some(node) = self.node_mut(el) {
            node.attrs.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attribute(&mut self, el: ElementId, name: &str) {
        if let Some(node) = self.node_mut(el) {
            node.attrs.remove(name);
        }
    }

    fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.node(el).is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    fn add_class(&mut self, el: ElementId, class: &str) {
        if let Some(node) = self.node_mut(el)
            && !node.classes.iter().any(|c| c == class)
        {
            node.classes.push(class.to_string());
        }
    }

    fn remove_class(&mut self, el: ElementId, class: &str) {
        if let Some(node) = self.node_mut(el) {
            node.classes.retain(|c| c != class);
        }
    }

    fn style_property(&self, el: ElementId, name: &str) -> Option<&str> {
        self.node(el)?.style.get(name).map(String::as_str)
    }

    fn set_style_property(&mut self, el: ElementId, name: &str, value: &str) {
        if let Some(node) = self.node_mut(el) {
            node.style.insert(name.to_string(), value.to_string());
        }
    }

    fn rect(&self, el: ElementId) -> Rect {
        self.node(el).map(|n| n.rect).unwrap_or_default()
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn remove(&mut self, el: ElementId) {
        if el.0 == 0 || !self.exists(el) {
            return;
        }
        if let Some(parent) = self.nodes[el.0].parent {
            self.nodes[parent].children.retain(|&c| c != el.0);
        }
        self.detach_subtree(el.0);
        if self.focused.is_some_and(|f| !self.exists(f)) {
            self.focused = None;
        }
    }

    fn is_complete(&self, el: ElementId) -> bool {
        self.node(el).is_some_and(|n| n.complete)
    }

    fn decode(&mut self, el: ElementId) -> Result<(), DomError> {
        let node = self.node(el).ok_or(DomError::Detached(el))?;
        if node.decode_error {
            return Err(DomError::DecodeFailed(el));
        }
        self.decodes += 1;
        Ok(())
    }

    fn value(&self, el: ElementId) -> Option<&str> {
        self.node(el).map(|n| n.value.as_str())
    }

    fn set_value(&mut self, el: ElementId, value: &str) {
        if let Some(node) = self.node_mut(el) {
            node.value = value.to_string();
        }
    }

    fn focus(&mut self, el: ElementId) {
        if self.exists(el) {
            self.focused = Some(el);
        }
    }

    fn focused(&self) -> Option<ElementId> {
        self.focused
    }

    fn navigate(&mut self, url: &str) {
        self.navigations.push(url.to_string());
    }
}

/// Chained setup for a freshly appended element.
pub struct ElementBuilder<'a> {
    dom: &'a mut MemoryDom,
    id: ElementId,
}

impl ElementBuilder<'_> {
    /// Add one or more whitespace-separated classes.
    pub fn class(mut self, classes: &str) -> Self {
        for class in classes.split_whitespace() {
            self.dom.add_class(self.id, class);
        }
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.dom.set_attribute(self.id, name, value);
        self
    }

    pub fn rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.dom.set_rect(self.id, Rect::new(x, y, width, height));
        self
    }

    pub fn complete(mut self) -> Self {
        self.dom.set_complete(self.id, true);
        self
    }

    /// Make [`Dom::decode`] fail for this element.
    pub fn decode_error(mut self) -> Self {
        if let Some(node) = self.dom.nodes.get_mut(self.id.0) {
            node.decode_error = true;
        }
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.dom.set_value(self.id, value);
        self
    }

    /// Finish building and return the element handle.
    pub const fn finish(self) -> ElementId {
        self.id
    }
}
