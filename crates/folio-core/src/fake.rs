#![forbid(unsafe_code)]

//! In-memory document and deterministic event harness.
//!
//! [`FakeDocument`] implements every capability trait from [`crate::dom`] on a
//! plain element arena, with a host-controlled clock in place of the browser's
//! timers. [`Harness`] plays the browser's part: it bubbles clicks through the
//! tree, fires due timers in order as time advances, runs animation frames and
//! delivers intersection callbacks, all without threads or real time.
//!
//! # Example
//!
//! ```
//! use folio_core::fake::{FakeDocument, Harness};
//! use folio_core::SiteConfig;
//!
//! let mut doc = FakeDocument::new().with_year(2031);
//! let footer = doc.body();
//! let year = doc.append(footer, "span", &[("id", "year")]);
//!
//! let mut harness = Harness::new(SiteConfig::default(), doc);
//! harness.start();
//! assert_eq!(harness.doc.text(year), "2031");
//! ```

use core::time::Duration;
use std::collections::BTreeMap;

use crate::config::SiteConfig;
use crate::dom::{
    Clock, DomEvent, ElementMut, ElementQuery, EventTarget, EventType, Events, FrameTask,
    ListenerId, NodeId, Observation, Observer, ObserverOptions, Outcome, Route, ScrollBehavior,
    Scheduler, TimerId, TimerTask, Viewport,
};
use crate::selector::{Selector, SelectorTree};
use crate::site::Site;

#[derive(Debug, Clone, Default)]
struct FakeNode {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: BTreeMap<String, String>,
    text: String,
    inner_html: String,
    styles: BTreeMap<String, String>,
    /// Page-absolute top edge used for `bounding_top`.
    page_top: f64,
}

#[derive(Debug, Clone, Copy)]
struct Subscription {
    target: EventTarget,
    event: EventType,
    route: Route,
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    due: Duration,
    task: TimerTask,
}

#[derive(Debug, Clone)]
struct ObserverState {
    options: ObserverOptions,
    watched: Vec<NodeId>,
}

/// Arena-backed document with a deterministic clock.
#[derive(Debug, Clone)]
pub struct FakeDocument {
    nodes: Vec<FakeNode>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    path: String,
    width: f64,
    scroll_y: f64,
    reduced_motion: bool,
    observation: bool,
    year: i32,
    now: Duration,
    next_listener: u32,
    listeners: BTreeMap<ListenerId, Subscription>,
    next_timer: u32,
    timers: BTreeMap<TimerId, PendingTimer>,
    frames: Vec<FrameTask>,
    observers: BTreeMap<Observer, ObserverState>,
    scrolls: Vec<(f64, ScrollBehavior)>,
}

impl Default for FakeDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDocument {
    /// Empty `<html><head></head><body></body></html>` at `/`, 1280px wide,
    /// with observation support and full motion.
    #[must_use]
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId::new(0),
            head: NodeId::new(0),
            body: NodeId::new(0),
            path: "/".to_owned(),
            width: 1280.0,
            scroll_y: 0.0,
            reduced_motion: false,
            observation: true,
            year: 2024,
            now: Duration::ZERO,
            next_listener: 0,
            listeners: BTreeMap::new(),
            next_timer: 0,
            timers: BTreeMap::new(),
            frames: Vec::new(),
            observers: BTreeMap::new(),
            scrolls: Vec::new(),
        };
        doc.root = doc.alloc("html");
        doc.head = doc.alloc("head");
        doc.body = doc.alloc("body");
        let (root, head, body) = (doc.root, doc.head, doc.body);
        doc.attach(root, head, None);
        doc.attach(root, body, None);
        doc
    }

    /// Set `location.pathname`.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the viewport width.
    #[must_use]
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    /// Set the reduced-motion preference.
    #[must_use]
    pub fn with_reduced_motion(mut self, reduced: bool) -> Self {
        self.reduced_motion = reduced;
        self
    }

    /// Simulate a runtime without intersection observers.
    #[must_use]
    pub fn without_observation(mut self) -> Self {
        self.observation = false;
        self
    }

    /// Set the calendar year reported by [`Clock`].
    #[must_use]
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    #[must_use]
    pub fn head(&self) -> NodeId {
        self.head
    }

    #[must_use]
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Create `<tag ...attributes>` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let node = self.alloc(tag);
        if let Some(fake) = self.node_mut(node) {
            for (name, value) in attributes {
                fake.attributes.insert((*name).to_owned(), (*value).to_owned());
            }
        }
        self.attach(parent, node, None);
        node
    }

    /// Set the page-absolute top edge of `node`.
    pub fn set_page_top(&mut self, node: NodeId, top: f64) {
        if let Some(fake) = self.node_mut(node) {
            fake.page_top = top;
        }
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = width;
    }

    pub fn set_scroll_y(&mut self, y: f64) {
        self.scroll_y = y;
    }

    /// Text content of `node`.
    #[must_use]
    pub fn text(&self, node: NodeId) -> &str {
        self.node(node).map_or("", |n| n.text.as_str())
    }

    #[must_use]
    pub fn inner_html(&self, node: NodeId) -> &str {
        self.node(node).map_or("", |n| n.inner_html.as_str())
    }

    /// Inline style property of `node`.
    #[must_use]
    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.node(node)
            .and_then(|n| n.styles.get(property))
            .map(String::as_str)
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.tag.as_str())
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map_or(&[], |n| n.children.as_slice())
    }

    /// Whether `node` is reachable from the document root.
    #[must_use]
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == self.root {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Every `scroll_to` request so far.
    #[must_use]
    pub fn scroll_log(&self) -> &[(f64, ScrollBehavior)] {
        &self.scrolls
    }

    /// Subscriptions on `target` for `event`, in registration order.
    #[must_use]
    pub fn listeners_on(&self, target: EventTarget, event: EventType) -> Vec<(ListenerId, Route)> {
        self.listeners
            .iter()
            .filter(|(_, sub)| sub.target == target && sub.event == event)
            .map(|(id, sub)| (*id, sub.route))
            .collect()
    }

    /// Number of live subscriptions delivering to `route`.
    #[must_use]
    pub fn route_count(&self, route: Route) -> usize {
        self.listeners.values().filter(|s| s.route == route).count()
    }

    fn is_listening(&self, id: ListenerId) -> bool {
        self.listeners.contains_key(&id)
    }

    /// Nodes currently watched by `observer`.
    #[must_use]
    pub fn observed(&self, observer: Observer) -> &[NodeId] {
        self.observers
            .get(&observer)
            .map_or(&[], |state| state.watched.as_slice())
    }

    /// Options `observer` was created with, if it exists.
    #[must_use]
    pub fn observer_options(&self, observer: Observer) -> Option<&ObserverOptions> {
        self.observers.get(&observer).map(|state| &state.options)
    }

    #[must_use]
    pub fn is_observed(&self, observer: Observer, node: NodeId) -> bool {
        self.observed(observer).contains(&node)
    }

    /// Current host time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Pop the earliest timer due at or before `until`, moving the clock to
    /// its due time.
    pub fn pop_due_timer(&mut self, until: Duration) -> Option<(TimerId, TimerTask)> {
        let (&id, timer) = self
            .timers
            .iter()
            .filter(|(_, t)| t.due <= until)
            .min_by_key(|(id, t)| (t.due, **id))?;
        let due = timer.due;
        let task = timer.task;
        self.timers.remove(&id);
        self.now = self.now.max(due);
        Some((id, task))
    }

    /// Move the clock forward without firing anything.
    pub fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    /// Drain requested animation frames.
    pub fn take_frames(&mut self) -> Vec<FrameTask> {
        std::mem::take(&mut self.frames)
    }

    fn alloc(&mut self, tag: &str) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        self.nodes.push(FakeNode {
            tag: tag.to_ascii_lowercase(),
            ..FakeNode::default()
        });
        id
    }

    fn node(&self, node: NodeId) -> Option<&FakeNode> {
        self.nodes.get(node.get() as usize)
    }

    fn node_mut(&mut self, node: NodeId) -> Option<&mut FakeNode> {
        self.nodes.get_mut(node.get() as usize)
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|&c| c != node);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = None;
        }
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if self.node(parent).is_none() || self.node(child).is_none() || self.contains(child, parent)
        {
            return;
        }
        self.detach(child);
        let Some(p) = self.node_mut(parent) else {
            return;
        };
        let index = reference
            .and_then(|r| p.children.iter().position(|&c| c == r))
            .unwrap_or(p.children.len());
        p.children.insert(index, child);
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
    }

    /// Attached descendants of `scope` in document order.
    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    fn select(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        let Ok(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.descendants(scope)
            .into_iter()
            .filter(|&n| selector.matches(self, n))
            .collect()
    }
}

impl SelectorTree for FakeDocument {
    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.tag(node)
    }

    fn attribute_value(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)
            .and_then(|n| n.attributes.get(name))
            .map(String::as_str)
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node)
    }
}

impl ElementQuery for FakeDocument {
    fn query(&self, selector: &str) -> Option<NodeId> {
        self.select(self.root, selector).into_iter().next()
    }

    fn query_all(&self, selector: &str) -> Vec<NodeId> {
        self.select(self.root, selector)
    }

    fn query_within(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        self.select(scope, selector)
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&n| self.attribute_value(n, "id") == Some(id))
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.attribute_value(node, name).map(str::to_owned)
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute_value(node, "class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    fn image_source(&self, node: NodeId) -> Option<String> {
        self.attribute(node, "src")
    }
}

impl ElementMut for FakeDocument {
    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(tag)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.node_mut(node) {
            n.attributes.insert(name.to_owned(), value.to_owned());
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(n) = self.node_mut(node) {
            n.attributes.remove(name);
        }
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        if let Some(n) = self.node_mut(node) {
            let list = n.attributes.entry("class".to_owned()).or_default();
            if !list.is_empty() {
                list.push(' ');
            }
            list.push_str(class);
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(list) = self.node_mut(node).and_then(|n| n.attributes.get_mut("class")) {
            *list = list
                .split_ascii_whitespace()
                .filter(|c| *c != class)
                .collect::<Vec<_>>()
                .join(" ");
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(n) = self.node_mut(node) {
            n.text = text.to_owned();
        }
    }

    fn set_inner_html(&mut self, node: NodeId, html: &str) {
        if let Some(n) = self.node_mut(node) {
            n.inner_html = html.to_owned();
        }
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(n) = self.node_mut(node) {
            n.styles.insert(property.to_owned(), value.to_owned());
        }
    }

    fn set_css_text(&mut self, node: NodeId, css: &str) {
        let Some(n) = self.node_mut(node) else {
            return;
        };
        n.styles.clear();
        for declaration in css.split(';') {
            if let Some((property, value)) = declaration.split_once(':') {
                let property = property.trim();
                if !property.is_empty() {
                    n.styles
                        .insert(property.to_owned(), value.trim().to_owned());
                }
            }
        }
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        self.attach(parent, child, reference);
    }

    fn append_to_head(&mut self, node: NodeId) {
        let head = self.head;
        self.attach(head, node, None);
    }

    fn append_to_body(&mut self, node: NodeId) {
        let body = self.body;
        self.attach(body, node, None);
    }

    fn remove(&mut self, node: NodeId) {
        self.detach(node);
    }
}

impl Viewport for FakeDocument {
    fn location_path(&self) -> String {
        self.path.clone()
    }

    fn inner_width(&self) -> f64 {
        self.width
    }

    fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    fn bounding_top(&self, node: NodeId) -> f64 {
        self.node(node).map_or(0.0, |n| n.page_top) - self.scroll_y
    }

    fn scroll_to(&mut self, top: f64, behavior: ScrollBehavior) {
        self.scrolls.push((top, behavior));
        self.scroll_y = top.max(0.0);
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.reduced_motion
    }
}

impl Observation for FakeDocument {
    fn observation_supported(&self) -> bool {
        self.observation
    }

    fn observe(&mut self, observer: Observer, options: &ObserverOptions, node: NodeId) {
        if !self.observation {
            return;
        }
        let state = self.observers.entry(observer).or_insert_with(|| ObserverState {
            options: options.clone(),
            watched: Vec::new(),
        });
        if !state.watched.contains(&node) {
            state.watched.push(node);
        }
    }

    fn unobserve(&mut self, observer: Observer, node: NodeId) {
        if let Some(state) = self.observers.get_mut(&observer) {
            state.watched.retain(|&n| n != node);
        }
    }

    fn disconnect(&mut self, observer: Observer) {
        if let Some(state) = self.observers.get_mut(&observer) {
            state.watched.clear();
        }
    }
}

impl Events for FakeDocument {
    fn listen(&mut self, target: EventTarget, event: EventType, route: Route) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.insert(
            id,
            Subscription {
                target,
                event,
                route,
            },
        );
        id
    }

    fn unlisten(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }

    fn unlisten_all(&mut self) {
        self.listeners.clear();
    }

    fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Scheduler for FakeDocument {
    fn set_timeout(&mut self, delay: Duration, task: TimerTask) -> TimerId {
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        self.timers.insert(
            id,
            PendingTimer {
                due: self.now.saturating_add(delay),
                task,
            },
        );
        id
    }

    fn clear_timeout(&mut self, id: TimerId) {
        self.timers.remove(&id);
    }

    fn request_frame(&mut self, task: FrameTask) {
        self.frames.push(task);
    }

    fn cancel_all(&mut self) {
        self.timers.clear();
        self.frames.clear();
    }
}

impl Clock for FakeDocument {
    fn current_year(&self) -> i32 {
        self.year
    }
}

/// Browser stand-in that drives a [`Site`] over a [`FakeDocument`].
#[derive(Debug)]
pub struct Harness {
    pub site: Site,
    pub doc: FakeDocument,
}

impl Harness {
    #[must_use]
    pub fn new(config: SiteConfig, doc: FakeDocument) -> Self {
        Self {
            site: Site::new(config),
            doc,
        }
    }

    /// Run the startup pass.
    pub fn start(&mut self) {
        self.site.start(&mut self.doc);
    }

    /// Tear the site down, as the host does when the page script is unloaded.
    pub fn stop(&mut self) {
        self.site.stop(&mut self.doc);
    }

    /// Click `node`, bubbling through its ancestors, then the document and
    /// the window.
    pub fn click(&mut self, node: NodeId) -> Outcome {
        let mut path = Vec::new();
        let mut current = Some(node);
        while let Some(n) = current {
            path.push(EventTarget::Node(n));
            current = self.doc.parent(n);
        }
        path.push(EventTarget::Document);
        path.push(EventTarget::Window);

        let mut outcome = Outcome::Ignored;
        for target in path {
            let current = match target {
                EventTarget::Node(n) => Some(n),
                _ => None,
            };
            for (id, route) in self.doc.listeners_on(target, EventType::Click) {
                if !self.doc.is_listening(id) {
                    continue;
                }
                let event = DomEvent::pointer(route, current, Some(node));
                outcome = outcome.merge(self.site.handle_event(&mut self.doc, &event));
            }
        }
        outcome
    }

    /// Press `key` with focus on the document body.
    pub fn key_down(&mut self, key: &str) -> Outcome {
        let mut outcome = Outcome::Ignored;
        for target in [EventTarget::Document, EventTarget::Window] {
            for (id, route) in self.doc.listeners_on(target, EventType::KeyDown) {
                if !self.doc.is_listening(id) {
                    continue;
                }
                let event = DomEvent::key(route, key);
                outcome = outcome.merge(self.site.handle_event(&mut self.doc, &event));
            }
        }
        outcome
    }

    /// Resize the viewport and fire `resize` on the window.
    pub fn resize(&mut self, width: f64) {
        self.doc.set_width(width);
        self.fire_window(EventType::Resize);
    }

    /// Scroll the page and fire `scroll` on the window.
    pub fn scroll(&mut self, y: f64) {
        self.doc.set_scroll_y(y);
        self.fire_window(EventType::Scroll);
    }

    /// Fire `load` on `node` (does not bubble).
    pub fn load(&mut self, node: NodeId) {
        for (id, route) in self.doc.listeners_on(EventTarget::Node(node), EventType::Load) {
            if self.doc.is_listening(id) {
                let event = DomEvent::pointer(route, Some(node), Some(node));
                let _ = self.site.handle_event(&mut self.doc, &event);
            }
        }
    }

    /// Report `node` as intersecting for `observer`. Returns whether the
    /// observer was watching it (unwatched nodes produce no callback).
    pub fn intersect(&mut self, observer: Observer, node: NodeId) -> bool {
        if !self.doc.is_observed(observer, node) {
            return false;
        }
        self.site.handle_intersection(&mut self.doc, observer, node);
        true
    }

    /// Advance time by `dt`, firing every timer that falls due, in order.
    pub fn advance(&mut self, dt: Duration) {
        let until = self.doc.now().saturating_add(dt);
        while let Some((id, task)) = self.doc.pop_due_timer(until) {
            self.site.handle_timer(&mut self.doc, id, task);
        }
        self.doc.set_now(until);
    }

    /// Run every requested animation frame. Returns how many ran.
    pub fn flush_frames(&mut self) -> usize {
        let frames = self.doc.take_frames();
        let count = frames.len();
        for task in frames {
            self.site.handle_frame(&mut self.doc, task);
        }
        count
    }

    fn fire_window(&mut self, event: EventType) {
        for (id, route) in self.doc.listeners_on(EventTarget::Window, event) {
            if self.doc.is_listening(id) {
                let _ = self
                    .site
                    .handle_event(&mut self.doc, &DomEvent::signal(route));
            }
        }
    }
}
