#![forbid(unsafe_code)]

//! Document capability surface.
//!
//! Components never touch a global DOM. They receive a host object and bound
//! on the narrow traits below, so each one asks only for what it uses:
//!
//! | Trait | Capability |
//! |-------|------------|
//! | [`ElementQuery`] | selector lookups and read-only element state |
//! | [`ElementMut`] | element creation, attributes, classes, inline style |
//! | [`Viewport`] | location, width, scroll position, motion preference |
//! | [`Observation`] | viewport-intersection observers |
//! | [`Events`] | event subscriptions routed back as [`Route`]s |
//! | [`Scheduler`] | timeouts and animation frames |
//! | [`Clock`] | calendar year |
//!
//! [`Document`] is the blanket union of all of them.
//!
//! # Host contract
//!
//! - Lookups that find nothing return `None` or an empty list. A selector the
//!   host cannot parse behaves exactly like one that matches nothing.
//! - Mutations on a stale or detached node are silently ignored.
//! - Subscriptions are delivered back into [`crate::Site`] as
//!   [`DomEvent`]s carrying the [`Route`] they were registered with. The host
//!   applies the returned [`Outcome`].

use core::fmt;
use core::time::Duration;

/// Opaque handle to an element, minted by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Wrap a raw host index.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw host index.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a registered event subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u32);

/// Handle to a scheduled timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u32);

/// Identity of one zoom overlay instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(pub u32);

/// Where a subscription is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTarget {
    Window,
    Document,
    Node(NodeId),
}

/// Browser event types the components subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Click,
    KeyDown,
    Load,
    Resize,
    Scroll,
}

impl EventType {
    /// DOM event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::KeyDown => "keydown",
            Self::Load => "load",
            Self::Resize => "resize",
            Self::Scroll => "scroll",
        }
    }
}

/// Which handler a subscription delivers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// In-page anchor activation.
    AnchorClick,
    /// Mobile menu toggle button.
    MenuToggle,
    /// A link inside the open mobile menu.
    MenuLink,
    /// Any click on the document while the menu may be open.
    MenuOutside,
    /// A zoomable image was clicked.
    ZoomOpen,
    /// Click on an overlay backdrop.
    ZoomBackdrop(OverlayId),
    /// Document key press while an overlay is open.
    ZoomEscape(OverlayId),
    /// A lazily loaded image finished loading.
    ImageLoaded,
    /// Window resize.
    Resize,
    /// Window scroll.
    Scroll,
}

/// Work deferred through [`Scheduler::set_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerTask {
    ResizeSettled,
    ScrollSettled,
    RemoveOverlay(OverlayId),
}

/// Work deferred to the next paint through [`Scheduler::request_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameTask {
    RevealOverlay(OverlayId),
}

/// Viewport-intersection observers owned by the components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Observer {
    LazyImages,
    Sections,
}

/// Options an observer is created with.
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverOptions {
    /// CSS margin around the viewport (e.g. `"50px"`).
    pub root_margin: String,
    /// Visible fraction that counts as intersecting.
    pub threshold: f64,
}

/// How [`Viewport::scroll_to`] moves the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

/// An event delivered from the host.
#[derive(Debug, Clone, PartialEq)]
pub struct DomEvent {
    /// Route the subscription was registered with.
    pub route: Route,
    /// Node the listener is attached to, when it is attached to a node.
    pub current: Option<NodeId>,
    /// Node the event originated from, when the host can name it.
    pub target: Option<NodeId>,
    /// `KeyboardEvent.key` for key events.
    pub key: Option<String>,
}

impl DomEvent {
    /// Event without node or key detail (resize, scroll).
    #[must_use]
    pub fn signal(route: Route) -> Self {
        Self {
            route,
            current: None,
            target: None,
            key: None,
        }
    }

    /// Click or load event.
    #[must_use]
    pub fn pointer(route: Route, current: Option<NodeId>, target: Option<NodeId>) -> Self {
        Self {
            route,
            current,
            target,
            key: None,
        }
    }

    /// Key press.
    #[must_use]
    pub fn key(route: Route, key: impl Into<String>) -> Self {
        Self {
            route,
            current: None,
            target: None,
            key: Some(key.into()),
        }
    }
}

/// What the host should do after a handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Outcome {
    /// Nothing matched; default behavior applies.
    Ignored,
    /// Handled; default behavior still applies.
    Handled,
    /// Handled; the host must cancel the default action.
    PreventDefault,
}

impl Outcome {
    /// Fold two outcomes of one dispatch into the stronger one.
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::PreventDefault, _) | (_, Self::PreventDefault) => Self::PreventDefault,
            (Self::Handled, _) | (_, Self::Handled) => Self::Handled,
            _ => Self::Ignored,
        }
    }
}

/// Selector lookups and read-only element state.
pub trait ElementQuery {
    fn query(&self, selector: &str) -> Option<NodeId>;
    fn query_all(&self, selector: &str) -> Vec<NodeId>;
    /// Descendants of `scope` matching `selector`.
    fn query_within(&self, scope: NodeId, selector: &str) -> Vec<NodeId>;
    fn element_by_id(&self, id: &str) -> Option<NodeId>;
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn has_class(&self, node: NodeId, class: &str) -> bool;
    /// Whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool;
    /// Source an image currently displays (resolved, unlike the attribute).
    fn image_source(&self, node: NodeId) -> Option<String>;
}

/// Element creation and mutation.
pub trait ElementMut {
    fn create_element(&mut self, tag: &str) -> NodeId;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&mut self, node: NodeId, name: &str);
    fn add_class(&mut self, node: NodeId, class: &str);
    fn remove_class(&mut self, node: NodeId, class: &str);
    fn set_text(&mut self, node: NodeId, text: &str);
    fn set_inner_html(&mut self, node: NodeId, html: &str);
    /// Set one inline style property.
    fn set_style(&mut self, node: NodeId, property: &str, value: &str);
    /// Replace the whole inline style declaration.
    fn set_css_text(&mut self, node: NodeId, css: &str);
    /// Insert `child` under `parent` before `reference` (append when `None`).
    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>);
    fn append_to_head(&mut self, node: NodeId);
    fn append_to_body(&mut self, node: NodeId);
    /// Detach `node` from the tree.
    fn remove(&mut self, node: NodeId);
}

/// Page location and viewport geometry.
pub trait Viewport {
    /// `location.pathname`.
    fn location_path(&self) -> String;
    fn inner_width(&self) -> f64;
    /// Vertical page offset.
    fn scroll_y(&self) -> f64;
    /// Top edge of `node` relative to the viewport.
    fn bounding_top(&self, node: NodeId) -> f64;
    fn scroll_to(&mut self, top: f64, behavior: ScrollBehavior);
    /// `(prefers-reduced-motion: reduce)`; `false` when the query is unavailable.
    fn prefers_reduced_motion(&self) -> bool;
}

/// Viewport-intersection observation.
pub trait Observation {
    /// Whether the runtime offers intersection observers at all.
    fn observation_supported(&self) -> bool;
    /// Start watching `node`. The first call for an observer creates it with
    /// `options`.
    fn observe(&mut self, observer: Observer, options: &ObserverOptions, node: NodeId);
    fn unobserve(&mut self, observer: Observer, node: NodeId);
    /// Stop watching every node for `observer`.
    fn disconnect(&mut self, observer: Observer);
}

/// Event subscription.
pub trait Events {
    fn listen(&mut self, target: EventTarget, event: EventType, route: Route) -> ListenerId;
    /// Remove a subscription. Unknown ids are ignored.
    fn unlisten(&mut self, id: ListenerId);
    /// Remove every subscription.
    fn unlisten_all(&mut self);
    /// Number of live subscriptions.
    fn listener_count(&self) -> usize;
}

/// Deferred work.
pub trait Scheduler {
    fn set_timeout(&mut self, delay: Duration, task: TimerTask) -> TimerId;
    /// Cancel a pending timeout. Unknown or fired ids are ignored.
    fn clear_timeout(&mut self, id: TimerId);
    fn request_frame(&mut self, task: FrameTask);
    /// Cancel every pending timeout and animation frame.
    fn cancel_all(&mut self);
}

/// Wall clock.
pub trait Clock {
    fn current_year(&self) -> i32;
}

/// Every capability at once; what [`crate::Site`] needs.
pub trait Document:
    ElementQuery + ElementMut + Viewport + Observation + Events + Scheduler + Clock
{
}

impl<T> Document for T where
    T: ElementQuery + ElementMut + Viewport + Observation + Events + Scheduler + Clock
{
}

/// Inject a `<style id=...>` block into the head unless one with that id
/// already exists. Returns whether a stylesheet was added.
pub fn ensure_stylesheet<D>(doc: &mut D, id: &str, css: &str) -> bool
where
    D: ElementQuery + ElementMut + ?Sized,
{
    if doc.element_by_id(id).is_some() {
        return false;
    }
    let style = doc.create_element("style");
    doc.set_attribute(style, "id", id);
    doc.set_text(style, css);
    doc.append_to_head(style);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeDocument;

    #[test]
    fn outcome_merge_prefers_prevent_default() {
        assert_eq!(
            Outcome::Ignored.merge(Outcome::PreventDefault),
            Outcome::PreventDefault
        );
        assert_eq!(Outcome::Handled.merge(Outcome::Ignored), Outcome::Handled);
        assert_eq!(Outcome::Ignored.merge(Outcome::Ignored), Outcome::Ignored);
    }

    #[test]
    fn stylesheet_is_injected_once() {
        let mut doc = FakeDocument::new();
        assert!(ensure_stylesheet(&mut doc, "extra", ".x { color: red; }"));
        assert!(!ensure_stylesheet(&mut doc, "extra", ".x { color: red; }"));
        assert_eq!(doc.query_all("style#extra").len(), 1);
        let style = doc.element_by_id("extra").unwrap();
        assert_eq!(doc.text(style), ".x { color: red; }");
    }

    #[test]
    fn event_type_names() {
        assert_eq!(EventType::Click.as_str(), "click");
        assert_eq!(EventType::KeyDown.as_str(), "keydown");
    }
}
