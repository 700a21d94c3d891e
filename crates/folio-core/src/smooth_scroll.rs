#![forbid(unsafe_code)]

//! Smooth scrolling for in-page anchors.
//!
//! Under a reduced-motion preference nothing is installed and anchors keep
//! the browser's native jump.

use crate::config::ScrollConfig;
use crate::dom::{
    ElementQuery, EventTarget, EventType, Events, NodeId, Outcome, Route, ScrollBehavior,
    Viewport,
};

/// Element id an in-page `href` points at; `None` for `#` and non-fragment
/// links.
#[must_use]
pub fn fragment_target(href: &str) -> Option<&str> {
    href.strip_prefix('#').filter(|id| !id.is_empty())
}

/// Subscribe every in-page anchor. Returns how many were subscribed.
pub fn install<D>(doc: &mut D, config: &ScrollConfig) -> usize
where
    D: ElementQuery + Viewport + Events + ?Sized,
{
    if doc.prefers_reduced_motion() {
        crate::debug!("reduced motion preferred; smooth scrolling disabled");
        return 0;
    }
    let anchors = doc.query_all(&config.anchor_selector);
    for &anchor in &anchors {
        doc.listen(EventTarget::Node(anchor), EventType::Click, Route::AnchorClick);
    }
    crate::debug!(count = anchors.len(), "smooth scrolling installed");
    anchors.len()
}

/// Handle activation of `anchor`.
///
/// When the fragment names an existing element the viewport is scrolled so
/// the element's top sits `header_offset` below the viewport top, and the
/// default jump is cancelled. Otherwise the event is left alone.
pub fn on_anchor_click<D>(doc: &mut D, config: &ScrollConfig, anchor: NodeId) -> Outcome
where
    D: ElementQuery + Viewport + ?Sized,
{
    let Some(href) = doc.attribute(anchor, "href") else {
        return Outcome::Ignored;
    };
    let Some(target) = fragment_target(&href).and_then(|id| doc.element_by_id(id)) else {
        return Outcome::Ignored;
    };
    let top = doc.bounding_top(target) + doc.scroll_y() - config.header_offset;
    crate::trace!(%href, top, "smooth scroll");
    doc.scroll_to(top, ScrollBehavior::Smooth);
    Outcome::PreventDefault
}
