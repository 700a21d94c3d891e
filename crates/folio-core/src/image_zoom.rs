#![forbid(unsafe_code)]

//! Click-to-zoom lightbox.
//!
//! Clicking a zoomable image opens a full-viewport dimmed overlay holding an
//! enlarged copy. Each overlay runs through
//!
//! ```text
//! Opening ──frame──▶ Open ──backdrop click / Escape──▶ Closing ──timeout──▶ removed
//!    └──────────────backdrop click / Escape─────────────┘
//! ```
//!
//! An overlay owns exactly two subscriptions: a click on its backdrop and a
//! document `keydown`. Both are dropped the moment it starts closing, by
//! either path, so no handler outlives the overlay that registered it.
//! [`ImageZoom::teardown`] skips the fade and detaches everything at once.

use core::time::Duration;
use std::collections::BTreeMap;

use crate::config::ZoomConfig;
use crate::dom::{
    ElementMut, ElementQuery, EventTarget, EventType, Events, FrameTask, ListenerId, NodeId,
    Outcome, OverlayId, Route, Scheduler, TimerId, TimerTask,
};

const OVERLAY_CSS: &str = "position: fixed; top: 0; left: 0; width: 100%; height: 100%; \
background: rgba(0, 0, 0, 0.9); display: flex; justify-content: center; align-items: center; \
z-index: 10000; cursor: pointer; opacity: 0; transition: opacity 0.3s ease;";

const ZOOMED_CSS: &str = "max-width: 90%; max-height: 90%; border-radius: 8px; \
box-shadow: 0 8px 32px rgba(255, 255, 255, 0.1);";

/// Lifecycle of one overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Attached, waiting for the next frame to fade in.
    Opening,
    Open,
    /// Fading out; removed when its timer fires.
    Closing,
}

#[derive(Debug, Clone)]
struct Overlay {
    node: NodeId,
    phase: Phase,
    backdrop: Option<ListenerId>,
    escape: Option<ListenerId>,
    removal: Option<TimerId>,
}

/// Zoom overlay controller.
#[derive(Debug, Clone, Default)]
pub struct ImageZoom {
    next_id: u32,
    overlays: BTreeMap<OverlayId, Overlay>,
}

impl ImageZoom {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every zoomable image clickable. Returns how many were wired.
    pub fn install<D>(&mut self, doc: &mut D, config: &ZoomConfig) -> usize
    where
        D: ElementQuery + ElementMut + Events + ?Sized,
    {
        let images = doc.query_all(&config.image_selector);
        for &image in &images {
            doc.set_style(image, "cursor", "pointer");
            doc.listen(EventTarget::Node(image), EventType::Click, Route::ZoomOpen);
        }
        crate::debug!(count = images.len(), "image zoom installed");
        images.len()
    }

    /// Open an overlay showing `image`.
    pub fn open<D>(&mut self, doc: &mut D, config: &ZoomConfig, image: NodeId) -> OverlayId
    where
        D: ElementQuery + ElementMut + Events + Scheduler + ?Sized,
    {
        let id = OverlayId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        let overlay = doc.create_element("div");
        doc.set_attribute(overlay, "class", &config.overlay_class);
        doc.set_css_text(overlay, OVERLAY_CSS);

        let zoomed = doc.create_element("img");
        let source = doc
            .image_source(image)
            .or_else(|| doc.attribute(image, "src"))
            .unwrap_or_default();
        doc.set_attribute(zoomed, "src", &source);
        let alt = doc
            .attribute(image, "alt")
            .filter(|alt| !alt.is_empty())
            .unwrap_or_else(|| config.default_alt.clone());
        doc.set_attribute(zoomed, "alt", &alt);
        doc.set_css_text(zoomed, ZOOMED_CSS);

        doc.insert_before(overlay, zoomed, None);
        doc.append_to_body(overlay);
        doc.request_frame(FrameTask::RevealOverlay(id));

        let backdrop = doc.listen(
            EventTarget::Node(overlay),
            EventType::Click,
            Route::ZoomBackdrop(id),
        );
        let escape = doc.listen(EventTarget::Document, EventType::KeyDown, Route::ZoomEscape(id));
        self.overlays.insert(
            id,
            Overlay {
                node: overlay,
                phase: Phase::Opening,
                backdrop: Some(backdrop),
                escape: Some(escape),
                removal: None,
            },
        );
        crate::debug!(?id, %source, "zoom overlay opened");
        id
    }

    /// Frame callback: fade the overlay in.
    pub fn reveal<D>(&mut self, doc: &mut D, id: OverlayId)
    where
        D: ElementMut + ?Sized,
    {
        let Some(overlay) = self.overlays.get_mut(&id) else {
            return;
        };
        if overlay.phase == Phase::Opening {
            doc.set_style(overlay.node, "opacity", "1");
            overlay.phase = Phase::Open;
        }
    }

    /// Key press while overlay `id` is up; only Escape closes it.
    pub fn on_key<D>(&mut self, doc: &mut D, config: &ZoomConfig, id: OverlayId, key: &str) -> Outcome
    where
        D: ElementMut + Events + Scheduler + ?Sized,
    {
        if key != "Escape" {
            return Outcome::Ignored;
        }
        self.close(doc, config, id)
    }

    /// Start fading overlay `id` out and release its subscriptions.
    pub fn close<D>(&mut self, doc: &mut D, config: &ZoomConfig, id: OverlayId) -> Outcome
    where
        D: ElementMut + Events + Scheduler + ?Sized,
    {
        let Some(overlay) = self.overlays.get_mut(&id) else {
            return Outcome::Ignored;
        };
        if overlay.phase == Phase::Closing {
            return Outcome::Ignored;
        }
        overlay.phase = Phase::Closing;
        doc.set_style(overlay.node, "opacity", "0");
        for listener in [overlay.backdrop.take(), overlay.escape.take()]
            .into_iter()
            .flatten()
        {
            doc.unlisten(listener);
        }
        overlay.removal = Some(doc.set_timeout(
            Duration::from_millis(config.fade_out_ms),
            TimerTask::RemoveOverlay(id),
        ));
        crate::trace!(?id, "zoom overlay closing");
        Outcome::Handled
    }

    /// Timer callback: detach a faded-out overlay.
    pub fn finish_close<D>(&mut self, doc: &mut D, id: OverlayId)
    where
        D: ElementMut + ?Sized,
    {
        let Some(overlay) = self.overlays.remove(&id) else {
            return;
        };
        doc.remove(overlay.node);
    }

    /// Detach every overlay immediately, whatever its phase, releasing its
    /// subscriptions and any pending removal timer.
    pub fn teardown<D>(&mut self, doc: &mut D)
    where
        D: ElementMut + Events + Scheduler + ?Sized,
    {
        for mut overlay in std::mem::take(&mut self.overlays).into_values() {
            for listener in [overlay.backdrop.take(), overlay.escape.take()]
                .into_iter()
                .flatten()
            {
                doc.unlisten(listener);
            }
            if let Some(timer) = overlay.removal.take() {
                doc.clear_timeout(timer);
            }
            doc.remove(overlay.node);
        }
    }

    #[must_use]
    pub fn phase(&self, id: OverlayId) -> Option<Phase> {
        self.overlays.get(&id).map(|o| o.phase)
    }

    #[must_use]
    pub fn overlay_node(&self, id: OverlayId) -> Option<NodeId> {
        self.overlays.get(&id).map(|o| o.node)
    }

    /// Overlays attached to the page, closing ones included.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.overlays.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeDocument;
    use pretty_assertions::assert_eq;

    fn page() -> (FakeDocument, NodeId, NodeId) {
        let mut doc = FakeDocument::new();
        let body = doc.body();
        doc.append(body, "img", &[("class", "brand-emblem"), ("src", "emblem.svg")]);
        let photo = doc.append(body, "img", &[("src", "photos/canyon.jpg"), ("alt", "Canyon")]);
        let bare = doc.append(body, "img", &[("src", "photos/river.jpg")]);
        (doc, photo, bare)
    }

    fn escape_listeners(doc: &FakeDocument) -> usize {
        doc.listeners_on(EventTarget::Document, EventType::KeyDown)
            .into_iter()
            .filter(|(_, route)| matches!(route, Route::ZoomEscape(_)))
            .count()
    }

    #[test]
    fn emblem_is_not_zoomable() {
        let (mut doc, photo, bare) = page();
        assert_eq!(ImageZoom::new().install(&mut doc, &ZoomConfig::default()), 2);
        assert_eq!(doc.style(photo, "cursor"), Some("pointer"));
        assert_eq!(doc.style(bare, "cursor"), Some("pointer"));
        let emblem = doc.query(".brand-emblem").unwrap();
        assert_eq!(doc.style(emblem, "cursor"), None);
    }

    #[test]
    fn open_builds_overlay_with_copy() {
        let (mut doc, photo, _) = page();
        let config = ZoomConfig::default();
        let mut zoom = ImageZoom::new();
        let id = zoom.open(&mut doc, &config, photo);

        let overlay = zoom.overlay_node(id).unwrap();
        assert_eq!(doc.parent(overlay), Some(doc.body()));
        assert!(doc.has_class(overlay, "image-overlay"));
        assert_eq!(doc.style(overlay, "position"), Some("fixed"));
        assert_eq!(doc.style(overlay, "opacity"), Some("0"));
        assert_eq!(doc.style(overlay, "z-index"), Some("10000"));

        let zoomed = doc.children(overlay)[0];
        assert_eq!(doc.attribute(zoomed, "src").as_deref(), Some("photos/canyon.jpg"));
        assert_eq!(doc.attribute(zoomed, "alt").as_deref(), Some("Canyon"));
        assert_eq!(doc.style(zoomed, "max-width"), Some("90%"));
        assert_eq!(zoom.phase(id), Some(Phase::Opening));
    }

    #[test]
    fn missing_alt_gets_default() {
        let (mut doc, _, bare) = page();
        let mut zoom = ImageZoom::new();
        let id = zoom.open(&mut doc, &ZoomConfig::default(), bare);
        let zoomed = doc.children(zoom.overlay_node(id).unwrap())[0];
        assert_eq!(doc.attribute(zoomed, "alt").as_deref(), Some("Zoomed image"));
    }

    #[test]
    fn reveal_fades_in_on_frame() {
        let (mut doc, photo, _) = page();
        let mut zoom = ImageZoom::new();
        let id = zoom.open(&mut doc, &ZoomConfig::default(), photo);
        assert_eq!(doc.take_frames(), vec![FrameTask::RevealOverlay(id)]);
        zoom.reveal(&mut doc, id);
        assert_eq!(doc.style(zoom.overlay_node(id).unwrap(), "opacity"), Some("1"));
        assert_eq!(zoom.phase(id), Some(Phase::Open));
    }

    #[test]
    fn escape_closes_and_releases_listeners() {
        let (mut doc, photo, _) = page();
        let config = ZoomConfig::default();
        let mut zoom = ImageZoom::new();
        let before = doc.listener_count();
        let id = zoom.open(&mut doc, &config, photo);
        assert_eq!(escape_listeners(&doc), 1);
        assert_eq!(doc.listener_count(), before + 2);

        assert_eq!(zoom.on_key(&mut doc, &config, id, "Enter"), Outcome::Ignored);
        assert_eq!(escape_listeners(&doc), 1);

        assert_eq!(zoom.on_key(&mut doc, &config, id, "Escape"), Outcome::Handled);
        assert_eq!(escape_listeners(&doc), 0);
        assert_eq!(doc.listener_count(), before);
        assert_eq!(zoom.phase(id), Some(Phase::Closing));
        assert_eq!(doc.pending_timers(), 1);
    }

    #[test]
    fn backdrop_click_releases_escape_listener_too() {
        let (mut doc, photo, _) = page();
        let config = ZoomConfig::default();
        let mut zoom = ImageZoom::new();
        let id = zoom.open(&mut doc, &config, photo);
        assert_eq!(zoom.close(&mut doc, &config, id), Outcome::Handled);
        assert_eq!(escape_listeners(&doc), 0);
        assert_eq!(doc.route_count(Route::ZoomBackdrop(id)), 0);
        // A second close while fading is a no-op.
        assert_eq!(zoom.close(&mut doc, &config, id), Outcome::Ignored);
        assert_eq!(doc.pending_timers(), 1);
    }

    #[test]
    fn finish_close_detaches_overlay() {
        let (mut doc, photo, _) = page();
        let config = ZoomConfig::default();
        let mut zoom = ImageZoom::new();
        let id = zoom.open(&mut doc, &config, photo);
        let overlay = zoom.overlay_node(id).unwrap();
        let _ = zoom.close(&mut doc, &config, id);
        assert_eq!(doc.style(overlay, "opacity"), Some("0"));
        zoom.finish_close(&mut doc, id);
        assert!(!doc.is_attached(overlay));
        assert_eq!(zoom.open_count(), 0);
    }

    #[test]
    fn late_reveal_does_not_reopen_closing_overlay() {
        let (mut doc, photo, _) = page();
        let config = ZoomConfig::default();
        let mut zoom = ImageZoom::new();
        let id = zoom.open(&mut doc, &config, photo);
        let _ = zoom.close(&mut doc, &config, id);
        zoom.reveal(&mut doc, id);
        assert_eq!(doc.style(zoom.overlay_node(id).unwrap(), "opacity"), Some("0"));
        assert_eq!(zoom.phase(id), Some(Phase::Closing));
    }

    #[test]
    fn teardown_detaches_overlays_in_every_phase() {
        let (mut doc, photo, bare) = page();
        let config = ZoomConfig::default();
        let mut zoom = ImageZoom::new();
        let before = doc.listener_count();
        let opening = zoom.open(&mut doc, &config, photo);
        let closing = zoom.open(&mut doc, &config, bare);
        let _ = zoom.close(&mut doc, &config, closing);
        let nodes = [
            zoom.overlay_node(opening).unwrap(),
            zoom.overlay_node(closing).unwrap(),
        ];

        zoom.teardown(&mut doc);
        assert_eq!(zoom.open_count(), 0);
        assert!(nodes.iter().all(|&node| !doc.is_attached(node)));
        assert_eq!(doc.listener_count(), before);
        assert_eq!(doc.pending_timers(), 0);

        // Ids keep counting, so a stale frame cannot reveal a newer overlay.
        let next = zoom.open(&mut doc, &config, photo);
        assert_ne!(next, opening);
        assert_ne!(next, closing);
    }
}
