//! Property-based invariant tests for the site runtime.
//!
//! 1. Navigation marks exactly the links that resolve to the current page.
//! 2. Menu `aria-expanded` agrees with the list's open class after every
//!    transition, whatever the sequence.
//! 3. A burst of resize events runs the deferred action exactly once.
//! 4. Section reveal is monotonic: revealed sections never revert.
//! 5. Zoom overlays never leak key listeners.

use core::time::Duration;

use folio_core::SiteConfig;
use folio_core::config::NavConfig;
use folio_core::debounce::Debouncer;
use folio_core::dom::{
    ElementQuery, EventTarget, EventType, Events, NodeId, Observer, Route, TimerTask,
};
use folio_core::fake::{FakeDocument, Harness};
use folio_core::mobile_menu::MenuState;
use folio_core::nav;
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

const HREFS: &[&str] = &[
    "index.html",
    "about.html",
    "ABOUT.html",
    "contact.html",
    "blog/post.html",
    "./",
    "/",
    "",
    "#top",
];

const PATHS: &[&str] = &[
    "/",
    "/index.html",
    "/about.html",
    "/contact.html",
    "/my-website/",
    "/blog/post.html",
];

fn last_segment(s: &str) -> String {
    s.rsplit('/').next().unwrap_or("").to_lowercase()
}

/// Reference model of which page a path or href names.
fn page_of(path: &str) -> String {
    let segment = last_segment(path);
    if segment.is_empty() || segment == "my-website" {
        "index.html".to_owned()
    } else {
        segment
    }
}

fn nav_page(path: &str, hrefs: &[&str]) -> (FakeDocument, Vec<NodeId>) {
    let mut doc = FakeDocument::new().with_path(path);
    let body = doc.body();
    let list = doc.append(body, "ul", &[("class", "nav-links")]);
    let links = hrefs
        .iter()
        .map(|href| doc.append(list, "a", &[("href", *href)]))
        .collect();
    (doc, links)
}

/// Page with a nav bar, a menu of `links` entries, a zoomable photo and a
/// few sections.
fn full_page(width: f64, links: usize, sections: usize) -> (Harness, Vec<NodeId>, Vec<NodeId>, NodeId) {
    let mut doc = FakeDocument::new().with_width(width);
    let body = doc.body();
    let bar = doc.append(body, "nav", &[("class", "top-nav")]);
    let list = doc.append(bar, "ul", &[("class", "nav-links")]);
    let link_nodes = (0..links)
        .map(|i| {
            let href = format!("page{i}.html");
            doc.append(list, "a", &[("href", href.as_str())])
        })
        .collect();
    let section_nodes = (0..sections)
        .map(|_| doc.append(body, "section", &[]))
        .collect();
    let photo = doc.append(body, "img", &[("src", "photo.jpg")]);
    let mut harness = Harness::new(SiteConfig::default(), doc);
    harness.start();
    (harness, link_nodes, section_nodes, photo)
}

fn menu_in_sync(harness: &Harness) -> bool {
    let menu = harness.site.menu();
    let (Some(button), Some(list)) = (menu.button(), menu.list()) else {
        return false;
    };
    let expanded = harness.doc.attribute(button, "aria-expanded");
    (expanded.as_deref() == Some("true")) == harness.doc.has_class(list, "active")
}

fn escape_listeners(doc: &FakeDocument) -> usize {
    doc.listeners_on(EventTarget::Document, EventType::KeyDown)
        .into_iter()
        .filter(|(_, route)| matches!(route, Route::ZoomEscape(_)))
        .count()
}

fn backdrop_listeners(doc: &FakeDocument) -> usize {
    doc.query_all(".image-overlay")
        .into_iter()
        .map(|overlay| {
            doc.listeners_on(EventTarget::Node(overlay), EventType::Click)
                .len()
        })
        .sum()
}

fn drain(doc: &mut FakeDocument, debouncer: &mut Debouncer, until: Duration, fired: &mut Vec<Duration>) {
    while let Some((id, _)) = doc.pop_due_timer(until) {
        if debouncer.fire(id) {
            fired.push(doc.now());
        }
    }
    doc.set_now(until);
}

#[derive(Debug, Clone)]
enum MenuAction {
    Toggle,
    Link(usize),
    Outside,
    Brand,
}

fn menu_action() -> impl Strategy<Value = MenuAction> {
    prop_oneof![
        Just(MenuAction::Toggle),
        (0usize..4).prop_map(MenuAction::Link),
        Just(MenuAction::Outside),
        Just(MenuAction::Brand),
    ]
}

#[derive(Debug, Clone)]
enum ZoomAction {
    Open,
    Escape,
    OtherKey,
    ClickBackdrop,
    Frame,
    Wait(u64),
}

fn zoom_action() -> impl Strategy<Value = ZoomAction> {
    prop_oneof![
        Just(ZoomAction::Open),
        Just(ZoomAction::Escape),
        Just(ZoomAction::OtherKey),
        Just(ZoomAction::ClickBackdrop),
        Just(ZoomAction::Frame),
        (0u64..500).prop_map(ZoomAction::Wait),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Navigation marks exactly the matching links
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn nav_marks_exactly_matching_links(
        path in prop::sample::select(PATHS),
        hrefs in prop::collection::vec(prop::sample::select(HREFS), 0..8),
    ) {
        let (mut doc, links) = nav_page(path, &hrefs);
        let marked = nav::highlight(&mut doc, &NavConfig::default());

        let current = page_of(path);
        let mut expected = 0;
        for (link, href) in links.iter().zip(&hrefs) {
            let target = last_segment(href);
            let should = target == current || (target.is_empty() && current == "index.html");
            if should {
                expected += 1;
            }
            prop_assert_eq!(doc.has_class(*link, "active"), should, "href={:?} path={:?}", href, path);
            prop_assert_eq!(
                doc.attribute(*link, "aria-current").is_some(),
                should,
                "aria-current disagrees for href={:?}", href
            );
        }
        prop_assert_eq!(marked, expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Menu attribute and class stay in sync
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn menu_attribute_tracks_class(actions in prop::collection::vec(menu_action(), 1..40)) {
        let (mut harness, links, sections, _) = full_page(500.0, 4, 1);
        let button = harness.site.menu().button();
        prop_assert!(button.is_some());
        let Some(button) = button else { return Ok(()) };
        let brand = harness.doc.query(".top-nav");
        let mut model = MenuState::Closed;

        for action in actions {
            match action {
                MenuAction::Toggle => {
                    let _ = harness.click(button);
                    model = model.toggled();
                }
                MenuAction::Link(i) => {
                    let _ = harness.click(links[i]);
                    model = MenuState::Closed;
                }
                MenuAction::Outside => {
                    let _ = harness.click(sections[0]);
                    model = MenuState::Closed;
                }
                MenuAction::Brand => {
                    if let Some(bar) = brand {
                        let _ = harness.click(bar);
                    }
                }
            }
            prop_assert_eq!(harness.site.menu().state(), Some(model));
            prop_assert!(menu_in_sync(&harness));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Debounced bursts execute once
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn burst_fires_exactly_once(gaps in prop::collection::vec(0u64..250, 1..30)) {
        let delay = Duration::from_millis(250);
        let mut doc = FakeDocument::new();
        let mut debouncer = Debouncer::new(delay, TimerTask::ResizeSettled);
        let mut fired = Vec::new();
        let mut now = Duration::ZERO;

        for gap in &gaps {
            debouncer.trigger(&mut doc);
            now += Duration::from_millis(*gap);
            drain(&mut doc, &mut debouncer, now, &mut fired);
        }
        let last_trigger = now - Duration::from_millis(*gaps.last().unwrap_or(&0));
        drain(&mut doc, &mut debouncer, now + Duration::from_secs(10), &mut fired);

        prop_assert_eq!(fired, vec![last_trigger + delay]);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Revealed sections stay revealed
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn reveal_is_monotonic(
        hits in prop::collection::vec((0usize..5, any::<bool>()), 0..40),
    ) {
        let (mut harness, _, sections, _) = full_page(1280.0, 0, 5);
        let mut revealed = vec![false; sections.len()];

        for (index, scroll) in hits {
            if scroll {
                harness.scroll(index as f64 * 300.0);
            }
            let section = sections[index];
            let delivered = harness.intersect(Observer::Sections, section);
            prop_assert_eq!(delivered, !revealed[index]);
            revealed[index] = true;

            for (i, &node) in sections.iter().enumerate() {
                prop_assert_eq!(harness.doc.has_class(node, "fade-in"), revealed[i]);
                prop_assert_eq!(harness.site.fade_in().is_revealed(node), revealed[i]);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Zoom overlays release their listeners
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn overlay_listeners_balance(actions in prop::collection::vec(zoom_action(), 1..40)) {
        let (mut harness, _, _, photo) = full_page(1280.0, 0, 1);
        let baseline = harness.doc.listener_count();

        for action in actions {
            match action {
                ZoomAction::Open => {
                    let before = escape_listeners(&harness.doc);
                    let _ = harness.click(photo);
                    prop_assert_eq!(escape_listeners(&harness.doc), before + 1);
                }
                ZoomAction::Escape => {
                    let _ = harness.key_down("Escape");
                    prop_assert_eq!(escape_listeners(&harness.doc), 0);
                }
                ZoomAction::OtherKey => {
                    let before = escape_listeners(&harness.doc);
                    let _ = harness.key_down("Enter");
                    prop_assert_eq!(escape_listeners(&harness.doc), before);
                }
                ZoomAction::ClickBackdrop => {
                    let live = harness
                        .doc
                        .query_all(".image-overlay")
                        .into_iter()
                        .find(|&o| !harness.doc.listeners_on(EventTarget::Node(o), EventType::Click).is_empty());
                    if let Some(overlay) = live {
                        let before = escape_listeners(&harness.doc);
                        let _ = harness.click(overlay);
                        prop_assert_eq!(escape_listeners(&harness.doc), before - 1);
                    }
                }
                ZoomAction::Frame => {
                    harness.flush_frames();
                }
                ZoomAction::Wait(ms) => harness.advance(Duration::from_millis(ms)),
            }
            prop_assert_eq!(escape_listeners(&harness.doc), backdrop_listeners(&harness.doc));
        }

        let _ = harness.key_down("Escape");
        harness.advance(Duration::from_secs(1));
        prop_assert_eq!(escape_listeners(&harness.doc), 0);
        prop_assert_eq!(harness.doc.listener_count(), baseline);
        prop_assert_eq!(harness.site.zoom().open_count(), 0);
        prop_assert!(harness.doc.query(".image-overlay").is_none());
    }
}
