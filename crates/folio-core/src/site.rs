#![forbid(unsafe_code)]

//! Site runtime: one startup pass, then event dispatch.
//!
//! [`Site::start`] wires every component in a fixed order. Afterwards the
//! host forwards four kinds of callbacks, each routed to the component that
//! registered for it:
//!
//! | Entry point | Source |
//! |-------------|--------|
//! | [`Site::handle_event`] | DOM event subscriptions ([`Route`]) |
//! | [`Site::handle_timer`] | timeouts ([`TimerTask`]) |
//! | [`Site::handle_frame`] | animation frames ([`FrameTask`]) |
//! | [`Site::handle_intersection`] | intersection observers ([`Observer`]) |
//!
//! Components never call each other; the runtime is the only place that
//! knows about all of them.
//!
//! [`Site::stop`] undoes what the runtime left on the page (open overlays,
//! the injected menu button, sections still hidden) and releases every
//! subscription, timer, frame and observer. The page is then as good as
//! freshly loaded, and a new [`Site`] can start on it.

use crate::config::SiteConfig;
use crate::debounce::Debouncer;
use crate::dom::{
    Document, DomEvent, EventTarget, EventType, FrameTask, NodeId, Observer, Outcome, Route,
    TimerId, TimerTask,
};
use crate::fade_in::FadeIn;
use crate::image_zoom::ImageZoom;
use crate::lazy_images::LazyImages;
use crate::mobile_menu::MobileMenu;
use crate::{footer, nav, smooth_scroll};

/// What the startup pass wired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Startup {
    pub years_stamped: usize,
    pub nav_links_marked: usize,
    pub anchors: usize,
    pub lazy_images: usize,
    pub sections: usize,
    pub menu_built: bool,
    pub zoomable_images: usize,
}

/// Runtime state for one page.
#[derive(Debug, Clone)]
pub struct Site {
    config: SiteConfig,
    started: bool,
    lazy: LazyImages,
    fade: FadeIn,
    menu: MobileMenu,
    zoom: ImageZoom,
    resize: Debouncer,
    scroll: Debouncer,
    settled_scroll_y: Option<f64>,
}

impl Site {
    #[must_use]
    pub fn new(config: SiteConfig) -> Self {
        let resize = Debouncer::new(config.resize_delay(), TimerTask::ResizeSettled);
        let scroll = Debouncer::new(config.scroll_settle_delay(), TimerTask::ScrollSettled);
        Self {
            config,
            started: false,
            lazy: LazyImages::new(),
            fade: FadeIn::new(),
            menu: MobileMenu::new(),
            zoom: ImageZoom::new(),
            resize,
            scroll,
            settled_scroll_y: None,
        }
    }

    /// Run every initializer once, in order: footer, navigation, smooth
    /// scroll, lazy images, section reveal, mobile menu, image zoom. Then
    /// subscribe the window's resize and scroll streams.
    ///
    /// Returns `None` when the site was already started.
    pub fn start<D: Document + ?Sized>(&mut self, doc: &mut D) -> Option<Startup> {
        if self.started {
            crate::warn!("site already started; ignoring");
            return None;
        }
        self.started = true;

        let config = &self.config;
        let startup = Startup {
            years_stamped: footer::stamp_year(doc, &config.footer),
            nav_links_marked: nav::highlight(doc, &config.nav),
            anchors: smooth_scroll::install(doc, &config.scroll),
            lazy_images: self.lazy.install(doc, &config.lazy),
            sections: self.fade.install(doc, &config.fade),
            menu_built: self.menu.install(doc, &config.menu),
            zoomable_images: self.zoom.install(doc, &config.zoom),
        };
        doc.listen(EventTarget::Window, EventType::Resize, Route::Resize);
        doc.listen(EventTarget::Window, EventType::Scroll, Route::Scroll);

        crate::info!(?startup, "site started");
        Some(startup)
    }

    /// Tear the runtime down. A no-op unless started; afterwards the site
    /// may be started again.
    pub fn stop<D: Document + ?Sized>(&mut self, doc: &mut D) {
        if !self.started {
            return;
        }
        let config = &self.config;
        self.zoom.teardown(doc);
        self.menu.teardown(doc, &config.menu);
        self.fade.teardown(doc, &config.fade);
        self.lazy.teardown(doc);
        self.resize.cancel(doc);
        self.scroll.cancel(doc);
        doc.disconnect(Observer::LazyImages);
        doc.disconnect(Observer::Sections);
        doc.unlisten_all();
        doc.cancel_all();

        self.started = false;
        self.settled_scroll_y = None;
        crate::info!("site stopped");
    }

    /// Deliver a DOM event.
    pub fn handle_event<D: Document + ?Sized>(&mut self, doc: &mut D, event: &DomEvent) -> Outcome {
        let config = &self.config;
        match event.route {
            Route::AnchorClick => match event.current {
                Some(anchor) => smooth_scroll::on_anchor_click(doc, &config.scroll, anchor),
                None => Outcome::Ignored,
            },
            Route::MenuToggle => self.menu.toggle(doc, &config.menu),
            Route::MenuLink => self.menu.on_link(doc, &config.menu),
            Route::MenuOutside => self.menu.on_document_click(doc, &config.menu, event.target),
            Route::ZoomOpen => match event.current {
                Some(image) => {
                    let _ = self.zoom.open(doc, &config.zoom, image);
                    Outcome::Handled
                }
                None => Outcome::Ignored,
            },
            Route::ZoomBackdrop(id) => self.zoom.close(doc, &config.zoom, id),
            Route::ZoomEscape(id) => match event.key.as_deref() {
                Some(key) => self.zoom.on_key(doc, &config.zoom, id, key),
                None => Outcome::Ignored,
            },
            Route::ImageLoaded => match event.current {
                Some(image) => self.lazy.on_loaded(doc, image),
                None => Outcome::Ignored,
            },
            Route::Resize => {
                self.resize.trigger(doc);
                Outcome::Handled
            }
            Route::Scroll => {
                self.scroll.trigger(doc);
                Outcome::Handled
            }
        }
    }

    /// Deliver a fired timeout.
    pub fn handle_timer<D: Document + ?Sized>(&mut self, doc: &mut D, id: TimerId, task: TimerTask) {
        match task {
            TimerTask::ResizeSettled => {
                if self.resize.fire(id) && self.menu.install(doc, &self.config.menu) {
                    crate::debug!(width = doc.inner_width(), "mobile menu built after resize");
                }
            }
            TimerTask::ScrollSettled => {
                if self.scroll.fire(id) {
                    let y = doc.scroll_y();
                    self.settled_scroll_y = Some(y);
                    crate::debug!(y, "scroll settled");
                }
            }
            TimerTask::RemoveOverlay(overlay) => self.zoom.finish_close(doc, overlay),
        }
    }

    /// Deliver an animation frame.
    pub fn handle_frame<D: Document + ?Sized>(&mut self, doc: &mut D, task: FrameTask) {
        match task {
            FrameTask::RevealOverlay(overlay) => self.zoom.reveal(doc, overlay),
        }
    }

    /// Deliver an intersection for `node`.
    pub fn handle_intersection<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        observer: Observer,
        node: NodeId,
    ) {
        match observer {
            Observer::LazyImages => {
                self.lazy.on_intersect(doc, &self.config.lazy, node);
            }
            Observer::Sections => {
                self.fade.on_intersect(doc, &self.config.fade, node);
            }
        }
    }

    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    #[must_use]
    pub fn lazy_images(&self) -> &LazyImages {
        &self.lazy
    }

    #[must_use]
    pub fn fade_in(&self) -> &FadeIn {
        &self.fade
    }

    #[must_use]
    pub fn menu(&self) -> &MobileMenu {
        &self.menu
    }

    #[must_use]
    pub fn zoom(&self) -> &ImageZoom {
        &self.zoom
    }

    /// Vertical offset recorded when scrolling last settled.
    #[must_use]
    pub fn settled_scroll_y(&self) -> Option<f64> {
        self.settled_scroll_y
    }
}
