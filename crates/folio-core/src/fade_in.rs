#![forbid(unsafe_code)]

//! Scroll-triggered section reveal.
//!
//! Every content section except the intro starts transparent and slightly
//! offset; when enough of it enters the viewport it gains the revealed class
//! and the CSS transition plays. Sections go `pending → revealed` once and
//! never back.
//!
//! Nothing is touched under a reduced-motion preference or without
//! intersection observers, so sections stay plainly visible. Sections that
//! already carry the revealed class are left alone, and
//! [`FadeIn::teardown`] reveals whatever is still hidden.

use crate::config::FadeConfig;
use crate::dom::{
    ElementMut, ElementQuery, NodeId, Observation, Observer, ObserverOptions, Viewport,
    ensure_stylesheet,
};
use crate::one_shot::OneShotSet;

/// Stylesheet for the revealed state.
#[must_use]
pub fn reveal_css(config: &FadeConfig) -> String {
    format!(
        ".{} {{\n    opacity: 1 !important;\n    transform: translateY(0) !important;\n}}\n",
        config.revealed_class
    )
}

/// Section reveal state.
#[derive(Debug, Clone, Default)]
pub struct FadeIn {
    latches: OneShotSet,
}

impl FadeIn {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide and watch every section not revealed yet. Returns how many are
    /// watched.
    pub fn install<D>(&mut self, doc: &mut D, config: &FadeConfig) -> usize
    where
        D: ElementQuery + ElementMut + Viewport + Observation + ?Sized,
    {
        if doc.prefers_reduced_motion() {
            crate::debug!("reduced motion preferred; section reveal disabled");
            return 0;
        }
        if !doc.observation_supported() {
            crate::debug!("intersection observers unavailable; section reveal disabled");
            return 0;
        }
        let options = ObserverOptions {
            root_margin: config.root_margin.clone(),
            threshold: config.threshold,
        };
        let sections: Vec<NodeId> = doc
            .query_all(&config.section_selector)
            .into_iter()
            .filter(|&section| !doc.has_class(section, &config.revealed_class))
            .collect();
        for &section in &sections {
            doc.set_style(section, "opacity", "0");
            doc.set_style(section, "transform", &config.hidden_transform);
            doc.set_style(section, "transition", &config.transition);
            self.latches.arm(section);
            doc.observe(Observer::Sections, &options, section);
        }
        ensure_stylesheet(doc, &config.style_id, &reveal_css(config));
        crate::debug!(count = sections.len(), "section reveal installed");
        sections.len()
    }

    /// Intersection callback for `section`. Returns whether this call
    /// revealed it.
    pub fn on_intersect<D>(&mut self, doc: &mut D, config: &FadeConfig, section: NodeId) -> bool
    where
        D: ElementMut + Observation + ?Sized,
    {
        if !self.latches.fire(section) {
            return false;
        }
        doc.add_class(section, &config.revealed_class);
        doc.unobserve(Observer::Sections, section);
        true
    }

    /// Reveal every section still waiting and stop watching it, so nothing
    /// stays hidden once the observer is gone.
    pub fn teardown<D>(&mut self, doc: &mut D, config: &FadeConfig)
    where
        D: ElementMut + Observation + ?Sized,
    {
        let waiting: Vec<NodeId> = self.latches.pending_nodes().collect();
        for section in waiting {
            self.on_intersect(doc, config, section);
        }
    }

    #[must_use]
    pub fn is_revealed(&self, section: NodeId) -> bool {
        self.latches.is_fired(section)
    }

    /// Sections still hidden.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.latches.pending()
    }
}
