#![forbid(unsafe_code)]

//! Deferred image loading.
//!
//! Images carrying the deferred-source attribute are watched by an
//! intersection observer with a margin ahead of the viewport. On the first
//! intersection the real source is swapped in, the image fades in once it has
//! loaded, and the observer lets go of it.
//!
//! Each image moves `placeholder → loaded` exactly once; a repeated
//! intersection callback is rejected by its [`OneShotSet`] latch. Without
//! intersection observers the component installs nothing and images keep
//! whatever the markup gives them.

use std::collections::BTreeMap;

use crate::config::LazyConfig;
use crate::dom::{
    ElementMut, ElementQuery, EventTarget, EventType, Events, ListenerId, NodeId, Observation,
    Observer, ObserverOptions, Outcome, Route,
};
use crate::one_shot::OneShotSet;

/// Lazy loader state: one latch per watched image plus the `load`
/// subscriptions still waiting.
#[derive(Debug, Clone, Default)]
pub struct LazyImages {
    latches: OneShotSet,
    awaiting_load: BTreeMap<NodeId, ListenerId>,
}

impl LazyImages {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start watching every deferred image. Returns how many are watched.
    pub fn install<D>(&mut self, doc: &mut D, config: &LazyConfig) -> usize
    where
        D: ElementQuery + Observation + ?Sized,
    {
        if !doc.observation_supported() {
            crate::debug!("intersection observers unavailable; lazy loading disabled");
            return 0;
        }
        let options = ObserverOptions {
            root_margin: config.root_margin.clone(),
            threshold: 0.0,
        };
        let images = doc.query_all(&config.image_selector);
        for &image in &images {
            self.latches.arm(image);
            doc.observe(Observer::LazyImages, &options, image);
        }
        crate::debug!(count = images.len(), "lazy images watched");
        images.len()
    }

    /// Intersection callback for `image`. Returns whether this call loaded it.
    pub fn on_intersect<D>(&mut self, doc: &mut D, config: &LazyConfig, image: NodeId) -> bool
    where
        D: ElementQuery + ElementMut + Observation + Events + ?Sized,
    {
        if !self.latches.fire(image) {
            return false;
        }
        doc.unobserve(Observer::LazyImages, image);

        doc.set_style(image, "opacity", "0");
        doc.set_style(image, "transition", &config.transition);
        let listener = doc.listen(EventTarget::Node(image), EventType::Load, Route::ImageLoaded);
        self.awaiting_load.insert(image, listener);

        if let Some(source) = doc.attribute(image, &config.source_attribute) {
            doc.set_attribute(image, "src", &source);
            doc.remove_attribute(image, &config.source_attribute);
        }
        crate::trace!(%image, "lazy image swapped in");
        true
    }

    /// `load` callback: fade the image in and drop the subscription.
    pub fn on_loaded<D>(&mut self, doc: &mut D, image: NodeId) -> Outcome
    where
        D: ElementMut + Events + ?Sized,
    {
        let Some(listener) = self.awaiting_load.remove(&image) else {
            return Outcome::Ignored;
        };
        doc.unlisten(listener);
        doc.set_style(image, "opacity", "1");
        Outcome::Handled
    }

    /// Drop the `load` subscriptions still waiting and show those images
    /// right away. Images never intersected keep their deferred source.
    pub fn teardown<D>(&mut self, doc: &mut D)
    where
        D: ElementMut + Events + ?Sized,
    {
        for (image, listener) in std::mem::take(&mut self.awaiting_load) {
            doc.unlisten(listener);
            doc.set_style(image, "opacity", "1");
        }
    }

    /// Whether `image` has had its source swapped in.
    #[must_use]
    pub fn is_loaded(&self, image: NodeId) -> bool {
        self.latches.is_fired(image)
    }

    /// Images still waiting for their first intersection.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.latches.pending()
    }
}
