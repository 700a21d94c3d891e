#![forbid(unsafe_code)]

//! Core: view-state synchronization for the folio personal site.
//!
//! Every component here is host-independent. A host (the `folio-web` crate in
//! the browser, or the in-memory `fake::FakeDocument` behind the
//! `test-helpers` feature) implements the capability traits from [`dom`] and
//! pushes browser events into a [`site::Site`].
//!
//! Components, leaves first:
//! - [`footer`]: stamps the current year into placeholders.
//! - [`nav`]: marks the navigation link for the current page.
//! - [`smooth_scroll`]: animates in-page anchor jumps.
//! - [`lazy_images`]: swaps deferred image sources in near the viewport.
//! - [`fade_in`]: reveals sections as they scroll into view.
//! - [`mobile_menu`]: hamburger toggle for narrow viewports.
//! - [`image_zoom`]: click-to-zoom lightbox overlay.

pub mod config;
pub mod debounce;
pub mod dom;
pub mod error;
pub mod fade_in;
#[cfg(any(test, feature = "test-helpers"))]
pub mod fake;
pub mod footer;
pub mod image_zoom;
pub mod lazy_images;
pub mod logging;
pub mod mobile_menu;
pub mod nav;
pub mod one_shot;
#[cfg(any(test, feature = "test-helpers"))]
pub mod selector;
pub mod site;
pub mod smooth_scroll;

pub use config::SiteConfig;
pub use error::{Error, Result};
pub use site::Site;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, info, trace, warn};
