#![forbid(unsafe_code)]

//! Browser host for `folio-core`.
//!
//! Exports `startSite(options?)` and `stopSite()` through `wasm-bindgen`.
//! The page loads the generated module and calls `startSite`, optionally with
//! a JSON document overriding any [`folio_core::SiteConfig`] field:
//!
//! ```js
//! import init, { startSite } from "./pkg/folio_web.js";
//! await init();
//! startSite(JSON.stringify({ menu: { breakpoint: 640 }, log_filter: "debug" }));
//! ```
//!
//! Log output goes to the browser console through [`console_log`].

pub mod console_log;
pub mod options;
pub mod registry;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{start_site, stop_site};

/// Native builds compile this crate as a stub so `cargo check --workspace` stays
/// green on non-wasm targets. There is no document to wire, so the options are
/// resolved and reported and nothing else happens.
#[cfg(not(target_arch = "wasm32"))]
pub fn start_site(options: Option<String>) -> Result<(), folio_core::Error> {
    match options::resolve(options.as_deref()) {
        (_, Some(err)) => Err(err),
        (_, None) => Ok(()),
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn stop_site() {}
