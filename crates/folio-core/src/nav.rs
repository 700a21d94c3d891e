#![forbid(unsafe_code)]

//! Navigation link highlighting.
//!
//! The current page is identified by the last segment of the location path,
//! lowercased, with the empty segment and configured root aliases mapped to
//! the home page. A link is active when the last segment of its `href` names
//! the same page, or when the current page is home and the link points home
//! through any alias (`index.html`, `/`, `./`, an empty segment).
//!
//! Matching is a pure recomputation: every call first clears all marks, so it
//! can be re-run after the link set changes. Several links that resolve to
//! the same page are all marked; no single winner is chosen.

use crate::config::NavConfig;
use crate::dom::{ElementMut, ElementQuery, Viewport};

/// Normalized identifier of the page at `path`.
#[must_use]
pub fn current_page(path: &str, config: &NavConfig) -> String {
    let segment = last_segment(path).to_lowercase();
    let is_root = segment.is_empty()
        || config
            .root_aliases
            .iter()
            .any(|alias| alias.trim_end_matches('/').eq_ignore_ascii_case(&segment));
    if is_root {
        config.home_page.to_lowercase()
    } else {
        segment
    }
}

/// Whether a link with `href` points at `current` (a [`current_page`] result).
#[must_use]
pub fn link_matches(href: &str, current: &str, config: &NavConfig) -> bool {
    let href = href.to_lowercase();
    let target = last_segment(&href);
    if target == current {
        return true;
    }
    // `/`, `./` and an empty href all end in an empty segment.
    target.is_empty() && current == config.home_page.to_lowercase()
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}

/// Mark the navigation links that point at the current page.
///
/// Each link loses any previous mark; matches gain the active class and
/// `aria-current="page"`. Links without an `href` are never marked. Returns
/// the number of links marked.
pub fn highlight<D>(doc: &mut D, config: &NavConfig) -> usize
where
    D: ElementQuery + ElementMut + Viewport + ?Sized,
{
    let current = current_page(&doc.location_path(), config);
    let mut marked = 0;
    for link in doc.query_all(&config.link_selector) {
        doc.remove_class(link, &config.active_class);
        doc.remove_attribute(link, "aria-current");
        let Some(href) = doc.attribute(link, "href") else {
            continue;
        };
        if link_matches(&href, &current, config) {
            doc.add_class(link, &config.active_class);
            doc.set_attribute(link, "aria-current", "page");
            marked += 1;
        }
    }
    crate::debug!(page = %current, marked, "highlighted navigation");
    marked
}
