#![forbid(unsafe_code)]

//! Site configuration.
//!
//! Every selector, class name and tunable the components rely on lives here,
//! so the markup contract can be adapted without touching component code.
//! All fields default to the values the site's markup ships with; a host may
//! override any subset through a JSON options document.
//!
//! # Example
//!
//! ```
//! use folio_core::SiteConfig;
//!
//! let config = SiteConfig::from_json(r#"{ "menu": { "breakpoint": 640 } }"#).unwrap();
//! assert_eq!(config.menu.breakpoint, 640.0);
//! assert_eq!(config.nav.home_page, "index.html");
//! ```

use core::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration for a [`crate::Site`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub footer: FooterConfig,
    pub nav: NavConfig,
    pub scroll: ScrollConfig,
    pub lazy: LazyConfig,
    pub fade: FadeConfig,
    pub menu: MenuConfig,
    pub zoom: ZoomConfig,
    /// Filter directive for the host's log subscriber (e.g. `"debug"`).
    pub log_filter: String,
}

/// Footer year placeholders.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FooterConfig {
    pub year_selector: String,
}

impl Default for FooterConfig {
    fn default() -> Self {
        Self {
            year_selector: "#year".to_owned(),
        }
    }
}

/// Navigation highlighting.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavConfig {
    pub link_selector: String,
    /// Canonical identifier of the home page.
    pub home_page: String,
    /// Final path segments that also mean "home" (e.g. a project-site prefix).
    pub root_aliases: Vec<String>,
    pub active_class: String,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            link_selector: ".nav-links a".to_owned(),
            home_page: "index.html".to_owned(),
            root_aliases: vec!["my-website".to_owned()],
            active_class: "active".to_owned(),
        }
    }
}

/// In-page anchor scrolling and scroll settling.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrollConfig {
    pub anchor_selector: String,
    /// Distance kept between the viewport top and a scrolled-to target.
    pub header_offset: f64,
    /// Quiet period before a scroll burst counts as settled (ms).
    pub settle_delay_ms: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            anchor_selector: r##"a[href^="#"]"##.to_owned(),
            header_offset: 80.0,
            settle_delay_ms: 150,
        }
    }
}

/// Deferred image loading.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LazyConfig {
    pub image_selector: String,
    /// Attribute holding the real source until the image nears the viewport.
    pub source_attribute: String,
    pub root_margin: String,
    pub transition: String,
}

impl Default for LazyConfig {
    fn default() -> Self {
        Self {
            image_selector: "img[data-src]".to_owned(),
            source_attribute: "data-src".to_owned(),
            root_margin: "50px".to_owned(),
            transition: "opacity 0.3s ease-in".to_owned(),
        }
    }
}

/// Scroll-triggered section reveal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FadeConfig {
    pub section_selector: String,
    pub threshold: f64,
    pub root_margin: String,
    /// Transform applied while a section is still hidden.
    pub hidden_transform: String,
    pub transition: String,
    pub revealed_class: String,
    pub style_id: String,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            section_selector: "section:not(.intro)".to_owned(),
            threshold: 0.1,
            root_margin: "0px 0px -50px 0px".to_owned(),
            hidden_transform: "translateY(20px)".to_owned(),
            transition: "opacity 0.6s ease-out, transform 0.6s ease-out".to_owned(),
            revealed_class: "fade-in".to_owned(),
            style_id: "scroll-animation-styles".to_owned(),
        }
    }
}

/// Mobile hamburger menu.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MenuConfig {
    pub nav_bar_selector: String,
    pub nav_list_selector: String,
    pub button_class: String,
    pub button_label: String,
    /// Widest viewport (inclusive) that gets the toggle button.
    pub breakpoint: f64,
    pub open_class: String,
    /// Quiet period after the last resize before re-evaluating (ms).
    pub resize_delay_ms: u64,
    pub style_id: String,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            nav_bar_selector: ".top-nav".to_owned(),
            nav_list_selector: ".nav-links".to_owned(),
            button_class: "mobile-menu-button".to_owned(),
            button_label: "Toggle navigation menu".to_owned(),
            breakpoint: 768.0,
            open_class: "active".to_owned(),
            resize_delay_ms: 250,
            style_id: "mobile-menu-styles".to_owned(),
        }
    }
}

/// Click-to-zoom overlay.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZoomConfig {
    pub image_selector: String,
    pub overlay_class: String,
    /// Fade-out time before a dismissed overlay is removed (ms).
    pub fade_out_ms: u64,
    pub default_alt: String,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            image_selector: "img:not(.brand-emblem)".to_owned(),
            overlay_class: "image-overlay".to_owned(),
            fade_out_ms: 300,
            default_alt: "Zoomed image".to_owned(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            footer: FooterConfig::default(),
            nav: NavConfig::default(),
            scroll: ScrollConfig::default(),
            lazy: LazyConfig::default(),
            fade: FadeConfig::default(),
            menu: MenuConfig::default(),
            zoom: ZoomConfig::default(),
            log_filter: "warn".to_owned(),
        }
    }
}

impl SiteConfig {
    /// Parse and validate a JSON options document.
    ///
    /// Missing fields keep their defaults; unknown fields are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        let selectors: [(&'static str, &str); 8] = [
            ("footer.year_selector", &self.footer.year_selector),
            ("nav.link_selector", &self.nav.link_selector),
            ("scroll.anchor_selector", &self.scroll.anchor_selector),
            ("lazy.image_selector", &self.lazy.image_selector),
            ("fade.section_selector", &self.fade.section_selector),
            ("menu.nav_bar_selector", &self.menu.nav_bar_selector),
            ("menu.nav_list_selector", &self.menu.nav_list_selector),
            ("zoom.image_selector", &self.zoom.image_selector),
        ];
        for (field, selector) in selectors {
            if selector.trim().is_empty() {
                return Err(invalid(field, "selector must not be empty"));
            }
        }
        if self.nav.home_page.is_empty() {
            return Err(invalid("nav.home_page", "must not be empty"));
        }
        if self.lazy.source_attribute.is_empty() {
            return Err(invalid("lazy.source_attribute", "must not be empty"));
        }
        if !self.scroll.header_offset.is_finite() || self.scroll.header_offset < 0.0 {
            return Err(invalid(
                "scroll.header_offset",
                "must be a finite, non-negative number",
            ));
        }
        if !self.menu.breakpoint.is_finite() || self.menu.breakpoint < 0.0 {
            return Err(invalid(
                "menu.breakpoint",
                "must be a finite, non-negative number",
            ));
        }
        if !(0.0..=1.0).contains(&self.fade.threshold) {
            return Err(invalid("fade.threshold", "must lie within 0.0..=1.0"));
        }
        Ok(())
    }

    /// Resize quiet period as a [`Duration`].
    #[must_use]
    pub fn resize_delay(&self) -> Duration {
        Duration::from_millis(self.menu.resize_delay_ms)
    }

    /// Scroll quiet period as a [`Duration`].
    #[must_use]
    pub fn scroll_settle_delay(&self) -> Duration {
        Duration::from_millis(self.scroll.settle_delay_ms)
    }
}

fn invalid(field: &'static str, reason: &str) -> Error {
    Error::InvalidSetting {
        field,
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_markup_contract() {
        let config = SiteConfig::default();
        assert_eq!(config.footer.year_selector, "#year");
        assert_eq!(config.nav.link_selector, ".nav-links a");
        assert_eq!(config.scroll.anchor_selector, r##"a[href^="#"]"##);
        assert_eq!(config.scroll.header_offset, 80.0);
        assert_eq!(config.menu.breakpoint, 768.0);
        assert_eq!(config.resize_delay(), Duration::from_millis(250));
        assert_eq!(config.scroll_settle_delay(), Duration::from_millis(150));
        assert_eq!(config.zoom.image_selector, "img:not(.brand-emblem)");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(SiteConfig::from_json("{}").unwrap(), SiteConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config =
            SiteConfig::from_json(r#"{ "nav": { "root_aliases": [] }, "log_filter": "debug" }"#)
                .unwrap();
        assert!(config.nav.root_aliases.is_empty());
        assert_eq!(config.nav.active_class, "active");
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = SiteConfig::from_json(r#"{ "menu": { "brekpoint": 1 } }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let err = SiteConfig::from_json(r#"{ "fade": { "threshold": 1.5 } }"#).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidSetting {
                field: "fade.threshold",
                ..
            }
        ));
    }

    #[test]
    fn empty_selector_is_rejected() {
        let mut config = SiteConfig::default();
        config.zoom.image_selector = "  ".to_owned();
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidSetting {
                field: "zoom.image_selector",
                ..
            })
        ));
    }

    #[test]
    fn negative_breakpoint_is_rejected() {
        let mut config = SiteConfig::default();
        config.menu.breakpoint = -1.0;
        assert!(config.validate().is_err());
    }
}
