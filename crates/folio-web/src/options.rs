#![forbid(unsafe_code)]

//! Page-supplied options.
//!
//! The page may pass a JSON document overriding any subset of
//! [`SiteConfig`]. Bad options never stop the page: the caller gets the
//! defaults back together with the error so it can be logged once a
//! subscriber is installed.

use folio_core::{Error, SiteConfig};

/// Resolve the options string into a configuration.
///
/// `None`, an empty string, and JSON `null` all mean "defaults".
#[must_use]
pub fn resolve(options: Option<&str>) -> (SiteConfig, Option<Error>) {
    let Some(json) = options.map(str::trim).filter(|s| !s.is_empty() && *s != "null") else {
        return (SiteConfig::default(), None);
    };
    match SiteConfig::from_json(json) {
        Ok(config) => (config, None),
        Err(err) => (SiteConfig::default(), Some(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn absent_options_use_defaults() {
        for input in [None, Some(""), Some("  "), Some("null")] {
            let (config, err) = resolve(input);
            assert_eq!(config, SiteConfig::default());
            assert!(err.is_none());
        }
    }

    #[test]
    fn overrides_are_applied() {
        let (config, err) = resolve(Some(r#"{ "log_filter": "debug", "nav": { "home_page": "home.html" } }"#));
        assert!(err.is_none());
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.nav.home_page, "home.html");
    }

    #[test]
    fn malformed_json_falls_back() {
        let (config, err) = resolve(Some("{ not json"));
        assert_eq!(config, SiteConfig::default());
        assert!(matches!(err, Some(Error::Config(_))));
    }

    #[test]
    fn invalid_setting_falls_back() {
        let (config, err) = resolve(Some(r#"{ "fade": { "threshold": 4.0 } }"#));
        assert_eq!(config, SiteConfig::default());
        assert!(matches!(err, Some(Error::InvalidSetting { field: "fade.threshold", .. })));
    }
}
