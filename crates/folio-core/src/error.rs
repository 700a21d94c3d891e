#![forbid(unsafe_code)]

//! Error type shared by the core and its hosts.
//!
//! Component operations never return errors: a missing element or an
//! unavailable capability is an ordinary no-op branch. Errors only arise while
//! loading configuration, parsing selectors, or inside a host binding, and the
//! host logs them instead of letting them reach the page.

/// Everything that can go wrong outside the component logic.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Options document is not valid JSON for [`crate::SiteConfig`].
    #[error("invalid site options: {0}")]
    Config(#[from] serde_json::Error),

    /// A setting parsed but holds an unusable value.
    #[error("invalid setting `{field}`: {reason}")]
    InvalidSetting {
        field: &'static str,
        reason: String,
    },

    /// A selector outside the supported subset.
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    /// A host DOM call failed.
    #[error("dom operation failed: {0}")]
    Dom(String),
}

/// Convenience alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
