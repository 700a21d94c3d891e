#![forbid(unsafe_code)]

//! Footer year stamping.

use crate::config::FooterConfig;
use crate::dom::{Clock, ElementMut, ElementQuery};

/// Write the current four-digit year into every year placeholder.
///
/// Returns how many placeholders were stamped. No placeholders is not an
/// error. Running it again writes the same text.
pub fn stamp_year<D>(doc: &mut D, config: &FooterConfig) -> usize
where
    D: ElementQuery + ElementMut + Clock + ?Sized,
{
    let year = format!("{:04}", doc.current_year());
    let placeholders = doc.query_all(&config.year_selector);
    for &node in &placeholders {
        doc.set_text(node, &year);
    }
    crate::debug!(count = placeholders.len(), %year, "stamped footer year");
    placeholders.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeDocument;

    #[test]
    fn stamps_every_placeholder() {
        let mut doc = FakeDocument::new().with_year(2026);
        let body = doc.body();
        let footer = doc.append(body, "footer", &[]);
        let a = doc.append(footer, "span", &[("id", "year")]);
        // Duplicate ids happen in copied footers; both are stamped.
        let b = doc.append(body, "span", &[("id", "year")]);
        doc.set_text(a, "2019");

        assert_eq!(stamp_year(&mut doc, &FooterConfig::default()), 2);
        assert_eq!(doc.text(a), "2026");
        assert_eq!(doc.text(b), "2026");
    }

    #[test]
    fn idempotent() {
        let mut doc = FakeDocument::new().with_year(2026);
        let body = doc.body();
        let span = doc.append(body, "span", &[("id", "year")]);
        stamp_year(&mut doc, &FooterConfig::default());
        let first = doc.text(span).to_owned();
        stamp_year(&mut doc, &FooterConfig::default());
        assert_eq!(doc.text(span), first);
    }

    #[test]
    fn no_placeholder_is_a_no_op() {
        let mut doc = FakeDocument::new();
        assert_eq!(stamp_year(&mut doc, &FooterConfig::default()), 0);
    }

    #[test]
    fn pads_to_four_digits() {
        let mut doc = FakeDocument::new().with_year(987);
        let body = doc.body();
        let span = doc.append(body, "span", &[("id", "year")]);
        stamp_year(&mut doc, &FooterConfig::default());
        assert_eq!(doc.text(span), "0987");
    }
}
