//! Media query lists as they appear in `media` attributes, `@media` and
//! `@import`.
//!
//! Queries are kept as normalized text. Nothing here evaluates features
//! such as `(min-width: ...)`; the only question answered is whether a query
//! could ever apply to a screen.

use core::fmt;

/// [Media Queries Level 4 § 2](https://www.w3.org/TR/mediaqueries-4/#media)
///
/// One query of a comma-separated media query list, with whitespace
/// collapsed to single spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaQuery(String);

impl MediaQuery {
    /// Normalize `text` into a query.
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self(text.split_ascii_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// The normalized text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this query may match a screen device.
    #[must_use]
    pub fn can_affect_screen(&self) -> bool {
        query_can_affect_screen(&self.0)
    }
}

impl fmt::Display for MediaQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Media types that never describe a screen.
///
/// [Media Queries Level 4 § 2.3](https://www.w3.org/TR/mediaqueries-4/#media-types)
/// lists the deprecated ones alongside `print` and `speech`.
const NON_SCREEN_TYPES: &[&str] = &[
    "print",
    "speech",
    "aural",
    "braille",
    "embossed",
    "handheld",
    "projection",
    "tty",
    "tv",
];

fn query_can_affect_screen(query: &str) -> bool {
    let lowered = query.to_ascii_lowercase();
    let mut words = lowered.split_ascii_whitespace().peekable();
    let Some(mut first) = words.next() else {
        return true;
    };
    if first == "only" {
        match words.next() {
            Some(word) => first = word,
            None => return true,
        }
    }
    if first == "not" {
        // `not screen` and `not all` exclude screens; negating anything
        // else leaves them in.
        return !matches!(words.peek(), Some(&("screen" | "all")));
    }
    if first.starts_with('(') {
        return true;
    }
    // `screen and (...)`: only the media type decides.
    !NON_SCREEN_TYPES.contains(&first)
}

/// Split a `media` attribute into queries.
///
/// Empty entries are dropped. A list that names `all` anywhere is the same
/// as no list at all and yields an empty vector.
#[must_use]
pub fn vectorize_media_attribute(media: &str) -> Vec<MediaQuery> {
    let mut queries = Vec::new();
    for part in media.split(',') {
        let query = MediaQuery::new(part);
        if query.as_str().is_empty() {
            continue;
        }
        if query.as_str().eq_ignore_ascii_case("all") {
            return Vec::new();
        }
        queries.push(query);
    }
    queries
}

/// Join queries back into attribute form.
#[must_use]
pub fn stringify_media_vector(queries: &[MediaQuery]) -> String {
    queries
        .iter()
        .map(MediaQuery::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Whether a comma-separated media list could apply to a screen.
///
/// An empty list applies to everything.
#[must_use]
pub fn can_media_affect_screen(media: &str) -> bool {
    let queries = vectorize_media_attribute(media);
    queries.is_empty() || queries.iter().any(MediaQuery::can_affect_screen)
}

/// Keep only the queries that could apply to a screen.
#[must_use]
pub fn screen_affecting(queries: &[MediaQuery]) -> Vec<MediaQuery> {
    queries
        .iter()
        .filter(|query| query.can_affect_screen())
        .cloned()
        .collect()
}

/// Combine the media of an `@import` with the media inside the imported
/// sheet, where an empty list means "all".
///
/// Returns `None` when the two lists have nothing in common. Queries are
/// compared as text, so `screen` and `screen and (color)` do not meet.
#[must_use]
pub fn intersect_media(outer: &[MediaQuery], inner: &[MediaQuery]) -> Option<Vec<MediaQuery>> {
    if outer.is_empty() {
        return Some(inner.to_vec());
    }
    if inner.is_empty() {
        return Some(outer.to_vec());
    }
    let common: Vec<MediaQuery> = inner
        .iter()
        .filter(|query| {
            outer
                .iter()
                .any(|other| other.as_str().eq_ignore_ascii_case(query.as_str()))
        })
        .cloned()
        .collect();
    if common.is_empty() { None } else { Some(common) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queries(list: &[&str]) -> Vec<MediaQuery> {
        list.iter().map(|q| MediaQuery::new(q)).collect()
    }

    #[test]
    fn test_vectorize_media_attribute() {
        assert_eq!(
            vectorize_media_attribute(" screen ,  print and (color), "),
            queries(&["screen", "print and (color)"])
        );
        assert!(vectorize_media_attribute("screen, all").is_empty());
        assert!(vectorize_media_attribute("").is_empty());
    }

    #[test]
    fn test_query_can_affect_screen() {
        assert!(MediaQuery::new("screen and (color)").can_affect_screen());
        assert!(MediaQuery::new("only screen").can_affect_screen());
        assert!(MediaQuery::new("(min-width: 100px)").can_affect_screen());
        assert!(MediaQuery::new("not print").can_affect_screen());
        assert!(MediaQuery::new("3d-glasses").can_affect_screen());
        assert!(!MediaQuery::new("print").can_affect_screen());
        assert!(!MediaQuery::new("aural").can_affect_screen());
        assert!(!MediaQuery::new("not screen").can_affect_screen());
        assert!(!MediaQuery::new("NOT ALL").can_affect_screen());
    }

    #[test]
    fn test_can_media_affect_screen() {
        assert!(can_media_affect_screen(""));
        assert!(can_media_affect_screen("print, screen"));
        assert!(!can_media_affect_screen("print, speech"));
    }

    #[test]
    fn test_intersect_media() {
        let screen = queries(&["screen"]);
        let both = queries(&["screen", "print"]);
        assert_eq!(intersect_media(&[], &screen), Some(screen.clone()));
        assert_eq!(intersect_media(&both, &[]), Some(both.clone()));
        assert_eq!(intersect_media(&both, &screen), Some(screen.clone()));
        assert_eq!(intersect_media(&queries(&["print"]), &screen), None);
    }
}
