//! URL resolution utilities.
//!
//! [URL Standard](https://url.spec.whatwg.org/)
//!
//! Thin helpers over the `url` crate for the handful of operations the
//! rewriter needs: resolving references found in HTML and CSS, and comparing
//! the directories two resources are served from.

use ::url::Url;

/// [URL Standard § 4.4 URL parsing](https://url.spec.whatwg.org/#url-parsing)
///
/// Parse an absolute document URL. Returns `None` when `raw` is not an
/// absolute URL with a host or is not a `file:` URL.
#[must_use]
pub fn parse_document_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    if url.has_host() || url.scheme() == "file" {
        Some(url)
    } else {
        None
    }
}

/// [§ 2.5 URLs](https://html.spec.whatwg.org/multipage/urls-and-fetching.html#resolving-urls)
///
/// Resolve a potentially relative reference against a base URL.
///
/// Leading and trailing ASCII whitespace is stripped first, as browsers do for
/// `href` attributes and CSS `url()` tokens.
#[must_use]
pub fn resolve_url(href: &str, base: &Url) -> Option<Url> {
    base.join(href.trim_matches(|c: char| c.is_ascii_whitespace()))
        .ok()
}

/// Everything in `url` up to and including the last `/` of its path.
///
/// `http://a.com/x/y.css?z` becomes `http://a.com/x/`. This is the portion
/// relative references are resolved against.
#[must_use]
pub fn all_except_leaf(url: &Url) -> &str {
    let spec = url.as_str();
    let path_end = url[..::url::Position::AfterPath].len();
    spec[..path_end]
        .rfind('/')
        .map_or(spec, |slash| &spec[..=slash])
}

/// Whether relative references resolve identically against `a` and `b`.
#[must_use]
pub fn same_directory(a: &Url, b: &Url) -> bool {
    all_except_leaf(a) == all_except_leaf(b)
}

/// The charset parameter of a `Content-Type` value, if any.
///
/// `text/css; charset="UTF-8"` yields `UTF-8`.
#[must_use]
pub fn content_type_charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches(|c| c == '"' || c == '\''))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn test_resolve_relative_forms() {
        let base = url("http://base/");
        for href in ["r/path.ext", "/r/path.ext", "../r/path.ext", "./r/path.ext"] {
            let resolved = resolve_url(href, &base).unwrap();
            assert_eq!(resolved.as_str(), "http://base/r/path.ext");
        }
    }

    #[test]
    fn test_resolve_absolute_is_unchanged() {
        let base = url("http://base/dir/page.html");
        let resolved = resolve_url(" http://other/a.css ", &base).unwrap();
        assert_eq!(resolved.as_str(), "http://other/a.css");
    }

    #[test]
    fn test_all_except_leaf() {
        assert_eq!(
            all_except_leaf(&url("http://a.com/x/y.css?z=1")),
            "http://a.com/x/"
        );
        assert_eq!(all_except_leaf(&url("http://a.com")), "http://a.com/");
        assert!(same_directory(
            &url("http://a.com/x/1.css"),
            &url("http://a.com/x/page.html")
        ));
        assert!(!same_directory(
            &url("http://a.com/y/1.css"),
            &url("http://a.com/x/page.html")
        ));
    }

    #[test]
    fn test_document_url_requires_host() {
        assert!(parse_document_url("http://www.example.com/").is_some());
        assert!(parse_document_url("not a url").is_none());
        assert!(parse_document_url("mailto:x@example.com").is_none());
    }

    #[test]
    fn test_content_type_charset() {
        assert_eq!(
            content_type_charset("text/css; charset=\"UTF-8\""),
            Some("UTF-8")
        );
        assert_eq!(content_type_charset("text/css"), None);
    }
}
