//! Tests for the lenient CSS URL scanner: rebasing relative references,
//! error recovery that matches browsers, and chunked input.

use pretty_assertions::assert_eq;
use quill_css::tag_scanner::{
    CssTagScanner, InputPortion, RebaseTransformer, TransformError, TransformResult, Transformer,
    transform_urls,
};
use url::Url;

fn rebase() -> RebaseTransformer {
    RebaseTransformer::new(Url::parse("http://old-base.com/").unwrap())
}

/// Helper to rewrite `css` against the old base in one pass.
fn transform(css: &str) -> String {
    transform_urls(css, &mut rebase()).unwrap()
}

/// Helper to feed `chunks` one at a time, the last one as the end of input,
/// and record what each call wrote and held back.
fn transform_streaming(chunks: &[&str]) -> String {
    let mut transformer = rebase();
    let mut scanner = CssTagScanner::new(&mut transformer);
    let mut log = String::new();
    for (index, chunk) in chunks.iter().enumerate() {
        let portion = if index + 1 == chunks.len() {
            InputPortion::IncludesEnd
        } else {
            InputPortion::DoesNotIncludeEnd
        };
        let mut out = String::new();
        scanner
            .transform_urls_streaming(chunk, portion, &mut out)
            .unwrap();
        log.push_str(&format!("portion={out}, retain={}|", scanner.retained()));
    }
    log
}

#[test]
fn test_no_urls() {
    assert_eq!(transform(""), "");
    assert_eq!(transform("hello"), "hello");
}

#[test]
fn test_absolute_urls_unchanged() {
    for css in [
        "a url(http://other_base/image.png) b",
        "a url('http://other_base/image.png') b",
        "a url(\"http://other_base/image.png\") b",
    ] {
        assert_eq!(transform(css), css);
    }
}

#[test]
fn test_relative_urls() {
    assert_eq!(
        transform("a url(subdir/image.png) b"),
        "a url(http://old-base.com/subdir/image.png) b"
    );
    assert_eq!(
        transform("a url('subdir/image.png') b"),
        "a url('http://old-base.com/subdir/image.png') b"
    );
    assert_eq!(
        transform("a url(\"subdir/image.png\") b"),
        "a url(\"http://old-base.com/subdir/image.png\") b"
    );
    assert_eq!(
        transform("a url(s/1.png) b url(2.png) c url(http://a/3.png) d"),
        "a url(http://old-base.com/s/1.png) b url(http://old-base.com/2.png) c \
         url(http://a/3.png) d"
    );
}

#[test]
fn test_quoted_url_with_spaces() {
    assert_eq!(
        transform("a url( 'subdir/image.png' ) b"),
        "a url('http://old-base.com/subdir/image.png') b"
    );
}

#[test]
fn test_escaped_quotes() {
    assert_eq!(
        transform("a url('subdir/imag\\'e.png') b"),
        "a url('http://old-base.com/subdir/imag\\'e.png') b"
    );
    assert_eq!(
        transform("a url(\"subdir/\\\"image.png\") b"),
        "a url(\"http://old-base.com/subdir/%22image.png\") b"
    );
}

#[test]
fn test_string_line_continuation() {
    let expected = "url('http://old-base.com/foobar') stuff";
    assert_eq!(transform("url('foo\\\nbar') stuff"), expected);
    assert_eq!(transform("url('foo\\\rbar') stuff"), expected);
    assert_eq!(transform("url('foo\\\r\nbar') stuff"), expected);
    assert_eq!(transform("url('foo\\\x0Cbar') stuff"), expected);
}

#[test]
fn test_unterminated_strings() {
    assert_eq!(
        transform("@import \"foo\nbar\\\nbaz"),
        "@import \"http://old-base.com/foo\nbar\\\nbaz"
    );
    assert_eq!(
        transform("@import 'foo\n\"bar stuff"),
        "@import 'http://old-base.com/foo\n\"bar stuff"
    );
    assert_eq!(
        transform("@import 'foo\x0C\"bar stuff"),
        "@import 'http://old-base.com/foo\x0C\"bar stuff"
    );
    assert_eq!(
        transform("@import 'foo\nbar' stuff"),
        "@import 'http://old-base.com/foo\nbar' stuff"
    );
}

#[test]
fn test_unquoted_urls() {
    assert_eq!(transform("url(/foo bar)"), "url(http://old-base.com/foo bar)");
    assert_eq!(
        transform("url(/foo \t  \x0C     )"),
        "url(http://old-base.com/foo)"
    );
    assert_eq!(
        transform("url(  \r\n  /foo \t  \x0C     )"),
        "url(http://old-base.com/foo)"
    );
}

#[test]
fn test_output_stays_well_formed() {
    assert_eq!(
        transform("url('foo).bar')"),
        "url('http://old-base.com/foo\\).bar')"
    );
    assert_eq!(transform("url(/\\)stuff)"), "url(http://old-base.com/\\)stuff)");
    assert_eq!(
        transform("url(\"/\\\"stuff\")"),
        "url(\"http://old-base.com/%22stuff\")"
    );
}

#[test]
fn test_import_forms() {
    assert_eq!(
        transform("a @import \"style.css\" div { display: block; }"),
        "a @import \"http://old-base.com/style.css\" div { display: block; }"
    );
    assert_eq!(
        transform("a @import \t \"style.css\" div { display: block; }"),
        "a @import \"http://old-base.com/style.css\" div { display: block; }"
    );
    assert_eq!(
        transform("a @import 'style.css' div { display: block; }"),
        "a @import 'http://old-base.com/style.css' div { display: block; }"
    );
    assert_eq!(
        transform("a @import url(style.css) div { display: block; }"),
        "a @import url(http://old-base.com/style.css) div { display: block; }"
    );
    assert_eq!(
        transform("a @import url('style.css') div { display: block; }"),
        "a @import url('http://old-base.com/style.css') div { display: block; }"
    );
    assert_eq!(
        transform("a @import 'style.css'\"screen\";"),
        "a @import 'http://old-base.com/style.css'\"screen\";"
    );
}

#[test]
fn test_malformed_input_left_alone() {
    for css in [
        "a @import url('style.css' div { display: block; }",
        "@import 'foo/\\1234'; url(foo\\",
    ] {
        assert_eq!(transform(css), css);
    }
}

#[test]
fn test_failure_is_reported() {
    let mut fail = |_: &str| TransformResult::Failure;
    assert_eq!(
        transform_urls("a url(foo) b", &mut fail),
        Err(TransformError::Failed {
            url: "foo".to_string()
        })
    );
}

struct Recorder(Vec<String>);

impl Transformer for Recorder {
    fn transform(&mut self, url: &str) -> TransformResult {
        self.0.push(url.to_string());
        TransformResult::NoChange
    }
}

#[test]
fn test_no_change_is_byte_identical() {
    let css = "@import 'a.css';\n@charset \"x\";\n.a { background: url( \"b c.png\" ) }\n\
               .b { src: url(d\\).woff) } url(unterminated";
    let mut recorder = Recorder(Vec::new());
    let once = transform_urls(css, &mut recorder).unwrap();
    assert_eq!(once, css);
    assert_eq!(recorder.0, vec!["a.css", "b c.png", "d).woff", "unterminated"]);
    let twice = transform_urls(&once, &mut recorder).unwrap();
    assert_eq!(twice, once);
}

#[test]
fn test_streaming_url_interrupt() {
    assert_eq!(
        transform_streaming(&["u", "rl(", "\"foo", ".png\"", ") bar u", "x"]),
        "portion=, retain=u|\
         portion=, retain=url(|\
         portion=, retain=url(\"foo|\
         portion=, retain=url(\"foo.png\"|\
         portion=url(\"http://old-base.com/foo.png\") bar , retain=u|\
         portion=ux, retain=|"
    );
}

#[test]
fn test_streaming_other_at_rule() {
    assert_eq!(
        transform_streaming(&["@export", " \"foo.png\";"]),
        "portion=@export, retain=|portion= \"foo.png\";, retain=|"
    );
}

#[test]
fn test_streaming_url_argument() {
    assert_eq!(
        transform_streaming(&["background-image:url(", "foo.png", ")"]),
        "portion=background-image:, retain=url(|\
         portion=, retain=url(foo.png|\
         portion=url(http://old-base.com/foo.png), retain=|"
    );
}

#[test]
fn test_streaming_import_interrupt() {
    assert_eq!(
        transform_streaming(&["@", "imp", "ort", " ", " \"foo.css", "\";"]),
        "portion=, retain=@|\
         portion=, retain=@imp|\
         portion=, retain=@import|\
         portion=, retain=@import |\
         portion=, retain=@import  \"foo.css|\
         portion=@import \"http://old-base.com/foo.css\";, retain=|"
    );
}

#[test]
fn test_streaming_escape() {
    assert_eq!(
        transform_streaming(&["background-image: url(\"foo\\", "\"bar\")"]),
        "portion=background-image: , retain=url(\"foo\\|\
         portion=url(\"http://old-base.com/foo%22bar\"), retain=|"
    );
}

#[test]
fn test_streaming_matches_batch_at_every_split() {
    let inputs = [
        "@import \"other.css\"; ul { list-style-image:url(a.png); }",
        "a url( 'x y.png' ) b url(c\\).png) @import 'd\ne' url('f\\\r\ng')",
        "url(/foo \t  bar) @imp url(",
    ];
    for css in inputs {
        let batch = transform(css);
        for split in 0..=css.len() {
            let mut transformer = rebase();
            let mut scanner = CssTagScanner::new(&mut transformer);
            let mut out = String::new();
            scanner
                .transform_urls_streaming(&css[..split], InputPortion::DoesNotIncludeEnd, &mut out)
                .unwrap();
            scanner
                .transform_urls_streaming(&css[split..], InputPortion::IncludesEnd, &mut out)
                .unwrap();
            assert_eq!(out, batch, "split at {split} of {css:?}");
        }
    }
}

#[test]
fn test_streaming_char_by_char() {
    let css = "@import \"other.css\"; ul { list-style-image:url(a.png); }";
    let chunks: Vec<String> = css.chars().map(String::from).collect();
    let mut transformer = rebase();
    let mut scanner = CssTagScanner::new(&mut transformer);
    let mut result = String::new();
    for (index, chunk) in chunks.iter().enumerate() {
        let portion = if index + 1 == chunks.len() {
            InputPortion::IncludesEnd
        } else {
            InputPortion::DoesNotIncludeEnd
        };
        scanner
            .transform_urls_streaming(chunk, portion, &mut result)
            .unwrap();
        result.push('|');
    }
    assert_eq!(
        result,
        "||||||||||||||||||@import \"http://old-base.com/other.css\"|;\
         | ||||ul {| |l|i|s|t|-|s|t|y|l|e|-|i|m|a|g|e|:\
         ||||||||||url(http://old-base.com/a.png)|;| |}|"
    );
}
