//! Tests for the preservation-mode CSS parser and the minifying serializer.

use pretty_assertions::assert_eq;
use quill_css::{
    CssParseError, CssParser, Declaration, MediaQuery, RulesetKind, minify_stylesheet,
    parse_stylesheet, parse_stylesheet_bytes,
};

/// Helper to parse and minify, expecting no errors.
fn minify(css: &str) -> String {
    minify_stylesheet(&parse_stylesheet(css).unwrap())
}

fn selector_texts(css: &str) -> Vec<Vec<String>> {
    parse_stylesheet(css)
        .unwrap()
        .rulesets
        .iter()
        .map(|ruleset| ruleset.selectors().iter().map(ToString::to_string).collect())
        .collect()
}

#[test]
fn test_style_rules() {
    assert_eq!(
        minify("*,p {display: none; } span {display: inline; }"),
        "*,p{display:none}span{display:inline}"
    );
    assert_eq!(
        selector_texts("div > p , ul  li{x:y} a:hover::before{x:y}"),
        vec![vec!["div>p", "ul li"], vec!["a:hover::before"]]
    );
}

#[test]
fn test_declarations() {
    let sheet = parse_stylesheet("a { Color: red !IMPORTANT; : bad; margin: 0px 0.25em }").unwrap();
    let quill_css::RulesetContent::Style(rule) = &sheet.rulesets[0].content else {
        panic!("expected a style rule");
    };
    assert_eq!(
        rule.declarations,
        vec![
            Declaration::Property {
                name: "color".to_string(),
                value: "red".to_string(),
                important: true,
            },
            Declaration::Verbatim(": bad".to_string()),
            Declaration::Property {
                name: "margin".to_string(),
                value: "0 .25em".to_string(),
                important: false,
            },
        ]
    );
    assert_eq!(
        minify_stylesheet(&sheet),
        "a{color:red!important;: bad;margin:0 .25em}"
    );
}

#[test]
fn test_media_blocks_flatten() {
    let sheet = parse_stylesheet("@media screen, print { * { margin: 0px; } } p { x: y }").unwrap();
    assert_eq!(sheet.rulesets.len(), 2);
    assert_eq!(
        sheet.rulesets[0].media_queries,
        vec![MediaQuery::new("screen"), MediaQuery::new("print")]
    );
    assert!(sheet.rulesets[1].media_queries.is_empty());
    assert_eq!(minify_stylesheet(&sheet), "@media screen,print{*{margin:0}}p{x:y}");
}

#[test]
fn test_equal_media_grouped() {
    assert_eq!(
        minify("@media print{a{b:c}} @media print{d{e:f}} @media all{g{h:i}}"),
        "@media print{a{b:c}d{e:f}}g{h:i}"
    );
    assert_eq!(
        minify("@media (min-width: 10px) and (max-width : 20px) {a{b:c}}"),
        "@media (min-width:10px) and (max-width:20px){a{b:c}}"
    );
}

#[test]
fn test_unparsed_regions_kept_verbatim() {
    let css = "!huh! {background: white; } @huh { display: block; }";
    let sheet = parse_stylesheet(css).unwrap();
    assert!(sheet.rulesets[0].is_degenerate());
    assert!(sheet.rulesets[0].selectors().is_empty());
    assert_eq!(sheet.rulesets[1].kind(), RulesetKind::UnparsedRegion);
    assert_eq!(
        minify_stylesheet(&sheet),
        "!huh! {background:white}@huh { display: block; }"
    );
}

#[test]
fn test_nested_at_rules_kept_under_media() {
    assert_eq!(
        minify("@media screen { @supports (x: y) { a{b:c} } d{e:f} }"),
        "@media screen{@supports (x: y) { a{b:c} }d{e:f}}"
    );
    assert_eq!(
        minify("@font-face { font-family: x; src: url(a.woff) }"),
        "@font-face { font-family: x; src: url(a.woff) }"
    );
}

#[test]
fn test_charset_and_imports() {
    let sheet = parse_stylesheet(
        "@charset \"utf-8\";\n@import url(a.css) screen;\n@import \"b.css\";\n\
         @import url( 'c.css' ) print, all;\np{color:red}",
    )
    .unwrap();
    assert_eq!(sheet.charset.as_deref(), Some("utf-8"));
    let urls: Vec<&str> = sheet.imports.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(urls, vec!["a.css", "b.css", "c.css"]);
    assert_eq!(sheet.imports[0].media, vec![MediaQuery::new("screen")]);
    assert!(sheet.imports[2].media.is_empty());
    assert_eq!(
        minify_stylesheet(&sheet),
        "@charset \"utf-8\";@import url(a.css) screen;@import url(b.css);@import url(c.css);\
         p{color:red}"
    );
}

#[test]
fn test_import_after_rules() {
    let css = "p{} @import 'x.css';";
    let sheet = parse_stylesheet(css).unwrap();
    assert!(sheet.imports.is_empty());
    assert_eq!(sheet.rulesets[1].kind(), RulesetKind::UnparsedRegion);

    let mut strict = CssParser::new(css).strict(true);
    let _ = strict.parse_stylesheet();
    assert_eq!(strict.errors(), &[CssParseError::ImportAfterRules { offset: 4 }]);
}

#[test]
fn test_errors() {
    assert_eq!(
        parse_stylesheet("a { color: red"),
        Err(CssParseError::UnclosedBlock { offset: 2 })
    );
    assert_eq!(
        parse_stylesheet("} a{}"),
        Err(CssParseError::UnexpectedCloseBrace { offset: 0 })
    );
    assert_eq!(
        parse_stylesheet("@media screen { a{}"),
        Err(CssParseError::UnclosedBlock { offset: 14 })
    );
}

#[test]
fn test_bytes() {
    let sheet = parse_stylesheet_bytes(b"\xEF\xBB\xBFa{b:c}").unwrap();
    assert_eq!(minify_stylesheet(&sheet), "a{b:c}");
    assert_eq!(
        parse_stylesheet_bytes(b"a{b:\xFF}"),
        Err(CssParseError::InvalidUtf8 { offset: 4 })
    );
}

#[test]
fn test_comments_and_cdo() {
    assert_eq!(
        minify("<!-- /* lead */ a /* x */ { b : 1px/**/solid ; } -->"),
        "a{b:1px solid}"
    );
}

#[test]
fn test_urls_in_values() {
    assert_eq!(
        minify("a { background: url( d.png ) no-repeat, url('e f.png') }"),
        "a{background:url(d.png) no-repeat,url('e f.png')}"
    );
}

#[test]
fn test_minified_output_is_stable() {
    let css = "@charset \"x\"; @import 'a.css' screen; a , b { c : d !important } \
               @media print { e { f: 0.5em } } !bad { g: h } @page { margin: 1in }";
    let once = minify(css);
    assert_eq!(minify(&once), once);
}
