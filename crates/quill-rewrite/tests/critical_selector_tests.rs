//! Integration tests for the critical CSS filter, run through the rewrite
//! driver with fixture stylesheets served by a mock fetcher.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use quill_common::net::MockFetcher;
use quill_common::options::RewriteOptions;
use quill_common::stats::names;
use quill_rewrite::{ServerContext, StaticAsset, rewrite_html, write_critical_selectors};

const URL: &str = "http://test.com/page.html";

fn fetcher() -> Arc<MockFetcher> {
    let fetcher = MockFetcher::new();
    fetcher.insert_css(
        "http://test.com/a.css",
        "div,span,*::first-letter { display: block; }p { display: inline; }",
    );
    fetcher.insert_css("http://test.com/b.css", "@media screen,print { * { margin: 0px; } }");
    Arc::new(fetcher)
}

fn context_with(fetcher: Arc<MockFetcher>, options: RewriteOptions, selectors: &[&str]) -> ServerContext {
    let context = ServerContext::new(fetcher).with_options(options);
    write_critical_selectors(context.property_cache.as_ref(), URL, selectors.iter().copied()).unwrap();
    context
}

fn context(selectors: &[&str]) -> ServerContext {
    context_with(fetcher(), RewriteOptions::default(), selectors)
}

/// Helper to rewrite `html` in one chunk
fn rewrite(context: &ServerContext, html: &str) -> String {
    rewrite_html(context, URL, html, 0).unwrap()
}

fn link(href: &str) -> String {
    format!("<link rel=stylesheet href={href}>")
}

fn link_media(href: &str, media: &str) -> String {
    format!("<link rel=stylesheet href={href} media=\"{media}\">")
}

fn wrap_for_js_load(css: &str) -> String {
    format!("<noscript class=\"psa_add_styles\">{css}</noscript>")
}

fn js_loader() -> String {
    format!(
        "<script data-pagespeed-no-defer type=\"text/javascript\">{}pagespeed.CriticalCssLoader.Run();</script>",
        StaticAsset::CriticalCssLoader.bundled_js()
    )
}

fn load_rest_of_css(css: &str) -> String {
    format!("{}{}", wrap_for_js_load(css), js_loader())
}

fn page(head: &str) -> String {
    format!("<head>{head}</head><body><div>Stuff</div></body>")
}

fn rewritten_page(head: &str, tail: &str) -> String {
    format!("<head>{head}</head><body><div>Stuff</div>{tail}</body>")
}

const INLINE: &str = "<style>*,p {display: none; } span {display: inline; }</style>";

#[test]
fn test_basic_operation() {
    let context = context(&["div", "*"]);
    let css = format!("{INLINE}{}{}", link("a.css"), link("b.css"));
    let critical = "<style>*{display:none}</style>\
                    <style>div,*::first-letter{display:block}</style>\
                    <style>@media screen{*{margin:0}}</style>";
    assert_eq!(
        rewrite(&context, &page(&css)),
        rewritten_page(critical, &load_rest_of_css(&css))
    );
    assert_eq!(context.stats.get(names::CRITICAL_CSS_RENDERED), 3);
    assert_eq!(context.stats.get(names::CSS_SUMMARIES_COMPUTED), 3);
}

#[test]
fn test_empty_block_is_dropped() {
    let context = context(&["div", "*"]);
    let css = "<style>i { font-style:italic; }</style>";
    assert_eq!(
        rewrite(&context, &page(css)),
        rewritten_page("", &load_rest_of_css(css))
    );
}

#[test]
fn test_noscript() {
    let context = context(&["div", "*"]);
    let css2 = format!("<noscript>{}</noscript>", link("a.css"));
    let css3 = link("b.css");
    let css = format!("{INLINE}{css2}{css3}");
    let critical = "<style>*{display:none}</style>\
                    <noscript></noscript>\
                    <style>@media screen{*{margin:0}}</style>";
    let tail = format!(
        "{}{css2}{}{}",
        wrap_for_js_load(INLINE),
        wrap_for_js_load(&css3),
        js_loader()
    );
    assert_eq!(rewrite(&context, &page(&css)), rewritten_page(critical, &tail));
}

#[test]
fn test_alternate_stylesheet_is_dropped() {
    let context = context(&["div", "*"]);
    let css = format!("<link rel=\"alternate stylesheet\" href=\"a.css\">{}", link("b.css"));
    let critical = "<style>@media screen{*{margin:0}}</style>";
    assert_eq!(
        rewrite(&context, &page(&css)),
        rewritten_page(critical, &load_rest_of_css(&css))
    );
}

#[test]
fn test_media_reduced_to_screen() {
    let context = context(&["div", "*"]);
    let css = format!(
        "<style media=screen,print>*,p {{display: none; }} span {{display: inline; }}</style>{}{}",
        link_media("a.css", "screen"),
        link_media("b.css", "screen and (color), aural")
    );
    let critical = "<style media=\"screen\">*{display:none}</style>\
                    <style media=\"screen\">div,*::first-letter{display:block}</style>\
                    <style media=\"screen and (color)\">@media screen{*{margin:0}}</style>";
    assert_eq!(
        rewrite(&context, &page(&css)),
        rewritten_page(critical, &load_rest_of_css(&css))
    );
}

#[test]
fn test_non_screen_media_is_dropped() {
    let context = context(&["div", "*"]);
    let css = format!(
        "<style media=print>*,p {{display: none; }} span {{display: inline; }}</style>{}{}",
        link_media("a.css", "screen"),
        link_media("b.css", "screen and (color), aural")
    );
    let critical = "<style media=\"screen\">div,*::first-letter{display:block}</style>\
                    <style media=\"screen and (color)\">@media screen{*{margin:0}}</style>";
    assert_eq!(
        rewrite(&context, &page(&css)),
        rewritten_page(critical, &load_rest_of_css(&css))
    );
}

#[test]
fn test_same_css_different_selectors() {
    let fetcher = fetcher();
    let css = "<style>div,span { display: inline-block; }</style>";

    let with_div = context_with(Arc::clone(&fetcher), RewriteOptions::default(), &["div"]);
    assert_eq!(
        rewrite(&with_div, &format!("{css}<div>Foo</div>")),
        format!("<style>div{{display:inline-block}}</style><div>Foo</div>{}", load_rest_of_css(css))
    );

    // Same summary cache, new selector set.
    write_critical_selectors(with_div.property_cache.as_ref(), URL, ["div", "span"]).unwrap();
    assert_eq!(
        rewrite(&with_div, &format!("{css}<span>Foo</span>")),
        format!(
            "<style>div,span{{display:inline-block}}</style><span>Foo</span>{}",
            load_rest_of_css(css)
        )
    );
    assert_eq!(with_div.stats.get(names::CSS_SUMMARY_CACHE_HITS), 0);
    assert_eq!(with_div.stats.get(names::CSS_SUMMARIES_COMPUTED), 2);
}

#[test]
fn test_retain_pseudo_only() {
    let fetcher = fetcher();
    fetcher.insert_css("http://test.com/c.css", ":hover { border: 2px solid red; }");
    let context = context_with(fetcher, RewriteOptions::default(), &["div", "*"]);
    assert_eq!(
        rewrite(&context, &link("c.css")),
        format!("<style>:hover{{border:2px solid red}}</style>{}", load_rest_of_css(&link("c.css")))
    );
}

#[test]
fn test_retain_unparseable() {
    let fetcher = fetcher();
    fetcher.insert_css(
        "http://test.com/c.css",
        "!huh! {background: white; } @huh { display: block; }",
    );
    let context = context_with(fetcher, RewriteOptions::default(), &["div", "*"]);
    assert_eq!(
        rewrite(&context, &link("c.css")),
        format!(
            "<style>!huh! {{background:white}}@huh {{ display: block; }}</style>{}",
            load_rest_of_css(&link("c.css"))
        )
    );
}

#[test]
fn test_no_selector_info_leaves_page_alone() {
    let bare = ServerContext::new(fetcher());
    let html = "<style>div,span { display: inline-block; }</style><div>Foo</div>";
    assert_eq!(rewrite(&bare, html), html);

    let context = context(&[]);
    assert_eq!(rewrite(&context, html), html);
}

#[test]
fn test_unused_media_rules_are_pruned() {
    let context = context(&["p", ".bar"]);
    let html = "<style>p {color:red} @media print{q{color:blue}} .foo{font:1em}</style>";
    assert_eq!(
        rewrite(&context, html),
        format!("<style>p{{color:red}}</style>{}", load_rest_of_css(html))
    );
}

#[test]
fn test_link_replaced_by_style_in_place() {
    let fetcher = fetcher();
    fetcher.insert_css("http://test.com/f.css", "body{margin:0}");
    let context = context_with(fetcher, RewriteOptions::default(), &["body"]);
    let original = "<link rel=stylesheet href=f.css media=screen>";
    assert_eq!(
        rewrite(&context, &page(original)),
        rewritten_page(
            "<style media=\"screen\">body{margin:0}</style>",
            &load_rest_of_css(original)
        )
    );
}

#[test]
fn test_external_urls_are_absolutized() {
    let fetcher = fetcher();
    fetcher.insert_css("http://test.com/styles/bg.css", "div{background:url(img/bg.png)}");
    let context = context_with(fetcher, RewriteOptions::default(), &["div"]);
    let original = link("styles/bg.css");
    assert_eq!(
        rewrite(&context, &page(&original)),
        rewritten_page(
            "<style>div{background:url(http://test.com/styles/img/bg.png)}</style>",
            &load_rest_of_css(&original)
        )
    );
}

#[test]
fn test_imports_are_flattened_into_summary() {
    let fetcher = fetcher();
    fetcher.insert_css("http://test.com/imp.css", "div{color:blue} span{color:green}");
    let context = context_with(fetcher, RewriteOptions::default(), &["div"]);
    let original = "<style>@import url(imp.css); p{color:red}</style>";
    assert_eq!(
        rewrite(&context, &page(original)),
        rewritten_page("<style>div{color:blue}</style>", &load_rest_of_css(original))
    );
}

#[test]
fn test_same_output_at_any_chunk_size() {
    let context = context(&["div", "*"]);
    let css = format!("{INLINE}{}{}", link("a.css"), link("b.css"));
    let html = page(&css);
    let whole = rewrite(&context, &html);

    let mut driver = quill_rewrite::RewriteDriver::new(context.clone());
    let chunks = [
        format!("<head>{INLINE}"),
        format!("{}{}</head>", link("a.css"), link("b.css")),
        "<body><div>Stuff</div></body>".to_string(),
    ];
    let chunked = driver.rewrite_html(URL, chunks.iter().map(String::as_str)).unwrap();
    assert_eq!(chunked, whole);
}

#[test]
fn test_full_css_goes_to_end_when_body_already_flushed() {
    let context = context(&["div", "*"]);
    let css = format!("{INLINE}{}", link("a.css"));
    let html = page(&css);
    let critical = "<style>*{display:none}</style>\
                    <style>div,*::first-letter{display:block}</style>";

    let mut driver = quill_rewrite::RewriteDriver::new(context.clone());
    let rewritten = driver.rewrite_html(URL, [html.as_str(), ""]).unwrap();
    assert_eq!(
        rewritten,
        format!(
            "<head>{critical}</head><body><div>Stuff</div></body>{}",
            load_rest_of_css(&css)
        )
    );
    assert_eq!(context.stats.get(names::CRITICAL_CSS_RENDERED), 2);
}

#[test]
fn test_summaries_are_cached_across_documents() {
    let fetcher = fetcher();
    let context = context_with(Arc::clone(&fetcher), RewriteOptions::default(), &["div", "*"]);
    let html = page(&format!("{INLINE}{}", link("a.css")));
    let first = rewrite(&context, &html);
    let second = rewrite(&context, &html);
    assert_eq!(first, second);
    assert_eq!(fetcher.request_count("http://test.com/a.css"), 1);
    assert_eq!(context.stats.get(names::CSS_SUMMARY_CACHE_HITS), 2);
    assert_eq!(context.stats.get(names::CSS_SUMMARIES_COMPUTED), 2);
}

#[test]
fn test_failed_fetch_keeps_link() {
    let context = context(&["div", "*"]);
    let missing = link("missing.css");
    let css = format!("{INLINE}{missing}");
    assert_eq!(
        rewrite(&context, &page(&css)),
        rewritten_page(
            &format!("<style>*{{display:none}}</style>{missing}"),
            &load_rest_of_css(&css)
        )
    );
    assert_eq!(context.stats.get(names::CSS_SUMMARY_FAILURES), 1);
}

#[test]
fn test_unauthorized_link_is_untouched() {
    let fetcher = fetcher();
    fetcher.insert_css("http://other.com/x.css", "div{color:red}");
    let options = RewriteOptions {
        debug: true,
        ..RewriteOptions::default()
    };
    let context = context_with(Arc::clone(&fetcher), options, &["div"]);
    let original = "<link rel=stylesheet href=http://other.com/x.css>";
    let output = rewrite(&context, &page(original));
    assert!(output.contains(original));
    assert!(output.contains("CriticalSelectorFilter: unable to create resource; is it authorized?"));
    assert!(output.contains("Cannot create resource; is it authorized and is URL well-formed?"));
    assert!(!output.contains("psa_add_styles"));
    assert_eq!(fetcher.request_count("http://other.com/x.css"), 0);
}

#[test]
fn test_authorized_domain_is_rewritten() {
    let fetcher = fetcher();
    fetcher.insert_css("http://cdn.test.com/x.css", "div{color:red}");
    let options = RewriteOptions {
        authorized_domains: vec!["cdn.test.com".to_string()],
        ..RewriteOptions::default()
    };
    let context = context_with(fetcher, options, &["div"]);
    let original = "<link rel=stylesheet href=http://cdn.test.com/x.css>";
    assert_eq!(
        rewrite(&context, &page(original)),
        rewritten_page("<style>div{color:red}</style>", &load_rest_of_css(original))
    );
}

#[test]
fn test_debug_comment_lists_summaries() {
    let options = RewriteOptions {
        debug: true,
        ..RewriteOptions::default()
    };
    let context = context_with(fetcher(), options, &["div", "*"]);
    let css = format!("{INLINE}{}{}", link("a.css"), link("nope.css"));
    let output = rewrite(&context, &page(&css));
    assert!(output.contains("<!--Summary computation status for CriticalSelectorFilter\n"));
    assert!(output.contains(&format!("Resource 0 {URL}:")));
    assert!(output.contains("Resource 1 http://test.com/a.css: Computed OK\n"));
    assert!(output.contains(
        "Resource 2 http://test.com/nope.css: Fetch failed or resource not publicly cacheable\n"
    ));
    let comment = output.find("<!--Summary").unwrap();
    assert!(comment < output.find("<noscript class").unwrap());
}

#[test]
fn test_charset_mismatch_keeps_link() {
    let fetcher = fetcher();
    fetcher.insert(
        "http://test.com/latin.css",
        "@charset \"utf-8\"; div{color:red}",
        Some("text/css; charset=iso-8859-1"),
    );
    let options = RewriteOptions {
        debug: true,
        ..RewriteOptions::default()
    };
    let context = context_with(fetcher, options, &["div"]);
    let original = link("latin.css");
    let output = rewrite(&context, &page(&original));
    assert!(output.starts_with(&format!("<head>{original}</head>")));
    assert!(output.contains("Resource 0 http://test.com/latin.css: Charset does not match the content type\n"));
}

#[test]
fn test_test_only_flag_skips_loader_invocation() {
    let options = RewriteOptions {
        test_only_prioritize_critical_css_dont_apply_original_css: true,
        ..RewriteOptions::default()
    };
    let context = context_with(fetcher(), options, &["div", "*"]);
    let output = rewrite(&context, &page(INLINE));
    let script = format!(
        "<script data-pagespeed-no-defer type=\"text/javascript\">{}</script>",
        StaticAsset::CriticalCssLoader.bundled_js()
    );
    assert_eq!(
        output,
        rewritten_page("<style>*{display:none}</style>", &format!("{}{script}", wrap_for_js_load(INLINE)))
    );
}

#[test]
fn test_size_limit_is_counted() {
    let options = RewriteOptions {
        max_html_bytes: 16,
        ..RewriteOptions::default()
    };
    let context = context_with(fetcher(), options, &["div"]);
    let _ = rewrite(&context, &page(INLINE));
    assert_eq!(context.stats.get(names::HTML_SIZE_LIMIT_EXCEEDED), 1);
}
