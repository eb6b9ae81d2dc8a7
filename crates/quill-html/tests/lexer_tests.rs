//! Integration tests for the HTML lexer, observed through the writer filter.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use quill_dom::{CloseStyle, NodeId};
use quill_html::{DocType, HtmlFilter, HtmlParse, HtmlWriterFilter, StringWriter};

const URL: &str = "http://lexer.test/page.html";

/// Helper to parse HTML in one chunk and return what the writer produced
fn rewrite(html: &str) -> String {
    rewrite_with(html, None, false)
}

fn rewrite_with(html: &str, content_type: Option<&str>, case_fold: bool) -> String {
    let writer = StringWriter::default();
    let mut filter = HtmlWriterFilter::new(writer.clone());
    filter.set_case_fold(case_fold);
    let mut parse = HtmlParse::new();
    parse.add_filter(Box::new(filter));
    parse.start_parse_with_id(URL, URL, content_type).unwrap();
    parse.parse_text(html);
    parse.finish_parse();
    writer.contents()
}

/// Helper to assert that `html` is written back unchanged
fn assert_round_trip(html: &str) {
    assert_eq!(rewrite(html), html);
}

/// Records what each callback saw, one line per event.
#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<String>>>);

impl Recorder {
    fn lines(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    fn push(&self, line: String) {
        self.0.borrow_mut().push(line);
    }
}

impl HtmlFilter for Recorder {
    fn start_element(&mut self, parse: &mut HtmlParse, element: NodeId) {
        let name = parse.element(element).unwrap().name().to_string();
        self.push(format!("<{name}>"));
    }

    fn end_element(&mut self, parse: &mut HtmlParse, element: NodeId) {
        let element = parse.element(element).unwrap();
        self.push(format!("</{}> {:?}", element.name(), element.close_style()));
    }

    fn characters(&mut self, parse: &mut HtmlParse, node: NodeId) {
        self.push(format!("text {}", parse.contents(node).unwrap()));
    }

    fn comment(&mut self, parse: &mut HtmlParse, node: NodeId) {
        self.push(format!("comment {}", parse.contents(node).unwrap()));
    }

    fn cdata(&mut self, parse: &mut HtmlParse, node: NodeId) {
        self.push(format!("cdata {}", parse.contents(node).unwrap()));
    }

    fn directive(&mut self, parse: &mut HtmlParse, node: NodeId) {
        self.push(format!("directive {}", parse.contents(node).unwrap()));
    }

    fn ie_directive(&mut self, parse: &mut HtmlParse, node: NodeId) {
        self.push(format!("ie {}", parse.contents(node).unwrap()));
    }

    fn name(&self) -> &'static str {
        "Recorder"
    }
}

fn record(html: &str) -> Vec<String> {
    let recorder = Recorder::default();
    let mut parse = HtmlParse::new();
    parse.add_filter(Box::new(recorder.clone()));
    parse.start_parse(URL).unwrap();
    parse.parse_text(html);
    parse.finish_parse();
    recorder.lines()
}

// ========== Round trips ==========

#[test]
fn test_literal_tags_are_not_lexed() {
    assert_round_trip("<script>x<y</script>");
    assert_round_trip("<script type='text/javascript'>document.write('<b>hi</b>')</script>");
    assert_round_trip("<style>a > b { color: red }</style>");
    assert_round_trip("<title>1 < 2 && 3 > 2</title>");
    assert_round_trip("<textarea><p>not a tag</p></textarea>");
}

#[test]
fn test_literal_close_tag_ignores_case() {
    assert_eq!(
        record("<script>a</SCRIPT>b"),
        vec!["<script>", "text a", "</script> ExplicitClose", "text b"]
    );
}

#[test]
fn test_stray_less_than_is_text() {
    assert_round_trip("<p>1<2</p>");
    assert_round_trip("a < b");
    assert_round_trip("<<p>>");
}

#[test]
fn test_valueless_attributes() {
    assert_round_trip("<a b>foo</a>");
    assert_round_trip("<input type=checkbox checked disabled>");
    assert_eq!(rewrite("<a b >foo</a>"), "<a b>foo</a>");
}

#[test]
fn test_attribute_quoting_is_preserved() {
    assert_round_trip(r#"<a href="http://www.google.com/" id=37 class='search!' selected>x</a>"#);
    assert_round_trip(r#"<img alt='"quoted"' src="it's.png">"#);
    assert_round_trip("<a title=\"&nbsp;&amp;\">&nbsp</a>");
}

#[test]
fn test_attribute_whitespace_is_normalized() {
    assert_eq!(
        rewrite("<div  class=\"a\"\n\tid=b >x</div>"),
        "<div class=\"a\" id=b>x</div>"
    );
    assert_eq!(
        rewrite("<input name=\"username\"<input>"),
        "<input name=\"username\" <input>"
    );
}

#[test]
fn test_slash_inside_unquoted_value() {
    assert_round_trip("<a href=/search?q=x>search</a>");
    assert_round_trip("<a href=/ >root</a>");
}

#[test]
fn test_brief_close() {
    assert_round_trip("<br/>");
    assert_round_trip("<img src=\"a.png\"/>");
    assert_round_trip("<input type=text />");
    assert_eq!(rewrite("<a b/>"), "<a b />");
}

#[test]
fn test_unmatched_close_tag_is_text() {
    assert_round_trip("<br><div>hello</div></br>");
    assert_round_trip("</p>");
    assert_round_trip("<b><i>x</b></i>");
}

#[test]
fn test_unclosed_elements_are_not_closed_on_output() {
    assert_round_trip("<p>unclosed");
    assert_round_trip("<html><body><p>a<p>b");
    assert_round_trip("<div class=\"a");
}

#[test]
fn test_comment_forms() {
    assert_round_trip("<!-- hi -->");
    assert_round_trip("<!---->");
    assert_round_trip("<!-- a -- b --->");
    assert_round_trip("<!- not a comment>");
    assert_round_trip("<!--[if IE]><p>old</p><![endif]-->");
}

#[test]
fn test_cdata_and_directives() {
    assert_round_trip("<![CDATA[a]b]]]>");
    assert_round_trip("<![CDAT>");
    assert_round_trip("<!DOCTYPE html><html></html>");
}

#[test]
fn test_non_ascii() {
    assert_round_trip("<p title=\"caf\u{e9}\">\u{65e5}\u{672c}</p>");
    assert_round_trip("<\u{e9}l\u{e9}ment>x</\u{e9}l\u{e9}ment>");
}

// ========== Events ==========

#[test]
fn test_auto_close() {
    assert_eq!(
        record("<ul><li>a<li>b</ul>"),
        vec![
            "<ul>",
            "<li>",
            "text a",
            "</li> AutoClose",
            "<li>",
            "text b",
            "</li> Unclosed",
            "</ul> ExplicitClose",
        ]
    );
    assert_round_trip("<select><option value=1>One<option value=2>Two</select>");
}

#[test]
fn test_paragraph_closed_by_block() {
    assert_eq!(
        record("<p>x<div>y</div>"),
        vec![
            "<p>",
            "text x",
            "</p> AutoClose",
            "<div>",
            "text y",
            "</div> ExplicitClose",
        ]
    );
}

#[test]
fn test_close_tag_confined_to_table_cell() {
    let lines = record("<b><table><tr><td>x</b></td></tr></table></b>");
    assert_eq!(
        lines,
        vec![
            "<b>",
            "<table>",
            "<tr>",
            "<td>",
            "text x</b>",
            "</td> ExplicitClose",
            "</tr> ExplicitClose",
            "</table> ExplicitClose",
            "</b> ExplicitClose",
        ]
    );
}

#[test]
fn test_void_elements_close_implicitly() {
    assert_eq!(
        record("<p>a<br>b</p>"),
        vec![
            "<p>",
            "text a",
            "<br>",
            "</br> ImplicitClose",
            "text b",
            "</p> ExplicitClose",
        ]
    );
}

#[test]
fn test_markup_handlers() {
    assert_eq!(
        record("<!--c--><![CDATA[d]]><!--[if IE]>e<![endif]--><!doctype html>"),
        vec![
            "comment c",
            "cdata d",
            "ie [if IE]>e<![endif]",
            "directive doctype html",
        ]
    );
}

#[test]
fn test_close_style_of_lexed_elements() {
    let styles: Vec<String> = record("<a><img/><p>x</a>")
        .into_iter()
        .filter(|line| line.starts_with("</"))
        .collect();
    assert_eq!(
        styles,
        vec![
            format!("</img> {:?}", CloseStyle::BriefClose),
            format!("</p> {:?}", CloseStyle::Unclosed),
            format!("</a> {:?}", CloseStyle::ExplicitClose),
        ]
    );
}

// ========== Case and doctype ==========

#[test]
fn test_case_is_preserved_by_default() {
    assert_round_trip("<DIV Class=A>x</DIV>");
}

#[test]
fn test_case_fold() {
    assert_eq!(rewrite_with("<DIV Class=A>x</DIV>", None, true), "<div class=A>x</div>");
}

#[test]
fn test_xhtml_output() {
    let html = "<IMG SRC=a checked>";
    assert_eq!(
        rewrite_with(html, Some("application/xhtml+xml"), false),
        "<img src=a checked=\"\">"
    );
    let strict = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd">"#;
    assert_eq!(
        rewrite(&format!("{strict}<BR>")),
        format!("{strict}<br>")
    );
}

#[test]
fn test_doctype_is_recorded() {
    let mut parse = HtmlParse::new();
    parse.start_parse(URL).unwrap();
    assert_eq!(parse.doctype(), DocType::Unknown);
    parse.parse_text("<!doctype html><html>");
    assert_eq!(parse.doctype(), DocType::Html5);
    parse.parse_text("<!doctype html public \"-//W3C//DTD XHTML 1.1//EN\">");
    assert_eq!(parse.doctype(), DocType::Html5);
    parse.finish_parse();
}
