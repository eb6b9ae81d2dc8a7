//! Minified serialization of a [`Stylesheet`].
//!
//! Values were already compacted by the parser, so this only lays rules out
//! without optional whitespace.

use crate::ast::{Declaration, Import, Ruleset, RulesetContent, StyleRule, Stylesheet};
use crate::escape::{escape_string, escape_url};
use crate::media::{MediaQuery, stringify_media_vector};

fn write_import(import: &Import, out: &mut String) {
    out.push_str("@import url(");
    out.push_str(&escape_url(&import.url));
    out.push(')');
    if !import.media.is_empty() {
        out.push(' ');
        out.push_str(&stringify_media_vector(&import.media));
    }
    out.push(';');
}

fn write_declarations(declarations: &[Declaration], out: &mut String) {
    for (index, declaration) in declarations.iter().enumerate() {
        if index > 0 {
            out.push(';');
        }
        match declaration {
            Declaration::Property {
                name,
                value,
                important,
            } => {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
                if *important {
                    out.push_str("!important");
                }
            }
            Declaration::Verbatim(text) => out.push_str(text),
        }
    }
}

fn write_style_rule(rule: &StyleRule, out: &mut String) {
    if let Some(raw) = &rule.unparsed_selectors {
        out.push_str(raw);
    } else {
        let selectors: Vec<String> = rule.selectors.iter().map(ToString::to_string).collect();
        out.push_str(&selectors.join(","));
    }
    out.push('{');
    write_declarations(&rule.declarations, out);
    out.push('}');
}

fn write_ruleset(ruleset: &Ruleset, out: &mut String) {
    match &ruleset.content {
        RulesetContent::Style(rule) => write_style_rule(rule, out),
        RulesetContent::Unparsed(text) => out.push_str(text),
    }
}

/// Serialize rulesets, wrapping each run of equal media lists in one
/// `@media` block.
pub fn write_rulesets(rulesets: &[Ruleset], out: &mut String) {
    let mut open: Option<&[MediaQuery]> = None;
    for ruleset in rulesets {
        let media = ruleset.media_queries.as_slice();
        if open != Some(media) {
            if open.is_some_and(|queries| !queries.is_empty()) {
                out.push('}');
            }
            if !media.is_empty() {
                out.push_str("@media ");
                out.push_str(&stringify_media_vector(media));
                out.push('{');
            }
            open = Some(media);
        }
        write_ruleset(ruleset, out);
    }
    if open.is_some_and(|queries| !queries.is_empty()) {
        out.push('}');
    }
}

/// Serialize `sheet` without optional whitespace.
#[must_use]
pub fn minify_stylesheet(sheet: &Stylesheet) -> String {
    let mut out = String::new();
    if let Some(charset) = &sheet.charset {
        out.push_str("@charset \"");
        out.push_str(&escape_string(charset));
        out.push_str("\";");
    }
    for import in &sheet.imports {
        write_import(import, &mut out);
    }
    write_rulesets(&sheet.rulesets, &mut out);
    out
}
