//! Selector lists per [Selectors Level 4](https://www.w3.org/TR/selectors-4/).
//!
//! Selectors are parsed structurally but never matched: the rewriter only
//! needs to compare them as text, after dropping the parts that cannot be
//! observed from a static render (see [`Selector::js_detectable`]).

use core::fmt;

/// [§ 4.1 Simple selectors](https://www.w3.org/TR/selectors-4/#simple)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    /// [§ 5.1 Type selector](https://www.w3.org/TR/selectors-4/#type-selectors)
    ///
    /// Examples: `div`, `p`
    Type(String),

    /// [§ 5.2 Universal selector](https://www.w3.org/TR/selectors-4/#universal-selector)
    Universal,

    /// [§ 6.6 Class selector](https://www.w3.org/TR/selectors-4/#class-html)
    Class(String),

    /// [§ 6.7 ID selector](https://www.w3.org/TR/selectors-4/#id-selectors)
    Id(String),

    /// [§ 6 Attribute selectors](https://www.w3.org/TR/selectors-4/#attribute-selectors)
    ///
    /// The text between the brackets, written back as it was read.
    Attribute(String),

    /// [§ 3.5 Pseudo-classes](https://www.w3.org/TR/selectors-4/#pseudo-classes)
    PseudoClass {
        /// The name without the colon.
        name: String,
        /// The text between the parentheses of a functional pseudo-class.
        args: Option<String>,
    },

    /// [§ 3.6 Pseudo-elements](https://www.w3.org/TR/selectors-4/#pseudo-elements)
    PseudoElement {
        /// The name without the colons.
        name: String,
        /// Arguments of a functional pseudo-element.
        args: Option<String>,
    },
}

impl SimpleSelector {
    const fn is_pseudo(&self) -> bool {
        matches!(self, Self::PseudoClass { .. } | Self::PseudoElement { .. })
    }
}

impl fmt::Display for SimpleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (prefix, name, args) = match self {
            Self::Type(name) => return f.write_str(name),
            Self::Universal => return f.write_str("*"),
            Self::Class(name) => return write!(f, ".{name}"),
            Self::Id(name) => return write!(f, "#{name}"),
            Self::Attribute(inner) => return write!(f, "[{inner}]"),
            Self::PseudoClass { name, args } => (":", name, args),
            Self::PseudoElement { name, args } => ("::", name, args),
        };
        write!(f, "{prefix}{name}")?;
        if let Some(args) = args {
            write!(f, "({args})")?;
        }
        Ok(())
    }
}

/// [§ 4.2 Compound selectors](https://www.w3.org/TR/selectors-4/#compound)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector(pub Vec<SimpleSelector>);

impl fmt::Display for CompoundSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|simple| write!(f, "{simple}"))
    }
}

/// [§ 16 Combinators](https://www.w3.org/TR/selectors-4/#combinators)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace.
    Descendant,
    /// `>`
    Child,
    /// `+`
    NextSibling,
    /// `~`
    SubsequentSibling,
}

impl Combinator {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Descendant => " ",
            Self::Child => ">",
            Self::NextSibling => "+",
            Self::SubsequentSibling => "~",
        }
    }
}

/// [§ 4.3 Complex selectors](https://www.w3.org/TR/selectors-4/#complex)
///
/// Compounds in source order, with `combinators[i]` sitting between
/// `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector {
    /// The compound selectors, left to right.
    pub compounds: Vec<CompoundSelector>,
    /// One fewer than `compounds`.
    pub combinators: Vec<Combinator>,
}

impl Selector {
    /// The selector up to its first pseudo-class or pseudo-element.
    ///
    /// Interaction states and generated content cannot be seen by a script
    /// inspecting the rendered page, so `a:hover` is detected as `a` and
    /// `*::first-letter` as `*`. A later compound made only of pseudo
    /// selectors becomes `*`, keeping its combinator: `div > :hover` is
    /// `div>*`. A selector that starts with a pseudo-class becomes the
    /// empty string.
    #[must_use]
    pub fn js_detectable(&self) -> String {
        let mut kept = Self::default();
        for (index, compound) in self.compounds.iter().enumerate() {
            let pseudo_at = compound.0.iter().position(SimpleSelector::is_pseudo);
            let prefix = &compound.0[..pseudo_at.unwrap_or(compound.0.len())];
            if index > 0 {
                if let Some(&combinator) = self.combinators.get(index - 1) {
                    kept.combinators.push(combinator);
                }
                if prefix.is_empty() {
                    kept.compounds.push(CompoundSelector(vec![SimpleSelector::Universal]));
                    break;
                }
            } else if prefix.is_empty() {
                break;
            }
            kept.compounds.push(CompoundSelector(prefix.to_vec()));
            if pseudo_at.is_some() {
                break;
            }
        }
        kept.to_string()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, compound) in self.compounds.iter().enumerate() {
            if index > 0
                && let Some(combinator) = self.combinators.get(index - 1)
            {
                f.write_str(combinator.as_str())?;
            }
            write!(f, "{compound}")?;
        }
        Ok(())
    }
}

const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

type Chars<'a> = core::iter::Peekable<core::str::Chars<'a>>;

/// Read an identifier, keeping escapes as written.
fn take_ident(chars: &mut Chars<'_>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if c == '\\' {
            let _ = chars.next();
            ident.push('\\');
            if let Some(escaped) = chars.next() {
                ident.push(escaped);
            }
        } else if is_ident_char(c) {
            ident.push(c);
            let _ = chars.next();
        } else {
            break;
        }
    }
    ident
}

/// Read up to the `close` matching an already consumed opener, tracking
/// nesting and quotes. Returns `None` if input ends first.
fn take_balanced(chars: &mut Chars<'_>, open: char, close: char) -> Option<String> {
    let mut text = String::new();
    let mut depth = 0_usize;
    let mut quote: Option<char> = None;
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == '\\' {
                    text.push(c);
                    text.push(chars.next()?);
                    continue;
                }
                if c == q {
                    quote = None;
                }
            }
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == open => depth += 1,
            None if c == close => {
                if depth == 0 {
                    return Some(text);
                }
                depth -= 1;
            }
            None => {}
        }
        text.push(c);
    }
    None
}

/// Split on commas outside brackets, parentheses and quotes.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut escaped = false;
    for (at, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&text[start..at]);
                start = at + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Parse one complex selector, or `None` if it is not one this crate can
/// represent.
#[must_use]
pub fn parse_selector(raw: &str) -> Option<Selector> {
    fn close_compound(
        compound: &mut Vec<SimpleSelector>,
        pending: &mut Option<Combinator>,
        selector: &mut Selector,
    ) -> Option<()> {
        if compound.is_empty() {
            return Some(());
        }
        if !selector.compounds.is_empty() {
            selector.combinators.push(pending.take()?);
        }
        selector
            .compounds
            .push(CompoundSelector(core::mem::take(compound)));
        Some(())
    }

    let mut selector = Selector::default();
    let mut compound = Vec::new();
    // A combinator read since the last compound was closed.
    let mut pending: Option<Combinator> = None;
    let mut chars = raw.trim().chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '.' | '#' => {
                let _ = chars.next();
                let name = take_ident(&mut chars);
                if name.is_empty() {
                    return None;
                }
                compound.push(if c == '.' {
                    SimpleSelector::Class(name)
                } else {
                    SimpleSelector::Id(name)
                });
            }
            '*' => {
                let _ = chars.next();
                compound.push(SimpleSelector::Universal);
            }
            '[' => {
                let _ = chars.next();
                let inner = take_balanced(&mut chars, '[', ']')?;
                compound.push(SimpleSelector::Attribute(inner.trim().to_string()));
            }
            ':' => {
                let _ = chars.next();
                let element = chars.next_if_eq(&':').is_some();
                let name = take_ident(&mut chars);
                if name.is_empty() {
                    return None;
                }
                let args = if chars.next_if_eq(&'(').is_some() {
                    Some(take_balanced(&mut chars, '(', ')')?)
                } else {
                    None
                };
                compound.push(if element {
                    SimpleSelector::PseudoElement { name, args }
                } else {
                    SimpleSelector::PseudoClass { name, args }
                });
            }
            ' ' | '\t' | '\n' | '\r' | '\x0C' => {
                let _ = chars.next();
                close_compound(&mut compound, &mut pending, &mut selector)?;
                if pending.is_none() && !selector.compounds.is_empty() {
                    pending = Some(Combinator::Descendant);
                }
            }
            '>' | '+' | '~' => {
                let _ = chars.next();
                close_compound(&mut compound, &mut pending, &mut selector)?;
                // A combinator needs a left-hand side, and only whitespace
                // may stand next to it.
                if selector.compounds.is_empty()
                    || !matches!(pending, None | Some(Combinator::Descendant))
                {
                    return None;
                }
                pending = Some(match c {
                    '>' => Combinator::Child,
                    '+' => Combinator::NextSibling,
                    _ => Combinator::SubsequentSibling,
                });
            }
            c if is_ident_char(c) || c == '\\' => {
                // A type selector must come first in its compound.
                if !compound.is_empty() {
                    return None;
                }
                compound.push(SimpleSelector::Type(take_ident(&mut chars)));
            }
            _ => return None,
        }
    }

    close_compound(&mut compound, &mut pending, &mut selector)?;
    if selector.compounds.is_empty()
        || selector.combinators.len() + 1 != selector.compounds.len()
        || matches!(
            pending,
            Some(Combinator::Child | Combinator::NextSibling | Combinator::SubsequentSibling)
        )
    {
        return None;
    }
    Some(selector)
}

/// [§ 4.1 Selector lists](https://www.w3.org/TR/selectors-4/#grouping)
///
/// Parse a comma-separated list. Like a browser, one bad selector
/// invalidates the whole list.
#[must_use]
pub fn parse_selector_list(text: &str) -> Option<Vec<Selector>> {
    split_top_level(text)
        .into_iter()
        .map(parse_selector)
        .collect()
}
