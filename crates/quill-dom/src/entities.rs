//! Named character references.
//!
//! [HTML 4.01 § 24.2 Character entity references for ISO 8859-1 characters](https://www.w3.org/TR/html4/sgml/entities.html#h-24.2)
//!
//! The attribute decoder only produces Latin-1 text, so only the 96 Latin-1
//! entities (plus `amp`, `lt`, `gt` and `quot`) are decodable. The remaining
//! HTML 4 entities are listed by name so the decoder can recognize and reject
//! them instead of guessing at a case-insensitive match.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Latin-1 named references, case-sensitive, without the trailing `;`.
static LATIN1_ENTITIES: LazyLock<HashMap<&'static str, char>> = LazyLock::new(|| {
    HashMap::from([
        ("AElig", '\u{C6}'),
        ("Aacute", '\u{C1}'),
        ("Acirc", '\u{C2}'),
        ("Agrave", '\u{C0}'),
        ("Aring", '\u{C5}'),
        ("Atilde", '\u{C3}'),
        ("Auml", '\u{C4}'),
        ("Ccedil", '\u{C7}'),
        ("ETH", '\u{D0}'),
        ("Eacute", '\u{C9}'),
        ("Ecirc", '\u{CA}'),
        ("Egrave", '\u{C8}'),
        ("Euml", '\u{CB}'),
        ("Iacute", '\u{CD}'),
        ("Icirc", '\u{CE}'),
        ("Igrave", '\u{CC}'),
        ("Iuml", '\u{CF}'),
        ("Ntilde", '\u{D1}'),
        ("Oacute", '\u{D3}'),
        ("Ocirc", '\u{D4}'),
        ("Ograve", '\u{D2}'),
        ("Oslash", '\u{D8}'),
        ("Otilde", '\u{D5}'),
        ("Ouml", '\u{D6}'),
        ("THORN", '\u{DE}'),
        ("Uacute", '\u{DA}'),
        ("Ucirc", '\u{DB}'),
        ("Ugrave", '\u{D9}'),
        ("Uuml", '\u{DC}'),
        ("Yacute", '\u{DD}'),
        ("aacute", '\u{E1}'),
        ("acirc", '\u{E2}'),
        ("acute", '\u{B4}'),
        ("aelig", '\u{E6}'),
        ("agrave", '\u{E0}'),
        ("amp", '\u{26}'),
        ("aring", '\u{E5}'),
        ("atilde", '\u{E3}'),
        ("auml", '\u{E4}'),
        ("brvbar", '\u{A6}'),
        ("ccedil", '\u{E7}'),
        ("cedil", '\u{B8}'),
        ("cent", '\u{A2}'),
        ("copy", '\u{A9}'),
        ("curren", '\u{A4}'),
        ("deg", '\u{B0}'),
        ("divide", '\u{F7}'),
        ("eacute", '\u{E9}'),
        ("ecirc", '\u{EA}'),
        ("egrave", '\u{E8}'),
        ("eth", '\u{F0}'),
        ("euml", '\u{EB}'),
        ("frac12", '\u{BD}'),
        ("frac14", '\u{BC}'),
        ("frac34", '\u{BE}'),
        ("gt", '\u{3E}'),
        ("iacute", '\u{ED}'),
        ("icirc", '\u{EE}'),
        ("iexcl", '\u{A1}'),
        ("igrave", '\u{EC}'),
        ("iquest", '\u{BF}'),
        ("iuml", '\u{EF}'),
        ("laquo", '\u{AB}'),
        ("lt", '\u{3C}'),
        ("macr", '\u{AF}'),
        ("micro", '\u{B5}'),
        ("middot", '\u{B7}'),
        ("nbsp", '\u{A0}'),
        ("not", '\u{AC}'),
        ("ntilde", '\u{F1}'),
        ("oacute", '\u{F3}'),
        ("ocirc", '\u{F4}'),
        ("ograve", '\u{F2}'),
        ("ordf", '\u{AA}'),
        ("ordm", '\u{BA}'),
        ("oslash", '\u{F8}'),
        ("otilde", '\u{F5}'),
        ("ouml", '\u{F6}'),
        ("para", '\u{B6}'),
        ("plusmn", '\u{B1}'),
        ("pound", '\u{A3}'),
        ("quot", '\u{22}'),
        ("raquo", '\u{BB}'),
        ("reg", '\u{AE}'),
        ("sect", '\u{A7}'),
        ("shy", '\u{AD}'),
        ("sup1", '\u{B9}'),
        ("sup2", '\u{B2}'),
        ("sup3", '\u{B3}'),
        ("szlig", '\u{DF}'),
        ("thorn", '\u{FE}'),
        ("times", '\u{D7}'),
        ("uacute", '\u{FA}'),
        ("ucirc", '\u{FB}'),
        ("ugrave", '\u{F9}'),
        ("uml", '\u{A8}'),
        ("uuml", '\u{FC}'),
        ("yacute", '\u{FD}'),
        ("yen", '\u{A5}'),
        ("yuml", '\u{FF}'),
    ])
});

/// Lowercased Latin-1 names that are unambiguous without case.
///
/// `&QUOT;` decodes like `&quot;`, but `&Aelig;` is rejected because
/// `AElig` and `aelig` are different characters.
static LATIN1_INSENSITIVE: LazyLock<HashMap<String, char>> = LazyLock::new(|| {
    let mut map: HashMap<String, char> = HashMap::new();
    let mut ambiguous: Vec<String> = Vec::new();
    for (name, ch) in LATIN1_ENTITIES.iter() {
        let key = name.to_ascii_lowercase();
        if map.insert(key.clone(), *ch).is_some() {
            ambiguous.push(key);
        }
    }
    for key in ambiguous {
        let _ = map.remove(&key);
    }
    map
});

/// Reverse of [`LATIN1_ENTITIES`], used when escaping.
static LATIN1_NAMES: LazyLock<HashMap<char, &'static str>> = LazyLock::new(|| {
    LATIN1_ENTITIES
        .iter()
        .map(|(name, ch)| (*ch, *name))
        .collect()
});

/// HTML 4 references outside Latin-1. Matched ASCII case-insensitively.
static MULTI_BYTE_ENTITIES: LazyLock<HashMap<String, u32>> = LazyLock::new(|| {
    [
        ("alefsym", 8501),
        ("Alpha", 913),
        ("alpha", 945),
        ("and", 8743),
        ("ang", 8736),
        ("asymp", 8776),
        ("bdquo", 8222),
        ("Beta", 914),
        ("beta", 946),
        ("bull", 8226),
        ("cap", 8745),
        ("Chi", 935),
        ("chi", 967),
        ("circ", 710),
        ("clubs", 9827),
        ("cong", 8773),
        ("crarr", 8629),
        ("cup", 8746),
        ("dagger", 8224),
        ("Dagger", 8225),
        ("darr", 8595),
        ("dArr", 8659),
        ("Delta", 916),
        ("delta", 948),
        ("diams", 9830),
        ("empty", 8709),
        ("emsp", 8195),
        ("ensp", 8194),
        ("Epsilon", 917),
        ("epsilon", 949),
        ("equiv", 8801),
        ("Eta", 919),
        ("eta", 951),
        ("euro", 8364),
        ("exist", 8707),
        ("fnof", 402),
        ("forall", 8704),
        ("frasl", 8260),
        ("Gamma", 915),
        ("gamma", 947),
        ("ge", 8805),
        ("harr", 8596),
        ("hArr", 8660),
        ("hearts", 9829),
        ("hellip", 8230),
        ("image", 8465),
        ("infin", 8734),
        ("int", 8747),
        ("Iota", 921),
        ("iota", 953),
        ("isin", 8712),
        ("Kappa", 922),
        ("kappa", 954),
        ("Lambda", 923),
        ("lambda", 955),
        ("lang", 9001),
        ("larr", 8592),
        ("lArr", 8656),
        ("lceil", 8968),
        ("ldquo", 8220),
        ("le", 8804),
        ("lfloor", 8970),
        ("lowast", 8727),
        ("loz", 9674),
        ("lrm", 8206),
        ("lsaquo", 8249),
        ("lsquo", 8216),
        ("mdash", 8212),
        ("minus", 8722),
        ("Mu", 924),
        ("mu", 956),
        ("nabla", 8711),
        ("ndash", 8211),
        ("ne", 8800),
        ("ni", 8715),
        ("notin", 8713),
        ("nsub", 8836),
        ("Nu", 925),
        ("nu", 957),
        ("OElig", 338),
        ("oelig", 339),
        ("oline", 8254),
        ("Omega", 937),
        ("omega", 969),
        ("Omicron", 927),
        ("omicron", 959),
        ("oplus", 8853),
        ("or", 8744),
        ("otimes", 8855),
        ("part", 8706),
        ("permil", 8240),
        ("perp", 8869),
        ("Phi", 934),
        ("phi", 966),
        ("Pi", 928),
        ("pi", 960),
        ("piv", 982),
        ("prime", 8242),
        ("Prime", 8243),
        ("prod", 8719),
        ("prop", 8733),
        ("Psi", 936),
        ("psi", 968),
        ("radic", 8730),
        ("rang", 9002),
        ("rarr", 8594),
        ("rArr", 8658),
        ("rceil", 8969),
        ("rdquo", 8221),
        ("real", 8476),
        ("rfloor", 8971),
        ("Rho", 929),
        ("rho", 961),
        ("rlm", 8207),
        ("rsaquo", 8250),
        ("rsquo", 8217),
        ("sbquo", 8218),
        ("Scaron", 352),
        ("scaron", 353),
        ("sdot", 8901),
        ("Sigma", 931),
        ("sigma", 963),
        ("sigmaf", 962),
        ("sim", 8764),
        ("spades", 9824),
        ("sub", 8834),
        ("sube", 8838),
        ("sum", 8721),
        ("sup", 8835),
        ("supe", 8839),
        ("Tau", 932),
        ("tau", 964),
        ("there4", 8756),
        ("Theta", 920),
        ("theta", 952),
        ("thetasym", 977),
        ("thinsp", 8201),
        ("tilde", 732),
        ("trade", 8482),
        ("uarr", 8593),
        ("uArr", 8657),
        ("upsih", 978),
        ("Upsilon", 933),
        ("upsilon", 965),
        ("weierp", 8472),
        ("Xi", 926),
        ("xi", 958),
        ("Yuml", 376),
        ("Zeta", 918),
        ("zeta", 950),
        ("zwj", 8205),
        ("zwnj", 8204),
    ]
    .into_iter()
    .map(|(name, code_point)| (name.to_ascii_lowercase(), code_point))
    .collect()
});

/// Decode a Latin-1 entity name spelled exactly as in the table.
#[must_use]
pub fn latin1_exact(name: &str) -> Option<char> {
    LATIN1_ENTITIES.get(name).copied()
}

/// Decode a Latin-1 entity name ignoring ASCII case.
///
/// Names whose meaning depends on case (`AElig` and `aelig`) never match.
#[must_use]
pub fn latin1_ignore_case(name: &str) -> Option<char> {
    LATIN1_INSENSITIVE.get(&name.to_ascii_lowercase()).copied()
}

/// Whether `name` is a known entity whose value is outside Latin-1.
#[must_use]
pub fn is_multi_byte_entity(name: &str) -> bool {
    MULTI_BYTE_ENTITIES.contains_key(&name.to_ascii_lowercase())
}

/// The entity name used to escape `ch`, if it has one.
#[must_use]
pub fn name_for_char(ch: char) -> Option<&'static str> {
    LATIN1_NAMES.get(&ch).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_sensitive_pairs() {
        assert_eq!(latin1_exact("AElig"), Some('\u{C6}'));
        assert_eq!(latin1_exact("aelig"), Some('\u{E6}'));
        assert_eq!(latin1_exact("Aelig"), None);
        assert_eq!(latin1_ignore_case("Aelig"), None);
        assert_eq!(latin1_ignore_case("QUOT"), Some('"'));
    }

    #[test]
    fn test_multi_byte_names() {
        assert!(is_multi_byte_entity("hellip"));
        assert!(is_multi_byte_entity("Yuml"));
        assert!(!is_multi_byte_entity("amp"));
        assert_eq!(latin1_exact("yuml"), Some('\u{FF}'));
    }

    #[test]
    fn test_escape_names() {
        assert_eq!(name_for_char('&'), Some("amp"));
        assert_eq!(name_for_char('\u{A0}'), Some("nbsp"));
        assert_eq!(name_for_char('\''), None);
    }
}
