//! CSS tokenizer per [§ 4 Tokenization](https://www.w3.org/TR/css-syntax-3/#tokenization).

mod core;
/// CSS token types.
pub mod token;

pub use self::core::{CssTokenizer, tokenize};
pub(crate) use self::core::{is_ident_code_point, is_ident_start_code_point, is_whitespace};
pub use token::{CssToken, HashType, Span, Token};
