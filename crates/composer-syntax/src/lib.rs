//! # composer-syntax
//!
//! Lossless tokenizing of the HTML fragments the mail composer stores in
//! drafts, receives as reply content, and exchanges with the editing host.
//!
//! ## Architecture Overview
//!
//! ```text
//! Source HTML → Lexer → Tokens → (engine) tree builder → Document
//!               (Logos)   │
//!                         └── tag module: names, attributes, entities
//! ```
//!
//! ### 1. Lexer ([`lexer`] module)
//!
//! [Logos] splits the input into start tags, end tags, comments,
//! declarations and text. Every byte lands in exactly one token.
//!
//! ```text
//! "<div>a&amp;b<br></div>" → [StartTag, Text, StartTag, EndTag]
//! ```
//!
//! ### 2. Tag scanning ([`tag`] module)
//!
//! Start tags are scanned into a lower-cased name, attributes in source
//! order and a self-closing flag. Attribute values and text are decoded
//! with [html-escape].
//!
//! The tree itself lives in `composer-engine`, which owns the mutable
//! document the composer edits.
//!
//! [Logos]: https://docs.rs/logos
//! [html-escape]: https://docs.rs/html-escape
//!
//! ## Quick Start
//!
//! ```
//! use composer_syntax::{lex, parse_start_tag, TokenKind};
//!
//! let tokens = lex("<blockquote type=\"cite\">quoted</blockquote>");
//! assert_eq!(tokens[0].kind, TokenKind::StartTag);
//!
//! let tag = parse_start_tag(tokens[0].text).unwrap();
//! assert_eq!(tag.name, "blockquote");
//! assert_eq!(tag.attrs[0], ("type".to_string(), "cite".to_string()));
//! ```

pub mod lexer;
pub mod tag;

pub use lexer::{Token, TokenKind, lex, lex_with_spans};
pub use tag::{StartTag, comment_body, decode_text, parse_end_tag, parse_start_tag};

/// Elements that never have children or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];

/// Whether `tag` (lower-case) is a void element.
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_elements() {
        assert!(is_void_element("br"));
        assert!(is_void_element("img"));
        assert!(!is_void_element("span"));
    }

    #[test]
    fn lex_then_scan_round_trip_of_text() {
        let input = "<span class=\"-x-evo-quote-character\">&gt; </span>";
        let tokens = lex(input);
        assert_eq!(tokens.len(), 3);
        assert_eq!(decode_text(tokens[1].text), "> ");
    }
}
