//! # Lexer - Tokenizing HTML Fragments
//!
//! This module breaks composer HTML into a flat sequence of tokens using the
//! [Logos] lexer generator.
//!
//! [Logos]: https://docs.rs/logos
//!
//! ## The Lossless Guarantee
//!
//! Every byte in the input appears in exactly one token. Nothing is skipped,
//! so concatenating the token texts gives back the original fragment:
//!
//! ```
//! use composer_syntax::lexer::lex;
//!
//! let input = "<div class=\"-x-evo-paragraph\">Hello &amp; bye<br></div>";
//! let tokens = lex(input);
//!
//! let reconstructed: String = tokens.iter().map(|t| t.text).collect();
//! assert_eq!(input, reconstructed);
//! ```
//!
//! ## Token Design
//!
//! Tokens are context-free. The lexer does not know whether `<br>` is void
//! or whether a `</span>` closes anything; that is the tree builder's job in
//! the engine. Markup that cannot be recognised as a tag (a lone `<` in
//! prose, an unterminated tag) falls back to [`TokenKind::Text`].

use logos::{Lexer, Logos};

/// Token kinds produced by the Logos lexer.
///
/// The `#[logos(skip r"")]` attribute means "skip nothing".
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"")]
pub enum TokenKind {
    /// `<!-- ... -->`, runs to end of input when unterminated
    #[token("<!--", comment)]
    Comment,

    /// `<!DOCTYPE ...>` and `<?...>` declarations
    #[regex(r"<![A-Za-z][^>]*>")]
    #[regex(r"<\?[^>]*>")]
    Declaration,

    /// `<tag attr="value">`, including self-closing `<br/>`
    #[regex(r#"<[A-Za-z][A-Za-z0-9:-]*([^>"']|"[^"]*"|'[^']*')*>"#)]
    StartTag,

    /// `</tag>`
    #[regex(r"</[A-Za-z][A-Za-z0-9:-]*[ \t\r\n]*>")]
    EndTag,

    /// Character data, still entity-encoded
    #[regex(r"[^<]+")]
    Text,
}

fn comment(lex: &mut Lexer<TokenKind>) {
    let rest = lex.remainder();
    match rest.find("-->") {
        Some(end) => lex.bump(end + 3),
        None => lex.bump(rest.len()),
    }
}

/// A lexed token with its kind and text slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

/// Lex the input into a sequence of tokens.
///
/// Guarantees that all bytes from the input appear in the output tokens.
pub fn lex(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);

    while let Some(result) = lexer.next() {
        let text = lexer.slice();
        // Logos error means a stray `<` - treat as TEXT
        let kind = result.unwrap_or(TokenKind::Text);
        tokens.push(Token { kind, text });
    }

    tokens
}

/// Lex and return tokens along with their byte spans.
pub fn lex_with_spans(input: &str) -> Vec<(Token<'_>, std::ops::Range<usize>)> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let text = lexer.slice();
        let kind = result.unwrap_or(TokenKind::Text);
        tokens.push((Token { kind, text }, span));
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token(kind: TokenKind, text: &str) -> Token<'_> {
        Token { kind, text }
    }

    #[test]
    fn lex_empty_input() {
        assert_eq!(lex(""), vec![]);
    }

    #[test]
    fn lex_plain_text() {
        assert_eq!(lex("hello"), vec![token(TokenKind::Text, "hello")]);
    }

    #[test]
    fn lex_paragraph() {
        let tokens = lex("<div class=\"-x-evo-paragraph\">hi</div>");
        assert_eq!(
            tokens,
            vec![
                token(TokenKind::StartTag, "<div class=\"-x-evo-paragraph\">"),
                token(TokenKind::Text, "hi"),
                token(TokenKind::EndTag, "</div>"),
            ]
        );
    }

    #[test]
    fn lex_quoted_attribute_with_gt() {
        let tokens = lex("<a title='a > b'>x</a>");
        assert_eq!(tokens[0], token(TokenKind::StartTag, "<a title='a > b'>"));
    }

    #[test]
    fn lex_comment() {
        let tokens = lex("a<!-- <b> -->c");
        assert_eq!(
            tokens,
            vec![
                token(TokenKind::Text, "a"),
                token(TokenKind::Comment, "<!-- <b> -->"),
                token(TokenKind::Text, "c"),
            ]
        );
    }

    #[test]
    fn lex_unterminated_comment() {
        let tokens = lex("<!-- open");
        assert_eq!(tokens, vec![token(TokenKind::Comment, "<!-- open")]);
    }

    #[test]
    fn lex_doctype() {
        let tokens = lex("<!DOCTYPE html><html>");
        assert_eq!(
            tokens,
            vec![
                token(TokenKind::Declaration, "<!DOCTYPE html>"),
                token(TokenKind::StartTag, "<html>"),
            ]
        );
    }

    #[test]
    fn lex_stray_lt_is_text() {
        let tokens = lex("1 < 2");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert!(kinds.iter().all(|k| *k == TokenKind::Text));
        let reconstructed: String = tokens.iter().map(|t| t.text).collect();
        assert_eq!(reconstructed, "1 < 2");
    }

    #[test]
    fn all_bytes_preserved_complex() {
        let input = "<blockquote type=\"cite\"><div>&gt; quoted<br/></div></blockquote><!--x-->tail";
        let tokens = lex(input);
        let reconstructed: String = tokens.iter().map(|t| t.text).collect();
        assert_eq!(input, reconstructed);
    }

    #[test]
    fn spans_are_correct() {
        let input = "<b>hello</b> world";
        for (token, span) in &lex_with_spans(input) {
            assert_eq!(token.text, &input[span.clone()]);
        }
    }
}
