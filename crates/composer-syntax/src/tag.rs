//! Scanning of individual tag tokens into names and attributes.

use std::borrow::Cow;

/// A parsed start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    /// Lower-cased tag name
    pub name: String,
    /// Attributes in source order, names lower-cased, values entity-decoded
    pub attrs: Vec<(String, String)>,
    pub self_closing: bool,
}

/// Parse a `StartTag` token such as `<img src="a.png" data-inline>`.
pub fn parse_start_tag(text: &str) -> Option<StartTag> {
    let inner = text.strip_prefix('<')?.strip_suffix('>')?;
    let name_end = inner
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_ascii_lowercase();
    if name.is_empty() {
        return None;
    }

    let mut attrs = Vec::new();
    let mut self_closing = false;
    let rest = &inner[name_end..];
    let bytes = rest.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        if bytes[i] == b'/' {
            i += 1;
            if rest[i..].trim().is_empty() {
                self_closing = true;
            }
            continue;
        }

        let start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' && bytes[i] != b'/'
        {
            i += 1;
        }
        let attr_name = rest[start..i].to_ascii_lowercase();

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = String::new();
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                i += 1;
                let value_start = i;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                value = decode_text(&rest[value_start..i]).into_owned();
                i = (i + 1).min(bytes.len());
            } else {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                value = decode_text(&rest[value_start..i]).into_owned();
            }
        }

        if !attr_name.is_empty() && !attrs.iter().any(|(n, _): &(String, String)| *n == attr_name) {
            attrs.push((attr_name, value));
        }
    }

    Some(StartTag {
        name,
        attrs,
        self_closing,
    })
}

/// Parse an `EndTag` token such as `</div >`, returning the lower-cased name.
pub fn parse_end_tag(text: &str) -> Option<String> {
    let name = text.strip_prefix("</")?.strip_suffix('>')?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_ascii_lowercase())
    }
}

/// The body of a `Comment` token without its delimiters.
pub fn comment_body(text: &str) -> &str {
    let body = text.strip_prefix("<!--").unwrap_or(text);
    body.strip_suffix("-->").unwrap_or(body)
}

/// Decode character references (`&amp;`, `&nbsp;`, `&#8203;`).
pub fn decode_text(text: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn parses_name_and_attributes() {
        let tag = parse_start_tag(r#"<BlockQuote TYPE="cite" id='-x-evo-main-cite'>"#).unwrap();
        assert_eq!(tag.name, "blockquote");
        assert_eq!(
            tag.attrs,
            vec![
                ("type".to_string(), "cite".to_string()),
                ("id".to_string(), "-x-evo-main-cite".to_string()),
            ]
        );
        assert!(!tag.self_closing);
    }

    #[test]
    fn parses_boolean_and_unquoted_attributes() {
        let tag = parse_start_tag("<img data-inline src=smile.png>").unwrap();
        assert_eq!(
            tag.attrs,
            vec![
                ("data-inline".to_string(), String::new()),
                ("src".to_string(), "smile.png".to_string()),
            ]
        );
    }

    #[test]
    fn decodes_attribute_entities() {
        let tag = parse_start_tag(r#"<a href="?a=1&amp;b=2">"#).unwrap();
        assert_eq!(tag.attrs[0].1, "?a=1&b=2");
    }

    #[rstest]
    #[case("<br/>", true)]
    #[case("<br />", true)]
    #[case("<br>", false)]
    fn detects_self_closing(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(parse_start_tag(input).unwrap().self_closing, expected);
    }

    #[test]
    fn duplicate_attributes_keep_first() {
        let tag = parse_start_tag(r#"<span class="a" class="b">"#).unwrap();
        assert_eq!(tag.attrs, vec![("class".to_string(), "a".to_string())]);
    }

    #[test]
    fn parses_end_tag() {
        assert_eq!(parse_end_tag("</DIV >"), Some("div".to_string()));
        assert_eq!(parse_end_tag("</>"), None);
    }

    #[test]
    fn strips_comment_delimiters() {
        assert_eq!(comment_body("<!-- note -->"), " note ");
        assert_eq!(comment_body("<!-- open"), " open");
    }

    #[test]
    fn decodes_nbsp_and_zero_width_space() {
        assert_eq!(decode_text("a&nbsp;b&#8203;"), "a\u{a0}b\u{200b}");
    }
}
