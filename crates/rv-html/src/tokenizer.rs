//! Byte-level HTML tokenizer.

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Doctype(String),
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End {
        name: String,
    },
    Text(String),
    Comment(String),
}

pub(crate) fn tokenize(source: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let bytes = source.as_bytes();
    let mut idx = 0_usize;

    while idx < bytes.len() {
        if bytes[idx] != b'<' {
            let next = find_byte(bytes, idx, b'<').unwrap_or(bytes.len());
            push_text(&mut out, decode_entities(&source[idx..next]));
            idx = next;
            continue;
        }

        if starts_with(bytes, idx, b"<!--") {
            let (comment, next) = read_comment(source, idx);
            out.push(Token::Comment(comment));
            idx = next;
            continue;
        }

        if starts_with_ignore_ascii_case(bytes, idx, b"<!doctype") {
            let end = skip_to_gt(bytes, idx.saturating_add(9));
            let inner = source[idx.saturating_add(9)..content_end(bytes, end)].trim();
            let name = inner
                .split_whitespace()
                .next()
                .unwrap_or("html")
                .to_ascii_lowercase();
            out.push(Token::Doctype(name));
            idx = end;
            continue;
        }

        if starts_with(bytes, idx, b"<!") || starts_with(bytes, idx, b"<?") {
            // Bogus comment: CDATA, processing instructions and friends.
            let end = skip_to_gt(bytes, idx.saturating_add(2)).max(idx.saturating_add(2));
            let body = &source[idx.saturating_add(2)..content_end(bytes, end)];
            out.push(Token::Comment(body.to_owned()));
            idx = end;
            continue;
        }

        if starts_with(bytes, idx, b"</") {
            match parse_end_tag(bytes, idx) {
                Some((token, next)) => {
                    out.push(token);
                    idx = next;
                }
                None => {
                    push_text(&mut out, "<".to_owned());
                    idx = idx.saturating_add(1);
                }
            }
            continue;
        }

        let Some((token, next)) = parse_start_tag(bytes, idx) else {
            push_text(&mut out, "<".to_owned());
            idx = idx.saturating_add(1);
            continue;
        };

        let raw_text_tag = match &token {
            Token::Start {
                name, self_closing, ..
            } if !*self_closing && raw_text_kind(name).is_some() => Some(name.clone()),
            _ => None,
        };

        out.push(token);
        idx = next;

        if let Some(tag_name) = raw_text_tag {
            let (raw_text, closing_end) = read_raw_text_until_end_tag(source, idx, &tag_name);
            if !raw_text.is_empty() {
                let text = if raw_text_kind(&tag_name) == Some(RawTextKind::Escapable) {
                    decode_entities(raw_text)
                } else {
                    raw_text.to_owned()
                };
                out.push(Token::Text(text));
            }
            out.push(Token::End { name: tag_name });
            idx = closing_end;
        }
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawTextKind {
    Raw,
    Escapable,
}

fn raw_text_kind(tag: &str) -> Option<RawTextKind> {
    match tag {
        "script" | "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawTextKind::Raw),
        "textarea" | "title" => Some(RawTextKind::Escapable),
        _ => None,
    }
}

fn push_text(out: &mut Vec<Token>, text: String) {
    if text.is_empty() {
        return;
    }
    if let Some(Token::Text(existing)) = out.last_mut() {
        existing.push_str(&text);
        return;
    }
    out.push(Token::Text(text));
}

fn read_comment(source: &str, start: usize) -> (String, usize) {
    let bytes = source.as_bytes();
    let body_start = start.saturating_add(4);
    match find_subslice(bytes, body_start, b"-->") {
        Some(end) => (source[body_start..end].to_owned(), end.saturating_add(3)),
        None => (
            source.get(body_start..).unwrap_or_default().to_owned(),
            bytes.len(),
        ),
    }
}

/// Returns the raw text and the index just past the closing tag (or end of input).
fn read_raw_text_until_end_tag<'a>(input: &'a str, start: usize, tag_name: &str) -> (&'a str, usize) {
    let bytes = input.as_bytes();
    let tag_bytes = tag_name.as_bytes();
    let mut idx = start;

    while idx < bytes.len() {
        if bytes[idx] == b'<'
            && bytes.get(idx.saturating_add(1)).copied() == Some(b'/')
            && starts_with_ignore_ascii_case(bytes, idx.saturating_add(2), tag_bytes)
            && tag_name_boundary(bytes, idx.saturating_add(2 + tag_bytes.len()))
        {
            let close = skip_to_gt(bytes, idx.saturating_add(2 + tag_bytes.len()));
            return (&input[start..idx], close);
        }

        idx = idx.saturating_add(1);
    }

    (&input[start..], bytes.len())
}

fn parse_end_tag(bytes: &[u8], start: usize) -> Option<(Token, usize)> {
    let mut idx = start.saturating_add(2);
    let begin = idx;
    while idx < bytes.len() && is_tag_name_char(bytes[idx]) {
        idx = idx.saturating_add(1);
    }
    if idx == begin || !bytes[begin].is_ascii_alphabetic() {
        return None;
    }

    let name = String::from_utf8_lossy(&bytes[begin..idx]).to_ascii_lowercase();
    let end = skip_to_gt(bytes, idx);
    Some((Token::End { name }, end))
}

fn parse_start_tag(bytes: &[u8], start: usize) -> Option<(Token, usize)> {
    let mut idx = start.saturating_add(1);
    let begin = idx;
    while idx < bytes.len() && is_tag_name_char(bytes[idx]) {
        idx = idx.saturating_add(1);
    }
    if idx == begin || !bytes[begin].is_ascii_alphabetic() {
        return None;
    }

    let name = String::from_utf8_lossy(&bytes[begin..idx]).to_ascii_lowercase();
    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        idx = skip_spaces(bytes, idx);
        let byte = bytes.get(idx).copied()?;

        if byte == b'>' {
            idx = idx.saturating_add(1);
            break;
        }

        if byte == b'/' {
            idx = skip_spaces(bytes, idx.saturating_add(1));
            if bytes.get(idx).copied() == Some(b'>') {
                self_closing = true;
                idx = idx.saturating_add(1);
                break;
            }
            continue;
        }

        let attr_start = idx;
        while idx < bytes.len() && is_attr_name_char(bytes[idx]) {
            idx = idx.saturating_add(1);
        }
        if idx == attr_start {
            idx = idx.saturating_add(1);
            continue;
        }

        let attr_name = String::from_utf8_lossy(&bytes[attr_start..idx]).to_ascii_lowercase();
        idx = skip_spaces(bytes, idx);

        let mut value = String::new();
        if bytes.get(idx).copied() == Some(b'=') {
            idx = skip_spaces(bytes, idx.saturating_add(1));
            match bytes.get(idx).copied() {
                Some(quote @ (b'"' | b'\'')) => {
                    idx = idx.saturating_add(1);
                    let value_start = idx;
                    while idx < bytes.len() && bytes[idx] != quote {
                        idx = idx.saturating_add(1);
                    }
                    value = String::from_utf8_lossy(&bytes[value_start..idx]).into_owned();
                    idx = idx.saturating_add(1).min(bytes.len());
                }
                _ => {
                    let value_start = idx;
                    while idx < bytes.len()
                        && !bytes[idx].is_ascii_whitespace()
                        && bytes[idx] != b'>'
                    {
                        idx = idx.saturating_add(1);
                    }
                    value = String::from_utf8_lossy(&bytes[value_start..idx]).into_owned();
                }
            }
        }

        // First occurrence wins, as in browsers.
        if !attrs.iter().any(|(existing, _)| *existing == attr_name) {
            attrs.push((attr_name, decode_entities(&value)));
        }
    }

    Some((
        Token::Start {
            name,
            attrs,
            self_closing,
        },
        idx,
    ))
}

pub(crate) fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_owned();
    }

    let mut out = String::with_capacity(input.len());
    let mut cursor = 0_usize;

    while let Some(rel_amp) = input[cursor..].find('&') {
        let amp = cursor + rel_amp;
        out.push_str(&input[cursor..amp]);

        let rest = &input[(amp + 1)..];
        let entity_len = rest
            .char_indices()
            .take(32)
            .find(|(_, ch)| *ch == ';')
            .map(|(index, _)| index);
        let decoded = entity_len.and_then(|len| decode_entity(&rest[..len]).map(|ch| (ch, len)));

        match decoded {
            Some((ch, len)) => {
                out.push_str(&ch);
                cursor = amp + 1 + len + 1;
            }
            None => {
                out.push('&');
                cursor = amp + 1;
            }
        }
    }

    out.push_str(&input[cursor..]);
    out
}

fn decode_entity(entity: &str) -> Option<String> {
    match entity {
        "nbsp" => Some("\u{a0}".to_owned()),
        "amp" => Some("&".to_owned()),
        "lt" => Some("<".to_owned()),
        "gt" => Some(">".to_owned()),
        "quot" => Some("\"".to_owned()),
        "apos" => Some("'".to_owned()),
        "copy" => Some("\u{a9}".to_owned()),
        "reg" => Some("\u{ae}".to_owned()),
        "hellip" => Some("\u{2026}".to_owned()),
        "mdash" => Some("\u{2014}".to_owned()),
        "ndash" => Some("\u{2013}".to_owned()),
        _ => {
            let (digits, radix) = match entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                Some(hex) => (hex, 16),
                None => (entity.strip_prefix('#')?, 10),
            };
            if digits.is_empty() || !digits.chars().all(|ch| ch.is_digit(radix)) {
                return None;
            }
            // NUL, surrogates and out-of-range values become U+FFFD.
            let ch = u32::from_str_radix(digits, radix)
                .ok()
                .filter(|code| *code != 0)
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            Some(ch.to_string())
        }
    }
}

/// End of the content before a `>` that closed at `end` (or `end` itself at EOF).
fn content_end(bytes: &[u8], end: usize) -> usize {
    if end > 0 && bytes.get(end - 1).copied() == Some(b'>') {
        end - 1
    } else {
        end
    }
}

fn skip_to_gt(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() {
        if bytes[idx] == b'>' {
            return idx.saturating_add(1);
        }
        idx = idx.saturating_add(1);
    }

    bytes.len()
}

fn tag_name_boundary(bytes: &[u8], idx: usize) -> bool {
    match bytes.get(idx).copied() {
        None => true,
        Some(byte) => byte.is_ascii_whitespace() || byte == b'>' || byte == b'/',
    }
}

fn skip_spaces(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx = idx.saturating_add(1);
    }
    idx
}

fn is_tag_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':')
}

fn is_attr_name_char(byte: u8) -> bool {
    !byte.is_ascii_whitespace() && !matches!(byte, b'>' | b'/' | b'=' | b'"' | b'\'')
}

fn starts_with(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    end <= bytes.len() && bytes[idx..end] == *pattern
}

fn starts_with_ignore_ascii_case(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    if end > bytes.len() {
        return false;
    }

    bytes[idx..end]
        .iter()
        .zip(pattern.iter())
        .all(|(left, right)| left.eq_ignore_ascii_case(right))
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }

    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn find_byte(bytes: &[u8], from: usize, byte: u8) -> Option<usize> {
    bytes[from..]
        .iter()
        .position(|candidate| *candidate == byte)
        .map(|offset| from + offset)
}

#[cfg(test)]
mod tests {
    use super::Token;
    use super::decode_entities;
    use super::tokenize;

    #[test]
    fn keeps_script_bodies_raw() {
        let tokens = tokenize("<script>if (a<b) { x = '</div>'; }</script>");
        assert_eq!(
            tokens,
            vec![
                Token::Start {
                    name: "script".to_owned(),
                    attrs: Vec::new(),
                    self_closing: false,
                },
                Token::Text("if (a<b) { x = '</div>'; }".to_owned()),
                Token::End {
                    name: "script".to_owned()
                },
            ]
        );
    }

    #[test]
    fn unterminated_script_runs_to_end_of_input() {
        let tokens = tokenize("<SCRIPT>var x = 1;");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1], Token::Text("var x = 1;".to_owned()));
    }

    #[test]
    fn parses_attributes_in_all_quoting_styles() {
        let tokens = tokenize("<a HREF=\"/x?a=1&amp;b=2\" data-id='7' hidden target=_blank>");
        let Some(Token::Start { name, attrs, .. }) = tokens.first() else {
            panic!("expected start tag, got {tokens:?}");
        };
        assert_eq!(name, "a");
        assert_eq!(
            attrs,
            &vec![
                ("href".to_owned(), "/x?a=1&b=2".to_owned()),
                ("data-id".to_owned(), "7".to_owned()),
                ("hidden".to_owned(), String::new()),
                ("target".to_owned(), "_blank".to_owned()),
            ]
        );
    }

    #[test]
    fn recognizes_doctype_and_comments() {
        let tokens = tokenize("<!DOCTYPE HTML><!-- note --><p>x</p>");
        assert_eq!(tokens[0], Token::Doctype("html".to_owned()));
        assert_eq!(tokens[1], Token::Comment(" note ".to_owned()));
    }

    #[test]
    fn stray_angle_brackets_stay_text() {
        let tokens = tokenize("1 < 2 and 3 <> 4");
        assert_eq!(tokens, vec![Token::Text("1 < 2 and 3 <> 4".to_owned())]);
    }

    #[test]
    fn decodes_named_and_numeric_entities() {
        assert_eq!(decode_entities("&lt;b&gt; &#65;&#x42; &bogus; &"), "<b> AB &bogus; &");
    }

    #[test]
    fn invalid_numeric_references_become_replacement_characters() {
        assert_eq!(decode_entities("a&#0;b"), "a\u{fffd}b");
        assert_eq!(decode_entities("&#xD800;&#x110000;"), "\u{fffd}\u{fffd}");
        assert_eq!(decode_entities("&#99999999999;"), "\u{fffd}");
        assert_eq!(decode_entities("&#;&#xZ;"), "&#;&#xZ;");
    }
}
