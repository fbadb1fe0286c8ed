//! Decoding of source files whose encoding is not known up front.

use encoding_rs::Encoding;

const SNIFF_PREFIX_BYTES: usize = 8192;

/// Decodes `body` using, in order, its byte-order mark, a `charset=` found
/// in the first few kilobytes, then UTF-8 with replacement.
pub(crate) fn decode_source(body: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(body) {
        let (decoded, _) = encoding.decode_without_bom_handling(&body[bom_len..]);
        return decoded.into_owned();
    }

    if let Some(label) = parse_charset_from_html_prefix(body) {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            let (decoded, _, _) = encoding.decode(body);
            return decoded.into_owned();
        }
    }

    String::from_utf8_lossy(body).into_owned()
}

fn parse_charset_from_html_prefix(body: &[u8]) -> Option<String> {
    let prefix_len = body.len().min(SNIFF_PREFIX_BYTES);
    let prefix = String::from_utf8_lossy(&body[..prefix_len]);
    let lower = prefix.to_ascii_lowercase();
    let mut search_start = 0_usize;

    while let Some(relative) = lower[search_start..].find("charset=") {
        let charset_start = search_start + relative + "charset=".len();
        if let Some(label) = parse_charset_label(&prefix[charset_start..]) {
            return Some(label);
        }
        search_start = charset_start;
    }

    None
}

fn parse_charset_label(input: &str) -> Option<String> {
    let trimmed = input.trim_start();
    let first = trimmed.chars().next()?;

    let label = if first == '"' || first == '\'' {
        let rest = &trimmed[first.len_utf8()..];
        let end = rest.find(first)?;
        rest[..end].trim()
    } else {
        let end = trimmed
            .find(|ch: char| ch.is_whitespace() || matches!(ch, '"' | '\'' | ';' | '>' | '/'))
            .unwrap_or(trimmed.len());
        trimmed[..end].trim()
    };

    (!label.is_empty()).then(|| label.to_owned())
}

/// Cuts `input` to at most `max_chars` characters on one line.
pub(crate) fn one_line_preview(input: &str, max_chars: usize) -> String {
    let flat: String = input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut out: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::decode_source;
    use super::one_line_preview;
    use super::parse_charset_from_html_prefix;

    #[test]
    fn finds_quoted_and_bare_meta_charsets() {
        let quoted = b"<meta charset=\"windows-1252\">";
        assert_eq!(
            parse_charset_from_html_prefix(quoted).as_deref(),
            Some("windows-1252")
        );
        let bare = b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=ISO-8859-1\">";
        assert_eq!(
            parse_charset_from_html_prefix(bare).as_deref(),
            Some("ISO-8859-1")
        );
    }

    #[test]
    fn decodes_legacy_encodings_from_meta() {
        let html = b"<meta charset=\"windows-1252\"><p>caf\xE9</p>";
        assert!(decode_source(html).contains("caf\u{e9}"));
    }

    #[test]
    fn bom_wins_over_meta() {
        let html = b"\xEF\xBB\xBF<meta charset=\"windows-1252\"><p>\xE2\x82\xAC</p>";
        let decoded = decode_source(html);
        assert!(decoded.starts_with("<meta"));
        assert!(decoded.contains('\u{20AC}'));
    }

    #[test]
    fn previews_stay_on_one_line() {
        assert_eq!(one_line_preview("<p>\n  hi\n</p>", 40), "<p> hi </p>");
        assert_eq!(one_line_preview("abcdefghij", 6), "abc...");
    }
}
