//! Plain-text to HTML conversion for card content

/// Placeholder paragraph that keeps the rich-text surface editable when a
/// card has no content.
pub const EMPTY_PARAGRAPH: &str = "<p><br></p>";

/// Escape the five HTML-reserved characters.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Convert raw multi-line text into a sanitized HTML fragment.
///
/// Each trimmed, non-empty line becomes one `<p>` element with reserved
/// characters escaped. Input with no non-empty lines produces
/// [`EMPTY_PARAGRAPH`]. Pure and total.
#[must_use]
pub fn plain_text_to_html(raw: &str) -> String {
    let paragraphs: String = raw
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("<p>{}</p>", escape_html(line)))
        .collect();

    if paragraphs.is_empty() {
        EMPTY_PARAGRAPH.to_string()
    } else {
        paragraphs
    }
}

/// Normalize editor markup before saving, falling back to the placeholder
/// when it trims to nothing.
#[must_use]
pub fn normalize_card_html(html: &str) -> String {
    let trimmed = html.trim();
    if trimmed.is_empty() {
        EMPTY_PARAGRAPH.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_becomes_placeholder() {
        assert_eq!(plain_text_to_html(""), EMPTY_PARAGRAPH);
        assert_eq!(plain_text_to_html("   \n \n\t "), EMPTY_PARAGRAPH);
    }

    #[test]
    fn lines_become_paragraphs() {
        assert_eq!(plain_text_to_html("a\n\nb"), "<p>a</p><p>b</p>");
        assert_eq!(plain_text_to_html("  spaced  "), "<p>spaced</p>");
    }

    #[test]
    fn markup_is_escaped() {
        let html = plain_text_to_html("<script>alert('hi')</script>");
        assert!(!html.replace("<p>", "").replace("</p>", "").contains('<'));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&#39;hi&#39;"));
    }

    #[test]
    fn ampersands_and_quotes_are_escaped() {
        assert_eq!(
            plain_text_to_html("a & \"b\""),
            "<p>a &amp; &quot;b&quot;</p>"
        );
    }

    #[test]
    fn crlf_lines_are_handled() {
        assert_eq!(plain_text_to_html("a\r\nb"), "<p>a</p><p>b</p>");
    }

    #[test]
    fn normalize_keeps_markup_and_falls_back_when_blank() {
        assert_eq!(normalize_card_html("  <p>kept</p>  "), "<p>kept</p>");
        assert_eq!(normalize_card_html("   "), EMPTY_PARAGRAPH);
        assert_eq!(normalize_card_html(EMPTY_PARAGRAPH), EMPTY_PARAGRAPH);
    }
}
