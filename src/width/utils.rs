//! Terminal display width helpers.
//!
//! Width is computed on ANSI-stripped text so pane truncation stays aligned
//! even when a history line carries escape sequences typed by the user.

/// Compute the display width of a string after stripping ANSI escapes.
pub fn display_width(text: &str) -> usize {
    let clean = strip_ansi_escapes::strip(text);
    let clean_str = String::from_utf8_lossy(&clean);
    unicode_width::UnicodeWidthStr::width(&*clean_str)
}

/// Strip ANSI escapes, replacing invalid UTF-8 with the replacement
/// character. History panes run every user-provided line through this so a
/// typed escape sequence cannot corrupt the frame.
pub fn sanitize_text(text: &str) -> String {
    let clean = strip_ansi_escapes::strip(text);
    String::from_utf8_lossy(&clean).into_owned()
}

/// Truncate `text` to at most `max_width` display columns.
pub fn truncate_display(text: &str, max_width: usize) -> String {
    if display_width(text) <= max_width {
        return text.to_string();
    }

    let mut result = String::new();
    let mut width = 0usize;
    for ch in text.chars() {
        let w = display_width(&ch.to_string());
        if width + w >= max_width {
            if width < max_width {
                result.push('…');
            }
            break;
        }
        width += w;
        result.push(ch);
    }
    result
}
