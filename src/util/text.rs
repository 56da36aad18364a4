use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string in terminal columns (CJK and emoji count as 2).
///
/// ```
/// use smartmarks::util::display_width;
///
/// assert_eq!(display_width("Hello"), 5);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Truncates a string to at most `max_width` columns, appending "..." when
/// something was cut.
///
/// Widths of 3 or less have no room for an ellipsis, so the result is simply
/// the longest prefix that fits. Returns `Cow::Borrowed` when nothing is cut.
///
/// ```
/// use smartmarks::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// assert_eq!(truncate_to_width("Test", 2), "Te");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    if max_width <= ELLIPSIS_WIDTH {
        let end = prefix_end(s, max_width);
        return Cow::Owned(s[..end].to_string());
    }

    let end = prefix_end(s, max_width - ELLIPSIS_WIDTH);
    Cow::Owned(format!("{}{}", &s[..end], ELLIPSIS))
}

/// Byte index ending the longest prefix of `s` that fits in `width` columns.
fn prefix_end(s: &str, width: usize) -> usize {
    let mut used = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width {
            return idx;
        }
        used += w;
    }
    s.len()
}

fn is_stripped_control(b: u8) -> bool {
    b == 0x7f || (b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r')
}

/// Strip terminal control characters and ANSI escape sequences.
///
/// Bookmark titles and URLs are written by other sessions and rendered
/// verbatim in the terminal, so CSI (`ESC [ ... final`), OSC
/// (`ESC ] ... BEL|ST`), bare ESC, DEL and C0 controls are removed. Tab,
/// newline and carriage return are kept.
///
/// Returns `Cow::Borrowed` when there is nothing to strip.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    if !bytes.iter().any(|&b| b == 0x1b || is_stripped_control(b)) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    let mut run_start = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b != 0x1b && !is_stripped_control(b) {
            i += 1;
            continue;
        }

        // Control bytes are ASCII, so the run boundary is a char boundary.
        out.push_str(&s[run_start..i]);

        if b == 0x1b {
            i = skip_escape(bytes, i);
        } else {
            i += 1;
        }
        run_start = i;
    }
    out.push_str(&s[run_start..]);

    Cow::Owned(out)
}

/// Returns the index just past the escape sequence starting at `start` (an ESC byte).
fn skip_escape(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    match bytes.get(i) {
        Some(b'[') => {
            i += 1;
            while i < bytes.len() {
                let c = bytes[i];
                i += 1;
                if (0x40..=0x7e).contains(&c) {
                    break;
                }
            }
            i
        }
        Some(b']') => {
            i += 1;
            while i < bytes.len() {
                if bytes[i] == 0x07 {
                    return i + 1;
                }
                if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                    return i + 2;
                }
                i += 1;
            }
            i
        }
        _ => i,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
        assert_eq!(truncate_to_width("12345", 5), "12345");
        assert_eq!(truncate_to_width("Testing", 4), "T...");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // Each CJK char is 2 columns: 8 total, target 4 + "..."
        assert_eq!(truncate_to_width("日本語です", 7), "日本...");
        assert_eq!(truncate_to_width("日本", 3), "日");
        assert_eq!(truncate_to_width("日本", 1), "");
    }

    #[test]
    fn test_truncate_narrow_widths() {
        assert_eq!(truncate_to_width("Test", 0), "");
        assert_eq!(truncate_to_width("Test", 1), "T");
        assert_eq!(truncate_to_width("Test", 3), "Tes");
    }

    #[test]
    fn test_truncate_borrows_when_fitting() {
        assert!(matches!(truncate_to_width("fits", 10), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_clean_text_borrowed() {
        let input = "line1\nline2\ttabbed\r\n";
        assert!(matches!(strip_control_chars(input), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_controls_and_del() {
        assert_eq!(strip_control_chars("he\x00ll\x07o\x7f!"), "hello!");
    }

    #[test]
    fn test_strip_csi_sequences() {
        assert_eq!(strip_control_chars("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_control_chars("a\x1b[2Ab"), "ab");
    }

    #[test]
    fn test_strip_osc_sequences() {
        assert_eq!(strip_control_chars("\x1b]0;title\x07safe"), "safe");
        assert_eq!(strip_control_chars("\x1b]0;title\x1b\\safe"), "safe");
    }

    #[test]
    fn test_strip_bare_and_trailing_esc() {
        assert_eq!(strip_control_chars("before\x1bafter"), "beforeafter");
        assert_eq!(strip_control_chars("end\x1b"), "end");
    }

    #[test]
    fn test_strip_preserves_unicode() {
        assert_eq!(strip_control_chars("日本 \x1b[1m語\x1b[0m"), "日本 語");
    }
}
