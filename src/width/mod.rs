//! Terminal display width helpers.
//!
//! Fragment text may already carry escape sequences, so widths are measured
//! after stripping ANSI codes.

/// Compute the display width of a string after stripping ANSI escapes.
pub fn display_width(text: &str) -> usize {
    let clean = strip_ansi_escapes::strip(text);
    let clean_str = String::from_utf8_lossy(&clean);
    unicode_width::UnicodeWidthStr::width(&*clean_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_escape_sequences() {
        assert_eq!(display_width("\u{1b}[1;31mabc\u{1b}[0m"), 3);
    }

    #[test]
    fn counts_wide_glyphs() {
        assert_eq!(display_width("日本"), 4);
        assert_eq!(display_width("❯"), 1);
    }
}
