//! Whitespace normalization for scraped text.
//!
//! Announcement tables are hand-edited HTML: cells arrive with stray
//! newlines, full-width spaces (U+3000), and uneven indentation. Two rows
//! that differ only in that incidental whitespace must compare (and hash)
//! identically, so every consumer goes through these helpers. All three
//! are total over strings.

/// Trim and collapse internal whitespace runs to single ASCII spaces.
pub fn collapse(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Remove all whitespace entirely.
///
/// Used for cell cleanup where the source never carries meaningful spaces
/// (names, category labels) and as the pre-hash normalization step.
pub fn strip(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Remove control characters that would mangle a one-line error message.
pub fn strip_control(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\u{c}' | '\n' | '\r'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_trims_and_collapses_runs() {
        assert_eq!(collapse("  a  b\t\nc  "), "a b c");
        assert_eq!(collapse("already clean"), "already clean");
        assert_eq!(collapse(""), "");
        assert_eq!(collapse("   \n\t "), "");
    }

    #[test]
    fn collapse_handles_fullwidth_space() {
        assert_eq!(collapse("憲法\u{3000}I"), "憲法 I");
    }

    #[test]
    fn strip_removes_all_whitespace() {
        assert_eq!(strip(" 山田 \n 太郎 "), "山田太郎");
        assert_eq!(strip("a\u{3000}b"), "ab");
        assert_eq!(strip(""), "");
    }

    #[test]
    fn strip_control_keeps_visible_text() {
        assert_eq!(strip_control("bad\nrow\rtext\u{c}"), "badrowtext");
        assert_eq!(strip_control("plain"), "plain");
    }
}
