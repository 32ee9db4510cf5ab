//! Length bounding, normalization and mention defanging.

use regex::{Captures, Regex};

/// Zero-width space inserted into mention tokens.
pub const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// Truncates `text` to `max_chars` characters and appends `marker` if it was
/// longer. Returns the text unchanged otherwise.
pub fn bound_length(text: &str, max_chars: usize, marker: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut bounded = String::with_capacity(cut + marker.len());
            bounded.push_str(&text[..cut]);
            bounded.push_str(marker);
            bounded
        }
        None => text.to_string(),
    }
}

/// Unifies line endings to `\n` and trims outer whitespace.
pub fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}

/// Neutralizes mass mentions and mention tokens so they render the same but
/// do not notify anyone.
#[derive(Debug)]
pub struct Defanger {
    /// `<@123>`, `<@!123>`, `<@&123>` and `<#123>`.
    mention: Regex,
}

impl Default for Defanger {
    fn default() -> Self {
        Self::new()
    }
}

impl Defanger {
    /// # Panics
    /// Panics only if the built-in pattern literal is invalid.
    pub fn new() -> Self {
        Self {
            mention: Regex::new(r"<(?:@[!&]?|#)\d+>")
                .expect("built-in mention pattern must compile"),
        }
    }

    /// Inserts a zero-width space after `@` in `@everyone`/`@here` and after
    /// `<` in mention tokens. Applying it twice is the same as applying it once.
    pub fn defang(&self, text: &str) -> String {
        let text = text
            .replace("@everyone", "@\u{200B}everyone")
            .replace("@here", "@\u{200B}here");

        self.mention
            .replace_all(&text, |caps: &Captures| {
                let token = &caps[0];
                format!("<{}{}", ZERO_WIDTH_SPACE, &token[1..])
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_length_leaves_short_text() {
        assert_eq!(bound_length("short", 10, "[cut]"), "short");
        assert_eq!(bound_length("exactly10!", 10, "[cut]"), "exactly10!");
    }

    #[test]
    fn test_bound_length_truncates_and_marks() {
        assert_eq!(bound_length("abcdefghijkl", 10, "[cut]"), "abcdefghij[cut]");
    }

    #[test]
    fn test_bound_length_counts_chars_not_bytes() {
        let text = "é".repeat(12);
        let bounded = bound_length(&text, 10, "!");
        assert_eq!(bounded.chars().count(), 11);
        assert!(bounded.ends_with('!'));
    }

    #[test]
    fn test_normalize_line_endings_and_trim() {
        assert_eq!(normalize("  a\r\nb\rc\n  "), "a\nb\nc");
        assert_eq!(normalize(" \r\n\t "), "");
    }

    #[test]
    fn test_defang_mass_mentions() {
        let defanger = Defanger::new();
        assert_eq!(
            defanger.defang("hey @everyone and @here"),
            "hey @\u{200B}everyone and @\u{200B}here"
        );
    }

    #[test]
    fn test_defang_mention_tokens() {
        let defanger = Defanger::new();
        assert_eq!(defanger.defang("<@123>"), "<\u{200B}@123>");
        assert_eq!(defanger.defang("<@!456>"), "<\u{200B}@!456>");
        assert_eq!(defanger.defang("<@&789>"), "<\u{200B}@&789>");
        assert_eq!(defanger.defang("see <#42>"), "see <\u{200B}#42>");
    }

    #[test]
    fn test_defang_ignores_non_mentions() {
        let defanger = Defanger::new();
        let text = "email me@example.com, <b>bold</b>, <@name>, <#>";
        assert_eq!(defanger.defang(text), text);
    }

    #[test]
    fn test_defang_is_idempotent() {
        let defanger = Defanger::new();
        let text = "@everyone <@1> <@!2> <@&3> <#4> @here @here";
        let once = defanger.defang(text);
        let twice = defanger.defang(&once);
        assert_eq!(once, twice);
    }
}
