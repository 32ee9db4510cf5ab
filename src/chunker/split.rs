//! Boundary-aware splitting with code fence repair.

use super::MIN_CHUNK_LIMIT;

/// Triple-backtick code fence marker.
pub const FENCE: &str = "```";

/// Appended to a chunk that ends inside a code block.
pub const CLOSE_FENCE: &str = "\n```";

/// Prepended to the text following such a chunk.
pub const OPEN_FENCE: &str = "```\n";

/// Number of fence markers in `text`.
pub fn fence_count(text: &str) -> usize {
    text.matches(FENCE).count()
}

/// True if `text` opens a code block it does not close.
pub fn has_unclosed_fence(text: &str) -> bool {
    fence_count(text) % 2 == 1
}

/// Byte offset just past the first `chars` characters of `text`.
fn char_boundary(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Picks the byte offset at which to end the next chunk.
///
/// Only the first `budget` characters are considered. Preference order is
/// paragraph break, line break, sentence end, then a hard cut. Candidates at
/// or before `floor` (a byte offset) are ignored so a re-opened fence prefix
/// is never split off on its own.
pub fn find_split(text: &str, budget: usize, floor: usize) -> usize {
    let end = char_boundary(text, budget);
    let window = &text[..end];

    if let Some(i) = window.rfind("\n\n").filter(|&i| i > floor) {
        return i + 2;
    }
    if let Some(i) = window.rfind('\n').filter(|&i| i > floor) {
        return i + 1;
    }
    if let Some(i) = window.rfind(". ").filter(|&i| i > floor) {
        return i + 2;
    }

    hard_cut(text, end, floor)
}

/// Cuts at `end`, stepping back so a run of backticks is not torn apart.
fn hard_cut(text: &str, end: usize, floor: usize) -> usize {
    let bytes = text.as_bytes();
    let mut cut = end;
    while cut > floor + 1 && cut < bytes.len() && bytes[cut - 1] == b'`' && bytes[cut] == b'`' {
        cut -= 1;
    }
    cut
}

/// First char boundary past `floor`, so every split consumes input.
fn min_progress(text: &str, floor: usize) -> usize {
    text[floor..]
        .chars()
        .next()
        .map_or(text.len(), |c| floor + c.len_utf8())
}

/// Splits normalized text into pieces of at most `limit` characters.
///
/// A piece that ends inside a code block gets a closing fence, and the text
/// after it is re-opened with a fence, so every piece renders on its own.
/// Limits below [`MIN_CHUNK_LIMIT`] are raised to it.
pub fn split_into_chunks(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(MIN_CHUNK_LIMIT);
    let tight = limit.saturating_sub(CLOSE_FENCE.len()).max(1);
    let mut chunks = Vec::new();
    let mut rest = text.to_string();
    let mut floor = 0;

    loop {
        let len = rest.chars().count();
        let unclosed = has_unclosed_fence(&rest);

        if len <= limit && !unclosed {
            break;
        }
        if unclosed && len + CLOSE_FENCE.len() <= limit {
            rest.push_str(CLOSE_FENCE);
            break;
        }

        let progress = min_progress(&rest, floor);
        let mut split = find_split(&rest, limit, floor).max(progress);
        let mut head = rest[..split].trim_end();
        if has_unclosed_fence(head) && head.chars().count() + CLOSE_FENCE.len() > limit {
            split = find_split(&rest, tight, floor).max(progress);
            head = rest[..split].trim_end();
        }

        let mut chunk = head.to_string();
        let tail = rest[split..].trim_start();

        rest = if has_unclosed_fence(&chunk) {
            chunk.push_str(CLOSE_FENCE);
            floor = OPEN_FENCE.len();
            format!("{}{}", OPEN_FENCE, tail)
        } else {
            floor = 0;
            tail.to_string()
        };
        chunks.push(chunk);
    }

    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_within(chunks: &[String], limit: usize) {
        for (i, chunk) in chunks.iter().enumerate() {
            assert!(
                chunk.chars().count() <= limit,
                "chunk {} has {} chars (limit {})",
                i,
                chunk.chars().count(),
                limit
            );
        }
    }

    // ==================== find_split Tests ====================

    #[test]
    fn test_prefers_paragraph_break() {
        let text = "aaaa\n\nbbbb\ncccc. dddd";
        assert_eq!(find_split(text, 20, 0), 6);
    }

    #[test]
    fn test_falls_back_to_line_break() {
        let text = "aaaa bbbb\ncccc. dddd eeee";
        assert_eq!(find_split(text, 20, 0), 10);
    }

    #[test]
    fn test_falls_back_to_sentence_end() {
        let text = "aaaa. bbbb cccc dddd eeee";
        assert_eq!(find_split(text, 20, 0), 6);
    }

    #[test]
    fn test_hard_cut_when_no_boundary() {
        let text = "a".repeat(50);
        assert_eq!(find_split(&text, 20, 0), 20);
    }

    #[test]
    fn test_boundary_at_start_is_ignored() {
        // A break at index 0 would produce an empty chunk.
        let text = "\nabcdefghijklmnopqrstuvwxyz";
        assert_eq!(find_split(text, 10, 0), 10);
    }

    #[test]
    fn test_floor_skips_reopened_fence() {
        let text = format!("{}{}", OPEN_FENCE, "x".repeat(40));
        assert_eq!(find_split(&text, 20, OPEN_FENCE.len()), 20);
    }

    #[test]
    fn test_hard_cut_does_not_tear_backticks() {
        let text = format!("{}```{}", "a".repeat(18), "b".repeat(20));
        // A cut at 20 would land between the second and third backtick.
        assert_eq!(find_split(&text, 20, 0), 18);
    }

    #[test]
    fn test_split_respects_multibyte_chars() {
        let text = "é".repeat(30);
        let split = find_split(&text, 10, 0);
        assert!(text.is_char_boundary(split));
        assert_eq!(text[..split].chars().count(), 10);
    }

    // ==================== split_into_chunks Tests ====================

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_into_chunks("hello", 20), vec!["hello".to_string()]);
    }

    #[test]
    fn test_split_trims_around_boundary() {
        let text = format!("{}\n\n{}", "a".repeat(15), "b".repeat(15));
        let chunks = split_into_chunks(&text, 20);
        assert_eq!(chunks, vec!["a".repeat(15), "b".repeat(15)]);
    }

    #[test]
    fn test_fence_crossing_boundary_is_repaired() {
        let code: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        let text = format!("intro\n```rust\n{}```\noutro", code);
        let chunks = split_into_chunks(&text, 60);

        assert!(chunks.len() > 1);
        assert_within(&chunks, 60);
        for chunk in &chunks {
            assert_eq!(fence_count(chunk) % 2, 0, "unbalanced chunk: {:?}", chunk);
        }
        assert!(chunks[0].ends_with(CLOSE_FENCE));
        assert!(chunks[1].starts_with(OPEN_FENCE));
    }

    #[test]
    fn test_close_fence_never_exceeds_limit() {
        // No line breaks: every chunk is a hard cut inside one code block.
        let text = format!("```{}```", "x".repeat(200));
        let chunks = split_into_chunks(&text, 40);

        assert_within(&chunks, 40);
        for chunk in &chunks {
            assert!(!has_unclosed_fence(chunk), "unbalanced chunk: {:?}", chunk);
        }
    }

    #[test]
    fn test_unbalanced_input_gets_closed() {
        let chunks = split_into_chunks("```\nlet x = 1;", 40);
        assert_eq!(chunks, vec!["```\nlet x = 1;\n```".to_string()]);
    }

    #[test]
    fn test_unbalanced_input_near_limit_is_split() {
        let text = format!("```\n{}", "y".repeat(34));
        let chunks = split_into_chunks(&text, 40);

        assert!(chunks.len() >= 2);
        assert_within(&chunks, 40);
        for chunk in &chunks {
            assert!(!has_unclosed_fence(chunk), "unbalanced chunk: {:?}", chunk);
        }
    }

    #[test]
    fn test_tiny_limit_still_terminates() {
        for limit in [0, 1, 3] {
            let chunks = split_into_chunks("```\nsome code that is long\n```", limit);
            assert!(chunks.len() > 1);
            assert_within(&chunks, MIN_CHUNK_LIMIT);
            for chunk in &chunks {
                assert!(!chunk.is_empty());
                assert!(!has_unclosed_fence(chunk), "unbalanced chunk: {:?}", chunk);
            }
        }
    }

    #[test]
    fn test_fenced_content_survives_split() {
        let code: String = (0..60).map(|i| format!("let value_{} = {};\n", i, i)).collect();
        let text = format!("Intro line.\n```\n{}```\nOutro line.", code);
        let chunks = split_into_chunks(&text, 80);
        assert!(chunks.len() > 2);

        // A repaired boundary is a chunk ending in a close fence followed by
        // one starting with an open fence; the block is opened only once.
        let repaired: Vec<bool> = chunks
            .windows(2)
            .map(|w| w[0].ends_with(CLOSE_FENCE) && w[1].starts_with(OPEN_FENCE))
            .collect();
        assert!(repaired.iter().any(|&r| r));

        let pieces: Vec<&str> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let mut piece = chunk.as_str();
                if i > 0 && repaired[i - 1] {
                    piece = &piece[OPEN_FENCE.len()..];
                }
                if i < repaired.len() && repaired[i] {
                    piece = &piece[..piece.len() - CLOSE_FENCE.len()];
                }
                piece
            })
            .collect();

        assert_eq!(pieces.join("\n"), text);
    }

    #[test]
    fn test_content_survives_split() {
        let sentences: Vec<String> = (0..120).map(|i| format!("Sentence {}", i)).collect();
        let text = sentences.join(". ");
        let chunks = split_into_chunks(&text, 50);

        let rejoined = chunks.join(" ");
        assert_eq!(rejoined, text);
    }
}
