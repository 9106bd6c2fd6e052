//! Text cleaning: transliteration, line joining, and sentence-aware wrapping.

use deunicode::deunicode;

/// True if the text ends with sentence-final punctuation, optionally followed
/// by a single closing quote.
pub fn end_of_paragraph(text: &str) -> bool {
    let trimmed = text.strip_suffix(['\'', '"']).unwrap_or(text);
    trimmed.ends_with(['.', '?', '!'])
}

/// Recursively splits `text` into pieces of at most `max_chars` characters,
/// joined by blank lines. Breaks after the space following the last
/// sentence-final punctuation mark before the boundary; failing that, at the
/// last space; failing that, hard at the boundary.
pub fn split_text(text: &str, max_chars: usize) -> String {
    // A zero budget cannot make progress; leave the text unwrapped.
    if max_chars == 0 || text.chars().count() <= max_chars {
        return text.to_string();
    }
    let boundary = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..boundary];
    let break_at = match head.rfind(['.', '?', '!']) {
        Some(p) => head[p..].find(' ').map(|off| p + off),
        None => head.rfind(' '),
    }
    .unwrap_or(boundary);
    let (chunk, rest) = text.split_at(break_at);
    format!("{}\n\n{}", chunk, split_text(rest.trim_start(), max_chars))
}

/// Cleans raw text into consistently spaced, line-wrapped prose.
///
/// Input is split on line terminators and each line is trimmed and
/// transliterated to ASCII. Lines are rejoined looking ahead one line: a line
/// followed by a blank keeps a single newline, a line ending a sentence forces
/// a paragraph break, anything else soft-wraps with a space. With `max_chars`,
/// each line is first hard-wrapped via [`split_text`].
///
/// Never fails: arbitrary input yields some cleaned string.
pub fn clean_text(text: &str, max_chars: Option<usize>) -> String {
    let normalized = text.replace('\r', "\n");
    let mut lines: Vec<&str> = normalized.split('\n').collect();
    // Sentinel so the last real line still has a lookahead target.
    lines.push("\n");
    let mut cleaned = String::new();
    for i in 0..lines.len() - 1 {
        if lines[i].is_empty() {
            cleaned.push('\n');
            continue;
        }
        let mut line = deunicode(lines[i].trim());
        if let Some(max) = max_chars {
            line = split_text(&line, max);
        }
        cleaned.push_str(&line);
        if lines[i + 1].is_empty() {
            cleaned.push('\n');
        } else if end_of_paragraph(&line) {
            cleaned.push_str("\n\n");
        } else {
            cleaned.push(' ');
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_single_sentence() {
        assert_eq!(clean_text("Hello, world!", None), "Hello, world!\n\n");
        assert_eq!(clean_text("Hello, world!\n", None), "Hello, world!\n\n");
    }

    #[test]
    fn clean_soft_wraps_continuation() {
        assert_eq!(
            clean_text("Hello, world,\nit's me.", None),
            "Hello, world, it's me.\n\n"
        );
    }

    #[test]
    fn clean_max_chars_fixtures() {
        assert_eq!(clean_text("012345678.", Some(5)), "01234\n\n5678.\n\n");
        assert_eq!(clean_text("0123456789", Some(5)), "01234\n\n56789 ");
        assert_eq!(
            clean_text("'0123?' '4567.' 89.\n", Some(7)),
            "'0123?'\n\n'4567.'\n\n89.\n\n"
        );
    }

    #[test]
    fn clean_preserves_blank_lines() {
        assert_eq!(clean_text("a\n\nb", None), "a\n\nb ");
    }

    #[test]
    fn clean_transliterates_to_ascii() {
        assert_eq!(clean_text("déjà vu.", None), "deja vu.\n\n");
    }

    #[test]
    fn clean_never_panics_on_arbitrary_input() {
        for text in ["", "\n", "\r\n\r\n", "   ", "一二三。", "\u{1f600}"] {
            let _ = clean_text(text, None);
            let _ = clean_text(text, Some(3));
        }
    }

    #[test]
    fn end_of_paragraph_quotes() {
        assert!(end_of_paragraph("Done."));
        assert!(end_of_paragraph("'Done?'"));
        assert!(end_of_paragraph("\"Done!\""));
        assert!(!end_of_paragraph("Done"));
        assert!(!end_of_paragraph("Done'"));
    }

    #[test]
    fn split_text_zero_budget_is_identity() {
        assert_eq!(split_text("abc", 0), "abc");
        assert_eq!(clean_text("0123456789", Some(0)), "0123456789 ");
    }

    #[test]
    fn split_text_breaks_after_sentence_space() {
        assert_eq!(split_text("One. Two.", 6), "One.\n\nTwo.");
        assert_eq!(split_text("short", 10), "short");
    }
}
