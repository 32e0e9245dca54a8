//! Sentence boundary detection

use std::collections::HashSet;

/// Splits prose into an ordered sequence of sentences.
///
/// Implementations must return trimmed, non-empty fragments in source order.
pub trait SentenceDetector: Send + Sync {
    fn detect(&self, text: &str) -> Vec<String>;
}

/// Words that end in a period without ending the sentence
const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "inc", "ltd",
    "co", "corp", "no", "fig", "approx", "dept", "est", "al",
];

/// Rule-based detector splitting on terminal punctuation
///
/// A sentence ends at `.`, `!` or `?` (plus any trailing closing quotes or
/// brackets) followed by whitespace or the end of the text. A period after a
/// known abbreviation or a single capital initial does not end a sentence.
#[derive(Debug, Clone)]
pub struct PunctuationSentenceDetector {
    abbreviations: HashSet<String>,
}

impl Default for PunctuationSentenceDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PunctuationSentenceDetector {
    /// Create a detector with the default abbreviation list
    pub fn new() -> Self {
        Self {
            abbreviations: DEFAULT_ABBREVIATIONS.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Add abbreviations (case-insensitive, without the final period)
    pub fn with_abbreviations<I, S>(mut self, abbreviations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.abbreviations.extend(
            abbreviations
                .into_iter()
                .map(|a| a.as_ref().trim_end_matches('.').to_lowercase()),
        );
        self
    }

    /// Whether the word right before a period suppresses the boundary
    fn is_abbreviation(&self, before: &str) -> bool {
        let word = before
            .rsplit(char::is_whitespace)
            .next()
            .unwrap_or("")
            .trim_start_matches(|c: char| is_opening(c));

        let mut chars = word.chars();
        if let (Some(first), None) = (chars.next(), chars.next())
            && first.is_uppercase()
        {
            return true;
        }

        self.abbreviations.contains(&word.to_lowercase())
    }
}

impl SentenceDetector for PunctuationSentenceDetector {
    fn detect(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut start = 0;
        let mut chars = text.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            if !is_terminal(c) {
                continue;
            }

            // Swallow runs like "?!", "..." and closing quotes
            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = chars.peek() {
                if is_terminal(next) || is_closing(next) {
                    end = j + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }

            // Full-width stops end a sentence even without trailing space
            let at_boundary = is_full_width_terminal(c)
                || chars.peek().is_none_or(|&(_, next)| next.is_whitespace());
            if !at_boundary {
                continue;
            }
            if c == '.' && end == i + 1 && self.is_abbreviation(&text[start..i]) {
                continue;
            }

            push_sentence(&mut sentences, &text[start..end]);
            start = end;
        }

        push_sentence(&mut sentences, &text[start..]);
        sentences
    }
}

fn push_sentence(sentences: &mut Vec<String>, fragment: &str) {
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        sentences.push(fragment.to_string());
    }
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?') || is_full_width_terminal(c)
}

fn is_full_width_terminal(c: char) -> bool {
    matches!(c, '。' | '！' | '？')
}

fn is_closing(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201D}' | '\u{2019}' | '」' | '』' | '）')
}

fn is_opening(c: char) -> bool {
    matches!(c, '"' | '\'' | '(' | '[' | '\u{201C}' | '\u{2018}' | '「' | '『' | '（')
}
