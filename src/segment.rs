//! Sentence segmentation adapter.
//!
//! Extraction only depends on the [`SentenceSegmenter`] trait; [`RuleSegmenter`]
//! is a punctuation-and-capitalization splitter with an abbreviation list that
//! works without training data.

use regex::Regex;
use std::sync::OnceLock;

/// Split a block of text into sentence strings.
pub trait SentenceSegmenter: Send + Sync {
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Returns the whole text as a single sentence.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSegmenter;

impl SentenceSegmenter for NoSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        vec![text.to_string()]
    }
}

const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "al", "approx", "ca", "cf", "dr", "e.g", "eq", "eqs", "et", "etc", "fig", "figs", "i.e", "inc",
    "jr", "ltd", "mr", "mrs", "ms", "no", "nos", "prof", "ref", "refs", "resp", "sr", "st", "suppl",
    "tab", "vol", "vs",
];

/// Sentence boundary at `.`, `!` or `?` (plus closing quotes/brackets) followed by
/// whitespace and an uppercase letter, digit, or opening quote/bracket.
/// No boundary after a known abbreviation or a single-letter initial.
#[derive(Clone, Debug)]
pub struct RuleSegmenter {
    abbreviations: Vec<String>,
}

impl Default for RuleSegmenter {
    fn default() -> Self {
        Self { abbreviations: DEFAULT_ABBREVIATIONS.iter().map(|s| s.to_string()).collect() }
    }
}

fn boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // group 1: terminal punctuation incl. trailing closers; the whitespace run follows
    RE.get_or_init(|| Regex::new(r#"([.!?]+["'”’)\]]*)\s+"#).expect("static regex"))
}

impl RuleSegmenter {
    pub fn with_abbreviations<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for a in extra {
            let a = a.as_ref().trim().trim_end_matches('.').to_lowercase();
            if !a.is_empty() {
                self.abbreviations.push(a);
            }
        }
        self.abbreviations.sort();
        self.abbreviations.dedup();
        self
    }

    fn is_abbreviation(&self, before: &str) -> bool {
        let word = before
            .rsplit(|c: char| c.is_whitespace() || c == '(' || c == '[')
            .next()
            .unwrap_or("");
        let word = word.trim_end_matches('.');
        if word.is_empty() {
            return false;
        }
        let mut chars = word.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_uppercase() {
                return true; // initial, e.g. "J. Smith"
            }
        }
        let lower = word.to_lowercase();
        self.abbreviations.iter().any(|a| *a == lower)
    }
}

fn starts_sentence(rest: &str) -> bool {
    match rest.chars().next() {
        Some(c) => c.is_uppercase() || c.is_ascii_digit() || matches!(c, '"' | '\'' | '“' | '‘' | '(' | '['),
        None => false,
    }
}

impl SentenceSegmenter for RuleSegmenter {
    fn segment(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut start = 0;
        for caps in boundary_re().captures_iter(text) {
            let (Some(whole), Some(punct)) = (caps.get(0), caps.get(1)) else { continue };
            if whole.start() < start {
                continue;
            }
            let rest = &text[whole.end()..];
            if !starts_sentence(rest) {
                continue;
            }
            let ends_with_period = punct.as_str().starts_with('.') && !punct.as_str().contains(['!', '?']);
            if ends_with_period && self.is_abbreviation(&text[start..punct.start()]) {
                continue;
            }
            let sentence = text[start..punct.end()].trim();
            if !sentence.is_empty() {
                out.push(sentence.to_string());
            }
            start = whole.end();
        }
        let last = text[start..].trim();
        if !last.is_empty() {
            out.push(last.to_string());
        }
        out
    }
}
