//! Pure matchers over text
//!
//! A matcher is a side-effect-free extractor that returns the byte spans of
//! every non-overlapping hit in a string. Regex matchers may report capture
//! group 1 instead of the whole match (so `Account #: 1234567` can mask only
//! the digits) and may be gated by a structural validator such as Luhn.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Byte span inside a content string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether two spans share at least one byte
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Structural check applied to a regex hit before it counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    /// Luhn mod-10 checksum over the digits of the hit (card numbers)
    Luhn,
}

impl Validator {
    pub fn accepts(&self, text: &str) -> bool {
        match self {
            Self::Luhn => luhn_valid(text),
        }
    }
}

/// Serializable matcher definition, compiled into a [`Matcher`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatcherDef {
    /// Regular expression; capture group 1 (when present) is the reported span
    Regex {
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        validator: Option<Validator>,
    },
    /// ASCII case-insensitive literal phrases
    Phrases { phrases: Vec<String> },
}

impl MatcherDef {
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            validator: None,
        }
    }

    pub fn validated_regex(pattern: impl Into<String>, validator: Validator) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            validator: Some(validator),
        }
    }

    pub fn phrases(phrases: &[&str]) -> Self {
        Self::Phrases {
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Compiled matcher
#[derive(Debug, Clone)]
pub enum Matcher {
    Regex {
        pattern: Regex,
        validator: Option<Validator>,
    },
    Phrases(Vec<String>),
}

impl Matcher {
    /// Compile a definition. A corrupted definition is an internal fault.
    pub fn compile(def: &MatcherDef) -> Result<Self> {
        match def {
            MatcherDef::Regex { pattern, validator } => {
                let compiled = Regex::new(pattern)
                    .map_err(|e| Error::Internal(format!("invalid regex '{}': {}", pattern, e)))?;
                Ok(Self::Regex {
                    pattern: compiled,
                    validator: *validator,
                })
            }
            MatcherDef::Phrases { phrases } => {
                if phrases.is_empty() {
                    return Err(Error::Internal("phrase matcher has no phrases".to_string()));
                }
                if phrases.iter().any(|p| p.trim().is_empty()) {
                    return Err(Error::Internal(
                        "phrase matcher contains an empty phrase".to_string(),
                    ));
                }
                Ok(Self::Phrases(
                    phrases.iter().map(|p| p.to_ascii_lowercase()).collect(),
                ))
            }
        }
    }

    /// All hits in `text`, ordered by start offset
    pub fn find_spans(&self, text: &str) -> Vec<Span> {
        let mut spans = match self {
            Self::Regex { pattern, validator } => regex_spans(pattern, *validator, text),
            Self::Phrases(phrases) => phrase_spans(phrases, text),
        };
        spans.sort();
        spans
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Regex {
                pattern,
                validator: None,
            } => pattern.is_match(text),
            _ => !self.find_spans(text).is_empty(),
        }
    }
}

fn regex_spans(pattern: &Regex, validator: Option<Validator>, text: &str) -> Vec<Span> {
    let accepted = |span: Span| {
        !span.is_empty()
            && validator
                .map(|v| v.accepts(&text[span.start..span.end]))
                .unwrap_or(true)
    };

    if pattern.captures_len() > 1 {
        pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let m = caps.get(1).or_else(|| caps.get(0))?;
                Some(Span::new(m.start(), m.end()))
            })
            .filter(|span| accepted(*span))
            .collect()
    } else {
        pattern
            .find_iter(text)
            .map(|m| Span::new(m.start(), m.end()))
            .filter(|span| accepted(*span))
            .collect()
    }
}

fn phrase_spans(phrases: &[String], text: &str) -> Vec<Span> {
    // ASCII lowercasing keeps byte offsets identical to the original text
    let haystack = text.to_ascii_lowercase();
    phrases
        .iter()
        .flat_map(|phrase| {
            haystack
                .match_indices(phrase.as_str())
                .map(|(pos, hit)| Span::new(pos, pos + hit.len()))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Luhn mod-10 check over the ASCII digits of `text` (13 to 19 digits)
pub fn luhn_valid(text: &str) -> bool {
    let digits: Vec<u32> = text.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// Replace spans in a single left-to-right pass.
///
/// Spans are ordered leftmost-longest: by start, then by length descending.
/// Equal spans keep the earlier entry of `replacements`. A span overlapping
/// an already accepted one is dropped.
pub fn replace_spans(content: &str, replacements: &[(Span, String)]) -> String {
    let mut ordered: Vec<&(Span, String)> = replacements
        .iter()
        .filter(|(span, _)| span.end <= content.len() && span.start < span.end)
        .collect();
    ordered.sort_by_key(|(span, _)| (span.start, std::cmp::Reverse(span.end)));

    let mut result = String::with_capacity(content.len());
    let mut cursor = 0;

    for (span, replacement) in ordered {
        if span.start < cursor {
            continue;
        }
        result.push_str(&content[cursor..span.start]);
        result.push_str(replacement);
        cursor = span.end;
    }

    result.push_str(&content[cursor..]);
    result
}
