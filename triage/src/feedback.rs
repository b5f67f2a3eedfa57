//! Feedback classification: maps terse replies to a tri-state signal.
//!
//! Text is normalised (unicode quotes folded, lowercased, whitespace
//! collapsed, boundary punctuation stripped) and tokenised; a phrase matches
//! when its tokens appear as a contiguous run. Hedges ("not sure") are removed
//! first. A positive phrase directly preceded by a negator ("isn't fixed")
//! counts as negative, and negative phrases take precedence over positive
//! ones.

use serde::{Deserialize, Serialize};

use crate::config::FeedbackPhrases;

/// Outcome of classifying a feedback utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSignal {
    Positive,
    Negative,
    Unclear,
}

impl std::fmt::Display for FeedbackSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
            Self::Unclear => write!(f, "unclear"),
        }
    }
}

/// How many tokens before a positive phrase are searched for a negator, so
/// "has not been fixed" is caught as well as "isn't fixed".
const NEGATION_WINDOW: usize = 2;

/// Phrase-set classifier with negative precedence.
#[derive(Debug, Clone)]
pub struct FeedbackClassifier {
    positive: Vec<Vec<String>>,
    negative: Vec<Vec<String>>,
    negators: Vec<Vec<String>>,
    hedges: Vec<Vec<String>>,
}

impl FeedbackClassifier {
    pub fn new(phrases: &FeedbackPhrases) -> Self {
        Self {
            positive: compile(&phrases.positive),
            negative: compile(&phrases.negative),
            negators: compile(&phrases.negators),
            hedges: compile(&phrases.hedges),
        }
    }

    /// Classify one utterance.
    pub fn classify(&self, text: &str) -> FeedbackSignal {
        let tokens = self.strip_hedges(tokenize(text));
        if tokens.is_empty() {
            return FeedbackSignal::Unclear;
        }
        if self.negative.iter().any(|p| find_run(&tokens, p).is_some()) {
            return FeedbackSignal::Negative;
        }

        let mut positive = false;
        for phrase in &self.positive {
            for start in run_starts(&tokens, phrase) {
                let before = &tokens[start.saturating_sub(NEGATION_WINDOW)..start];
                if self.negators.iter().any(|n| find_run(before, n).is_some()) {
                    return FeedbackSignal::Negative;
                }
                positive = true;
            }
        }
        if positive {
            FeedbackSignal::Positive
        } else {
            FeedbackSignal::Unclear
        }
    }

    fn strip_hedges(&self, mut tokens: Vec<String>) -> Vec<String> {
        for hedge in &self.hedges {
            while let Some(start) = find_run(&tokens, hedge) {
                tokens.drain(start..start + hedge.len());
            }
        }
        tokens
    }
}

impl Default for FeedbackClassifier {
    fn default() -> Self {
        Self::new(&FeedbackPhrases::default())
    }
}

fn compile(phrases: &[String]) -> Vec<Vec<String>> {
    phrases
        .iter()
        .map(|p| tokenize(p))
        .filter(|t| !t.is_empty())
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    text.replace(['\u{2019}', '\u{2018}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .to_lowercase()
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| c.is_ascii_punctuation()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// First index at which `phrase` occurs as a contiguous run.
fn find_run(tokens: &[String], phrase: &[String]) -> Option<usize> {
    run_starts(tokens, phrase).next()
}

fn run_starts<'a>(tokens: &'a [String], phrase: &'a [String]) -> impl Iterator<Item = usize> + 'a {
    let width = phrase.len().max(1);
    tokens
        .windows(width)
        .enumerate()
        .filter(move |(_, window)| *window == phrase)
        .map(|(start, _)| start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> FeedbackClassifier {
        FeedbackClassifier::default()
    }

    #[test]
    fn test_plain_yes_no() {
        let c = classifier();
        assert_eq!(c.classify("yes"), FeedbackSignal::Positive);
        assert_eq!(c.classify("  YES!  "), FeedbackSignal::Positive);
        assert_eq!(c.classify("no"), FeedbackSignal::Negative);
        assert_eq!(c.classify("No."), FeedbackSignal::Negative);
    }

    #[test]
    fn test_phrases() {
        let c = classifier();
        assert_eq!(c.classify("it worked, thanks"), FeedbackSignal::Positive);
        assert_eq!(c.classify("nope that didn't help"), FeedbackSignal::Negative);
        let curly = "it still isn\u{2019}t fixed, still broken";
        assert_eq!(c.classify(curly), FeedbackSignal::Negative);
        assert_eq!(c.classify("Didn\u{2019}t work"), FeedbackSignal::Negative);
    }

    #[test]
    fn test_negative_takes_precedence() {
        let c = classifier();
        assert_eq!(c.classify("yes but it didn't work"), FeedbackSignal::Negative);
        assert_eq!(c.classify("no thanks"), FeedbackSignal::Negative);
        assert_eq!(c.classify("ok no"), FeedbackSignal::Negative);
    }

    #[test]
    fn test_precedence_holds_for_every_phrase_pair() {
        let phrases = FeedbackPhrases::default();
        let c = FeedbackClassifier::new(&phrases);
        for pos in &phrases.positive {
            for neg in &phrases.negative {
                let text = format!("{pos} {neg}");
                assert_eq!(c.classify(&text), FeedbackSignal::Negative, "{text}");
                let text = format!("{neg}, {pos}");
                assert_eq!(c.classify(&text), FeedbackSignal::Negative, "{text}");
            }
        }
    }

    #[test]
    fn test_unclear() {
        let c = classifier();
        assert_eq!(c.classify(""), FeedbackSignal::Unclear);
        assert_eq!(c.classify("   "), FeedbackSignal::Unclear);
        assert_eq!(c.classify("maybe later"), FeedbackSignal::Unclear);
        assert_eq!(c.classify("my printer is on fire"), FeedbackSignal::Unclear);
    }

    #[test]
    fn test_token_boundaries() {
        let c = classifier();
        // "no" inside another word must not count
        assert_eq!(c.classify("i know"), FeedbackSignal::Unclear);
        assert_eq!(c.classify("yesterday"), FeedbackSignal::Unclear);
    }

    #[test]
    fn test_custom_phrase_sets() {
        let c = FeedbackClassifier::new(&FeedbackPhrases {
            positive: vec!["ja".into()],
            negative: vec!["nein".into(), "  ".into()],
            negators: vec!["nicht".into()],
            hedges: Vec::new(),
        });
        assert_eq!(c.classify("Ja"), FeedbackSignal::Positive);
        assert_eq!(c.classify("nein"), FeedbackSignal::Negative);
        assert_eq!(c.classify("yes"), FeedbackSignal::Unclear);
        assert_eq!(c.classify("nicht ja"), FeedbackSignal::Negative);
    }

    #[test]
    fn test_negated_positive_is_negative() {
        let c = classifier();
        for text in [
            "it isn't fixed",
            "it hasn't worked",
            "it never worked",
            "wasn't resolved",
            "not solved yet",
            "it has not been fixed",
            "Didn\u{2019}t work",
        ] {
            assert_eq!(c.classify(text), FeedbackSignal::Negative, "{text}");
        }
        // a negator further back does not reach the phrase
        assert_eq!(
            c.classify("i was not expecting much but it worked"),
            FeedbackSignal::Positive
        );
    }

    #[test]
    fn test_hedges_are_unclear() {
        let c = classifier();
        assert_eq!(c.classify("I don't know"), FeedbackSignal::Unclear);
        assert_eq!(c.classify("not sure"), FeedbackSignal::Unclear);
        assert_eq!(c.classify("no idea"), FeedbackSignal::Unclear);
        assert_eq!(c.classify("not sure, but it works now"), FeedbackSignal::Positive);
        assert_eq!(c.classify("dunno, still broken"), FeedbackSignal::Negative);
    }
}
