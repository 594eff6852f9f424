//! Topical relevance check for generated answers.

use crate::models::ChatResponse;

/// Lower-case substrings that mark an answer as being about SMA.
pub const SMA_KEYWORDS: &[&str] = &[
    "sma",
    "spinal muscular atrophy",
    "motor neuron",
    "smn1",
    "smn2",
    "muscle weakness",
    "muscle atrophy",
    "spinraza",
    "zolgensma",
    "risdiplam",
    "evrysdi",
    "motor unit",
    "anterior horn",
];

pub const OFF_TOPIC_ANSWER: &str = "I can only provide information about Spinal Muscular Atrophy (SMA). Please ask a question related to SMA, its symptoms, treatments, or management.";

/// Confidence attached to the redirect. It reflects certainty about the
/// policy, not about any model output.
pub const OFF_TOPIC_CONFIDENCE: f64 = 0.9;

/// Case-insensitive substring match against [`SMA_KEYWORDS`].
pub fn is_sma_related(answer: &str) -> bool {
    let answer = answer.to_lowercase();
    SMA_KEYWORDS.iter().any(|keyword| answer.contains(keyword))
}

/// Fixed reply used when a well-formed answer is off topic.
pub fn off_topic_response() -> ChatResponse {
    ChatResponse::trusted(OFF_TOPIC_ANSWER, OFF_TOPIC_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_related_true() {
        let texts = [
            "Spinal Muscular Atrophy is a genetic disorder",
            "SMA affects motor neurons",
            "Spinraza is a treatment for SMA",
            "SMN1 gene mutation causes SMA",
            "Degeneration of the ANTERIOR HORN cells",
        ];

        for text in texts {
            assert!(is_sma_related(text), "{}", text);
        }
    }

    #[test]
    fn test_abbreviation_any_casing() {
        for text in ["sma", "SMA", "Sma", "sMa"] {
            assert!(is_sma_related(&format!("About {} today", text)));
        }
    }

    #[test]
    fn test_sma_related_false() {
        let texts = [
            "The weather is nice today",
            "I like pizza",
            "Python is a programming language",
        ];

        for text in texts {
            assert!(!is_sma_related(text), "{}", text);
        }
    }

    #[test]
    fn test_substring_match_has_no_word_boundaries() {
        // "small" contains "sma"
        assert!(is_sma_related("a small thing"));
    }

    #[test]
    fn test_off_topic_response() {
        let response = off_topic_response();
        assert_eq!(response.confidence(), 0.9);
        assert!(response.answer().contains("only provide information about"));
        assert!(response.answer().contains("SMA"));
    }
}
