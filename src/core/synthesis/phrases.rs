use std::collections::HashSet;

use crate::core::cache::TtlClass;

/// Phrases pregenerated for every voice unless configuration overrides them.
pub const DEFAULT_COMMON_PHRASES: &[&str] = &[
    "Hello, thanks for calling!",
    "Hi there, how can I help you today?",
    "Thank you for your interest in the property.",
    "Can I get your name, please?",
    "What's the best number to reach you?",
    "Would you like to schedule a viewing?",
    "Let me check that for you.",
    "One moment, please.",
    "Could you repeat that, please?",
    "I'm sorry, I didn't catch that.",
    "Is there anything else I can help you with?",
    "Thank you for calling, have a great day!",
    "Goodbye!",
];

/// Classifies text as a known common phrase (long TTL) or ad hoc (short TTL).
///
/// Matching ignores case, punctuation and spacing. Near misses within the
/// similarity threshold count as common.
#[derive(Debug, Clone)]
pub struct CommonPhrases {
    phrases: Vec<String>,
    normalized: HashSet<String>,
    similarity_threshold: f32,
}

impl CommonPhrases {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let phrases: Vec<String> = phrases.into_iter().map(Into::into).collect();
        let normalized = phrases.iter().map(|p| canonical(p)).collect();
        Self {
            phrases,
            normalized,
            similarity_threshold: 0.9,
        }
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn is_common(&self, text: &str) -> bool {
        let candidate = canonical(text);
        if candidate.is_empty() {
            return false;
        }
        if self.normalized.contains(&candidate) {
            return true;
        }
        self.normalized
            .iter()
            .any(|known| similarity(known, &candidate) >= self.similarity_threshold)
    }

    pub fn classify(&self, text: &str) -> TtlClass {
        if self.is_common(text) {
            TtlClass::Common
        } else {
            TtlClass::Dynamic
        }
    }
}

impl Default for CommonPhrases {
    fn default() -> Self {
        Self::new(DEFAULT_COMMON_PHRASES.iter().copied())
    }
}

fn canonical(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// 1 - normalized Levenshtein distance.
fn similarity(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    if a.len().abs_diff(b.len()) as f32 / longest as f32 > 0.5 {
        return 0.0;
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    1.0 - prev[b.len()] as f32 / longest as f32
}
