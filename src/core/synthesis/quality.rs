use crate::core::tts::ProviderAudio;

/// Scores synthesized audio in [0, 1].
pub trait QualityScorer: Send + Sync {
    fn score(&self, text: &str, audio: &ProviderAudio) -> f32;
}

/// Confidence-weighted heuristic.
///
/// Starts from provider confidence (or `default_confidence`), then applies
/// penalties: empty audio scores 0, a truncation signal halves the score, and
/// a duration far from the expected speaking rate scales it down
/// proportionally to how far outside `[min_ratio, max_ratio]` it falls.
#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    pub default_confidence: f32,
    /// Expected speech per character of text
    pub ms_per_char: f32,
    pub min_ratio: f32,
    pub max_ratio: f32,
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self {
            default_confidence: 0.9,
            ms_per_char: 66.0,
            min_ratio: 0.5,
            max_ratio: 2.0,
        }
    }
}

impl QualityScorer for HeuristicScorer {
    fn score(&self, text: &str, audio: &ProviderAudio) -> f32 {
        if audio.data.is_empty() {
            return 0.0;
        }

        let mut score = audio
            .confidence
            .unwrap_or(self.default_confidence)
            .clamp(0.0, 1.0);

        if audio.truncated {
            score *= 0.5;
        }

        let chars = text.chars().filter(|c| !c.is_whitespace()).count();
        if let Some(duration_ms) = audio.duration_ms
            && chars > 0
        {
            let expected = chars as f32 * self.ms_per_char;
            let ratio = duration_ms as f32 / expected;
            if ratio < self.min_ratio {
                score *= ratio / self.min_ratio;
            } else if ratio > self.max_ratio {
                score *= self.max_ratio / ratio;
            }
        }

        score.clamp(0.0, 1.0)
    }
}
