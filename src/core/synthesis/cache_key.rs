use std::fmt;
use xxhash_rust::xxh3::xxh3_128;

use super::request::SynthesisRequest;
use crate::core::voices::VoiceProfile;

/// Content address of a synthesis result.
///
/// Covers everything that changes the produced audio: normalized text, the
/// profile and its provider voice, model and acoustic parameters, language,
/// format and the speed flag. Trace ids and monitoring scope are excluded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(request: &SynthesisRequest, profile: &VoiceProfile) -> Self {
        let mut s = String::with_capacity(request.text.len() + 128);
        s.push_str(&normalize_text(&request.text));
        s.push('|');
        s.push_str(&profile.id);
        s.push('|');
        s.push_str(&profile.provider_voice_id);
        s.push('|');
        s.push_str(&profile.model);
        s.push('|');
        s.push_str(&format!(
            "{:.3}|{:.3}|{:.3}",
            profile.stability, profile.similarity_boost, profile.style
        ));
        s.push('|');
        s.push_str(&request.language.trim().to_ascii_lowercase());
        s.push('|');
        s.push_str(request.format.as_str());
        s.push('|');
        s.push(if request.optimize_for_speed { '1' } else { '0' });

        CacheKey(format!("tts:{:032x}", xxh3_128(s.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trims and collapses internal whitespace. Case and punctuation are kept
/// because both affect prosody.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::synthesis::AudioFormat;
    use crate::core::voices::VoiceRegistry;

    fn profile() -> VoiceProfile {
        VoiceRegistry::default().get("rachel").unwrap().clone()
    }

    #[test]
    fn test_key_is_deterministic() {
        let request = SynthesisRequest::new("Hello there", "rachel", "en");
        let a = CacheKey::derive(&request, &profile());
        let b = CacheKey::derive(&request.clone(), &profile());
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("tts:"));
        assert_eq!(a.as_str().len(), 4 + 32);
    }

    #[test]
    fn test_irrelevant_fields_do_not_change_key() {
        let base = SynthesisRequest::new("Hello there", "rachel", "en");
        let key = CacheKey::derive(&base, &profile());

        let traced = base.clone().with_trace_id("abc-123").with_scope("tenant-a");
        assert_eq!(CacheKey::derive(&traced, &profile()), key);

        let spaced = SynthesisRequest::new("  Hello   there ", "rachel", "EN");
        assert_eq!(CacheKey::derive(&spaced, &profile()), key);
    }

    #[test]
    fn test_acoustic_parameters_change_key() {
        let request = SynthesisRequest::new("Hello there", "rachel", "en");
        let key = CacheKey::derive(&request, &profile());

        let variants: Vec<Box<dyn Fn(&mut VoiceProfile)>> = vec![
            Box::new(|p| p.stability = 0.9),
            Box::new(|p| p.similarity_boost = 0.1),
            Box::new(|p| p.style = 0.3),
            Box::new(|p| p.model = "eleven_turbo_v2".to_string()),
            Box::new(|p| p.provider_voice_id = "other".to_string()),
        ];
        for mutate in variants {
            let mut changed = profile();
            mutate(&mut changed);
            assert_ne!(CacheKey::derive(&request, &changed), key);
        }

        let requests = [
            SynthesisRequest::new("hello there", "rachel", "en"),
            SynthesisRequest::new("Hello there", "rachel", "es"),
            request.clone().with_format(AudioFormat::Mp3),
            request.clone().with_optimize_for_speed(true),
        ];
        for other in &requests {
            assert_ne!(CacheKey::derive(other, &profile()), key);
        }
    }
}
