//! Voice profile registry.
//!
//! Profiles are read-only reference data: a named persona bound to a provider
//! voice and its acoustic parameters. The registry resolves fallbacks by
//! explicit `fallback` id, or else the first other profile of the same
//! `family` that speaks the requested language.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::core::synthesis::AudioFormat;
use crate::core::tts::VoiceParams;

pub const DEFAULT_MODEL: &str = "eleven_multilingual_v2";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoiceError {
    #[error("Unknown voice profile: {0}")]
    UnknownProfile(String),

    #[error("Voice profile '{profile}' does not support language '{language}'")]
    UnsupportedLanguage { profile: String, language: String },

    #[error("Invalid voice profile '{profile}': {reason}")]
    InvalidProfile { profile: String, reason: String },
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_stability() -> f32 {
    0.5
}

fn default_similarity_boost() -> f32 {
    0.75
}

/// A named voice persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub id: String,
    pub provider_voice_id: String,
    #[serde(default = "default_stability")]
    pub stability: f32,
    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f32,
    #[serde(default)]
    pub style: f32,
    #[serde(default = "default_model")]
    pub model: String,
    pub languages: Vec<String>,
    /// Persona family used to pick a fallback
    #[serde(default)]
    pub family: Option<String>,
    /// Explicit fallback profile id
    #[serde(default)]
    pub fallback: Option<String>,
}

impl VoiceProfile {
    /// Matches on the primary language subtag, so "en-US" is served by "en".
    pub fn supports_language(&self, language: &str) -> bool {
        let wanted = primary_subtag(language);
        self.languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(language) || primary_subtag(l) == wanted)
    }

    pub fn voice_params(
        &self,
        language: &str,
        format: AudioFormat,
        optimize_for_speed: bool,
    ) -> VoiceParams {
        VoiceParams {
            voice_id: self.provider_voice_id.clone(),
            model: self.model.clone(),
            stability: self.stability,
            similarity_boost: self.similarity_boost,
            style: self.style,
            language: language.to_ascii_lowercase(),
            format,
            optimize_for_speed,
        }
    }

    fn validate(&self) -> Result<(), VoiceError> {
        let invalid = |reason: String| VoiceError::InvalidProfile {
            profile: self.id.clone(),
            reason,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty".to_string()));
        }
        if self.provider_voice_id.trim().is_empty() {
            return Err(invalid("provider_voice_id must not be empty".to_string()));
        }
        if self.languages.is_empty() {
            return Err(invalid("at least one language is required".to_string()));
        }
        for (name, value) in [
            ("stability", self.stability),
            ("similarity_boost", self.similarity_boost),
            ("style", self.style),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("{name} must be within [0, 1], got {value}")));
            }
        }
        Ok(())
    }
}

fn primary_subtag(language: &str) -> String {
    language
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn builtin(id: &str, voice: &str, family: &str, stability: f32) -> VoiceProfile {
    VoiceProfile {
        id: id.to_string(),
        provider_voice_id: voice.to_string(),
        stability,
        similarity_boost: 0.75,
        style: 0.0,
        model: default_model(),
        languages: vec!["en".to_string(), "es".to_string()],
        family: Some(family.to_string()),
        fallback: None,
    }
}

/// Profiles shipped with the gateway.
pub fn default_profiles() -> Vec<VoiceProfile> {
    vec![
        builtin("rachel", "21m00Tcm4TlvDq8ikWAM", "professional", 0.5),
        builtin("adam", "pNInz6obpgDQGcFmaJgB", "professional", 0.55),
        builtin("bella", "EXAVITQu4vr4xnSDxMaL", "friendly", 0.4),
        builtin("antoni", "ErXwobaYiN019PkySvjV", "friendly", 0.45),
    ]
}

/// Lookup table of voice profiles, in declaration order.
#[derive(Debug, Clone)]
pub struct VoiceRegistry {
    profiles: Vec<VoiceProfile>,
    index: HashMap<String, usize>,
}

impl VoiceRegistry {
    pub fn new(profiles: Vec<VoiceProfile>) -> Result<Self, VoiceError> {
        let mut index = HashMap::with_capacity(profiles.len());
        for (i, profile) in profiles.iter().enumerate() {
            profile.validate()?;
            if index.insert(profile.id.clone(), i).is_some() {
                return Err(VoiceError::InvalidProfile {
                    profile: profile.id.clone(),
                    reason: "duplicate profile id".to_string(),
                });
            }
        }

        let ids: HashSet<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
        for profile in &profiles {
            if let Some(fallback) = &profile.fallback
                && (!ids.contains(fallback.as_str()) || fallback == &profile.id)
            {
                return Err(VoiceError::InvalidProfile {
                    profile: profile.id.clone(),
                    reason: format!("fallback '{fallback}' is not another known profile"),
                });
            }
        }

        Ok(Self { profiles, index })
    }

    pub fn get(&self, id: &str) -> Option<&VoiceProfile> {
        self.index.get(id).map(|&i| &self.profiles[i])
    }

    /// Resolves a profile that can speak `language`.
    pub fn resolve(&self, id: &str, language: &str) -> Result<&VoiceProfile, VoiceError> {
        let profile = self
            .get(id)
            .ok_or_else(|| VoiceError::UnknownProfile(id.to_string()))?;
        if !profile.supports_language(language) {
            return Err(VoiceError::UnsupportedLanguage {
                profile: id.to_string(),
                language: language.to_string(),
            });
        }
        Ok(profile)
    }

    /// Fallback profile for `id` that supports `language`, if any.
    pub fn fallback_for(&self, id: &str, language: &str) -> Option<&VoiceProfile> {
        let profile = self.get(id)?;

        if let Some(explicit) = profile.fallback.as_deref().and_then(|f| self.get(f))
            && explicit.supports_language(language)
        {
            return Some(explicit);
        }

        let family = profile.family.as_deref()?;
        self.profiles.iter().find(|candidate| {
            candidate.id != profile.id
                && candidate.family.as_deref() == Some(family)
                && candidate.supports_language(language)
        })
    }

    pub fn profiles(&self) -> &[VoiceProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for VoiceRegistry {
    fn default() -> Self {
        let profiles = default_profiles();
        let index = profiles
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        Self { profiles, index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = VoiceRegistry::default();
        assert_eq!(registry.len(), 4);
        assert!(VoiceRegistry::new(default_profiles()).is_ok());
        assert_eq!(
            registry.get("rachel").unwrap().provider_voice_id,
            "21m00Tcm4TlvDq8ikWAM"
        );
    }

    #[test]
    fn test_language_matching() {
        let registry = VoiceRegistry::default();
        assert!(registry.resolve("rachel", "en").is_ok());
        assert!(registry.resolve("rachel", "en-US").is_ok());
        assert_eq!(
            registry.resolve("rachel", "de").unwrap_err(),
            VoiceError::UnsupportedLanguage {
                profile: "rachel".to_string(),
                language: "de".to_string()
            }
        );
        assert_eq!(
            registry.resolve("nobody", "en").unwrap_err(),
            VoiceError::UnknownProfile("nobody".to_string())
        );
    }

    #[test]
    fn test_fallback_by_family() {
        let registry = VoiceRegistry::default();
        assert_eq!(registry.fallback_for("rachel", "en").unwrap().id, "adam");
        assert_eq!(registry.fallback_for("adam", "en").unwrap().id, "rachel");
        assert_eq!(registry.fallback_for("bella", "es").unwrap().id, "antoni");
        assert!(registry.fallback_for("rachel", "fr").is_none());
    }

    #[test]
    fn test_explicit_fallback_wins() {
        let mut profiles = default_profiles();
        profiles[0].fallback = Some("bella".to_string());
        let registry = VoiceRegistry::new(profiles).unwrap();
        assert_eq!(registry.fallback_for("rachel", "en").unwrap().id, "bella");
    }

    #[test]
    fn test_rejects_invalid_profiles() {
        let mut duplicate = default_profiles();
        duplicate.push(duplicate[0].clone());
        assert!(VoiceRegistry::new(duplicate).is_err());

        let mut out_of_range = default_profiles();
        out_of_range[1].stability = 1.5;
        assert!(VoiceRegistry::new(out_of_range).is_err());

        let mut dangling = default_profiles();
        dangling[2].fallback = Some("ghost".to_string());
        assert!(VoiceRegistry::new(dangling).is_err());
    }
}
